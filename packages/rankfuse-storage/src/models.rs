use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use rankfuse_domain::{ColumnKind, RankedList};

/// Why a row was dropped while parsing a ranked-list file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedRow {
	MissingQueryId,
	DuplicateQueryId,
	TooManyCells { cells: usize, columns: usize },
	InvalidEncoding,
}
impl fmt::Display for MalformedRow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingQueryId => write!(f, "missing query_id"),
			Self::DuplicateQueryId => write!(f, "duplicate query_id"),
			Self::TooManyCells { cells, columns } =>
				write!(f, "{cells} cells for {columns} header columns"),
			Self::InvalidEncoding => write!(f, "row is not valid UTF-8"),
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RowRejection {
	/// 1-based line in the file, header included.
	pub line: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_id: Option<String>,
	pub reason: MalformedRow,
}

/// Parsed contents of one ranked-list file.
#[derive(Clone, Debug)]
pub struct SourceFile {
	pub column_kind: ColumnKind,
	/// Number of item columns in the header.
	pub width: usize,
	pub lists: BTreeMap<String, RankedList>,
	pub rejected: Vec<RowRejection>,
}

/// Shape of a written ranked-list file.
#[derive(Clone, Debug)]
pub struct OutputLayout {
	pub column_kind: ColumnKind,
	pub width: usize,
	/// Cell written for empty slots; either empty or `#`.
	pub placeholder: String,
}
