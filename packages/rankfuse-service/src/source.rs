use std::{
	collections::{BTreeMap, HashSet},
	path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{Error, Result};
use rankfuse_domain::{ColumnKind, RankedList};
use rankfuse_storage::{
	models::{RowRejection, SourceFile},
	ranked_csv,
};

const SUBMISSION_PREFIX: &str = "submission_";

/// A named set of per-query ranked lists taking part in a run.
#[derive(Clone, Debug)]
pub struct Source {
	pub name: String,
	pub path: Option<PathBuf>,
	pub column_kind: ColumnKind,
	/// Item columns in the file this source came from.
	pub width: usize,
	pub lists: BTreeMap<String, RankedList>,
	pub rejected: Vec<RowRejection>,
}
impl Source {
	pub fn new(name: impl Into<String>, lists: BTreeMap<String, RankedList>) -> Self {
		let width = lists.values().map(|list| list.len()).max().unwrap_or(0);

		Self {
			name: name.into(),
			path: None,
			column_kind: ColumnKind::default(),
			width,
			lists,
			rejected: Vec::new(),
		}
	}

	pub fn from_file(name: impl Into<String>, path: &Path, file: SourceFile) -> Self {
		Self {
			name: name.into(),
			path: Some(path.to_path_buf()),
			column_kind: file.column_kind,
			width: file.width,
			lists: file.lists,
			rejected: file.rejected,
		}
	}

	pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
		let file = ranked_csv::read_ranked_lists(path)?;

		Ok(Self::from_file(name, path, file))
	}

	pub fn list(&self, query_id: &str) -> Option<&RankedList> {
		self.lists.get(query_id)
	}
}

/// A `name=path` or bare `path` argument naming one input file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SourceArg {
	pub name: Option<String>,
	pub path: PathBuf,
}
impl SourceArg {
	pub fn parse(raw: &str) -> Result<Self> {
		let raw = raw.trim();

		if raw.is_empty() {
			return Err(Error::InvalidInput { message: "Input must not be empty.".to_string() });
		}

		match raw.split_once('=') {
			Some((name, path)) => {
				let name = name.trim();
				let path = path.trim();

				if name.is_empty() || path.is_empty() {
					return Err(Error::InvalidInput {
						message: format!("Input {raw:?} must look like name=path."),
					});
				}

				Ok(Self { name: Some(name.to_string()), path: PathBuf::from(path) })
			},
			None => Ok(Self { name: None, path: PathBuf::from(raw) }),
		}
	}
}

/// Assigns a unique name to every input, in order.
///
/// Explicit names must be unique. Derived names come from the file stem with a leading
/// `submission_` removed; clashes get `_1`, `_2` and so on.
pub fn resolve_names(args: &[SourceArg]) -> Result<Vec<String>> {
	let mut explicit = HashSet::new();

	for arg in args {
		if let Some(name) = &arg.name
			&& !explicit.insert(name.as_str())
		{
			return Err(Error::InvalidInput { message: format!("Source name {name:?} is used twice.") });
		}
	}

	let mut taken: HashSet<String> = explicit.iter().map(|name| name.to_string()).collect();
	let mut names = Vec::with_capacity(args.len());

	for arg in args {
		if let Some(name) = &arg.name {
			names.push(name.clone());

			continue;
		}

		let base = derived_name(&arg.path);
		let mut candidate = base.clone();
		let mut suffix = 0;

		while taken.contains(&candidate) {
			suffix += 1;
			candidate = format!("{base}_{suffix}");
		}

		taken.insert(candidate.clone());
		names.push(candidate);
	}

	Ok(names)
}

fn derived_name(path: &Path) -> String {
	let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("source");
	let stem = stem.strip_prefix(SUBMISSION_PREFIX).unwrap_or(stem);

	if stem.is_empty() { "source".to_string() } else { stem.to_string() }
}
