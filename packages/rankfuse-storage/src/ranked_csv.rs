//! Fixed-width ranked-list CSV files: `query_id,<kind>_1,...,<kind>_N`.
//!
//! Column position is the rank. Empty cells and `#` mark an empty slot; the slot keeps its rank so
//! later items are not promoted.

use std::{
	collections::{BTreeMap, HashSet},
	fs::{self, File},
	io,
	path::Path,
};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use regex::Regex;

use crate::{
	Error, Result,
	models::{MalformedRow, OutputLayout, RowRejection, SourceFile},
};
use rankfuse_domain::{AggregatedResult, Candidate, ColumnKind, RankedList};

pub const QUERY_ID_COLUMN: &str = "query_id";
pub const MISSING_ITEM: &str = "#";

const ITEM_COLUMN_PATTERN: &str = r"^(article_id|image_id)_([0-9]+)$";

pub fn read_ranked_lists(path: &Path) -> Result<SourceFile> {
	let file =
		File::open(path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;
	let source = parse_ranked_lists(file)?;

	tracing::info!(
		path = %path.display(),
		queries = source.lists.len(),
		width = source.width,
		rejected = source.rejected.len(),
		"Loaded ranked lists."
	);

	Ok(source)
}

pub fn parse_ranked_lists<R>(reader: R) -> Result<SourceFile>
where
	R: io::Read,
{
	let mut reader =
		ReaderBuilder::new().has_headers(true).flexible(true).trim(Trim::All).from_reader(reader);
	let headers = reader.headers()?.clone();
	let (column_kind, item_columns) = parse_header(&headers)?;
	let columns = headers.len();

	let mut lists = BTreeMap::new();
	let mut rejected = Vec::new();

	for record in reader.byte_records() {
		let record = record?;
		let line = record.position().map(|position| position.line()).unwrap_or(0);
		let record = match StringRecord::from_byte_record(record) {
			Ok(record) => record,
			Err(err) => {
				let query_id = err
					.into_byte_record()
					.get(0)
					.and_then(|raw| std::str::from_utf8(raw).ok())
					.map(str::trim)
					.filter(|query_id| !query_id.is_empty())
					.map(str::to_string);

				tracing::warn!(line, query_id = ?query_id, "Rejected row with invalid UTF-8.");

				rejected.push(RowRejection { line, query_id, reason: MalformedRow::InvalidEncoding });

				continue;
			},
		};
		let query_id = record.get(0).unwrap_or("").trim();

		if record.len() > columns {
			tracing::warn!(line, cells = record.len(), columns, "Rejected row with extra cells.");

			rejected.push(RowRejection {
				line,
				query_id: (!query_id.is_empty()).then(|| query_id.to_string()),
				reason: MalformedRow::TooManyCells { cells: record.len(), columns },
			});

			continue;
		}
		if query_id.is_empty() {
			tracing::warn!(line, "Rejected row without query_id.");

			rejected.push(RowRejection { line, query_id: None, reason: MalformedRow::MissingQueryId });

			continue;
		}
		if lists.contains_key(query_id) {
			tracing::warn!(line, query_id, "Rejected row with duplicate query_id.");

			rejected.push(RowRejection {
				line,
				query_id: Some(query_id.to_string()),
				reason: MalformedRow::DuplicateQueryId,
			});

			continue;
		}

		let mut seen = HashSet::new();
		let mut candidates = Vec::new();

		for (position, column) in item_columns.iter().enumerate() {
			let cell = record.get(*column).unwrap_or("").trim();

			if is_missing(cell) {
				continue;
			}
			if !seen.insert(cell) {
				tracing::warn!(line, query_id, item_id = cell, "Dropped repeated item in row.");

				continue;
			}

			candidates.push(Candidate::new(cell, position as u32 + 1));
		}

		lists.insert(query_id.to_string(), RankedList::new(query_id, candidates)?);
	}

	Ok(SourceFile { column_kind, width: item_columns.len(), lists, rejected })
}

pub fn write_aggregated(path: &Path, result: &AggregatedResult, layout: &OutputLayout) -> Result<()> {
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		fs::create_dir_all(parent)
			.map_err(|err| Error::Io { path: parent.to_path_buf(), source: err })?;
	}

	let file =
		File::create(path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;

	write_aggregated_to(file, result, layout)?;

	tracing::info!(path = %path.display(), queries = result.len(), "Wrote fused ranked lists.");

	Ok(())
}

pub fn write_aggregated_to<W>(writer: W, result: &AggregatedResult, layout: &OutputLayout) -> Result<()>
where
	W: io::Write,
{
	let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
	let mut header = Vec::with_capacity(layout.width + 1);

	header.push(QUERY_ID_COLUMN.to_string());
	header.extend((1..=layout.width).map(|position| layout.column_kind.header(position)));
	writer.write_record(&header)?;

	if result.max_row_len() > layout.width {
		tracing::warn!(
			longest = result.max_row_len(),
			width = layout.width,
			"Truncated fused rows to output width."
		);
	}

	for (query_id, items) in result.iter() {
		let mut row = Vec::with_capacity(layout.width + 1);

		row.push(query_id);
		row.extend(items.iter().take(layout.width).map(String::as_str));

		while row.len() < layout.width + 1 {
			row.push(layout.placeholder.as_str());
		}

		writer.write_record(&row)?;
	}

	writer.flush().map_err(|err| Error::Csv(err.into()))?;

	Ok(())
}

pub fn is_missing(cell: &str) -> bool {
	let cell = cell.trim();

	cell.is_empty() || cell == MISSING_ITEM
}

fn parse_header(headers: &StringRecord) -> Result<(ColumnKind, Vec<usize>)> {
	let first = headers.get(0).unwrap_or("").trim_start_matches('\u{feff}').trim();

	if first != QUERY_ID_COLUMN {
		return Err(Error::InvalidHeader {
			message: format!("first column must be {QUERY_ID_COLUMN}, found {first:?}."),
		});
	}

	let pattern = Regex::new(ITEM_COLUMN_PATTERN)
		.map_err(|err| Error::InvalidHeader { message: err.to_string() })?;

	let mut kind = None;
	let mut numbered = Vec::new();

	for (column, name) in headers.iter().enumerate().skip(1) {
		let Some(captures) = pattern.captures(name.trim()) else {
			return Err(Error::InvalidHeader {
				message: format!("unexpected column {name:?} at position {}.", column + 1),
			});
		};
		let column_kind = ColumnKind::parse(&captures[1]).unwrap_or_default();
		let number: usize = captures[2].parse().map_err(|_| Error::InvalidHeader {
			message: format!("column {name:?} has an out-of-range number."),
		})?;

		match kind {
			None => kind = Some(column_kind),
			Some(existing) if existing != column_kind =>
				return Err(Error::InvalidHeader {
					message: format!(
						"mixed item columns {} and {}.",
						existing.as_str(),
						column_kind.as_str()
					),
				}),
			Some(_) => {},
		}

		numbered.push((number, column));
	}

	numbered.sort_unstable();

	for (expected, (number, _)) in numbered.iter().enumerate() {
		if *number != expected + 1 {
			return Err(Error::InvalidHeader {
				message: format!(
					"item columns must be numbered 1..={} without gaps or repeats.",
					numbered.len()
				),
			});
		}
	}

	Ok((kind.unwrap_or_default(), numbered.into_iter().map(|(_, column)| column).collect()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(raw: &str) -> SourceFile {
		parse_ranked_lists(raw.as_bytes()).expect("Fixture must parse.")
	}

	#[test]
	fn orders_columns_by_number_not_position() {
		let source = parse("query_id,image_id_2,image_id_1\nq1,b,a\n");
		let list = &source.lists["q1"];

		assert_eq!(source.column_kind, ColumnKind::ImageId);
		assert_eq!(list.item_ids().collect::<Vec<_>>(), vec!["a", "b"]);
	}

	#[test]
	fn empty_slots_keep_their_rank() {
		let source = parse("query_id,article_id_1,article_id_2,article_id_3\nq1,#,x,\n");
		let list = &source.lists["q1"];

		assert_eq!(list.candidates(), &[Candidate::new("x", 2)]);
		assert_eq!(list.leading_len(), 0);
	}

	#[test]
	fn header_must_start_with_query_id() {
		let err = parse_ranked_lists("id,article_id_1\nq1,a\n".as_bytes())
			.expect_err("Header without query_id must fail.");

		assert!(matches!(err, Error::InvalidHeader { .. }), "Unexpected error: {err}");
	}

	#[test]
	fn header_rejects_mixed_and_gapped_columns() {
		let mixed = parse_ranked_lists("query_id,article_id_1,image_id_2\n".as_bytes());
		let gapped = parse_ranked_lists("query_id,article_id_1,article_id_3\n".as_bytes());

		assert!(matches!(mixed, Err(Error::InvalidHeader { .. })));
		assert!(matches!(gapped, Err(Error::InvalidHeader { .. })));
	}

	#[test]
	fn strips_byte_order_mark() {
		let source = parse("\u{feff}query_id,article_id_1\nq1,a\n");

		assert_eq!(source.lists.len(), 1);
	}

	#[test]
	fn missing_cells_detection() {
		assert!(is_missing(""));
		assert!(is_missing(" # "));
		assert!(!is_missing("a#"));
	}
}
