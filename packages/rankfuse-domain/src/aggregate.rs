use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

const MISSING_ITEM: &str = "#";

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum AggregateError {
	#[error("Query id must be non-empty.")]
	EmptyQueryId,
}

/// Final fused ranking: query id to ordered item ids, iterated in query id order.
///
/// Ids are stored trimmed, and `#` or blank items are never stored, so a written row reads back
/// to the same sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedResult {
	rows: BTreeMap<String, Vec<String>>,
}
impl AggregatedResult {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `items` for `query_id`, dropping blank or `#` items, repeated ids and anything past
	/// `top_k`.
	pub fn insert(
		&mut self,
		query_id: impl AsRef<str>,
		items: Vec<String>,
		top_k: usize,
	) -> Result<(), AggregateError> {
		let query_id = query_id.as_ref().trim();

		if query_id.is_empty() {
			return Err(AggregateError::EmptyQueryId);
		}

		let mut seen = HashSet::with_capacity(items.len());
		let mut kept = Vec::with_capacity(items.len().min(top_k));

		for item in items {
			if kept.len() >= top_k {
				break;
			}

			let item = item.trim();

			if item.is_empty() || item == MISSING_ITEM {
				continue;
			}
			if seen.insert(item.to_string()) {
				kept.push(item.to_string());
			}
		}

		self.rows.insert(query_id.to_string(), kept);

		Ok(())
	}

	pub fn get(&self, query_id: &str) -> Option<&[String]> {
		self.rows.get(query_id).map(Vec::as_slice)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.rows.iter().map(|(query_id, items)| (query_id.as_str(), items.as_slice()))
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Length of the longest row.
	pub fn max_row_len(&self) -> usize {
		self.rows.values().map(Vec::len).max().unwrap_or(0)
	}
}
