pub mod elasticsearch;
pub mod qdrant;

mod error;

pub use elasticsearch::ElasticsearchProvider;
pub use error::{Error, Result};
pub use qdrant::{Cascade, QdrantProvider, RankBoost};

use std::{future::Future, pin::Pin};

use rankfuse_domain::{Query, RankedList};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A search backend that turns one query into one ranked list.
pub trait RankedListProvider
where
	Self: Send + Sync,
{
	/// Short name used in logs and reports.
	fn name(&self) -> &str;

	/// Maximum number of candidates one call returns.
	fn width(&self) -> usize;

	fn ranked_list<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<RankedList>>;
}

/// Turns hits in engine order into a gap-free list; hits without an id or repeating an earlier id
/// are dropped.
pub(crate) fn ranked_from_hits<I>(query_id: &str, hits: I) -> Result<RankedList>
where
	I: IntoIterator<Item = (Option<String>, Option<f32>)>,
{
	let mut seen = std::collections::HashSet::new();
	let mut candidates = Vec::new();

	for (position, (id, score)) in hits.into_iter().enumerate() {
		let Some(id) = id else {
			tracing::warn!(query_id, position, "Dropped hit without an item id.");

			continue;
		};

		if !seen.insert(id.clone()) {
			tracing::warn!(query_id, item_id = %id, "Dropped repeated hit.");

			continue;
		}

		let mut candidate = rankfuse_domain::Candidate::new(id, candidates.len() as u32 + 1);

		if let Some(score) = score {
			candidate = candidate.with_score(score);
		}

		candidates.push(candidate);
	}

	Ok(RankedList::new(query_id, candidates)?)
}
