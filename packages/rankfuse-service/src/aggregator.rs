use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
	Error, Result,
	fusion::{self, FusedItem, SourceInput},
	policy::{FusionPolicy, Gating},
	source::Source,
};
use rankfuse_domain::AggregatedResult;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
	/// The query has no row in these sources.
	MissingSource { sources: Vec<String> },
	/// The query has a row without items in these sources.
	EmptySource { sources: Vec<String> },
	/// These sources leave rank 1 empty, so no leading run exists.
	NoLeadingItems { sources: Vec<String> },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SkippedQuery {
	pub query_id: String,
	#[serde(flatten)]
	pub reason: SkipReason,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutcome {
	/// Best first, at most `top_k` items; may be empty.
	Fused(Vec<FusedItem>),
	Skipped(SkipReason),
}

/// Everything one run produced.
#[derive(Clone, Debug, Default)]
pub struct AggregationRun {
	pub result: AggregatedResult,
	/// Queries that went through fusion, empty or not.
	pub fused: usize,
	/// Fused queries that ended with no items.
	pub empty: Vec<String>,
	pub skipped: Vec<SkippedQuery>,
}
impl AggregationRun {
	pub fn query_count(&self) -> usize {
		self.result.len()
	}
}

/// Fuses per-query ranked lists from several sources under one policy.
pub struct Aggregator {
	policy: FusionPolicy,
	sources: Vec<Source>,
	weights: Vec<f64>,
}
impl Aggregator {
	pub fn new(policy: FusionPolicy, sources: Vec<Source>) -> Result<Self> {
		if sources.is_empty() {
			return Err(Error::InvalidInput { message: "At least one source is required.".to_string() });
		}

		let weights: Vec<f64> =
			sources.iter().map(|source| f64::from(policy.source_weight(&source.name))).collect();

		if weights.iter().all(|weight| *weight <= 0.0) {
			return Err(Error::Configuration {
				message: "At least one source must have a weight greater than zero.".to_string(),
			});
		}

		for name in policy.source_weights.keys() {
			if !sources.iter().any(|source| &source.name == name) {
				tracing::warn!(source = %name, "Weight configured for a source that is not in the run.");
			}
		}
		for (source, weight) in sources.iter().zip(&weights) {
			if *weight <= 0.0 {
				tracing::info!(source = %source.name, "Ignoring source with zero weight.");
			}
		}

		Ok(Self { policy, sources, weights })
	}

	pub fn policy(&self) -> &FusionPolicy {
		&self.policy
	}

	pub fn sources(&self) -> &[Source] {
		&self.sources
	}

	/// Effective weight of the source at `index`.
	pub fn weight(&self, index: usize) -> f64 {
		self.weights.get(index).copied().unwrap_or(0.0)
	}

	/// Union of query ids across every source, ascending.
	pub fn query_ids(&self) -> BTreeSet<&str> {
		self.sources
			.iter()
			.flat_map(|source| source.lists.keys().map(String::as_str))
			.collect()
	}

	pub fn fuse_query(&self, query_id: &str) -> QueryOutcome {
		let active: Vec<(usize, &Source)> = self
			.sources
			.iter()
			.enumerate()
			.filter(|(index, _)| self.weight(*index) > 0.0)
			.collect();
		let inputs = match self.policy.gating {
			Gating::Any => active
				.iter()
				.filter_map(|(index, source)| {
					source.list(query_id).map(|list| SourceInput {
						index: *index,
						weight: self.weight(*index),
						list,
						limit: None,
					})
				})
				.collect::<Vec<_>>(),
			Gating::All | Gating::Adaptive => {
				let mut missing = Vec::new();
				let mut empty = Vec::new();
				let mut inputs = Vec::with_capacity(active.len());
				let mut names = Vec::with_capacity(active.len());

				for (index, source) in &active {
					match source.list(query_id) {
						None => missing.push(source.name.clone()),
						Some(list) if list.is_empty() => empty.push(source.name.clone()),
						Some(list) => {
							names.push(source.name.as_str());
							inputs.push(SourceInput {
								index: *index,
								weight: self.weight(*index),
								list,
								limit: None,
							});
						},
					}
				}

				if !missing.is_empty() {
					return QueryOutcome::Skipped(SkipReason::MissingSource { sources: missing });
				}
				if !empty.is_empty() {
					return QueryOutcome::Skipped(SkipReason::EmptySource { sources: empty });
				}
				if self.policy.gating == Gating::Adaptive {
					match adaptive_limit(&names, &inputs) {
						Ok(limit) =>
							for input in &mut inputs {
								input.limit = Some(limit);
							},
						Err(sources) =>
							return QueryOutcome::Skipped(SkipReason::NoLeadingItems { sources }),
					}
				}

				inputs
			},
		};
		let mut fused = fusion::fuse_lists(&self.policy, &inputs);

		fused.truncate(self.policy.top_k as usize);

		QueryOutcome::Fused(fused)
	}

	pub fn run(&self) -> AggregationRun {
		let mut run = AggregationRun::default();
		let top_k = self.policy.top_k as usize;

		for query_id in self.query_ids() {
			match self.fuse_query(query_id) {
				QueryOutcome::Fused(items) => {
					tracing::debug!(query_id, items = items.len(), "Fused query.");

					if items.is_empty() {
						run.empty.push(query_id.to_string());
					}

					run.fused += 1;

					let items = items.into_iter().map(|item| item.item_id).collect();

					if let Err(err) = run.result.insert(query_id, items, top_k) {
						tracing::warn!(query_id, error = %err, "Dropped fused row.");
					}
				},
				QueryOutcome::Skipped(reason) => {
					tracing::debug!(query_id, ?reason, "Skipped query.");

					if let Err(err) = run.result.insert(query_id, Vec::new(), top_k) {
						tracing::warn!(query_id, error = %err, "Dropped skipped row.");
					}

					run.skipped.push(SkippedQuery { query_id: query_id.to_string(), reason });
				},
			}
		}

		tracing::info!(
			mode = self.policy.mode.as_str(),
			gating = self.policy.gating.as_str(),
			sources = self.sources.len(),
			queries = run.query_count(),
			fused = run.fused,
			empty = run.empty.len(),
			skipped = run.skipped.len(),
			"Aggregation finished."
		);

		run
	}
}

/// Per-source contribution cap for adaptive gating, or the sources lacking a leading run.
fn adaptive_limit(names: &[&str], inputs: &[SourceInput<'_>]) -> Result<usize, Vec<String>> {
	let leading: Vec<usize> = inputs.iter().map(|input| input.list.leading_len()).collect();
	let without: Vec<String> = names
		.iter()
		.zip(&leading)
		.filter(|(_, len)| **len == 0)
		.map(|(name, _)| name.to_string())
		.collect();

	if !without.is_empty() {
		return Err(without);
	}

	let min = leading.iter().copied().min().unwrap_or(0);
	let max = leading.iter().copied().max().unwrap_or(0);

	Ok((2 * min).min(max))
}
