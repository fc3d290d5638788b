use std::path::PathBuf;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
	Error, Result,
	aggregator::{AggregationRun, Aggregator, SkippedQuery},
	policy::{FusionMode, Gating, TieBreakKey},
};
use rankfuse_domain::AggregatedResult;
use rankfuse_storage::models::RowRejection;

#[derive(Debug, Serialize)]
pub struct RunReport {
	pub run: RunMeta,
	pub summary: RunSummary,
	pub diagnostics: Diagnostics,
	pub results: AggregatedResult,
}

#[derive(Debug, Serialize)]
pub struct RunMeta {
	pub created_at: String,
	pub policy_id: String,
	pub mode: FusionMode,
	pub gating: Gating,
	pub top_k: u32,
	pub rrf_k: u32,
	pub depth: Option<u32>,
	pub tie_break: Vec<TieBreakKey>,
	pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Serialize)]
pub struct SourceSummary {
	pub name: String,
	pub path: Option<PathBuf>,
	pub weight: f64,
	pub queries: usize,
	pub rejected_rows: usize,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct RunSummary {
	pub query_count: usize,
	pub fused: usize,
	pub skipped: usize,
	pub empty: usize,
}

#[derive(Debug, Serialize)]
pub struct Diagnostics {
	pub rejected_rows: Vec<SourceRejection>,
	pub skipped_queries: Vec<SkippedQuery>,
}

#[derive(Debug, Serialize)]
pub struct SourceRejection {
	pub source: String,
	#[serde(flatten)]
	pub row: RowRejection,
}

impl RunReport {
	pub fn new(aggregator: &Aggregator, run: AggregationRun) -> Result<Self> {
		let created_at = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
			Error::Report { message: format!("Failed to format report timestamp: {err}") }
		})?;

		Self::with_timestamp(aggregator, run, created_at)
	}

	pub fn with_timestamp(
		aggregator: &Aggregator,
		run: AggregationRun,
		created_at: String,
	) -> Result<Self> {
		let policy = aggregator.policy();
		let sources = aggregator
			.sources()
			.iter()
			.enumerate()
			.map(|(index, source)| SourceSummary {
				name: source.name.clone(),
				path: source.path.clone(),
				weight: aggregator.weight(index),
				queries: source.lists.len(),
				rejected_rows: source.rejected.len(),
			})
			.collect();
		let rejected_rows = aggregator
			.sources()
			.iter()
			.flat_map(|source| {
				source
					.rejected
					.iter()
					.map(|row| SourceRejection { source: source.name.clone(), row: row.clone() })
			})
			.collect();
		let summary = RunSummary {
			query_count: run.query_count(),
			fused: run.fused,
			skipped: run.skipped.len(),
			empty: run.empty.len(),
		};

		Ok(Self {
			run: RunMeta {
				created_at,
				policy_id: policy.policy_id()?,
				mode: policy.mode,
				gating: policy.gating,
				top_k: policy.top_k,
				rrf_k: policy.rrf_k,
				depth: policy.depth,
				tie_break: policy.tie_break.clone(),
				sources,
			},
			summary,
			diagnostics: Diagnostics { rejected_rows, skipped_queries: run.skipped },
			results: run.result,
		})
	}
}
