use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rankfuse_config::Config;
use rankfuse_domain::{AggregatedResult, ColumnKind, EntityWeights};
use rankfuse_providers::{Cascade, ElasticsearchProvider, QdrantProvider, RankedListProvider};
use rankfuse_storage::{json, models::OutputLayout, ranked_csv};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceKind {
	Elasticsearch,
	Qdrant,
}
impl SourceKind {
	fn default_column_kind(self) -> ColumnKind {
		match self {
			Self::Elasticsearch => ColumnKind::ArticleId,
			Self::Qdrant => ColumnKind::ImageId,
		}
	}
}

#[derive(Debug, Parser)]
#[command(
	version = rankfuse_cli::VERSION,
	rename_all = "kebab",
	styles = rankfuse_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of queries.
	#[arg(long, short = 'q', value_name = "FILE")]
	pub queries: PathBuf,
	#[arg(long, short = 's', value_enum)]
	pub source: SourceKind,
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: PathBuf,
	#[arg(long, value_name = "N")]
	pub max_queries: Option<usize>,
	/// Article ranked-list CSV; restricts image search to the images of each query's articles.
	#[arg(long, value_name = "FILE")]
	pub candidates: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CollectOutput {
	pub csv: PathBuf,
	pub source: String,
	pub queries: usize,
	pub empty: usize,
	pub failed: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = rankfuse_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let output = collect(&config, &args).await?;
	let json = serde_json::to_string(&output)?;

	println!("{json}");

	Ok(())
}

pub fn build_provider(
	config: &Config,
	source: SourceKind,
	candidates: Option<&Path>,
) -> color_eyre::Result<Box<dyn RankedListProvider>> {
	if candidates.is_some() && source != SourceKind::Qdrant {
		return Err(eyre::eyre!("--candidates only applies to the qdrant source."));
	}


	match source {
		SourceKind::Elasticsearch => {
			let cfg = config
				.providers
				.elasticsearch
				.as_ref()
				.ok_or_else(|| eyre::eyre!("providers.elasticsearch is not configured."))?;

			Ok(Box::new(ElasticsearchProvider::new(cfg, EntityWeights::from_config(config))?))
		},
		SourceKind::Qdrant => {
			let cfg = config
				.providers
				.qdrant
				.as_ref()
				.ok_or_else(|| eyre::eyre!("providers.qdrant is not configured."))?;

			let provider = QdrantProvider::new(cfg)?;
			let Some(candidates) = candidates else {
				return Ok(Box::new(provider));
			};
			let cascade = cfg.cascade.as_ref().ok_or_else(|| {
				eyre::eyre!("--candidates needs providers.qdrant.cascade to be configured.")
			})?;
			let article_images = json::read_article_map(&cascade.article_map)?;
			let articles = ranked_csv::read_ranked_lists(candidates)?;

			if articles.column_kind != ColumnKind::ArticleId {
				tracing::warn!(
					path = %candidates.display(),
					kind = articles.column_kind.as_str(),
					"Candidate file does not hold article ids."
				);
			}

			let cascade = Cascade::new(cascade, article_images, articles.lists)?;

			Ok(Box::new(provider.with_cascade(cascade)))
		},
	}
}

pub async fn collect(config: &Config, args: &Args) -> color_eyre::Result<CollectOutput> {
	let provider = build_provider(config, args.source, args.candidates.as_deref())?;
	let mut queries = json::read_queries(&args.queries)?;

	if let Some(max) = args.max_queries {
		queries.truncate(max);
	}

	let width = provider.width();
	let mut result = AggregatedResult::new();
	let mut empty = 0;
	let mut failed = 0;

	for query in &queries {
		let items = match provider.ranked_list(query).await {
			Ok(list) => list.item_ids().map(str::to_string).collect::<Vec<_>>(),
			Err(err) => {
				tracing::warn!(
					error = %err,
					query_id = %query.id,
					provider = provider.name(),
					"Provider call failed; writing an empty row."
				);

				failed += 1;

				Vec::new()
			},
		};

		if items.is_empty() {
			empty += 1;
		}

		result.insert(query.id.as_str(), items, width)?;
	}

	let column_kind = match &config.output.column_kind {
		Some(raw) => ColumnKind::parse(raw)
			.ok_or_else(|| eyre::eyre!("Unknown output column kind {raw:?}."))?,
		None => args.source.default_column_kind(),
	};
	let layout = OutputLayout { column_kind, width, placeholder: config.output.placeholder.clone() };

	ranked_csv::write_aggregated(&args.output, &result, &layout)?;

	tracing::info!(
		provider = provider.name(),
		queries = queries.len(),
		empty,
		failed,
		"Collection finished."
	);

	Ok(CollectOutput {
		csv: args.output.clone(),
		source: provider.name().to_string(),
		queries: queries.len(),
		empty,
		failed,
	})
}
