use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre;
use serde::Serialize;
use time::{OffsetDateTime, macros::format_description};
use tracing_subscriber::EnvFilter;

use rankfuse_config::Config;
use rankfuse_domain::ColumnKind;
use rankfuse_service::{
	Aggregator, FusionPolicy, RunReport, Source, SourceArg, report::RunSummary, resolve_names,
};
use rankfuse_storage::{json, models::OutputLayout, ranked_csv};

#[derive(Debug, Parser)]
#[command(
	version = rankfuse_cli::VERSION,
	rename_all = "kebab",
	styles = rankfuse_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Ranked-list files to fuse, as `name=path` or `path`.
	#[arg(value_name = "INPUT", required = true, num_args = 1..)]
	pub inputs: Vec<String>,
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
	#[arg(long, value_name = "MODE")]
	pub mode: Option<String>,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
	#[arg(long, value_name = "N")]
	pub rrf_k: Option<u32>,
	#[arg(long, value_name = "GATING")]
	pub gating: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RerankOutput {
	pub csv: PathBuf,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub report: Option<PathBuf>,
	pub policy_id: String,
	pub summary: RunSummary,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = rankfuse_config::read(&args.config)?;

	apply_overrides(&mut config, &args);
	rankfuse_config::validate(&config)?;

	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let output = rerank(&config, &args.inputs, args.output.as_deref(), OffsetDateTime::now_utc())?;
	let json = serde_json::to_string(&output)?;

	println!("{json}");

	Ok(())
}

/// Command-line values win over the file; they are checked together with it afterwards.
pub fn apply_overrides(config: &mut Config, args: &Args) {
	if let Some(mode) = &args.mode {
		config.fusion.mode = mode.trim().to_ascii_lowercase();
	}
	if let Some(top_k) = args.top_k {
		config.fusion.top_k = top_k;
	}
	if let Some(rrf_k) = args.rrf_k {
		config.fusion.rrf_k = rrf_k;
	}
	if let Some(gating) = &args.gating {
		config.fusion.gating = gating.trim().to_ascii_lowercase();
	}
}

pub fn rerank(
	config: &Config,
	inputs: &[String],
	output: Option<&Path>,
	now: OffsetDateTime,
) -> color_eyre::Result<RerankOutput> {
	let policy = FusionPolicy::from_config(&config.fusion)?;
	let args = inputs.iter().map(|raw| SourceArg::parse(raw)).collect::<Result<Vec<_>, _>>()?;
	let names = resolve_names(&args)?;
	let mut sources = Vec::with_capacity(args.len());

	for (arg, name) in args.iter().zip(names) {
		sources.push(Source::load(name, &arg.path)?);
	}

	let column_kind = output_column_kind(config, &sources)?;
	let aggregator = Aggregator::new(policy, sources)?;
	let policy = aggregator.policy();
	let csv_path = match output {
		Some(path) => path.to_path_buf(),
		None => default_output_path(&config.output.dir, policy.mode.as_str(), now)?,
	};
	let layout = OutputLayout {
		column_kind,
		width: policy.top_k as usize,
		placeholder: config.output.placeholder.clone(),
	};
	let policy_id = policy.policy_id()?;
	let run = aggregator.run();

	ranked_csv::write_aggregated(&csv_path, &run.result, &layout)?;

	let report = RunReport::new(&aggregator, run)?;
	let report_path = if config.output.write_json {
		let path = csv_path.with_extension("json");

		json::write_json(&path, &report)?;

		Some(path)
	} else {
		None
	};

	tracing::info!(
		csv = %csv_path.display(),
		policy_id = %policy_id,
		queries = report.summary.query_count,
		"Rerank finished."
	);

	Ok(RerankOutput { csv: csv_path, report: report_path, policy_id, summary: report.summary })
}

/// `<dir>/fused_<mode>_<YYYYmmdd_HHMMSS>.csv`.
pub fn default_output_path(dir: &Path, mode: &str, now: OffsetDateTime) -> color_eyre::Result<PathBuf> {
	let stamp = now.format(format_description!("[year][month][day]_[hour][minute][second]"))?;

	Ok(dir.join(format!("fused_{mode}_{stamp}.csv")))
}

fn output_column_kind(config: &Config, sources: &[Source]) -> color_eyre::Result<ColumnKind> {
	if let Some(raw) = &config.output.column_kind {
		return ColumnKind::parse(raw)
			.ok_or_else(|| eyre::eyre!("Unknown output column kind {raw:?}."));
	}

	let first = sources.first().map(|source| source.column_kind).unwrap_or_default();

	for source in sources.iter().skip(1) {
		if source.column_kind != first {
			tracing::warn!(
				source = %source.name,
				kind = source.column_kind.as_str(),
				output_kind = first.as_str(),
				"Source column kind differs from the output column kind."
			);
		}
	}

	Ok(first)
}
