// crates.io
use clap::Parser;
// self
use rankfuse_rerank::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	rankfuse_rerank::run(args)
}
