// crates.io
use clap::Parser;
// self
use rankfuse_collect::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	rankfuse_collect::run(args).await
}
