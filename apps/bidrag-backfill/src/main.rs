use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = bidrag_backfill::Args::parse();

	bidrag_backfill::run(args).await
}
