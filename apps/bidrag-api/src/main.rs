use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = bidrag_api::Args::parse();

	bidrag_api::run(args).await
}
