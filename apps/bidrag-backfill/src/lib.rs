pub mod backfill;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bidrag_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = bidrag_cli::VERSION,
	rename_all = "kebab",
	styles = bidrag_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Notices embedded per transaction.
	#[arg(long, default_value_t = 100)]
	pub batch_size: u32,
	/// Stop after this many batches even if notices remain.
	#[arg(long)]
	pub max_batches: Option<u32>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = bidrag_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if args.batch_size == 0 {
		return Err(color_eyre::eyre::eyre!("--batch-size must be greater than zero."));
	}

	let db = Db::connect(&config.storage.postgres).await?;
	let report = backfill::run_backfill(
		&db,
		&config.providers.embedding,
		args.batch_size,
		args.max_batches,
	)
	.await?;

	tracing::info!(
		batches = report.batches,
		embedded = report.embedded,
		"Embedding backfill finished."
	);

	Ok(())
}
