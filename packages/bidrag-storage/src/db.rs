use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::Result;

pub struct Db {
	pub pool: PgPool,
	pub statement_timeout_ms: u64,
}
impl Db {
	pub async fn connect(cfg: &bidrag_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool, statement_timeout_ms: cfg.statement_timeout_ms })
	}
}
