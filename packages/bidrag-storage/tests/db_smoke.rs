use bidrag_config::Postgres;
use bidrag_storage::{Error, db::Db, exec, notices};

fn env_dsn() -> Option<String> {
	std::env::var("BIDRAG_PG_DSN").ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn connect(dsn: String) -> Db {
	let cfg = Postgres { dsn, pool_max_conns: 1, statement_timeout_ms: 2_000 };

	Db::connect(&cfg).await.expect("Failed to connect to Postgres.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn read_only_execution_returns_ordered_rows() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping read_only_execution_returns_ordered_rows; set BIDRAG_PG_DSN to run.");

		return;
	};
	let db = connect(dsn).await;
	let rows = exec::execute_read_only(
		&db,
		"SELECT m AS month, m * 2 AS fail_count FROM generate_series(1, 3) AS m ORDER BY m;",
	)
	.await
	.expect("Failed to execute statement.");

	assert_eq!(rows.len(), 3);
	assert_eq!(rows[0]["month"], 1);
	assert_eq!(rows[2]["fail_count"], 6);
	assert_eq!(rows[0].keys().next().map(String::as_str), Some("month"));
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn unknown_relation_surfaces_as_sqlx_error() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping unknown_relation_surfaces_as_sqlx_error; set BIDRAG_PG_DSN to run.");

		return;
	};
	let db = connect(dsn).await;
	let err = exec::execute_read_only(&db, "SELECT * FROM bidrag_missing_table")
		.await
		.expect_err("Expected the statement to fail.");

	assert!(matches!(err, Error::Sqlx(_)));
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn statement_timeout_cancels_slow_queries() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping statement_timeout_cancels_slow_queries; set BIDRAG_PG_DSN to run.");

		return;
	};
	let db = connect(dsn).await;
	let err = exec::execute_read_only(&db, "SELECT pg_sleep(5)")
		.await
		.expect_err("Expected a statement timeout.");

	assert!(matches!(err, Error::Sqlx(_)));
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn trailing_line_comment_runs_as_written() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping trailing_line_comment_runs_as_written; set BIDRAG_PG_DSN to run.");

		return;
	};
	let db = connect(dsn).await;
	let rows = exec::execute_read_only(
		&db,
		"SELECT m AS month\nFROM generate_series(1, 3) AS m\nORDER BY m -- monthly order",
	)
	.await
	.expect("Failed to execute statement.");

	assert_eq!(rows.len(), 3);
	assert_eq!(rows[2]["month"], 3);
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn repeated_column_names_are_kept_apart() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping repeated_column_names_are_kept_apart; set BIDRAG_PG_DSN to run.");

		return;
	};
	let db = connect(dsn).await;
	let rows = exec::execute_read_only(
		&db,
		"SELECT 1 AS cnt, 2 AS cnt, SUM(m) AS total, 'x'::text AS name \
		 FROM generate_series(1, 4) AS m",
	)
	.await
	.expect("Failed to execute statement.");
	let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();

	assert_eq!(keys, vec!["cnt", "cnt_2", "total", "name"]);
	assert_eq!(rows[0]["cnt"], 1);
	assert_eq!(rows[0]["cnt_2"], 2);
	assert_eq!(rows[0]["total"], 10);
	assert_eq!(rows[0]["name"], "x");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BIDRAG_PG_DSN to run."]
async fn pending_embeddings_skip_notices_without_text() {
	let Some(dsn) = env_dsn() else {
		eprintln!(
			"Skipping pending_embeddings_skip_notices_without_text; set BIDRAG_PG_DSN to run."
		);

		return;
	};
	let db = connect(dsn).await;
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	sqlx::query(
		"\
CREATE TEMP TABLE naramarket_bids (
	id bigint PRIMARY KEY,
	bid_notice_nm text,
	ntce_kind_nm text,
	dminstt_nm text,
	pub_prcrmnt_clsfc_nm text,
	content_embedding text
) ON COMMIT DROP",
	)
	.execute(&mut *tx)
	.await
	.expect("Failed to create temp table.");
	sqlx::query(
		"\
INSERT INTO naramarket_bids VALUES
	(1, '클라우드 보안', NULL, '행정안전부', NULL, NULL),
	(2, NULL, '  ', '', NULL, NULL),
	(3, NULL, NULL, NULL, NULL, NULL),
	(4, '드론 구매', NULL, NULL, NULL, '[0.1]'),
	(5, NULL, NULL, NULL, '정보시스템', NULL)",
	)
	.execute(&mut *tx)
	.await
	.expect("Failed to seed temp table.");

	let pending =
		notices::pending_embeddings_tx(&mut tx, 10).await.expect("Failed to select pending rows.");
	let ids: Vec<i64> = pending.iter().map(|source| source.id).collect();

	assert_eq!(ids, vec![1, 5]);

	tx.rollback().await.expect("Failed to roll back.");
}
