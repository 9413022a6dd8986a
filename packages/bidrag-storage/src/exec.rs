use serde_json::{Map, Number, Value};
use sqlx::{Column, Row, TypeInfo, postgres::PgRow};

use crate::{Error, Result, db::Db};

/// Runs one generated statement, unmodified, inside a read-only transaction and returns its rows
/// as JSON objects in column order.
///
/// The statement goes over the simple query protocol, so every value arrives in its text form and
/// is typed from the column metadata. Repeated column names get a numeric suffix (`cnt`,
/// `cnt_2`). The transaction is always rolled back and `statement_timeout` is applied with
/// `SET LOCAL`, so neither leaks onto the pooled connection.
pub async fn execute_read_only(db: &Db, sql: &str) -> Result<Vec<Map<String, Value>>> {
	let statement = single_statement(sql)?;
	let mut tx = db.pool.begin().await?;

	sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await?;
	sqlx::query(&format!("SET LOCAL statement_timeout = {}", db.statement_timeout_ms))
		.execute(&mut *tx)
		.await?;

	let rows = sqlx::Executor::fetch_all(&mut *tx, sqlx::raw_sql(statement)).await?;

	tx.rollback().await?;

	tracing::debug!(rows = rows.len(), "Read-only statement executed.");

	rows.iter().map(row_to_map).collect()
}

/// Strips trailing semicolons and rejects empty or multi-statement input.
pub fn single_statement(sql: &str) -> Result<&str> {
	let statement = sql.trim().trim_end_matches(|ch: char| ch == ';' || ch.is_whitespace());

	if statement.is_empty() {
		return Err(Error::InvalidArgument("Statement is empty.".to_string()));
	}
	if statement.contains(';') {
		return Err(Error::InvalidArgument("Only a single statement may be executed.".to_string()));
	}

	Ok(statement)
}

/// Makes column names unique in order of appearance.
pub fn unique_column_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for name in names {
		let mut candidate = name.to_string();
		let mut suffix = 2;

		while out.contains(&candidate) {
			candidate = format!("{name}_{suffix}");
			suffix += 1;
		}

		out.push(candidate);
	}

	out
}

/// Converts one text-format value according to its Postgres type name.
pub fn text_to_json(type_name: &str, raw: Option<String>) -> Value {
	let Some(raw) = raw else { return Value::Null };

	match type_name {
		"BOOL" => match raw.as_str() {
			"t" => Value::Bool(true),
			"f" => Value::Bool(false),
			_ => Value::String(raw),
		},
		"INT2" | "INT4" | "INT8" | "OID" =>
			raw.parse::<i64>().map(Value::from).unwrap_or(Value::String(raw)),
		"FLOAT4" | "FLOAT8" | "NUMERIC" => numeric_to_json(raw),
		"JSON" | "JSONB" => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
		_ => Value::String(raw),
	}
}

fn numeric_to_json(raw: String) -> Value {
	if let Ok(int) = raw.parse::<i64>() {
		return Value::from(int);
	}

	raw.parse::<f64>()
		.ok()
		.and_then(Number::from_f64)
		.map(Value::Number)
		.unwrap_or(Value::String(raw))
}

fn row_to_map(row: &PgRow) -> Result<Map<String, Value>> {
	let columns = row.columns();
	let names = unique_column_names(columns.iter().map(|column| column.name()));
	let mut map = Map::with_capacity(columns.len());

	for ((idx, column), name) in columns.iter().enumerate().zip(names) {
		let raw: Option<String> = row.try_get_unchecked(idx)?;

		map.insert(name, text_to_json(column.type_info().name(), raw));
	}

	Ok(map)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_semicolons_are_stripped() {
		let sql = "SELECT 1 AS month ;\n ; ";

		assert_eq!(single_statement(sql).expect("Expected a statement."), "SELECT 1 AS month");
	}

	#[test]
	fn multiple_statements_are_rejected() {
		let err = single_statement("SELECT 1; DROP TABLE naramarket_bids")
			.expect_err("Expected a rejection.");

		assert!(matches!(err, Error::InvalidArgument(_)));
		assert!(single_statement(" ; ").is_err());
	}

	#[test]
	fn trailing_line_comment_is_kept_verbatim() {
		let sql = "SELECT 1 AS m\nORDER BY m -- monthly order";

		assert_eq!(single_statement(sql).expect("Expected a statement."), sql);
	}

	#[test]
	fn repeated_column_names_get_suffixes() {
		let names = unique_column_names(["cnt", "name", "cnt", "cnt_2", "name"]);

		assert_eq!(names, vec!["cnt", "name", "cnt_2", "cnt_2_2", "name_2"]);
	}

	#[test]
	fn text_values_follow_column_types() {
		assert_eq!(text_to_json("INT8", Some("12".to_string())), Value::from(12));
		assert_eq!(text_to_json("NUMERIC", Some("1500000".to_string())), Value::from(1_500_000));
		assert_eq!(text_to_json("NUMERIC", Some("2.5".to_string())), Value::from(2.5));
		assert_eq!(text_to_json("NUMERIC", Some("NaN".to_string())), Value::from("NaN"));
		assert_eq!(text_to_json("BOOL", Some("t".to_string())), Value::Bool(true));
		assert_eq!(text_to_json("JSONB", Some(r#"{"a":1}"#.to_string()))["a"], 1);
		assert_eq!(text_to_json("DATE", Some("2023-03-01".to_string())), Value::from("2023-03-01"));
		assert_eq!(text_to_json("TEXT", None), Value::Null);
	}
}
