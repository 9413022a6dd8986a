//! Rendering of structured results for display.

use regex::Regex;
use serde_json::{Map, Number, Value};

use bidrag_storage::schema;

use crate::{
	BidragService, ChatMessage, Error, Result, ResultSet, SourcePath, StructuredResult,
	sql::{NO_RESULTS_MESSAGE, NO_RESULTS_STATUS},
	stream::{StaticStream, TextStream},
};

const DATE_PATTERN: &str =
	r"^(\d{4}-\d{2}-\d{2})(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}(?::?\d{2})?)?)?$";
const FORMAT_PROMPT: &str = "\
SQL 조회 결과를 사용자가 읽기 쉬운 답변으로 정리합니다.

다음 순서로 응답하세요.
1. 결과를 한 문장으로 요약합니다.
2. 제공된 마크다운 표 초안을 다듬어 출력합니다. 코드 블록으로 감싸지 않습니다.
3. 컬럼명은 한글로, 금액은 천 단위 콤마로, 날짜는 YYYY-MM-DD로 표기합니다.
4. 표 초안에 없는 값을 지어내지 않습니다.

결과가 없으면 \"검색 결과가 없습니다. 다른 검색어나 조건으로 다시 시도해보세요.\"라고만 답합니다.";

/// Markdown lines for a structured result set; the no-results sentinel renders as its message.
pub fn render_result_lines(result: &ResultSet) -> Vec<String> {
	let mut rows: Vec<Map<String, Value>> = Vec::with_capacity(result.len());

	for item in result.items() {
		if item.metadata.get("status").and_then(Value::as_str) == Some(NO_RESULTS_STATUS) {
			return vec![NO_RESULTS_MESSAGE.to_string()];
		}

		match serde_json::from_str::<Value>(&item.content) {
			Ok(Value::Object(row)) => rows.push(row),
			_ => {
				let mut row = Map::new();

				row.insert("result".to_string(), Value::String(item.content.clone()));
				rows.push(row);
			},
		}
	}

	render_markdown_table(&rows)
}

pub fn render_markdown_table(rows: &[Map<String, Value>]) -> Vec<String> {
	let mut columns: Vec<&str> = Vec::new();

	for row in rows {
		for key in row.keys() {
			if !columns.contains(&key.as_str()) {
				columns.push(key.as_str());
			}
		}
	}

	if columns.is_empty() {
		return vec![NO_RESULTS_MESSAGE.to_string()];
	}

	let date_re = Regex::new(DATE_PATTERN).ok();
	let header: Vec<String> = columns
		.iter()
		.map(|column| escape_cell(schema::column_label(column).unwrap_or(column)))
		.collect();
	let mut lines = Vec::with_capacity(rows.len() + 2);

	lines.push(format!("| {} |", header.join(" | ")));
	lines.push(format!("|{}", " --- |".repeat(columns.len())));

	for row in rows {
		let cells: Vec<String> = columns
			.iter()
			.map(|column| {
				let value = row.get(*column).unwrap_or(&Value::Null);

				escape_cell(&format_cell(column, value, date_re.as_ref()))
			})
			.collect();

		lines.push(format!("| {} |", cells.join(" | ")));
	}

	lines
}

pub fn format_cell(column: &str, value: &Value, date_re: Option<&Regex>) -> String {
	match value {
		Value::Null => String::new(),
		Value::Bool(flag) => flag.to_string(),
		Value::Number(number) =>
			if is_identifier_column(column) {
				number.to_string()
			} else {
				format_number(number)
			},
		Value::String(text) => normalize_date(text, date_re),
		other => other.to_string(),
	}
}

fn is_identifier_column(column: &str) -> bool {
	let column = column.to_ascii_lowercase();

	matches!(column.as_str(), "year" | "month" | "day" | "rank" | "openg_rank")
		|| column.ends_with("_year")
		|| column.ends_with("_month")
		|| column.ends_with("_no")
}

fn format_number(number: &Number) -> String {
	if let Some(value) = number.as_i64() {
		return group_digits(&value.unsigned_abs().to_string(), value < 0);
	}
	if let Some(value) = number.as_u64() {
		return group_digits(&value.to_string(), false);
	}

	let Some(value) = number.as_f64() else { return number.to_string() };

	if !value.is_finite() {
		return number.to_string();
	}

	let rendered = format!("{:.2}", value.abs());
	let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
	let frac_part = frac_part.trim_end_matches('0');
	let negative = value < 0.0 && rendered.chars().any(|ch| ch.is_ascii_digit() && ch != '0');
	let grouped = group_digits(int_part, negative);

	if frac_part.is_empty() { grouped } else { format!("{grouped}.{frac_part}") }
}

fn group_digits(digits: &str, negative: bool) -> String {
	let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

	if negative {
		out.push('-');
	}

	for (i, ch) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			out.push(',');
		}

		out.push(ch);
	}

	out
}

fn normalize_date(text: &str, date_re: Option<&Regex>) -> String {
	date_re
		.and_then(|re| re.captures(text.trim()))
		.and_then(|caps| caps.get(1))
		.map(|day| day.as_str().to_string())
		.unwrap_or_else(|| text.to_string())
}

fn escape_cell(text: &str) -> String {
	text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

impl BidragService {
	/// Streams a readable rendering of a structured result.
	///
	/// `table` mode streams the local rendering line by line; `llm` mode hands it to the responder
	/// as a draft together with the generated statement.
	pub async fn format_structured(
		&self,
		query: &str,
		structured: &StructuredResult,
	) -> Result<TextStream> {
		if structured.result.source_path() != SourcePath::Structured {
			return Err(Error::InvalidRequest {
				message: "Only structured results can be formatted as tables.".to_string(),
			});
		}

		let lines = render_result_lines(&structured.result);

		if self.cfg.pipeline.format_mode == "table" {
			let chunks = lines.into_iter().map(|line| format!("{line}\n"));

			return Ok(Box::new(StaticStream::new(chunks)));
		}

		let has_result = structured.result.items().iter().all(|item| {
			item.metadata.get("status").and_then(Value::as_str) != Some(NO_RESULTS_STATUS)
		});
		let user = format!(
			"질문: {query}\n\nSQL 쿼리:\n{sql}\n\n결과 존재 여부: {has_result}\n\n표 초안:\n{table}",
			sql = structured.sql,
			table = lines.join("\n"),
		);
		let messages = [ChatMessage::system(FORMAT_PROMPT), ChatMessage::user(user)];

		self.open_stream(&self.cfg.providers.responder, &messages).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
		pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
	}

	#[test]
	fn numbers_get_thousands_separators() {
		let cell = |column: &str, value: Value| format_cell(column, &value, None);

		assert_eq!(cell("avg_budget", Value::from(1_234_567_i64)), "1,234,567");
		assert_eq!(cell("bid_amount", Value::from(-1_000_i64)), "-1,000");
		assert_eq!(cell("avg_bid_amount", Value::from(1_234_567.891)), "1,234,567.89");
		assert_eq!(cell("bid_ratio", Value::from(87.5)), "87.5");
		assert_eq!(cell("count", Value::from(999_i64)), "999");
		assert_eq!(cell("year", Value::from(2023_i64)), "2023");
	}

	#[test]
	fn dates_are_normalized() {
		let re = Regex::new(DATE_PATTERN).ok();

		for raw in ["2024-05-01", "2024-05-01T10:00:00", "2024-05-01 10:00:00.123+09:00"] {
			assert_eq!(format_cell("bid_close", &Value::from(raw), re.as_ref()), "2024-05-01");
		}

		let remark = format_cell("rmrk", &Value::from("2024-05-01 마감"), re.as_ref());

		assert_eq!(remark, "2024-05-01 마감");
	}

	#[test]
	fn table_uses_column_labels_and_row_order() {
		let rows = vec![
			row(&[("month", Value::from(1)), ("fail_count", Value::from(1_204))]),
			row(&[("month", Value::from(2)), ("fail_count", Value::from(87))]),
		];
		let lines = render_markdown_table(&rows);

		assert_eq!(lines[0], "| 월 | 유찰 건수 |");
		assert_eq!(lines[1], "| --- | --- |");
		assert_eq!(lines[2], "| 1 | 1,204 |");
		assert_eq!(lines[3], "| 2 | 87 |");
	}

	#[test]
	fn cells_escape_pipes_and_newlines() {
		let rows = vec![row(&[("rmrk", Value::from("a|b\nc"))])];

		assert_eq!(render_markdown_table(&rows)[2], "| a\\|b c |");
	}

	#[test]
	fn sentinel_renders_message() {
		let result = crate::sql::rows_to_result_set("SELECT 1", Vec::new());

		assert_eq!(render_result_lines(&result), vec![NO_RESULTS_MESSAGE.to_string()]);
	}
}
