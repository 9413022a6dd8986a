use regex::Regex;
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

use crate::{
	BidragService, ChatMessage, Error, ResolvedNamespace, ResponseFormat, Result, ResultSet,
	RetrievedItem, SourcePath,
};

pub const NO_RESULTS_MESSAGE: &str = "검색 결과가 없습니다. 다른 검색어로 다시 시도해보세요.";
pub const NO_RESULTS_STATUS: &str = "no_results";

const SQL_OPEN: &str = "<sql>";
const SQL_CLOSE: &str = "</sql>";

const NOTICE_ID_PATTERN: &str = r"^[A-Za-z0-9-]+$";

const CORPUS_EXAMPLES: &str = "\
예시 1: 월별 유찰 건수
질문: 2023년에 유찰된 입찰 건수를 월별로 보여주세요
<thought_process>
1. bid_result_fails로 유찰 여부를, naramarket_bids로 공고 일자를 확인합니다.
2. 두 테이블을 bid_notice_no로 조인합니다.
3. 2023년만 남기고 월별로 묶어 건수를 셉니다.
</thought_process>
<sql>
SELECT
	EXTRACT(MONTH FROM nb.bid_notice_date) AS month,
	COUNT(*) AS fail_count
FROM bid_result_fails brf
JOIN naramarket_bids nb ON brf.bid_notice_no = nb.bid_notice_no
WHERE EXTRACT(YEAR FROM nb.bid_notice_date) = 2023
GROUP BY EXTRACT(MONTH FROM nb.bid_notice_date)
ORDER BY month;
</sql>

예시 2: 낙찰 상위 업체
질문: 낙찰 건수가 가장 많은 상위 5개 업체의 평균 입찰가격을 보여주세요
<thought_process>
1. bid_result_successes에서 openg_rank = 1인 행이 낙찰입니다.
2. 업체별로 낙찰 건수와 평균 입찰가격을 계산합니다.
3. 낙찰 건수 내림차순으로 5개만 남깁니다.
</thought_process>
<sql>
SELECT
	prcbdr_nm AS company_name,
	COUNT(*) AS success_count,
	AVG(bidprc_amt) AS avg_bid_amount
FROM bid_result_successes
WHERE openg_rank = 1
GROUP BY prcbdr_nm
ORDER BY success_count DESC
LIMIT 5;
</sql>";

const SCOPED_EXAMPLES: &str = "\
예시 1: 투찰 순위
질문: 입찰 참여자의 순위와 투찰 금액을 보여주세요
<thought_process>
1. bid_result_successes에 순위, 업체, 금액이 있습니다.
2. 선택된 공고번호로 거릅니다.
3. 순위 오름차순으로 정렬합니다.
</thought_process>
<sql>
SELECT
	openg_rank AS rank,
	prcbdr_nm AS company_name,
	bidprc_amt AS bid_amount,
	bidprc_rt AS bid_ratio
FROM bid_result_successes
WHERE bid_notice_no = '{notice_id}'
ORDER BY openg_rank;
</sql>

예시 2: 진행 상태와 일정
질문: 진행상태와 세부 일정을 보여주세요
<thought_process>
1. naramarket_bids에 상태와 일정 컬럼이 있습니다.
2. 선택된 공고번호 한 건만 조회합니다.
</thought_process>
<sql>
SELECT
	bid_prgs_stat_nm AS status,
	bid_begin_dt AS bid_begin,
	bid_close_dt AS bid_close,
	openg_dt AS open_date
FROM naramarket_bids
WHERE bid_notice_no = '{notice_id}';
</sql>";

const RULES: &str = "\
먼저 <thought_process> 태그 안에 다음 순서로 사고 과정을 적으세요.
1. 필요한 테이블과 컬럼
2. 테이블 간 조인 관계
3. 필터링 조건
4. 집계와 계산
5. 정렬과 제한

그 다음 <sql> 태그 안에 최종 SQL 한 문장만 작성하세요.

주의사항:
1. PostgreSQL 문법을 사용합니다.
2. 날짜와 시간 추출에는 EXTRACT()를 사용합니다.
3. 조인은 명시적 JOIN 구문으로 작성합니다.
4. 스키마에 정의된 컬럼만 사용합니다.
5. 결과 컬럼에는 알아보기 쉬운 별칭을 붙입니다.
6. 조회만 수행하며 데이터를 변경하는 구문은 쓰지 않습니다.";

/// Generated statement plus the uniform result shape it produced.
#[derive(Debug, Clone)]
pub struct StructuredResult {
	pub sql: String,
	pub result: ResultSet,
}

/// Returns the trimmed text between the first `<sql>` and the `</sql>` that follows it.
pub fn extract_sql(response: &str) -> Result<String> {
	let Some(start) = response.find(SQL_OPEN) else {
		return Err(Error::GenerationFormat { message: "Missing <sql> open tag.".to_string() });
	};
	let body = &response[start + SQL_OPEN.len()..];
	let Some(end) = body.find(SQL_CLOSE) else {
		return Err(Error::GenerationFormat { message: "Missing </sql> close tag.".to_string() });
	};
	let sql = body[..end].trim();

	if sql.is_empty() {
		return Err(Error::GenerationFormat { message: "Query block is empty.".to_string() });
	}

	Ok(sql.to_string())
}

/// Builds the generation prompt; a confirmed notice switches to the scoped variant.
pub fn build_prompt(
	schema: &str,
	max_rows: u32,
	namespace: Option<&ResolvedNamespace>,
	today: Date,
) -> Result<String> {
	let Some(namespace) = namespace else {
		return Ok(format!(
			"당신은 PostgreSQL 전문가입니다.\n\
			 입찰공고 데이터베이스 전체를 대상으로 하는 통계, 집계 질문을 SQL로 변환합니다.\n\n\
			 오늘 날짜: {today}\n\n\
			 데이터베이스 스키마:\n{schema}\n\
			 최대 반환 결과 수: {max_rows}\n\n\
			 {CORPUS_EXAMPLES}\n\n\
			 {RULES}"
		));
	};

	let notice_id = namespace.as_str();

	if !Regex::new(NOTICE_ID_PATTERN).map(|re| re.is_match(notice_id)).unwrap_or(false) {
		return Err(Error::InvalidRequest {
			message: format!("Notice id {notice_id:?} contains unsupported characters."),
		});
	}

	let examples = SCOPED_EXAMPLES.replace("{notice_id}", notice_id);

	Ok(format!(
		"당신은 PostgreSQL 전문가입니다.\n\
		 선택된 입찰공고({notice_id})에 대한 질문을 SQL로 변환합니다.\n\
		 모든 쿼리는 반드시 bid_notice_no = '{notice_id}' 조건으로 이 공고만 조회해야 하며, \
		 다른 공고에 대해서는 답하지 않습니다.\n\n\
		 오늘 날짜: {today}\n\n\
		 데이터베이스 스키마:\n{schema}\n\
		 최대 반환 결과 수: {max_rows}\n\n\
		 {examples}\n\n\
		 {RULES}\n\
		 7. 항상 선택된 공고번호({notice_id})에 대한 분석만 수행합니다."
	))
}

/// Shapes executed rows into a structured result set; zero rows become one sentinel item.
pub fn rows_to_result_set(sql: &str, rows: Vec<Map<String, Value>>) -> ResultSet {
	let mut base = Map::new();

	base.insert("sql_query".to_string(), Value::String(sql.to_string()));

	if rows.is_empty() {
		let mut metadata = base;

		metadata.insert("status".to_string(), Value::String(NO_RESULTS_STATUS.to_string()));

		let sentinel = RetrievedItem::new(NO_RESULTS_MESSAGE, metadata).with_score(0.0);

		return ResultSet::new(
			SourcePath::Structured,
			vec![sentinel],
			Some(Value::Array(Vec::new())),
		);
	}

	let items = rows
		.iter()
		.map(|row| {
			let content = Value::Object(row.clone()).to_string();

			RetrievedItem::new(content, base.clone()).with_score(1.0)
		})
		.collect();
	let raw = Value::Array(rows.into_iter().map(Value::Object).collect());

	ResultSet::new(SourcePath::Structured, items, Some(raw))
}

impl BidragService {
	/// Generates, extracts and executes one read-only statement.
	///
	/// Only the text inside the `<sql>` block ever reaches the store; a response without a
	/// well-formed block fails before any store call.
	pub async fn process_structured(
		&self,
		query: &str,
		namespace: Option<&ResolvedNamespace>,
	) -> Result<StructuredResult> {
		let today = OffsetDateTime::now_utc().date();
		let prompt = build_prompt(
			self.backends.store.schema_description(),
			self.cfg.sql.max_rows,
			namespace,
			today,
		)?;
		let messages = [ChatMessage::system(prompt), ChatMessage::user(query)];
		let response = self
			.deadline(
				"sql_generation",
				self.providers.llm.complete(
					&self.cfg.providers.sql_generator,
					&messages,
					ResponseFormat::Text,
				),
			)
			.await?;
		let sql = extract_sql(&response).inspect_err(|err| {
			tracing::warn!(error = %err, "Generated response has no usable query block.");
		})?;

		tracing::info!(scoped = namespace.is_some(), sql = %sql, "Executing generated query.");

		let rows = self
			.deadline("sql_execution", self.backends.store.execute(&sql))
			.await
			.map_err(|err| Error::Execution { message: err.to_string() })?;

		tracing::info!(rows = rows.len(), "Generated query executed.");

		Ok(StructuredResult { result: rows_to_result_set(&sql, rows), sql })
	}
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	use super::*;

	#[test]
	fn extracts_query_block() {
		let response = "<thought_process>월별 집계</thought_process>\n<sql>\nSELECT 1;\n</sql>";

		assert_eq!(extract_sql(response).expect("Expected a query."), "SELECT 1;");
	}

	#[test]
	fn missing_or_empty_blocks_are_format_errors() {
		for response in ["SELECT 1", "<sql>SELECT 1", "SELECT 1</sql>", "<sql>  </sql>"] {
			let err = extract_sql(response).expect_err("Expected a format error.");

			assert!(matches!(err, Error::GenerationFormat { .. }), "Unexpected: {response:?}");
		}
	}

	#[test]
	fn scoped_prompt_pins_the_notice() {
		let ns = ResolvedNamespace::new("20240512345-00");
		let prompt =
			build_prompt("Table: naramarket_bids", 10, Some(&ns), date!(2024 - 06 - 01))
				.expect("Expected a prompt.");

		assert!(prompt.contains("bid_notice_no = '20240512345-00'"));
		assert!(prompt.contains("오늘 날짜: 2024-06-01"));
		assert!(!prompt.contains("{notice_id}"));
	}

	#[test]
	fn unscoped_prompt_has_no_notice_filter() {
		let prompt = build_prompt("Table: naramarket_bids", 10, None, date!(2024 - 06 - 01))
			.expect("Expected a prompt.");

		assert!(prompt.contains("최대 반환 결과 수: 10"));
		assert!(!prompt.contains("선택된 입찰공고"));
	}

	#[test]
	fn notice_ids_with_quotes_are_rejected() {
		let ns = ResolvedNamespace::new("1' OR '1'='1");
		let err = build_prompt("", 10, Some(&ns), date!(2024 - 06 - 01))
			.expect_err("Expected a rejection.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	#[test]
	fn zero_rows_become_one_sentinel() {
		let result = rows_to_result_set("SELECT 1", Vec::new());

		assert_eq!(result.len(), 1);
		assert_eq!(result.items()[0].score, Some(0.0));
		assert_eq!(result.items()[0].content, NO_RESULTS_MESSAGE);
		assert_eq!(result.items()[0].metadata["status"], NO_RESULTS_STATUS);
		assert_eq!(result.source_path(), SourcePath::Structured);
	}

	#[test]
	fn rows_keep_order_and_full_score() {
		let mut row = Map::new();

		row.insert("month".to_string(), Value::from(1));
		row.insert("fail_count".to_string(), Value::from(12));

		let result = rows_to_result_set("SELECT ...", vec![row]);

		assert_eq!(result.items()[0].content, r#"{"month":1,"fail_count":12}"#);
		assert_eq!(result.items()[0].score, Some(1.0));
		assert_eq!(result.items()[0].metadata["sql_query"], "SELECT ...");
	}
}
