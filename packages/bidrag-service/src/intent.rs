use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{BidragService, ChatMessage, Error, ResponseFormat, Result, SearchIntent, SearchType};

const INTENT_PROMPT: &str = "\
당신은 입찰공고 검색 시스템의 질의 분석 전문가입니다.
사용자의 질문을 분석해 다음 정보를 추출합니다.

1. keywords: 검색에 사용할 핵심 키워드 (1개 이상)
2. search_type: general, qualification, price, schedule 중 하나
3. filters: 질문에 드러난 검색 조건 (없으면 빈 객체)
4. confidence: 분석 신뢰도 (0.0 ~ 1.0)";
const INTENT_ACK: &str = "검색 의도를 분석하여 JSON 형식으로 응답하겠습니다.";
const INTENT_FORMAT: &str = "\
다음 형식의 JSON 객체로만 응답하세요.
{\"keywords\": [\"...\"], \"search_type\": \"general\", \"filters\": {}, \"confidence\": 0.9}";

#[derive(Deserialize)]
struct IntentPayload {
	keywords: Vec<String>,
	#[serde(default)]
	search_type: Option<String>,
	#[serde(default)]
	filters: Map<String, Value>,
	confidence: f32,
}

pub fn parse_intent(raw: &str) -> Result<SearchIntent> {
	let payload: IntentPayload = serde_json::from_str(raw.trim())
		.map_err(|err| Error::Analysis { message: format!("Intent payload is invalid: {err}") })?;
	let keywords: Vec<String> = payload
		.keywords
		.into_iter()
		.map(|keyword| keyword.trim().to_string())
		.filter(|keyword| !keyword.is_empty())
		.collect();

	if keywords.is_empty() {
		return Err(Error::Analysis {
			message: "Intent must carry at least one keyword.".to_string(),
		});
	}
	if !payload.confidence.is_finite() || !(0.0..=1.0).contains(&payload.confidence) {
		return Err(Error::Analysis {
			message: "Intent confidence must be in the range 0.0-1.0.".to_string(),
		});
	}

	let search_type =
		payload.search_type.as_deref().map(SearchType::from_label).unwrap_or(SearchType::General);

	Ok(SearchIntent {
		keywords,
		search_type,
		filters: payload.filters,
		confidence: payload.confidence,
	})
}

impl BidragService {
	pub async fn analyze_intent(&self, query: &str) -> Result<SearchIntent> {
		let messages = [
			ChatMessage::system(INTENT_PROMPT),
			ChatMessage::user(query),
			ChatMessage::assistant(INTENT_ACK),
			ChatMessage::system(INTENT_FORMAT),
		];
		let raw = self
			.deadline(
				"intent_analysis",
				self.providers.llm.complete(
					&self.cfg.providers.extractor,
					&messages,
					ResponseFormat::Json,
				),
			)
			.await?;
		let intent = parse_intent(&raw)?;

		tracing::info!(
			search_type = ?intent.search_type,
			confidence = intent.confidence,
			keywords = intent.keywords.len(),
			"Query intent analyzed."
		);

		Ok(intent)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_search_type_becomes_general() {
		let intent = parse_intent(
			r#"{"keywords": ["클라우드"], "search_type": "deadline", "confidence": 0.8}"#,
		)
		.expect("Expected an intent.");

		assert_eq!(intent.search_type, SearchType::General);
		assert!(intent.filters.is_empty());
	}

	#[test]
	fn keeps_filters_and_known_type() {
		let intent = parse_intent(
			r#"{"keywords": ["보안"], "search_type": "qualification", "filters": {"year": 2024}, "confidence": 1.0}"#,
		)
		.expect("Expected an intent.");

		assert_eq!(intent.search_type, SearchType::Qualification);
		assert_eq!(intent.filters["year"], 2024);
	}

	#[test]
	fn rejects_empty_keywords_and_out_of_range_confidence() {
		let empty =
			parse_intent(r#"{"keywords": [" "], "search_type": "price", "confidence": 0.5}"#);
		let high =
			parse_intent(r#"{"keywords": ["보안"], "search_type": "price", "confidence": 1.5}"#);

		assert!(matches!(empty, Err(Error::Analysis { .. })));
		assert!(matches!(high, Err(Error::Analysis { .. })));
		assert!(matches!(parse_intent("not json"), Err(Error::Analysis { .. })));
	}
}
