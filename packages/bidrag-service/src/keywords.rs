use serde::Deserialize;

use crate::{BidragService, ChatMessage, ResponseFormat};

const MAX_MODEL_KEYWORDS: usize = 4;
const MAX_FALLBACK_KEYWORDS: usize = 3;
const KEYWORD_PROMPT: &str = "\
사용자의 질문에서 입찰공고를 찾기 위한 핵심 키워드만 추출합니다.

규칙:
1. 공고명에 들어 있을 가능성이 높은 단어만 고릅니다.
2. 다음은 절대 키워드로 고르지 않습니다.
   - 자격요건, 가격, 금액, 날짜, 기간 같은 검색 조건
   - 찾아줘, 검색해줘, 보여줘 같은 행동 요청
   - 공고, 입찰, 제안처럼 모든 공고에 공통인 단어
   - 조사와 어미
3. 키워드는 2-4개로 유지합니다.
4. {\"search_keywords\": [\"키워드1\", \"키워드2\"]} 형식의 JSON으로만 응답합니다.";

#[derive(Deserialize)]
struct KeywordPayload {
	search_keywords: Vec<String>,
}

/// Validates model output: a JSON object with one to four non-blank keywords.
pub fn parse_keywords(raw: &str) -> Option<Vec<String>> {
	let payload: KeywordPayload = serde_json::from_str(raw.trim()).ok()?;
	let keywords: Vec<String> =
		payload.search_keywords.iter().map(|keyword| keyword.trim().to_string()).collect();

	if keywords.is_empty()
		|| keywords.len() > MAX_MODEL_KEYWORDS
		|| keywords.iter().any(String::is_empty)
	{
		return None;
	}

	Some(keywords)
}

/// Whitespace tokens longer than one character, first three in input order.
pub fn fallback_keywords(query: &str) -> Vec<String> {
	query
		.split_whitespace()
		.filter(|token| token.chars().count() > 1)
		.take(MAX_FALLBACK_KEYWORDS)
		.map(str::to_string)
		.collect()
}

impl BidragService {
	/// Never fails: transport errors, timeouts and malformed output all use the fallback.
	pub async fn extract_keywords(&self, query: &str) -> Vec<String> {
		let messages = [ChatMessage::system(KEYWORD_PROMPT), ChatMessage::user(query)];
		let raw = self
			.deadline(
				"keyword_extraction",
				self.providers.llm.complete(
					&self.cfg.providers.extractor,
					&messages,
					ResponseFormat::Json,
				),
			)
			.await;
		let parsed = match raw {
			Ok(raw) => parse_keywords(&raw),
			Err(err) => {
				tracing::warn!(error = %err, "Keyword extraction call failed.");

				None
			},
		};

		match parsed {
			Some(keywords) => {
				tracing::info!(keywords = ?keywords, "Keywords extracted.");

				keywords
			},
			None => {
				let keywords = fallback_keywords(query);

				tracing::warn!(keywords = ?keywords, "Keyword extraction fell back to query tokens.");

				keywords
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_well_formed_keywords() {
		let parsed = parse_keywords(r#"{"search_keywords": [" 클라우드 ", "보안"]}"#);

		assert_eq!(parsed, Some(vec!["클라우드".to_string(), "보안".to_string()]));
	}

	#[test]
	fn rejects_schema_violations() {
		assert_eq!(parse_keywords("클라우드, 보안"), None);
		assert_eq!(parse_keywords(r#"{"keywords": ["클라우드"]}"#), None);
		assert_eq!(parse_keywords(r#"{"search_keywords": []}"#), None);
		assert_eq!(parse_keywords(r#"{"search_keywords": ["a", "b", "c", "d", "e"]}"#), None);
		assert_eq!(parse_keywords(r#"{"search_keywords": ["클라우드", "  "]}"#), None);
	}

	#[test]
	fn fallback_keeps_first_three_multi_char_tokens() {
		let keywords = fallback_keywords("및 클라우드 보안 솔루션 구축 공고");

		assert_eq!(keywords, vec!["클라우드", "보안", "솔루션"]);
	}

	#[test]
	fn fallback_may_be_empty() {
		assert!(fallback_keywords("a b 및").is_empty());
	}
}
