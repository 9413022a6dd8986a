use crate::{BidragService, ChatMessage, Error, ResponseFormat, Result, SourcePath};

const ROUTER_PROMPT: &str = "\
당신은 나라장터 입찰공고 질의를 두 가지 검색 경로 중 하나로 분류하는 라우터입니다.

structured: 입찰공고 데이터베이스의 정형 컬럼으로 답할 수 있는 질문
- 건수, 합계, 평균, 순위 등 집계와 통계 (예: 2023년 월별 유찰 건수)
- 기관, 업체, 금액, 날짜, 진행상태 조건으로 공고나 개찰 결과를 조회하는 질문
- 선택된 공고의 예산, 일정, 낙찰자, 투찰 순위처럼 컬럼에 저장된 값

semantic: 특정 공고 문서의 본문을 읽어야 답할 수 있는 질문
- 참가자격, 과업 범위, 제안요청 내용, 평가 기준, 제출 서류
- 특정 공고를 설명으로 지칭하며 그 내용을 묻는 질문 (예: 클라우드 보안 솔루션 공고)

반드시 structured 또는 semantic 중 한 단어만 출력하세요. 다른 설명은 쓰지 마세요.";

/// Maps raw router output onto a retrieval path. Anything but the two labels is a failure.
pub fn parse_route(raw: &str) -> Result<SourcePath> {
	let label = raw.trim().to_lowercase();

	match label.as_str() {
		"structured" => Ok(SourcePath::Structured),
		"semantic" => Ok(SourcePath::Semantic),
		_ => Err(Error::Classification { label: raw.trim().to_string() }),
	}
}

impl BidragService {
	pub async fn route(&self, query: &str) -> Result<SourcePath> {
		let messages = [ChatMessage::system(ROUTER_PROMPT), ChatMessage::user(query)];
		let raw = self
			.deadline(
				"router",
				self.providers.llm.complete(
					&self.cfg.providers.router,
					&messages,
					ResponseFormat::Text,
				),
			)
			.await?;
		let route = parse_route(&raw);

		match &route {
			Ok(path) => tracing::info!(route = path.as_str(), "Query routed."),
			Err(err) => tracing::warn!(error = %err, "Query routing failed."),
		}

		route
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_are_case_folded_and_trimmed() {
		assert_eq!(parse_route(" Structured\n").expect("Expected a route."), SourcePath::Structured);
		assert_eq!(parse_route("SEMANTIC").expect("Expected a route."), SourcePath::Semantic);
	}

	#[test]
	fn unknown_labels_are_classification_errors() {
		for raw in ["rdb", "vector", "structured.", "", "semantic search"] {
			let err = parse_route(raw).expect_err("Expected a classification error.");

			assert!(matches!(err, Error::Classification { .. }), "Unexpected error for {raw:?}.");
		}
	}
}
