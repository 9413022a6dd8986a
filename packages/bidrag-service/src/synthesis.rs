use serde_json::{Map, Value};

use crate::{
	BidragService, ChatMessage, Error, Result, ResultSet, RetrievedItem, SearchIntent, SearchType,
	SourcePath, stream::TextStream,
};

const ANSWER_PROMPT: &str = "\
당신은 나라장터 입찰공고 문서를 근거로 답하는 도우미입니다.
아래 컨텍스트에 있는 내용만 사용해 질문에 답하세요.

- 각 문장의 근거가 된 컨텍스트 끝의 [답변 출처: ...] 표기를 그대로 붙입니다.
- 표 형태의 근거는 마크다운 표로 정리합니다.
- 컨텍스트에 답이 없으면 문서에서 해당 내용을 찾지 못했다고 답합니다.";

/// `[답변 출처: <file> p.<page>]` built from passage metadata.
pub fn source_tag(metadata: &Map<String, Value>) -> String {
	let file_name = strip_pdf(metadata.get("file_name").and_then(Value::as_str).unwrap_or("문서"));
	let page = match metadata.get("page") {
		Some(Value::Number(number)) => number
			.as_i64()
			.map(|page| page.to_string())
			.or_else(|| number.as_f64().map(|page| (page.trunc() as i64).to_string()))
			.unwrap_or_else(|| number.to_string()),
		Some(Value::String(text)) => text.clone(),
		_ => "N/A".to_string(),
	};

	format!("[답변 출처: {file_name} p.{page}]")
}

fn strip_pdf(name: &str) -> &str {
	let cut = name.len().saturating_sub(4);

	match name.get(cut..) {
		Some(ext) if ext.eq_ignore_ascii_case(".pdf") => &name[..cut],
		_ => name,
	}
}

/// Table passages first (at most `max_tables`), then other passages (at most `max_texts`), each
/// suffixed with its source tag.
pub fn build_context(items: &[RetrievedItem], max_tables: usize, max_texts: usize) -> String {
	let is_table =
		|item: &&RetrievedItem| item.metadata.get("type").and_then(Value::as_str) == Some("table");
	let tables = items.iter().filter(is_table).take(max_tables);
	let texts = items.iter().filter(|item| !is_table(item)).take(max_texts);

	tables
		.chain(texts)
		.map(|item| format!("{} {}", item.content, source_tag(&item.metadata)))
		.collect::<Vec<_>>()
		.join("\n")
}

fn intent_hint(intent: &SearchIntent) -> &'static str {
	match intent.search_type {
		SearchType::General => "질문 전반에 대해 핵심 내용을 요약하세요.",
		SearchType::Qualification => "입찰 참가자격과 제한 조건을 중심으로 답하세요.",
		SearchType::Price => "예산, 추정가격, 금액 조건을 중심으로 답하세요.",
		SearchType::Schedule => "공고, 마감, 개찰 등 일정을 중심으로 답하세요.",
	}
}

impl BidragService {
	/// Streams an answer grounded in the selected passages.
	pub async fn synthesize(
		&self,
		query: &str,
		result: &ResultSet,
		intent: Option<&SearchIntent>,
	) -> Result<TextStream> {
		if result.source_path() != SourcePath::Semantic {
			return Err(Error::InvalidRequest {
				message: "Answer synthesis requires semantic results.".to_string(),
			});
		}

		let cfg = &self.cfg.retrieval;
		let context = build_context(
			result.items(),
			cfg.max_table_contexts as usize,
			cfg.max_text_contexts as usize,
		);
		let mut system = ANSWER_PROMPT.to_string();

		if let Some(intent) = intent {
			system.push_str("\n- ");
			system.push_str(intent_hint(intent));
		}

		let user = format!("컨텍스트:\n{context}\n\n질문: {query}");
		let messages = [ChatMessage::system(system), ChatMessage::user(user)];

		tracing::info!(items = result.len(), "Synthesizing answer.");

		self.open_stream(&self.cfg.providers.responder, &messages).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(content: &str, kind: &str, file: &str, page: Value) -> RetrievedItem {
		let mut metadata = Map::new();

		metadata.insert("type".to_string(), Value::from(kind));
		metadata.insert("file_name".to_string(), Value::from(file));
		metadata.insert("page".to_string(), page);

		RetrievedItem::new(content, metadata)
	}

	#[test]
	fn source_tag_strips_pdf_and_truncates_page() {
		let tagged = item("x", "text", "제안요청서.PDF", Value::from(3.0));

		assert_eq!(source_tag(&tagged.metadata), "[답변 출처: 제안요청서 p.3]");
		assert_eq!(source_tag(&Map::new()), "[답변 출처: 문서 p.N/A]");
	}

	#[test]
	fn context_caps_tables_then_texts() {
		let items = vec![
			item("t1", "table", "a.pdf", Value::from(1)),
			item("p1", "text", "a.pdf", Value::from(2)),
			item("t2", "table", "a.pdf", Value::from(3)),
			item("t3", "table", "a.pdf", Value::from(4)),
			item("p2", "text", "b.pdf", Value::from(5)),
		];
		let context = build_context(&items, 2, 1);
		let lines: Vec<&str> = context.lines().collect();

		assert_eq!(
			lines,
			vec!["t1 [답변 출처: a p.1]", "t2 [답변 출처: a p.3]", "p1 [답변 출처: a p.2]"]
		);
	}
}
