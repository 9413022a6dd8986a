use serde_json::Value;

use crate::{Error, Result};
use bidrag_config::RerankProviderConfig;

/// Wire shape of the reranking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankBackend {
	/// Hosted rerank API taking `documents` and answering `results[].relevance_score`.
	Hosted,
	/// Self-hosted cross-encoder taking `texts` and answering a bare `[{index, score}]` array.
	CrossEncoder,
}
impl RerankBackend {
	pub fn from_label(label: &str) -> Result<Self> {
		match label {
			"hosted" => Ok(Self::Hosted),
			"cross_encoder" => Ok(Self::CrossEncoder),
			other => Err(Error::InvalidConfig { message: format!("Unknown rerank backend {other}.") }),
		}
	}
}

/// Returns one relevance score per document, aligned with `docs`.
pub async fn rerank(cfg: &RerankProviderConfig, query: &str, docs: &[String]) -> Result<Vec<f32>> {
	let backend = RerankBackend::from_label(&cfg.backend)?;
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_rerank_body(backend, &cfg.model, query, docs);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn build_rerank_body(backend: RerankBackend, model: &str, query: &str, docs: &[String]) -> Value {
	match backend {
		RerankBackend::Hosted => serde_json::json!({
			"model": model,
			"query": query,
			"documents": docs,
			"top_n": docs.len(),
		}),
		RerankBackend::CrossEncoder => serde_json::json!({
			"query": query,
			"texts": docs,
			"raw_scores": false,
		}),
	}
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores = vec![0.0f32; doc_count];
	let results = json
		.as_array()
		.or_else(|| json.get("results").and_then(|v| v.as_array()))
		.or_else(|| json.get("data").and_then(|v| v.as_array()))
		.ok_or_else(|| Error::invalid_response("Rerank response is missing results array."))?;

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| Error::invalid_response("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::invalid_response("Rerank result missing score."))? as f32;

		if index < scores.len() {
			scores[index] = score;
		}
	}

	Ok(scores)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aligns_hosted_scores_by_index() {
		let json = serde_json::json!({
			"results": [
				{ "index": 1, "relevance_score": 0.2 },
				{ "index": 0, "relevance_score": 0.9 }
			]
		});
		let scores = parse_rerank_response(json, 2).expect("parse failed");

		assert_eq!(scores, vec![0.9, 0.2]);
	}

	#[test]
	fn parses_cross_encoder_array() {
		let json = serde_json::json!([
			{ "index": 2, "score": 0.7 },
			{ "index": 0, "score": 0.1 }
		]);
		let scores = parse_rerank_response(json, 3).expect("parse failed");

		assert_eq!(scores, vec![0.1, 0.0, 0.7]);
	}

	#[test]
	fn backends_use_their_own_request_shape() {
		let docs = vec!["a".to_string(), "b".to_string()];
		let hosted = build_rerank_body(RerankBackend::Hosted, "rerank-v3", "q", &docs);
		let local = build_rerank_body(RerankBackend::CrossEncoder, "bge", "q", &docs);

		assert_eq!(hosted["documents"][1], "b");
		assert_eq!(hosted["top_n"], 2);
		assert_eq!(local["texts"][0], "a");
		assert!(local.get("model").is_none());
	}

	#[test]
	fn unknown_backend_is_config_error() {
		assert!(matches!(RerankBackend::from_label("bm25"), Err(Error::InvalidConfig { .. })));
	}
}
