use serde::Deserialize;

use crate::{Error, Result};
use bidrag_config::EmbeddingProviderConfig;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds one text.
pub async fn embed(cfg: &EmbeddingProviderConfig, text: &str) -> Result<Vec<f32>> {
	let mut vectors = embed_batch(cfg, &[text.to_string()]).await?;

	vectors.pop().ok_or_else(|| Error::invalid_response("Embedding response is empty."))
}

/// Embeds `texts` in one request. The result holds exactly one vector of
/// `cfg.dimensions` values per input, in input order.
pub async fn embed_batch(
	cfg: &EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::http_client(cfg.timeout_ms)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;
	let response: EmbeddingResponse = serde_json::from_slice(&res.bytes().await?)?;

	order_vectors(response, texts.len(), cfg.dimensions as usize)
}

fn order_vectors(
	response: EmbeddingResponse,
	expected: usize,
	dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
	if response.data.len() != expected {
		return Err(Error::invalid_response(format!(
			"Embedding provider returned {} vectors for {expected} inputs.",
			response.data.len()
		)));
	}

	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (position, item) in response.data.into_iter().enumerate() {
		let index = item.index.unwrap_or(position);

		if item.embedding.len() != dimensions {
			return Err(Error::invalid_response(format!(
				"Embedding {index} has {} dimensions; expected {dimensions}.",
				item.embedding.len()
			)));
		}

		match slots.get_mut(index) {
			Some(slot @ None) => *slot = Some(item.embedding),
			_ => {
				return Err(Error::invalid_response(format!(
					"Embedding index {index} is out of range or repeated."
				)));
			},
		}
	}

	Ok(slots.into_iter().flatten().collect())
}
