use crate::{BidragService, Error, Result, ResultSet};

/// Ranks indices by score, highest first, keeping retrieval order among equal scores.
///
/// NaN scores sort last. Returned scores are clamped to `[0, 1]`, with NaN stored as `0.0`.
pub fn rank_by_scores(scores: &[f32], top_k: usize) -> Vec<(usize, f32)> {
	let sort_key = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
	let mut order: Vec<usize> = (0..scores.len()).collect();

	order.sort_by(|&a, &b| sort_key(scores[b]).total_cmp(&sort_key(scores[a])).then(a.cmp(&b)));
	order.truncate(top_k);

	order
		.into_iter()
		.map(|idx| {
			let score = scores[idx];

			(idx, if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) })
		})
		.collect()
}

impl BidragService {
	/// Rescores `items` against `query` and keeps the best `top_k`, in a new set with the same
	/// source path. An empty input is returned as is without calling the scorer.
	pub async fn rerank(&self, items: ResultSet, query: &str, top_k: u32) -> Result<ResultSet> {
		if items.is_empty() {
			return Ok(items);
		}

		let docs: Vec<String> = items.items().iter().map(|item| item.content.clone()).collect();
		let scores = self
			.deadline(
				"rerank",
				self.providers.rerank.rerank(&self.cfg.providers.rerank, query, &docs),
			)
			.await?;

		if scores.len() != docs.len() {
			return Err(Error::Upstream {
				message: format!(
					"Rerank returned {} scores for {} documents.",
					scores.len(),
					docs.len()
				),
			});
		}

		let ranked: Vec<_> = rank_by_scores(&scores, top_k as usize)
			.into_iter()
			.map(|(idx, score)| items.items()[idx].with_score(score))
			.collect();

		tracing::info!(input = docs.len(), kept = ranked.len(), "Rerank completed.");

		Ok(ResultSet::new(items.source_path(), ranked, items.raw_upstream().cloned()))
	}
}
