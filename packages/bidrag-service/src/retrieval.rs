use std::collections::HashMap;

use serde_json::Value;

use bidrag_storage::{models::Passage, qdrant::NAMESPACE_FIELD};

use crate::{BidragService, Error, ResolvedNamespace, Result, RetrievedItem};

/// A passage with its fused dense and sparse score.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedPassage {
	pub passage: Passage,
	pub score: f32,
}

/// Weighted fusion of min-max normalized dense and sparse scores.
///
/// `alpha` is the dense share: 0 ranks purely by sparse, 1 purely by dense. A passage missing from
/// one list contributes zero for that side. Ties keep first-seen order (dense list, then sparse).
pub fn fuse(
	dense: Vec<Passage>,
	sparse: Vec<Passage>,
	alpha: f32,
	top_k: usize,
) -> Vec<FusedPassage> {
	let dense_norm = min_max(&dense);
	let sparse_norm = min_max(&sparse);
	let mut order: Vec<String> = Vec::new();
	let mut fused: HashMap<String, FusedPassage> = HashMap::new();

	for (passage, norm) in dense.into_iter().zip(dense_norm) {
		let entry = fused.entry(passage.point_id.clone()).or_insert_with(|| {
			order.push(passage.point_id.clone());

			FusedPassage { passage, score: 0.0 }
		});

		entry.score += alpha * norm;
	}
	for (passage, norm) in sparse.into_iter().zip(sparse_norm) {
		let entry = fused.entry(passage.point_id.clone()).or_insert_with(|| {
			order.push(passage.point_id.clone());

			FusedPassage { passage, score: 0.0 }
		});

		entry.score += (1.0 - alpha) * norm;
	}

	let mut out: Vec<FusedPassage> = order.iter().filter_map(|id| fused.remove(id)).collect();

	out.sort_by(|a, b| b.score.total_cmp(&a.score));
	out.truncate(top_k);

	out
}

/// Scales scores into `[0, 1]`; a list with no spread maps every entry to 1.
fn min_max(passages: &[Passage]) -> Vec<f32> {
	let (min, max) = passages.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
		(lo.min(p.score), hi.max(p.score))
	});
	let spread = max - min;

	passages
		.iter()
		.map(|p| if spread > f32::EPSILON { (p.score - min) / spread } else { 1.0 })
		.collect()
}

fn belongs_to(passage: &Passage, namespace: &ResolvedNamespace) -> bool {
	match passage.metadata.get(NAMESPACE_FIELD) {
		Some(Value::String(ns)) => ns == namespace.as_str(),
		_ => false,
	}
}

impl BidragService {
	/// Hybrid passage search scoped to one confirmed notice.
	pub async fn retrieve(
		&self,
		query: &str,
		namespace: &ResolvedNamespace,
		top_k: u32,
		alpha: f32,
	) -> Result<Vec<RetrievedItem>> {
		if top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}
		if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
			return Err(Error::InvalidRequest {
				message: "alpha must be in the range 0.0-1.0.".to_string(),
			});
		}

		let vector = self.embed_one(query).await?;
		let dense = self
			.deadline("dense_search", self.backends.index.dense(namespace.as_str(), vector, top_k))
			.await?;
		let sparse = self
			.deadline("sparse_search", self.backends.index.sparse(namespace.as_str(), query, top_k))
			.await?;
		let dense = drop_foreign(dense, namespace);
		let sparse = drop_foreign(sparse, namespace);
		let fused = fuse(dense, sparse, alpha, top_k as usize);

		tracing::info!(namespace = %namespace, items = fused.len(), "Hybrid retrieval completed.");

		Ok(fused
			.into_iter()
			.map(|hit| RetrievedItem {
				content: hit.passage.content,
				metadata: hit.passage.metadata,
				score: Some(hit.score),
			})
			.collect())
	}
}

fn drop_foreign(passages: Vec<Passage>, namespace: &ResolvedNamespace) -> Vec<Passage> {
	passages
		.into_iter()
		.filter(|passage| {
			let keep = belongs_to(passage, namespace);

			if !keep {
				tracing::error!(
					namespace = %namespace,
					point_id = %passage.point_id,
					"Passage index returned a hit outside the requested namespace."
				);
			}

			keep
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;

	fn passage(id: &str, ns: &str, score: f32) -> Passage {
		let mut metadata = Map::new();

		metadata.insert(NAMESPACE_FIELD.to_string(), Value::String(ns.to_string()));

		Passage { point_id: id.to_string(), content: format!("passage {id}"), metadata, score }
	}

	#[test]
	fn alpha_weights_dense_against_sparse() {
		let dense = vec![passage("a", "n", 0.9), passage("b", "n", 0.1)];
		let sparse = vec![passage("b", "n", 12.0), passage("a", "n", 2.0)];
		let sparse_heavy = fuse(dense.clone(), sparse.clone(), 0.2, 10);
		let dense_heavy = fuse(dense, sparse, 0.8, 10);

		assert_eq!(sparse_heavy[0].passage.point_id, "b");
		assert!((sparse_heavy[0].score - 0.8).abs() < 1e-6);
		assert_eq!(dense_heavy[0].passage.point_id, "a");
	}

	#[test]
	fn one_sided_hits_and_truncation() {
		let dense = vec![passage("a", "n", 0.5)];
		let sparse = vec![passage("b", "n", 3.0), passage("c", "n", 1.0)];
		let fused = fuse(dense, sparse, 0.5, 2);

		assert_eq!(fused.len(), 2);
		assert_eq!(fused[0].passage.point_id, "a");
		assert_eq!(fused[1].passage.point_id, "b");
		assert!(fused.iter().all(|hit| (0.0..=1.0).contains(&hit.score)));
	}

	#[test]
	fn empty_inputs_fuse_to_nothing() {
		assert!(fuse(Vec::new(), Vec::new(), 0.2, 20).is_empty());
	}

	#[test]
	fn foreign_namespace_hits_are_dropped() {
		let ns = ResolvedNamespace::new("A-1");
		let kept = drop_foreign(vec![passage("a", "A-1", 0.4), passage("b", "B-2", 0.9)], &ns);

		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].point_id, "a");
	}
}
