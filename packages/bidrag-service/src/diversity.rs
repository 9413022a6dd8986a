//! Greedy maximal-marginal-relevance reordering.

use std::collections::HashSet;

use crate::RetrievedItem;

#[derive(Clone, Copy)]
struct Pick {
	remaining_pos: usize,
	mmr_score: f32,
	original_rank: usize,
}
impl Pick {
	fn better_than(self, other: &Self) -> bool {
		self.mmr_score > other.mmr_score
			|| (self.mmr_score == other.mmr_score && self.original_rank < other.original_rank)
	}
}

/// Reorders `items` so each next pick maximizes `relevance - lambda * max_similarity_to_picked`.
///
/// Relevance is the item score (unset counts as 0) and similarity is whitespace-token Jaccard.
/// Every input item is returned exactly once.
pub fn select(items: Vec<RetrievedItem>, lambda: f32) -> Vec<RetrievedItem> {
	if items.len() <= 1 {
		return items;
	}

	let tokens: Vec<HashSet<&str>> =
		items.iter().map(|item| item.content.split_whitespace().collect()).collect();
	let relevance: Vec<f32> = items.iter().map(|item| item.score.unwrap_or(0.0)).collect();
	let mut remaining: Vec<usize> = (0..items.len()).collect();
	let mut selected: Vec<usize> = Vec::with_capacity(items.len());

	while !remaining.is_empty() {
		let mut best: Option<Pick> = None;

		for (remaining_pos, idx) in remaining.iter().copied().enumerate() {
			let redundancy = selected
				.iter()
				.map(|picked| jaccard(&tokens[idx], &tokens[*picked]))
				.fold(0.0_f32, f32::max);
			let pick = Pick {
				remaining_pos,
				mmr_score: relevance[idx] - lambda * redundancy,
				original_rank: idx,
			};

			if best.as_ref().map(|current| pick.better_than(current)).unwrap_or(true) {
				best = Some(pick);
			}
		}

		let Some(best) = best else { break };

		selected.push(remaining.remove(best.remaining_pos));
	}

	let mut slots: Vec<Option<RetrievedItem>> = items.into_iter().map(Some).collect();

	selected.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

pub fn jaccard(lhs: &HashSet<&str>, rhs: &HashSet<&str>) -> f32 {
	let union = lhs.union(rhs).count();

	if union == 0 {
		return 0.0;
	}

	lhs.intersection(rhs).count() as f32 / union as f32
}
