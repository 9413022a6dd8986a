use crate::{BidragService, Disambiguation, NamespaceCandidate, ResolvedNamespace, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
	/// A notice was confirmed earlier; no search was issued.
	AlreadyConfirmed(ResolvedNamespace),
	Offered { keywords: Vec<String>, candidates: Vec<NamespaceCandidate> },
	NoCandidates { keywords: Vec<String> },
}

impl BidragService {
	/// Looks up notices matching a free-text reference.
	///
	/// Does not change any state; the caller feeds the resolution into the session transition.
	pub async fn find_namespace(&self, state: &Disambiguation, query: &str) -> Result<Resolution> {
		if let Disambiguation::Confirmed { namespace, .. } = state {
			return Ok(Resolution::AlreadyConfirmed(namespace.clone()));
		}

		let keywords = self.extract_keywords(query).await;

		if keywords.is_empty() {
			tracing::info!("No usable keywords for notice lookup.");

			return Ok(Resolution::NoCandidates { keywords });
		}

		let cfg = &self.cfg.namespace;
		let embedding = self.embed_one(&keywords.join(" ")).await?;
		let rows = self
			.deadline(
				"notice_search",
				self.backends.store.search_notices(
					&keywords,
					&embedding,
					cfg.min_similarity,
					cfg.candidate_limit,
				),
			)
			.await?;
		let mut candidates: Vec<NamespaceCandidate> = rows
			.into_iter()
			.map(NamespaceCandidate::from_row)
			.filter(|candidate| candidate.similarity >= f64::from(cfg.min_similarity))
			.collect();

		candidates.truncate(cfg.candidate_limit as usize);

		tracing::info!(
			keywords = ?keywords,
			candidates = candidates.len(),
			"Notice candidates resolved."
		);

		if candidates.is_empty() {
			Ok(Resolution::NoCandidates { keywords })
		} else {
			Ok(Resolution::Offered { keywords, candidates })
		}
	}
}
