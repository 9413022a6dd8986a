//! One user action in, one successor session and outcome out.
//!
//! The caller's session is only read. A turn that fails, or whose future is dropped, leaves it
//! exactly as it was; committing the returned session is the caller's decision.

use crate::{
	BidragService, Choice, Disambiguation, Error, Event, NamespaceCandidate, Resolution,
	ResolvedNamespace, Result, ResultSet, SearchIntent, Session, SourcePath, diversity, session,
	stream::TextStream,
};

const NO_CANDIDATES_MESSAGE: &str = "조건에 맞는 공고를 찾지 못했습니다. 다른 키워드로 다시 검색해주세요.";
const NO_MATCH_MESSAGE: &str = "다른 키워드로 다시 검색해주세요.";
const RESET_MESSAGE: &str = "공고 선택이 해제되었습니다.";
const NONE_OF_THESE_LABEL: &str = "찾는 공고가 없습니다";

pub enum TurnOutcome {
	Structured { sql: String, result: ResultSet, answer: TextStream },
	Semantic {
		namespace: ResolvedNamespace,
		intent: Option<SearchIntent>,
		result: ResultSet,
		answer: TextStream,
	},
	CandidatesOffered { keywords: Vec<String>, candidates: Vec<NamespaceCandidate> },
	NoCandidates { keywords: Vec<String> },
	Confirmed { namespace: ResolvedNamespace, notice: NamespaceCandidate },
	/// The user rejected every offered candidate.
	NoMatch,
	Reset,
}
impl TurnOutcome {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Structured { .. } => "structured",
			Self::Semantic { .. } => "semantic",
			Self::CandidatesOffered { .. } => "candidates_offered",
			Self::NoCandidates { .. } => "no_candidates",
			Self::Confirmed { .. } => "confirmed",
			Self::NoMatch => "no_match",
			Self::Reset => "reset",
		}
	}
}

pub struct TurnResult {
	pub session: Session,
	pub outcome: TurnOutcome,
}

impl BidragService {
	/// Routes a query and runs the matching pipeline.
	///
	/// Streamed answers are not yet in the returned session; record them with
	/// [`Session::record_response`] once drained.
	pub async fn handle_turn(&self, session: &Session, query: &str) -> Result<TurnResult> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "Query must be non-empty.".to_string() });
		}

		match self.route(query).await? {
			SourcePath::Structured => {
				let structured =
					self.process_structured(query, session.resolved_namespace()).await?;
				let answer = self.format_structured(query, &structured).await?;
				let next = session.advance(session.disambiguation.clone(), Some(query));

				Ok(TurnResult {
					session: next,
					outcome: TurnOutcome::Structured {
						sql: structured.sql,
						result: structured.result,
						answer,
					},
				})
			},
			SourcePath::Semantic => self.semantic_turn(session, query).await,
		}
	}

	async fn semantic_turn(&self, session: &Session, query: &str) -> Result<TurnResult> {
		match self.find_namespace(&session.disambiguation, query).await? {
			Resolution::AlreadyConfirmed(namespace) => {
				let intent = if self.cfg.pipeline.analyze_intent {
					Some(self.analyze_intent(query).await?)
				} else {
					None
				};
				let cfg = &self.cfg.retrieval;
				let items = self.retrieve(query, &namespace, cfg.top_k, cfg.alpha).await?;
				let retrieved = ResultSet::new(SourcePath::Semantic, items, None);
				let reranked = self.rerank(retrieved, query, cfg.rerank_top_k).await?;
				let raw = reranked.raw_upstream().cloned();
				let selected = diversity::select(reranked.into_items(), cfg.diversity_lambda);
				let result = ResultSet::new(SourcePath::Semantic, selected, raw);
				let answer = self.synthesize(query, &result, intent.as_ref()).await?;
				let next = session.advance(session.disambiguation.clone(), Some(query));

				Ok(TurnResult {
					session: next,
					outcome: TurnOutcome::Semantic { namespace, intent, result, answer },
				})
			},
			Resolution::Offered { keywords, candidates } => {
				let state = session::transition(
					&session.disambiguation,
					Event::CandidatesFound {
						query: query.to_string(),
						keywords: keywords.clone(),
						candidates: candidates.clone(),
					},
				)?;
				let mut next = session.advance(state, Some(query));

				next.record_response(render_candidates(&keywords, &candidates));

				Ok(TurnResult {
					session: next,
					outcome: TurnOutcome::CandidatesOffered { keywords, candidates },
				})
			},
			Resolution::NoCandidates { keywords } => {
				let state = session::transition(&session.disambiguation, Event::NothingFound)?;
				let mut next = session.advance(state, Some(query));

				next.record_response(NO_CANDIDATES_MESSAGE);

				Ok(TurnResult { session: next, outcome: TurnOutcome::NoCandidates { keywords } })
			},
		}
	}
}

/// Applies the user's pick among the pending candidates.
pub fn choose_candidate(session: &Session, choice: Choice) -> Result<TurnResult> {
	let state = session::transition(&session.disambiguation, Event::Choose(choice))?;
	let mut next = session.advance(state, None);
	let outcome = match &next.disambiguation {
		Disambiguation::Confirmed { namespace, notice } => TurnOutcome::Confirmed {
			namespace: namespace.clone(),
			notice: notice.clone(),
		},
		_ => TurnOutcome::NoMatch,
	};

	match &outcome {
		TurnOutcome::Confirmed { namespace, .. } => {
			tracing::info!(namespace = %namespace, "Notice confirmed.");

			next.record_response(format!("선택된 공고번호: {namespace}"));
		},
		_ => {
			tracing::info!("All offered candidates were rejected.");

			next.record_response(NO_MATCH_MESSAGE);
		},
	}

	Ok(TurnResult { session: next, outcome })
}

/// Clears any confirmed notice or pending candidates.
pub fn reset_namespace(session: &Session) -> Result<TurnResult> {
	let state = session::transition(&session.disambiguation, Event::Reset)?;
	let mut next = session.advance(state, None);

	next.record_response(RESET_MESSAGE);

	Ok(TurnResult { session: next, outcome: TurnOutcome::Reset })
}

pub fn render_candidates(keywords: &[String], candidates: &[NamespaceCandidate]) -> String {
	let dash = |value: &Option<String>| value.as_deref().unwrap_or("-").to_string();
	let mut lines = vec![
		format!("검색 키워드: {}", keywords.join(", ")),
		"찾고 계신 공고가 다음 중 하나인가요?".to_string(),
	];

	for (i, candidate) in candidates.iter().enumerate() {
		lines.push(format!("{}. {}", i + 1, candidate.display_name));
		lines.push(format!("   공고번호: [{}]({})", candidate.notice_id, candidate.url));
		lines.push(format!(
			"   분류: {} | {}",
			dash(&candidate.notice_kind),
			dash(&candidate.classification)
		));
		lines.push(format!("   기관: {}", dash(&candidate.demand_institution)));
		lines.push(format!("   유사도 점수: {:.3}", candidate.similarity));
	}

	lines.push(format!("{}. {NONE_OF_THESE_LABEL}", candidates.len() + 1));

	lines.join("\n")
}
