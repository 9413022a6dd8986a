//! Per-session disambiguation state and the pure transitions between its states.

use serde::{Deserialize, Serialize};

use crate::{Error, NamespaceCandidate, ResolvedNamespace, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Disambiguation {
	#[default]
	NoSelection,
	CandidatesOffered {
		query: String,
		keywords: Vec<String>,
		candidates: Vec<NamespaceCandidate>,
	},
	/// Immutable until an explicit `Event::Reset`.
	Confirmed { namespace: ResolvedNamespace, notice: NamespaceCandidate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Choice {
	Candidate(usize),
	NoneOfThese,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	CandidatesFound { query: String, keywords: Vec<String>, candidates: Vec<NamespaceCandidate> },
	NothingFound,
	Choose(Choice),
	Reset,
}

pub fn transition(state: &Disambiguation, event: Event) -> Result<Disambiguation> {
	match (state, event) {
		(_, Event::Reset) => Ok(Disambiguation::NoSelection),
		(Disambiguation::Confirmed { .. }, Event::CandidatesFound { .. } | Event::NothingFound) =>
			Err(Error::InvalidTransition {
				message: "A confirmed notice must be reset before searching again.".to_string(),
			}),
		(_, Event::CandidatesFound { candidates, .. }) if candidates.is_empty() =>
			Err(Error::InvalidTransition {
				message: "Candidates must be offered with at least one entry.".to_string(),
			}),
		(_, Event::CandidatesFound { query, keywords, candidates }) =>
			Ok(Disambiguation::CandidatesOffered { query, keywords, candidates }),
		(_, Event::NothingFound) => Ok(Disambiguation::NoSelection),
		(Disambiguation::CandidatesOffered { .. }, Event::Choose(Choice::NoneOfThese)) =>
			Ok(Disambiguation::NoSelection),
		(
			Disambiguation::CandidatesOffered { candidates, .. },
			Event::Choose(Choice::Candidate(i)),
		) => {
			let Some(notice) = candidates.get(i) else {
				return Err(Error::InvalidTransition {
					message: format!("Candidate {i} is out of range ({} offered).", candidates.len()),
				});
			};

			Ok(Disambiguation::Confirmed {
				namespace: ResolvedNamespace::new(notice.notice_id.clone()),
				notice: notice.clone(),
			})
		},
		(_, Event::Choose(_)) => Err(Error::InvalidTransition {
			message: "No candidates are pending selection.".to_string(),
		}),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Assistant,
}

/// Oldest entries are dropped once a session holds this many.
pub const MAX_HISTORY_ENTRIES: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub role: Role,
	pub content: String,
}

/// Everything one conversation carries between turns.
///
/// Turns never mutate a session in place; they return a successor with `revision` advanced, so a
/// failed or abandoned turn leaves the caller's copy untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub disambiguation: Disambiguation,
	pub history: Vec<HistoryEntry>,
	pub last_response: Option<String>,
	pub revision: u64,
}
impl Session {
	pub fn resolved_namespace(&self) -> Option<&ResolvedNamespace> {
		match &self.disambiguation {
			Disambiguation::Confirmed { namespace, .. } => Some(namespace),
			_ => None,
		}
	}

	pub fn pending_candidates(&self) -> &[NamespaceCandidate] {
		match &self.disambiguation {
			Disambiguation::CandidatesOffered { candidates, .. } => candidates,
			_ => &[],
		}
	}

	/// Appends the assistant's final text once a streamed answer has been drained.
	pub fn record_response(&mut self, text: impl Into<String>) {
		let text = text.into();

		self.push_history(Role::Assistant, text.clone());
		self.last_response = Some(text);
	}

	pub fn view(&self) -> SessionView {
		let notice = match &self.disambiguation {
			Disambiguation::Confirmed { notice, .. } => Some(notice.clone()),
			_ => None,
		};

		SessionView {
			resolved_namespace: self.resolved_namespace().map(|ns| ns.as_str().to_string()),
			notice,
			pending_candidates: self.pending_candidates().to_vec(),
			last_response: self.last_response.clone(),
			revision: self.revision,
		}
	}

	pub(crate) fn advance(&self, disambiguation: Disambiguation, user_input: Option<&str>) -> Self {
		let mut next = self.clone();

		next.disambiguation = disambiguation;
		next.revision += 1;

		if let Some(input) = user_input {
			next.push_history(Role::User, input.to_string());
		}

		next
	}

	fn push_history(&mut self, role: Role, content: String) {
		self.history.push(HistoryEntry { role, content });

		if self.history.len() > MAX_HISTORY_ENTRIES {
			let excess = self.history.len() - MAX_HISTORY_ENTRIES;

			self.history.drain(..excess);
		}
	}
}

/// Session state exposed to presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
	pub resolved_namespace: Option<String>,
	pub notice: Option<NamespaceCandidate>,
	pub pending_candidates: Vec<NamespaceCandidate>,
	pub last_response: Option<String>,
	pub revision: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(id: &str) -> NamespaceCandidate {
		NamespaceCandidate {
			notice_id: id.to_string(),
			display_name: format!("{id} 공고"),
			notice_kind: None,
			classification: None,
			demand_institution: None,
			similarity: 0.8,
			url: crate::model::notice_url(id),
		}
	}

	fn offered() -> Disambiguation {
		transition(
			&Disambiguation::NoSelection,
			Event::CandidatesFound {
				query: "클라우드 보안 솔루션 공고".to_string(),
				keywords: vec!["클라우드".to_string(), "보안".to_string()],
				candidates: vec![candidate("A-1"), candidate("B-2")],
			},
		)
		.expect("Expected candidates to be offered.")
	}

	#[test]
	fn choosing_a_candidate_confirms_it() {
		let state = transition(&offered(), Event::Choose(Choice::Candidate(1)))
			.expect("Expected a confirmation.");

		match state {
			Disambiguation::Confirmed { namespace, notice } => {
				assert_eq!(namespace.as_str(), "B-2");
				assert_eq!(notice.notice_id, "B-2");
			},
			other => panic!("Unexpected state: {other:?}"),
		}
	}

	#[test]
	fn none_of_these_returns_to_no_selection() {
		let state = transition(&offered(), Event::Choose(Choice::NoneOfThese))
			.expect("Expected a rejection to succeed.");

		assert_eq!(state, Disambiguation::NoSelection);
	}

	#[test]
	fn confirmed_state_only_leaves_through_reset() {
		let confirmed = transition(&offered(), Event::Choose(Choice::Candidate(0)))
			.expect("Expected a confirmation.");

		assert!(transition(&confirmed, Event::NothingFound).is_err());
		assert!(transition(&confirmed, Event::Choose(Choice::NoneOfThese)).is_err());
		assert!(
			transition(
				&confirmed,
				Event::CandidatesFound {
					query: "다른 공고".to_string(),
					keywords: vec![],
					candidates: vec![candidate("C-3")],
				}
			)
			.is_err()
		);
		assert_eq!(
			transition(&confirmed, Event::Reset).expect("Reset must succeed."),
			Disambiguation::NoSelection
		);
	}

	#[test]
	fn choices_require_pending_candidates() {
		let err = transition(&Disambiguation::NoSelection, Event::Choose(Choice::Candidate(0)))
			.expect_err("Expected an invalid transition.");

		assert!(matches!(err, Error::InvalidTransition { .. }));
		assert!(transition(&offered(), Event::Choose(Choice::Candidate(5))).is_err());
	}

	#[test]
	fn nothing_found_keeps_no_selection() {
		let state = transition(&Disambiguation::NoSelection, Event::NothingFound)
			.expect("Expected no selection.");

		assert_eq!(state, Disambiguation::NoSelection);
	}

	#[test]
	fn advance_bumps_revision_without_touching_original() {
		let session = Session::default();
		let next = session.advance(offered(), Some("클라우드 보안 솔루션 공고"));

		assert_eq!(session.revision, 0);
		assert!(session.history.is_empty());
		assert_eq!(next.revision, 1);
		assert_eq!(next.pending_candidates().len(), 2);
		assert_eq!(next.view().pending_candidates.len(), 2);
		assert!(next.view().resolved_namespace.is_none());
	}

	#[test]
	fn history_keeps_only_the_latest_entries() {
		let mut session = Session::default();

		for turn in 0..MAX_HISTORY_ENTRIES {
			session = session.advance(Disambiguation::NoSelection, Some(&format!("질문 {turn}")));
			session.record_response(format!("답변 {turn}"));
		}

		assert_eq!(session.history.len(), MAX_HISTORY_ENTRIES);
		assert_eq!(session.history[0].content, format!("질문 {}", MAX_HISTORY_ENTRIES / 2));
		assert_eq!(
			session.history.last().map(|entry| entry.content.as_str()),
			Some(format!("답변 {}", MAX_HISTORY_ENTRIES - 1).as_str())
		);
	}
}
