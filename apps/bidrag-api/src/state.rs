use std::{
	collections::HashMap,
	sync::{Arc, Mutex, MutexGuard},
	time::{Duration, Instant},
};

use uuid::Uuid;

use bidrag_service::{BidragService, Session};
use bidrag_storage::{db::Db, qdrant::QdrantStore};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq, Eq)]
pub enum CommitError {
	NotFound,
	/// Another action committed to the session after this one started.
	Stale { expected: u64, current: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
	pub idle_ttl: Duration,
	pub max_sessions: usize,
}
impl SessionLimits {
	fn from_config(cfg: &bidrag_config::Service) -> Self {
		Self {
			idle_ttl: Duration::from_secs(cfg.session_idle_ttl_secs),
			max_sessions: cfg.max_sessions,
		}
	}
}

struct SessionEntry {
	session: Session,
	last_seen: Instant,
}

/// Shared handler state; sessions live in memory, keyed by id.
///
/// Every read or commit refreshes a session's idle clock. Idle sessions are dropped by
/// [`AppState::sweep_idle`], and creating a session beyond `max_sessions` evicts the least
/// recently used one.
#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BidragService>,
	limits: SessionLimits,
	sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}
impl AppState {
	pub async fn new(config: bidrag_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		Ok(Self::with_service(BidragService::new(config, db, qdrant)))
	}

	pub fn with_service(service: BidragService) -> Self {
		let limits = SessionLimits::from_config(&service.cfg.service);

		Self { service: Arc::new(service), limits, sessions: Arc::new(Mutex::new(HashMap::new())) }
	}

	pub fn limits(&self) -> SessionLimits {
		self.limits
	}

	pub fn create_session(&self) -> (Uuid, Session) {
		let id = Uuid::new_v4();
		let session = Session::default();
		let now = Instant::now();
		let mut sessions = self.lock();

		Self::sweep_locked(&mut sessions, self.limits.idle_ttl, now);

		while sessions.len() >= self.limits.max_sessions {
			let Some(oldest) =
				sessions.iter().min_by_key(|(_, entry)| entry.last_seen).map(|(id, _)| *id)
			else {
				break;
			};

			sessions.remove(&oldest);

			tracing::info!(session_id = %oldest, "Least recently used session evicted.");
		}

		sessions.insert(id, SessionEntry { session: session.clone(), last_seen: now });

		(id, session)
	}

	pub fn session(&self, id: Uuid) -> Option<Session> {
		let mut sessions = self.lock();
		let entry = sessions.get_mut(&id)?;

		entry.last_seen = Instant::now();

		Some(entry.session.clone())
	}

	/// Returns whether a session was removed.
	pub fn remove_session(&self, id: Uuid) -> bool {
		self.lock().remove(&id).is_some()
	}

	pub fn session_count(&self) -> usize {
		self.lock().len()
	}

	/// Stores `next` only if the session is still at `expected_revision`.
	pub fn commit(
		&self,
		id: Uuid,
		expected_revision: u64,
		next: Session,
	) -> Result<(), CommitError> {
		let mut sessions = self.lock();
		let Some(current) = sessions.get_mut(&id) else { return Err(CommitError::NotFound) };

		if current.session.revision != expected_revision {
			return Err(CommitError::Stale {
				expected: expected_revision,
				current: current.session.revision,
			});
		}

		current.session = next;
		current.last_seen = Instant::now();

		Ok(())
	}

	/// Drops sessions idle for at least `idle_ttl` as of `now` and returns how many went.
	pub fn sweep_idle(&self, now: Instant) -> usize {
		Self::sweep_locked(&mut self.lock(), self.limits.idle_ttl, now)
	}

	/// Runs [`AppState::sweep_idle`] on a fixed cadence until the runtime shuts down.
	pub async fn sweep_periodically(self) {
		let mut ticker = tokio::time::interval(self.limits.idle_ttl.min(MAX_SWEEP_INTERVAL));

		loop {
			ticker.tick().await;

			let removed = self.sweep_idle(Instant::now());

			if removed > 0 {
				tracing::info!(removed, "Idle sessions dropped.");
			}
		}
	}

	fn sweep_locked(
		sessions: &mut HashMap<Uuid, SessionEntry>,
		idle_ttl: Duration,
		now: Instant,
	) -> usize {
		let before = sessions.len();

		sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < idle_ttl);

		before - sessions.len()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
		self.sessions.lock().unwrap_or_else(|err| err.into_inner())
	}
}
