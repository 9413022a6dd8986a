use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bidrag_service::{
	Choice, Error as ServiceError, RetrievedItem, Session, SessionView, TurnOutcome, TurnResult,
	stream, turn,
};

use crate::state::{AppState, CommitError};

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
	pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
	pub session_id: Uuid,
	pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
	pub outcome: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub answer: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sql: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub keywords: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub items: Vec<RetrievedItem>,
	pub session: SessionView,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/sessions", post(create_session))
		.route("/v1/sessions/{id}", get(get_session).delete(delete_session))
		.route("/v1/sessions/{id}/turns", post(post_turn))
		.route("/v1/sessions/{id}/selection", post(post_selection))
		.route("/v1/sessions/{id}/namespace", delete(delete_namespace))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
	let (session_id, session) = state.create_session();

	tracing::info!(%session_id, "Session created.");

	(StatusCode::CREATED, Json(SessionResponse { session_id, session: session.view() }))
}

async fn get_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
	let session = load(&state, id)?;

	Ok(Json(SessionResponse { session_id: id, session: session.view() }))
}

async fn delete_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	if !state.remove_session(id) {
		return Err(not_found(id));
	}

	tracing::info!(session_id = %id, "Session deleted.");

	Ok(StatusCode::NO_CONTENT)
}

async fn post_turn(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
	let session = load(&state, id)?;
	let result = state.service.handle_turn(&session, &payload.query).await?;

	finish(&state, id, &session, result).await
}

async fn post_selection(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Json(choice): Json<Choice>,
) -> Result<Json<TurnResponse>, ApiError> {
	let session = load(&state, id)?;
	let result = turn::choose_candidate(&session, choice)?;

	finish(&state, id, &session, result).await
}

async fn delete_namespace(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<TurnResponse>, ApiError> {
	let session = load(&state, id)?;
	let result = turn::reset_namespace(&session)?;

	finish(&state, id, &session, result).await
}

fn load(state: &AppState, id: Uuid) -> Result<Session, ApiError> {
	state.session(id).ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> ApiError {
	json_error(StatusCode::NOT_FOUND, "session_not_found", format!("Session {id} does not exist."))
}

/// Drains any answer stream, then commits the successor session against the revision the action
/// started from.
async fn finish(
	state: &AppState,
	id: Uuid,
	started_from: &Session,
	result: TurnResult,
) -> Result<Json<TurnResponse>, ApiError> {
	let TurnResult { mut session, outcome } = result;
	let kind = outcome.kind();
	let mut response = TurnResponse {
		outcome: kind,
		answer: None,
		sql: None,
		namespace: None,
		keywords: Vec::new(),
		items: Vec::new(),
		session: SessionView::default(),
	};

	match outcome {
		TurnOutcome::Structured { sql, result, answer } => {
			let text = stream::collect_text(answer).await?;

			session.record_response(text.clone());

			response.answer = Some(text);
			response.sql = Some(sql);
			response.items = result.into_items();
		},
		TurnOutcome::Semantic { namespace, result, answer, .. } => {
			let text = stream::collect_text(answer).await?;

			session.record_response(text.clone());

			response.answer = Some(text);
			response.namespace = Some(namespace.as_str().to_string());
			response.items = result.into_items();
		},
		TurnOutcome::CandidatesOffered { keywords, .. }
		| TurnOutcome::NoCandidates { keywords } => {
			response.answer = session.last_response.clone();
			response.keywords = keywords;
		},
		TurnOutcome::Confirmed { namespace, .. } => {
			response.answer = session.last_response.clone();
			response.namespace = Some(namespace.as_str().to_string());
		},
		TurnOutcome::NoMatch | TurnOutcome::Reset => {
			response.answer = session.last_response.clone();
		},
	}

	response.session = session.view();

	let revision = response.session.revision;

	state.commit(id, started_from.revision, session)?;

	tracing::info!(session_id = %id, outcome = kind, revision, "Turn committed.");

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, code) = match &err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
			ServiceError::Classification { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "classification_failed"),
			ServiceError::Analysis { .. } => (StatusCode::BAD_GATEWAY, "analysis_failed"),
			ServiceError::GenerationFormat { .. } =>
				(StatusCode::BAD_GATEWAY, "generation_format"),
			ServiceError::Execution { .. } => (StatusCode::BAD_GATEWAY, "execution_failed"),
			ServiceError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
			ServiceError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Turn failed.");
		} else {
			tracing::warn!(error = %err, "Turn rejected.");
		}

		json_error(status, code, err.to_string())
	}
}

impl From<CommitError> for ApiError {
	fn from(err: CommitError) -> Self {
		match err {
			CommitError::NotFound => json_error(
				StatusCode::NOT_FOUND,
				"session_not_found",
				"Session was removed while the turn was running.",
			),
			CommitError::Stale { expected, current } => json_error(
				StatusCode::CONFLICT,
				"stale_session",
				format!("Session moved from revision {expected} to {current} during the turn."),
			),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
