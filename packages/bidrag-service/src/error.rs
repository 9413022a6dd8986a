pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Routing failed: unrecognized label {label:?}.")]
	Classification { label: String },
	#[error("Generated query text is malformed: {message}")]
	GenerationFormat { message: String },
	#[error("Query execution failed: {message}")]
	Execution { message: String },
	#[error("Upstream error: {message}")]
	Upstream { message: String },
	#[error("{operation} timed out after {timeout_ms} ms.")]
	Timeout { operation: &'static str, timeout_ms: u64 },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid transition: {message}")]
	InvalidTransition { message: String },
	#[error("Query analysis failed: {message}")]
	Analysis { message: String },
}
impl From<bidrag_providers::Error> for Error {
	fn from(err: bidrag_providers::Error) -> Self {
		Self::Upstream { message: err.to_string() }
	}
}

impl From<bidrag_storage::Error> for Error {
	fn from(err: bidrag_storage::Error) -> Self {
		match err {
			bidrag_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Upstream { message: other.to_string() },
		}
	}
}
