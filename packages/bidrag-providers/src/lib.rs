pub mod embedding;
pub mod llm;
pub mod rerank;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pull-based source of incremental completion text.
///
/// Nothing is read from upstream until `next_chunk` is awaited, and dropping the stream drops the
/// underlying response. Layers above the provider reuse the trait with their own error type.
pub trait ChunkStream<E = Error>
where
	Self: Send,
{
	/// Returns `Ok(None)` once the stream is exhausted.
	fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>, E>>;
}

pub type TextStream<E = Error> = Box<dyn ChunkStream<E>>;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn http_client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}
