//! Lazy answer streams.
//!
//! Nothing is produced until the consumer pulls `next_chunk`, and dropping a stream abandons any
//! upstream response behind it.

use std::{collections::VecDeque, time::Duration};

pub use bidrag_providers::ChunkStream;

use crate::{BoxFuture, Error, Result};

pub type TextStream = bidrag_providers::TextStream<Error>;

/// Streams pre-rendered text, one chunk per entry.
pub struct StaticStream {
	chunks: VecDeque<String>,
}
impl StaticStream {
	pub fn new(chunks: impl IntoIterator<Item = String>) -> Self {
		Self { chunks: chunks.into_iter().collect() }
	}
}
impl ChunkStream<Error> for StaticStream {
	fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
		let next = self.chunks.pop_front();

		Box::pin(async move { Ok(next) })
	}
}

pub async fn collect_text(mut stream: TextStream) -> Result<String> {
	let mut out = String::new();

	while let Some(chunk) = stream.next_chunk().await? {
		out.push_str(&chunk);
	}

	Ok(out)
}

pub(crate) fn from_provider(inner: bidrag_providers::TextStream) -> TextStream {
	Box::new(ProviderStream { inner })
}

pub(crate) fn with_deadline(inner: TextStream, timeout_ms: u64) -> TextStream {
	Box::new(DeadlineStream { inner, timeout_ms })
}

struct ProviderStream {
	inner: bidrag_providers::TextStream,
}
impl ChunkStream<Error> for ProviderStream {
	fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
		Box::pin(async move { Ok(self.inner.next_chunk().await?) })
	}
}

struct DeadlineStream {
	inner: TextStream,
	timeout_ms: u64,
}
impl ChunkStream<Error> for DeadlineStream {
	fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
		let timeout_ms = self.timeout_ms;

		Box::pin(async move {
			match tokio::time::timeout(Duration::from_millis(timeout_ms), self.inner.next_chunk())
				.await
			{
				Ok(result) => result,
				Err(_) => Err(Error::Timeout { operation: "responder_stream", timeout_ms }),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Stalled;
	impl ChunkStream<Error> for Stalled {
		fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
			Box::pin(std::future::pending())
		}
	}

	#[tokio::test]
	async fn static_stream_yields_chunks_in_order() {
		let stream: TextStream =
			Box::new(StaticStream::new(["| 월 |\n".to_string(), "| 1 |\n".to_string()]));

		assert_eq!(collect_text(stream).await.expect("Collect failed."), "| 월 |\n| 1 |\n");
	}

	#[tokio::test]
	async fn stalled_chunk_times_out() {
		let mut stream = with_deadline(Box::new(Stalled), 10);
		let err = stream.next_chunk().await.expect_err("Expected a timeout.");

		assert!(matches!(err, Error::Timeout { operation: "responder_stream", .. }));
	}
}
