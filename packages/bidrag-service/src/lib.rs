pub mod diversity;
pub mod format;
pub mod intent;
pub mod keywords;
pub mod model;
pub mod namespace;
pub mod rerank;
pub mod retrieval;
pub mod router;
pub mod session;
pub mod sql;
pub mod stream;
pub mod synthesis;
pub mod turn;

mod error;

pub use bidrag_providers::{
	BoxFuture,
	llm::{ChatMessage, ResponseFormat},
};
pub use error::{Error, Result};
pub use model::{
	NamespaceCandidate, ResolvedNamespace, ResultSet, RetrievedItem, SearchIntent, SearchType,
	SourcePath,
};
pub use namespace::Resolution;
pub use session::{Choice, Disambiguation, Event, Session, SessionView};
pub use sql::StructuredResult;
pub use stream::{ChunkStream, TextStream};
pub use turn::{TurnOutcome, TurnResult};

use std::{future::Future, sync::Arc, time::Duration};

use serde_json::{Map, Value};

use bidrag_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, RerankProviderConfig};
use bidrag_providers::{embedding, llm};
use bidrag_storage::{
	db::Db,
	exec,
	models::{NoticeCandidateRow, Passage},
	notices,
	qdrant::QdrantStore,
	schema,
};

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		format: ResponseFormat,
	) -> BoxFuture<'a, Result<String>>;

	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, Result<TextStream>>;
}

/// Returns one vector of `cfg.dimensions` values for `text`.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Pairwise relevance scoring; returns one score per document, aligned with `docs`.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub trait RelationalStore
where
	Self: Send + Sync,
{
	fn search_notices<'a>(
		&'a self,
		keywords: &'a [String],
		embedding: &'a [f32],
		min_similarity: f32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<NoticeCandidateRow>>>;

	fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Vec<Map<String, Value>>>>;

	/// Static table documentation handed to query generation.
	fn schema_description(&self) -> &str;
}

/// Passage index partitioned by namespace.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn dense<'a>(
		&'a self,
		namespace: &'a str,
		vector: Vec<f32>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Passage>>>;

	fn sparse<'a>(
		&'a self,
		namespace: &'a str,
		text: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Passage>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub llm: Arc<dyn LlmProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		llm: Arc<dyn LlmProvider>,
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { llm, embedding, rerank }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { llm: provider.clone(), embedding: provider.clone(), rerank: provider }
	}
}

#[derive(Clone)]
pub struct Backends {
	pub store: Arc<dyn RelationalStore>,
	pub index: Arc<dyn SearchIndex>,
}
impl Backends {
	pub fn new(store: Arc<dyn RelationalStore>, index: Arc<dyn SearchIndex>) -> Self {
		Self { store, index }
	}
}

pub struct BidragService {
	pub cfg: Config,
	pub providers: Providers,
	pub backends: Backends,
}
impl BidragService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let backends = Backends::new(Arc::new(db), Arc::new(qdrant));

		Self { cfg, providers: Providers::default(), backends }
	}

	pub fn with_parts(cfg: Config, providers: Providers, backends: Backends) -> Self {
		Self { cfg, providers, backends }
	}

	/// Bounds one collaborator call by `pipeline.call_timeout_ms`.
	pub(crate) async fn deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let timeout_ms = self.cfg.pipeline.call_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(operation, timeout_ms, "External call timed out.");

				Err(Error::Timeout { operation, timeout_ms })
			},
		}
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		self.deadline(
			"embedding",
			self.providers.embedding.embed(&self.cfg.providers.embedding, text),
		)
		.await
	}

	/// Opens a completion stream whose every chunk pull shares the per-call deadline.
	pub(crate) async fn open_stream(
		&self,
		cfg: &LlmProviderConfig,
		messages: &[ChatMessage],
	) -> Result<TextStream> {
		let inner = self.deadline("responder", self.providers.llm.stream(cfg, messages)).await?;

		Ok(stream::with_deadline(inner, self.cfg.pipeline.call_timeout_ms))
	}
}

struct DefaultProviders;

impl LlmProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		format: ResponseFormat,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(llm::complete(cfg, messages, format).await?) })
	}

	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, Result<TextStream>> {
		Box::pin(async move {
			let inner = llm::stream(cfg, messages).await?;

			Ok(stream::from_provider(inner))
		})
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, text).await?) })
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(bidrag_providers::rerank::rerank(cfg, query, docs).await?) })
	}
}

impl RelationalStore for Db {
	fn search_notices<'a>(
		&'a self,
		keywords: &'a [String],
		embedding: &'a [f32],
		min_similarity: f32,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<NoticeCandidateRow>>> {
		Box::pin(async move {
			Ok(notices::search_candidates(self, keywords, embedding, min_similarity, limit).await?)
		})
	}

	fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Vec<Map<String, Value>>>> {
		Box::pin(async move { Ok(exec::execute_read_only(self, sql).await?) })
	}

	fn schema_description(&self) -> &str {
		schema::SCHEMA_DESCRIPTION
	}
}

impl SearchIndex for QdrantStore {
	fn dense<'a>(
		&'a self,
		namespace: &'a str,
		vector: Vec<f32>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Passage>>> {
		Box::pin(async move { Ok(self.dense_search(namespace, vector, limit).await?) })
	}

	fn sparse<'a>(
		&'a self,
		namespace: &'a str,
		text: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Passage>>> {
		Box::pin(async move { Ok(self.sparse_search(namespace, text, limit).await?) })
	}
}
