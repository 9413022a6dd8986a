use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub namespace: Namespace,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub sql: Sql,
	#[serde(default)]
	pub pipeline: Pipeline,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Sessions untouched for this long are dropped by the API.
	#[serde(default = "default_session_idle_ttl_secs")]
	pub session_idle_ttl_secs: u64,
	#[serde(default = "default_max_sessions")]
	pub max_sessions: usize,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	#[serde(default = "default_statement_timeout_ms")]
	pub statement_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: RerankProviderConfig,
	/// Single-label routing between the structured and semantic paths.
	pub router: LlmProviderConfig,
	/// JSON-constrained keyword and intent extraction.
	pub extractor: LlmProviderConfig,
	pub sql_generator: LlmProviderConfig,
	/// Streams answers and formatted structured results.
	pub responder: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	/// Either "hosted" (Cohere-style `documents` API) or "cross_encoder" (TEI-style `texts` API).
	pub backend: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Namespace {
	pub candidate_limit: u32,
	pub min_similarity: f32,
}
impl Default for Namespace {
	fn default() -> Self {
		Self { candidate_limit: 5, min_similarity: 0.6 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	/// Dense share of the fused score; 0 is pure sparse, 1 is pure dense.
	pub alpha: f32,
	pub rerank_top_k: u32,
	pub diversity_lambda: f32,
	pub max_table_contexts: u32,
	pub max_text_contexts: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 20,
			alpha: 0.2,
			rerank_top_k: 5,
			diversity_lambda: 0.3,
			max_table_contexts: 2,
			max_text_contexts: 5,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sql {
	pub max_rows: u32,
}
impl Default for Sql {
	fn default() -> Self {
		Self { max_rows: 10 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub call_timeout_ms: u64,
	pub analyze_intent: bool,
	pub format_mode: String,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self { call_timeout_ms: 60_000, analyze_intent: false, format_mode: "llm".to_string() }
	}
}

fn default_statement_timeout_ms() -> u64 {
	15_000
}

fn default_session_idle_ttl_secs() -> u64 {
	3_600
}

fn default_max_sessions() -> usize {
	10_000
}
