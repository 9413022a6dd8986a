mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Namespace, Pipeline, Postgres, Providers,
	Qdrant, RerankProviderConfig, Retrieval, Service, Sql, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.session_idle_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "service.session_idle_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.service.max_sessions == 0 {
		return Err(Error::Validation {
			message: "service.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.statement_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !matches!(cfg.providers.rerank.backend.as_str(), "hosted" | "cross_encoder") {
		return Err(Error::Validation {
			message: "providers.rerank.backend must be one of hosted or cross_encoder.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
		("router", &cfg.providers.router.api_key),
		("extractor", &cfg.providers.extractor.api_key),
		("sql_generator", &cfg.providers.sql_generator.api_key),
		("responder", &cfg.providers.responder.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.namespace.candidate_limit == 0 {
		return Err(Error::Validation {
			message: "namespace.candidate_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.namespace.min_similarity.is_finite()
		|| !(-1.0..=1.0).contains(&cfg.namespace.min_similarity)
	{
		return Err(Error::Validation {
			message: "namespace.min_similarity must be in the range -1.0-1.0.".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.rerank_top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.rerank_top_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.retrieval.alpha.is_finite() || !(0.0..=1.0).contains(&cfg.retrieval.alpha) {
		return Err(Error::Validation {
			message: "retrieval.alpha must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !cfg.retrieval.diversity_lambda.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.diversity_lambda must be a finite number.".to_string(),
		});
	}
	if cfg.retrieval.diversity_lambda < 0.0 {
		return Err(Error::Validation {
			message: "retrieval.diversity_lambda must be zero or greater.".to_string(),
		});
	}
	if cfg.retrieval.max_text_contexts == 0 {
		return Err(Error::Validation {
			message: "retrieval.max_text_contexts must be greater than zero.".to_string(),
		});
	}
	if cfg.sql.max_rows == 0 {
		return Err(Error::Validation {
			message: "sql.max_rows must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.call_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "pipeline.call_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.pipeline.format_mode.as_str(), "llm" | "table") {
		return Err(Error::Validation {
			message: "pipeline.format_mode must be one of llm or table.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let providers = &mut cfg.providers;

	for api_base in [
		&mut providers.embedding.api_base,
		&mut providers.rerank.api_base,
		&mut providers.router.api_base,
		&mut providers.extractor.api_base,
		&mut providers.sql_generator.api_base,
		&mut providers.responder.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	cfg.pipeline.format_mode = cfg.pipeline.format_mode.trim().to_ascii_lowercase();
}
