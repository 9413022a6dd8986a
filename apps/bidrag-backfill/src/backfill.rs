use color_eyre::Result;

use bidrag_config::EmbeddingProviderConfig;
use bidrag_providers::embedding;
use bidrag_storage::{db::Db, models::NoticeEmbeddingSource, notices};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
	pub batches: u32,
	pub embedded: usize,
}

/// Pairs each pending notice id with the text sent to the embedding provider.
pub fn embedding_inputs(sources: &[NoticeEmbeddingSource]) -> (Vec<i64>, Vec<String>) {
	sources.iter().map(|source| (source.id, source.document_text())).unzip()
}

pub async fn run_backfill(
	db: &Db,
	cfg: &EmbeddingProviderConfig,
	batch_size: u32,
	max_batches: Option<u32>,
) -> Result<BackfillReport> {
	let mut report = BackfillReport::default();

	loop {
		if max_batches.is_some_and(|max| report.batches >= max) {
			tracing::info!(batches = report.batches, "Batch limit reached.");

			break;
		}

		let mut tx = db.pool.begin().await?;
		let sources = notices::pending_embeddings_tx(&mut tx, batch_size).await?;

		if sources.is_empty() {
			tx.rollback().await?;

			break;
		}

		let (ids, texts) = embedding_inputs(&sources);
		let vectors = embedding::embed_batch(cfg, &texts).await?;

		for (id, vector) in ids.iter().zip(&vectors) {
			notices::update_embedding_tx(&mut tx, *id, vector).await?;
		}

		tx.commit().await?;

		report.batches += 1;
		report.embedded += ids.len();

		tracing::info!(batch = report.batches, embedded = ids.len(), "Embedding batch committed.");
	}

	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn source(id: i64, name: &str, institution: Option<&str>) -> NoticeEmbeddingSource {
		NoticeEmbeddingSource {
			id,
			bid_notice_nm: Some(name.to_string()),
			ntce_kind_nm: None,
			dminstt_nm: institution.map(str::to_string),
			pub_prcrmnt_clsfc_nm: None,
		}
	}

	#[test]
	fn inputs_keep_batch_order() {
		let batch = [source(3, "드론 구매", Some("조달청")), source(1, "청소 용역", None)];
		let (ids, texts) = embedding_inputs(&batch);

		assert_eq!(ids, vec![3, 1]);
		assert_eq!(texts, vec!["드론 구매 조달청".to_string(), "청소 용역".to_string()]);
	}
}
