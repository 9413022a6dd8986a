use sqlx::{PgExecutor, Postgres, Transaction};

use crate::{
	Result,
	db::Db,
	models::{NoticeCandidateRow, NoticeEmbeddingSource},
};

/// Lexically filtered, similarity-ranked notice lookup.
///
/// A notice qualifies when any of its name, kind, demand institution or procurement
/// classification contains one of the keywords, and its metadata embedding reaches
/// `min_similarity` (cosine) against `embedding`.
pub async fn search_candidates(
	db: &Db,
	keywords: &[String],
	embedding: &[f32],
	min_similarity: f32,
	limit: u32,
) -> Result<Vec<NoticeCandidateRow>> {
	if keywords.is_empty() {
		return Ok(Vec::new());
	}

	let patterns: Vec<String> = keywords.iter().map(|keyword| like_pattern(keyword)).collect();
	let vec_text = crate::vector_to_pg(embedding);
	let rows = sqlx::query_as::<_, NoticeCandidateRow>(
		"\
WITH matches AS (
	SELECT
		bid_notice_no,
		bid_notice_nm,
		ntce_kind_nm,
		dminstt_nm,
		pub_prcrmnt_clsfc_nm,
		(1 - (content_embedding <=> $1::text::vector))::float8 AS similarity
	FROM naramarket_bids
	WHERE content_embedding IS NOT NULL
		AND (
			bid_notice_nm ILIKE ANY($2)
			OR ntce_kind_nm ILIKE ANY($2)
			OR dminstt_nm ILIKE ANY($2)
			OR pub_prcrmnt_clsfc_nm ILIKE ANY($2)
		)
)
SELECT bid_notice_no, bid_notice_nm, ntce_kind_nm, dminstt_nm, pub_prcrmnt_clsfc_nm, similarity
FROM matches
WHERE similarity >= $3
ORDER BY similarity DESC, bid_notice_no ASC
LIMIT $4",
	)
	.bind(vec_text.as_str())
	.bind(patterns.as_slice())
	.bind(f64::from(min_similarity))
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Locks the next batch of notices without a metadata embedding.
///
/// Notices whose four text fields are all blank have nothing to embed and are never selected.
pub async fn pending_embeddings_tx(
	tx: &mut Transaction<'_, Postgres>,
	limit: u32,
) -> Result<Vec<NoticeEmbeddingSource>> {
	let rows = sqlx::query_as::<_, NoticeEmbeddingSource>(
		"\
SELECT id::bigint AS id, bid_notice_nm, ntce_kind_nm, dminstt_nm, pub_prcrmnt_clsfc_nm
FROM naramarket_bids
WHERE content_embedding IS NULL
	AND btrim(
		concat_ws(' ', bid_notice_nm, ntce_kind_nm, dminstt_nm, pub_prcrmnt_clsfc_nm),
		E' \\t\\r\\n'
	) <> ''
ORDER BY id
LIMIT $1
FOR UPDATE SKIP LOCKED",
	)
	.bind(i64::from(limit))
	.fetch_all(&mut **tx)
	.await?;

	Ok(rows)
}

pub async fn update_embedding_tx(
	tx: &mut Transaction<'_, Postgres>,
	id: i64,
	embedding: &[f32],
) -> Result<()> {
	update_embedding_exec(&mut **tx, id, embedding).await
}

async fn update_embedding_exec<'e, E>(executor: E, id: i64, embedding: &[f32]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let vec_text = crate::vector_to_pg(embedding);

	sqlx::query("UPDATE naramarket_bids SET content_embedding = $1::text::vector WHERE id = $2")
		.bind(vec_text.as_str())
		.bind(id)
		.execute(executor)
		.await?;

	Ok(())
}

/// Wraps a keyword in `%…%`, escaping LIKE metacharacters so they match literally.
pub fn like_pattern(keyword: &str) -> String {
	let mut out = String::with_capacity(keyword.len() + 2);

	out.push('%');

	for ch in keyword.trim().chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out.push('%');

	out
}
