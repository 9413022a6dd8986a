use serde_json::{Map, Value};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoticeCandidateRow {
	pub bid_notice_no: String,
	pub bid_notice_nm: Option<String>,
	pub ntce_kind_nm: Option<String>,
	pub dminstt_nm: Option<String>,
	pub pub_prcrmnt_clsfc_nm: Option<String>,
	pub similarity: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoticeEmbeddingSource {
	pub id: i64,
	pub bid_notice_nm: Option<String>,
	pub ntce_kind_nm: Option<String>,
	pub dminstt_nm: Option<String>,
	pub pub_prcrmnt_clsfc_nm: Option<String>,
}
impl NoticeEmbeddingSource {
	/// Text embedded into `content_embedding`; missing fields are skipped.
	pub fn document_text(&self) -> String {
		[&self.bid_notice_nm, &self.ntce_kind_nm, &self.dminstt_nm, &self.pub_prcrmnt_clsfc_nm]
			.into_iter()
			.filter_map(|field| field.as_deref())
			.map(str::trim)
			.filter(|field| !field.is_empty())
			.collect::<Vec<_>>()
			.join(" ")
	}
}

/// One passage returned by the passage index.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
	pub point_id: String,
	pub content: String,
	pub metadata: Map<String, Value>,
	pub score: f32,
}
