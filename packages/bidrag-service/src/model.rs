use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use bidrag_storage::models::NoticeCandidateRow;

const NOTICE_URL_BASE: &str = "https://www.g2b.go.kr:8101/ep/invitation/publish/bidInfoDtl.do?bidno=";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
	pub content: String,
	pub metadata: Map<String, Value>,
	/// Relevance in `[0, 1]`; unset before any scoring stage ran.
	pub score: Option<f32>,
}
impl RetrievedItem {
	pub fn new(content: impl Into<String>, metadata: Map<String, Value>) -> Self {
		Self { content: content.into(), metadata, score: None }
	}

	pub fn with_score(&self, score: f32) -> Self {
		Self { score: Some(score), ..self.clone() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePath {
	Structured,
	Semantic,
}
impl SourcePath {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Structured => "structured",
			Self::Semantic => "semantic",
		}
	}
}

/// Rank-ordered items from one retrieval path.
///
/// The source path is fixed at construction; stages that reorder or rescore build a new set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
	items: Vec<RetrievedItem>,
	source_path: SourcePath,
	raw_upstream: Option<Value>,
}
impl ResultSet {
	pub fn new(
		source_path: SourcePath,
		items: Vec<RetrievedItem>,
		raw_upstream: Option<Value>,
	) -> Self {
		Self { items, source_path, raw_upstream }
	}

	pub fn items(&self) -> &[RetrievedItem] {
		&self.items
	}

	pub fn source_path(&self) -> SourcePath {
		self.source_path
	}

	pub fn raw_upstream(&self) -> Option<&Value> {
		self.raw_upstream.as_ref()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn into_items(self) -> Vec<RetrievedItem> {
		self.items
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceCandidate {
	pub notice_id: String,
	pub display_name: String,
	pub notice_kind: Option<String>,
	pub classification: Option<String>,
	pub demand_institution: Option<String>,
	pub similarity: f64,
	pub url: String,
}
impl NamespaceCandidate {
	pub fn from_row(row: NoticeCandidateRow) -> Self {
		let display_name = row.bid_notice_nm.unwrap_or_else(|| row.bid_notice_no.clone());

		Self {
			url: notice_url(&row.bid_notice_no),
			notice_id: row.bid_notice_no,
			display_name,
			notice_kind: row.ntce_kind_nm,
			classification: row.pub_prcrmnt_clsfc_nm,
			demand_institution: row.dminstt_nm,
			similarity: row.similarity,
		}
	}
}

/// A confirmed notice number scoping semantic search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedNamespace(String);
impl ResolvedNamespace {
	pub fn new(notice_id: impl Into<String>) -> Self {
		Self(notice_id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for ResolvedNamespace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
	General,
	Qualification,
	Price,
	Schedule,
}
impl SearchType {
	/// Unknown labels fall back to `General`.
	pub fn from_label(label: &str) -> Self {
		match label.trim().to_ascii_lowercase().as_str() {
			"qualification" => Self::Qualification,
			"price" => Self::Price,
			"schedule" => Self::Schedule,
			_ => Self::General,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
	pub keywords: Vec<String>,
	pub search_type: SearchType,
	pub filters: Map<String, Value>,
	pub confidence: f32,
}

pub fn notice_url(notice_id: &str) -> String {
	format!("{NOTICE_URL_BASE}{notice_id}")
}
