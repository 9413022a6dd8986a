use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Document, Filter, PointId, Query, QueryPointsBuilder, ScoredPoint, Value,
	point_id::PointIdOptions, value::Kind,
};
use serde_json::{Map, Number};

use crate::{Result, models::Passage};

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";
/// Payload key partitioning passages by notice number.
pub const NAMESPACE_FIELD: &str = "namespace";
/// Payload key holding the passage text.
pub const CONTENT_FIELD: &str = "context";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &bidrag_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn dense_search(
		&self,
		namespace: &str,
		vector: Vec<f32>,
		limit: u32,
	) -> Result<Vec<Passage>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.filter(namespace_filter(namespace))
			.with_payload(true)
			.limit(limit as u64);
		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(point_to_passage).collect())
	}

	pub async fn sparse_search(
		&self,
		namespace: &str,
		text: &str,
		limit: u32,
	) -> Result<Vec<Passage>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(Document::new(text.to_string(), BM25_MODEL)))
			.using(BM25_VECTOR_NAME)
			.filter(namespace_filter(namespace))
			.with_payload(true)
			.limit(limit as u64);
		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(point_to_passage).collect())
	}
}

fn namespace_filter(namespace: &str) -> Filter {
	Filter::must([Condition::matches(NAMESPACE_FIELD, namespace.to_string())])
}

fn point_to_passage(point: ScoredPoint) -> Option<Passage> {
	let point_id = point.id.as_ref().and_then(point_id_to_string)?;
	let mut payload = point.payload;
	let content = match payload.remove(CONTENT_FIELD).and_then(|value| value.kind) {
		Some(Kind::StringValue(text)) => text,
		_ => {
			tracing::warn!(point_id = %point_id, "Passage payload has no text content.");

			return None;
		},
	};

	Some(Passage { point_id, content, metadata: payload_to_json(payload), score: point.score })
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(num)) => Some(num.to_string()),
		None => None,
	}
}

fn payload_to_json(payload: HashMap<String, Value>) -> Map<String, serde_json::Value> {
	let mut entries: Vec<(String, Value)> = payload.into_iter().collect();

	entries.sort_by(|a, b| a.0.cmp(&b.0));

	entries.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

fn value_to_json(value: Value) -> serde_json::Value {
	match value.kind {
		Some(Kind::StringValue(text)) => serde_json::Value::String(text),
		Some(Kind::IntegerValue(num)) => serde_json::Value::from(num),
		Some(Kind::DoubleValue(num)) =>
			Number::from_f64(num).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
		Some(Kind::BoolValue(flag)) => serde_json::Value::Bool(flag),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) =>
			serde_json::Value::Object(payload_to_json(object.fields)),
		Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn payload_values_convert_to_json() {
		let mut payload: HashMap<String, Value> = HashMap::new();

		payload.insert("namespace".to_string(), Value::from("20240101234-00"));
		payload.insert("page".to_string(), Value::from(3_i64));
		payload.insert("type".to_string(), Value::from("table"));

		let json = payload_to_json(payload);

		assert_eq!(json["namespace"], "20240101234-00");
		assert_eq!(json["page"], 3);
		assert_eq!(json["type"], "table");
	}

	#[test]
	fn points_without_text_are_skipped() {
		let mut point = ScoredPoint::default();

		point.id = Some(PointId::from(7_u64));
		point.score = 0.4;

		assert!(point_to_passage(point.clone()).is_none());

		point.payload.insert(CONTENT_FIELD.to_string(), Value::from("입찰 참가자격"));

		let passage = point_to_passage(point).expect("Expected a passage.");

		assert_eq!(passage.point_id, "7");
		assert_eq!(passage.content, "입찰 참가자격");
		assert!(passage.metadata.is_empty());
	}
}
