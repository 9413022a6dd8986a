use std::collections::VecDeque;

use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BoxFuture, ChunkStream, Error, Result, TextStream};
use bidrag_config::LlmProviderConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: String,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: "system".to_string(), content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: "user".to_string(), content: content.into() }
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self { role: "assistant".to_string(), content: content.into() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
	Text,
	/// Requests `{"type": "json_object"}`; callers still validate the returned text.
	Json,
}

pub async fn complete(
	cfg: &LlmProviderConfig,
	messages: &[ChatMessage],
	format: ResponseFormat,
) -> Result<String> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_completion_body(cfg, messages, format, false);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(json)
}

pub async fn stream(cfg: &LlmProviderConfig, messages: &[ChatMessage]) -> Result<TextStream> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_completion_body(cfg, messages, ResponseFormat::Text, true);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;

	Ok(Box::new(SseStream::new(res)))
}

fn build_completion_body(
	cfg: &LlmProviderConfig,
	messages: &[ChatMessage],
	format: ResponseFormat,
	stream: bool,
) -> Value {
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	if let Some(object) = body.as_object_mut() {
		if format == ResponseFormat::Json {
			object.insert(
				"response_format".to_string(),
				serde_json::json!({ "type": "json_object" }),
			);
		}
		if stream {
			object.insert("stream".to_string(), Value::Bool(true));
		}
	}

	body
}

fn parse_completion_content(json: Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::invalid_response("Completion response is missing message content."))
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
	Delta(String),
	Done,
	Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
	let Some(data) = line.strip_prefix("data:") else { return Ok(SseLine::Skip) };
	let data = data.trim();

	if data.is_empty() {
		return Ok(SseLine::Skip);
	}
	if data == "[DONE]" {
		return Ok(SseLine::Done);
	}

	let json: Value = serde_json::from_str(data)
		.map_err(|_| Error::invalid_response("Stream event is not valid JSON."))?;
	let delta = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|c| c.as_str())
		.unwrap_or_default();

	if delta.is_empty() { Ok(SseLine::Skip) } else { Ok(SseLine::Delta(delta.to_string())) }
}

struct SseStream {
	response: Response,
	buffer: Vec<u8>,
	pending: VecDeque<String>,
	finished: bool,
}
impl SseStream {
	fn new(response: Response) -> Self {
		Self { response, buffer: Vec::new(), pending: VecDeque::new(), finished: false }
	}

	fn drain_lines(&mut self) -> Result<()> {
		while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
			let line: Vec<u8> = self.buffer.drain(..=pos).collect();

			self.push_line(&line)?;
		}

		Ok(())
	}

	fn push_line(&mut self, line: &[u8]) -> Result<()> {
		let text = String::from_utf8_lossy(line);

		match parse_sse_line(text.trim_end())? {
			SseLine::Delta(delta) => self.pending.push_back(delta),
			SseLine::Done => self.finished = true,
			SseLine::Skip => {},
		}

		Ok(())
	}

	async fn next(&mut self) -> Result<Option<String>> {
		loop {
			if let Some(chunk) = self.pending.pop_front() {
				return Ok(Some(chunk));
			}
			if self.finished {
				return Ok(None);
			}

			match self.response.chunk().await? {
				Some(bytes) => {
					self.buffer.extend_from_slice(&bytes);
					self.drain_lines()?;
				},
				None => {
					let rest = std::mem::take(&mut self.buffer);

					if !rest.is_empty() {
						self.push_line(&rest)?;
					}

					self.finished = true;
				},
			}
		}
	}
}
impl ChunkStream for SseStream {
	fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
		Box::pin(self.next())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_message_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": "structured" } }
			]
		});
		let content = parse_completion_content(json).expect("parse failed");

		assert_eq!(content, "structured");
	}

	#[test]
	fn missing_content_is_invalid_response() {
		let json = serde_json::json!({ "choices": [] });

		assert!(matches!(parse_completion_content(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn sse_lines_yield_deltas_and_done() {
		let delta = r#"data: {"choices":[{"delta":{"content":"월별"}}]}"#;

		assert_eq!(parse_sse_line(delta).expect("parse failed"), SseLine::Delta("월별".to_string()));
		assert_eq!(parse_sse_line("data: [DONE]").expect("parse failed"), SseLine::Done);
		assert_eq!(parse_sse_line(": keep-alive").expect("parse failed"), SseLine::Skip);
		assert_eq!(
			parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#)
				.expect("parse failed"),
			SseLine::Skip
		);
	}

	#[test]
	fn json_format_requests_json_object() {
		let cfg = LlmProviderConfig {
			provider_id: "test".to_string(),
			api_base: "http://localhost".to_string(),
			api_key: "key".to_string(),
			path: "/chat/completions".to_string(),
			model: "m".to_string(),
			temperature: 0.0,
			timeout_ms: 1_000,
			default_headers: serde_json::Map::new(),
		};
		let body = build_completion_body(&cfg, &[ChatMessage::user("q")], ResponseFormat::Json, true);

		assert_eq!(body["response_format"]["type"], "json_object");
		assert_eq!(body["stream"], true);
		assert_eq!(body["messages"][0]["role"], "user");
	}
}
