//! JSON-RPC envelope handling and reply-shape normalisation.

use serde_json::Value;

use crate::error::CraftError;

/// Strips event-stream framing from a reply body.
///
/// Replies arrive either as `event: message\ndata: <json>` frames or as a
/// raw JSON body. The first `data:` payload that parses wins; a body that
/// parses neither way is a protocol error.
pub(crate) fn parse_reply(body: &str) -> Result<Value, CraftError> {
	for line in body.lines() {
		let Some(payload) = line.strip_prefix("data:") else {
			continue;
		};
		if let Ok(value) = serde_json::from_str::<Value>(payload.trim()) {
			return Ok(value);
		}
	}
	serde_json::from_str::<Value>(body.trim())
		.map_err(|err| CraftError::Protocol(format!("unparseable reply: {err}")))
}

/// Unwraps a JSON-RPC envelope into the tool result.
pub(crate) fn unwrap_envelope(envelope: Value) -> Result<Value, CraftError> {
	if let Some(error) = envelope.get("error") {
		let message = error
			.get("message")
			.and_then(|m| m.as_str())
			.unwrap_or("unknown error");
		return Err(CraftError::Protocol(format!("rpc error: {message}")));
	}
	match envelope.get("result") {
		Some(result) => Ok(unwrap_tool_result(result.clone())),
		None => Err(CraftError::Protocol("reply has no result".to_string())),
	}
}

/// Tool results embed their payload as a text content block more often
/// than not; unwrap to the inner JSON when that is the case.
fn unwrap_tool_result(result: Value) -> Value {
	if let Some(structured) = result.get("structuredContent") {
		return structured.clone();
	}
	let embedded = result
		.get("content")
		.and_then(|c| c.as_array())
		.and_then(|items| items.first())
		.and_then(|item| item.get("text"))
		.and_then(|t| t.as_str());
	if let Some(text) = embedded {
		return serde_json::from_str::<Value>(text)
			.unwrap_or_else(|_| Value::String(text.to_string()));
	}
	result
}

/// Pulls the created-collection id out of a reply.
///
/// The protocol has shipped several shapes for this over time; each is
/// tried in order and absence of all of them is a hard protocol error,
/// never a silent null.
pub fn extract_collection_id(reply: &Value) -> Result<String, CraftError> {
	let candidates = [
		reply.get("collectionBlockId"),
		reply
			.get("collections")
			.and_then(|c| c.as_array())
			.and_then(|c| c.first())
			.and_then(|c| c.get("id")),
		reply.get("id"),
		reply.get("result").and_then(|r| r.get("id")),
		reply.get("collection").and_then(|c| c.get("id")),
	];
	for candidate in candidates.into_iter().flatten() {
		if let Some(id) = value_as_id(candidate) {
			return Ok(id);
		}
	}
	if let Some(id) = value_as_id(reply) {
		return Ok(id);
	}
	Err(CraftError::Protocol(format!(
		"no collection id in reply: {reply}"
	)))
}

fn value_as_id(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::{extract_collection_id, parse_reply, unwrap_envelope};

	#[test]
	fn parses_framed_reply() {
		let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n\n";
		let value = parse_reply(body).expect("parse");
		assert_eq!(value["result"]["ok"], json!(true));
	}

	#[test]
	fn parses_raw_json_reply() {
		let body = "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":[]}";
		assert!(parse_reply(body).is_ok());
	}

	#[test]
	fn rejects_garbage_reply() {
		assert!(parse_reply("<html>bad gateway</html>").is_err());
	}

	#[test]
	fn envelope_error_surfaces() {
		let envelope = json!({"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"boom"}});
		assert!(unwrap_envelope(envelope).is_err());
	}

	#[test]
	fn tool_result_text_content_is_unwrapped() {
		let envelope = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"result": {"content": [{"type": "text", "text": "{\"documents\":[]}"}]}
		});
		let result = unwrap_envelope(envelope).expect("unwrap");
		assert_eq!(result, json!({"documents": []}));
	}

	// Every shape the protocol has ever used for the created-collection id.
	#[test]
	fn collection_id_extraction_covers_all_shapes() {
		let shapes = [
			json!({"collectionBlockId": "c1"}),
			json!({"collections": [{"id": "c2"}]}),
			json!({"id": "c3"}),
			json!({"result": {"id": "c4"}}),
			json!({"collection": {"id": "c5"}}),
			json!("c6"),
			json!({"collectionBlockId": 42}),
		];
		let expected = ["c1", "c2", "c3", "c4", "c5", "c6", "42"];
		for (shape, want) in shapes.iter().zip(expected) {
			assert_eq!(extract_collection_id(shape).expect("extract"), want);
		}
	}

	#[test]
	fn collection_id_extraction_order_is_fixed() {
		let reply = json!({"id": "outer", "collectionBlockId": "block"});
		assert_eq!(extract_collection_id(&reply).expect("extract"), "block");
	}

	#[test]
	fn missing_collection_id_is_a_hard_error() {
		assert!(extract_collection_id(&json!({"ok": true})).is_err());
		assert!(extract_collection_id(&json!({"collectionBlockId": ""})).is_err());
	}
}
