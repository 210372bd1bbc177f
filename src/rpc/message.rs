//! JSON-RPC 2.0 message envelopes.
//!
//! <https://www.jsonrpc.org/specification>, plus the id type restricted to
//! string or integer as MCP clients send.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RpcError, RpcErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	String(String),
	Number(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl JsonRpcErrorObject {
	pub fn from_rpc_error(e: &RpcError) -> Self {
		JsonRpcErrorObject { code: e.code.code(), message: e.message.clone(), data: None }
	}

	pub fn from_code(code: RpcErrorCode) -> Self {
		JsonRpcErrorObject { code: code.code(), message: code.default_message().to_string(), data: None }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
	pub jsonrpc: String,
	pub id: RequestId,
	pub method: String,
	#[serde(default)]
	pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
	pub jsonrpc: String,
	pub method: String,
	#[serde(default)]
	pub params: Option<Value>,
}

/// Either a request awaiting a response or a fire-and-forget notification;
/// the two differ only in the presence of `id` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
	Request(JsonRpcRequest),
	Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
	pub jsonrpc: String,
	pub id: RequestId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
	pub fn success(id: RequestId, result: Value) -> Self {
		JsonRpcResponse { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
	}

	pub fn error(id: RequestId, error: &RpcError) -> Self {
		JsonRpcResponse { jsonrpc: "2.0".to_string(), id, result: None, error: Some(JsonRpcErrorObject::from_rpc_error(error)) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_request_with_string_id() {
		let raw = r#"{"jsonrpc":"2.0","id":"1","method":"ping","params":null}"#;
		let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
		match msg {
			IncomingMessage::Request(req) => {
				assert_eq!(req.method, "ping");
				assert_eq!(req.id, RequestId::String("1".to_string()));
			}
			_ => panic!("expected request"),
		}
	}

	#[test]
	fn parses_notification_without_id() {
		let raw = r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#;
		let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
		assert!(matches!(msg, IncomingMessage::Notification(_)));
	}

	#[test]
	fn success_response_omits_error_field() {
		let response = JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
		let encoded = serde_json::to_string(&response).unwrap();
		assert!(!encoded.contains("\"error\""));
	}
}
