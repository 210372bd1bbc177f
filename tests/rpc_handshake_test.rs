//! Integration tests for the JSON-RPC/MCP initialize handshake and method
//! gating through `Router` and the HTTP transport shim.

use docbro::rpc::capabilities::ServerCapabilities;
use docbro::rpc::{RpcErrorCode, Router};
use docbro::rpc::transport_http::handle_post_body;
use serde_json::{json, Value};

fn router() -> Router {
	Router::new("docbro", "0.4.0", ServerCapabilities::default_admin())
}

#[tokio::test]
async fn ping_succeeds_before_initialize() {
	let router = router();
	let body = br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":null}"#;
	let response = handle_post_body(&router, body).await;
	let parsed: Value = serde_json::from_slice(&response).unwrap();
	assert_eq!(parsed["result"], json!({}));
}

#[tokio::test]
async fn application_methods_are_gated_until_initialized() {
	let router = router();
	router.register_method("projects.list", |_| async { Ok(json!([])) });

	let body = br#"{"jsonrpc":"2.0","id":1,"method":"projects.list","params":null}"#;
	let response = handle_post_body(&router, body).await;
	let parsed: Value = serde_json::from_slice(&response).unwrap();
	assert_eq!(parsed["error"]["code"], RpcErrorCode::ServerNotInitialized.code());

	let init = json!({
		"jsonrpc": "2.0", "id": 2, "method": "initialize",
		"params": {"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "test", "version": "1.0"}}
	});
	let init_response = handle_post_body(&router, init.to_string().as_bytes()).await;
	let init_parsed: Value = serde_json::from_slice(&init_response).unwrap();
	assert!(init_parsed["result"]["capabilities"].is_object());
	assert!(router.is_initialized());

	let response = handle_post_body(&router, body).await;
	let parsed: Value = serde_json::from_slice(&response).unwrap();
	assert_eq!(parsed["result"], json!([]));
}

#[tokio::test]
async fn initialized_notification_produces_no_reply() {
	let router = router();
	let body = br#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#;
	let response = handle_post_body(&router, body).await;
	assert!(response.is_empty());
}

#[tokio::test]
async fn unknown_method_after_initialize_is_method_not_found() {
	let router = router();
	let init = json!({
		"jsonrpc": "2.0", "id": 1, "method": "initialize",
		"params": {"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {}}
	});
	handle_post_body(&router, init.to_string().as_bytes()).await;

	let body = br#"{"jsonrpc":"2.0","id":2,"method":"no.such.thing","params":null}"#;
	let response = handle_post_body(&router, body).await;
	let parsed: Value = serde_json::from_slice(&response).unwrap();
	assert_eq!(parsed["error"]["code"], RpcErrorCode::MethodNotFound.code());
}

#[tokio::test]
async fn malformed_json_body_returns_parse_error() {
	let router = router();
	let response = handle_post_body(&router, b"{not json").await;
	let parsed: Value = serde_json::from_slice(&response).unwrap();
	assert_eq!(parsed["error"]["code"], RpcErrorCode::ParseError.code());
}
