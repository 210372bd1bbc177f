//! HTTP transport shim.
//!
//! The protocol core only knows how to turn one decoded message into one
//! response; this module is the thin adapter that lets an HTTP POST body
//! drive it. No listening socket lives here — that belongs to whatever
//! framework a deployment wires this into. Notifications have no wire
//! representation over this transport; a [`Notifier`] is how a caller
//! observes them out of band.

use serde_json::Value;

use super::message::{IncomingMessage, RequestId};
use super::router::{parse_error_response, Router};

/// Observes notifications dispatched with no request/response pairing.
/// The default no-op implementation is correct for a deployment that
/// doesn't care about server-initiated events (progress, log messages).
pub trait Notifier: Send + Sync {
	fn notify(&self, method: &str, params: Option<Value>);
}

pub struct NullNotifier;

impl Notifier for NullNotifier {
	fn notify(&self, _method: &str, _params: Option<Value>) {}
}

/// Decodes one HTTP POST body as a JSON-RPC message, dispatches it, and
/// encodes the response body. A request produces a JSON body; a
/// notification produces an empty body, matching a `204 No Content`
/// semantics the caller's HTTP layer is expected to apply.
pub async fn handle_post_body(router: &Router, body: &[u8]) -> Vec<u8> {
	let message: Result<IncomingMessage, _> = serde_json::from_slice(body);
	let response = match message {
		Ok(message) => router.dispatch(message).await,
		Err(_) => Some(parse_error_response(extract_id(body))),
	};

	match response {
		Some(response) => serde_json::to_vec(&response).unwrap_or_default(),
		None => Vec::new(),
	}
}

/// Best-effort extraction of the request id from an otherwise-unparseable
/// body, so a parse-error response still echoes the caller's id when
/// possible, per JSON-RPC 2.0 error semantics.
fn extract_id(body: &[u8]) -> Option<RequestId> {
	let value: Value = serde_json::from_slice(body).ok()?;
	let id = value.get("id")?;
	if let Some(s) = id.as_str() {
		Some(RequestId::String(s.to_string()))
	} else {
		id.as_i64().map(RequestId::Number)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::capabilities::ServerCapabilities;

	#[tokio::test]
	async fn ping_over_http_shim_returns_success() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		let body = br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":null}"#;
		let response = handle_post_body(&router, body).await;
		let parsed: Value = serde_json::from_slice(&response).unwrap();
		assert_eq!(parsed["result"], serde_json::json!({}));
	}

	#[tokio::test]
	async fn malformed_body_returns_parse_error() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		let response = handle_post_body(&router, b"not json").await;
		let parsed: Value = serde_json::from_slice(&response).unwrap();
		assert_eq!(parsed["error"]["code"], -32700);
	}

	#[tokio::test]
	async fn notification_produces_empty_body() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		let body = br#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#;
		let response = handle_post_body(&router, body).await;
		assert!(response.is_empty());
	}
}
