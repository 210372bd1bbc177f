//! Method registry and request dispatch.
//!
//! Mirrors the handshake gate in the original protocol handler: every
//! method except `initialize` and `ping` is rejected with
//! [`RpcErrorCode::ServerNotInitialized`] until `initialize` has run once.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{info, warn};

use super::capabilities::{InitializeRequest, InitializeResponse, ServerCapabilities, DEFAULT_PROTOCOL_VERSION};
use super::error::{RpcError, RpcErrorCode};
use super::message::{IncomingMessage, JsonRpcResponse, RequestId};

pub type MethodResult = Result<Value, RpcError>;
pub type MethodFuture = Pin<Box<dyn Future<Output = MethodResult> + Send>>;
pub type MethodHandler = Arc<dyn Fn(Value) -> MethodFuture + Send + Sync>;

/// Routes incoming JSON-RPC messages to registered method handlers,
/// enforcing the initialize-before-use handshake.
pub struct Router {
	server_name: String,
	server_version: String,
	capabilities: ServerCapabilities,
	initialized: AtomicBool,
	handlers: DashMap<String, MethodHandler>,
}

impl Router {
	pub fn new(server_name: impl Into<String>, server_version: impl Into<String>, capabilities: ServerCapabilities) -> Self {
		let router = Router {
			server_name: server_name.into(),
			server_version: server_version.into(),
			capabilities,
			initialized: AtomicBool::new(false),
			handlers: DashMap::new(),
		};
		router.register_builtins();
		router
	}

	fn register_builtins(&self) {
		self.handlers.insert("ping".to_string(), Arc::new(|_params| Box::pin(async { Ok(Value::Object(Default::default())) })));
	}

	/// Registers an application method (project, config, upload operations).
	/// `initialize`, `initialized`, and `ping` are reserved.
	pub fn register_method<F, Fut>(&self, name: impl Into<String>, handler: F)
	where
		F: Fn(Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = MethodResult> + Send + 'static,
	{
		let name = name.into();
		debug_assert!(name != "initialize" && name != "initialized", "reserved method name: {}", name);
		self.handlers.insert(name, Arc::new(move |params| Box::pin(handler(params))));
	}

	pub fn is_initialized(&self) -> bool {
		self.initialized.load(Ordering::Acquire)
	}

	/// Resets handshake state; used between test clients and between
	/// transport reconnects on a long-lived server process.
	pub fn reset(&self) {
		self.initialized.store(false, Ordering::Release);
	}

	async fn handle_initialize(&self, params: Value) -> MethodResult {
		let request: InitializeRequest = serde_json::from_value(params)
			.map_err(|e| RpcError::new(RpcErrorCode::InvalidParams, format!("invalid initialize params: {}", e)))?;

		let response = InitializeResponse::create(
			&self.server_name,
			&self.server_version,
			self.capabilities.clone(),
			if request.protocol_version.is_empty() { DEFAULT_PROTOCOL_VERSION } else { &request.protocol_version },
		);
		self.initialized.store(true, Ordering::Release);
		info!("server initialized: {} v{}", self.server_name, self.server_version);
		serde_json::to_value(response).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
	}

	/// Dispatches one decoded message. Requests receive a response;
	/// notifications are handled for effect and produce no reply.
	pub async fn dispatch(&self, message: IncomingMessage) -> Option<JsonRpcResponse> {
		match message {
			IncomingMessage::Request(request) => {
				let id = request.id.clone();
				let result = self.dispatch_method(&request.method, request.params.unwrap_or(Value::Null)).await;
				Some(match result {
					Ok(value) => JsonRpcResponse::success(id, value),
					Err(e) => JsonRpcResponse::error(id, &e),
				})
			}
			IncomingMessage::Notification(notification) => {
				if notification.method == "initialized" {
					info!("client confirmed initialization");
				} else if let Err(e) = self.dispatch_method(&notification.method, notification.params.unwrap_or(Value::Null)).await {
					warn!("notification '{}' failed: {}", notification.method, e);
				}
				None
			}
		}
	}

	async fn dispatch_method(&self, method: &str, params: Value) -> MethodResult {
		if method == "initialize" {
			return self.handle_initialize(params).await;
		}
		if method == "initialized" {
			return Ok(Value::Object(Default::default()));
		}

		if !self.is_initialized() && method != "ping" {
			return Err(RpcError::from_code(RpcErrorCode::ServerNotInitialized));
		}

		let Some(handler) = self.handlers.get(method).map(|h| h.clone()) else {
			return Err(RpcError::new(RpcErrorCode::MethodNotFound, format!("method '{}' not found", method)));
		};
		handler(params).await
	}
}

/// Produces a response for malformed JSON that never decoded into a
/// request or notification at all.
pub fn parse_error_response(id: Option<RequestId>) -> JsonRpcResponse {
	JsonRpcResponse::error(id.unwrap_or(RequestId::Number(0)), &RpcError::from_code(RpcErrorCode::ParseError))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::message::JsonRpcRequest;

	fn request(id: i64, method: &str, params: Value) -> IncomingMessage {
		IncomingMessage::Request(JsonRpcRequest { jsonrpc: "2.0".to_string(), id: RequestId::Number(id), method: method.to_string(), params: Some(params) })
	}

	#[tokio::test]
	async fn ping_works_before_initialize() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		let response = router.dispatch(request(1, "ping", Value::Null)).await.unwrap();
		assert!(response.error.is_none());
	}

	#[tokio::test]
	async fn uninitialized_method_is_rejected() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		router.register_method("projects.list", |_| async { Ok(Value::Array(vec![])) });
		let response = router.dispatch(request(1, "projects.list", Value::Null)).await.unwrap();
		assert_eq!(response.error.unwrap().code, RpcErrorCode::ServerNotInitialized.code());
	}

	#[tokio::test]
	async fn initialize_then_dispatch_succeeds() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		router.register_method("projects.list", |_| async { Ok(Value::Array(vec![])) });

		let init_params = serde_json::json!({
			"protocolVersion": "2024-11-05",
			"capabilities": {},
			"clientInfo": {"name": "test", "version": "1.0"}
		});
		let init = router.dispatch(request(1, "initialize", init_params)).await.unwrap();
		assert!(init.error.is_none());
		assert!(router.is_initialized());

		let response = router.dispatch(request(2, "projects.list", Value::Null)).await.unwrap();
		assert!(response.error.is_none());
	}

	#[tokio::test]
	async fn unknown_method_is_method_not_found() {
		let router = Router::new("docbro", "0.4.0", ServerCapabilities::default_admin());
		let init_params = serde_json::json!({"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {}});
		router.dispatch(request(1, "initialize", init_params)).await;

		let response = router.dispatch(request(2, "no.such.method", Value::Null)).await.unwrap();
		assert_eq!(response.error.unwrap().code, RpcErrorCode::MethodNotFound.code());
	}
}
