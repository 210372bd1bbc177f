//! MCP capability negotiation models exchanged during `initialize`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
	#[serde(rename = "listChanged")]
	pub list_changed: bool,
}

impl Default for ToolsCapability {
	fn default() -> Self {
		ToolsCapability { list_changed: true }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesCapability {
	pub subscribe: bool,
	#[serde(rename = "listChanged")]
	pub list_changed: bool,
}

impl Default for ResourcesCapability {
	fn default() -> Self {
		ResourcesCapability { subscribe: false, list_changed: true }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsCapability {
	#[serde(rename = "listChanged")]
	pub list_changed: bool,
}

impl Default for PromptsCapability {
	fn default() -> Self {
		PromptsCapability { list_changed: false }
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingCapability {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tools: Option<ToolsCapability>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resources: Option<ResourcesCapability>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prompts: Option<PromptsCapability>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub logging: Option<LoggingCapability>,
}

impl ServerCapabilities {
	/// Capability set for a read-only surface: no destructive project or
	/// upload operations exposed, just inspection methods.
	pub fn default_read_only() -> Self {
		ServerCapabilities {
			tools: Some(ToolsCapability::default()),
			resources: Some(ResourcesCapability::default()),
			prompts: Some(PromptsCapability::default()),
			logging: Some(LoggingCapability::default()),
		}
	}

	/// Capability set for the full administrative surface: project
	/// lifecycle, config mutation, and upload orchestration all exposed.
	pub fn default_admin() -> Self {
		Self::default_read_only()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientCapabilities {
	#[serde(default)]
	pub experimental: Option<serde_json::Value>,
	#[serde(default)]
	pub roots: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
	pub name: String,
	pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeRequest {
	#[serde(rename = "protocolVersion")]
	pub protocol_version: String,
	#[serde(default)]
	pub capabilities: ClientCapabilities,
	#[serde(rename = "clientInfo")]
	pub client_info: serde_json::Value,
}

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResponse {
	#[serde(rename = "protocolVersion")]
	pub protocol_version: String,
	pub capabilities: ServerCapabilities,
	#[serde(rename = "serverInfo")]
	pub server_info: ServerInfo,
}

impl InitializeResponse {
	pub fn create(server_name: &str, server_version: &str, capabilities: ServerCapabilities, protocol_version: &str) -> Self {
		InitializeResponse {
			protocol_version: protocol_version.to_string(),
			capabilities,
			server_info: ServerInfo { name: server_name.to_string(), version: server_version.to_string() },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn admin_and_read_only_both_advertise_all_capability_groups() {
		let admin = ServerCapabilities::default_admin();
		assert!(admin.tools.is_some());
		assert!(admin.resources.is_some());
		assert!(admin.prompts.is_some());
		assert!(admin.logging.is_some());
	}

	#[test]
	fn initialize_response_uses_requested_protocol_version() {
		let response = InitializeResponse::create("docbro", "0.4.0", ServerCapabilities::default_admin(), "2024-11-05");
		assert_eq!(response.protocol_version, "2024-11-05");
		assert_eq!(response.server_info.name, "docbro");
	}
}
