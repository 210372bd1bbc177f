//! Environment variable overrides: `DOCBRO_PROJECT_<NAME>_<KEY>` and
//! `DOCBRO_DEFAULT_<TYPE>_<KEY>`, typed per key.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::ProjectType;

/// Suffixes recognized on `DOCBRO_PROJECT_<NAME>_<SUFFIX>`, mapped to the
/// `ProjectConfig` field they override.
const ENV_VAR_MAPPING: &[(&str, &str)] = &[
	("MAX_FILE_SIZE", "max_file_size"),
	("CHUNK_SIZE", "chunk_size"),
	("CHUNK_OVERLAP", "chunk_overlap"),
	("CRAWL_DEPTH", "crawl_depth"),
	("RATE_LIMIT", "rate_limit"),
	("EMBEDDING_MODEL", "embedding_model"),
	("VECTOR_STORE_TYPE", "vector_store_type"),
	("ENABLE_COMPRESSION", "enable_compression"),
	("AUTO_TAGGING", "auto_tagging"),
	("FULL_TEXT_INDEXING", "full_text_indexing"),
	("ALLOWED_FORMATS", "allowed_formats"),
];

const DEPRECATED_VARS: &[&str] = &["DOCBRO_REDIS_URL", "DOCBRO_REDIS_PASSWORD", "DOCBRO_REDIS_DEPLOYMENT"];

/// Reads and parses `DOCBRO_PROJECT_*` / `DOCBRO_DEFAULT_*` environment
/// variables into the shapes the config resolver needs.
pub struct EnvConfigHandler;

impl EnvConfigHandler {
	/// `DOCBRO_PROJECT_<CLEANED_NAME>`, with non-alphanumerics mapped to `_`.
	pub fn project_env_prefix(project_name: &str) -> String {
		let clean: String = project_name
			.to_uppercase()
			.chars()
			.map(|c| if c.is_alphanumeric() { c } else { '_' })
			.collect();
		format!("DOCBRO_PROJECT_{}", clean)
	}

	/// Per-project overrides keyed by the `ProjectConfig` field name they apply to.
	pub fn env_overrides(project_name: &str) -> HashMap<String, Value> {
		let prefix = Self::project_env_prefix(project_name);
		let mut overrides = HashMap::new();

		for (suffix, setting) in ENV_VAR_MAPPING {
			let var = format!("{}_{}", prefix, suffix);
			if let Ok(value) = std::env::var(&var) {
				match Self::parse_env_value(suffix, &value) {
					Some(parsed) => {
						debug!("applied env override {}={} to {}", var, value, setting);
						overrides.insert(setting.to_string(), parsed);
					}
					None => warn!("failed to parse env var {}={}", var, value),
				}
			}
		}

		overrides
	}

	fn parse_env_value(suffix: &str, value: &str) -> Option<Value> {
		match suffix {
			"MAX_FILE_SIZE" | "CHUNK_SIZE" | "CHUNK_OVERLAP" | "CRAWL_DEPTH" => {
				value.parse::<i64>().ok().map(Value::from)
			}
			"RATE_LIMIT" => value.parse::<f64>().ok().map(|f| Value::from(f)),
			"ENABLE_COMPRESSION" | "AUTO_TAGGING" | "FULL_TEXT_INDEXING" => {
				Some(Value::Bool(matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")))
			}
			"ALLOWED_FORMATS" => {
				let formats: Vec<Value> = value
					.split(',')
					.map(|f| f.trim())
					.filter(|f| !f.is_empty())
					.map(|f| Value::String(f.to_string()))
					.collect();
				Some(Value::Array(formats))
			}
			_ => Some(Value::String(value.to_string())),
		}
	}

	/// Global, non-project-scoped overrides: `DOCBRO_DEFAULT_<TYPE>_<KEY>`
	/// plus a small set of well-known CLI keys.
	pub fn global_overrides() -> HashMap<String, Value> {
		let mut overrides = HashMap::new();

		if let Ok(v) = std::env::var("DOCBRO_PROJECT_MAX_FILE_SIZE") {
			match v.parse::<i64>() {
				Ok(n) => {
					overrides.insert("project_max_file_size".to_string(), Value::from(n));
				}
				Err(_) => warn!("invalid DOCBRO_PROJECT_MAX_FILE_SIZE: {}", v),
			}
		}

		for key in ["DOCBRO_CLI_GLOBAL_UNIQUE_SHORTCUTS", "DOCBRO_CLI_TWO_CHAR_FALLBACK"] {
			if let Ok(v) = std::env::var(key) {
				overrides.insert(
					key.to_lowercase().trim_start_matches("docbro_").to_string(),
					Value::Bool(matches!(v.to_lowercase().as_str(), "true" | "1" | "yes")),
				);
			}
		}

		for project_type in ["CRAWLING", "DATA", "STORAGE"] {
			let prefix = format!("DOCBRO_DEFAULT_{}", project_type);
			if let Ok(v) = std::env::var(format!("{}_CHUNK_SIZE", prefix)) {
				if let Ok(n) = v.parse::<i64>() {
					overrides.insert(format!("project_defaults.{}.chunk_size", project_type.to_lowercase()), Value::from(n));
				}
			}
			if let Ok(v) = std::env::var(format!("{}_EMBEDDING_MODEL", prefix)) {
				overrides.insert(format!("project_defaults.{}.embedding_model", project_type.to_lowercase()), Value::String(v));
			}
		}

		overrides
	}

	/// Generates a commented `.env` template for a project's type.
	pub fn export_project_env_template(project_name: &str, project_type: ProjectType) -> String {
		let prefix = Self::project_env_prefix(project_name);
		let mut lines = vec![
			format!("# Environment variables for project: {}", project_name),
			format!("# Project type: {}", project_type),
			String::new(),
			"# File handling".to_string(),
			format!("# {}_MAX_FILE_SIZE=10485760  # Max file size in bytes", prefix),
			String::new(),
		];

		match project_type {
			ProjectType::Crawling => {
				lines.push("# Crawling settings".to_string());
				lines.push(format!("# {}_CRAWL_DEPTH=3  # Crawl depth (1-10)", prefix));
				lines.push(format!("# {}_RATE_LIMIT=1.0  # Requests per second", prefix));
				lines.push(String::new());
			}
			ProjectType::Data => {
				lines.push("# Vector processing settings".to_string());
				lines.push(format!("# {}_CHUNK_SIZE=500  # Chunk size for embeddings", prefix));
				lines.push(format!("# {}_CHUNK_OVERLAP=50  # Overlap between chunks", prefix));
				lines.push(format!("# {}_EMBEDDING_MODEL=mxbai-embed-large", prefix));
				lines.push(format!("# {}_VECTOR_STORE_TYPE=sqlite_vec  # or 'qdrant'", prefix));
				lines.push(String::new());
			}
			ProjectType::Storage => {
				lines.push("# Storage settings".to_string());
				lines.push(format!("# {}_ENABLE_COMPRESSION=true", prefix));
				lines.push(format!("# {}_AUTO_TAGGING=true", prefix));
				lines.push(format!("# {}_FULL_TEXT_INDEXING=true", prefix));
				lines.push(String::new());
			}
		}

		lines.push("# Allowed file formats (comma-separated)".to_string());
		lines.push(format!("# {}_ALLOWED_FORMATS=pdf,docx,txt,md,html", prefix));
		lines.push(String::new());
		lines.push("# Note: these variables override project-specific settings".to_string());
		lines.push("# Note: boolean values accept true/false, 1/0, yes/no, on/off".to_string());

		lines.join("\n")
	}

	/// Scans the environment for mixed-type overrides on one project prefix
	/// and known-deprecated variable names; returns human-readable warnings.
	pub fn validate_env_config() -> Vec<String> {
		let mut warnings = Vec::new();
		let vars: Vec<String> = std::env::vars().map(|(k, _)| k).collect();

		let mut project_prefixes = std::collections::HashSet::new();
		for key in &vars {
			if let Some(rest) = key.strip_prefix("DOCBRO_PROJECT_") {
				let parts: Vec<&str> = rest.split('_').collect();
				if !parts.is_empty() {
					project_prefixes.insert(format!("DOCBRO_PROJECT_{}", parts[0]));
				}
			}
		}

		for prefix in &project_prefixes {
			let has_crawling = vars.iter().any(|k| k.starts_with(&format!("{}_CRAWL", prefix)));
			let has_data = vars
				.iter()
				.any(|k| k.starts_with(&format!("{}_CHUNK", prefix)) || k.starts_with(&format!("{}_EMBEDDING", prefix)));
			let has_storage = vars.iter().any(|k| {
				k.starts_with(&format!("{}_ENABLE_COMPRESSION", prefix)) || k.starts_with(&format!("{}_AUTO_TAGGING", prefix))
			});

			let kinds = [has_crawling, has_data, has_storage].iter().filter(|b| **b).count();
			if kinds > 1 {
				let project_name = prefix.trim_start_matches("DOCBRO_PROJECT_");
				warnings.push(format!("project {} has mixed type settings in environment variables", project_name));
			}
		}

		for var in DEPRECATED_VARS {
			if vars.iter().any(|k| k == var) {
				warnings.push(format!("deprecated environment variable found: {}", var));
			}
		}

		warnings
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_sanitizes_project_name() {
		assert_eq!(EnvConfigHandler::project_env_prefix("my-kb 1"), "DOCBRO_PROJECT_MY_KB_1");
	}

	#[test]
	fn parses_typed_values() {
		assert_eq!(EnvConfigHandler::parse_env_value("CHUNK_SIZE", "500"), Some(Value::from(500)));
		assert_eq!(EnvConfigHandler::parse_env_value("RATE_LIMIT", "1.5"), Some(Value::from(1.5)));
		assert_eq!(EnvConfigHandler::parse_env_value("ENABLE_COMPRESSION", "yes"), Some(Value::Bool(true)));
		assert_eq!(
			EnvConfigHandler::parse_env_value("ALLOWED_FORMATS", "pdf, txt ,md"),
			Some(Value::Array(vec![Value::String("pdf".into()), Value::String("txt".into()), Value::String("md".into())]))
		);
	}

	#[test]
	fn rejects_unparseable_int() {
		assert_eq!(EnvConfigHandler::parse_env_value("CHUNK_SIZE", "not-a-number"), None);
	}

	#[test]
	fn template_mentions_type_specific_keys() {
		let template = EnvConfigHandler::export_project_env_template("kb", ProjectType::Data);
		assert!(template.contains("CHUNK_SIZE"));
		assert!(template.contains("EMBEDDING_MODEL"));
	}
}
