//! Hierarchical configuration: type defaults, global/project files, environment overrides
//!
//! Settings are carried in one consolidated [`ProjectConfig`] struct (with
//! optionals for type-specific fields) rather than dynamically-typed maps,
//! per the "typed configuration struct with optionals" design: keys unknown
//! to a type are still carried in `extra` for round-trip, but never
//! participate in validation.

mod env;
mod resolver;
mod validation;

pub use env::EnvConfigHandler;
pub use resolver::{ConfigResolver, ConfigSummary};
pub use validation::{validate_settings, ValidationOutcome};

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strategies::SettingSource;
use crate::types::ProjectType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreType {
	#[default]
	SqliteVec,
	Qdrant,
}

impl std::str::FromStr for VectorStoreType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"sqlite_vec" | "sqlite-vec" => Ok(Self::SqliteVec),
			"qdrant" => Ok(Self::Qdrant),
			_ => Err(format!("unknown vector store type: {}", s)),
		}
	}
}

/// Effective or partial settings for one project. All type-specific fields
/// are optional; a setting outside the project's type surface is carried in
/// `extra` and reported as "incompatible" by validation, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
	// shared base
	pub max_file_size: u64,
	pub allowed_formats: Vec<String>,
	pub concurrent_uploads: Option<u32>,
	pub retry_attempts: Option<u32>,
	pub timeout_seconds: Option<u32>,

	// crawling-only
	pub crawl_depth: Option<u32>,
	pub rate_limit: Option<f64>,
	pub user_agent: Option<String>,
	pub follow_redirects: Option<bool>,
	pub respect_robots_txt: Option<bool>,

	// data-only
	pub chunk_size: Option<u32>,
	pub chunk_overlap: Option<u32>,
	pub embedding_model: Option<String>,
	pub vector_store_type: Option<VectorStoreType>,

	// storage-only
	pub enable_compression: Option<bool>,
	pub auto_tagging: Option<bool>,
	pub full_text_indexing: Option<bool>,
	pub storage_encryption: Option<bool>,

	/// Settings not recognized by any type surface, carried for round-trip.
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

impl Default for ProjectConfig {
	fn default() -> Self {
		ProjectConfig {
			max_file_size: 10 * 1024 * 1024,
			allowed_formats: vec!["*".to_string()],
			concurrent_uploads: Some(3),
			retry_attempts: Some(3),
			timeout_seconds: Some(30),
			crawl_depth: None,
			rate_limit: None,
			user_agent: None,
			follow_redirects: None,
			respect_robots_txt: None,
			chunk_size: None,
			chunk_overlap: None,
			embedding_model: None,
			vector_store_type: None,
			enable_compression: None,
			auto_tagging: None,
			full_text_indexing: None,
			storage_encryption: None,
			extra: HashMap::new(),
		}
	}
}

impl ProjectConfig {
	/// Type defaults, per project type, layered first in resolution.
	pub fn type_defaults(project_type: ProjectType) -> Self {
		let mut cfg = ProjectConfig::default();
		match project_type {
			ProjectType::Crawling => {
				cfg.allowed_formats = vec!["html".to_string()];
				cfg.crawl_depth = Some(3);
				cfg.rate_limit = Some(1.0);
				cfg.user_agent = Some("docbro/1.0".to_string());
				cfg.follow_redirects = Some(true);
				cfg.respect_robots_txt = Some(true);
			}
			ProjectType::Data => {
				cfg.allowed_formats = vec!["md".to_string(), "txt".to_string(), "html".to_string(), "json".to_string()];
				cfg.chunk_size = Some(500);
				cfg.chunk_overlap = Some(50);
				cfg.embedding_model = Some("mxbai-embed-large".to_string());
				cfg.vector_store_type = Some(VectorStoreType::SqliteVec);
			}
			ProjectType::Storage => {
				cfg.enable_compression = Some(false);
				cfg.auto_tagging = Some(true);
				cfg.full_text_indexing = Some(true);
				cfg.storage_encryption = Some(false);
			}
		}
		cfg
	}

	/// Recursively merges `other` on top of `self`; scalar fields in `other`
	/// replace `self`'s when `Some`, `extra` keys are merged shallowly.
	/// `max_file_size == 0` and an empty `allowed_formats` are treated as
	/// "not set by this layer" rather than literal values, so a layer
	/// built for override purposes only needs to populate the keys it cares about.
	pub fn merge(mut self, other: ProjectConfig) -> Self {
		let ProjectConfig {
			max_file_size,
			allowed_formats,
			concurrent_uploads,
			retry_attempts,
			timeout_seconds,
			crawl_depth,
			rate_limit,
			user_agent,
			follow_redirects,
			respect_robots_txt,
			chunk_size,
			chunk_overlap,
			embedding_model,
			vector_store_type,
			enable_compression,
			auto_tagging,
			full_text_indexing,
			storage_encryption,
			extra,
		} = other;

		if max_file_size != 0 {
			self.max_file_size = max_file_size;
		}
		if !allowed_formats.is_empty() {
			self.allowed_formats = allowed_formats;
		}
		macro_rules! overlay {
			($field:ident, $val:expr) => {
				if $val.is_some() {
					self.$field = $val;
				}
			};
		}
		overlay!(concurrent_uploads, concurrent_uploads);
		overlay!(retry_attempts, retry_attempts);
		overlay!(timeout_seconds, timeout_seconds);
		overlay!(crawl_depth, crawl_depth);
		overlay!(rate_limit, rate_limit);
		overlay!(user_agent, user_agent);
		overlay!(follow_redirects, follow_redirects);
		overlay!(respect_robots_txt, respect_robots_txt);
		overlay!(chunk_size, chunk_size);
		overlay!(chunk_overlap, chunk_overlap);
		overlay!(embedding_model, embedding_model);
		overlay!(vector_store_type, vector_store_type);
		overlay!(enable_compression, enable_compression);
		overlay!(auto_tagging, auto_tagging);
		overlay!(full_text_indexing, full_text_indexing);
		overlay!(storage_encryption, storage_encryption);

		self.extra.extend(extra);
		self
	}
}

/// Per-key provenance for a resolved setting.
pub type Provenance = HashMap<String, SettingSource>;

#[derive(Debug)]
pub enum ConfigError {
	NotFound { name: String },
	InvalidInput { message: String },
	Invalid { reasons: Vec<String> },
	Io(std::io::Error),
	Parse(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::NotFound { name } => write!(f, "project '{}' not found", name),
			ConfigError::InvalidInput { message } => write!(f, "invalid input: {}", message),
			ConfigError::Invalid { reasons } => write!(f, "invalid settings: {}", reasons.join("; ")),
			ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
			ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
		}
	}
}

impl Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
	fn from(e: std::io::Error) -> Self {
		ConfigError::Io(e)
	}
}

impl From<serde_yaml::Error> for ConfigError {
	fn from(e: serde_yaml::Error) -> Self {
		ConfigError::Parse(crate::error::boxed_error(e))
	}
}

impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		ConfigError::Parse(crate::error::boxed_error(e))
	}
}
