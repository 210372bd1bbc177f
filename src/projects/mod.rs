//! Project type handlers (C3): one variant per [`ProjectType`], dispatched
//! through a [`factory::ProjectHandlerFactory`].
//!
//! All variants implement [`ProjectHandler`]'s common capability set;
//! type-specific capabilities (`start_crawl`, `process_document`,
//! `store_file`, ...) live as inherent methods on the concrete handler,
//! since the spec scopes polymorphism to lifecycle operations only.

pub mod crawling;
pub mod data;
pub mod factory;
pub mod storage;

use std::path::Path;

use async_trait::async_trait;

use crate::config::{validate_settings, ProjectConfig, ValidationOutcome};
use crate::error::DocBroError;
use crate::types::{Project, ProjectType};

/// Filesystem + database size/count statistics for a project, merged with
/// handler-provided type-specific stats by the manager.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProjectStats {
	pub directory_size_bytes: u64,
	pub file_count: u64,
	pub extra: std::collections::HashMap<String, serde_json::Value>,
}

/// Common capability set every project type handler implements: initialize,
/// cleanup, validate-settings, default-settings, project-stats.
#[async_trait]
pub trait ProjectHandler: Send + Sync {
	fn project_type(&self) -> ProjectType;

	/// Creates the type-specific subdirectory tree and any sidecar state
	/// (vector store collection, inventory database, session log).
	async fn initialize(&self, data_dir: &Path, project: &Project) -> Result<(), DocBroError>;

	/// Tears down type-specific state. If `force`, failures are logged as
	/// warnings and cleanup proceeds; otherwise the first failure is fatal.
	async fn cleanup(&self, data_dir: &Path, project: &Project, force: bool) -> Result<(), DocBroError>;

	fn validate_settings(&self, config: &ProjectConfig) -> ValidationOutcome {
		validate_settings(config, self.project_type())
	}

	fn default_settings(&self) -> ProjectConfig {
		ProjectConfig::type_defaults(self.project_type())
	}

	async fn project_stats(&self, data_dir: &Path, project: &Project) -> Result<ProjectStats, DocBroError>;
}

/// Computes filesystem size/count stats for a project's directory, shared
/// by every handler's `project_stats` implementation.
pub fn directory_stats(dir: &Path) -> ProjectStats {
	let mut stats = ProjectStats::default();
	if !dir.exists() {
		return stats;
	}
	let mut stack = vec![dir.to_path_buf()];
	while let Some(current) = stack.pop() {
		let Ok(entries) = std::fs::read_dir(&current) else { continue };
		for entry in entries.flatten() {
			let path = entry.path();
			if let Ok(meta) = entry.metadata() {
				if meta.is_dir() {
					stack.push(path);
				} else {
					stats.directory_size_bytes += meta.len();
					stats.file_count += 1;
				}
			}
		}
	}
	stats
}
