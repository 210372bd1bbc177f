//! Crawling project handler.
//!
//! The HTML crawler engine itself is an external collaborator (out of
//! scope); this handler talks to it through [`CrawlerDriver`]. Session
//! termination is fire-and-forget per the design notes' resolution of the
//! open question: `start_crawl` returns immediately with a session id and
//! callers poll [`CrawlingHandler::get_crawl_status`].

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{directory_stats, ProjectHandler, ProjectStats};
use crate::config::ProjectConfig;
use crate::error::DocBroError;
use crate::types::Project;

const CRAWL_SUBDIRS: [&str; 4] = ["crawl_data", "pages", "assets", "logs"];

#[derive(Debug, Clone)]
pub struct CrawlSessionConfig {
	pub url: String,
	pub depth: u32,
	pub rate_limit: f64,
	pub user_agent: String,
	pub follow_redirects: bool,
	pub respect_robots_txt: bool,
	pub output_directory: std::path::PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlSessionState {
	Running,
	Completed,
	Stopped,
}

/// Interface to the out-of-scope HTML crawler engine.
pub trait CrawlerDriver: Send + Sync {
	/// Starts a crawl session and returns immediately with an opaque id.
	fn start(&self, config: CrawlSessionConfig) -> Result<String, DocBroError>;
	fn stop(&self, session_id: &str);
	fn state(&self, session_id: &str) -> Option<CrawlSessionState>;
}

/// Stand-in driver used when no real crawler engine is injected: records
/// sessions as running until explicitly stopped. Exists so the handler is
/// usable and testable without the external crawler dependency.
#[derive(Default)]
pub struct NullCrawlerDriver {
	sessions: DashMap<String, CrawlSessionState>,
}

impl CrawlerDriver for NullCrawlerDriver {
	fn start(&self, config: CrawlSessionConfig) -> Result<String, DocBroError> {
		let session_id = Uuid::new_v4().to_string();
		info!("starting crawl session {} for {} (depth={})", session_id, config.url, config.depth);
		self.sessions.insert(session_id.clone(), CrawlSessionState::Running);
		Ok(session_id)
	}

	fn stop(&self, session_id: &str) {
		self.sessions.insert(session_id.to_string(), CrawlSessionState::Stopped);
	}

	fn state(&self, session_id: &str) -> Option<CrawlSessionState> {
		self.sessions.get(session_id).map(|s| *s)
	}
}

#[derive(Serialize)]
pub struct CrawlStatus {
	pub active_sessions: Vec<String>,
	pub pages_count: u64,
	pub assets_count: u64,
	pub crawl_data_size_bytes: u64,
}

pub struct CrawlingHandler {
	driver: std::sync::Arc<dyn CrawlerDriver>,
	/// project id -> session ids started under it
	sessions: Mutex<HashMap<Uuid, Vec<String>>>,
}

impl Default for CrawlingHandler {
	fn default() -> Self {
		CrawlingHandler { driver: std::sync::Arc::new(NullCrawlerDriver::default()), sessions: Mutex::new(HashMap::new()) }
	}
}

impl CrawlingHandler {
	pub fn with_driver(driver: std::sync::Arc<dyn CrawlerDriver>) -> Self {
		CrawlingHandler { driver, sessions: Mutex::new(HashMap::new()) }
	}

	fn project_dir(data_dir: &Path, project: &Project) -> std::path::PathBuf {
		data_dir.join("projects").join(&project.name)
	}

	pub fn start_crawl(
		&self,
		data_dir: &Path,
		project: &Project,
		url: &str,
		depth: u32,
		config: &ProjectConfig,
	) -> Result<String, DocBroError> {
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(DocBroError::InvalidInput { message: format!("'{}' is not an http(s) URL", url) });
		}
		if !(1..=10).contains(&depth) {
			return Err(DocBroError::InvalidInput { message: format!("crawl depth {} must be between 1 and 10", depth) });
		}

		let output_directory = Self::project_dir(data_dir, project).join("crawl_data");
		let session_config = CrawlSessionConfig {
			url: url.to_string(),
			depth,
			rate_limit: config.rate_limit.unwrap_or(1.0),
			user_agent: config.user_agent.clone().unwrap_or_else(|| "docbro/1.0".to_string()),
			follow_redirects: config.follow_redirects.unwrap_or(true),
			respect_robots_txt: config.respect_robots_txt.unwrap_or(true),
			output_directory,
		};

		let session_id = self.driver.start(session_config)?;
		self.sessions.lock().unwrap().entry(project.id).or_default().push(session_id.clone());
		Ok(session_id)
	}

	pub fn get_crawl_status(&self, data_dir: &Path, project: &Project) -> CrawlStatus {
		let dir = Self::project_dir(data_dir, project);
		let pages = directory_stats(&dir.join("pages"));
		let assets = directory_stats(&dir.join("assets"));
		let crawl_data = directory_stats(&dir.join("crawl_data"));

		let active = self
			.sessions
			.lock()
			.unwrap()
			.get(&project.id)
			.cloned()
			.unwrap_or_default()
			.into_iter()
			.filter(|id| matches!(self.driver.state(id), Some(CrawlSessionState::Running)))
			.collect();

		CrawlStatus {
			active_sessions: active,
			pages_count: pages.file_count,
			assets_count: assets.file_count,
			crawl_data_size_bytes: crawl_data.directory_size_bytes,
		}
	}

	/// Archives `crawl_data` into a single gzip-compressed container of
	/// `(relative_path, contents)` entries, then removes the source tree.
	fn archive_crawl_data(&self, dir: &Path) -> Result<(), DocBroError> {
		let crawl_data = dir.join("crawl_data");
		if !crawl_data.exists() {
			return Ok(());
		}
		let archive_path = dir.join(format!("crawl_data_{}.tar.gz", chrono::Utc::now().format("%Y%m%d_%H%M%S")));
		let file = std::fs::File::create(&archive_path)?;
		let mut encoder = GzEncoder::new(file, Compression::default());

		let mut stack = vec![crawl_data.clone()];
		while let Some(current) = stack.pop() {
			for entry in std::fs::read_dir(&current)?.flatten() {
				let path = entry.path();
				if path.is_dir() {
					stack.push(path);
				} else {
					let rel = path.strip_prefix(&crawl_data).unwrap_or(&path).to_string_lossy().into_owned();
					let contents = std::fs::read(&path)?;
					writeln!(encoder, "{}\t{}", rel, contents.len())?;
					encoder.write_all(&contents)?;
					encoder.write_all(b"\n")?;
				}
			}
		}
		encoder.finish()?;
		std::fs::remove_dir_all(&crawl_data)?;
		Ok(())
	}
}

#[async_trait]
impl ProjectHandler for CrawlingHandler {
	fn project_type(&self) -> crate::types::ProjectType {
		crate::types::ProjectType::Crawling
	}

	async fn initialize(&self, data_dir: &Path, project: &Project) -> Result<(), DocBroError> {
		let dir = Self::project_dir(data_dir, project);
		for sub in CRAWL_SUBDIRS {
			std::fs::create_dir_all(dir.join(sub))?;
		}
		std::fs::write(dir.join("logs").join("session.log"), format!("session log for {}\n", project.name))?;
		Ok(())
	}

	async fn cleanup(&self, data_dir: &Path, project: &Project, force: bool) -> Result<(), DocBroError> {
		let dir = Self::project_dir(data_dir, project);

		if let Some(session_ids) = self.sessions.lock().unwrap().remove(&project.id) {
			for id in session_ids {
				self.driver.stop(&id);
			}
		}

		if let Err(e) = self.archive_crawl_data(&dir) {
			if force {
				warn!("failed to archive crawl_data for '{}': {}", project.name, e);
			} else {
				return Err(e);
			}
		}

		let temp = dir.join("temp");
		if temp.exists() {
			std::fs::remove_dir_all(&temp)?;
		}
		Ok(())
	}

	async fn project_stats(&self, data_dir: &Path, project: &Project) -> Result<ProjectStats, DocBroError> {
		let dir = Self::project_dir(data_dir, project);
		let mut stats = directory_stats(&dir);
		let status = self.get_crawl_status(data_dir, project);
		stats.extra.insert("active_sessions".to_string(), serde_json::to_value(&status.active_sessions).unwrap());
		stats.extra.insert("pages_count".to_string(), serde_json::json!(status.pages_count));
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ProjectType;
	use tempfile::tempdir;

	#[tokio::test]
	async fn initialize_creates_expected_subdirs() {
		let data_dir = tempdir().unwrap();
		let project = Project::new("site".to_string(), ProjectType::Crawling);
		let handler = CrawlingHandler::default();
		handler.initialize(data_dir.path(), &project).await.unwrap();

		for sub in CRAWL_SUBDIRS {
			assert!(CrawlingHandler::project_dir(data_dir.path(), &project).join(sub).is_dir());
		}
	}

	#[test]
	fn start_crawl_rejects_non_http_url() {
		let data_dir = tempdir().unwrap();
		let project = Project::new("site".to_string(), ProjectType::Crawling);
		let handler = CrawlingHandler::default();
		let err = handler.start_crawl(data_dir.path(), &project, "ftp://x", 3, &ProjectConfig::default()).unwrap_err();
		assert!(matches!(err, DocBroError::InvalidInput { .. }));
	}

	#[test]
	fn start_crawl_rejects_bad_depth() {
		let data_dir = tempdir().unwrap();
		let project = Project::new("site".to_string(), ProjectType::Crawling);
		let handler = CrawlingHandler::default();
		let err = handler.start_crawl(data_dir.path(), &project, "https://x", 11, &ProjectConfig::default()).unwrap_err();
		assert!(matches!(err, DocBroError::InvalidInput { .. }));
	}

	#[test]
	fn start_crawl_tracks_session_as_active() {
		let data_dir = tempdir().unwrap();
		let project = Project::new("site".to_string(), ProjectType::Crawling);
		let handler = CrawlingHandler::default();
		let session_id = handler.start_crawl(data_dir.path(), &project, "https://x", 3, &ProjectConfig::default()).unwrap();

		let status = handler.get_crawl_status(data_dir.path(), &project);
		assert!(status.active_sessions.contains(&session_id));
	}
}
