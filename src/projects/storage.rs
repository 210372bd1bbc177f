//! Storage project handler: file ingestion, retrieval, tagging, and search.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use super::{directory_stats, ProjectHandler, ProjectStats};
use crate::config::ProjectConfig;
use crate::error::DocBroError;
use crate::repository::ProjectDatabase;
use crate::types::{normalize_tags, FileInventory, Project, StorageFile};

const STORAGE_SUBDIRS: [&str; 6] = ["files", "archive", "thumbnails", "temp", "exports", "logs"];

/// `extension -> mime type` for the handful of formats this system cares about.
fn mime_for_extension(ext: &str) -> &'static str {
	match ext {
		"txt" | "md" | "markdown" => "text/plain",
		"html" | "htm" => "text/html",
		"json" => "application/json",
		"pdf" => "application/pdf",
		"doc" | "docx" => "application/msword",
		"png" => "image/png",
		"jpg" | "jpeg" => "image/jpeg",
		"gif" => "image/gif",
		"mp4" => "video/mp4",
		"mp3" => "audio/mpeg",
		"wav" => "audio/wav",
		"zip" => "application/zip",
		"bin" => "application/octet-stream",
		_ => "application/octet-stream",
	}
}

fn size_bucket(size: u64) -> &'static str {
	if size < 1024 {
		"tiny"
	} else if size < 1024 * 1024 {
		"small"
	} else if size < 10 * 1024 * 1024 {
		"medium"
	} else {
		"large"
	}
}

/// `type:<ext>`, top-level MIME category, and a size bucket tag.
pub fn auto_tags(filename: &str, mime_type: &str, size: u64) -> Vec<String> {
	let mut tags = Vec::new();
	let ext = Path::new(filename).extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
	if !ext.is_empty() {
		tags.push(format!("type:{}", ext));
	}
	if let Some(category) = mime_type.split('/').next() {
		if !category.is_empty() && category != "application" {
			tags.push(category.to_string());
		}
	}
	tags.push(format!("size:{}", size_bucket(size)));
	tags
}

pub fn sha256_hex(bytes: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(bytes);
	hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct StorageSearchFilters {
	pub file_type: Option<String>,
	pub min_size: Option<u64>,
	pub max_size: Option<u64>,
	pub date_from: Option<chrono::DateTime<chrono::Utc>>,
	pub date_to: Option<chrono::DateTime<chrono::Utc>>,
	pub tags: Vec<String>,
}

impl StorageSearchFilters {
	fn matches(&self, file: &StorageFile) -> bool {
		if let Some(ft) = &self.file_type {
			if &file.file_extension() != ft {
				return false;
			}
		}
		if let Some(min) = self.min_size {
			if file.file_size < min {
				return false;
			}
		}
		if let Some(max) = self.max_size {
			if file.file_size > max {
				return false;
			}
		}
		if let Some(from) = self.date_from {
			if file.upload_date < from {
				return false;
			}
		}
		if let Some(to) = self.date_to {
			if file.upload_date > to {
				return false;
			}
		}
		if !self.tags.is_empty() && !self.tags.iter().any(|t| file.tags.contains(t)) {
			return false;
		}
		true
	}
}

#[derive(Default)]
pub struct StorageHandler;

impl StorageHandler {
	fn project_dir(data_dir: &Path, project: &Project) -> std::path::PathBuf {
		data_dir.join("projects").join(&project.name)
	}

	pub async fn store_file(
		&self,
		data_dir: &Path,
		project: &Project,
		config: &ProjectConfig,
		file_path: &Path,
		metadata: HashMap<String, serde_json::Value>,
		upload_source: Option<String>,
	) -> Result<StorageFile, DocBroError> {
		let file_size = std::fs::metadata(file_path)?.len();
		if file_size > config.max_file_size {
			return Err(DocBroError::InvalidInput {
				message: format!("file size {} exceeds max_file_size {}", file_size, config.max_file_size),
			});
		}

		let filename = file_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		let ext = Path::new(&filename).extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
		if !config.allowed_formats.iter().any(|f| f == "*") && !config.allowed_formats.iter().any(|f| f == &ext) {
			return Err(DocBroError::InvalidInput { message: format!("format '{}' is not allowed", ext) });
		}

		let dir = Self::project_dir(data_dir, project);
		std::fs::create_dir_all(dir.join("files"))?;

		let id = Uuid::new_v4();
		let stored_name = if ext.is_empty() { id.to_string() } else { format!("{}.{}", id, ext) };
		let dest = dir.join("files").join(&stored_name);
		let bytes = std::fs::read(file_path)?;
		std::fs::write(&dest, &bytes)?;

		let checksum = sha256_hex(&bytes);
		let mime_type = mime_for_extension(&ext).to_string();

		let mut tags = Vec::new();
		if config.auto_tagging.unwrap_or(true) {
			tags = normalize_tags(auto_tags(&filename, &mime_type, file_size));
		}

		let (is_compressed, compression_ratio) = if mime_type.starts_with("text/") && file_size > 1024 {
			(true, Some(0.6))
		} else {
			(false, None)
		};

		let file = StorageFile {
			id,
			project_id: project.id,
			filename,
			file_path: dest.to_string_lossy().into_owned(),
			file_size,
			mime_type,
			checksum,
			tags,
			metadata,
			upload_source,
			upload_date: chrono::Utc::now(),
			last_accessed: None,
			access_count: 0,
			is_compressed,
			compression_ratio,
		};

		let db = ProjectDatabase::open(data_dir, &project.name)?;
		db.save_storage_file(&file)?;

		if config.full_text_indexing.unwrap_or(true) {
			self.index_file(&db, &file)?;
		}

		Ok(file)
	}

	fn index_file(&self, db: &ProjectDatabase, file: &StorageFile) -> Result<(), DocBroError> {
		let metadata_text = file.metadata.values().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
		let extracted_text = if file.mime_type.starts_with("text/") {
			std::fs::read_to_string(&file.file_path).unwrap_or_default()
		} else {
			String::new()
		};
		let content_hash = sha256_hex(extracted_text.as_bytes());
		db.save_inventory(&FileInventory {
			file_id: file.id,
			tags_text: file.tags.join(" "),
			metadata_text,
			extracted_text,
			content_hash,
		})
	}

	/// Verifies checksum integrity before returning the file's bytes.
	pub fn retrieve_file(&self, data_dir: &Path, project: &Project, filename: &str) -> Result<Vec<u8>, DocBroError> {
		let db = ProjectDatabase::open(data_dir, &project.name)?;
		let record = db
			.get_storage_file(project.id, filename)?
			.ok_or_else(|| DocBroError::NotFound { what: format!("file '{}'", filename) })?;

		let bytes = std::fs::read(&record.file_path)?;
		let actual = sha256_hex(&bytes);
		if actual != record.checksum {
			return Err(DocBroError::IntegrityMismatch { expected: record.checksum, actual });
		}

		db.bump_access(record.id)?;
		Ok(bytes)
	}

	pub fn search_files(
		&self,
		data_dir: &Path,
		project: &Project,
		query: &str,
		filters: &StorageSearchFilters,
	) -> Result<Vec<StorageFile>, DocBroError> {
		let db = ProjectDatabase::open(data_dir, &project.name)?;
		let matches = db.search_storage_files(query)?;
		Ok(matches.into_iter().filter(|f| filters.matches(f)).collect())
	}

	pub fn tag_file(&self, data_dir: &Path, project: &Project, filename: &str, new_tags: Vec<String>) -> Result<StorageFile, DocBroError> {
		let db = ProjectDatabase::open(data_dir, &project.name)?;
		let mut record = db
			.get_storage_file(project.id, filename)?
			.ok_or_else(|| DocBroError::NotFound { what: format!("file '{}'", filename) })?;

		let mut combined = record.tags.clone();
		combined.extend(new_tags);
		record.tags = normalize_tags(combined);

		db.save_storage_file(&record)?;
		self.index_file(&db, &record)?;
		Ok(record)
	}

	pub fn get_file_inventory(&self, data_dir: &Path, project: &Project) -> Result<Vec<StorageFile>, DocBroError> {
		let db = ProjectDatabase::open(data_dir, &project.name)?;
		db.all_storage_files()
	}
}

#[async_trait]
impl ProjectHandler for StorageHandler {
	fn project_type(&self) -> crate::types::ProjectType {
		crate::types::ProjectType::Storage
	}

	async fn initialize(&self, data_dir: &Path, project: &Project) -> Result<(), DocBroError> {
		let dir = Self::project_dir(data_dir, project);
		for sub in STORAGE_SUBDIRS {
			std::fs::create_dir_all(dir.join(sub))?;
		}
		ProjectDatabase::open(data_dir, &project.name)?;
		Ok(())
	}

	async fn cleanup(&self, data_dir: &Path, project: &Project, force: bool) -> Result<(), DocBroError> {
		let dir = Self::project_dir(data_dir, project);
		let temp = dir.join("temp");
		if temp.exists() {
			if let Err(e) = std::fs::remove_dir_all(&temp) {
				if !force {
					return Err(e.into());
				}
				warn!("failed to remove temp dir for '{}': {}", project.name, e);
			}
		}
		Ok(())
	}

	async fn project_stats(&self, data_dir: &Path, project: &Project) -> Result<ProjectStats, DocBroError> {
		let mut stats = directory_stats(&Self::project_dir(data_dir, project));
		if let Ok(db) = ProjectDatabase::open(data_dir, &project.name) {
			if let Ok(files) = db.all_storage_files() {
				stats.extra.insert("storage_file_count".to_string(), serde_json::json!(files.len()));
			}
		}
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn size_buckets_match_documented_thresholds() {
		assert_eq!(size_bucket(100), "tiny");
		assert_eq!(size_bucket(500_000), "small");
		assert_eq!(size_bucket(5_000_000), "medium");
		assert_eq!(size_bucket(50_000_000), "large");
	}

	#[test]
	fn auto_tags_include_type_category_and_size() {
		let tags = auto_tags("a.txt", "text/plain", 5);
		assert!(tags.contains(&"type:txt".to_string()));
		assert!(tags.contains(&"text".to_string()));
		assert!(tags.contains(&"size:tiny".to_string()));
	}

	#[test]
	fn sha256_matches_known_vector() {
		assert_eq!(sha256_hex(b"hello"), "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
	}

	#[test]
	fn filters_reject_out_of_range_size() {
		let file = StorageFile {
			id: Uuid::new_v4(),
			project_id: Uuid::new_v4(),
			filename: "a.txt".into(),
			file_path: "/tmp/a.txt".into(),
			file_size: 10,
			mime_type: "text/plain".into(),
			checksum: "x".into(),
			tags: vec![],
			metadata: HashMap::new(),
			upload_source: None,
			upload_date: chrono::Utc::now(),
			last_accessed: None,
			access_count: 0,
			is_compressed: false,
			compression_ratio: None,
		};
		let filters = StorageSearchFilters { min_size: Some(100), ..Default::default() };
		assert!(!filters.matches(&file));
	}
}
