//! Core data types shared across DocBro components

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project type. Dispatch target for the handler factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
	Crawling,
	Data,
	Storage,
}

impl fmt::Display for ProjectType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProjectType::Crawling => write!(f, "crawling"),
			ProjectType::Data => write!(f, "data"),
			ProjectType::Storage => write!(f, "storage"),
		}
	}
}

impl ProjectType {
	pub const ALL: [ProjectType; 3] = [ProjectType::Crawling, ProjectType::Data, ProjectType::Storage];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
	Active,
	Inactive,
	Processing,
	Error,
}

impl fmt::Display for ProjectStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProjectStatus::Active => write!(f, "active"),
			ProjectStatus::Inactive => write!(f, "inactive"),
			ProjectStatus::Processing => write!(f, "processing"),
			ProjectStatus::Error => write!(f, "error"),
		}
	}
}

/// A typed, named workspace owning its storage, settings, and database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
	pub id: Uuid,
	pub name: String,
	pub project_type: ProjectType,
	pub status: ProjectStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub settings: HashMap<String, serde_json::Value>,
	pub metadata: HashMap<String, serde_json::Value>,
}

impl Project {
	pub fn new(name: String, project_type: ProjectType) -> Self {
		let now = Utc::now();
		Project {
			id: Uuid::new_v4(),
			name,
			project_type,
			status: ProjectStatus::Active,
			created_at: now,
			updated_at: now,
			settings: HashMap::new(),
			metadata: HashMap::new(),
		}
	}

	pub fn touch(&mut self) {
		self.updated_at = Utc::now();
	}
}

const RESERVED_NAMES: [&str; 8] = ["CON", "PRN", "AUX", "NUL", "COM1", "LPT1", ".", ".."];
const INVALID_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Validates a project name per the identity rules: 1-100 chars, no
/// platform-invalid characters, not a reserved device name.
pub fn validate_project_name(name: &str) -> Result<(), String> {
	if name.is_empty() {
		return Err("name must not be empty".to_string());
	}
	if name.chars().count() > 100 {
		return Err("name must be at most 100 characters".to_string());
	}
	if let Some(c) = name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
		return Err(format!("name contains invalid character '{}'", c));
	}
	if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
		return Err(format!("'{}' is a reserved name", name));
	}
	Ok(())
}

/// Upload source scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
	Local,
	Ftp,
	Sftp,
	Smb,
	Http,
	Https,
}

impl fmt::Display for SourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SourceType::Local => write!(f, "local"),
			SourceType::Ftp => write!(f, "ftp"),
			SourceType::Sftp => write!(f, "sftp"),
			SourceType::Smb => write!(f, "smb"),
			SourceType::Http => write!(f, "http"),
			SourceType::Https => write!(f, "https"),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCredentials {
	pub username: Option<String>,
	pub password: Option<String>,
	pub key: Option<String>,
	pub domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
	Ask,
	Skip,
	Overwrite,
	Rename,
	Backup,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionParams {
	pub recursive: Option<bool>,
	pub exclude_patterns: Vec<String>,
	pub follow_symlinks: Option<bool>,
	pub verify_ssl: Option<bool>,
	pub overwrite_policy: Option<ConflictResolution>,
}

/// A configured source for an upload operation, with reliability accumulators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSource {
	pub source_type: SourceType,
	pub location: String,
	pub credentials: Option<SourceCredentials>,
	pub params: ConnectionParams,
	pub success_count: u64,
	pub failure_count: u64,
	pub last_accessed: Option<DateTime<Utc>>,
}

impl UploadSource {
	pub fn new(source_type: SourceType, location: String) -> Self {
		UploadSource {
			source_type,
			location,
			credentials: None,
			params: ConnectionParams::default(),
			success_count: 0,
			failure_count: 0,
			last_accessed: None,
		}
	}

	/// `success / (success + failure)`, defaulting to 1.0 with no attempts.
	pub fn reliability(&self) -> f64 {
		let total = self.success_count + self.failure_count;
		if total == 0 {
			1.0
		} else {
			self.success_count as f64 / total as f64
		}
	}

	pub fn record_success(&mut self) {
		self.success_count += 1;
		self.last_accessed = Some(Utc::now());
	}

	pub fn record_failure(&mut self) {
		self.failure_count += 1;
		self.last_accessed = Some(Utc::now());
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
	Initiated,
	Validating,
	Rejected,
	Downloading,
	Processing,
	Retrying,
	Complete,
	Failed,
	Cancelled,
}

impl UploadStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			UploadStatus::Rejected | UploadStatus::Complete | UploadStatus::Failed | UploadStatus::Cancelled
		)
	}

	/// Whether `cancel()` is accepted from this status.
	pub fn cancellable(&self) -> bool {
		matches!(
			self,
			UploadStatus::Initiated | UploadStatus::Downloading | UploadStatus::Processing | UploadStatus::Retrying
		)
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadProgressCounters {
	pub files_total: u64,
	pub files_processed: u64,
	pub files_succeeded: u64,
	pub files_failed: u64,
	pub files_skipped: u64,
	pub bytes_total: u64,
	pub bytes_processed: u64,
}

/// An in-flight ingestion from one source into one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOperation {
	pub id: Uuid,
	pub project_id: Uuid,
	pub source: UploadSource,
	pub status: UploadStatus,
	pub progress: UploadProgressCounters,
	pub current_file: Option<String>,
	pub current_stage: Option<String>,
	pub conflict_resolution: ConflictResolution,
	pub started_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	pub estimated_completion: Option<DateTime<Utc>>,
	pub errors: Vec<String>,
}

impl UploadOperation {
	pub fn new(project_id: Uuid, source: UploadSource, conflict_resolution: ConflictResolution) -> Self {
		UploadOperation {
			id: Uuid::new_v4(),
			project_id,
			source,
			status: UploadStatus::Initiated,
			progress: UploadProgressCounters::default(),
			current_file: None,
			current_stage: None,
			conflict_resolution,
			started_at: Utc::now(),
			completed_at: None,
			estimated_completion: None,
			errors: Vec::new(),
		}
	}

	/// Transitions into a terminal status exactly once, stamping `completed_at`.
	pub fn finish(&mut self, status: UploadStatus) {
		debug_assert!(status.is_terminal());
		if self.completed_at.is_none() {
			self.completed_at = Some(Utc::now());
		}
		self.status = status;
	}
}

/// A file stored under a storage-type project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile {
	pub id: Uuid,
	pub project_id: Uuid,
	pub filename: String,
	pub file_path: String,
	pub file_size: u64,
	pub mime_type: String,
	pub checksum: String,
	pub tags: Vec<String>,
	pub metadata: HashMap<String, serde_json::Value>,
	pub upload_source: Option<String>,
	pub upload_date: DateTime<Utc>,
	pub last_accessed: Option<DateTime<Utc>>,
	pub access_count: u64,
	pub is_compressed: bool,
	pub compression_ratio: Option<f64>,
}

impl StorageFile {
	/// The extension (lowercase, no leading dot), derived from `filename`.
	pub fn file_extension(&self) -> String {
		std::path::Path::new(&self.filename)
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_lowercase()
	}
}

/// Normalizes a tag: lowercase, trimmed, rejecting separator characters.
pub fn normalize_tag(tag: &str) -> Option<String> {
	let t = tag.trim().to_lowercase();
	if t.is_empty() || t.len() > 50 || t.chars().any(|c| matches!(c, ',' | ';' | ':' | '|')) {
		return None;
	}
	Some(t)
}

/// Deduplicates and normalizes a tag list, preserving first-seen order.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	let mut out = Vec::new();
	for tag in tags {
		if let Some(t) = normalize_tag(&tag) {
			if seen.insert(t.clone()) {
				out.push(t);
			}
		}
	}
	out
}

/// A processed document within a data-type project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDocument {
	pub id: Uuid,
	pub project_id: Uuid,
	pub title: String,
	pub content: String,
	pub source_path: String,
	pub upload_source: Option<String>,
	pub processed_date: DateTime<Utc>,
	pub chunk_count: u32,
	pub word_count: u32,
	pub character_count: u32,
	pub language: Option<String>,
	pub embedding_model: String,
	pub chunk_size: u32,
	pub chunk_overlap: u32,
	pub processing_success: bool,
	pub processing_errors: Vec<String>,
	pub quality_score: Option<f64>,
}

/// One chunk of a `DataDocument`, ready for vector-store submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
	pub document_id: Uuid,
	pub chunk_index: u32,
	pub text: String,
	pub start_char: usize,
	pub end_char: usize,
	pub vector_id: Option<String>,
}

/// Denormalized full-text record for a storage file, for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInventory {
	pub file_id: Uuid,
	pub tags_text: String,
	pub metadata_text: String,
	pub extracted_text: String,
	pub content_hash: String,
}
