//! Data project handler: document ingestion, chunking, and search.
//!
//! The embedding model and vector store are external collaborators (out of
//! scope); this handler talks to them through [`VectorStore`].

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{directory_stats, ProjectHandler, ProjectStats};
use crate::config::{ProjectConfig, VectorStoreType};
use crate::error::DocBroError;
use crate::types::{DataDocument, DocumentChunk, Project};

const DATA_SUBDIRS: [&str; 5] = ["documents", "processed", "vectors", "temp", "logs"];

#[derive(Debug, Clone)]
pub struct VectorMatch {
	pub chunk_id: String,
	pub document_id: Uuid,
	pub score: f64,
}

/// Interface to the out-of-scope embedding model + vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
	async fn ensure_collection(&self, name: &str, embedding_model: &str) -> Result<(), DocBroError>;
	async fn upsert(&self, collection: &str, chunk: &DocumentChunk) -> Result<String, DocBroError>;
	async fn search(&self, collection: &str, query: &str, limit: usize) -> Result<Vec<VectorMatch>, DocBroError>;
}

/// Stand-in store used when no real vector store is injected: keeps
/// chunk text in memory and matches by substring, just enough to make the
/// handler usable and testable without the real embedding pipeline.
#[derive(Default)]
pub struct NullVectorStore {
	chunks: dashmap::DashMap<String, (Uuid, String)>,
}

#[async_trait]
impl VectorStore for NullVectorStore {
	async fn ensure_collection(&self, _name: &str, _embedding_model: &str) -> Result<(), DocBroError> {
		Ok(())
	}

	async fn upsert(&self, _collection: &str, chunk: &DocumentChunk) -> Result<String, DocBroError> {
		let vector_id = format!("{}:{}", chunk.document_id, chunk.chunk_index);
		self.chunks.insert(vector_id.clone(), (chunk.document_id, chunk.text.clone()));
		Ok(vector_id)
	}

	async fn search(&self, _collection: &str, query: &str, limit: usize) -> Result<Vec<VectorMatch>, DocBroError> {
		let needle = query.to_lowercase();
		let mut matches: Vec<VectorMatch> = self
			.chunks
			.iter()
			.filter(|entry| entry.value().1.to_lowercase().contains(&needle))
			.map(|entry| VectorMatch { chunk_id: entry.key().clone(), document_id: entry.value().0, score: 1.0 })
			.collect();
		matches.truncate(limit);
		Ok(matches)
	}
}

#[derive(Serialize)]
pub struct DocumentSearchResult {
	pub document_id: Uuid,
	pub title: String,
	pub score: f64,
}

pub struct DataHandler {
	store: std::sync::Arc<dyn VectorStore>,
}

impl Default for DataHandler {
	fn default() -> Self {
		DataHandler { store: std::sync::Arc::new(NullVectorStore::default()) }
	}
}

impl DataHandler {
	pub fn with_store(store: std::sync::Arc<dyn VectorStore>) -> Self {
		DataHandler { store }
	}

	fn project_dir(data_dir: &Path, project: &Project) -> std::path::PathBuf {
		data_dir.join("projects").join(&project.name)
	}

	fn collection_name(project: &Project) -> String {
		format!("docbro_{}", project.name)
	}

	/// Extracts text from a document per its extension: plain/markdown pass
	/// through as UTF-8, HTML has tags stripped, JSON is flattened to a
	/// string, anything else gets a placeholder.
	pub fn extract_text(path: &Path) -> Result<String, DocBroError> {
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
		let raw = std::fs::read_to_string(path).unwrap_or_default();
		Ok(match ext.as_str() {
			"txt" | "md" | "markdown" => raw,
			"html" | "htm" => strip_html_tags(&raw),
			"json" => {
				let value: serde_json::Value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);
				flatten_json(&value)
			}
			_ => format!("[unsupported format: {}]", ext),
		})
	}

	/// Splits `text` into chunks of `chunk_size` characters, preferring to
	/// break on the last space past the chunk midpoint. The next chunk's
	/// start always advances by `chunk_size - overlap` from the previous
	/// chunk's *nominal* start, independent of where the actual break fell.
	pub fn create_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize, String)> {
		let chars: Vec<char> = text.chars().collect();
		let len = chars.len();
		if len == 0 || chunk_size == 0 {
			return Vec::new();
		}

		let mut chunks = Vec::new();
		let mut start = 0usize;

		loop {
			let mut end = (start + chunk_size).min(len);
			if end < len {
				let midpoint = start + chunk_size / 2;
				if let Some(space_pos) = (midpoint..end).rev().find(|&i| chars[i] == ' ') {
					end = space_pos;
				}
			}
			let chunk_text: String = chars[start..end].iter().collect();
			chunks.push((start, end, chunk_text));

			if end >= len {
				break;
			}
			start = (start + chunk_size).saturating_sub(overlap).max(start + 1);
		}

		chunks
	}

	/// Penalizes short content, processing errors, and too-few chunks;
	/// rewards a healthy chunk count; capped at 1.0.
	pub fn quality_score(character_count: usize, chunk_count: usize, processing_errors: usize) -> f64 {
		let mut score = 1.0f64;
		if character_count < 100 {
			score *= 0.5;
		} else if character_count < 500 {
			score *= 0.8;
		}
		score *= (1.0 - processing_errors as f64 * 0.1).max(0.1);
		if chunk_count < 2 {
			score *= 0.7;
		} else if (5..=50).contains(&chunk_count) {
			score *= 1.1;
		}
		score.min(1.0)
	}

	pub async fn process_document(
		&self,
		data_dir: &Path,
		project: &Project,
		config: &ProjectConfig,
		file_path: &Path,
		upload_source: Option<String>,
	) -> Result<(DataDocument, Vec<DocumentChunk>), DocBroError> {
		let chunk_size = config.chunk_size.unwrap_or(500) as usize;
		let chunk_overlap = config.chunk_overlap.unwrap_or(50) as usize;
		let embedding_model = config.embedding_model.clone().unwrap_or_else(|| "mxbai-embed-large".to_string());

		let mut processing_errors = Vec::new();
		let content = match Self::extract_text(file_path) {
			Ok(c) => c,
			Err(e) => {
				processing_errors.push(e.to_string());
				String::new()
			}
		};

		let document_id = Uuid::new_v4();
		let chunk_specs = Self::create_chunks(&content, chunk_size, chunk_overlap);
		let chunks: Vec<DocumentChunk> = chunk_specs
			.into_iter()
			.enumerate()
			.map(|(index, (start, end, text))| DocumentChunk {
				document_id,
				chunk_index: index as u32,
				text,
				start_char: start,
				end_char: end,
				vector_id: None,
			})
			.collect();

		let collection = Self::collection_name(project);
		self.store.ensure_collection(&collection, &embedding_model).await?;
		let mut submitted_chunks = Vec::with_capacity(chunks.len());
		for mut chunk in chunks {
			match self.store.upsert(&collection, &chunk).await {
				Ok(vector_id) => chunk.vector_id = Some(vector_id),
				Err(e) => {
					warn!("failed to submit chunk {} of {}: {}", chunk.chunk_index, document_id, e);
					processing_errors.push(e.to_string());
				}
			}
			submitted_chunks.push(chunk);
		}

		let word_count = content.split_whitespace().count() as u32;
		let character_count = content.chars().count() as u32;
		let quality_score = Self::quality_score(character_count as usize, submitted_chunks.len(), processing_errors.len());

		let document = DataDocument {
			id: document_id,
			project_id: project.id,
			title: file_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
			content,
			source_path: file_path.to_string_lossy().into_owned(),
			upload_source,
			processed_date: chrono::Utc::now(),
			chunk_count: submitted_chunks.len() as u32,
			word_count,
			character_count,
			language: None,
			embedding_model,
			chunk_size: chunk_size as u32,
			chunk_overlap: chunk_overlap as u32,
			processing_success: processing_errors.is_empty(),
			processing_errors,
			quality_score: Some(quality_score),
		};

		let _ = data_dir;
		Ok((document, submitted_chunks))
	}

	pub async fn search_documents(
		&self,
		project: &Project,
		query: &str,
		limit: usize,
	) -> Result<Vec<DocumentSearchResult>, DocBroError> {
		let collection = Self::collection_name(project);
		let matches = self.store.search(&collection, query, limit).await?;
		Ok(matches
			.into_iter()
			.map(|m| DocumentSearchResult { document_id: m.document_id, title: m.chunk_id, score: m.score })
			.collect())
	}
}

fn strip_html_tags(html: &str) -> String {
	let mut out = String::with_capacity(html.len());
	let mut in_tag = false;
	for c in html.chars() {
		match c {
			'<' => in_tag = true,
			'>' => in_tag = false,
			_ if !in_tag => out.push(c),
			_ => {}
		}
	}
	out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn flatten_json(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::Object(map) => map.values().map(flatten_json).collect::<Vec<_>>().join(" "),
		serde_json::Value::Array(items) => items.iter().map(flatten_json).collect::<Vec<_>>().join(" "),
		serde_json::Value::String(s) => s.clone(),
		serde_json::Value::Null => String::new(),
		other => other.to_string(),
	}
}

#[async_trait]
impl ProjectHandler for DataHandler {
	fn project_type(&self) -> crate::types::ProjectType {
		crate::types::ProjectType::Data
	}

	async fn initialize(&self, data_dir: &Path, project: &Project) -> Result<(), DocBroError> {
		let dir = Self::project_dir(data_dir, project);
		for sub in DATA_SUBDIRS {
			std::fs::create_dir_all(dir.join(sub))?;
		}
		let embedding_model = "mxbai-embed-large";
		let vector_store_type = VectorStoreType::SqliteVec;
		let _ = vector_store_type;
		self.store.ensure_collection(&Self::collection_name(project), embedding_model).await
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
		Ok(directory_stats(&Self::project_dir(data_dir, project)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chunks_cover_whole_text_with_expected_starts() {
		let text = "a".repeat(250);
		let chunks = DataHandler::create_chunks(&text, 100, 20);
		assert_eq!(chunks.len(), 3);
		assert_eq!(chunks[0].0, 0);
		assert_eq!(chunks[1].0, 80);
		assert_eq!(chunks[2].0, 160);
		assert_eq!(chunks.last().unwrap().1, 250);
	}

	#[test]
	fn chunking_breaks_on_word_boundary_past_midpoint() {
		let text = format!("{} {}", "a".repeat(60), "b".repeat(60));
		let chunks = DataHandler::create_chunks(&text, 100, 10);
		let (_, end, _) = chunks[0];
		assert_eq!(text.chars().nth(end), Some(' '));
	}

	#[test]
	fn quality_score_penalizes_short_content() {
		let short = DataHandler::quality_score(50, 1, 0);
		let long = DataHandler::quality_score(1000, 10, 0);
		assert!(short < long);
	}

	#[test]
	fn quality_score_capped_at_one() {
		assert!(DataHandler::quality_score(5000, 20, 0) <= 1.0);
	}

	#[test]
	fn quality_score_floors_at_point_one_multiplier_for_errors() {
		let score = DataHandler::quality_score(1000, 10, 20);
		assert!(score > 0.0);
	}

	#[test]
	fn html_extraction_strips_tags() {
		let stripped = strip_html_tags("<p>Hello <b>world</b></p>");
		assert_eq!(stripped, "Hello world");
	}

	#[test]
	fn json_extraction_flattens_to_string() {
		let value: serde_json::Value = serde_json::json!({"a": "hello", "b": {"c": "world"}});
		let flat = flatten_json(&value);
		assert!(flat.contains("hello"));
		assert!(flat.contains("world"));
	}
}
