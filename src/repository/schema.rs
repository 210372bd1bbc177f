//! DDL for the registry and per-project databases.

use rusqlite::Connection;

use crate::error::DocBroError;

pub fn init_registry_schema(conn: &Connection) -> Result<(), DocBroError> {
	conn.execute_batch(
		r#"
		CREATE TABLE IF NOT EXISTS projects (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL UNIQUE,
			type TEXT NOT NULL,
			status TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			settings_json TEXT NOT NULL,
			metadata_json TEXT NOT NULL
		);
		CREATE INDEX IF NOT EXISTS idx_projects_type ON projects(type);
		CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);

		CREATE TABLE IF NOT EXISTS upload_operations (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			status TEXT NOT NULL,
			source_type TEXT NOT NULL,
			source_location TEXT NOT NULL,
			files_processed INTEGER NOT NULL,
			files_total INTEGER NOT NULL,
			bytes_processed INTEGER NOT NULL,
			bytes_total INTEGER NOT NULL,
			started_at TEXT NOT NULL,
			completed_at TEXT,
			error_message TEXT,
			metadata_json TEXT NOT NULL
		);
		CREATE INDEX IF NOT EXISTS idx_upload_ops_project ON upload_operations(project_id);
		CREATE INDEX IF NOT EXISTS idx_upload_ops_status ON upload_operations(status);
		"#,
	)?;
	Ok(())
}

pub fn init_project_schema(conn: &Connection) -> Result<(), DocBroError> {
	conn.execute_batch(
		r#"
		CREATE TABLE IF NOT EXISTS storage_files (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL,
			filename TEXT NOT NULL,
			file_path TEXT NOT NULL,
			file_size INTEGER NOT NULL,
			mime_type TEXT NOT NULL,
			checksum TEXT NOT NULL,
			tags_json TEXT NOT NULL,
			metadata_json TEXT NOT NULL,
			upload_source TEXT,
			upload_date TEXT NOT NULL,
			last_accessed TEXT,
			access_count INTEGER NOT NULL,
			is_compressed INTEGER NOT NULL,
			compression_ratio REAL,
			UNIQUE(project_id, filename)
		);

		CREATE TABLE IF NOT EXISTS storage_inventory (
			file_id TEXT PRIMARY KEY REFERENCES storage_files(id) ON DELETE CASCADE,
			tags_text TEXT NOT NULL,
			metadata_text TEXT NOT NULL,
			extracted_text TEXT NOT NULL,
			content_hash TEXT NOT NULL
		);

		CREATE TABLE IF NOT EXISTS data_documents (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL,
			title TEXT NOT NULL,
			content TEXT NOT NULL,
			source_path TEXT NOT NULL,
			upload_source TEXT,
			processed_date TEXT NOT NULL,
			chunk_count INTEGER NOT NULL,
			word_count INTEGER NOT NULL,
			character_count INTEGER NOT NULL,
			language TEXT,
			embedding_model TEXT NOT NULL,
			chunk_size INTEGER NOT NULL,
			chunk_overlap INTEGER NOT NULL,
			processing_success INTEGER NOT NULL,
			processing_errors_json TEXT NOT NULL,
			quality_score REAL
		);

		CREATE TABLE IF NOT EXISTS document_chunks (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			document_id TEXT NOT NULL REFERENCES data_documents(id) ON DELETE CASCADE,
			chunk_index INTEGER NOT NULL,
			text TEXT NOT NULL,
			start_char INTEGER NOT NULL,
			end_char INTEGER NOT NULL,
			vector_id TEXT,
			UNIQUE(document_id, chunk_index)
		);
		"#,
	)?;
	Ok(())
}
