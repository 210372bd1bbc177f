//! SQLite-backed persistence for the project registry and per-project databases.
//!
//! The registry (`project_registry.db`) is the only writer of project rows,
//! upload-operation audit rows, and a settings mirror for introspection.
//! Each project additionally owns a per-project database file holding its
//! type-specific rows (`storage_files`, `data_documents` + `document_chunks`).

mod data_repo;
mod project_repo;
mod schema;
mod storage_repo;
mod upload_repo;

pub use project_repo::ProjectRepository;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::DocBroError;
use crate::types::{DataDocument, DocumentChunk, FileInventory, StorageFile, UploadOperation};

/// Opens a connection with foreign keys enforced and WAL journaling enabled,
/// the baseline every repository connection in this crate shares.
pub fn open_connection(path: &Path) -> Result<Connection, DocBroError> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let conn = Connection::open(path)?;
	conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
	Ok(conn)
}

/// Per-project database: type-specific tables plus the shared inventory
/// table. One file per project, owned and destroyed with the project.
pub struct ProjectDatabase {
	conn: Connection,
}

impl ProjectDatabase {
	pub fn open(data_dir: &Path, project_name: &str) -> Result<Self, DocBroError> {
		let conn = open_connection(&Self::path(data_dir, project_name))?;
		schema::init_project_schema(&conn)?;
		Ok(ProjectDatabase { conn })
	}

	pub fn path(data_dir: &Path, project_name: &str) -> PathBuf {
		data_dir.join("projects").join(project_name).join(format!("{}.db", project_name))
	}

	pub fn save_storage_file(&self, file: &StorageFile) -> Result<(), DocBroError> {
		storage_repo::save(&self.conn, file)
	}

	pub fn get_storage_file(&self, project_id: uuid::Uuid, filename: &str) -> Result<Option<StorageFile>, DocBroError> {
		storage_repo::get_by_filename(&self.conn, project_id, filename)
	}

	pub fn list_storage_filenames(&self, project_id: uuid::Uuid) -> Result<Vec<String>, DocBroError> {
		storage_repo::list_filenames(&self.conn, project_id)
	}

	pub fn search_storage_files(&self, query: &str) -> Result<Vec<StorageFile>, DocBroError> {
		storage_repo::search(&self.conn, query)
	}

	pub fn all_storage_files(&self) -> Result<Vec<StorageFile>, DocBroError> {
		storage_repo::all_sorted_by_upload_date(&self.conn)
	}

	pub fn bump_access(&self, id: uuid::Uuid) -> Result<(), DocBroError> {
		storage_repo::bump_access(&self.conn, id)
	}

	pub fn save_inventory(&self, inventory: &FileInventory) -> Result<(), DocBroError> {
		storage_repo::save_inventory(&self.conn, inventory)
	}

	pub fn save_data_document(&self, doc: &DataDocument, chunks: &[DocumentChunk]) -> Result<(), DocBroError> {
		data_repo::save(&self.conn, doc, chunks)
	}

	pub fn list_data_documents(&self, project_id: uuid::Uuid) -> Result<Vec<DataDocument>, DocBroError> {
		data_repo::list(&self.conn, project_id)
	}
}

/// The registry database: project rows, upload-operation audit rows, and a
/// settings mirror. Single-writer, serialized by this struct.
pub struct Registry {
	conn: std::sync::Mutex<Connection>,
}

impl Registry {
	pub fn open(data_dir: &Path) -> Result<Self, DocBroError> {
		let conn = open_connection(&data_dir.join("project_registry.db"))?;
		schema::init_registry_schema(&conn)?;
		Ok(Registry { conn: std::sync::Mutex::new(conn) })
	}

	pub fn projects(&self) -> ProjectRepository<'_> {
		ProjectRepository::new(self.conn.lock().unwrap_or_else(|e| e.into_inner()))
	}

	pub fn save_upload_operation(&self, op: &UploadOperation) -> Result<(), DocBroError> {
		upload_repo::save(&self.conn.lock().unwrap_or_else(|e| e.into_inner()), op)
	}

	pub fn update_upload_operation(&self, op: &UploadOperation) -> Result<(), DocBroError> {
		upload_repo::update(&self.conn.lock().unwrap_or_else(|e| e.into_inner()), op)
	}

	pub fn list_upload_operations(&self, project_id: Option<uuid::Uuid>) -> Result<Vec<UploadOperation>, DocBroError> {
		upload_repo::list(&self.conn.lock().unwrap_or_else(|e| e.into_inner()), project_id)
	}
}
