//! CRUD for `storage_files` and `storage_inventory`.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::DocBroError;
use crate::types::{FileInventory, StorageFile};

pub fn save(conn: &Connection, file: &StorageFile) -> Result<(), DocBroError> {
	conn.execute(
		"INSERT INTO storage_files
			(id, project_id, filename, file_path, file_size, mime_type, checksum, tags_json,
			 metadata_json, upload_source, upload_date, last_accessed, access_count, is_compressed, compression_ratio)
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
		 ON CONFLICT(project_id, filename) DO UPDATE SET
			file_path = excluded.file_path, file_size = excluded.file_size, checksum = excluded.checksum,
			tags_json = excluded.tags_json, metadata_json = excluded.metadata_json,
			last_accessed = excluded.last_accessed, access_count = excluded.access_count,
			is_compressed = excluded.is_compressed, compression_ratio = excluded.compression_ratio",
		params![
			file.id.to_string(),
			file.project_id.to_string(),
			file.filename,
			file.file_path,
			file.file_size,
			file.mime_type,
			file.checksum,
			serde_json::to_string(&file.tags)?,
			serde_json::to_string(&file.metadata)?,
			file.upload_source,
			file.upload_date.to_rfc3339(),
			file.last_accessed.map(|t| t.to_rfc3339()),
			file.access_count,
			file.is_compressed as i64,
			file.compression_ratio,
		],
	)?;
	Ok(())
}

pub fn get_by_filename(conn: &Connection, project_id: Uuid, filename: &str) -> Result<Option<StorageFile>, DocBroError> {
	conn.query_row(
		"SELECT * FROM storage_files WHERE project_id = ?1 AND filename = ?2",
		params![project_id.to_string(), filename],
		row_to_file,
	)
	.optional()
	.map_err(DocBroError::from)
}

pub fn list_filenames(conn: &Connection, project_id: Uuid) -> Result<Vec<String>, DocBroError> {
	let mut stmt = conn.prepare("SELECT filename FROM storage_files WHERE project_id = ?1")?;
	let rows = stmt.query_map(params![project_id.to_string()], |r| r.get::<_, String>(0))?;
	rows.collect::<Result<Vec<_>, _>>().map_err(DocBroError::from)
}

/// Case-insensitive substring match over `filename ∪ tags ∪ metadata values`.
pub fn search(conn: &Connection, query: &str) -> Result<Vec<StorageFile>, DocBroError> {
	let needle = query.to_lowercase();
	let mut stmt = conn.prepare("SELECT * FROM storage_files")?;
	let rows = stmt.query_map([], row_to_file)?;
	let mut matches = Vec::new();
	for row in rows {
		let file = row?;
		let haystack = format!(
			"{} {} {}",
			file.filename.to_lowercase(),
			file.tags.join(" ").to_lowercase(),
			file.metadata.values().map(|v| v.to_string()).collect::<Vec<_>>().join(" ").to_lowercase()
		);
		if haystack.contains(&needle) {
			matches.push(file);
		}
	}
	Ok(matches)
}

pub fn all_sorted_by_upload_date(conn: &Connection) -> Result<Vec<StorageFile>, DocBroError> {
	let mut stmt = conn.prepare("SELECT * FROM storage_files ORDER BY upload_date DESC")?;
	let rows = stmt.query_map([], row_to_file)?;
	rows.collect::<Result<Vec<_>, _>>().map_err(DocBroError::from)
}

pub fn bump_access(conn: &Connection, id: Uuid) -> Result<(), DocBroError> {
	conn.execute(
		"UPDATE storage_files SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
		params![chrono::Utc::now().to_rfc3339(), id.to_string()],
	)?;
	Ok(())
}

pub fn save_inventory(conn: &Connection, inventory: &FileInventory) -> Result<(), DocBroError> {
	conn.execute(
		"INSERT INTO storage_inventory (file_id, tags_text, metadata_text, extracted_text, content_hash)
		 VALUES (?1, ?2, ?3, ?4, ?5)
		 ON CONFLICT(file_id) DO UPDATE SET
			tags_text = excluded.tags_text, metadata_text = excluded.metadata_text,
			extracted_text = excluded.extracted_text, content_hash = excluded.content_hash",
		params![
			inventory.file_id.to_string(),
			inventory.tags_text,
			inventory.metadata_text,
			inventory.extracted_text,
			inventory.content_hash,
		],
	)?;
	Ok(())
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<StorageFile> {
	let id: String = row.get("id")?;
	let project_id: String = row.get("project_id")?;
	let tags_json: String = row.get("tags_json")?;
	let metadata_json: String = row.get("metadata_json")?;

	Ok(StorageFile {
		id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
		project_id: Uuid::parse_str(&project_id).unwrap_or_else(|_| Uuid::nil()),
		filename: row.get("filename")?,
		file_path: row.get("file_path")?,
		file_size: row.get("file_size")?,
		mime_type: row.get("mime_type")?,
		checksum: row.get("checksum")?,
		tags: serde_json::from_str(&tags_json).unwrap_or_default(),
		metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
		upload_source: row.get("upload_source")?,
		upload_date: chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>("upload_date")?)
			.map(|d| d.with_timezone(&chrono::Utc))
			.unwrap_or_else(|_| chrono::Utc::now()),
		last_accessed: row
			.get::<_, Option<String>>("last_accessed")?
			.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
			.map(|d| d.with_timezone(&chrono::Utc)),
		access_count: row.get("access_count")?,
		is_compressed: row.get::<_, i64>("is_compressed")? != 0,
		compression_ratio: row.get("compression_ratio")?,
	})
}
