//! CRUD for `data_documents` and `document_chunks`.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::DocBroError;
use crate::types::{DataDocument, DocumentChunk};

pub fn save(conn: &Connection, doc: &DataDocument, chunks: &[DocumentChunk]) -> Result<(), DocBroError> {
	conn.execute(
		"INSERT INTO data_documents
			(id, project_id, title, content, source_path, upload_source, processed_date, chunk_count,
			 word_count, character_count, language, embedding_model, chunk_size, chunk_overlap,
			 processing_success, processing_errors_json, quality_score)
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
		params![
			doc.id.to_string(),
			doc.project_id.to_string(),
			doc.title,
			doc.content,
			doc.source_path,
			doc.upload_source,
			doc.processed_date.to_rfc3339(),
			doc.chunk_count,
			doc.word_count,
			doc.character_count,
			doc.language,
			doc.embedding_model,
			doc.chunk_size,
			doc.chunk_overlap,
			doc.processing_success as i64,
			serde_json::to_string(&doc.processing_errors)?,
			doc.quality_score,
		],
	)?;

	for chunk in chunks {
		conn.execute(
			"INSERT INTO document_chunks (document_id, chunk_index, text, start_char, end_char, vector_id)
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
			params![
				chunk.document_id.to_string(),
				chunk.chunk_index,
				chunk.text,
				chunk.start_char,
				chunk.end_char,
				chunk.vector_id,
			],
		)?;
	}
	Ok(())
}

pub fn list(conn: &Connection, project_id: Uuid) -> Result<Vec<DataDocument>, DocBroError> {
	let mut stmt = conn.prepare("SELECT * FROM data_documents WHERE project_id = ?1 ORDER BY processed_date DESC")?;
	let rows = stmt.query_map(params![project_id.to_string()], row_to_document)?;
	rows.collect::<Result<Vec<_>, _>>().map_err(DocBroError::from)
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataDocument> {
	let id: String = row.get("id")?;
	let project_id: String = row.get("project_id")?;
	let errors_json: String = row.get("processing_errors_json")?;

	Ok(DataDocument {
		id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
		project_id: Uuid::parse_str(&project_id).unwrap_or_else(|_| Uuid::nil()),
		title: row.get("title")?,
		content: row.get("content")?,
		source_path: row.get("source_path")?,
		upload_source: row.get("upload_source")?,
		processed_date: chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>("processed_date")?)
			.map(|d| d.with_timezone(&chrono::Utc))
			.unwrap_or_else(|_| chrono::Utc::now()),
		chunk_count: row.get("chunk_count")?,
		word_count: row.get("word_count")?,
		character_count: row.get("character_count")?,
		language: row.get("language")?,
		embedding_model: row.get("embedding_model")?,
		chunk_size: row.get("chunk_size")?,
		chunk_overlap: row.get("chunk_overlap")?,
		processing_success: row.get::<_, i64>("processing_success")? != 0,
		processing_errors: serde_json::from_str(&errors_json).unwrap_or_default(),
		quality_score: row.get("quality_score")?,
	})
}
