//! CRUD for `upload_operations` audit rows.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::DocBroError;
use crate::types::{
	ConflictResolution, SourceCredentials, SourceType, UploadOperation, UploadProgressCounters, UploadSource, UploadStatus,
};

pub fn save(conn: &Connection, op: &UploadOperation) -> Result<(), DocBroError> {
	insert_or_replace(conn, op)
}

pub fn update(conn: &Connection, op: &UploadOperation) -> Result<(), DocBroError> {
	insert_or_replace(conn, op)
}

fn insert_or_replace(conn: &Connection, op: &UploadOperation) -> Result<(), DocBroError> {
	conn.execute(
		"INSERT INTO upload_operations
			(id, project_id, status, source_type, source_location, files_processed, files_total,
			 bytes_processed, bytes_total, started_at, completed_at, error_message, metadata_json)
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
		 ON CONFLICT(id) DO UPDATE SET
			status = excluded.status, files_processed = excluded.files_processed,
			files_total = excluded.files_total, bytes_processed = excluded.bytes_processed,
			bytes_total = excluded.bytes_total, completed_at = excluded.completed_at,
			error_message = excluded.error_message, metadata_json = excluded.metadata_json",
		params![
			op.id.to_string(),
			op.project_id.to_string(),
			status_str(op.status),
			source_type_str(op.source.source_type),
			op.source.location,
			op.progress.files_processed,
			op.progress.files_total,
			op.progress.bytes_processed,
			op.progress.bytes_total,
			op.started_at.to_rfc3339(),
			op.completed_at.map(|t| t.to_rfc3339()),
			op.errors.last().cloned(),
			serde_json::to_string(&op.errors)?,
		],
	)?;
	Ok(())
}

pub fn list(conn: &Connection, project_id: Option<Uuid>) -> Result<Vec<UploadOperation>, DocBroError> {
	let mut sql = "SELECT * FROM upload_operations WHERE 1=1".to_string();
	if project_id.is_some() {
		sql.push_str(" AND project_id = :project_id");
	}
	sql.push_str(" ORDER BY started_at DESC");

	let mut stmt = conn.prepare(&sql)?;
	let pid_str = project_id.map(|p| p.to_string());
	let rows = stmt.query_map(rusqlite::named_params! { ":project_id": pid_str }, row_to_operation)?;
	rows.collect::<Result<Vec<_>, _>>().map_err(DocBroError::from)
}

fn status_str(status: UploadStatus) -> &'static str {
	match status {
		UploadStatus::Initiated => "initiated",
		UploadStatus::Validating => "validating",
		UploadStatus::Rejected => "rejected",
		UploadStatus::Downloading => "downloading",
		UploadStatus::Processing => "processing",
		UploadStatus::Retrying => "retrying",
		UploadStatus::Complete => "complete",
		UploadStatus::Failed => "failed",
		UploadStatus::Cancelled => "cancelled",
	}
}

fn parse_status(s: &str) -> UploadStatus {
	match s {
		"initiated" => UploadStatus::Initiated,
		"validating" => UploadStatus::Validating,
		"rejected" => UploadStatus::Rejected,
		"downloading" => UploadStatus::Downloading,
		"processing" => UploadStatus::Processing,
		"retrying" => UploadStatus::Retrying,
		"complete" => UploadStatus::Complete,
		"failed" => UploadStatus::Failed,
		_ => UploadStatus::Cancelled,
	}
}

fn source_type_str(t: SourceType) -> &'static str {
	match t {
		SourceType::Local => "local",
		SourceType::Ftp => "ftp",
		SourceType::Sftp => "sftp",
		SourceType::Smb => "smb",
		SourceType::Http => "http",
		SourceType::Https => "https",
	}
}

fn row_to_operation(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadOperation> {
	let id: String = row.get("id")?;
	let project_id: String = row.get("project_id")?;
	let source_type: String = row.get("source_type")?;
	let errors_json: String = row.get("metadata_json")?;

	Ok(UploadOperation {
		id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
		project_id: Uuid::parse_str(&project_id).unwrap_or_else(|_| Uuid::nil()),
		source: UploadSource {
			source_type: match source_type.as_str() {
				"ftp" => SourceType::Ftp,
				"sftp" => SourceType::Sftp,
				"smb" => SourceType::Smb,
				"http" => SourceType::Http,
				"https" => SourceType::Https,
				_ => SourceType::Local,
			},
			location: row.get("source_location")?,
			credentials: None::<SourceCredentials>,
			params: Default::default(),
			success_count: 0,
			failure_count: 0,
			last_accessed: None,
		},
		status: parse_status(&row.get::<_, String>("status")?),
		progress: UploadProgressCounters {
			files_total: row.get("files_total")?,
			files_processed: row.get("files_processed")?,
			files_succeeded: 0,
			files_failed: 0,
			files_skipped: 0,
			bytes_total: row.get("bytes_total")?,
			bytes_processed: row.get("bytes_processed")?,
		},
		current_file: None,
		current_stage: None,
		conflict_resolution: ConflictResolution::Ask,
		started_at: chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>("started_at")?)
			.map(|d| d.with_timezone(&chrono::Utc))
			.unwrap_or_else(|_| chrono::Utc::now()),
		completed_at: row
			.get::<_, Option<String>>("completed_at")?
			.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
			.map(|d| d.with_timezone(&chrono::Utc)),
		estimated_completion: None,
		errors: serde_json::from_str(&errors_json).unwrap_or_default(),
	})
}
