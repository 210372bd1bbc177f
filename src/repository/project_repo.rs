//! CRUD for the `projects` table.

use std::sync::MutexGuard;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::DocBroError;
use crate::types::{Project, ProjectStatus, ProjectType};

pub struct ProjectRepository<'a> {
	conn: MutexGuard<'a, Connection>,
}

impl<'a> ProjectRepository<'a> {
	pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
		ProjectRepository { conn }
	}

	pub fn save(&self, project: &Project) -> Result<(), DocBroError> {
		self.conn.execute(
			"INSERT INTO projects (id, name, type, status, created_at, updated_at, settings_json, metadata_json)
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
			 ON CONFLICT(id) DO UPDATE SET
				name = excluded.name, type = excluded.type, status = excluded.status,
				updated_at = excluded.updated_at, settings_json = excluded.settings_json,
				metadata_json = excluded.metadata_json",
			params![
				project.id.to_string(),
				project.name,
				project.project_type.to_string(),
				project.status.to_string(),
				project.created_at.to_rfc3339(),
				project.updated_at.to_rfc3339(),
				serde_json::to_string(&project.settings)?,
				serde_json::to_string(&project.metadata)?,
			],
		)?;
		Ok(())
	}

	pub fn get(&self, name: &str) -> Result<Option<Project>, DocBroError> {
		self.conn
			.query_row("SELECT * FROM projects WHERE name = ?1", params![name], row_to_project)
			.optional()
			.map_err(DocBroError::from)
	}

	pub fn list(
		&self,
		status: Option<ProjectStatus>,
		project_type: Option<ProjectType>,
		limit: Option<u32>,
	) -> Result<Vec<Project>, DocBroError> {
		let mut sql = "SELECT * FROM projects WHERE 1=1".to_string();
		if status.is_some() {
			sql.push_str(" AND status = :status");
		}
		if project_type.is_some() {
			sql.push_str(" AND type = :type");
		}
		sql.push_str(" ORDER BY updated_at DESC");
		if let Some(n) = limit {
			sql.push_str(&format!(" LIMIT {}", n));
		}

		let mut stmt = self.conn.prepare(&sql)?;
		let status_str = status.map(|s| s.to_string());
		let type_str = project_type.map(|t| t.to_string());

		let rows = stmt.query_map(
			rusqlite::named_params! { ":status": status_str, ":type": type_str },
			row_to_project,
		)?;
		rows.collect::<Result<Vec<_>, _>>().map_err(DocBroError::from)
	}

	/// Removes the project row; `upload_operations` rows cascade via FK.
	pub fn delete(&self, name: &str) -> Result<(), DocBroError> {
		self.conn.execute("DELETE FROM projects WHERE name = ?1", params![name])?;
		Ok(())
	}

	pub fn update_status(&self, name: &str, status: ProjectStatus) -> Result<(), DocBroError> {
		self.conn.execute(
			"UPDATE projects SET status = ?1, updated_at = ?2 WHERE name = ?3",
			params![status.to_string(), chrono::Utc::now().to_rfc3339(), name],
		)?;
		Ok(())
	}
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
	let id: String = row.get("id")?;
	let type_str: String = row.get("type")?;
	let status_str: String = row.get("status")?;
	let settings_json: String = row.get("settings_json")?;
	let metadata_json: String = row.get("metadata_json")?;

	Ok(Project {
		id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
		name: row.get("name")?,
		project_type: parse_project_type(&type_str),
		status: parse_status(&status_str),
		created_at: parse_timestamp(row.get::<_, String>("created_at")?),
		updated_at: parse_timestamp(row.get::<_, String>("updated_at")?),
		settings: serde_json::from_str(&settings_json).unwrap_or_default(),
		metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
	})
}

fn parse_project_type(s: &str) -> ProjectType {
	match s {
		"crawling" => ProjectType::Crawling,
		"data" => ProjectType::Data,
		_ => ProjectType::Storage,
	}
}

fn parse_status(s: &str) -> ProjectStatus {
	match s {
		"active" => ProjectStatus::Active,
		"inactive" => ProjectStatus::Inactive,
		"processing" => ProjectStatus::Processing,
		_ => ProjectStatus::Error,
	}
}

fn parse_timestamp(s: String) -> chrono::DateTime<chrono::Utc> {
	chrono::DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&chrono::Utc)).unwrap_or_else(|_| chrono::Utc::now())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repository::schema::init_registry_schema;

	fn setup() -> std::sync::Mutex<Connection> {
		let conn = Connection::open_in_memory().unwrap();
		conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
		init_registry_schema(&conn).unwrap();
		std::sync::Mutex::new(conn)
	}

	#[test]
	fn save_and_get_round_trip() {
		let conn = setup();
		let repo = ProjectRepository::new(conn.lock().unwrap());
		let project = Project::new("docs".to_string(), ProjectType::Storage);
		repo.save(&project).unwrap();

		let fetched = repo.get("docs").unwrap().unwrap();
		assert_eq!(fetched.name, "docs");
		assert_eq!(fetched.project_type, ProjectType::Storage);
	}

	#[test]
	fn get_missing_returns_none() {
		let conn = setup();
		let repo = ProjectRepository::new(conn.lock().unwrap());
		assert!(repo.get("nope").unwrap().is_none());
	}

	#[test]
	fn list_orders_by_updated_at_desc() {
		let conn = setup();
		let repo = ProjectRepository::new(conn.lock().unwrap());
		let mut a = Project::new("a".to_string(), ProjectType::Data);
		let mut b = Project::new("b".to_string(), ProjectType::Data);
		a.updated_at = chrono::Utc::now() - chrono::Duration::seconds(10);
		b.updated_at = chrono::Utc::now();
		repo.save(&a).unwrap();
		repo.save(&b).unwrap();

		let listed = repo.list(None, None, None).unwrap();
		assert_eq!(listed[0].name, "b");
	}
}
