//! Project Manager (C4): thin lifecycle coordinator over the repository,
//! config resolver, and type-handler factory.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{ConfigResolver, ProjectConfig};
use crate::error::DocBroError;
use crate::projects::factory::ProjectHandlerFactory;
use crate::projects::ProjectStats;
use crate::repository::Registry;
use crate::types::{validate_project_name, Project, ProjectStatus, ProjectType};

pub struct ProjectManager {
	data_dir: PathBuf,
	registry: Registry,
	config: ConfigResolver,
	factory: ProjectHandlerFactory,
}

impl ProjectManager {
	pub fn new(data_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Result<Self, DocBroError> {
		let data_dir = data_dir.into();
		std::fs::create_dir_all(&data_dir)?;
		let registry = Registry::open(&data_dir)?;
		let config = ConfigResolver::new(config_dir.into());
		let factory = ProjectHandlerFactory::new()?;
		Ok(ProjectManager { data_dir, registry, config, factory })
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}

	pub fn config(&self) -> &ConfigResolver {
		&self.config
	}

	fn project_dir(&self, name: &str) -> PathBuf {
		self.data_dir.join("projects").join(name)
	}

	/// Validates the name, refuses duplicates unless `force`, creates the
	/// directory, runs the handler's `initialize`, and persists the row.
	/// Any failure after directory creation triggers best-effort rollback.
	pub async fn create(
		&self,
		name: &str,
		project_type: ProjectType,
		settings: Option<ProjectConfig>,
		force: bool,
	) -> Result<Project, DocBroError> {
		validate_project_name(name).map_err(|reason| DocBroError::InvalidName { name: name.to_string(), reason })?;

		if self.registry.projects().get(name)?.is_some() && !force {
			return Err(DocBroError::AlreadyExists { name: name.to_string() });
		}

		let dir = self.project_dir(name);
		std::fs::create_dir_all(&dir)?;

		let mut project = Project::new(name.to_string(), project_type);
		if let Some(settings) = settings {
			let outcome = crate::config::validate_settings(&settings, project_type);
			if !outcome.is_valid() {
				let _ = std::fs::remove_dir_all(&dir);
				return Err(DocBroError::InvalidSettings { reasons: outcome.errors });
			}
			project.settings = serde_json::to_value(&settings)?.as_object().cloned().unwrap_or_default().into_iter().collect();
		}

		let handler = self.factory.get(project_type);
		if let Err(e) = handler.initialize(&self.data_dir, &project).await {
			let _ = std::fs::remove_dir_all(&dir);
			return Err(e);
		}

		let save_result = self.registry.projects().save(&project);
		if let Err(e) = save_result {
			let _ = handler.cleanup(&self.data_dir, &project, true).await;
			let _ = std::fs::remove_dir_all(&dir);
			return Err(e);
		}

		info!("created project '{}' (type={})", name, project_type);
		Ok(project)
	}

	pub fn get(&self, name: &str) -> Result<Project, DocBroError> {
		self.registry.projects().get(name)?.ok_or_else(|| DocBroError::NotFound { what: format!("project '{}'", name) })
	}

	pub fn list(&self, status: Option<ProjectStatus>, project_type: Option<ProjectType>, limit: Option<u32>) -> Result<Vec<Project>, DocBroError> {
		self.registry.projects().list(status, project_type, limit)
	}

	/// Validates settings for the current type before persisting.
	pub fn update(&self, mut project: Project) -> Result<Project, DocBroError> {
		let settings: ProjectConfig = serde_json::from_value(serde_json::Value::Object(project.settings.clone().into_iter().collect()))
			.unwrap_or_default();
		let outcome = crate::config::validate_settings(&settings, project.project_type);
		if !outcome.is_valid() {
			return Err(DocBroError::InvalidSettings { reasons: outcome.errors });
		}
		project.touch();
		self.registry.projects().save(&project)?;
		Ok(project)
	}

	/// Optionally snapshots the project before invoking handler cleanup,
	/// then removes the directory and row. With `force`, cleanup failures
	/// are logged rather than aborting removal.
	pub async fn remove(&self, name: &str, backup: bool, force: bool) -> Result<(), DocBroError> {
		let project = self.get(name)?;
		let dir = self.project_dir(name);

		if backup {
			self.backup_project(&project, &dir)?;
		}

		let handler = self.factory.get(project.project_type);
		match handler.cleanup(&self.data_dir, &project, force).await {
			Ok(()) => {}
			Err(e) if force => warn!("cleanup failed for '{}', continuing due to force: {}", name, e),
			Err(e) => return Err(e),
		}

		if dir.exists() {
			std::fs::remove_dir_all(&dir)?;
		}
		self.registry.projects().delete(name)?;

		info!("removed project '{}'", name);
		Ok(())
	}

	fn backup_project(&self, project: &Project, dir: &Path) -> Result<(), DocBroError> {
		let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
		let backup_dir = self.data_dir.join("backups").join(format!("{}_{}", project.name, stamp));
		std::fs::create_dir_all(&backup_dir)?;
		std::fs::write(backup_dir.join("project.json"), serde_json::to_string_pretty(project)?)?;
		if dir.exists() {
			copy_dir_recursive(dir, &backup_dir.join("data"))?;
		}
		Ok(())
	}

	pub async fn get_project_stats(&self, name: &str) -> Result<ProjectStats, DocBroError> {
		let project = self.get(name)?;
		let handler = self.factory.get(project.project_type);
		handler.project_stats(&self.data_dir, &project).await
	}
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), DocBroError> {
	std::fs::create_dir_all(dst)?;
	for entry in std::fs::read_dir(src)?.flatten() {
		let path = entry.path();
		let target = dst.join(entry.file_name());
		if path.is_dir() {
			copy_dir_recursive(&path, &target)?;
		} else {
			std::fs::copy(&path, &target)?;
		}
	}
	Ok(())
}
