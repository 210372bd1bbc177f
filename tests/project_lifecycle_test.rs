//! Integration tests for project creation, listing, and removal through
//! `ProjectManager`, exercising the handler factory and registry together.

use docbro::error::DocBroError;
use docbro::manager::ProjectManager;
use docbro::types::{ProjectStatus, ProjectType};
use tempfile::tempdir;

fn manager() -> (ProjectManager, tempfile::TempDir, tempfile::TempDir) {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	(manager, data_dir, config_dir)
}

#[tokio::test]
async fn create_storage_project_persists_and_initializes_directory() {
	let (manager, data_dir, _config) = manager();

	let project = manager.create("docs", ProjectType::Storage, None, false).await.unwrap();
	assert_eq!(project.status, ProjectStatus::Active);
	assert!(data_dir.path().join("projects").join("docs").exists());

	let fetched = manager.get("docs").unwrap();
	assert_eq!(fetched.id, project.id);
}

#[tokio::test]
async fn create_each_type_succeeds() {
	let (manager, _data_dir, _config) = manager();

	for (name, project_type) in [("crawl", ProjectType::Crawling), ("kb", ProjectType::Data), ("files", ProjectType::Storage)] {
		let project = manager.create(name, project_type, None, false).await.unwrap();
		assert_eq!(project.project_type, project_type);
	}

	let all = manager.list(None, None, None).unwrap();
	assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn list_filters_by_type() {
	let (manager, _data_dir, _config) = manager();

	manager.create("crawl", ProjectType::Crawling, None, false).await.unwrap();
	manager.create("kb", ProjectType::Data, None, false).await.unwrap();

	let data_only = manager.list(None, Some(ProjectType::Data), None).unwrap();
	assert_eq!(data_only.len(), 1);
	assert_eq!(data_only[0].name, "kb");
}

#[tokio::test]
async fn duplicate_create_without_force_is_rejected() {
	let (manager, _data_dir, _config) = manager();

	manager.create("docs", ProjectType::Storage, None, false).await.unwrap();
	let err = manager.create("docs", ProjectType::Storage, None, false).await.unwrap_err();
	assert!(matches!(err, DocBroError::AlreadyExists { .. }));
}

#[tokio::test]
async fn invalid_name_is_rejected_before_any_directory_is_created() {
	let (manager, data_dir, _config) = manager();

	let err = manager.create("con", ProjectType::Storage, None, false).await.unwrap_err();
	assert!(matches!(err, DocBroError::InvalidName { .. }));
	assert!(!data_dir.path().join("projects").join("con").exists());
}

#[tokio::test]
async fn remove_deletes_directory_and_registry_row() {
	let (manager, data_dir, _config) = manager();

	manager.create("docs", ProjectType::Storage, None, false).await.unwrap();
	manager.remove("docs", false, false).await.unwrap();

	assert!(!data_dir.path().join("projects").join("docs").exists());
	assert!(manager.get("docs").is_err());
}

#[tokio::test]
async fn remove_unknown_project_fails_with_not_found() {
	let (manager, _data_dir, _config) = manager();
	let err = manager.remove("ghost", false, false).await.unwrap_err();
	assert!(matches!(err, DocBroError::NotFound { .. }));
}
