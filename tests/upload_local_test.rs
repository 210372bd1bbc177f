//! Integration tests for local-source uploads through `UploadManager`,
//! covering the crawling-project rejection and a full local ingest run.

use docbro::manager::ProjectManager;
use docbro::repository::Registry;
use docbro::types::{ConflictResolution, ConnectionParams, ProjectType, SourceType, UploadSource, UploadStatus};
use docbro::upload::manager::{CancellationToken, UploadManager};
use tempfile::tempdir;

fn local_source(dir: &std::path::Path) -> UploadSource {
	let mut source = UploadSource::new(SourceType::Local, dir.to_string_lossy().into_owned());
	source.params = ConnectionParams { recursive: Some(true), ..ConnectionParams::default() };
	source
}

#[tokio::test]
async fn uploads_local_files_into_storage_project() {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let source_dir = tempdir().unwrap();
	std::fs::write(source_dir.path().join("notes.txt"), b"hello docbro").unwrap();
	std::fs::write(source_dir.path().join("readme.md"), b"# docs").unwrap();

	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	let project = manager.create("files", ProjectType::Storage, None, false).await.unwrap();

	let registry = Registry::open(data_dir.path()).unwrap();
	let uploads = UploadManager::new(data_dir.path(), config_dir.path());

	let operation = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, CancellationToken::new())
		.await
		.unwrap();

	assert_eq!(operation.status, UploadStatus::Complete);
	assert_eq!(operation.progress.files_total, 2);
	assert_eq!(operation.progress.files_succeeded, 2);
	assert_eq!(operation.progress.files_failed, 0);
}

#[tokio::test]
async fn rejects_upload_to_crawling_project() {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let source_dir = tempdir().unwrap();
	std::fs::write(source_dir.path().join("page.html"), b"<html></html>").unwrap();

	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	let project = manager.create("crawl", ProjectType::Crawling, None, false).await.unwrap();

	let registry = Registry::open(data_dir.path()).unwrap();
	let uploads = UploadManager::new(data_dir.path(), config_dir.path());

	let err = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, CancellationToken::new())
		.await
		.unwrap_err();

	assert!(err.to_string().contains("does not accept uploads"));
}

#[tokio::test]
async fn cancellation_stops_processing_early() {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let source_dir = tempdir().unwrap();
	for i in 0..5 {
		std::fs::write(source_dir.path().join(format!("file{}.txt", i)), b"payload").unwrap();
	}

	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	let project = manager.create("files", ProjectType::Storage, None, false).await.unwrap();

	let registry = Registry::open(data_dir.path()).unwrap();
	let uploads = UploadManager::new(data_dir.path(), config_dir.path());

	let cancel = CancellationToken::new();
	cancel.cancel();

	let operation = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, cancel)
		.await
		.unwrap();

	assert_eq!(operation.status, UploadStatus::Cancelled);
}
