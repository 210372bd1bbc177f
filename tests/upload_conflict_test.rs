//! Integration tests for destination-name conflict handling during an
//! upload run: skip vs. rename when a file already exists in a project.

use docbro::manager::ProjectManager;
use docbro::repository::{ProjectDatabase, Registry};
use docbro::types::{ConflictResolution, ConnectionParams, ProjectType, SourceType, UploadSource, UploadStatus};
use docbro::upload::conflict::{ConflictOutcome, ConflictResolver};
use docbro::upload::manager::{CancellationToken, UploadManager};
use tempfile::tempdir;

fn local_source(dir: &std::path::Path) -> UploadSource {
	let mut source = UploadSource::new(SourceType::Local, dir.to_string_lossy().into_owned());
	source.params = ConnectionParams { recursive: Some(true), ..ConnectionParams::default() };
	source
}

#[tokio::test]
async fn re_uploading_the_same_filename_is_skipped_by_default() {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let source_dir = tempdir().unwrap();
	std::fs::write(source_dir.path().join("doc.txt"), b"version one").unwrap();

	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	let project = manager.create("files", ProjectType::Storage, None, false).await.unwrap();
	let registry = Registry::open(data_dir.path()).unwrap();
	let uploads = UploadManager::new(data_dir.path(), config_dir.path());

	let first = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, CancellationToken::new())
		.await
		.unwrap();
	assert_eq!(first.progress.files_succeeded, 1);

	let second = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, CancellationToken::new())
		.await
		.unwrap();

	assert_eq!(second.status, UploadStatus::Complete);
	assert_eq!(second.progress.files_skipped, 1);
	assert_eq!(second.progress.files_succeeded, 0);

	let db = ProjectDatabase::open(data_dir.path(), "files").unwrap();
	assert_eq!(db.list_storage_filenames(project.id).unwrap().len(), 1);
}

#[tokio::test]
async fn re_uploading_with_overwrite_replaces_the_existing_file() {
	let data_dir = tempdir().unwrap();
	let config_dir = tempdir().unwrap();
	let source_dir = tempdir().unwrap();
	std::fs::write(source_dir.path().join("doc.txt"), b"version one").unwrap();

	let manager = ProjectManager::new(data_dir.path(), config_dir.path()).unwrap();
	let project = manager.create("files", ProjectType::Storage, None, false).await.unwrap();
	let registry = Registry::open(data_dir.path()).unwrap();
	let uploads = UploadManager::new(data_dir.path(), config_dir.path());

	uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Skip, CancellationToken::new())
		.await
		.unwrap();

	std::fs::write(source_dir.path().join("doc.txt"), b"version two, longer payload").unwrap();
	let second = uploads
		.run(&registry, &project, local_source(source_dir.path()), ConflictResolution::Overwrite, CancellationToken::new())
		.await
		.unwrap();

	assert_eq!(second.progress.files_succeeded, 1);
	assert_eq!(second.progress.files_skipped, 0);

	let db = ProjectDatabase::open(data_dir.path(), "files").unwrap();
	let stored = db.get_storage_file(project.id, "doc.txt").unwrap().unwrap();
	assert_eq!(stored.file_size, b"version two, longer payload".len() as u64);
}

#[test]
fn rename_strategy_never_collides_with_an_existing_name() {
	let existing = ["report.pdf", "report_1.pdf"];
	let resolver = ConflictResolver::new(ConflictResolution::Rename);
	let outcome = resolver.resolve("report.pdf", |p| existing.contains(&p), None);
	assert_eq!(outcome, ConflictOutcome::WriteTo("report_2.pdf".to_string()));
}
