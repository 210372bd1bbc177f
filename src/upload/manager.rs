//! Upload orchestration pipeline (C6): pre-flight, enumerate, process,
//! finalize, driving one [`UploadOperation`] through its status machine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::adapter_for;
use super::conflict::{ConflictOutcome, ConflictResolver};
use super::exclusion::PatternMatcher;
use crate::config::ConfigResolver;
use crate::error::DocBroError;
use crate::progress::ProgressReporter;
use crate::projects::data::DataHandler;
use crate::projects::storage::StorageHandler;
use crate::repository::Registry;
use crate::strategies::RetryClass;
use crate::types::{Project, ProjectType, UploadOperation, UploadSource, UploadStatus};

const MAX_RETRIES_PER_FILE: u32 = 3;

/// Cooperative cancellation flag for one in-flight upload, checked between
/// files. Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		CancellationToken(Arc::new(AtomicBool::new(false)))
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Drives [`UploadOperation`]s end to end: validates the source and
/// project-type acceptance, enumerates entries, fetches and persists each
/// one through the project's own storage/ingestion path, and records the
/// operation's outcome in the registry.
pub struct UploadManager {
	data_dir: PathBuf,
	config: ConfigResolver,
	progress: ProgressReporter,
}

impl UploadManager {
	pub fn new(data_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
		UploadManager { data_dir: data_dir.into(), config: ConfigResolver::new(config_dir.into()), progress: ProgressReporter::new() }
	}

	/// Exposes this manager's live progress tracking, e.g. for an RPC
	/// transport to poll an in-flight operation's counters.
	pub fn progress(&self) -> &ProgressReporter {
		&self.progress
	}

	/// Runs one upload to completion. `registry` persists the operation's
	/// audit row before and after the run; `cancel` lets a caller request
	/// early termination from another task.
	pub async fn run(&self, registry: &Registry, project: &Project, source: UploadSource, conflict_resolution: crate::types::ConflictResolution, cancel: CancellationToken) -> Result<UploadOperation, DocBroError> {
		let mut operation = UploadOperation::new(project.id, source, conflict_resolution);
		registry.save_upload_operation(&operation)?;
		self.progress.start(operation.id, format!("upload into '{}' via {}", project.name, operation.source.source_type));

		if let Err(e) = self.preflight(project, &mut operation) {
			operation.errors.push(e.to_string());
			operation.finish(UploadStatus::Rejected);
			registry.update_upload_operation(&operation)?;
			self.progress.record_error(operation.id, e.to_string());
			self.progress.complete(operation.id);
			return Err(e);
		}

		operation.status = UploadStatus::Validating;
		registry.update_upload_operation(&operation)?;

		let outcome = self.run_pipeline(project, &mut operation, cancel).await;
		match outcome {
			Ok(()) => {
				let status = if operation.progress.files_failed > 0 && operation.progress.files_succeeded == 0 {
					UploadStatus::Failed
				} else {
					UploadStatus::Complete
				};
				operation.finish(status);
			}
			Err(DocBroError::Other { message }) if message == "cancelled" => {
				operation.finish(UploadStatus::Cancelled);
			}
			Err(e) => {
				operation.errors.push(e.to_string());
				self.progress.record_error(operation.id, e.to_string());
				operation.finish(UploadStatus::Failed);
			}
		}
		registry.update_upload_operation(&operation)?;
		self.progress.update(operation.id, operation.progress.clone(), 0);
		self.progress.complete(operation.id);
		Ok(operation)
	}

	/// Rejects uploads that a project's type cannot accept, per the
	/// crawling-project upload scenario: crawling projects ingest via the
	/// crawler driver only, never via file upload.
	fn preflight(&self, project: &Project, operation: &mut UploadOperation) -> Result<(), DocBroError> {
		if project.project_type == ProjectType::Crawling {
			return Err(DocBroError::InvalidInput {
				message: format!("project '{}' is a crawling project and does not accept uploads", project.name),
			});
		}
		let _ = operation;
		Ok(())
	}

	async fn run_pipeline(&self, project: &Project, operation: &mut UploadOperation, cancel: CancellationToken) -> Result<(), DocBroError> {
		let summary = self.config.get_project(&self.data_dir, &project.name, project.project_type)?;
		let effective = summary.effective;

		let mut adapter = adapter_for(operation.source.source_type)?;
		adapter.validate(&operation.source.location, operation.source.credentials.as_ref()).await?;

		let exclusion = PatternMatcher::new(&operation.source.params.exclude_patterns)
			.map_err(|e| DocBroError::InvalidInput { message: e.to_string() })?;
		let strategy = operation.source.params.overwrite_policy.unwrap_or(operation.conflict_resolution);
		let resolver = ConflictResolver::new(strategy);

		operation.status = UploadStatus::Downloading;
		operation.current_stage = Some("enumerating".to_string());
		self.progress.set_stage(operation.id, "enumerating");

		let entries = adapter.list(&operation.source.location, &operation.source.params).await?;
		let files: Vec<_> = entries
			.into_iter()
			.filter(|e| !e.is_dir)
			.filter(|e| !exclusion.is_excluded(std::path::Path::new(&e.relative_path)))
			.collect();

		operation.progress.files_total = files.len() as u64;
		operation.progress.bytes_total = files.iter().map(|f| f.size).sum();

		let project_dir = self.data_dir.join("projects").join(&project.name);
		let db = crate::repository::ProjectDatabase::open(&self.data_dir, &project.name)?;
		let existing: std::collections::HashSet<String> = match project.project_type {
			ProjectType::Storage => db.list_storage_filenames(project.id)?.into_iter().collect(),
			_ => std::collections::HashSet::new(),
		};

		operation.status = UploadStatus::Processing;
		operation.current_stage = Some("processing".to_string());
		self.progress.set_stage(operation.id, "processing");
		self.progress.update(operation.id, operation.progress.clone(), 0);

		for entry in &files {
			if cancel.is_cancelled() {
				return Err(DocBroError::Other { message: "cancelled".to_string() });
			}

			operation.current_file = Some(entry.relative_path.clone());

			let dest_name = entry.relative_path.clone();
			let outcome = resolver.resolve(&dest_name, |p| existing.contains(p), None);
			let write_as = match outcome {
				ConflictOutcome::Skip => {
					operation.progress.files_skipped += 1;
					operation.progress.files_processed += 1;
					continue;
				}
				ConflictOutcome::Proceed => dest_name.clone(),
				ConflictOutcome::WriteTo(renamed) => renamed,
				ConflictOutcome::BackupAndProceed => {
					self.archive_existing(&project_dir, &db, project.id, &dest_name)?;
					dest_name.clone()
				}
			};

			let bytes_before_file = operation.progress.bytes_processed;
			let base_counters = operation.progress.clone();
			let mut last_done = 0u64;
			let mut on_chunk = |done: u64, _total: u64| {
				let delta = done.saturating_sub(last_done);
				last_done = done;
				let mut counters = base_counters.clone();
				counters.bytes_processed = bytes_before_file + done;
				self.progress.update(operation.id, counters, delta);
			};

			match self.fetch_with_retry(adapter.as_mut(), &entry.relative_path, &mut on_chunk).await {
				Ok(bytes) => {
					let staged = project_dir.join("temp").join(&write_as);
					if let Some(parent) = staged.parent() {
						std::fs::create_dir_all(parent)?;
					}
					std::fs::write(&staged, &bytes)?;

					let source_tag = Some(format!("{}:{}", operation.source.source_type, operation.source.location));
					let ingest = self.ingest(project, &effective, &staged, source_tag).await;
					let _ = std::fs::remove_file(&staged);

					match ingest {
						Ok(()) => {
							operation.progress.files_succeeded += 1;
							operation.source.record_success();
						}
						Err(e) => {
							operation.progress.files_failed += 1;
							operation.errors.push(format!("{}: {}", entry.relative_path, e));
							self.progress.record_error(operation.id, format!("{}: {}", entry.relative_path, e));
							operation.source.record_failure();
						}
					}
					operation.progress.bytes_processed += bytes.len() as u64;
				}
				Err(e) => {
					operation.progress.files_failed += 1;
					operation.errors.push(format!("{}: {}", entry.relative_path, e));
					self.progress.record_error(operation.id, format!("{}: {}", entry.relative_path, e));
					operation.source.record_failure();
				}
			}
			operation.progress.files_processed += 1;
			self.progress.update(operation.id, operation.progress.clone(), 0);
		}

		adapter.close().await?;
		operation.current_file = None;
		operation.current_stage = Some("finalizing".to_string());
		self.progress.set_stage(operation.id, "finalizing");
		self.progress.update(operation.id, operation.progress.clone(), 0);
		Ok(())
	}

	/// Retries transient adapter failures up to [`MAX_RETRIES_PER_FILE`]
	/// times; permanent failures fail the file immediately. `on_chunk` is
	/// forwarded to the adapter unchanged on every attempt.
	async fn fetch_with_retry(
		&self,
		adapter: &mut dyn super::adapter::SourceAdapter,
		relative_path: &str,
		on_chunk: super::adapter::ChunkProgress<'_>,
	) -> Result<Vec<u8>, DocBroError> {
		let mut attempt = 0;
		loop {
			match adapter.fetch(relative_path, on_chunk).await {
				Ok(bytes) => return Ok(bytes),
				Err(e) => {
					let class = classify_retry(&e);
					attempt += 1;
					if !class.is_retryable() || attempt > MAX_RETRIES_PER_FILE {
						return Err(DocBroError::from(e));
					}
					warn!("retrying {} after transient error (attempt {}): {}", relative_path, attempt, e);
				}
			}
		}
	}

	/// Hands a staged local file to the project type's own ingestion path:
	/// `StorageHandler::store_file` for storage projects, `DataHandler::
	/// process_document` for data projects. Crawling is rejected upstream.
	async fn ingest(&self, project: &Project, config: &crate::config::ProjectConfig, staged: &std::path::Path, source_tag: Option<String>) -> Result<(), DocBroError> {
		match project.project_type {
			ProjectType::Storage => {
				let handler = StorageHandler::default();
				handler.store_file(&self.data_dir, project, config, staged, Default::default(), source_tag).await?;
				Ok(())
			}
			ProjectType::Data => {
				let handler = DataHandler::default();
				let (document, chunks) = handler.process_document(&self.data_dir, project, config, staged, source_tag).await?;
				let db = crate::repository::ProjectDatabase::open(&self.data_dir, &project.name)?;
				db.save_data_document(&document, &chunks)?;
				Ok(())
			}
			ProjectType::Crawling => unreachable!("rejected during preflight"),
		}
	}

	/// Copies the file currently stored under `filename` into the project's
	/// `archive/` subdirectory before it gets overwritten, per the `Backup`
	/// conflict strategy. A project with no existing row for `filename`, or
	/// whose row points at a file no longer on disk, has nothing to archive.
	fn archive_existing(&self, project_dir: &std::path::Path, db: &crate::repository::ProjectDatabase, project_id: Uuid, filename: &str) -> Result<(), DocBroError> {
		let Some(existing) = db.get_storage_file(project_id, filename)? else {
			return Ok(());
		};
		let src = std::path::Path::new(&existing.file_path);
		if !src.exists() {
			return Ok(());
		}

		let archive_dir = project_dir.join("archive");
		std::fs::create_dir_all(&archive_dir)?;
		let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.f");
		std::fs::copy(src, archive_dir.join(format!("{}_{}", stamp, filename)))?;
		Ok(())
	}
}

fn classify_retry(e: &crate::error::AdapterError) -> RetryClass {
	use crate::error::AdapterError::*;
	match e {
		Transient { .. } | ConnectionFailed { .. } => RetryClass::Transient,
		Permanent { .. } | AuthFailed { .. } | NotFound { .. } | ResumeUnsupported { .. } | AlreadyComplete => RetryClass::Permanent,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{ConflictResolution, SourceType};
	use tempfile::tempdir;

	fn make_storage_project(name: &str) -> Project {
		Project::new(name.to_string(), ProjectType::Storage)
	}

	#[tokio::test]
	async fn rejects_upload_to_crawling_project() {
		let data_dir = tempdir().unwrap();
		let config_dir = tempdir().unwrap();
		let manager = UploadManager::new(data_dir.path(), config_dir.path());
		let registry = Registry::open(data_dir.path()).unwrap();

		let project = Project::new("site".to_string(), ProjectType::Crawling);
		registry.projects().save(&project).unwrap();

		let source = UploadSource::new(SourceType::Local, "/tmp".to_string());
		let result = manager.run(&registry, &project, source, ConflictResolution::Skip, CancellationToken::new()).await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn uploads_local_files_into_storage_project() {
		let data_dir = tempdir().unwrap();
		let config_dir = tempdir().unwrap();
		let source_dir = tempdir().unwrap();
		std::fs::write(source_dir.path().join("a.txt"), b"hello world").unwrap();

		let manager = UploadManager::new(data_dir.path(), config_dir.path());
		let registry = Registry::open(data_dir.path()).unwrap();

		let project = make_storage_project("docs");
		registry.projects().save(&project).unwrap();
		let factory = crate::projects::factory::ProjectHandlerFactory::new().unwrap();
		factory.get(ProjectType::Storage).initialize(data_dir.path(), &project).await.unwrap();

		let source = UploadSource::new(SourceType::Local, source_dir.path().to_string_lossy().into_owned());
		let operation = manager.run(&registry, &project, source, ConflictResolution::Skip, CancellationToken::new()).await.unwrap();

		assert_eq!(operation.status, UploadStatus::Complete);
		assert_eq!(operation.progress.files_succeeded, 1);
	}

	#[tokio::test]
	async fn cancellation_stops_processing_early() {
		let data_dir = tempdir().unwrap();
		let config_dir = tempdir().unwrap();
		let source_dir = tempdir().unwrap();
		for i in 0..5 {
			std::fs::write(source_dir.path().join(format!("f{}.txt", i)), b"data").unwrap();
		}

		let manager = UploadManager::new(data_dir.path(), config_dir.path());
		let registry = Registry::open(data_dir.path()).unwrap();

		let project = make_storage_project("docs2");
		registry.projects().save(&project).unwrap();
		let factory = crate::projects::factory::ProjectHandlerFactory::new().unwrap();
		factory.get(ProjectType::Storage).initialize(data_dir.path(), &project).await.unwrap();

		let cancel = CancellationToken::new();
		cancel.cancel();

		let source = UploadSource::new(SourceType::Local, source_dir.path().to_string_lossy().into_owned());
		let operation = manager.run(&registry, &project, source, ConflictResolution::Skip, cancel).await.unwrap();
		assert_eq!(operation.status, UploadStatus::Cancelled);
	}

	#[tokio::test]
	async fn progress_reporter_tracks_the_run_to_completion() {
		let data_dir = tempdir().unwrap();
		let config_dir = tempdir().unwrap();
		let source_dir = tempdir().unwrap();
		std::fs::write(source_dir.path().join("a.txt"), b"hello world").unwrap();

		let manager = UploadManager::new(data_dir.path(), config_dir.path());
		let registry = Registry::open(data_dir.path()).unwrap();

		let project = make_storage_project("docs4");
		registry.projects().save(&project).unwrap();
		let factory = crate::projects::factory::ProjectHandlerFactory::new().unwrap();
		factory.get(ProjectType::Storage).initialize(data_dir.path(), &project).await.unwrap();

		let source = UploadSource::new(SourceType::Local, source_dir.path().to_string_lossy().into_owned());
		let operation = manager.run(&registry, &project, source, ConflictResolution::Skip, CancellationToken::new()).await.unwrap();

		let snapshot = manager.progress().snapshot(operation.id).unwrap();
		assert!(!snapshot.active);
		assert_eq!(snapshot.counters.files_succeeded, 1);
		assert_eq!(snapshot.counters.bytes_processed, "hello world".len() as u64);
	}

	#[tokio::test]
	async fn backup_strategy_archives_the_existing_file_before_overwriting() {
		let data_dir = tempdir().unwrap();
		let config_dir = tempdir().unwrap();
		let source_dir = tempdir().unwrap();
		std::fs::write(source_dir.path().join("doc.txt"), b"version one").unwrap();

		let manager = UploadManager::new(data_dir.path(), config_dir.path());
		let registry = Registry::open(data_dir.path()).unwrap();

		let project = make_storage_project("docs3");
		registry.projects().save(&project).unwrap();
		let factory = crate::projects::factory::ProjectHandlerFactory::new().unwrap();
		factory.get(ProjectType::Storage).initialize(data_dir.path(), &project).await.unwrap();

		let source = UploadSource::new(SourceType::Local, source_dir.path().to_string_lossy().into_owned());
		manager.run(&registry, &project, source.clone(), ConflictResolution::Skip, CancellationToken::new()).await.unwrap();

		std::fs::write(source_dir.path().join("doc.txt"), b"version two").unwrap();
		let operation = manager.run(&registry, &project, source, ConflictResolution::Backup, CancellationToken::new()).await.unwrap();

		assert_eq!(operation.progress.files_succeeded, 1);
		let archive_dir = data_dir.path().join("projects").join("docs3").join("archive");
		let archived: Vec<_> = std::fs::read_dir(&archive_dir).unwrap().collect();
		assert_eq!(archived.len(), 1);
		let contents = std::fs::read(archived[0].as_ref().unwrap().path()).unwrap();
		assert_eq!(contents, b"version one");
	}
}
