//! Local filesystem source adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::adapter::{AdapterResult, ChunkProgress, RemoteEntry, RemoteStat, SourceAdapter, FETCH_CHUNK_SIZE};
use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

pub struct LocalAdapter {
	root: Option<PathBuf>,
}

impl Default for LocalAdapter {
	fn default() -> Self {
		LocalAdapter { root: None }
	}
}

impl LocalAdapter {
	fn resolve(&self, relative_path: &str) -> PathBuf {
		self.root.as_deref().unwrap_or_else(|| Path::new(".")).join(relative_path)
	}
}

#[async_trait]
impl SourceAdapter for LocalAdapter {
	async fn validate(&mut self, location: &str, _credentials: Option<&SourceCredentials>) -> AdapterResult<()> {
		let root = PathBuf::from(location);
		if !root.exists() {
			return Err(AdapterError::NotFound { path: location.to_string() });
		}
		self.root = Some(root);
		Ok(())
	}

	async fn list(&mut self, location: &str, params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>> {
		let root = PathBuf::from(location);
		let recursive = params.recursive.unwrap_or(true);
		let follow_symlinks = params.follow_symlinks.unwrap_or(false);

		let mut out = Vec::new();
		let mut stack = vec![root.clone()];
		while let Some(dir) = stack.pop() {
			let entries = std::fs::read_dir(&dir).map_err(AdapterError::from)?;
			for entry in entries.flatten() {
				let path = entry.path();
				let metadata = if follow_symlinks { std::fs::metadata(&path) } else { entry.metadata() };
				let Ok(metadata) = metadata else { continue };

				let relative = path.strip_prefix(&root).unwrap_or(&path).to_string_lossy().into_owned();
				if metadata.is_dir() {
					if recursive {
						stack.push(path);
					}
					out.push(RemoteEntry { relative_path: relative, size: 0, is_dir: true });
				} else {
					out.push(RemoteEntry { relative_path: relative, size: metadata.len(), is_dir: false });
				}
			}
		}
		Ok(out)
	}

	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat> {
		let path = self.resolve(relative_path);
		let metadata = std::fs::metadata(&path).map_err(AdapterError::from)?;
		Ok(RemoteStat { size: metadata.len(), supports_resume: true })
	}

	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		stream_from(&self.resolve(relative_path), 0, on_chunk)
	}

	async fn resume(&mut self, relative_path: &str, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		stream_from(&self.resolve(relative_path), offset, on_chunk)
	}

	async fn close(&mut self) -> AdapterResult<()> {
		Ok(())
	}
}

/// Reads a local file from `offset` to its end in [`FETCH_CHUNK_SIZE`]
/// chunks, reporting `(bytes_done, bytes_total)` after each one.
fn stream_from(path: &Path, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
	use std::io::{Read, Seek, SeekFrom};
	let mut file = std::fs::File::open(path).map_err(AdapterError::from)?;
	let total = file.metadata().map_err(AdapterError::from)?.len();
	if offset > 0 {
		file.seek(SeekFrom::Start(offset)).map_err(AdapterError::from)?;
	}

	let mut out = Vec::with_capacity(total.saturating_sub(offset) as usize);
	let mut buf = vec![0u8; FETCH_CHUNK_SIZE];
	loop {
		let read = file.read(&mut buf).map_err(AdapterError::from)?;
		if read == 0 {
			break;
		}
		out.extend_from_slice(&buf[..read]);
		on_chunk(offset + out.len() as u64, total);
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[tokio::test]
	async fn lists_files_recursively() {
		let dir = tempdir().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
		std::fs::create_dir(dir.path().join("sub")).unwrap();
		std::fs::write(dir.path().join("sub/b.txt"), b"bb").unwrap();

		let mut adapter = LocalAdapter::default();
		adapter.validate(dir.path().to_str().unwrap(), None).await.unwrap();
		let entries = adapter.list(dir.path().to_str().unwrap(), &ConnectionParams::default()).await.unwrap();

		let files: Vec<_> = entries.iter().filter(|e| !e.is_dir).collect();
		assert_eq!(files.len(), 2);
	}

	#[tokio::test]
	async fn validate_fails_on_missing_root() {
		let mut adapter = LocalAdapter::default();
		let err = adapter.validate("/no/such/path/at/all", None).await.unwrap_err();
		assert!(matches!(err, AdapterError::NotFound { .. }));
	}

	#[tokio::test]
	async fn fetch_round_trips_content() {
		let dir = tempdir().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

		let mut adapter = LocalAdapter::default();
		adapter.validate(dir.path().to_str().unwrap(), None).await.unwrap();
		let mut last_progress = (0u64, 0u64);
		let bytes = adapter.fetch("a.txt", &mut |done, total| last_progress = (done, total)).await.unwrap();
		assert_eq!(bytes, b"hello");
		assert_eq!(last_progress, (5, 5));
	}
}
