//! SMB source adapter (feature `smb`), backed by `pavao` (libsmbclient).
//!
//! Resolves the open question on SMB addressing: locations are normalized
//! to `smb://host/share/path` URLs internally; a `\\host\share\path` UNC
//! location given by a caller is converted on entry, so every other layer
//! only ever sees the URL form.

use async_trait::async_trait;
use pavao::{SmbClient, SmbCredentials, SmbDirentType, SmbOpenOptions, SmbOptions};

use super::adapter::{AdapterResult, ChunkProgress, RemoteEntry, RemoteStat, SourceAdapter, FETCH_CHUNK_SIZE};
use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

pub struct SmbAdapter {
	client: Option<SmbClient>,
}

impl Default for SmbAdapter {
	fn default() -> Self {
		SmbAdapter { client: None }
	}
}

/// Converts a `\\host\share\path` UNC location to `smb://host/share/path`;
/// an already-URL location passes through unchanged.
pub fn normalize_location(location: &str) -> String {
	if location.starts_with("smb://") {
		return location.to_string();
	}
	if let Some(unc) = location.strip_prefix(r"\\") {
		let normalized = unc.replace('\\', "/");
		return format!("smb://{}", normalized);
	}
	location.to_string()
}

#[async_trait]
impl SourceAdapter for SmbAdapter {
	async fn validate(&mut self, location: &str, credentials: Option<&SourceCredentials>) -> AdapterResult<()> {
		let url = normalize_location(location);
		let creds = SmbCredentials::default()
			.server(&url)
			.share("")
			.username(credentials.and_then(|c| c.username.clone()).unwrap_or_default())
			.password(credentials.and_then(|c| c.password.clone()).unwrap_or_default())
			.workgroup(credentials.and_then(|c| c.domain.clone()).unwrap_or_default());

		let client = SmbClient::new(creds, SmbOptions::default()).map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
		})?;
		self.client = Some(client);
		Ok(())
	}

	async fn list(&mut self, location: &str, params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>> {
		let url = normalize_location(location);
		let client = self.client.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;

		let recursive = params.recursive.unwrap_or(true);
		let mut out = Vec::new();
		let mut stack = vec![url];

		while let Some(dir) = stack.pop() {
			let entries = client.list_dir(&dir).map_err(|e| AdapterError::Transient { message: format!("list {}: {}", dir, e) })?;
			for entry in entries {
				if entry.name == "." || entry.name == ".." {
					continue;
				}
				let relative = format!("{}/{}", dir.trim_end_matches('/'), entry.name);
				match entry.smbc_type {
					SmbDirentType::Dir => {
						if recursive {
							stack.push(relative.clone());
						}
						out.push(RemoteEntry { relative_path: relative, size: 0, is_dir: true });
					}
					_ => out.push(RemoteEntry { relative_path: relative, size: 0, is_dir: false }),
				}
			}
		}
		Ok(out)
	}

	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat> {
		let client = self.client.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let info = client.stat(relative_path).map_err(|e| AdapterError::NotFound { path: format!("{}: {}", relative_path, e) })?;
		Ok(RemoteStat { size: info.size, supports_resume: true })
	}

	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let client = self.client.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let file = client
			.open_with(relative_path, SmbOpenOptions::default().read(true))
			.map_err(|e| AdapterError::NotFound { path: format!("{}: {}", relative_path, e) })?;
		let bytes = client.read_file(&file).map_err(|e| AdapterError::Transient { message: e.to_string() })?;

		// `read_file` returns the whole buffer at once; pavao exposes no
		// partial-read primitive, so progress is reported over
		// FETCH_CHUNK_SIZE-sized slices of the finished buffer.
		let total = bytes.len() as u64;
		let mut done = 0u64;
		for chunk in bytes.chunks(FETCH_CHUNK_SIZE) {
			done += chunk.len() as u64;
			on_chunk(done, total);
		}
		Ok(bytes)
	}

	async fn close(&mut self) -> AdapterResult<()> {
		self.client = None;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_unc_to_smb_url() {
		assert_eq!(normalize_location(r"\\fileserver\share\docs"), "smb://fileserver/share/docs");
	}

	#[test]
	fn leaves_existing_url_unchanged() {
		assert_eq!(normalize_location("smb://fileserver/share/docs"), "smb://fileserver/share/docs");
	}
}
