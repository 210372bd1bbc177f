//! SFTP source adapter (feature `sftp`), backed by `ssh2`.
//!
//! Host keys are accepted without verification (no known-hosts database is
//! part of this system's scope); authentication tries, in order, an
//! explicit private key, a password, then the ssh-agent.

use std::io::{Read, Seek, SeekFrom};
use std::net::TcpStream;
use std::path::Path;

use async_trait::async_trait;
use ssh2::Session;

use super::adapter::{AdapterResult, ChunkProgress, RemoteEntry, RemoteStat, SourceAdapter, FETCH_CHUNK_SIZE};
use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

pub struct SftpAdapter {
	session: Option<Session>,
}

impl Default for SftpAdapter {
	fn default() -> Self {
		SftpAdapter { session: None }
	}
}

fn parse_location(location: &str) -> (String, String) {
	let without_scheme = location.strip_prefix("sftp://").unwrap_or(location);
	let (host, path) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));
	let host = if host.contains(':') { host.to_string() } else { format!("{}:22", host) };
	(host, format!("/{}", path))
}

#[async_trait]
impl SourceAdapter for SftpAdapter {
	async fn validate(&mut self, location: &str, credentials: Option<&SourceCredentials>) -> AdapterResult<()> {
		let (host, _path) = parse_location(location);
		let tcp = TcpStream::connect(&host).map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;

		let mut session = Session::new().map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;
		session.set_tcp_stream(tcp);
		session.handshake().map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;

		let username = credentials.and_then(|c| c.username.clone()).unwrap_or_else(|| "anonymous".to_string());
		let auth_result = match credentials {
			Some(creds) if creds.key.is_some() => {
				session.userauth_pubkey_memory(&username, None, creds.key.as_deref().unwrap(), None)
			}
			Some(creds) if creds.password.is_some() => session.userauth_password(&username, creds.password.as_deref().unwrap()),
			_ => session.userauth_agent(&username),
		};
		auth_result.map_err(|_| AdapterError::AuthFailed { location: location.to_string() })?;

		if !session.authenticated() {
			return Err(AdapterError::AuthFailed { location: location.to_string() });
		}
		self.session = Some(session);
		Ok(())
	}

	async fn list(&mut self, location: &str, params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>> {
		let (_, path) = parse_location(location);
		let session = self.session.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let sftp = session.sftp().map_err(|e| AdapterError::Transient { message: e.to_string() })?;

		let mut out = Vec::new();
		let mut stack = vec![path];
		let recursive = params.recursive.unwrap_or(true);

		while let Some(dir) = stack.pop() {
			let entries = sftp.readdir(Path::new(&dir)).map_err(|e| AdapterError::Transient { message: format!("readdir {}: {}", dir, e) })?;
			for (path, stat) in entries {
				let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
				if name == "." || name == ".." {
					continue;
				}
				let relative = path.to_string_lossy().into_owned();
				if stat.is_dir() {
					if recursive {
						stack.push(relative.clone());
					}
					out.push(RemoteEntry { relative_path: relative, size: 0, is_dir: true });
				} else {
					out.push(RemoteEntry { relative_path: relative, size: stat.size.unwrap_or(0), is_dir: false });
				}
			}
		}
		Ok(out)
	}

	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat> {
		let session = self.session.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let sftp = session.sftp().map_err(|e| AdapterError::Transient { message: e.to_string() })?;
		let stat = sftp.stat(Path::new(relative_path)).map_err(|e| AdapterError::NotFound { path: format!("{}: {}", relative_path, e) })?;
		Ok(RemoteStat { size: stat.size.unwrap_or(0), supports_resume: true })
	}

	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		self.resume(relative_path, 0, on_chunk).await
	}

	async fn resume(&mut self, relative_path: &str, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let session = self.session.as_ref().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let sftp = session.sftp().map_err(|e| AdapterError::Transient { message: e.to_string() })?;
		let mut file = sftp
			.open(Path::new(relative_path))
			.map_err(|e| AdapterError::NotFound { path: format!("{}: {}", relative_path, e) })?;
		let stat = file.stat().map_err(|e| AdapterError::Transient { message: e.to_string() })?;
		let total = stat.size.unwrap_or(0);
		if offset > 0 {
			file.seek(SeekFrom::Start(offset)).map_err(|e| AdapterError::Transient { message: e.to_string() })?;
		}

		let mut out = Vec::new();
		let mut buf = vec![0u8; FETCH_CHUNK_SIZE];
		loop {
			let read = file.read(&mut buf).map_err(|e| AdapterError::Transient { message: e.to_string() })?;
			if read == 0 {
				break;
			}
			out.extend_from_slice(&buf[..read]);
			on_chunk(offset + out.len() as u64, total);
		}
		Ok(out)
	}

	async fn close(&mut self) -> AdapterResult<()> {
		self.session = None;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_sftp_location_with_default_port() {
		let (host, path) = parse_location("sftp://host.example.com/srv/data");
		assert_eq!(host, "host.example.com:22");
		assert_eq!(path, "/srv/data");
	}
}
