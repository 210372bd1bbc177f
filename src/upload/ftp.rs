//! FTP source adapter (feature `ftp`), backed by `suppaftp`.

use async_trait::async_trait;
use suppaftp::FtpStream;

use super::adapter::{AdapterResult, ChunkProgress, RemoteEntry, RemoteStat, SourceAdapter, FETCH_CHUNK_SIZE};
use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

/// `ftp://host[:port]/path` location, connected lazily on `validate`.
pub struct FtpAdapter {
	stream: Option<FtpStream>,
}

impl Default for FtpAdapter {
	fn default() -> Self {
		FtpAdapter { stream: None }
	}
}

fn parse_location(location: &str) -> AdapterResult<(String, String)> {
	let without_scheme = location.strip_prefix("ftp://").unwrap_or(location);
	let (host, path) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));
	let host = if host.contains(':') { host.to_string() } else { format!("{}:21", host) };
	Ok((host, format!("/{}", path)))
}

#[async_trait]
impl SourceAdapter for FtpAdapter {
	async fn validate(&mut self, location: &str, credentials: Option<&SourceCredentials>) -> AdapterResult<()> {
		let (host, _path) = parse_location(location)?;
		let mut stream = FtpStream::connect(&host).map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;

		let (user, pass) = credentials
			.map(|c| (c.username.clone().unwrap_or_else(|| "anonymous".to_string()), c.password.clone().unwrap_or_default()))
			.unwrap_or_else(|| ("anonymous".to_string(), String::new()));

		stream.login(&user, &pass).map_err(|_| AdapterError::AuthFailed { location: location.to_string() })?;
		let _ = stream.set_mode(suppaftp::Mode::Passive);
		self.stream = Some(stream);
		Ok(())
	}

	async fn list(&mut self, location: &str, params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>> {
		let (_, path) = parse_location(location)?;
		let stream = self.stream.as_mut().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;

		let mut out = Vec::new();
		let mut stack = vec![path];
		let recursive = params.recursive.unwrap_or(true);

		while let Some(dir) = stack.pop() {
			let listing = stream
				.list(Some(&dir))
				.map_err(|e| AdapterError::Transient { message: format!("LIST {} failed: {}", dir, e) })?;
			for line in listing {
				if let Some((name, size, is_dir)) = parse_list_line(&line) {
					let relative = format!("{}/{}", dir.trim_end_matches('/'), name);
					if is_dir {
						if recursive {
							stack.push(relative.clone());
						}
						out.push(RemoteEntry { relative_path: relative, size: 0, is_dir: true });
					} else {
						out.push(RemoteEntry { relative_path: relative, size, is_dir: false });
					}
				}
			}
		}
		Ok(out)
	}

	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat> {
		let stream = self.stream.as_mut().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let size = stream.size(relative_path).map_err(|e| AdapterError::NotFound { path: format!("{}: {}", relative_path, e) })?;
		Ok(RemoteStat { size: size as u64, supports_resume: true })
	}

	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let stream = self.stream.as_mut().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		let bytes = stream
			.retr_as_buffer(relative_path)
			.map(|cursor| cursor.into_inner())
			.map_err(|e| AdapterError::Transient { message: format!("RETR {} failed: {}", relative_path, e) })?;
		report_in_chunks(&bytes, 0, on_chunk);
		Ok(bytes)
	}

	async fn resume(&mut self, relative_path: &str, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let stream = self.stream.as_mut().ok_or_else(|| AdapterError::Permanent { message: "adapter not validated".to_string() })?;
		stream.resume_transfer(offset as usize).map_err(|e| AdapterError::ResumeUnsupported { reason: e.to_string() })?;
		let bytes = stream
			.retr_as_buffer(relative_path)
			.map(|cursor| cursor.into_inner())
			.map_err(|e| AdapterError::Transient { message: format!("REST+RETR {} failed: {}", relative_path, e) })?;
		report_in_chunks(&bytes, offset, on_chunk);
		Ok(bytes)
	}

	async fn close(&mut self) -> AdapterResult<()> {
		if let Some(mut stream) = self.stream.take() {
			let _ = stream.quit();
		}
		Ok(())
	}
}

/// `retr_as_buffer` has already pulled the whole file into memory by the
/// time this runs, so progress is reported over [`FETCH_CHUNK_SIZE`]-sized
/// slices of the finished buffer rather than as bytes arrive on the wire.
fn report_in_chunks(bytes: &[u8], offset: u64, on_chunk: ChunkProgress<'_>) {
	let total = offset + bytes.len() as u64;
	let mut done = offset;
	for chunk in bytes.chunks(FETCH_CHUNK_SIZE) {
		done += chunk.len() as u64;
		on_chunk(done, total);
	}
	if bytes.is_empty() {
		on_chunk(offset, total);
	}
}

/// Parses one line of a Unix-style `LIST` response: permission bits, link
/// count, owner, group, size, date, name. Directories are identified by a
/// leading `d` in the permission field.
fn parse_list_line(line: &str) -> Option<(String, u64, bool)> {
	let fields: Vec<&str> = line.split_whitespace().collect();
	if fields.len() < 9 {
		return None;
	}
	let is_dir = fields[0].starts_with('d');
	let size: u64 = fields[4].parse().unwrap_or(0);
	let name = fields[8..].join(" ");
	Some((name, size, is_dir))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_ftp_location_with_default_port() {
		let (host, path) = parse_location("ftp://ftp.example.com/docs/file.txt").unwrap();
		assert_eq!(host, "ftp.example.com:21");
		assert_eq!(path, "/docs/file.txt");
	}

	#[test]
	fn parses_unix_list_line() {
		let (name, size, is_dir) = parse_list_line("-rw-r--r-- 1 user group 1024 Jan 01 00:00 file.txt").unwrap();
		assert_eq!(name, "file.txt");
		assert_eq!(size, 1024);
		assert!(!is_dir);
	}

	#[test]
	fn parses_unix_list_directory_line() {
		let (name, _, is_dir) = parse_list_line("drwxr-xr-x 2 user group 4096 Jan 01 00:00 sub").unwrap();
		assert_eq!(name, "sub");
		assert!(is_dir);
	}
}
