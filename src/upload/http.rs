//! HTTP(S) source adapter: single-file fetch with Range-based resume.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};

use super::adapter::{AdapterResult, ChunkProgress, RemoteEntry, RemoteStat, SourceAdapter};
use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

pub struct HttpAdapter {
	client: Client,
	credentials: Option<SourceCredentials>,
}

impl Default for HttpAdapter {
	fn default() -> Self {
		HttpAdapter { client: Client::new(), credentials: None }
	}
}

impl HttpAdapter {
	fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.credentials {
			Some(creds) if creds.key.is_some() => builder.header(header::AUTHORIZATION, format!("Bearer {}", creds.key.as_ref().unwrap())),
			Some(creds) if creds.username.is_some() => builder.basic_auth(creds.username.clone().unwrap_or_default(), creds.password.clone()),
			_ => builder,
		}
	}

	fn classify(status: StatusCode, location: &str) -> AdapterError {
		if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
			AdapterError::AuthFailed { location: location.to_string() }
		} else if status == StatusCode::NOT_FOUND {
			AdapterError::NotFound { path: location.to_string() }
		} else if status == StatusCode::RANGE_NOT_SATISFIABLE {
			AdapterError::AlreadyComplete
		} else if status.is_server_error() {
			AdapterError::Transient { message: format!("server responded {}", status) }
		} else {
			AdapterError::Permanent { message: format!("server responded {}", status) }
		}
	}
}

#[async_trait]
impl SourceAdapter for HttpAdapter {
	async fn validate(&mut self, location: &str, credentials: Option<&SourceCredentials>) -> AdapterResult<()> {
		self.credentials = credentials.cloned();
		let request = self.apply_auth(self.client.head(location));
		let response = request.send().await.map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;
		if !response.status().is_success() {
			return Err(Self::classify(response.status(), location));
		}
		Ok(())
	}

	/// A single URL is treated as one enumerable entry: its own filename,
	/// preferring `Content-Disposition` over the URL's path segment.
	async fn list(&mut self, location: &str, _params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>> {
		let request = self.apply_auth(self.client.head(location));
		let response = request.send().await.map_err(|e| AdapterError::ConnectionFailed {
			location: location.to_string(),
			source: crate::error::boxed_error(e),
		})?;
		if !response.status().is_success() {
			return Err(Self::classify(response.status(), location));
		}

		let filename = content_disposition_filename(response.headers()).unwrap_or_else(|| url_filename(location));
		let size = response.content_length().unwrap_or(0);
		Ok(vec![RemoteEntry { relative_path: filename, size, is_dir: false }])
	}

	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat> {
		let request = self.apply_auth(self.client.head(relative_path));
		let response = request.send().await.map_err(|e| AdapterError::ConnectionFailed {
			location: relative_path.to_string(),
			source: crate::error::boxed_error(e),
		})?;
		let supports_resume = response.headers().get(header::ACCEPT_RANGES).map(|v| v == "bytes").unwrap_or(false);
		Ok(RemoteStat { size: response.content_length().unwrap_or(0), supports_resume })
	}

	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let request = self.apply_auth(self.client.get(relative_path));
		let response = request.send().await.map_err(|e| AdapterError::ConnectionFailed {
			location: relative_path.to_string(),
			source: crate::error::boxed_error(e),
		})?;
		if !response.status().is_success() {
			return Err(Self::classify(response.status(), relative_path));
		}
		stream_body(response, 0, on_chunk).await
	}

	/// Issues a `Range: bytes=offset-` request; a `206 Partial Content`
	/// response resumes, `416` maps to [`AdapterError::AlreadyComplete`].
	async fn resume(&mut self, relative_path: &str, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let request = self.apply_auth(self.client.get(relative_path)).header(header::RANGE, format!("bytes={}-", offset));
		let response = request.send().await.map_err(|e| AdapterError::ConnectionFailed {
			location: relative_path.to_string(),
			source: crate::error::boxed_error(e),
		})?;

		match response.status() {
			StatusCode::PARTIAL_CONTENT | StatusCode::OK => stream_body(response, offset, on_chunk).await,
			StatusCode::RANGE_NOT_SATISFIABLE => Err(AdapterError::AlreadyComplete),
			status => Err(Self::classify(status, relative_path)),
		}
	}

	async fn close(&mut self) -> AdapterResult<()> {
		Ok(())
	}
}

/// Drains a response body as it arrives over the wire, reporting
/// `(bytes_done, bytes_total)` after each network chunk rather than waiting
/// for the whole body to buffer.
async fn stream_body(response: Response, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
	let total = response.content_length().unwrap_or(0) + offset;
	let mut out = Vec::new();
	let mut stream = response.bytes_stream();
	while let Some(chunk) = stream.next().await {
		let chunk = chunk.map_err(|e| AdapterError::Transient { message: e.to_string() })?;
		out.extend_from_slice(&chunk);
		on_chunk(offset + out.len() as u64, total);
	}
	Ok(out)
}

fn content_disposition_filename(headers: &header::HeaderMap) -> Option<String> {
	let value = headers.get(header::CONTENT_DISPOSITION)?.to_str().ok()?;
	value.split(';').find_map(|part| {
		let part = part.trim();
		part.strip_prefix("filename=").map(|name| name.trim_matches('"').to_string())
	})
}

fn url_filename(location: &str) -> String {
	location.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download").to_string()
}

#[cfg(test)]
mod tests {
	use std::thread;

	use reqwest::header::{HeaderMap, HeaderValue};
	use tiny_http::{Response, Server, StatusCode as TinyStatusCode};

	use super::*;

	#[test]
	fn extracts_filename_from_content_disposition() {
		let mut headers = HeaderMap::new();
		headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=\"report.pdf\""));
		assert_eq!(content_disposition_filename(&headers), Some("report.pdf".to_string()));
	}

	#[test]
	fn falls_back_to_url_path_segment() {
		assert_eq!(url_filename("https://example.com/files/report.pdf"), "report.pdf");
		assert_eq!(url_filename("https://example.com/"), "download");
	}

	/// Spawns a one-shot mock server on a random port, responding to the
	/// single request it receives with `body` and `status`.
	fn spawn_one_shot(status: u16, body: &'static str) -> (String, thread::JoinHandle<()>) {
		let server = Server::http("127.0.0.1:0").expect("server");
		let base_url = format!("http://{}", server.server_addr());
		let handle = thread::spawn(move || {
			let req = server.recv().expect("request");
			let resp = Response::from_string(body).with_status_code(TinyStatusCode(status));
			req.respond(resp).expect("respond");
		});
		(base_url, handle)
	}

	#[tokio::test]
	async fn fetch_streams_the_full_body_and_reports_progress() {
		let (base_url, handle) = spawn_one_shot(200, "hello world");

		let mut adapter = HttpAdapter::default();
		let mut chunks = Vec::new();
		let bytes = adapter
			.fetch(&base_url, &mut |done, total| chunks.push((done, total)))
			.await
			.expect("fetch");

		assert_eq!(bytes, b"hello world");
		assert_eq!(chunks.last().copied(), Some((11, 11)));
		handle.join().expect("join");
	}

	#[tokio::test]
	async fn resume_sends_range_header_and_streams_partial_body() {
		let server = Server::http("127.0.0.1:0").expect("server");
		let base_url = format!("http://{}", server.server_addr());
		let handle = thread::spawn(move || {
			let req = server.recv().expect("request");
			let range = req.headers().iter().find(|h| h.field.equiv("Range")).map(|h| h.value.as_str().to_string());
			assert_eq!(range, Some("bytes=6-".to_string()));

			let resp = Response::from_string("world").with_status_code(TinyStatusCode(206));
			req.respond(resp).expect("respond");
		});

		let mut adapter = HttpAdapter::default();
		let mut chunks = Vec::new();
		let bytes = adapter
			.resume(&base_url, 6, &mut |done, total| chunks.push((done, total)))
			.await
			.expect("resume");

		assert_eq!(bytes, b"world");
		assert_eq!(chunks.last().copied(), Some((11, 11)));
		handle.join().expect("join");
	}

	#[tokio::test]
	async fn resume_maps_range_not_satisfiable_to_already_complete() {
		let (base_url, handle) = spawn_one_shot(416, "");

		let mut adapter = HttpAdapter::default();
		let err = adapter.resume(&base_url, 11, &mut |_, _| {}).await.expect_err("should fail");
		assert!(matches!(err, AdapterError::AlreadyComplete));
		handle.join().expect("join");
	}
}
