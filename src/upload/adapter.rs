//! Common source-adapter trait (C5): abstracts local, FTP, SFTP, SMB, and
//! HTTP(S) upload sources behind one interface the upload manager drives.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::types::{ConnectionParams, SourceCredentials};

pub type AdapterResult<T> = Result<T, AdapterError>;

/// One entry discovered while enumerating a source.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
	pub relative_path: String,
	pub size: u64,
	pub is_dir: bool,
}

/// Metadata about a single remote file, enough to decide whether a transfer
/// can resume and from which offset.
#[derive(Debug, Clone)]
pub struct RemoteStat {
	pub size: u64,
	pub supports_resume: bool,
}

/// Size of one streamed read during `fetch`/`resume`, per the chunked-copy
/// requirement: large transfers report progress incrementally rather than
/// only once the whole file has landed in memory.
pub const FETCH_CHUNK_SIZE: usize = 64 * 1024;

/// Invoked after each chunk lands, with `(bytes_done, bytes_total)` for the
/// current file. `bytes_total` is 0 when the adapter can't know the size
/// ahead of time.
pub type ChunkProgress<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

/// Implemented once per [`crate::types::SourceType`]. The upload manager
/// drives validate -> list -> (stat + fetch/resume)* -> close without any
/// source-specific knowledge.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
	/// Confirms the source location is reachable and credentials, if any,
	/// are accepted. Called once before enumeration begins.
	async fn validate(&mut self, location: &str, credentials: Option<&SourceCredentials>) -> AdapterResult<()>;

	/// Enumerates entries under `location`, honoring `recursive` and
	/// `follow_symlinks` from `params`. Exclusion filtering happens in the
	/// upload manager, not here.
	async fn list(&mut self, location: &str, params: &ConnectionParams) -> AdapterResult<Vec<RemoteEntry>>;

	/// Retrieves size and resume-capability for one entry.
	async fn stat(&mut self, relative_path: &str) -> AdapterResult<RemoteStat>;

	/// Reads the full contents of one entry, calling `on_chunk` as bytes
	/// arrive so a caller can surface incremental progress.
	async fn fetch(&mut self, relative_path: &str, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>>;

	/// Reads one entry's contents starting at `offset`, for resuming a
	/// partially-completed transfer. Adapters that cannot resume return
	/// [`AdapterError::ResumeUnsupported`].
	async fn resume(&mut self, relative_path: &str, offset: u64, on_chunk: ChunkProgress<'_>) -> AdapterResult<Vec<u8>> {
		let _ = offset;
		let _ = relative_path;
		let _ = on_chunk;
		Err(AdapterError::ResumeUnsupported { reason: "this adapter does not support resuming".to_string() })
	}

	/// Releases any held connection state (sockets, sessions, pools).
	async fn close(&mut self) -> AdapterResult<()>;
}
