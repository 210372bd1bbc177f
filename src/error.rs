//! Error types for DocBro core operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::rpc::RpcError;

/// Helper to reduce `Box::new()` boilerplate when wrapping errors into
/// `Box<dyn Error + Send + Sync>` for error variant fields.
#[inline]
pub fn boxed_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
	Box::new(e)
}

/// Unified error type for all DocBro core operations.
#[derive(Debug)]
pub enum DocBroError {
	/// Project name fails validation (empty, too long, invalid chars, reserved name)
	InvalidName { name: String, reason: String },

	/// A project with this name already exists
	AlreadyExists { name: String },

	/// No project, operation, or file with this identity exists
	NotFound { what: String },

	/// Effective settings failed validation for the project's type
	InvalidSettings { reasons: Vec<String> },

	/// Malformed import/export payload
	InvalidInput { message: String },

	/// Adapter login/authentication failed
	AuthFailed { location: String },

	/// Checksum mismatch on retrieval
	IntegrityMismatch { expected: String, actual: String },

	/// Cooperative cancellation observed
	Cancelled,

	/// I/O error
	Io(io::Error),

	/// Repository (SQLite) error
	Repository(Box<dyn Error + Send + Sync>),

	/// Upload adapter error (nested)
	Adapter(AdapterError),

	/// Config resolution error (nested)
	Config(ConfigError),

	/// JSON-RPC protocol error (nested)
	Rpc(RpcError),

	/// Generic error message, for errors with no structured home yet
	Other { message: String },
}

impl fmt::Display for DocBroError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DocBroError::InvalidName { name, reason } => {
				write!(f, "invalid project name '{}': {}", name, reason)
			}
			DocBroError::AlreadyExists { name } => {
				write!(f, "project '{}' already exists", name)
			}
			DocBroError::NotFound { what } => write!(f, "{} not found", what),
			DocBroError::InvalidSettings { reasons } => {
				write!(f, "invalid settings: {}", reasons.join("; "))
			}
			DocBroError::InvalidInput { message } => write!(f, "invalid input: {}", message),
			DocBroError::AuthFailed { location } => {
				write!(f, "authentication failed for {}", redact_location(location))
			}
			DocBroError::IntegrityMismatch { expected, actual } => {
				write!(f, "integrity check failed: expected {}, got {}", expected, actual)
			}
			DocBroError::Cancelled => write!(f, "operation cancelled"),
			DocBroError::Io(e) => write!(f, "I/O error: {}", e),
			DocBroError::Repository(e) => write!(f, "repository error: {}", e),
			DocBroError::Adapter(e) => write!(f, "adapter error: {}", e),
			DocBroError::Config(e) => write!(f, "config error: {}", e),
			DocBroError::Rpc(e) => write!(f, "rpc error: {}", e),
			DocBroError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for DocBroError {}

impl From<io::Error> for DocBroError {
	fn from(e: io::Error) -> Self {
		DocBroError::Io(e)
	}
}

impl From<rusqlite::Error> for DocBroError {
	fn from(e: rusqlite::Error) -> Self {
		DocBroError::Repository(boxed_error(e))
	}
}

impl From<ConfigError> for DocBroError {
	fn from(e: ConfigError) -> Self {
		DocBroError::Config(e)
	}
}

impl From<AdapterError> for DocBroError {
	fn from(e: AdapterError) -> Self {
		DocBroError::Adapter(e)
	}
}

impl From<RpcError> for DocBroError {
	fn from(e: RpcError) -> Self {
		DocBroError::Rpc(e)
	}
}

impl From<serde_json::Error> for DocBroError {
	fn from(e: serde_json::Error) -> Self {
		DocBroError::Other { message: format!("JSON error: {}", e) }
	}
}

impl From<String> for DocBroError {
	fn from(message: String) -> Self {
		DocBroError::Other { message }
	}
}

/// Masks credentials embedded in a `user:pass@host` style location string.
pub fn redact_location(location: &str) -> String {
	if let Some(at) = location.find('@') {
		if let Some(scheme_end) = location.find("://") {
			if at > scheme_end {
				return format!("{}://***@{}", &location[..scheme_end], &location[at + 1..]);
			}
		}
	}
	location.to_string()
}

/// Errors raised by upload source adapters.
#[derive(Debug)]
pub enum AdapterError {
	/// Connection to the source location failed
	ConnectionFailed { location: String, source: Box<dyn Error + Send + Sync> },

	/// Transient error eligible for retry (timeout, reset, 5xx, FTP 4xx)
	Transient { message: String },

	/// Permanent error, never retried (404, permission denied, disk full)
	Permanent { message: String },

	/// Authentication rejected by the remote
	AuthFailed { location: String },

	/// Remote path does not exist or is not accessible
	NotFound { path: String },

	/// Resume requested but not supported or not possible from this offset
	ResumeUnsupported { reason: String },

	/// Already-complete response to a resume request (HTTP 416)
	AlreadyComplete,
}

impl fmt::Display for AdapterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AdapterError::ConnectionFailed { location, source } => {
				write!(f, "failed to connect to {}: {}", redact_location(location), source)
			}
			AdapterError::Transient { message } => write!(f, "transient error: {}", message),
			AdapterError::Permanent { message } => write!(f, "permanent error: {}", message),
			AdapterError::AuthFailed { location } => {
				write!(f, "authentication failed for {}", redact_location(location))
			}
			AdapterError::NotFound { path } => write!(f, "remote path not found: {}", path),
			AdapterError::ResumeUnsupported { reason } => {
				write!(f, "resume not supported: {}", reason)
			}
			AdapterError::AlreadyComplete => write!(f, "resource already fully transferred"),
		}
	}
}

impl Error for AdapterError {}

impl From<io::Error> for AdapterError {
	fn from(e: io::Error) -> Self {
		AdapterError::Transient { message: e.to_string() }
	}
}
