//! Multi-protocol upload ingestion (C5 + C6): source adapters behind a
//! common trait, conflict and exclusion policy, and the orchestration
//! pipeline that drives one upload from enumeration to completion.

pub mod adapter;
pub mod conflict;
pub mod exclusion;
pub mod http;
pub mod local;
pub mod manager;

#[cfg(feature = "ftp")]
pub mod ftp;
#[cfg(feature = "sftp")]
pub mod sftp;
#[cfg(feature = "smb")]
pub mod smb;

use adapter::SourceAdapter;
use crate::error::DocBroError;
use crate::types::SourceType;

/// Builds the adapter for a source type. HTTP is always available (it
/// rides on the core `reqwest` dependency); FTP/SFTP/SMB are gated behind
/// their Cargo features since each pulls in a dedicated protocol library.
pub fn adapter_for(source_type: SourceType) -> Result<Box<dyn SourceAdapter>, DocBroError> {
	match source_type {
		SourceType::Local => Ok(Box::new(local::LocalAdapter::default())),
		SourceType::Http | SourceType::Https => Ok(Box::new(http::HttpAdapter::default())),
		#[cfg(feature = "ftp")]
		SourceType::Ftp => Ok(Box::new(ftp::FtpAdapter::default())),
		#[cfg(not(feature = "ftp"))]
		SourceType::Ftp => Err(DocBroError::Other { message: "ftp support not compiled in".to_string() }),
		#[cfg(feature = "sftp")]
		SourceType::Sftp => Ok(Box::new(sftp::SftpAdapter::default())),
		#[cfg(not(feature = "sftp"))]
		SourceType::Sftp => Err(DocBroError::Other { message: "sftp support not compiled in".to_string() }),
		#[cfg(feature = "smb")]
		SourceType::Smb => Ok(Box::new(smb::SmbAdapter::default())),
		#[cfg(not(feature = "smb"))]
		SourceType::Smb => Err(DocBroError::Other { message: "smb support not compiled in".to_string() }),
	}
}
