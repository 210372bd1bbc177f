//! Consolidated strategy and mode enums
//!
//! Central location for enums that describe a *choice of behavior* rather
//! than data: conflict resolution, provenance, retry classification.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use crate::types::ConflictResolution;

impl FromStr for ConflictResolution {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"ask" => Ok(Self::Ask),
			"skip" => Ok(Self::Skip),
			"overwrite" => Ok(Self::Overwrite),
			"rename" => Ok(Self::Rename),
			"backup" => Ok(Self::Backup),
			_ => Err(format!(
				"unknown conflict resolution: {}. valid options: ask, skip, overwrite, rename, backup",
				s
			)),
		}
	}
}

impl std::fmt::Display for ConflictResolution {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Ask => write!(f, "ask"),
			Self::Skip => write!(f, "skip"),
			Self::Overwrite => write!(f, "overwrite"),
			Self::Rename => write!(f, "rename"),
			Self::Backup => write!(f, "backup"),
		}
	}
}

impl ConflictResolution {
	/// Whether this strategy can be applied without prompting a caller.
	pub fn is_automatic(&self) -> bool {
		!matches!(self, Self::Ask)
	}
}

/// Which configuration layer a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingSource {
	TypeDefault,
	Global,
	Project,
	Environment,
}

impl std::fmt::Display for SettingSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::TypeDefault => write!(f, "type_default"),
			Self::Global => write!(f, "global"),
			Self::Project => write!(f, "project"),
			Self::Environment => write!(f, "environment"),
		}
	}
}

/// Classification of an adapter-layer I/O error for the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
	/// Network timeout, connection reset, HTTP 5xx, FTP 4xx: eligible for retry
	Transient,
	/// Auth failure, 404, 416-as-complete: never retried
	Permanent,
}

impl RetryClass {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_all_conflict_resolutions() {
		for (s, expected) in [
			("ask", ConflictResolution::Ask),
			("SKIP", ConflictResolution::Skip),
			("overwrite", ConflictResolution::Overwrite),
			("rename", ConflictResolution::Rename),
			("backup", ConflictResolution::Backup),
		] {
			assert_eq!(ConflictResolution::from_str(s).unwrap(), expected);
		}
	}

	#[test]
	fn rejects_unknown_resolution() {
		assert!(ConflictResolution::from_str("merge").is_err());
	}

	#[test]
	fn only_ask_is_non_automatic() {
		assert!(!ConflictResolution::Ask.is_automatic());
		assert!(ConflictResolution::Skip.is_automatic());
		assert!(ConflictResolution::Rename.is_automatic());
	}
}
