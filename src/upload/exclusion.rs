//! Glob-based enumeration filtering for upload sources.

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

#[derive(Debug)]
pub struct ExclusionError(pub String);

impl fmt::Display for ExclusionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid exclusion pattern: {}", self.0)
	}
}

impl std::error::Error for ExclusionError {}

/// Matches enumerated source paths against a project's `exclude_patterns`
/// plus a fixed always-excluded set covering DocBro's own state and common
/// filesystem/editor cruft.
pub struct PatternMatcher {
	exclude_set: GlobSet,
	always_exclude: GlobSet,
}

impl PatternMatcher {
	pub fn new(exclude_patterns: &[String]) -> Result<Self, ExclusionError> {
		let always_exclude = Self::build_glob_set(&[
			".docbro/**".to_string(),
			"**/*.docbro-tmp".to_string(),
			"**/.DS_Store".to_string(),
			"**/Thumbs.db".to_string(),
			"**/desktop.ini".to_string(),
			"**/*.swp".to_string(),
			"**/*~".to_string(),
		])?;
		let exclude_set = Self::build_glob_set(exclude_patterns)?;
		Ok(PatternMatcher { exclude_set, always_exclude })
	}

	fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ExclusionError> {
		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			let glob = Glob::new(pattern).map_err(|e| ExclusionError(format!("{}: {}", pattern, e)))?;
			builder.add(glob);
		}
		builder.build().map_err(|e| ExclusionError(e.to_string()))
	}

	pub fn is_excluded(&self, path: &Path) -> bool {
		self.always_exclude.is_match(path) || self.exclude_set.is_match(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_user_patterns() {
		let matcher = PatternMatcher::new(&["*.log".to_string(), "node_modules/**".to_string()]).unwrap();
		assert!(matcher.is_excluded(Path::new("debug.log")));
		assert!(matcher.is_excluded(Path::new("node_modules/pkg/index.js")));
		assert!(!matcher.is_excluded(Path::new("readme.md")));
	}

	#[test]
	fn always_excludes_own_state_dir() {
		let matcher = PatternMatcher::new(&[]).unwrap();
		assert!(matcher.is_excluded(Path::new(".docbro/state.db")));
		assert!(matcher.is_excluded(Path::new("foo/.DS_Store")));
	}
}
