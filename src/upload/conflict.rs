//! Destination-name conflict resolution for an incoming upload file.

use std::path::Path;

use crate::strategies::ConflictResolution;

/// Outcome of resolving one destination-name conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictOutcome {
	/// Write at the original destination path.
	Proceed,
	/// Skip this file; counts toward `files_skipped`.
	Skip,
	/// Write at this alternate path instead.
	WriteTo(String),
	/// Archive the file currently at `dest`, then write the new one there.
	/// Distinct from `Proceed`: the caller must copy the existing file into
	/// the project's archive directory before overwriting it.
	BackupAndProceed,
}

/// Applies a project's conflict strategy to one destination path that
/// already exists. `existing` must report whether a path under the
/// project's storage root is occupied.
pub struct ConflictResolver {
	strategy: ConflictResolution,
}

impl ConflictResolver {
	pub fn new(strategy: ConflictResolution) -> Self {
		ConflictResolver { strategy }
	}

	/// Resolves a conflict for `dest` given an existence predicate. `Ask`
	/// without an override is reported as a conflict requiring external
	/// input and resolved as if `Skip` had been chosen, matching the
	/// pipeline's no-interactive-prompt design.
	pub fn resolve(&self, dest: &str, existing: impl Fn(&str) -> bool, strategy_override: Option<ConflictResolution>) -> ConflictOutcome {
		if !existing(dest) {
			return ConflictOutcome::Proceed;
		}

		match strategy_override.unwrap_or(self.strategy) {
			ConflictResolution::Ask | ConflictResolution::Skip => ConflictOutcome::Skip,
			ConflictResolution::Overwrite => ConflictOutcome::Proceed,
			ConflictResolution::Backup => ConflictOutcome::BackupAndProceed,
			ConflictResolution::Rename => ConflictOutcome::WriteTo(smallest_unused_rename(dest, &existing)),
		}
	}
}

/// Produces `stem_<n>.ext` for the smallest unused `n >= 1`, per the
/// documented conflict-rename scheme (`doc_<n>.pdf`-style).
fn smallest_unused_rename(dest: &str, existing: &impl Fn(&str) -> bool) -> String {
	let path = Path::new(dest);
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
	let ext = path.extension().and_then(|e| e.to_str());
	let parent = path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();

	let mut n = 1u32;
	loop {
		let candidate_name = match ext {
			Some(ext) => format!("{}_{}.{}", stem, n, ext),
			None => format!("{}_{}", stem, n),
		};
		let candidate = if parent.is_empty() { candidate_name } else { format!("{}/{}", parent, candidate_name) };
		if !existing(&candidate) {
			return candidate;
		}
		n += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn proceeds_when_no_conflict() {
		let resolver = ConflictResolver::new(ConflictResolution::Skip);
		let outcome = resolver.resolve("doc.pdf", |_| false, None);
		assert_eq!(outcome, ConflictOutcome::Proceed);
	}

	#[test]
	fn skip_strategy_skips_on_conflict() {
		let resolver = ConflictResolver::new(ConflictResolution::Skip);
		let outcome = resolver.resolve("doc.pdf", |p| p == "doc.pdf", None);
		assert_eq!(outcome, ConflictOutcome::Skip);
	}

	#[test]
	fn overwrite_strategy_proceeds_on_conflict() {
		let resolver = ConflictResolver::new(ConflictResolution::Overwrite);
		let outcome = resolver.resolve("doc.pdf", |p| p == "doc.pdf", None);
		assert_eq!(outcome, ConflictOutcome::Proceed);
	}

	#[test]
	fn backup_strategy_is_distinct_from_overwrite() {
		let resolver = ConflictResolver::new(ConflictResolution::Backup);
		let outcome = resolver.resolve("doc.pdf", |p| p == "doc.pdf", None);
		assert_eq!(outcome, ConflictOutcome::BackupAndProceed);
	}

	#[test]
	fn rename_picks_smallest_unused_suffix() {
		let taken: HashSet<&str> = ["doc.pdf", "doc_1.pdf", "doc_2.pdf"].into_iter().collect();
		let resolver = ConflictResolver::new(ConflictResolution::Rename);
		let outcome = resolver.resolve("doc.pdf", |p| taken.contains(p), None);
		assert_eq!(outcome, ConflictOutcome::WriteTo("doc_3.pdf".to_string()));
	}

	#[test]
	fn override_takes_priority_over_default_strategy() {
		let resolver = ConflictResolver::new(ConflictResolution::Overwrite);
		let outcome = resolver.resolve("doc.pdf", |p| p == "doc.pdf", Some(ConflictResolution::Skip));
		assert_eq!(outcome, ConflictOutcome::Skip);
	}
}
