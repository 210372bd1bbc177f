//! Per-type settings validation.

use super::ProjectConfig;
use crate::types::ProjectType;

/// Result of validating a merged `ProjectConfig` against a project type.
/// Errors make the settings unacceptable; warnings are informational
/// (incompatible cross-type settings, below-recommended values).
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
}

impl ValidationOutcome {
	pub fn is_valid(&self) -> bool {
		self.errors.is_empty()
	}
}

/// Standalone range check: `max_file_size` must be 1 byte .. 1 GiB.
pub fn validate_max_file_size(size: u64) -> Result<(), String> {
	if size == 0 {
		return Err("max_file_size must be greater than 0".to_string());
	}
	if size > 1024 * 1024 * 1024 {
		return Err(format!("max_file_size {} exceeds maximum of 1 GiB", size));
	}
	Ok(())
}

/// Standalone range check: `crawl_depth` must be 1..=10.
pub fn validate_crawl_depth(depth: u32) -> Result<(), String> {
	if !(1..=10).contains(&depth) {
		return Err(format!("crawl_depth {} must be between 1 and 10", depth));
	}
	Ok(())
}

/// Standalone range check: `rate_limit` must be in (0, 100].
pub fn validate_rate_limit(rate: f64) -> Result<(), String> {
	if !(rate > 0.0 && rate <= 100.0) {
		return Err(format!("rate_limit {} must be greater than 0 and at most 100", rate));
	}
	Ok(())
}

/// Standalone range check: `chunk_size` must be 100..=2000.
pub fn validate_chunk_size(size: u32) -> Result<(), String> {
	if !(100..=2000).contains(&size) {
		return Err(format!("chunk_size {} must be between 100 and 2000", size));
	}
	Ok(())
}

/// Standalone range check: `concurrent_uploads` must be 1..=10.
pub fn validate_concurrent_uploads(n: u32) -> Result<(), String> {
	if !(1..=10).contains(&n) {
		return Err(format!("concurrent_uploads {} must be between 1 and 10", n));
	}
	Ok(())
}

/// Standalone range check: `retry_attempts` must be 0..=10.
pub fn validate_retry_attempts(n: u32) -> Result<(), String> {
	if n > 10 {
		return Err(format!("retry_attempts {} must be at most 10", n));
	}
	Ok(())
}

/// Standalone range check: `timeout_seconds` must be 1..=3600.
pub fn validate_timeout_seconds(n: u32) -> Result<(), String> {
	if !(1..=3600).contains(&n) {
		return Err(format!("timeout_seconds {} must be between 1 and 3600", n));
	}
	Ok(())
}

/// Validates the merged effective configuration for a project type. Settings
/// belonging to a non-matching type surface are reported as warnings, never
/// as errors; this is a pure function of `(config, type)`.
pub fn validate_settings(config: &ProjectConfig, project_type: ProjectType) -> ValidationOutcome {
	let mut out = ValidationOutcome::default();

	if let Err(e) = validate_max_file_size(config.max_file_size) {
		out.errors.push(e);
	}
	if let Some(n) = config.concurrent_uploads {
		if let Err(e) = validate_concurrent_uploads(n) {
			out.errors.push(e);
		}
	}
	if let Some(n) = config.retry_attempts {
		if let Err(e) = validate_retry_attempts(n) {
			out.errors.push(e);
		}
	}
	if let Some(n) = config.timeout_seconds {
		if let Err(e) = validate_timeout_seconds(n) {
			out.errors.push(e);
		}
	}

	match project_type {
		ProjectType::Crawling => {
			match config.crawl_depth {
				Some(d) => {
					if let Err(e) = validate_crawl_depth(d) {
						out.errors.push(e);
					}
				}
				None => out.errors.push("crawling projects require crawl_depth".to_string()),
			}
			match config.rate_limit {
				Some(r) => {
					if let Err(e) = validate_rate_limit(r) {
						out.errors.push(e);
					}
				}
				None => out.errors.push("crawling projects require rate_limit".to_string()),
			}
			if !config.allowed_formats.iter().any(|f| f == "*" || f == "html") {
				out.warnings.push("crawling projects should allow the 'html' format".to_string());
			}
			check_incompatible(config, project_type, &mut out.warnings);
		}
		ProjectType::Data => {
			match config.chunk_size {
				Some(size) => {
					if let Err(e) = validate_chunk_size(size) {
						out.errors.push(e);
					}
					if let Some(overlap) = config.chunk_overlap {
						if overlap as u32 >= size {
							out.errors.push(format!("chunk_overlap {} must be less than chunk_size {}", overlap, size));
						}
					}
				}
				None => out.errors.push("data projects require chunk_size".to_string()),
			}
			if config.embedding_model.as_deref().unwrap_or("").is_empty() {
				out.errors.push("data projects require a non-empty embedding_model".to_string());
			}
			let document_formats = ["md", "txt", "html", "json", "pdf", "docx", "*"];
			if !config.allowed_formats.iter().any(|f| document_formats.contains(&f.as_str())) {
				out.errors.push("data projects require at least one document-capable format".to_string());
			}
			check_incompatible(config, project_type, &mut out.warnings);
		}
		ProjectType::Storage => {
			if config.allowed_formats.is_empty() {
				out.errors.push("storage projects require a non-empty format list".to_string());
			}
			if config.max_file_size < 1024 * 1024 {
				out.warnings.push("max_file_size below 1 MiB is unusually low for storage projects".to_string());
			}
			check_incompatible(config, project_type, &mut out.warnings);
		}
	}

	out
}

fn check_incompatible(config: &ProjectConfig, project_type: ProjectType, warnings: &mut Vec<String>) {
	let crawling_only = config.crawl_depth.is_some() || config.rate_limit.is_some() || config.user_agent.is_some();
	let data_only = config.chunk_size.is_some() || config.embedding_model.is_some();
	let storage_only = config.enable_compression.is_some() || config.auto_tagging.is_some();

	if project_type != ProjectType::Crawling && crawling_only {
		warnings.push("crawling-only settings are present but incompatible with this project type".to_string());
	}
	if project_type != ProjectType::Data && data_only {
		warnings.push("data-only settings are present but incompatible with this project type".to_string());
	}
	if project_type != ProjectType::Storage && storage_only {
		warnings.push("storage-only settings are present but incompatible with this project type".to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_zero_max_file_size() {
		assert!(validate_max_file_size(0).is_err());
	}

	#[test]
	fn rejects_oversized_max_file_size() {
		assert!(validate_max_file_size(2 * 1024 * 1024 * 1024).is_err());
	}

	#[test]
	fn data_requires_embedding_model() {
		let mut cfg = ProjectConfig::type_defaults(ProjectType::Data);
		cfg.embedding_model = None;
		let outcome = validate_settings(&cfg, ProjectType::Data);
		assert!(!outcome.is_valid());
	}

	#[test]
	fn chunk_overlap_must_be_smaller_than_chunk_size() {
		let mut cfg = ProjectConfig::type_defaults(ProjectType::Data);
		cfg.chunk_size = Some(100);
		cfg.chunk_overlap = Some(100);
		let outcome = validate_settings(&cfg, ProjectType::Data);
		assert!(!outcome.is_valid());
	}

	#[test]
	fn crawling_type_defaults_are_valid() {
		let cfg = ProjectConfig::type_defaults(ProjectType::Crawling);
		let outcome = validate_settings(&cfg, ProjectType::Crawling);
		assert!(outcome.is_valid(), "{:?}", outcome.errors);
	}

	#[test]
	fn cross_type_settings_warn_not_error() {
		let mut cfg = ProjectConfig::type_defaults(ProjectType::Storage);
		cfg.chunk_size = Some(500);
		let outcome = validate_settings(&cfg, ProjectType::Storage);
		assert!(outcome.is_valid());
		assert!(!outcome.warnings.is_empty());
	}
}
