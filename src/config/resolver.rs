//! Layered settings resolution: type defaults -> global -> project -> environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

use super::{validate_settings, ConfigError, EnvConfigHandler, ProjectConfig, Provenance};
use crate::strategies::SettingSource;
use crate::types::ProjectType;

/// Effective settings for a project plus per-key provenance.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
	pub effective: ProjectConfig,
	pub sources: Provenance,
	pub warnings: Vec<String>,
}

/// Resolves, persists, and validates project configuration.
///
/// The global defaults file is lazily loaded and cached; `update_global`
/// invalidates the cache. Per-project override files are read fresh on
/// every call since they are expected to be small and infrequently read
/// compared to the global file.
pub struct ConfigResolver {
	config_dir: PathBuf,
	global_cache: RwLock<Option<ProjectConfig>>,
}

impl ConfigResolver {
	pub fn new(config_dir: impl Into<PathBuf>) -> Self {
		ConfigResolver { config_dir: config_dir.into(), global_cache: RwLock::new(None) }
	}

	fn global_path(&self) -> PathBuf {
		self.config_dir.join("settings.yaml")
	}

	fn project_path(&self, data_dir: &Path, name: &str) -> PathBuf {
		data_dir.join("projects").join(name).join("settings.yaml")
	}

	/// Loads the global defaults file, seeding it with documented values on
	/// first use, and caches the result until the next `update_global`.
	pub fn get_global(&self) -> Result<ProjectConfig, ConfigError> {
		if let Some(cached) = self.global_cache.read().unwrap().as_ref() {
			return Ok(cached.clone());
		}

		let path = self.global_path();
		let cfg = if path.exists() {
			let text = std::fs::read_to_string(&path)?;
			serde_yaml::from_str(&text)?
		} else {
			let seed = ProjectConfig::default();
			self.write_yaml(&path, &seed)?;
			info!("seeded global config defaults at {}", path.display());
			seed
		};

		*self.global_cache.write().unwrap() = Some(cfg.clone());
		Ok(cfg)
	}

	/// Replaces the global defaults file and invalidates the cache.
	pub fn update_global(&self, settings: ProjectConfig) -> Result<(), ConfigError> {
		self.write_yaml(&self.global_path(), &settings)?;
		*self.global_cache.write().unwrap() = None;
		Ok(())
	}

	/// Resolves effective settings for a project: type defaults -> global ->
	/// project overrides -> environment overrides, each layer overlaying the
	/// previous. Returns a summary with per-key provenance and validation
	/// warnings; does not fail on warnings, only on hard validation errors
	/// when the caller asks via [`ConfigResolver::validate`].
	pub fn get_project(&self, data_dir: &Path, name: &str, project_type: ProjectType) -> Result<ConfigSummary, ConfigError> {
		let mut sources: Provenance = HashMap::new();

		let type_defaults = ProjectConfig::type_defaults(project_type);
		mark_all(&type_defaults, SettingSource::TypeDefault, &mut sources);

		let global = self.get_global()?;
		let mut effective = type_defaults.merge(global.clone());
		mark_overridden(&global, SettingSource::Global, &mut sources);

		let project_path = self.project_path(data_dir, name);
		if project_path.exists() {
			let text = std::fs::read_to_string(&project_path)?;
			let project_overrides: ProjectConfig = serde_yaml::from_str(&text)?;
			mark_overridden(&project_overrides, SettingSource::Project, &mut sources);
			effective = effective.merge(project_overrides);
		}

		let env_overrides = EnvConfigHandler::env_overrides(name);
		if !env_overrides.is_empty() {
			// `env_overrides` is keyed by the `ProjectConfig` field names
			// (snake_case); the struct itself is `rename_all = "camelCase"`
			// on the wire, so the keys have to be converted before a JSON
			// round-trip will land them on the right field instead of `extra`.
			let camel: serde_json::Map<String, serde_json::Value> =
				env_overrides.iter().map(|(k, v)| (to_camel_case(k), v.clone())).collect();
			let env_cfg: ProjectConfig = serde_json::from_value(serde_json::Value::Object(camel)).unwrap_or_default();
			for key in env_overrides.keys() {
				sources.insert(key.clone(), SettingSource::Environment);
			}
			effective = effective.merge(env_cfg);
		}

		let outcome = validate_settings(&effective, project_type);

		debug!("resolved config for project '{}': {} warnings", name, outcome.warnings.len());

		Ok(ConfigSummary { effective, sources, warnings: outcome.warnings })
	}

	/// Validates a merged config and returns `Err` with joined reasons on failure.
	pub fn validate(&self, config: &ProjectConfig, project_type: ProjectType) -> Result<Vec<String>, ConfigError> {
		let outcome = validate_settings(config, project_type);
		if outcome.is_valid() {
			Ok(outcome.warnings)
		} else {
			Err(ConfigError::Invalid { reasons: outcome.errors })
		}
	}

	/// Validates `partial` merged onto the currently resolved config and
	/// persists it as the project's override file only if valid; on failure
	/// the persisted state is left unchanged.
	pub fn update_project(
		&self,
		data_dir: &Path,
		name: &str,
		project_type: ProjectType,
		partial: ProjectConfig,
	) -> Result<ConfigSummary, ConfigError> {
		let current = self.get_project(data_dir, name, project_type)?;
		let merged = current.effective.merge(partial.clone());
		self.validate(&merged, project_type)?;

		let project_path = self.project_path(data_dir, name);
		let existing_overrides = self.read_project_overrides(&project_path)?;
		let new_overrides = existing_overrides.merge(partial);
		self.write_yaml(&project_path, &new_overrides)?;

		self.get_project(data_dir, name, project_type)
	}

	/// Removes the project's override file, reverting to global+type defaults.
	pub fn reset_project(&self, data_dir: &Path, name: &str, project_type: ProjectType) -> Result<ConfigSummary, ConfigError> {
		let project_path = self.project_path(data_dir, name);
		if project_path.exists() {
			std::fs::remove_file(&project_path)?;
		}
		self.get_project(data_dir, name, project_type)
	}

	/// Serializes the project's effective settings as YAML or JSON.
	pub fn export(&self, data_dir: &Path, name: &str, project_type: ProjectType, as_json: bool) -> Result<String, ConfigError> {
		let summary = self.get_project(data_dir, name, project_type)?;
		if as_json {
			Ok(serde_json::to_string_pretty(&summary.effective)?)
		} else {
			Ok(serde_yaml::to_string(&summary.effective)?)
		}
	}

	/// Parses `text` as YAML or JSON and applies it as a project override,
	/// optionally merging onto existing overrides instead of replacing them.
	pub fn import(
		&self,
		data_dir: &Path,
		name: &str,
		project_type: ProjectType,
		text: &str,
		as_json: bool,
		merge: bool,
	) -> Result<ConfigSummary, ConfigError> {
		let parsed: ProjectConfig = if as_json {
			serde_json::from_str(text)?
		} else {
			serde_yaml::from_str(text)?
		};

		let project_path = self.project_path(data_dir, name);
		let to_write = if merge {
			self.read_project_overrides(&project_path)?.merge(parsed)
		} else {
			parsed
		};

		let merged_for_validation = self.get_project(data_dir, name, project_type)?.effective.merge(to_write.clone());
		self.validate(&merged_for_validation, project_type)?;

		self.write_yaml(&project_path, &to_write)?;
		self.get_project(data_dir, name, project_type)
	}

	fn read_project_overrides(&self, path: &Path) -> Result<ProjectConfig, ConfigError> {
		if path.exists() {
			let text = std::fs::read_to_string(path)?;
			Ok(serde_yaml::from_str(&text)?)
		} else {
			Ok(ProjectConfig { max_file_size: 0, allowed_formats: Vec::new(), ..ProjectConfig::default() })
		}
	}

	fn write_yaml(&self, path: &Path, config: &ProjectConfig) -> Result<(), ConfigError> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let text = serde_yaml::to_string(config)?;
		std::fs::write(path, text)?;
		Ok(())
	}
}

/// Marks every `Some`/non-empty field present in `config` as having been
/// set by `source`. Shared by the type-defaults layer (every field
/// `type_defaults` actually sets) and the override layers (every field
/// present in that layer), so provenance reflects the dominating layer
/// exactly rather than a hardcoded subset of fields.
fn mark_present(config: &ProjectConfig, source: SettingSource, sources: &mut Provenance) {
	if config.max_file_size != 0 {
		sources.insert("max_file_size".to_string(), source);
	}
	if !config.allowed_formats.is_empty() {
		sources.insert("allowed_formats".to_string(), source);
	}
	macro_rules! mark_opt {
		($field:ident) => {
			if config.$field.is_some() {
				sources.insert(stringify!($field).to_string(), source);
			}
		};
	}
	mark_opt!(concurrent_uploads);
	mark_opt!(retry_attempts);
	mark_opt!(timeout_seconds);
	mark_opt!(crawl_depth);
	mark_opt!(rate_limit);
	mark_opt!(user_agent);
	mark_opt!(follow_redirects);
	mark_opt!(respect_robots_txt);
	mark_opt!(chunk_size);
	mark_opt!(chunk_overlap);
	mark_opt!(embedding_model);
	mark_opt!(vector_store_type);
	mark_opt!(enable_compression);
	mark_opt!(auto_tagging);
	mark_opt!(full_text_indexing);
	mark_opt!(storage_encryption);
}

fn mark_all(config: &ProjectConfig, source: SettingSource, sources: &mut Provenance) {
	mark_present(config, source, sources);
}

/// Marks only the fields present in an override layer, so provenance
/// reflects the dominating layer.
fn mark_overridden(config: &ProjectConfig, source: SettingSource, sources: &mut Provenance) {
	mark_present(config, source, sources);
}

/// Converts a `ProjectConfig` field name (snake_case) to the camelCase key
/// the struct's `#[serde(rename_all = "camelCase")]` expects on the wire.
fn to_camel_case(snake: &str) -> String {
	let mut parts = snake.split('_');
	let mut out = parts.next().unwrap_or_default().to_string();
	for part in parts {
		let mut chars = part.chars();
		if let Some(first) = chars.next() {
			out.push(first.to_ascii_uppercase());
			out.push_str(chars.as_str());
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn resolver(config_dir: &Path) -> ConfigResolver {
		ConfigResolver::new(config_dir)
	}

	#[test]
	fn seeds_global_defaults_on_first_read() {
		let config_dir = tempdir().unwrap();
		let resolver = resolver(config_dir.path());
		let global = resolver.get_global().unwrap();
		assert_eq!(global.max_file_size, ProjectConfig::default().max_file_size);
		assert!(config_dir.path().join("settings.yaml").exists());
	}

	#[test]
	fn project_overrides_beat_global() {
		let config_dir = tempdir().unwrap();
		let data_dir = tempdir().unwrap();
		let resolver = resolver(config_dir.path());

		resolver
			.update_project(
				data_dir.path(),
				"kb",
				ProjectType::Data,
				ProjectConfig { chunk_size: Some(750), ..ProjectConfig { max_file_size: 0, allowed_formats: vec![], ..ProjectConfig::default() } },
			)
			.unwrap();

		let summary = resolver.get_project(data_dir.path(), "kb", ProjectType::Data).unwrap();
		assert_eq!(summary.effective.chunk_size, Some(750));
		assert_eq!(summary.sources.get("chunk_size"), Some(&SettingSource::Project));
	}

	#[test]
	fn reset_reverts_to_global_and_type_defaults() {
		let config_dir = tempdir().unwrap();
		let data_dir = tempdir().unwrap();
		let resolver = resolver(config_dir.path());

		resolver
			.update_project(
				data_dir.path(),
				"kb",
				ProjectType::Data,
				ProjectConfig { chunk_size: Some(750), ..ProjectConfig { max_file_size: 0, allowed_formats: vec![], ..ProjectConfig::default() } },
			)
			.unwrap();
		resolver.reset_project(data_dir.path(), "kb", ProjectType::Data).unwrap();

		let summary = resolver.get_project(data_dir.path(), "kb", ProjectType::Data).unwrap();
		assert_eq!(summary.effective.chunk_size, ProjectConfig::type_defaults(ProjectType::Data).chunk_size);
	}

	#[test]
	fn update_rejects_invalid_merge_without_persisting() {
		let config_dir = tempdir().unwrap();
		let data_dir = tempdir().unwrap();
		let resolver = resolver(config_dir.path());

		let result = resolver.update_project(
			data_dir.path(),
			"kb",
			ProjectType::Data,
			ProjectConfig { chunk_size: Some(5), ..ProjectConfig { max_file_size: 0, allowed_formats: vec![], ..ProjectConfig::default() } },
		);
		assert!(result.is_err());

		let summary = resolver.get_project(data_dir.path(), "kb", ProjectType::Data).unwrap();
		assert_eq!(summary.effective.chunk_size, ProjectConfig::type_defaults(ProjectType::Data).chunk_size);
	}

	#[test]
	fn export_import_round_trip() {
		let config_dir = tempdir().unwrap();
		let data_dir = tempdir().unwrap();
		let resolver = resolver(config_dir.path());

		let yaml = resolver.export(data_dir.path(), "kb", ProjectType::Data, false).unwrap();
		resolver.import(data_dir.path(), "kb2", ProjectType::Data, &yaml, false, false).unwrap();

		let a = resolver.get_project(data_dir.path(), "kb", ProjectType::Data).unwrap();
		let b = resolver.get_project(data_dir.path(), "kb2", ProjectType::Data).unwrap();
		assert_eq!(a.effective.chunk_size, b.effective.chunk_size);
	}
}
