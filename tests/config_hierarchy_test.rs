//! Integration tests for layered config resolution: type defaults -> global
//! -> project -> environment, with per-key provenance.

use docbro::config::{ConfigResolver, ProjectConfig};
use docbro::strategies::SettingSource;
use docbro::types::ProjectType;
use tempfile::tempdir;

#[test]
fn global_defaults_are_seeded_on_first_read() {
	let config_dir = tempdir().unwrap();
	let resolver = ConfigResolver::new(config_dir.path());

	let global = resolver.get_global().unwrap();
	assert_eq!(global.max_file_size, 10 * 1024 * 1024);
	assert!(config_dir.path().join("settings.yaml").exists());
}

#[test]
fn project_overrides_take_precedence_over_global() {
	let config_dir = tempdir().unwrap();
	let data_dir = tempdir().unwrap();
	let resolver = ConfigResolver::new(config_dir.path());

	let mut global = ProjectConfig::default();
	global.max_file_size = 5_000_000;
	resolver.update_global(global).unwrap();

	let project_dir = data_dir.path().join("projects").join("docs");
	std::fs::create_dir_all(&project_dir).unwrap();
	std::fs::write(project_dir.join("settings.yaml"), "maxFileSize: 1000\n").unwrap();

	let summary = resolver.get_project(data_dir.path(), "docs", ProjectType::Storage).unwrap();
	assert_eq!(summary.effective.max_file_size, 1000);
	assert_eq!(summary.sources.get("max_file_size"), Some(&SettingSource::Project));
}

#[test]
fn environment_overrides_win_over_everything() {
	let config_dir = tempdir().unwrap();
	let data_dir = tempdir().unwrap();
	let resolver = ConfigResolver::new(config_dir.path());

	std::env::set_var("DOCBRO_PROJECT_DOCS_MAX_FILE_SIZE", "42");
	let summary = resolver.get_project(data_dir.path(), "docs", ProjectType::Storage).unwrap();
	std::env::remove_var("DOCBRO_PROJECT_DOCS_MAX_FILE_SIZE");

	assert_eq!(summary.effective.max_file_size, 42);
	assert_eq!(summary.sources.get("max_file_size"), Some(&SettingSource::Environment));
}

#[test]
fn update_global_invalidates_cache() {
	let config_dir = tempdir().unwrap();
	let resolver = ConfigResolver::new(config_dir.path());

	let first = resolver.get_global().unwrap();
	assert_eq!(first.max_file_size, 10 * 1024 * 1024);

	let mut changed = first.clone();
	changed.max_file_size = 99;
	resolver.update_global(changed).unwrap();

	let second = resolver.get_global().unwrap();
	assert_eq!(second.max_file_size, 99);
}

#[test]
fn settings_outside_a_types_surface_are_reported_not_rejected() {
	let config_dir = tempdir().unwrap();
	let data_dir = tempdir().unwrap();
	let resolver = ConfigResolver::new(config_dir.path());

	let project_dir = data_dir.path().join("projects").join("crawl");
	std::fs::create_dir_all(&project_dir).unwrap();
	std::fs::write(project_dir.join("settings.yaml"), "chunkSize: 500\n").unwrap();

	let summary = resolver.get_project(data_dir.path(), "crawl", ProjectType::Crawling).unwrap();
	assert!(!summary.warnings.is_empty());
}
