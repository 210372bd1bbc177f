//! Thin binary: CLI flags, tracing init, and the JSON-RPC stdio transport.
//! All domain logic lives in the library; this wires it together.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use docbro::config::ProjectConfig;
use docbro::manager::ProjectManager;
use docbro::rpc::capabilities::ServerCapabilities;
use docbro::rpc::{RpcError, RpcErrorCode, Router};
use docbro::types::{ProjectStatus, ProjectType};
use docbro::upload::manager::{CancellationToken, UploadManager};

const SERVER_NAME: &str = "docbro";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "docbro", about = "Typed-project ingestion and documentation platform core")]
struct Cli {
	/// Directory holding project data, registries, and per-project databases.
	#[arg(long, global = true, default_value = "~/.local/share/docbro")]
	data_dir: String,

	/// Directory holding global and per-project configuration files.
	#[arg(long, global = true, default_value = "~/.config/docbro")]
	config_dir: String,

	/// Log level passed through to `DOCBRO_LOG` if that env var is unset.
	#[arg(long, global = true, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Runs the JSON-RPC core over stdio, one newline-delimited message per line.
	Serve,
}

fn expand_home(path: &str) -> PathBuf {
	if let Some(rest) = path.strip_prefix("~/") {
		if let Some(home) = dirs::home_dir() {
			return home.join(rest);
		}
	}
	PathBuf::from(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();
	if std::env::var("DOCBRO_LOG").is_err() && std::env::var("RUST_LOG").is_err() {
		std::env::set_var("DOCBRO_LOG", &cli.log_level);
	}
	docbro::logging::init();

	let data_dir = expand_home(&cli.data_dir);
	let config_dir = expand_home(&cli.config_dir);

	match cli.command {
		Commands::Serve => serve_stdio(data_dir, config_dir).await,
	}
}

async fn serve_stdio(data_dir: PathBuf, config_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
	let manager = Arc::new(ProjectManager::new(&data_dir, &config_dir)?);
	let uploads = Arc::new(UploadManager::new(&data_dir, &config_dir));

	let router = Router::new(SERVER_NAME, SERVER_VERSION, ServerCapabilities::default_admin());
	register_project_methods(&router, manager.clone());
	register_upload_methods(&router, manager.clone(), uploads);
	let router = Arc::new(router);

	info!("docbro serving JSON-RPC over stdio (data_dir={}, config_dir={})", data_dir.display(), config_dir.display());

	let stdin = tokio::io::stdin();
	let mut lines = BufReader::new(stdin).lines();
	let mut stdout = tokio::io::stdout();

	while let Some(line) = lines.next_line().await? {
		if line.trim().is_empty() {
			continue;
		}
		let response = docbro::rpc::transport_http::handle_post_body(&router, line.as_bytes()).await;
		if response.is_empty() {
			continue;
		}
		stdout.write_all(&response).await?;
		stdout.write_all(b"\n").await?;
		stdout.flush().await?;
	}
	Ok(())
}

fn invalid_params(message: impl Into<String>) -> RpcError {
	RpcError::new(RpcErrorCode::InvalidParams, message.into())
}

fn register_project_methods(router: &Router, manager: Arc<ProjectManager>) {
	{
		let manager = manager.clone();
		router.register_method("projects.create", move |params: Value| {
			let manager = manager.clone();
			async move {
				let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("'name' is required"))?;
				let project_type: ProjectType = params
					.get("type")
					.and_then(Value::as_str)
					.ok_or_else(|| invalid_params("'type' is required"))
					.and_then(|s| serde_json::from_value(json!(s)).map_err(|e| invalid_params(e.to_string())))?;
				let force = params.get("force").and_then(Value::as_bool).unwrap_or(false);
				let settings: Option<ProjectConfig> = match params.get("settings") {
					Some(v) if !v.is_null() => Some(serde_json::from_value(v.clone()).map_err(|e| invalid_params(e.to_string()))?),
					_ => None,
				};
				let project = manager.create(name, project_type, settings, force).await.map_err(RpcError::from)?;
				serde_json::to_value(project).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
			}
		});
	}

	{
		let manager = manager.clone();
		router.register_method("projects.get", move |params: Value| {
			let manager = manager.clone();
			async move {
				let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("'name' is required"))?;
				let project = manager.get(name).map_err(RpcError::from)?;
				serde_json::to_value(project).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
			}
		});
	}

	{
		let manager = manager.clone();
		router.register_method("projects.list", move |params: Value| {
			let manager = manager.clone();
			async move {
				let status: Option<ProjectStatus> = params
					.get("status")
					.filter(|v| !v.is_null())
					.map(|v| serde_json::from_value(v.clone()))
					.transpose()
					.map_err(|e: serde_json::Error| invalid_params(e.to_string()))?;
				let project_type: Option<ProjectType> = params
					.get("type")
					.filter(|v| !v.is_null())
					.map(|v| serde_json::from_value(v.clone()))
					.transpose()
					.map_err(|e: serde_json::Error| invalid_params(e.to_string()))?;
				let limit = params.get("limit").and_then(Value::as_u64).map(|n| n as u32);
				let projects = manager.list(status, project_type, limit).map_err(RpcError::from)?;
				serde_json::to_value(projects).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
			}
		});
	}

	{
		let manager = manager.clone();
		router.register_method("projects.remove", move |params: Value| {
			let manager = manager.clone();
			async move {
				let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("'name' is required"))?;
				let backup = params.get("backup").and_then(Value::as_bool).unwrap_or(false);
				let force = params.get("force").and_then(Value::as_bool).unwrap_or(false);
				manager.remove(name, backup, force).await.map_err(RpcError::from)?;
				Ok(json!({"removed": name}))
			}
		});
	}

	router.register_method("projects.stats", move |params: Value| {
		let manager = manager.clone();
		async move {
			let name = params.get("name").and_then(Value::as_str).ok_or_else(|| invalid_params("'name' is required"))?;
			let stats = manager.get_project_stats(name).await.map_err(RpcError::from)?;
			serde_json::to_value(stats).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
		}
	});
}

fn register_upload_methods(router: &Router, manager: Arc<ProjectManager>, uploads: Arc<UploadManager>) {
	router.register_method("uploads.start", move |params: Value| {
		let manager = manager.clone();
		let uploads = uploads.clone();
		async move {
			let project_name = params.get("project").and_then(Value::as_str).ok_or_else(|| invalid_params("'project' is required"))?;
			let source: docbro::types::UploadSource =
				serde_json::from_value(params.get("source").cloned().ok_or_else(|| invalid_params("'source' is required"))?)
					.map_err(|e| invalid_params(e.to_string()))?;
			let conflict: docbro::types::ConflictResolution = params
				.get("conflict_resolution")
				.filter(|v| !v.is_null())
				.map(|v| serde_json::from_value(v.clone()))
				.transpose()
				.map_err(|e: serde_json::Error| invalid_params(e.to_string()))?
				.unwrap_or(docbro::types::ConflictResolution::Skip);

			let project = manager.get(project_name).map_err(RpcError::from)?;
			let registry = docbro::repository::Registry::open(manager.data_dir()).map_err(RpcError::from)?;
			let operation = uploads.run(&registry, &project, source, conflict, CancellationToken::new()).await.map_err(RpcError::from)?;
			serde_json::to_value(operation).map_err(|e| RpcError::new(RpcErrorCode::InternalError, e.to_string()))
		}
	});
}
