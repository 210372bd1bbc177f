//! DocBro core: typed-project lifecycle, hierarchical configuration,
//! multi-protocol upload ingestion, and a JSON-RPC/MCP protocol surface.
//!
//! This crate is the embeddable core; `main.rs` wires it to a stdio
//! transport and CLI flags. Nothing here installs global state (tracing
//! subscribers, signal handlers) — that stays in the binary.

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod progress;
pub mod projects;
pub mod repository;
pub mod rpc;
pub mod strategies;
pub mod types;
pub mod upload;

pub use error::DocBroError;
pub use manager::ProjectManager;
pub use progress::ProgressReporter;
pub use upload::manager::{CancellationToken, UploadManager};
