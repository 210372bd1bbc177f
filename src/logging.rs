//! Tracing subscriber initialization.
//!
//! Only `src/main.rs` calls [`init`] — library code never installs a
//! global subscriber, so `docbro` stays embeddable. Logs go to stderr
//! unconditionally: stdout is reserved for the JSON-RPC stdio transport.

/// Initializes the global tracing subscriber from `DOCBRO_LOG`, falling
/// back to `RUST_LOG`, defaulting to `info` if neither is set.
pub fn init() {
	let filter = std::env::var("DOCBRO_LOG")
		.or_else(|_| std::env::var("RUST_LOG"))
		.unwrap_or_else(|_| "info".to_string());

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::new(filter))
		.with_writer(std::io::stderr)
		.init();
}
