//! JSON-RPC Protocol Core (C8): framing, the initialize/initialized/ping
//! handshake, a method router with initialization gating, and a
//! transport-agnostic dispatch surface.

pub mod capabilities;
pub mod error;
pub mod message;
pub mod router;
pub mod transport_http;

pub use error::{RpcError, RpcErrorCode};
pub use router::Router;
