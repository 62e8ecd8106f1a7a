//! ampc-agent: Amphora agent API server
//!
//! The HTTP surface a booted amphora exposes to the control plane:
//!
//! - `GET /` → `{"api_version": "1.0"}` (version discovery)
//! - `GET /test` → `{"info": "Hello world!"}` (self-test)
//! - every error page is JSON: `{"error": <string>, "http_code": <int>}`

pub mod server;

pub use server::{create_router, AgentServer};

/// Error types for the agent server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server binding error: {0}")]
    Bind(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
