//! ampc-client: Resilient REST client for amphora agents
//!
//! Amphorae come up over a best-effort network: the agent's HTTP stack is
//! often reachable before its application (or even its network interface)
//! is. This client hides that window behind a bounded retry loop and
//! distinguishes "agent not ready yet" from genuine failures:
//!
//! - transport errors and not-ready 404s are retried up to `max_retries`,
//!   sleeping `retry_interval` between attempts
//! - every other mapped error status is logged once and raised as a typed
//!   [`ampc_core::Error`]
//! - retry exhaustion surfaces as `Timeout`, or `ConnectionRetry` with the
//!   last transport error's message when the caller needs a serializable
//!   cause

pub mod rest;
pub mod retry;
pub mod types;

pub use rest::{check_response, AmphoraApiClient};
pub use retry::{classify_response, Decision};
pub use types::{AgentResponse, AmphoraTarget, CallOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::rest::{check_response, AmphoraApiClient};
    pub use super::types::{AgentResponse, AmphoraTarget, CallOptions};
}
