//! Pure retry decision for agent responses
//!
//! The decision is kept free of I/O, logging and sleeping so it can be
//! tested against the full 404 matrix without a network. The outer loop in
//! [`crate::rest::AmphoraApiClient::request`] owns the sleep/log side of it.
//!
//! Transport-level failures (connect refused, timeouts, a connection dropped
//! mid-body) never reach this function; the loop treats all of them as
//! transient.

use crate::types::CallOptions;
use ampc_core::constants::NO_INTERFACE_MARKER;
use ampc_core::Error;
use serde_json::Value;

/// What the retry loop should do with a wire response
#[derive(Debug)]
pub enum Decision {
    /// Hand the response to the caller unchanged
    Done,
    /// The agent is not ready yet; sleep and try again
    Retry(&'static str),
    /// Terminal: raise this typed error now
    Fail(Error),
}

/// Classify one agent response.
///
/// Only 404 needs disambiguation: a booting amphora answers 404 from a
/// not-yet-configured HTTP stack (non-JSON body) or reports a missing
/// network interface in a JSON `details` field. Both mean "not ready".
/// Every other 404 is a real answer and is handed back for the caller's
/// status check to map, unless `retry_not_found` was switched off, in
/// which case it raises immediately.
pub fn classify_response(
    status: u16,
    content_type: &str,
    body: &[u8],
    options: &CallOptions,
) -> Decision {
    if status != 404 {
        return Decision::Done;
    }

    if !options.retry_not_found {
        return Decision::Fail(Error::NotFound);
    }

    if !content_type.contains("application/json") {
        return Decision::Retry("amphora agent not ready");
    }

    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(details) = value.get("details").and_then(Value::as_str) {
            if details.contains(NO_INTERFACE_MARKER) {
                return Decision::Retry("amphora network interface not found");
            }
        }
    }

    Decision::Done
}
