//! Target addresses, call options and the buffered agent response

use ampc_core::Result;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Address of one amphora agent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmphoraTarget {
    pub host: String,
    pub port: u16,
    /// Talk https to the agent. Certificate verification follows
    /// `AgentClientConfig::verify_tls`.
    pub secure: bool,
}

impl AmphoraTarget {
    /// Plain-http target
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
        }
    }

    /// https target
    pub fn https(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: true,
        }
    }

    /// Base URL for requests against this agent
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl std::fmt::Display for AmphoraTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Per-call options for [`crate::AmphoraApiClient::request`]
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Treat 404 as possibly-not-ready and keep retrying (default). When
    /// off, any 404 that is not a not-ready signature raises `NotFound`
    /// immediately.
    pub retry_not_found: bool,

    /// On retry exhaustion raise `ConnectionRetry` carrying the last
    /// transport error's message instead of `Timeout`. Used when the failure
    /// must be persistable by an upstream orchestration layer.
    pub raise_retry_exception: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            retry_not_found: true,
            raise_retry_exception: false,
        }
    }
}

impl CallOptions {
    pub fn retry_not_found(mut self, retry: bool) -> Self {
        self.retry_not_found = retry;
        self
    }

    pub fn raise_retry_exception(mut self, raise: bool) -> Self {
        self.raise_retry_exception = raise;
        self
    }
}

/// A fully buffered agent response.
///
/// The retry loop has to inspect 404 bodies before the caller ever sees the
/// response, so the body is read eagerly; status, headers and bytes are then
/// handed to the caller unchanged.
#[derive(Debug)]
pub struct AgentResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl AgentResponse {
    /// Buffer a wire response. Body read failures count as transport errors.
    pub(crate) async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// The `content-type` header, or "" when absent
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Body as lossy UTF-8, for logging
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_scheme_follows_secure_flag() {
        let target = AmphoraTarget::new("192.0.2.10", 9443);
        assert_eq!(target.base_url(), "http://192.0.2.10:9443");

        let target = AmphoraTarget::https("192.0.2.10", 9443);
        assert_eq!(target.base_url(), "https://192.0.2.10:9443");
    }

    #[test]
    fn default_options_retry_not_found() {
        let options = CallOptions::default();
        assert!(options.retry_not_found);
        assert!(!options.raise_retry_exception);
    }
}
