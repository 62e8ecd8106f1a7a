//! Amphora agent REST client

use crate::retry::{classify_response, Decision};
use crate::types::{AgentResponse, AmphoraTarget, CallOptions};
use ampc_core::config::AgentClientConfig;
use ampc_core::{Error, Result};
use anyhow::Context;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, warn};

/// Check an agent response against the status taxonomy.
///
/// Statuses in the explicit map (and not in `ignore`) are logged with their
/// body and returned as the mapped typed error. Unmapped statuses pass
/// through, preserving forward compatibility with codes added later.
pub fn check_response(response: &AgentResponse, ignore: &[u16]) -> Result<()> {
    let status = response.status.as_u16();
    if ignore.contains(&status) {
        return Ok(());
    }
    if let Some(err) = Error::from_status(status) {
        error!(
            status,
            body = %response.text(),
            "Amphora agent returned unexpected result code"
        );
        return Err(err);
    }
    Ok(())
}

/// REST client for amphora agents.
///
/// One client serves many targets; reqwest's pool reuses connections to the
/// same agent between calls.
pub struct AmphoraApiClient {
    http: reqwest::Client,
    config: AgentClientConfig,
}

impl AmphoraApiClient {
    /// Build a client from configuration.
    ///
    /// Certificate verification is only relaxed when `verify_tls` is
    /// explicitly off (self-signed agent certificates).
    pub fn new(config: &AgentClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &AgentClientConfig {
        &self.config
    }

    /// Perform one agent call with bounded retries.
    ///
    /// Transport failures and not-ready 404s are retried up to
    /// `max_retries`, sleeping `retry_interval` between attempts; they never
    /// surface individually. Exhaustion raises `Timeout`, or
    /// `ConnectionRetry` with the last transport error's message when
    /// `raise_retry_exception` is set. Any other response is returned
    /// unchanged.
    pub async fn request(
        &self,
        method: Method,
        target: &AmphoraTarget,
        path: &str,
        body: Option<&Value>,
        options: &CallOptions,
    ) -> Result<AgentResponse> {
        let url = format!("{}{}", target.base_url(), path);
        let mut last_transient: Option<String> = None;

        for attempt in 1..=self.config.max_retries {
            match self.attempt(method.clone(), &url, body).await {
                Ok(response) => {
                    match classify_response(
                        response.status.as_u16(),
                        response.content_type(),
                        &response.body,
                        options,
                    ) {
                        Decision::Done => {
                            debug!(%target, path, status = %response.status, "Connected to amphora");
                            return Ok(response);
                        }
                        Decision::Retry(reason) => {
                            debug!(%target, path, attempt, reason, "Amphora agent not ready, retrying");
                            last_transient = Some(reason.to_string());
                        }
                        Decision::Fail(err) => {
                            warn!(%target, path, status = %response.status, "Amphora agent call failed");
                            return Err(err);
                        }
                    }
                }
                Err(e) => {
                    debug!(%target, path, attempt, error = %e, "Could not connect to amphora, retrying");
                    last_transient = Some(e.to_string());
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.retry_interval()).await;
            }
        }

        let last = last_transient.unwrap_or_else(|| "connection retries exhausted".to_string());
        warn!(
            %target,
            max_retries = self.config.max_retries,
            last_error = %last,
            "Connection retries exhausted, the amphora is unavailable"
        );

        if options.raise_retry_exception {
            Err(Error::connection_retry(last))
        } else {
            Err(Error::Timeout)
        }
    }

    /// One wire attempt: send and buffer. Any reqwest error here is
    /// transport-level and therefore transient.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> reqwest::Result<AgentResponse> {
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        AgentResponse::read(response).await
    }

    /// GET convenience wrapper
    pub async fn get(
        &self,
        target: &AmphoraTarget,
        path: &str,
        options: &CallOptions,
    ) -> Result<AgentResponse> {
        self.request(Method::GET, target, path, None, options).await
    }

    /// DELETE convenience wrapper
    pub async fn delete(
        &self,
        target: &AmphoraTarget,
        path: &str,
        options: &CallOptions,
    ) -> Result<AgentResponse> {
        self.request(Method::DELETE, target, path, None, options)
            .await
    }

    /// Version discovery: `GET /` → `{"api_version": ...}`
    pub async fn get_api_version(&self, target: &AmphoraTarget) -> Result<Value> {
        let response = self.get(target, "/", &CallOptions::default()).await?;
        check_response(&response, &[])?;
        response.json()
    }

    /// Agent self-test: `GET /test` → `{"info": "Hello world!"}`
    pub async fn get_diagnostics(&self, target: &AmphoraTarget) -> Result<Value> {
        let response = self.get(target, "/test", &CallOptions::default()).await?;
        check_response(&response, &[])?;
        response.json()
    }

    /// Remove a listener from the agent. A 404 means it is already gone and
    /// is not an error.
    pub async fn delete_listener(&self, target: &AmphoraTarget, listener_id: &str) -> Result<()> {
        let path = format!("/listeners/{listener_id}");
        let response = self
            .delete(target, &path, &CallOptions::default())
            .await?;
        check_response(&response, &[404])?;
        Ok(())
    }
}
