//! Amphora driver capability
//!
//! Tasks execute against this trait rather than a concrete client, so the
//! transport can be swapped (and stubbed in tests) without touching flows.

use ampc_client::{AmphoraApiClient, AmphoraTarget};
use ampc_core::config::AgentClientConfig;
use ampc_core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Operations the control plane performs against one amphora
#[async_trait]
pub trait AmphoraDriver: Send + Sync {
    /// Version discovery (`GET /`)
    async fn get_version_info(&self, target: &AmphoraTarget) -> Result<Value>;

    /// Agent self-test (`GET /test`)
    async fn get_diagnostics(&self, target: &AmphoraTarget) -> Result<Value>;

    /// Remove a listener; already-gone is not an error
    async fn delete_listener(&self, target: &AmphoraTarget, listener_id: &str) -> Result<()>;
}

/// REST implementation over [`AmphoraApiClient`]
pub struct RestAmphoraDriver {
    client: AmphoraApiClient,
}

impl RestAmphoraDriver {
    pub fn new(config: &AgentClientConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: AmphoraApiClient::new(config)?,
        })
    }
}

#[async_trait]
impl AmphoraDriver for RestAmphoraDriver {
    async fn get_version_info(&self, target: &AmphoraTarget) -> Result<Value> {
        self.client.get_api_version(target).await
    }

    async fn get_diagnostics(&self, target: &AmphoraTarget) -> Result<Value> {
        self.client.get_diagnostics(target).await
    }

    async fn delete_listener(&self, target: &AmphoraTarget, listener_id: &str) -> Result<()> {
        self.client.delete_listener(target, listener_id).await
    }
}
