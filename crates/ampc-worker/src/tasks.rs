//! Driver tasks
//!
//! Each task wraps one driver operation and confines its result to the
//! store keys it declares.

use crate::driver::AmphoraDriver;
use ampc_client::AmphoraTarget;
use ampc_core::constants::{
    STORE_AMPHORA_DIAGNOSTICS, STORE_AMPHORA_INFO, STORE_AMPHORA_INFO_RECORD_ID, STORE_LISTENER_ID,
};
use ampc_core::{Error, Result};
use ampc_flow::{Store, Task, TaskOutput};
use ampc_store::{Fields, Repository};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Fetch the agent's version info
pub struct GetVersionInfo {
    driver: Arc<dyn AmphoraDriver>,
    target: AmphoraTarget,
}

impl GetVersionInfo {
    pub fn new(driver: Arc<dyn AmphoraDriver>, target: AmphoraTarget) -> Self {
        Self { driver, target }
    }
}

#[async_trait]
impl Task for GetVersionInfo {
    fn name(&self) -> &str {
        "get-version-info"
    }

    fn provides(&self) -> Vec<String> {
        vec![STORE_AMPHORA_INFO.to_string()]
    }

    async fn execute(&self, _store: &Store) -> Result<TaskOutput> {
        let info = self.driver.get_version_info(&self.target).await?;
        info!(target = %self.target, "Fetched amphora version info");
        Ok(HashMap::from([(STORE_AMPHORA_INFO.to_string(), info)]))
    }
}

/// Run the agent's self-test endpoint
pub struct GetDiagnostics {
    driver: Arc<dyn AmphoraDriver>,
    target: AmphoraTarget,
}

impl GetDiagnostics {
    pub fn new(driver: Arc<dyn AmphoraDriver>, target: AmphoraTarget) -> Self {
        Self { driver, target }
    }
}

#[async_trait]
impl Task for GetDiagnostics {
    fn name(&self) -> &str {
        "get-diagnostics"
    }

    fn provides(&self) -> Vec<String> {
        vec![STORE_AMPHORA_DIAGNOSTICS.to_string()]
    }

    async fn execute(&self, _store: &Store) -> Result<TaskOutput> {
        let info = self.driver.get_diagnostics(&self.target).await?;
        Ok(HashMap::from([(
            STORE_AMPHORA_DIAGNOSTICS.to_string(),
            info,
        )]))
    }
}

/// Remove a listener named by the seeded `listener_id`
pub struct DeleteListener {
    driver: Arc<dyn AmphoraDriver>,
    target: AmphoraTarget,
}

impl DeleteListener {
    pub fn new(driver: Arc<dyn AmphoraDriver>, target: AmphoraTarget) -> Self {
        Self { driver, target }
    }
}

#[async_trait]
impl Task for DeleteListener {
    fn name(&self) -> &str {
        "delete-listener"
    }

    fn requires(&self) -> Vec<String> {
        vec![STORE_LISTENER_ID.to_string()]
    }

    async fn execute(&self, store: &Store) -> Result<TaskOutput> {
        let listener_id = store
            .get(STORE_LISTENER_ID)
            .await
            .and_then(|v| v.as_str().map(String::from))
            .ok_or(Error::InvalidRequest)?;
        self.driver.delete_listener(&self.target, &listener_id).await?;
        info!(target = %self.target, listener_id, "Deleted listener");
        Ok(TaskOutput::new())
    }
}

/// Persist the fetched version info through the repository collaborator.
/// Reverting deletes the record again.
pub struct RecordVersionInfo {
    repository: Arc<dyn Repository>,
}

impl RecordVersionInfo {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for RecordVersionInfo {
    fn name(&self) -> &str {
        "record-version-info"
    }

    fn requires(&self) -> Vec<String> {
        vec![STORE_AMPHORA_INFO.to_string()]
    }

    fn provides(&self) -> Vec<String> {
        vec![STORE_AMPHORA_INFO_RECORD_ID.to_string()]
    }

    async fn execute(&self, store: &Store) -> Result<TaskOutput> {
        let info = store
            .get(STORE_AMPHORA_INFO)
            .await
            .unwrap_or(Value::Null);

        let mut fields = Fields::new();
        fields.insert("amphora_info".to_string(), info);
        fields.insert(
            "recorded_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        let id = self.repository.create(fields).await.map_err(|e| {
            error!(error = %e, "Failed to record amphora info");
            Error::InternalError
        })?;

        Ok(HashMap::from([(
            STORE_AMPHORA_INFO_RECORD_ID.to_string(),
            json!(id.to_string()),
        )]))
    }

    async fn revert(&self, store: &Store, _failure: &Error) -> Result<()> {
        let id = store
            .get(STORE_AMPHORA_INFO_RECORD_ID)
            .await
            .and_then(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()));

        if let Some(id) = id {
            self.repository.delete(id).await.map_err(|e| {
                warn!(%id, error = %e, "Failed to delete amphora info record");
                Error::InternalError
            })?;
        }
        Ok(())
    }
}
