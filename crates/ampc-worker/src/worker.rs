//! Controller worker

use crate::base::BaseTaskFlow;
use crate::driver::AmphoraDriver;
use crate::flows::AmphoraFlows;
use crate::registry::default_registry;
use ampc_client::AmphoraTarget;
use ampc_core::constants::{STORE_AMPHORA_DIAGNOSTICS, STORE_AMPHORA_INFO, STORE_LISTENER_ID};
use ampc_core::{Config, Error, Result};
use ampc_flow::Store;
use ampc_store::{MemoryRepository, Repository};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Long-lived owner of the engine pool and the resolved amphora driver.
///
/// One worker serves many flow executions; each operation builds a fresh
/// flow, seeds a fresh store, and runs a single-use engine.
pub struct ControllerWorker {
    base: BaseTaskFlow,
    flows: AmphoraFlows,
    driver: Arc<dyn AmphoraDriver>,
    repository: Arc<dyn Repository>,
}

impl ControllerWorker {
    /// Resolve the configured driver and set up the engine pool
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let driver =
            default_registry().create(&config.controller_worker.amphora_driver, config)?;
        Ok(Self {
            base: BaseTaskFlow::new(&config.task_flow),
            flows: AmphoraFlows::new(),
            driver,
            repository: Arc::new(MemoryRepository::new()),
        })
    }

    /// Swap the repository collaborator (external persistence)
    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = repository;
        self
    }

    /// Swap the amphora driver (stubbed transports in tests)
    pub fn with_driver(mut self, driver: Arc<dyn AmphoraDriver>) -> Self {
        self.driver = driver;
        self
    }

    /// Fetch and persist the agent's version info
    pub async fn get_agent_info(&self, target: &AmphoraTarget) -> Result<Value> {
        info!(%target, "Getting the backend agent info");
        let flow = self.flows.get_backend_info_flow(
            Arc::clone(&self.driver),
            Arc::clone(&self.repository),
            target.clone(),
        );
        let store = self.run_flow(&flow, Store::new()).await?;
        store
            .get(STORE_AMPHORA_INFO)
            .await
            .ok_or(Error::InfoFailure)
    }

    /// Run the agent's self-test
    pub async fn get_agent_diagnostics(&self, target: &AmphoraTarget) -> Result<Value> {
        info!(%target, "Running the backend agent self-test");
        let flow = self
            .flows
            .diagnostics_flow(Arc::clone(&self.driver), target.clone());
        let store = self.run_flow(&flow, Store::new()).await?;
        store
            .get(STORE_AMPHORA_DIAGNOSTICS)
            .await
            .ok_or(Error::InfoFailure)
    }

    /// Remove a listener from the agent
    pub async fn delete_listener(&self, target: &AmphoraTarget, listener_id: &str) -> Result<()> {
        info!(%target, listener_id, "Deleting listener");
        let flow = self
            .flows
            .delete_listener_flow(Arc::clone(&self.driver), target.clone());
        let seed = HashMap::from([(STORE_LISTENER_ID.to_string(), json!(listener_id))]);
        self.run_flow(&flow, Store::seeded(seed)).await?;
        Ok(())
    }

    /// Compile and run one flow, logging failures.
    ///
    /// `ConnectionRetry` is expected noise while an amphora boots and is
    /// demoted to debug; everything else logs at error severity.
    async fn run_flow(&self, flow: &ampc_flow::Flow, store: Store) -> Result<Store> {
        let flow_name = flow.name().to_string();
        let engine = self
            .base
            .load(flow, store)
            .await
            .map_err(|e| self.log_flow_failure(&flow_name, e))?;
        engine
            .run()
            .await
            .map_err(|e| self.log_flow_failure(&flow_name, e))
    }

    fn log_flow_failure(&self, flow: &str, err: Error) -> Error {
        if err.is_connection_retry() {
            debug!(flow, error = %err, "Flow failed on transient agent retry");
        } else {
            error!(flow, error = %err, "Flow failed");
        }
        err
    }
}
