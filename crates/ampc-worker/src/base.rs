//! Shared flow-engine factory
//!
//! Engines are per-execution; the worker pool behind them is not. One
//! `BaseTaskFlow` holds the long-lived bounded pool and wires it into every
//! engine it loads, so concurrent parallel flows share the same worker
//! budget. Serial engines never touch the pool.

use ampc_core::config::TaskFlowConfig;
use ampc_core::Result;
use ampc_flow::{Flow, FlowEngine, Store};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Factory that compiles flows into engines wired to a shared worker pool
pub struct BaseTaskFlow {
    config: TaskFlowConfig,
    pool: Arc<Semaphore>,
}

impl BaseTaskFlow {
    pub fn new(config: &TaskFlowConfig) -> Self {
        Self {
            config: config.clone(),
            pool: Arc::new(Semaphore::new(config.max_workers.max(1))),
        }
    }

    /// Compile a flow against a seeded store
    pub async fn load(&self, flow: &Flow, store: Store) -> Result<FlowEngine> {
        let engine = FlowEngine::build(flow, store, &self.config).await?;
        Ok(engine.with_pool(Arc::clone(&self.pool)))
    }
}
