//! Flow catalog for amphora operations

use crate::driver::AmphoraDriver;
use crate::tasks::{DeleteListener, GetDiagnostics, GetVersionInfo, RecordVersionInfo};
use ampc_client::AmphoraTarget;
use ampc_flow::Flow;
use ampc_store::Repository;
use std::sync::Arc;

/// Builds the fixed flows the worker runs
#[derive(Default)]
pub struct AmphoraFlows;

impl AmphoraFlows {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the agent's version info and persist it
    pub fn get_backend_info_flow(
        &self,
        driver: Arc<dyn AmphoraDriver>,
        repository: Arc<dyn Repository>,
        target: AmphoraTarget,
    ) -> Flow {
        Flow::linear("amphora-get-backend-info-flow")
            .add_task(Arc::new(GetVersionInfo::new(driver, target)))
            .add_task(Arc::new(RecordVersionInfo::new(repository)))
    }

    /// Run the agent's self-test
    pub fn diagnostics_flow(&self, driver: Arc<dyn AmphoraDriver>, target: AmphoraTarget) -> Flow {
        Flow::linear("amphora-diagnostics-flow")
            .add_task(Arc::new(GetDiagnostics::new(driver, target)))
    }

    /// Remove a listener from the agent
    pub fn delete_listener_flow(
        &self,
        driver: Arc<dyn AmphoraDriver>,
        target: AmphoraTarget,
    ) -> Flow {
        Flow::linear("amphora-delete-listener-flow")
            .add_task(Arc::new(DeleteListener::new(driver, target)))
    }
}
