//! Named-operation dispatch for boundary callers
//!
//! The request router (RPC consumer, REST controller) hands operations in
//! by name with a flat JSON parameter map; exactly one typed failure comes
//! back per failed operation.

use crate::worker::ControllerWorker;
use ampc_client::AmphoraTarget;
use ampc_core::{Error, Result};
use serde_json::{json, Value};
use tracing::info;

/// Thin dispatch over the worker's named operations
pub struct Endpoints {
    worker: ControllerWorker,
}

impl Endpoints {
    pub fn new(worker: ControllerWorker) -> Self {
        Self { worker }
    }

    /// Run one named operation
    pub async fn handle(&self, operation: &str, params: Value) -> Result<Value> {
        info!(operation, "Dispatching operation");
        match operation {
            "get_agent_info" => {
                let target = target_from(&params)?;
                self.worker.get_agent_info(&target).await
            }
            "get_agent_diagnostics" => {
                let target = target_from(&params)?;
                self.worker.get_agent_diagnostics(&target).await
            }
            "delete_listener" => {
                let target = target_from(&params)?;
                let listener_id = params
                    .get("listener_id")
                    .and_then(Value::as_str)
                    .ok_or(Error::InvalidRequest)?;
                self.worker.delete_listener(&target, listener_id).await?;
                Ok(json!({"deleted": true}))
            }
            _ => Err(Error::NotImplemented),
        }
    }
}

fn target_from(params: &Value) -> Result<AmphoraTarget> {
    let host = params
        .get("host")
        .and_then(Value::as_str)
        .ok_or(Error::InvalidRequest)?;
    let port = params
        .get("port")
        .and_then(Value::as_u64)
        .and_then(|p| u16::try_from(p).ok())
        .ok_or(Error::InvalidRequest)?;
    Ok(AmphoraTarget::new(host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampc_core::Config;

    fn endpoints() -> Endpoints {
        let mut config = Config::default();
        config.agent_client.max_retries = 1;
        config.agent_client.retry_interval_secs = 0;
        Endpoints::new(ControllerWorker::new(&config).unwrap())
    }

    #[tokio::test]
    async fn unknown_operation_is_not_implemented() {
        let err = endpoints()
            .handle("resize_amphora", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented));
    }

    #[tokio::test]
    async fn missing_target_params_are_invalid() {
        let err = endpoints()
            .handle("get_agent_info", json!({"host": "127.0.0.1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest));

        let err = endpoints()
            .handle("get_agent_info", json!({"host": "127.0.0.1", "port": 70000}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest));
    }

    #[tokio::test]
    async fn delete_requires_listener_id() {
        let err = endpoints()
            .handle(
                "delete_listener",
                json!({"host": "127.0.0.1", "port": 9443}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest));
    }
}
