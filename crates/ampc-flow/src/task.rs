//! Task trait - the unit of work

use crate::store::Store;
use ampc_core::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Values a task produced, keyed by the names it declared in
/// [`Task::provides`]
pub type TaskOutput = HashMap<String, Value>;

/// A named unit of work with execute and optional revert behavior.
///
/// Tasks declare the store keys they read (`requires`) and write
/// (`provides`); the engine uses the declarations to validate a flow at
/// build time and to order unordered siblings. Side effects must be
/// confined to the declared outputs; one execution attempt runs exactly
/// once.
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique name, used for store namespacing and log correlation
    fn name(&self) -> &str;

    /// Store keys this task reads
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Store keys this task writes
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }

    /// Do the work. Returns the declared outputs on success.
    async fn execute(&self, store: &Store) -> Result<TaskOutput>;

    /// Best-effort compensating action, run during failure unwinding.
    ///
    /// The engine logs and swallows any error returned here; a second
    /// failure mid-unwind cannot be usefully propagated.
    async fn revert(&self, _store: &Store, _failure: &Error) -> Result<()> {
        Ok(())
    }
}
