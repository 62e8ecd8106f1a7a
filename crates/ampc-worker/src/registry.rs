//! Static driver registry
//!
//! Driver names from configuration resolve to constructor functions through
//! one map built at startup. An absent name fails fast with
//! `DriverNotFound`; nothing is discovered or loaded dynamically.

use crate::driver::{AmphoraDriver, RestAmphoraDriver};
use ampc_core::{Config, Error};
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Constructor for one registered driver
pub type DriverFactory = fn(&Config) -> anyhow::Result<Arc<dyn AmphoraDriver>>;

/// Name → constructor map for amphora drivers
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver constructor under a configuration name
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Registered driver names
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Resolve a name and construct the driver
    pub fn create(&self, name: &str, config: &Config) -> anyhow::Result<Arc<dyn AmphoraDriver>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!(Error::driver_not_found(name)))?;
        info!(driver = name, "Loading amphora driver");
        factory(config)
    }
}

fn rest_driver(config: &Config) -> anyhow::Result<Arc<dyn AmphoraDriver>> {
    Ok(Arc::new(RestAmphoraDriver::new(&config.agent_client)?))
}

/// The registry with all built-in drivers
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register("amphora_rest_driver", rest_driver);
    registry
}
