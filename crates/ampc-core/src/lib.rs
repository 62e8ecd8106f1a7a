//! Core types for the ampc control plane
//!
//! # Modules
//!
//! - `config`: Configuration structs, loaded once and passed by reference
//! - `constants`: Agent API version, default ports, store key names
//! - `error`: Error taxonomy and Result alias

pub mod config;
pub mod constants;
pub mod error;

// Re-exports
pub use config::{
    AgentClientConfig, AgentServerConfig, Config, ControllerWorkerConfig, EngineKind,
    TaskFlowConfig,
};
pub use error::{Error, ProvisioningResource, Result};
