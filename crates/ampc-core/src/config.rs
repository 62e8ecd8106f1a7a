//! Configuration for the ampc control plane
//!
//! One [`Config`] is built at process start (from a JSON or YAML file, or
//! defaults) and passed by reference into each component's constructor.
//! Nothing reads ambient global state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hostname this control plane is running on
    #[serde(default = "default_host")]
    pub host: String,

    /// Amphora agent API server settings
    #[serde(default)]
    pub agent_server: AgentServerConfig,

    /// Resilient agent client settings
    #[serde(default)]
    pub agent_client: AgentClientConfig,

    /// Flow engine settings
    #[serde(default)]
    pub task_flow: TaskFlowConfig,

    /// Controller worker settings
    #[serde(default)]
    pub controller_worker: ControllerWorkerConfig,
}

fn default_host() -> String {
    gethostname::gethostname().to_string_lossy().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            agent_server: AgentServerConfig::default(),
            agent_client: AgentClientConfig::default(),
            task_flow: TaskFlowConfig::default(),
            controller_worker: ControllerWorkerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON or YAML file (by extension)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).with_context(|| "Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).with_context(|| "Failed to parse JSON config")?
        };

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from default paths, with fallbacks
    pub fn load_default() -> Result<Self> {
        let paths = ["/etc/ampc/ampc.json", "/etc/ampc/ampc.yaml", "ampc.json"];

        for path in paths {
            if Path::new(path).exists() {
                return Self::load(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }
}

/// Settings for the amphora agent API server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentServerConfig {
    /// The host IP to bind to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// The port to bind to
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    crate::constants::DEFAULT_AGENT_PORT
}

impl Default for AgentServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
        }
    }
}

/// Settings for the resilient agent REST client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClientConfig {
    /// Seconds to wait for a TCP connection to the agent
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Seconds to wait for the agent to answer once connected
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Maximum connection attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds slept between connection attempts
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Verify the agent's TLS certificate. Turning this off is an explicit
    /// opt-out for self-signed agent certificates.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// User-Agent header identifying this control plane
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    120
}

fn default_retry_interval() -> u64 {
    5
}

fn default_verify_tls() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("Ampc Amphora Rest Client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
            verify_tls: default_verify_tls(),
            user_agent: default_user_agent(),
        }
    }
}

impl AgentClientConfig {
    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Retry interval as a `Duration`
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Which execution strategy an engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Single logical thread, deterministic order
    Serial,
    /// Bounded worker pool, independent tasks dispatched concurrently
    Parallel,
}

impl Default for EngineKind {
    fn default() -> Self {
        Self::Serial
    }
}

/// Settings for the flow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFlowConfig {
    /// Size of the shared worker pool used by parallel engines
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Execution strategy
    #[serde(default)]
    pub engine: EngineKind,

    /// Leave the store partially applied on failure instead of reverting.
    /// Debugging aid, not for production.
    #[serde(default)]
    pub disable_revert: bool,
}

fn default_max_workers() -> usize {
    5
}

impl Default for TaskFlowConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            engine: EngineKind::default(),
            disable_revert: false,
        }
    }
}

/// Settings for the controller worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerWorkerConfig {
    /// Number of worker processes the service manager starts
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Name of the amphora driver to resolve from the registry
    #[serde(default = "default_amphora_driver")]
    pub amphora_driver: String,
}

fn default_workers() -> usize {
    1
}

fn default_amphora_driver() -> String {
    "amphora_rest_driver".to_string()
}

impl Default for ControllerWorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            amphora_driver: default_amphora_driver(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.agent_client.connect_timeout_secs, 10);
        assert_eq!(config.agent_client.read_timeout_secs, 60);
        assert_eq!(config.agent_client.max_retries, 120);
        assert_eq!(config.agent_client.retry_interval_secs, 5);
        assert!(config.agent_client.verify_tls);
        assert_eq!(config.task_flow.max_workers, 5);
        assert_eq!(config.task_flow.engine, EngineKind::Serial);
        assert!(!config.task_flow.disable_revert);
        assert_eq!(config.controller_worker.amphora_driver, "amphora_rest_driver");
        assert_eq!(config.agent_server.bind_port, 9443);
    }

    #[test]
    fn loads_partial_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"agent_client": {{"max_retries": 3, "retry_interval_secs": 0}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.agent_client.max_retries, 3);
        assert_eq!(config.agent_client.retry_interval_secs, 0);
        // untouched sections keep their defaults
        assert_eq!(config.agent_client.read_timeout_secs, 60);
        assert_eq!(config.task_flow.max_workers, 5);
    }

    #[test]
    fn loads_yaml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "task_flow:\n  engine: parallel\n  max_workers: 2\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.task_flow.engine, EngineKind::Parallel);
        assert_eq!(config.task_flow.max_workers, 2);
    }
}
