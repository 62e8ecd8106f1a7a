//! Error types for ampc
//!
//! A single closed taxonomy shared by the agent client, the flow engine and
//! the controller worker. HTTP status codes returned by an amphora agent map
//! onto the taxonomy through [`Error::from_status`]; codes outside the map
//! pass through untouched so newer agents can add statuses without breaking
//! older control planes.

use thiserror::Error;

/// Resource kinds that can fail provisioning on an amphora.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningResource {
    Listener,
    LoadBalancer,
    HealthMonitor,
    Node,
}

impl std::fmt::Display for ProvisioningResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisioningResource::Listener => "Listener",
            ProvisioningResource::LoadBalancer => "LoadBalancer",
            ProvisioningResource::HealthMonitor => "HealthMonitor",
            ProvisioningResource::Node => "Node",
        };
        f.write_str(name)
    }
}

/// Main error type for ampc operations
#[derive(Error, Debug)]
pub enum Error {
    // Mapped from agent HTTP status codes (400/405, 401, 403, 404, 409, 500, 503)
    #[error("invalid request")]
    InvalidRequest,

    #[error("the driver can't access the amphora")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("this amphora couldn't be found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("internal server error")]
    InternalError,

    #[error("service unavailable")]
    ServiceUnavailable,

    // Driver failures
    #[error("gathering information about this amphora failed")]
    InfoFailure,

    #[error("gathering metrics failed")]
    MetricsFailure,

    #[error("gathering statistics failed")]
    StatisticsFailure,

    #[error("contacting the amphora timed out")]
    Timeout,

    #[error("this load balancer couldn't be deleted")]
    DeleteFailed,

    #[error("this load balancer couldn't be suspended")]
    SuspendFailed,

    #[error("this load balancer couldn't be enabled")]
    EnableFailed,

    #[error("couldn't archive the logs")]
    ArchiveFailure,

    #[error("couldn't provision {0}")]
    Provisioning(ProvisioningResource),

    #[error("the amphora does not implement this feature")]
    NotImplemented,

    /// Transient connection failure, surfaced only when the caller asked for
    /// a serializable cause instead of [`Error::Timeout`]. The message is the
    /// string form of the last transport error, never an opaque object.
    #[error("could not connect to amphora: {message}")]
    ConnectionRetry { message: String },

    #[error("no amphora driver registered under '{name}'")]
    DriverNotFound { name: String },

    // Flow construction and execution
    #[error("flow '{flow}' contains a dependency cycle")]
    FlowCycle { flow: String },

    #[error("task '{task}' requires '{key}', which is not seeded or provided upstream")]
    UnsatisfiedInput { task: String, key: String },

    #[error("task '{task}' did not produce declared output '{key}'")]
    MissingOutput { task: String, key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map an agent HTTP status code onto the taxonomy.
    ///
    /// Returns `None` for any code outside the explicit map; callers must
    /// pass those responses through rather than fail.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 | 405 => Some(Error::InvalidRequest),
            401 => Some(Error::Unauthorized),
            403 => Some(Error::Forbidden),
            404 => Some(Error::NotFound),
            409 => Some(Error::Conflict),
            500 => Some(Error::InternalError),
            503 => Some(Error::ServiceUnavailable),
            _ => None,
        }
    }

    /// Create a connection retry error carrying the last transport error
    pub fn connection_retry(message: impl Into<String>) -> Self {
        Error::ConnectionRetry {
            message: message.into(),
        }
    }

    /// Create a driver-not-found error
    pub fn driver_not_found(name: impl Into<String>) -> Self {
        Error::DriverNotFound { name: name.into() }
    }

    /// Create a provisioning error for the given resource
    pub fn provisioning(resource: ProvisioningResource) -> Self {
        Error::Provisioning(resource)
    }

    /// Create a flow cycle error
    pub fn flow_cycle(flow: impl Into<String>) -> Self {
        Error::FlowCycle { flow: flow.into() }
    }

    /// Create an unsatisfied input error
    pub fn unsatisfied_input(task: impl Into<String>, key: impl Into<String>) -> Self {
        Error::UnsatisfiedInput {
            task: task.into(),
            key: key.into(),
        }
    }

    /// True for the transient retry error the worker demotes from its error
    /// logging (expected noise while an amphora boots).
    pub fn is_connection_retry(&self) -> bool {
        matches!(self, Error::ConnectionRetry { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_status_codes() {
        assert!(matches!(Error::from_status(400), Some(Error::InvalidRequest)));
        assert!(matches!(Error::from_status(405), Some(Error::InvalidRequest)));
        assert!(matches!(Error::from_status(401), Some(Error::Unauthorized)));
        assert!(matches!(Error::from_status(403), Some(Error::Forbidden)));
        assert!(matches!(Error::from_status(404), Some(Error::NotFound)));
        assert!(matches!(Error::from_status(409), Some(Error::Conflict)));
        assert!(matches!(Error::from_status(500), Some(Error::InternalError)));
        assert!(matches!(
            Error::from_status(503),
            Some(Error::ServiceUnavailable)
        ));
    }

    #[test]
    fn unmapped_status_codes_pass_through() {
        assert!(Error::from_status(200).is_none());
        assert!(Error::from_status(201).is_none());
        assert!(Error::from_status(418).is_none());
        assert!(Error::from_status(502).is_none());
    }

    #[test]
    fn renders_provisioning_resource() {
        let err = Error::provisioning(ProvisioningResource::HealthMonitor);
        assert_eq!(err.to_string(), "couldn't provision HealthMonitor");
    }

    #[test]
    fn connection_retry_carries_cause_string() {
        let err = Error::connection_retry("connection refused");
        assert_eq!(
            err.to_string(),
            "could not connect to amphora: connection refused"
        );
        assert!(err.is_connection_retry());
        assert!(!Error::Timeout.is_connection_retry());
    }
}
