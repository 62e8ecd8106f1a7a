//! Shared constants

/// Version string the agent reports on `GET /`
pub const API_VERSION: &str = "1.0";

/// Default port the amphora agent listens on
pub const DEFAULT_AGENT_PORT: u16 = 9443;

/// Marker the agent puts in a 404 `details` field while its network
/// interface is still being plugged. Wire-compatibility constant.
pub const NO_INTERFACE_MARKER: &str = "No suitable network interface found";

// Store keys used by the worker's flows
pub const STORE_AMPHORA_INFO: &str = "amphora_info";
pub const STORE_AMPHORA_DIAGNOSTICS: &str = "amphora_diagnostics";
pub const STORE_AMPHORA_INFO_RECORD_ID: &str = "amphora_info_record_id";
pub const STORE_LISTENER_ID: &str = "listener_id";
