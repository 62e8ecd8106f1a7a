//! ampc-worker: Controller worker
//!
//! The process-facing API of the control plane. The worker owns the shared
//! flow-engine pool and the resolved amphora driver, builds flows for named
//! operations, and runs them through `ampc-flow`. Boundary collaborators
//! (an RPC consumer, a REST controller) call in through [`Endpoints`].

pub mod base;
pub mod driver;
pub mod endpoints;
pub mod flows;
pub mod registry;
pub mod tasks;
pub mod worker;

pub use base::BaseTaskFlow;
pub use driver::{AmphoraDriver, RestAmphoraDriver};
pub use endpoints::Endpoints;
pub use flows::AmphoraFlows;
pub use registry::{default_registry, DriverRegistry};
pub use worker::ControllerWorker;
