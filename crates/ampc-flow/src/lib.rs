//! ampc-flow: Task orchestration engine
//!
//! Units of work ([`Task`]) compose into directed flows ([`Flow`]) that run
//! serially or in parallel with automatic rollback on failure:
//!
//! - flows compile into an execution plan up front; cycles and unsatisfiable
//!   inputs fail at build time, never mid-run
//! - results flow through a per-execution [`Store`] shared by sibling tasks
//! - on the first task failure the engine stops scheduling, lets in-flight
//!   tasks finish, reverts completed tasks in reverse completion order and
//!   surfaces the original error

pub mod engine;
pub mod flow;
pub mod store;
pub mod task;

pub use engine::{EngineState, FlowEngine};
pub use flow::{Flow, FlowKind};
pub use store::Store;
pub use task::{Task, TaskOutput};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::engine::{EngineState, FlowEngine};
    pub use super::flow::{Flow, FlowKind};
    pub use super::store::Store;
    pub use super::task::{Task, TaskOutput};
}
