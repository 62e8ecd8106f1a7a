//! ampc-store: Opaque record repository
//!
//! The control plane treats persistence as an external collaborator with
//! plain create/get/update/delete semantics over an opaque identifier and a
//! flat field map. No schema is assumed beyond that.

pub mod error;
pub mod repository;

pub use error::{Result, StoreError};
pub use repository::{Fields, MemoryRepository, Repository};
