//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the synchronization engine and
//! an external system. Implementations live in `src/adapters/`.

pub mod alm;
pub mod task_source;

pub use alm::{AlmConnector, RemoteTaskDraft};
pub use task_source::TaskSource;
