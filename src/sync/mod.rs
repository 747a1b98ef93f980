//! Task reconciliation between the task source and an ALM tool.
//!
//! Remote items are matched to tasks through the title marker (see
//! [`marker`]); re-running a synchronization without external changes
//! issues no further state-changing calls.

pub mod conflict;
pub mod engine;
pub mod marker;
pub mod progress;
pub mod report;
pub mod scope;

pub use conflict::{resolve, status_match, Resolution, Side};
pub use engine::{EngineState, SyncEngine, NOTE_TAG};
pub use report::{format_report, Created, SyncEvent, SyncReport};
pub use scope::in_scope;
