//! Task types shared by the engine, the ports, and the adapters.

mod remote;
mod task;

pub use remote::{RemoteStatus, RemoteTaskRef, Removal};
pub use task::{HowTo, Task, TaskStatus};

pub(crate) use task::trailing_number;
