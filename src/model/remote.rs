//! Remote counterparts of tasks, rebuilt on every lookup.

use std::fmt;

use chrono::{DateTime, Utc};

use super::task::TaskStatus;

/// Remote status collapsed to done / not done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStatus {
    /// Open, in progress, or any other unfinished state.
    Todo,
    /// Resolved, closed, or otherwise finished.
    Done,
}

impl RemoteStatus {
    /// Translates onto the task-source domain (`DONE` or `TODO`).
    #[must_use]
    pub fn to_task_status(self) -> TaskStatus {
        match self {
            Self::Todo => TaskStatus::Todo,
            Self::Done => TaskStatus::Done,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Todo => "TODO",
            Self::Done => "DONE",
        })
    }
}

/// A remote item found for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTaskRef {
    /// Identifier the ALM tool uses for the item (issue key, number, ...).
    pub id: String,
    /// Status as the tool reports it (e.g. `"In Progress"`, `"closed"`).
    pub native_status: String,
    /// Normalized status.
    pub status: RemoteStatus,
    /// Time of the last change on the remote side.
    pub updated: DateTime<Utc>,
    /// Human-facing reference (URL or key) recorded in tracking notes.
    pub reference: String,
}

impl RemoteTaskRef {
    /// Returns the normalized remote status.
    #[must_use]
    pub fn get_status(&self) -> RemoteStatus {
        self.status
    }
}

/// Outcome of asking an ALM tool to remove an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The item is gone.
    Deleted,
    /// The tool kept the item without reporting an error; the task is then
    /// left alone for the rest of the run.
    Retained {
        /// Why the tool kept it.
        reason: String,
    },
}
