//! ALM connector port: remote-side operations for one ALM tool.

use std::collections::BTreeMap;

use crate::error::RemoteError;
use crate::model::{RemoteTaskRef, Removal, Task, TaskStatus};

/// Everything an ALM tool needs to create the counterpart of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTaskDraft {
    /// Title carrying the identity marker (`"T21: Validate input"`).
    pub title: String,
    /// Issue description.
    pub description: String,
    /// Priority label from the priority map, when one is configured.
    pub priority_label: Option<String>,
    /// Extra tool-specific fields.
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// Operations the engine performs against an ALM tool.
///
/// Implementations re-derive the task ↔ item association on every
/// [`get_task`](AlmConnector::get_task) call; nothing is cached between runs.
pub trait AlmConnector: Send {
    /// Tool name used in logs and notes (e.g. `"JIRA"`).
    fn alm_name(&self) -> &str;

    /// Reaches the server and checks the credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or rejects the login.
    fn connect_server(&mut self) -> Result<(), RemoteError>;

    /// Resolves the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or is not accessible.
    fn connect_project(&mut self) -> Result<(), RemoteError>;

    /// Finds the remote item for a task, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn get_task(&self, task: &Task) -> Result<Option<RemoteTaskRef>, RemoteError>;

    /// Creates a remote item and returns its human-facing reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be created.
    fn add_task(&self, task: &Task, draft: &RemoteTaskDraft) -> Result<String, RemoteError>;

    /// Moves a remote item to the status matching `status`.
    ///
    /// `NA` is treated as done.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be updated.
    fn update_task_status(
        &self,
        remote: &RemoteTaskRef,
        status: TaskStatus,
    ) -> Result<(), RemoteError>;

    /// Removes a remote item. Only called when
    /// [`supports_delete`](AlmConnector::supports_delete) is `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove_task(&self, remote: &RemoteTaskRef) -> Result<Removal, RemoteError>;

    /// Whether the tool allows deleting items.
    fn supports_delete(&self) -> bool;

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool reports a failure while closing.
    fn disconnect(&mut self) -> Result<(), RemoteError>;
}

impl<T: AlmConnector + ?Sized> AlmConnector for Box<T> {
    fn alm_name(&self) -> &str {
        (**self).alm_name()
    }

    fn connect_server(&mut self) -> Result<(), RemoteError> {
        (**self).connect_server()
    }

    fn connect_project(&mut self) -> Result<(), RemoteError> {
        (**self).connect_project()
    }

    fn get_task(&self, task: &Task) -> Result<Option<RemoteTaskRef>, RemoteError> {
        (**self).get_task(task)
    }

    fn add_task(&self, task: &Task, draft: &RemoteTaskDraft) -> Result<String, RemoteError> {
        (**self).add_task(task, draft)
    }

    fn update_task_status(
        &self,
        remote: &RemoteTaskRef,
        status: TaskStatus,
    ) -> Result<(), RemoteError> {
        (**self).update_task_status(remote, status)
    }

    fn remove_task(&self, remote: &RemoteTaskRef) -> Result<Removal, RemoteError> {
        (**self).remove_task(remote)
    }

    fn supports_delete(&self) -> bool {
        (**self).supports_delete()
    }

    fn disconnect(&mut self) -> Result<(), RemoteError> {
        (**self).disconnect()
    }
}
