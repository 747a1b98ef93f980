//! Task source port: the system of record for security tasks.

use crate::error::RemoteError;
use crate::model::{Task, TaskStatus};

/// Provides the authoritative task list and accepts status changes and notes.
pub trait TaskSource: Send {
    /// Establishes the session. Calling it again on a connected source is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or rejects the credentials.
    fn connect(&mut self) -> Result<(), RemoteError>;

    /// Returns every task of the configured project, in source order.
    ///
    /// # Errors
    ///
    /// Returns an error if the task list cannot be fetched.
    fn get_tasks(&self) -> Result<Vec<Task>, RemoteError>;

    /// Returns a single task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or cannot be fetched.
    fn get_task(&self, id: &str) -> Result<Task, RemoteError>;

    /// Sets the status of a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be updated.
    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), RemoteError>;

    /// Appends a note to a task. `tag` groups notes written by this tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the note cannot be stored.
    fn add_note(&self, id: &str, message: &str, tag: &str) -> Result<(), RemoteError>;
}

impl<T: TaskSource + ?Sized> TaskSource for Box<T> {
    fn connect(&mut self) -> Result<(), RemoteError> {
        (**self).connect()
    }

    fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        (**self).get_tasks()
    }

    fn get_task(&self, id: &str) -> Result<Task, RemoteError> {
        (**self).get_task(id)
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), RemoteError> {
        (**self).update_task_status(id, status)
    }

    fn add_note(&self, id: &str, message: &str, tag: &str) -> Result<(), RemoteError> {
        (**self).add_note(id, message, tag)
    }
}
