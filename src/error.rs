//! Error types for synchronization runs.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;

/// A failed call against a remote system (task source or ALM tool).
///
/// `code` carries the HTTP status when the failure came from a response;
/// transport failures and local decode errors leave it empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status code, when one was received.
    pub code: Option<u16>,
    /// Message reported by the remote system or the transport.
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "remote error ({code}): {}", self.message),
            None => write!(f, "remote error: {}", self.message),
        }
    }
}

impl RemoteError {
    /// Creates an error with an HTTP status code.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Creates an error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Errors that abort a synchronization run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid configuration, detected before any connection is attempted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not reach or authenticate against a system.
    #[error("could not connect to {system}: {source}")]
    Connectivity {
        /// Name of the system that failed (`"task source"`, `"JIRA server"`, ...).
        system: String,
        /// Underlying remote failure.
        #[source]
        source: RemoteError,
    },

    /// A remote call failed while reconciling.
    #[error("{operation} failed for task {task_id}: {source}")]
    Remote {
        /// The operation that failed (`"add_task"`, `"remove_task"`, ...).
        operation: &'static str,
        /// Task being processed; `"*"` for calls that are not task-specific.
        task_id: String,
        /// Underlying remote failure.
        #[source]
        source: RemoteError,
    },
}

impl SyncError {
    pub(crate) fn connectivity(system: impl Into<String>, source: RemoteError) -> Self {
        Self::Connectivity {
            system: system.into(),
            source,
        }
    }

    pub(crate) fn remote(
        operation: &'static str,
        task_id: impl Into<String>,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            operation,
            task_id: task_id.into(),
            source,
        }
    }

    /// Returns `true` for failures raised after connecting, while reconciling.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
