//! Tasks as held by the task source.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task on the task-source side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Not yet addressed.
    Todo,
    /// Implemented.
    Done,
    /// Not applicable to the project.
    Na,
}

impl TaskStatus {
    /// Returns `true` for every status other than `TODO`.
    ///
    /// Both `DONE` and `NA` count as finished when compared with a remote item.
    #[must_use]
    pub fn is_done(self) -> bool {
        self != Self::Todo
    }

    /// Returns the wire name (`"TODO"`, `"DONE"`, `"NA"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Done => "DONE",
            Self::Na => "NA",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODO" => Ok(Self::Todo),
            "DONE" => Ok(Self::Done),
            "NA" => Ok(Self::Na),
            other => Err(format!("unknown task status: {other} (expected TODO, DONE or NA)")),
        }
    }
}

/// A sub-implementation ("how-to") attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HowTo {
    /// Short heading.
    pub title: String,
    /// Implementation guidance.
    pub body: String,
}

/// A security-requirement task from the task source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier with a numeric suffix (e.g. `"1042-T21"`).
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Phase slug (e.g. `"requirements"`).
    pub phase: String,
    /// Priority from 1 (lowest) to 10 (highest).
    pub priority: u8,
    /// Current status.
    pub status: TaskStatus,
    /// Time of the last change on the task-source side.
    pub updated: DateTime<Utc>,
    /// Free-form task description.
    #[serde(default)]
    pub content: String,
    /// Optional sub-implementations.
    #[serde(default)]
    pub how_tos: Vec<HowTo>,
}

impl Task {
    /// The segment after the last `-` in the id (`"1042-T21"` → `"T21"`).
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.rsplit('-').next().unwrap_or(&self.id)
    }

    /// The trailing decimal digits of the id (`"1042-T21"` → `21`).
    ///
    /// Returns `None` when the id does not end in a digit.
    #[must_use]
    pub fn number(&self) -> Option<u32> {
        trailing_number(&self.id)
    }
}

/// Parses the trailing decimal digits of an identifier (`"T21"` → `21`).
pub(crate) fn trailing_number(id: &str) -> Option<u32> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)?;
    id[digits_start..].parse().ok()
}
