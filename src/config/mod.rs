//! Synchronization options and their validation.
//!
//! [`SyncOptions`] is the loosely-typed form read from the settings file;
//! [`SyncConfig::from_options`] checks every value and produces the typed
//! configuration handed to the engine. All checks run before any connection
//! is attempted.

pub mod priority_map;
pub mod settings;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{trailing_number, TaskStatus};
pub use priority_map::{PriorityMap, PriorityMapError, MAX_PRIORITY, MIN_PRIORITY};
pub use settings::{
    config_path, AlmSettings, AlmTool, SdeSettings, Settings, CONFIG_ENV, DEFAULT_CONFIG_FILE,
};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The priority map does not partition 1..=10.
    #[error("invalid alm_priority_map: {0}")]
    PriorityMap(#[from] PriorityMapError),

    /// `conflict_policy` is not one of `alm`, `sde`, `timestamp`.
    #[error("unknown conflict_policy {0:?}: expected alm, sde or timestamp")]
    UnknownConflictPolicy(String),

    /// `sde_min_priority` is outside 1..=10.
    #[error("sde_min_priority must be between 1 and 10, got {0}")]
    MinPriority(i64),

    /// An entry of `sde_statuses_in_scope` is not a task status.
    #[error("invalid sde_statuses_in_scope entry: {0}")]
    UnknownStatus(String),

    /// An entry of `selected_tasks` has no numeric suffix.
    #[error("invalid selected_tasks entry {0:?}: expected a task id such as T21")]
    InvalidSelectedTask(String),

    /// `test_connection` is not `server` or `project`.
    #[error("unknown test_connection {0:?}: expected server or project")]
    UnknownTestConnection(String),

    /// The configured ALM tool is not supported.
    #[error("unknown ALM tool {0:?}: expected jira or github")]
    UnknownTool(String),

    /// A required setting is absent from the file and the environment.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid YAML for the expected layout.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Which side wins when both sides hold a task with diverging status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The ALM tool always wins.
    #[default]
    Alm,
    /// The task source always wins.
    Sde,
    /// The most recently changed side wins; ties go to the ALM tool.
    Timestamp,
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alm" => Ok(Self::Alm),
            "sde" => Ok(Self::Sde),
            "timestamp" => Ok(Self::Timestamp),
            _ => Err(ConfigError::UnknownConflictPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alm => "alm",
            Self::Sde => "sde",
            Self::Timestamp => "timestamp",
        })
    }
}

/// Stop a run right after connecting, without reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestConnection {
    /// Stop after the ALM server connection succeeds.
    Server,
    /// Stop after the ALM project connection succeeds.
    Project,
}

impl FromStr for TestConnection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "project" => Ok(Self::Project),
            _ => Err(ConfigError::UnknownTestConnection(s.to_string())),
        }
    }
}

/// Synchronization options as written in the `sync:` section of the
/// settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncOptions {
    /// Phase slugs whose tasks are synchronized.
    pub alm_phases: Vec<String>,
    /// Task statuses for which missing remote items are created.
    pub sde_statuses_in_scope: Vec<String>,
    /// Minimum task priority to synchronize.
    pub sde_min_priority: i64,
    /// Explicit task list; overrides phase and priority scoping.
    pub selected_tasks: Vec<String>,
    /// `alm`, `sde` or `timestamp`.
    pub conflict_policy: String,
    /// Delete and recreate remote items.
    pub start_fresh: bool,
    /// Push status changes between the two systems.
    pub alm_standard_workflow: bool,
    /// Extra fields passed through to the ALM tool on create.
    pub alm_custom_fields: BTreeMap<String, serde_json::Value>,
    /// Priority → ALM label map with `"n"` or `"lo-hi"` keys.
    pub alm_priority_map: Option<BTreeMap<String, String>>,
    /// Include how-to content in created remote items.
    pub how_tos_in_scope: bool,
    /// `server` or `project` to only test connectivity.
    pub test_connection: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            alm_phases: vec![
                "requirements".to_string(),
                "architecture-design".to_string(),
                "development".to_string(),
            ],
            sde_statuses_in_scope: vec!["TODO".to_string()],
            sde_min_priority: 7,
            selected_tasks: Vec::new(),
            conflict_policy: "alm".to_string(),
            start_fresh: false,
            alm_standard_workflow: true,
            alm_custom_fields: BTreeMap::new(),
            alm_priority_map: None,
            how_tos_in_scope: false,
            test_connection: None,
        }
    }
}

/// Validated synchronization configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Phase slugs in scope.
    pub alm_phases: BTreeSet<String>,
    /// Statuses for which missing remote items are created.
    pub sde_statuses_in_scope: BTreeSet<TaskStatus>,
    /// Minimum priority in scope (1..=10).
    pub sde_min_priority: u8,
    /// Task numbers selected explicitly; empty means phase/priority scoping.
    pub selected_tasks: BTreeSet<u32>,
    /// Conflict tie-break rule.
    pub conflict_policy: ConflictPolicy,
    /// Delete and recreate remote items.
    pub start_fresh: bool,
    /// Push status changes between the two systems.
    pub alm_standard_workflow: bool,
    /// Extra fields passed through to the ALM tool on create.
    pub alm_custom_fields: BTreeMap<String, serde_json::Value>,
    /// Validated priority map.
    pub priority_map: Option<PriorityMap>,
    /// Include how-to content in created remote items.
    pub how_tos_in_scope: bool,
    /// Stop after connecting, when set.
    pub test_connection: Option<TestConnection>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let options = SyncOptions::default();
        Self {
            alm_phases: options.alm_phases.into_iter().collect(),
            sde_statuses_in_scope: BTreeSet::from([TaskStatus::Todo]),
            sde_min_priority: 7,
            selected_tasks: BTreeSet::new(),
            conflict_policy: ConflictPolicy::Alm,
            start_fresh: false,
            alm_standard_workflow: true,
            alm_custom_fields: BTreeMap::new(),
            priority_map: None,
            how_tos_in_scope: false,
            test_connection: None,
        }
    }
}

impl SyncConfig {
    /// Validates raw options.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for the first invalid value.
    pub fn from_options(options: &SyncOptions) -> Result<Self, ConfigError> {
        let sde_min_priority = u8::try_from(options.sde_min_priority)
            .ok()
            .filter(|p| (MIN_PRIORITY..=MAX_PRIORITY).contains(p))
            .ok_or(ConfigError::MinPriority(options.sde_min_priority))?;

        let sde_statuses_in_scope = options
            .sde_statuses_in_scope
            .iter()
            .map(|s| s.parse::<TaskStatus>().map_err(ConfigError::UnknownStatus))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let selected_tasks = options
            .selected_tasks
            .iter()
            .map(|id| {
                trailing_number(id.trim())
                    .ok_or_else(|| ConfigError::InvalidSelectedTask(id.clone()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let priority_map = options
            .alm_priority_map
            .as_ref()
            .map(PriorityMap::parse)
            .transpose()?;

        let test_connection = options
            .test_connection
            .as_deref()
            .map(str::parse::<TestConnection>)
            .transpose()?;

        let alm_phases = options
            .alm_phases
            .iter()
            .map(|p| p.trim().to_string())
            .collect();

        Ok(Self {
            alm_phases,
            sde_statuses_in_scope,
            sde_min_priority,
            selected_tasks,
            conflict_policy: options.conflict_policy.parse()?,
            start_fresh: options.start_fresh,
            alm_standard_workflow: options.alm_standard_workflow,
            alm_custom_fields: options.alm_custom_fields.clone(),
            priority_map,
            how_tos_in_scope: options.how_tos_in_scope,
            test_connection,
        })
    }
}
