//! Settings file loading.
//!
//! The settings file is YAML with `sde`, `alm` and `sync` sections.
//! Credentials never come from the file: they are read from `SDE_API_TOKEN`,
//! `ALM_USER` and `ALM_API_TOKEN` (a `.env` file is honored by the binary).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::{ConfigError, SyncConfig, SyncOptions};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "ALMSYNC_CONFIG";
/// Settings file used when neither `--config` nor `ALMSYNC_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "almsync.yaml";

const SDE_TOKEN_ENV: &str = "SDE_API_TOKEN";
const ALM_USER_ENV: &str = "ALM_USER";
const ALM_TOKEN_ENV: &str = "ALM_API_TOKEN";

/// Supported ALM tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlmTool {
    /// Atlassian JIRA.
    Jira,
    /// GitHub Issues.
    Github,
}

impl FromStr for AlmTool {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jira" => Ok(Self::Jira),
            "github" => Ok(Self::Github),
            _ => Err(ConfigError::UnknownTool(s.to_string())),
        }
    }
}

impl fmt::Display for AlmTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jira => "JIRA",
            Self::Github => "GitHub",
        })
    }
}

/// Connection settings for the task source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdeSettings {
    /// Base URL (e.g. `https://sde.example.com`).
    pub server: String,
    /// Project whose tasks are synchronized.
    pub project_id: u64,
    /// API token, read from `SDE_API_TOKEN`.
    #[serde(skip)]
    pub api_token: Option<String>,
}

/// Connection settings for the ALM tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlmSettings {
    /// `jira` or `github`.
    pub tool: String,
    /// Base URL of the tool's API (e.g. `https://jira.example.com`,
    /// `https://api.github.com`).
    pub server: String,
    /// JIRA project key or GitHub `owner/repo`.
    pub project: String,
    /// Issue type used when creating JIRA issues.
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    /// Transition that moves an issue to done.
    #[serde(default = "default_done_transition")]
    pub done_transition: String,
    /// Transition that reopens an issue.
    #[serde(default = "default_reopen_transition")]
    pub reopen_transition: String,
    /// Login, read from `ALM_USER`.
    #[serde(skip)]
    pub user: Option<String>,
    /// Password or API token, read from `ALM_API_TOKEN`.
    #[serde(skip)]
    pub api_token: Option<String>,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_done_transition() -> String {
    "Done".to_string()
}

fn default_reopen_transition() -> String {
    "Reopen".to_string()
}

impl AlmSettings {
    /// Parses the configured tool name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTool`] for unsupported tools.
    pub fn tool(&self) -> Result<AlmTool, ConfigError> {
        self.tool.parse()
    }
}

/// Contents of the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Task source connection.
    pub sde: SdeSettings,
    /// ALM tool connection.
    pub alm: AlmSettings,
    /// Synchronization options.
    #[serde(default)]
    pub sync: SyncOptions,
}

impl Settings {
    /// Reads and parses a settings file, then fills credentials from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Parses settings from YAML without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the document does not match the layout.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Fills credentials using the given variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.sde.api_token = lookup(SDE_TOKEN_ENV).or_else(|| self.sde.api_token.take());
        self.alm.user = lookup(ALM_USER_ENV).or_else(|| self.alm.user.take());
        self.alm.api_token = lookup(ALM_TOKEN_ENV).or_else(|| self.alm.api_token.take());
    }

    /// Validates the `sync` section and the tool name.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option.
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        self.alm.tool()?;
        SyncConfig::from_options(&self.sync)
    }
}

/// Resolves the settings file path: explicit flag, then `ALMSYNC_CONFIG`,
/// then `almsync.yaml` in the working directory.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var(CONFIG_ENV).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConflictPolicy;

    const SAMPLE: &str = r#"
sde:
  server: https://sde.example.com
  project_id: 1042
alm:
  tool: jira
  server: https://jira.example.com
  project: SEC
sync:
  alm_phases: [requirements, development]
  sde_min_priority: 6
  conflict_policy: sde
  alm_priority_map:
    "1-4": Low
    "5-7": Medium
    "8-10": High
"#;

    #[test]
    fn parses_sample_settings() {
        let settings = Settings::from_yaml(SAMPLE).unwrap();
        assert_eq!(settings.sde.project_id, 1042);
        assert_eq!(settings.alm.tool().unwrap(), AlmTool::Jira);
        assert_eq!(settings.alm.issue_type, "Task");
        assert_eq!(settings.alm.done_transition, "Done");

        let config = settings.sync_config().unwrap();
        assert_eq!(config.sde_min_priority, 6);
        assert_eq!(config.conflict_policy, ConflictPolicy::Sde);
        assert_eq!(config.priority_map.unwrap().label_for(9), "High");
    }

    #[test]
    fn sync_section_is_optional() {
        let yaml = "sde: {server: s, project_id: 1}\n\
                    alm: {tool: github, server: g, project: o/r}\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.sync, SyncOptions::default());
    }

    #[test]
    fn credentials_come_from_env_lookup() {
        let mut settings = Settings::from_yaml(SAMPLE).unwrap();
        settings.apply_env(|key| match key {
            "SDE_API_TOKEN" => Some("sde-token".to_string()),
            "ALM_USER" => Some("alice".to_string()),
            "ALM_API_TOKEN" => Some("alm-token".to_string()),
            _ => None,
        });
        assert_eq!(settings.sde.api_token.as_deref(), Some("sde-token"));
        assert_eq!(settings.alm.user.as_deref(), Some("alice"));
        assert_eq!(settings.alm.api_token.as_deref(), Some("alm-token"));
    }

    #[test]
    fn credentials_in_file_are_rejected() {
        let yaml = "sde: {server: s, project_id: 1, api_token: x}\n\
                    alm: {tool: jira, server: j, project: P}\n";
        assert!(Settings::from_yaml(yaml).is_err());
    }

    #[test]
    fn unknown_tool_is_a_config_error() {
        let yaml = "sde: {server: s, project_id: 1}\n\
                    alm: {tool: mingle, server: m, project: P}\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        let result = settings.sync_config();
        assert!(matches!(result, Err(ConfigError::UnknownTool(t)) if t == "mingle"));
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("almsync_settings_missing.yaml");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(Settings::load(&path), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn config_path_prefers_explicit_flag() {
        let explicit = Path::new("/etc/almsync/prod.yaml");
        assert_eq!(
            config_path(Some(explicit)),
            PathBuf::from("/etc/almsync/prod.yaml")
        );
    }
}
