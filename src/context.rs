//! Service context bundling the two port trait objects.

use crate::adapters::live::{GithubConnector, JiraConnector, SdeTaskSource};
use crate::config::{AlmTool, ConfigError, Settings};
use crate::ports::{AlmConnector, TaskSource};

/// Bundles the task source and the ALM connector a run works against.
///
/// Constructors wire up different adapter implementations (live, in-memory).
pub struct ServiceContext {
    /// Where tasks come from.
    pub source: Box<dyn TaskSource>,
    /// Where remote items live.
    pub alm: Box<dyn AlmConnector>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(source: Box<dyn TaskSource>, alm: Box<dyn AlmConnector>) -> Self {
        Self { source, alm }
    }

    /// Creates a live context from loaded settings.
    ///
    /// The ALM tool is selected here, once; nothing downstream branches on it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTool`] for an unsupported tool and
    /// [`ConfigError::Missing`] when a required credential is absent.
    pub fn live(settings: &Settings) -> Result<Self, ConfigError> {
        let sde_token = required(settings.sde.api_token.as_deref(), "SDE_API_TOKEN")?;
        let source = SdeTaskSource::new(&settings.sde.server, settings.sde.project_id, sde_token);

        let alm_token = required(settings.alm.api_token.as_deref(), "ALM_API_TOKEN")?;
        let alm: Box<dyn AlmConnector> = match settings.alm.tool()? {
            AlmTool::Jira => {
                let user = required(settings.alm.user.as_deref(), "ALM_USER")?;
                Box::new(JiraConnector::new(&settings.alm, user, alm_token))
            }
            AlmTool::Github => Box::new(GithubConnector::new(&settings.alm, alm_token)),
        };

        Ok(Self::new(Box::new(source), alm))
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
    value.ok_or(ConfigError::Missing(name))
}
