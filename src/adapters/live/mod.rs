//! Live adapters for real external services.

pub mod github;
mod http;
pub mod jira;
pub mod sde;

pub use github::GithubConnector;
pub use jira::JiraConnector;
pub use sde::SdeTaskSource;
