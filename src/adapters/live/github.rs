//! Live ALM connector for GitHub Issues.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::http;
use crate::config::AlmSettings;
use crate::error::RemoteError;
use crate::model::{RemoteStatus, RemoteTaskRef, Removal, Task, TaskStatus};
use crate::ports::{AlmConnector, RemoteTaskDraft};
use crate::sync::marker;

const PER_PAGE: usize = 100;

/// Connector for the issues of one GitHub repository.
pub struct GithubConnector {
    client: Client,
    server: String,
    repo: String,
    api_token: String,
}

impl GithubConnector {
    /// Creates a connector for `owner/repo` from the `alm` settings.
    #[must_use]
    pub fn new(settings: &AlmSettings, api_token: &str) -> Self {
        Self {
            client: http::client(),
            server: settings.server.clone(),
            repo: settings.project.clone(),
            api_token: api_token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        http::join(&self.server, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_token)
            .header("Accept", "application/vnd.github+json")
    }

    fn issues_page(&self, page: usize) -> Result<Vec<ApiIssue>, RemoteError> {
        let url = self.url(&format!(
            "repos/{}/issues?state=all&per_page={PER_PAGE}&page={page}",
            self.repo
        ));
        http::json(self.authorized(self.client.get(&url)).send()?)
    }
}

#[derive(Clone, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    state: String,
    html_url: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    html_url: String,
}

impl ApiIssue {
    fn into_ref(self) -> RemoteTaskRef {
        let status = if self.state == "closed" {
            RemoteStatus::Done
        } else {
            RemoteStatus::Todo
        };
        RemoteTaskRef {
            id: self.number.to_string(),
            native_status: self.state,
            status,
            updated: self.updated_at,
            reference: self.html_url,
        }
    }
}

fn issue_body(draft: &RemoteTaskDraft) -> Value {
    let mut body = Map::new();
    body.insert("title".to_string(), json!(draft.title));
    body.insert("body".to_string(), json!(draft.description));
    if let Some(label) = &draft.priority_label {
        body.insert("labels".to_string(), json!([label]));
    }
    for (name, value) in &draft.custom_fields {
        body.insert(name.clone(), value.clone());
    }
    Value::Object(body)
}

fn state_for(status: TaskStatus) -> &'static str {
    if status.is_done() {
        "closed"
    } else {
        "open"
    }
}

impl AlmConnector for GithubConnector {
    fn alm_name(&self) -> &'static str {
        "GitHub"
    }

    fn connect_server(&mut self) -> Result<(), RemoteError> {
        let url = self.url("user");
        http::check(self.authorized(self.client.get(&url)).send()?)?;
        debug!(server = %self.server, "GitHub token accepted");
        Ok(())
    }

    fn connect_project(&mut self) -> Result<(), RemoteError> {
        let url = self.url(&format!("repos/{}", self.repo));
        http::check(self.authorized(self.client.get(&url)).send()?)?;
        Ok(())
    }

    fn get_task(&self, task: &Task) -> Result<Option<RemoteTaskRef>, RemoteError> {
        let mut page = 1;
        loop {
            let issues = self.issues_page(page)?;
            let last_page = issues.len() < PER_PAGE;
            let issues: Vec<ApiIssue> = issues
                .into_iter()
                .filter(|issue| issue.pull_request.is_none())
                .collect();
            let found = marker::find_matching(task, &issues, |issue| issue.title.as_str());
            if let Some(issue) = found {
                return Ok(Some(issue.clone().into_ref()));
            }
            if last_page {
                return Ok(None);
            }
            page += 1;
        }
    }

    fn add_task(&self, _task: &Task, draft: &RemoteTaskDraft) -> Result<String, RemoteError> {
        let url = self.url(&format!("repos/{}/issues", self.repo));
        let request = self.client.post(&url).json(&issue_body(draft));
        let created: CreatedIssue = http::json(self.authorized(request).send()?)?;
        Ok(created.html_url)
    }

    fn update_task_status(
        &self,
        remote: &RemoteTaskRef,
        status: TaskStatus,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!("repos/{}/issues/{}", self.repo, remote.id));
        let body = json!({ "state": state_for(status) });
        let request = self.client.patch(&url).json(&body);
        http::check(self.authorized(request).send()?)?;
        Ok(())
    }

    fn remove_task(&self, remote: &RemoteTaskRef) -> Result<Removal, RemoteError> {
        let message = format!("GitHub issues cannot be deleted (issue #{})", remote.id);
        Err(RemoteError::new(message))
    }

    fn supports_delete(&self) -> bool {
        false
    }

    fn disconnect(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }
}
