//! Live ALM connector for JIRA (REST API 2).

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

const MAX_SEARCH_RESULTS: usize = 50;

/// Connector for one JIRA project.
pub struct JiraConnector {
    client: Client,
    server: String,
    project_key: String,
    user: String,
    api_token: String,
    issue_type: String,
    done_transition: String,
    reopen_transition: String,
}

impl JiraConnector {
    /// Creates a connector from the `alm` settings and credentials.
    #[must_use]
    pub fn new(settings: &AlmSettings, user: &str, api_token: &str) -> Self {
        Self {
            client: http::client(),
            server: settings.server.clone(),
            project_key: settings.project.clone(),
            user: user.to_string(),
            api_token: api_token.to_string(),
            issue_type: settings.issue_type.clone(),
            done_transition: settings.done_transition.clone(),
            reopen_transition: settings.reopen_transition.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        http::join(&self.server, &format!("rest/api/2/{path}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.api_token))
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>, RemoteError> {
        let url = self.url(&format!("issue/{key}/transitions"));
        let list: TransitionList = http::json(self.authorized(self.client.get(&url)).send()?)?;
        Ok(list.transitions)
    }

    fn search(&self, jql: &str, start_at: usize) -> Result<SearchResult, RemoteError> {
        let body = json!({
            "jql": jql,
            "fields": ["summary", "status", "updated"],
            "startAt": start_at,
            "maxResults": MAX_SEARCH_RESULTS,
        });
        let request = self.client.post(self.url("search")).json(&body);
        http::json(self.authorized(request).send()?)
    }
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(rename = "startAt", default)]
    start_at: usize,
    #[serde(default)]
    total: usize,
    issues: Vec<ApiIssue>,
}

impl SearchResult {
    /// Offset of the next page, `None` once the result set is exhausted.
    fn next_start(&self) -> Option<usize> {
        let next = self.start_at + self.issues.len();
        (!self.issues.is_empty() && next < self.total).then_some(next)
    }
}

#[derive(Deserialize)]
struct ApiIssue {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: String,
    status: ApiStatus,
    updated: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    name: String,
    #[serde(rename = "statusCategory")]
    category: StatusCategory,
}

#[derive(Deserialize)]
struct StatusCategory {
    key: String,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Deserialize)]
struct TransitionList {
    transitions: Vec<Transition>,
}

#[derive(Deserialize)]
struct Transition {
    id: String,
    name: String,
}

/// JQL narrowing the search to summaries containing the task's marker.
fn marker_jql(project_key: &str, task: &Task) -> String {
    let key = project_key.replace('"', r#"\""#);
    let short_id = task.short_id();
    format!(r#"project = "{key}" AND summary ~ "\"{short_id}\"""#)
}

/// Parses JIRA's `2024-03-01T12:00:00.000+0000` timestamps.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RemoteError> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RemoteError::new(format!("invalid JIRA timestamp {raw:?}: {e}")))
}

fn to_ref(issue: ApiIssue, server: &str) -> Result<RemoteTaskRef, RemoteError> {
    let category = &issue.fields.status.category.key;
    let status = if category.eq_ignore_ascii_case("done") {
        RemoteStatus::Done
    } else {
        RemoteStatus::Todo
    };
    Ok(RemoteTaskRef {
        reference: http::join(server, &format!("browse/{}", issue.key)),
        id: issue.key,
        native_status: issue.fields.status.name,
        status,
        updated: parse_timestamp(&issue.fields.updated)?,
    })
}

fn pick_transition<'a>(transitions: &'a [Transition], name: &str) -> Option<&'a Transition> {
    transitions
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

fn issue_fields(project_key: &str, issue_type: &str, draft: &RemoteTaskDraft) -> Value {
    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": project_key }));
    fields.insert("summary".to_string(), json!(draft.title));
    fields.insert("description".to_string(), json!(draft.description));
    fields.insert("issuetype".to_string(), json!({ "name": issue_type }));
    if let Some(label) = &draft.priority_label {
        fields.insert("priority".to_string(), json!({ "name": label }));
    }
    for (name, value) in &draft.custom_fields {
        fields.insert(name.clone(), value.clone());
    }
    json!({ "fields": fields })
}

impl AlmConnector for JiraConnector {
    fn alm_name(&self) -> &'static str {
        "JIRA"
    }

    fn connect_server(&mut self) -> Result<(), RemoteError> {
        let url = self.url("myself");
        http::check(self.authorized(self.client.get(&url)).send()?)?;
        debug!(server = %self.server, "JIRA login accepted");
        Ok(())
    }

    fn connect_project(&mut self) -> Result<(), RemoteError> {
        let url = self.url(&format!("project/{}", self.project_key));
        http::check(self.authorized(self.client.get(&url)).send()?)?;
        Ok(())
    }

    fn get_task(&self, task: &Task) -> Result<Option<RemoteTaskRef>, RemoteError> {
        let jql = marker_jql(&self.project_key, task);
        let mut start_at = 0;
        loop {
            let page = self.search(&jql, start_at)?;
            let next = page.next_start();
            let found = page
                .issues
                .into_iter()
                .find(|issue| marker::is_marker_for(task, &issue.fields.summary));
            if let Some(issue) = found {
                return to_ref(issue, &self.server).map(Some);
            }
            match next {
                Some(next) => start_at = next,
                None => return Ok(None),
            }
        }
    }

    fn add_task(&self, _task: &Task, draft: &RemoteTaskDraft) -> Result<String, RemoteError> {
        let body = issue_fields(&self.project_key, &self.issue_type, draft);
        let request = self.client.post(self.url("issue")).json(&body);
        let created: CreatedIssue = http::json(self.authorized(request).send()?)?;
        Ok(created.key)
    }

    fn update_task_status(
        &self,
        remote: &RemoteTaskRef,
        status: TaskStatus,
    ) -> Result<(), RemoteError> {
        let wanted = if status.is_done() {
            &self.done_transition
        } else {
            &self.reopen_transition
        };
        let transitions = self.transitions(&remote.id)?;
        let Some(transition) = pick_transition(&transitions, wanted) else {
            let id = &remote.id;
            let message = format!("no transition named {wanted:?} available for {id}");
            return Err(RemoteError::new(message));
        };
        let url = self.url(&format!("issue/{}/transitions", remote.id));
        let body = json!({ "transition": { "id": transition.id } });
        let request = self.client.post(&url).json(&body);
        http::check(self.authorized(request).send()?)?;
        Ok(())
    }

    fn remove_task(&self, remote: &RemoteTaskRef) -> Result<Removal, RemoteError> {
        let url = self.url(&format!("issue/{}", remote.id));
        match http::check(self.authorized(self.client.delete(&url)).send()?) {
            Ok(_) => Ok(Removal::Deleted),
            Err(err) if err.code == Some(403) => Ok(Removal::Retained {
                reason: err.message,
            }),
            Err(err) => Err(err),
        }
    }

    fn supports_delete(&self) -> bool {
        true
    }

    fn disconnect(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }
}
