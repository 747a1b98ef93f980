//! Live task source backed by the SD Elements REST API (v2).

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http;
use crate::error::RemoteError;
use crate::model::{HowTo, Task, TaskStatus};
use crate::ports::TaskSource;

/// Query expanding the fields a [`Task`] is built from.
const TASK_QUERY: &str = "?expand=phase,status&include=how_tos";

/// Task source reading tasks of one SD Elements project.
pub struct SdeTaskSource {
    client: Client,
    server: String,
    project_id: u64,
    api_token: String,
    connected: bool,
}

impl SdeTaskSource {
    /// Creates a source for `project_id` on `server`, authenticating with `api_token`.
    #[must_use]
    pub fn new(server: &str, project_id: u64, api_token: &str) -> Self {
        Self {
            client: http::client(),
            server: server.to_string(),
            project_id,
            api_token: api_token.to_string(),
            connected: false,
        }
    }

    fn project_url(&self, rest: &str) -> String {
        let path = format!("api/v2/projects/{}/{rest}", self.project_id);
        http::join(&self.server, &path)
    }

    fn task_url(&self, id: &str, rest: &str) -> String {
        self.project_url(&format!("tasks/{id}/{rest}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Token {}", self.api_token))
    }
}

#[derive(Deserialize)]
struct TaskPage {
    results: Vec<ApiTask>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct ApiTask {
    id: String,
    title: String,
    phase: ApiPhase,
    priority: u8,
    status: ApiStatus,
    updated: DateTime<Utc>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    how_tos: Vec<ApiHowTo>,
}

#[derive(Deserialize)]
struct ApiPhase {
    slug: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    meaning: String,
}

#[derive(Deserialize)]
struct ApiHowTo {
    title: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct NewNote<'a> {
    text: &'a str,
    tags: [&'a str; 1],
}

impl TryFrom<ApiTask> for Task {
    type Error = RemoteError;

    fn try_from(api: ApiTask) -> Result<Self, Self::Error> {
        let status = api
            .status
            .meaning
            .parse::<TaskStatus>()
            .map_err(|e| RemoteError::new(format!("task {}: {e}", api.id)))?;
        Ok(Task {
            id: api.id,
            title: api.title,
            phase: api.phase.slug,
            priority: api.priority,
            status,
            updated: api.updated,
            content: api.text,
            how_tos: api
                .how_tos
                .into_iter()
                .map(|h| HowTo {
                    title: h.title,
                    body: h.text,
                })
                .collect(),
        })
    }
}

impl TaskSource for SdeTaskSource {
    fn connect(&mut self) -> Result<(), RemoteError> {
        if self.connected {
            return Ok(());
        }
        let url = self.project_url("");
        http::check(self.authorized(self.client.get(&url)).send()?)?;
        self.connected = true;
        debug!(project = self.project_id, "connected to SD Elements");
        Ok(())
    }

    fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let mut tasks = Vec::new();
        let mut url = Some(format!("{}{TASK_QUERY}", self.project_url("tasks/")));
        while let Some(page_url) = url {
            let page: TaskPage = http::json(self.authorized(self.client.get(&page_url)).send()?)?;
            for api in page.results {
                tasks.push(Task::try_from(api)?);
            }
            url = page.next;
        }
        Ok(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Task, RemoteError> {
        let url = format!("{}{TASK_QUERY}", self.task_url(id, ""));
        let api: ApiTask = http::json(self.authorized(self.client.get(&url)).send()?)?;
        Task::try_from(api)
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), RemoteError> {
        let body = StatusUpdate {
            status: status.as_str(),
        };
        let request = self.client.patch(self.task_url(id, "")).json(&body);
        http::check(self.authorized(request).send()?)?;
        Ok(())
    }

    fn add_note(&self, id: &str, message: &str, tag: &str) -> Result<(), RemoteError> {
        let body = NewNote {
            text: message,
            tags: [tag],
        };
        let request = self.client.post(self.task_url(id, "notes/")).json(&body);
        http::check(self.authorized(request).send()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK_JSON: &str = r#"{
        "id": "1042-T21",
        "title": "Validate all input",
        "phase": {"slug": "requirements", "name": "Requirements"},
        "priority": 8,
        "status": {"meaning": "DONE", "name": "Complete"},
        "updated": "2024-03-01T12:00:00Z",
        "text": "Reject malformed input at the boundary.",
        "how_tos": [{"title": "Java", "text": "Use Bean Validation."}]
    }"#;

    #[test]
    fn api_task_converts_to_task() {
        let api: ApiTask = serde_json::from_str(TASK_JSON).unwrap();
        let task = Task::try_from(api).unwrap();
        assert_eq!(task.id, "1042-T21");
        assert_eq!(task.phase, "requirements");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.how_tos[0].body, "Use Bean Validation.");
        assert_eq!(task.updated.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn unknown_status_meaning_is_rejected() {
        let json = TASK_JSON.replace("\"DONE\"", "\"PARTIAL\"");
        let api: ApiTask = serde_json::from_str(&json).unwrap();
        let err = Task::try_from(api).unwrap_err();
        assert!(err.message.contains("1042-T21"));
    }

    #[test]
    fn urls_are_scoped_to_project() {
        let source = SdeTaskSource::new("https://sde.example.com/", 1042, "token");
        assert_eq!(
            source.task_url("1042-T21", "notes/"),
            "https://sde.example.com/api/v2/projects/1042/tasks/1042-T21/notes/"
        );
    }

    #[test]
    fn page_without_next_ends_listing() {
        let page: TaskPage = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(page.results.is_empty());
        assert!(page.next.is_none());
    }
}
