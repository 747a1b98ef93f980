//! In-memory task source and ALM tool.
//!
//! Both adapters record every call in order so callers can assert on the
//! exact sequence a run produced. Failures can be injected per operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::RemoteError;
use crate::model::{RemoteStatus, RemoteTaskRef, Removal, Task, TaskStatus};
use crate::ports::{AlmConnector, RemoteTaskDraft, TaskSource};
use crate::sync::marker;

/// A call received by [`MemoryAlm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlmCall {
    /// `connect_server()`.
    ConnectServer,
    /// `connect_project()`.
    ConnectProject,
    /// `get_task()` for a task id.
    GetTask(String),
    /// `add_task()` with the draft title.
    AddTask(String),
    /// `update_task_status()` with remote id and status.
    UpdateStatus(String, TaskStatus),
    /// `remove_task()` with the remote id.
    RemoveTask(String),
    /// `disconnect()`.
    Disconnect,
}

impl AlmCall {
    /// Returns `true` for calls that change remote state.
    #[must_use]
    pub fn is_state_changing(&self) -> bool {
        matches!(
            self,
            Self::AddTask(_) | Self::UpdateStatus(..) | Self::RemoveTask(_)
        )
    }
}

/// An item stored by [`MemoryAlm`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryItem {
    /// Remote id (`"MEM-1"`, ...).
    pub id: String,
    /// Title, including the marker for items created by a run.
    pub title: String,
    /// Description.
    pub description: String,
    /// Done / not done.
    pub status: RemoteStatus,
    /// Last change.
    pub updated: DateTime<Utc>,
    /// Priority label from the draft.
    pub priority_label: Option<String>,
    /// Custom fields from the draft.
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct AlmState {
    items: Vec<MemoryItem>,
    calls: Vec<AlmCall>,
    failures: HashMap<&'static str, RemoteError>,
    retained: HashMap<String, String>,
    next_id: u64,
}

/// ALM tool kept in memory.
#[derive(Debug)]
pub struct MemoryAlm {
    name: String,
    supports_delete: bool,
    clock: DateTime<Utc>,
    state: Mutex<AlmState>,
}

impl MemoryAlm {
    /// Creates an empty tool that supports deletion. Every change is stamped
    /// with `clock`.
    #[must_use]
    pub fn new(name: &str, clock: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            supports_delete: true,
            clock,
            state: Mutex::new(AlmState {
                next_id: 1,
                ..AlmState::default()
            }),
        }
    }

    /// Sets whether [`AlmConnector::supports_delete`] reports `true`.
    #[must_use]
    pub fn with_delete_support(mut self, supported: bool) -> Self {
        self.supports_delete = supported;
        self
    }

    /// Stores an item as if someone had created it in the tool, returning its id.
    pub fn insert(&self, title: &str, status: RemoteStatus, updated: DateTime<Utc>) -> String {
        let mut state = self.lock();
        let id = format!("MEM-{}", state.next_id);
        state.next_id += 1;
        state.items.push(MemoryItem {
            id: id.clone(),
            title: title.to_string(),
            description: String::new(),
            status,
            updated,
            priority_label: None,
            custom_fields: BTreeMap::new(),
        });
        id
    }

    /// Changes an item's status outside of a run.
    pub fn set_status(&self, id: &str, status: RemoteStatus, updated: DateTime<Utc>) {
        let mut state = self.lock();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
            item.status = status;
            item.updated = updated;
        }
    }

    /// Makes the next and every later call of `operation` fail.
    pub fn fail_on(&self, operation: &'static str, error: RemoteError) {
        self.lock().failures.insert(operation, error);
    }

    /// Makes `remove_task` keep the item with the given id.
    pub fn retain_on_remove(&self, id: &str, reason: &str) {
        let mut state = self.lock();
        state.retained.insert(id.to_string(), reason.to_string());
    }

    /// Snapshot of stored items.
    #[must_use]
    pub fn items(&self) -> Vec<MemoryItem> {
        self.lock().items.clone()
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AlmCall> {
        self.lock().calls.clone()
    }

    /// Forgets the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AlmState> {
        self.state.lock().expect("memory ALM lock poisoned")
    }

    fn record(&self, operation: &'static str, call: AlmCall) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn to_ref(item: &MemoryItem) -> RemoteTaskRef {
        let native_status = match item.status {
            RemoteStatus::Todo => "open",
            RemoteStatus::Done => "closed",
        };
        RemoteTaskRef {
            id: item.id.clone(),
            native_status: native_status.to_string(),
            status: item.status,
            updated: item.updated,
            reference: format!("memory://{}", item.id),
        }
    }
}

impl AlmConnector for MemoryAlm {
    fn alm_name(&self) -> &str {
        &self.name
    }

    fn connect_server(&mut self) -> Result<(), RemoteError> {
        self.record("connect_server", AlmCall::ConnectServer)
    }

    fn connect_project(&mut self) -> Result<(), RemoteError> {
        self.record("connect_project", AlmCall::ConnectProject)
    }

    fn get_task(&self, task: &Task) -> Result<Option<RemoteTaskRef>, RemoteError> {
        self.record("get_task", AlmCall::GetTask(task.id.clone()))?;
        let state = self.lock();
        let found = marker::find_matching(task, &state.items, |item| item.title.as_str());
        Ok(found.map(Self::to_ref))
    }

    fn add_task(&self, _task: &Task, draft: &RemoteTaskDraft) -> Result<String, RemoteError> {
        self.record("add_task", AlmCall::AddTask(draft.title.clone()))?;
        let mut state = self.lock();
        let id = format!("MEM-{}", state.next_id);
        state.next_id += 1;
        state.items.push(MemoryItem {
            id: id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: RemoteStatus::Todo,
            updated: self.clock,
            priority_label: draft.priority_label.clone(),
            custom_fields: draft.custom_fields.clone(),
        });
        Ok(format!("memory://{id}"))
    }

    fn update_task_status(
        &self,
        remote: &RemoteTaskRef,
        status: TaskStatus,
    ) -> Result<(), RemoteError> {
        let call = AlmCall::UpdateStatus(remote.id.clone(), status);
        self.record("update_task_status", call)?;
        let mut state = self.lock();
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == remote.id)
            .ok_or_else(|| RemoteError::with_code(404, format!("no item {}", remote.id)))?;
        item.status = if status.is_done() {
            RemoteStatus::Done
        } else {
            RemoteStatus::Todo
        };
        item.updated = self.clock;
        Ok(())
    }

    fn remove_task(&self, remote: &RemoteTaskRef) -> Result<Removal, RemoteError> {
        self.record("remove_task", AlmCall::RemoveTask(remote.id.clone()))?;
        let mut state = self.lock();
        if let Some(reason) = state.retained.get(&remote.id) {
            return Ok(Removal::Retained {
                reason: reason.clone(),
            });
        }
        let before = state.items.len();
        state.items.retain(|item| item.id != remote.id);
        if state.items.len() == before {
            return Err(RemoteError::with_code(404, format!("no item {}", remote.id)));
        }
        Ok(Removal::Deleted)
    }

    fn supports_delete(&self) -> bool {
        self.supports_delete
    }

    fn disconnect(&mut self) -> Result<(), RemoteError> {
        self.record("disconnect", AlmCall::Disconnect)
    }
}

/// A note written to [`MemoryTaskSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Task id.
    pub task_id: String,
    /// Note text.
    pub message: String,
    /// Tag supplied by the writer.
    pub tag: String,
}

#[derive(Debug, Default)]
struct SourceState {
    tasks: Vec<Task>,
    notes: Vec<Note>,
    status_updates: Vec<(String, TaskStatus)>,
    failures: HashMap<&'static str, RemoteError>,
    connects: usize,
}

/// Task source kept in memory.
#[derive(Debug)]
pub struct MemoryTaskSource {
    clock: DateTime<Utc>,
    state: Mutex<SourceState>,
}

impl MemoryTaskSource {
    /// Creates a source holding `tasks` in the given order. Status changes
    /// are stamped with `clock`.
    #[must_use]
    pub fn new(tasks: Vec<Task>, clock: DateTime<Utc>) -> Self {
        Self {
            clock,
            state: Mutex::new(SourceState {
                tasks,
                ..SourceState::default()
            }),
        }
    }

    /// Makes every call of `operation` fail.
    pub fn fail_on(&self, operation: &'static str, error: RemoteError) {
        self.lock().failures.insert(operation, error);
    }

    /// Snapshot of the current tasks.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Notes written so far.
    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    /// Status updates received so far, in order.
    #[must_use]
    pub fn status_updates(&self) -> Vec<(String, TaskStatus)> {
        self.lock().status_updates.clone()
    }

    /// How many times `connect` was called.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().expect("memory task source lock poisoned")
    }

    fn check(&self, operation: &'static str) -> Result<(), RemoteError> {
        match self.lock().failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl TaskSource for MemoryTaskSource {
    fn connect(&mut self) -> Result<(), RemoteError> {
        self.check("connect")?;
        self.lock().connects += 1;
        Ok(())
    }

    fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        self.check("get_tasks")?;
        Ok(self.tasks())
    }

    fn get_task(&self, id: &str) -> Result<Task, RemoteError> {
        self.check("get_task")?;
        self.lock()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::with_code(404, format!("no task {id}")))
    }

    fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), RemoteError> {
        self.check("update_task_status")?;
        let mut state = self.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| RemoteError::with_code(404, format!("no task {id}")))?;
        task.status = status;
        task.updated = self.clock;
        state.status_updates.push((id.to_string(), status));
        Ok(())
    }

    fn add_note(&self, id: &str, message: &str, tag: &str) -> Result<(), RemoteError> {
        self.check("add_note")?;
        self.lock().notes.push(Note {
            task_id: id.to_string(),
            message: message.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }
}
