//! The reconciliation run.
//!
//! A run connects to both systems, prunes the task list, optionally deletes
//! existing remote items, then walks the in-scope tasks in source order and
//! creates, skips or updates their remote counterparts. The first failed
//! remote call aborts the run; nothing already applied is rolled back.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::{SyncConfig, TestConnection};
use crate::error::{RemoteError, Result, SyncError};
use crate::model::{RemoteTaskRef, Removal, Task};
use crate::ports::{AlmConnector, RemoteTaskDraft, TaskSource};

use super::conflict::{resolve, status_match, Side};
use super::marker;
use super::progress::Progress;
use super::report::{format_report, Created, SyncEvent, SyncReport};
use super::scope;

/// Tag attached to every note this tool writes to the task source.
pub const NOTE_TAG: &str = "almsync";

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not connected to the ALM tool.
    Disconnected,
    /// ALM server reached.
    ServerConnected,
    /// ALM project resolved.
    ProjectConnected,
    /// Walking the task list.
    Reconciling,
    /// Stopped after a connection test.
    TestOnly,
    /// Run completed and disconnected.
    Finished,
}

type ProgressObserver = Box<dyn FnMut(u8) + Send>;

/// Drives one task source and one ALM connector through reconciliation runs.
pub struct SyncEngine<S, A> {
    config: SyncConfig,
    source: S,
    alm: A,
    state: EngineState,
    progress: Progress,
    reported: u8,
    observer: Option<ProgressObserver>,
}

impl<S: TaskSource, A: AlmConnector> SyncEngine<S, A> {
    /// Creates an engine for a validated configuration.
    pub fn new(config: SyncConfig, source: S, alm: A) -> Self {
        Self {
            config,
            source,
            alm,
            state: EngineState::Disconnected,
            progress: Progress::new(),
            reported: 0,
            observer: None,
        }
    }

    /// Calls `observer` whenever the completion percentage rises.
    ///
    /// The total grows once the task count is known, so the observed value
    /// holds steady until completed work catches up; it never goes down.
    #[must_use]
    pub fn with_progress(mut self, observer: impl FnMut(u8) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The task source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The ALM connector.
    #[must_use]
    pub fn alm(&self) -> &A {
        &self.alm
    }

    /// Runs one synchronization.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connectivity`] when a connection step fails, and
    /// [`SyncError::Remote`] for the first failed call while reconciling. In
    /// the latter case the ALM connector is disconnected before returning.
    pub fn synchronize(&mut self) -> Result<SyncReport> {
        let alm_name = self.alm.alm_name().to_string();
        let mut report = SyncReport::new(&alm_name);
        self.progress = Progress::new();
        self.reported = 0;
        self.state = EngineState::Disconnected;

        self.source
            .connect()
            .map_err(|e| SyncError::connectivity("task source", e))?;
        self.tick();

        self.alm
            .connect_server()
            .map_err(|e| SyncError::connectivity(format!("{alm_name} server"), e))?;
        self.state = EngineState::ServerConnected;
        self.tick();
        info!(alm = %alm_name, "connected to server");
        if self.config.test_connection == Some(TestConnection::Server) {
            return Ok(self.stop_after_test(report, TestConnection::Server));
        }

        self.alm
            .connect_project()
            .map_err(|e| SyncError::connectivity(format!("{alm_name} project"), e))?;
        self.state = EngineState::ProjectConnected;
        self.tick();
        info!(alm = %alm_name, "connected to project");
        if self.config.test_connection == Some(TestConnection::Project) {
            return Ok(self.stop_after_test(report, TestConnection::Project));
        }

        self.state = EngineState::Reconciling;
        match self.reconcile(&mut report) {
            Ok(()) => {
                self.disconnect();
                self.state = EngineState::Finished;
                report.progress = self.progress.complete();
                self.notify();
                info!(changes = report.changes(), "synchronization complete");
                debug!("\n{}", format_report(&report));
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "synchronization aborted");
                self.disconnect();
                self.state = EngineState::Disconnected;
                Err(err)
            }
        }
    }

    fn stop_after_test(&mut self, mut report: SyncReport, step: TestConnection) -> SyncReport {
        self.disconnect();
        self.state = EngineState::TestOnly;
        report.test_only = Some(step);
        report.progress = self.progress.complete();
        self.notify();
        report
    }

    fn reconcile(&mut self, report: &mut SyncReport) -> Result<()> {
        let tasks = self
            .source
            .get_tasks()
            .map_err(|e| SyncError::remote("get_tasks", "*", e))?;
        report.fetched = tasks.len();

        let tasks = scope::prune(tasks, &self.config);
        report.in_scope = tasks.len();
        info!(
            fetched = report.fetched,
            in_scope = report.in_scope,
            "pruned task list"
        );

        let delete_pass = self.config.start_fresh && self.alm.supports_delete();
        if self.config.start_fresh && !delete_pass {
            warn!(alm = %report.alm_name, "start_fresh ignored: tool cannot delete items");
        }
        // The fetch unit is counted once the total is known.
        let passes = if delete_pass { 2 } else { 1 };
        self.progress.set_task_units(tasks.len(), passes);
        self.tick();

        let mut ignored = HashSet::new();
        if delete_pass {
            for task in &tasks {
                self.remove_existing(task, &mut ignored, report)?;
                self.tick();
            }
        }

        for task in &tasks {
            match self.lookup(task)? {
                Some(remote) => self.reconcile_existing(task, &remote, report)?,
                None => self.create_missing(task, &ignored, report)?,
            }
            self.tick();
        }
        Ok(())
    }

    fn lookup(&self, task: &Task) -> Result<Option<RemoteTaskRef>> {
        self.alm
            .get_task(task)
            .map_err(|e| SyncError::remote("get_task", &task.id, e))
    }

    fn remove_existing(
        &self,
        task: &Task,
        ignored: &mut HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Some(remote) = self.lookup(task)? else {
            return Ok(());
        };
        let removal = self
            .alm
            .remove_task(&remote)
            .map_err(|e| SyncError::remote("remove_task", &task.id, e))?;
        match removal {
            Removal::Deleted => {
                info!(task = %task.id, remote = %remote.id, "removed remote item");
                report.removed.push(task.id.clone());
            }
            Removal::Retained { reason } => {
                warn!(task = %task.id, remote = %remote.id, %reason, "item kept, task ignored");
                ignored.insert(task.id.clone());
                report.retained.push(task.id.clone());
            }
        }
        Ok(())
    }

    fn reconcile_existing(
        &self,
        task: &Task,
        remote: &RemoteTaskRef,
        report: &mut SyncReport,
    ) -> Result<()> {
        if !self.config.alm_standard_workflow {
            debug!(task = %task.id, remote = %remote.id, "remote item exists, workflow disabled");
            report.existing.push(task.id.clone());
            return Ok(());
        }

        if status_match(remote.get_status(), task.status) {
            debug!(task = %task.id, remote = %remote.id, "statuses agree");
            report.matched.push(task.id.clone());
            return Ok(());
        }

        let resolution = resolve(
            task.status,
            task.updated,
            remote.get_status(),
            remote.updated,
            self.config.conflict_policy,
        );
        match resolution.loser() {
            Side::Alm => {
                self.alm
                    .update_task_status(remote, resolution.new_status)
                    .map_err(|e| SyncError::remote("update_task_status", &task.id, e))?;
            }
            Side::Sde => {
                self.source
                    .update_task_status(&task.id, resolution.new_status)
                    .map_err(|e| SyncError::remote("update_task_status", &task.id, e))?;
                self.add_note(
                    &task.id,
                    &format!(
                        "Task status changed to {} to match {} item {}",
                        resolution.new_status, report.alm_name, remote.reference
                    ),
                );
            }
        }

        let event = SyncEvent {
            task_id: task.id.clone(),
            updated: resolution.loser(),
            status: resolution.new_status,
        };
        info!("{event}");
        report.status_events.push(event);
        Ok(())
    }

    fn create_missing(
        &self,
        task: &Task,
        ignored: &HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let status_out_of_scope = self.config.selected_tasks.is_empty()
            && !self.config.sde_statuses_in_scope.contains(&task.status);
        if status_out_of_scope || ignored.contains(&task.id) {
            debug!(task = %task.id, status = %task.status, "no remote item; skipped");
            report.skipped.push(task.id.clone());
            return Ok(());
        }

        let draft = self.draft(task);
        let reference = self
            .alm
            .add_task(task, &draft)
            .map_err(|e| SyncError::remote("add_task", &task.id, e))?;
        info!(task = %task.id, %reference, "created remote item");
        self.add_note(
            &task.id,
            &format!(
                "Task synchronized in {}. Reference: {} (status {})",
                report.alm_name, reference, task.status
            ),
        );

        if self.config.alm_standard_workflow && task.status.is_done() {
            self.close_created(task)?;
        }

        report.created.push(Created {
            task_id: task.id.clone(),
            reference,
        });
        Ok(())
    }

    /// Moves a freshly created item to done so the next run sees agreement.
    fn close_created(&self, task: &Task) -> Result<()> {
        let Some(remote) = self.lookup(task)? else {
            let source = RemoteError::new("created item not found");
            return Err(SyncError::remote("get_task", &task.id, source));
        };
        if !status_match(remote.get_status(), task.status) {
            self.alm
                .update_task_status(&remote, task.status)
                .map_err(|e| SyncError::remote("update_task_status", &task.id, e))?;
        }
        Ok(())
    }

    fn draft(&self, task: &Task) -> RemoteTaskDraft {
        let mut description = task.content.clone();
        if self.config.how_tos_in_scope && !task.how_tos.is_empty() {
            description.push_str("\n\nHow-tos:\n");
            for how_to in &task.how_tos {
                description.push_str(&format!("\n{}\n{}\n", how_to.title, how_to.body));
            }
        }

        RemoteTaskDraft {
            title: marker::remote_title(task),
            description,
            priority_label: self
                .config
                .priority_map
                .as_ref()
                .map(|map| map.label_for(task.priority).to_string()),
            custom_fields: self.config.alm_custom_fields.clone(),
        }
    }

    /// Notes are best effort: a failure is logged and the run continues.
    fn add_note(&self, task_id: &str, message: &str) {
        if let Err(err) = self.source.add_note(task_id, message, NOTE_TAG) {
            warn!(task = %task_id, error = %err, "failed to add note");
        }
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.alm.disconnect() {
            warn!(alm = %self.alm.alm_name(), error = %err, "disconnect failed");
        }
    }

    fn tick(&mut self) {
        self.progress.advance();
        self.notify();
    }

    fn notify(&mut self) {
        let percent = self.progress.percent();
        if percent <= self.reported {
            return;
        }
        self.reported = percent;
        debug!(percent, "progress");
        if let Some(observer) = self.observer.as_mut() {
            observer(percent);
        }
    }
}
