//! Per-run outcome of a synchronization.

use std::fmt;

use crate::config::TestConnection;
use crate::model::TaskStatus;

use super::conflict::Side;

/// A status pushed from one side to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Task id.
    pub task_id: String,
    /// System that was updated.
    pub updated: Side,
    /// Status it was set to.
    pub status: TaskStatus,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (task_id, side, status) = (&self.task_id, self.updated, self.status);
        write!(f, "{task_id}: updated {side} to {status}")
    }
}

/// A remote item created during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    /// Task id.
    pub task_id: String,
    /// Reference returned by the ALM tool.
    pub reference: String,
}

/// Everything a run did, in processing order per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Name of the ALM tool.
    pub alm_name: String,
    /// Set when the run only tested connectivity.
    pub test_only: Option<TestConnection>,
    /// Tasks fetched from the task source.
    pub fetched: usize,
    /// Tasks that passed scoping.
    pub in_scope: usize,
    /// Remote items removed by the delete pass.
    pub removed: Vec<String>,
    /// Tasks whose remote item the tool refused to delete.
    pub retained: Vec<String>,
    /// Remote items created.
    pub created: Vec<Created>,
    /// Status pushes.
    pub status_events: Vec<SyncEvent>,
    /// Tasks already in agreement.
    pub matched: Vec<String>,
    /// Tasks with a remote item while the status workflow is disabled.
    pub existing: Vec<String>,
    /// In-scope tasks left without a remote item.
    pub skipped: Vec<String>,
    /// Last reported progress percentage.
    pub progress: u8,
}

impl SyncReport {
    pub(crate) fn new(alm_name: &str) -> Self {
        Self {
            alm_name: alm_name.to_string(),
            ..Self::default()
        }
    }

    /// Number of calls that changed state on either side.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.removed.len() + self.created.len() + self.status_events.len()
    }
}

/// Formats a report as a human-readable summary.
#[must_use]
pub fn format_report(report: &SyncReport) -> String {
    if let Some(step) = report.test_only {
        let step = match step {
            TestConnection::Server => "server",
            TestConnection::Project => "project",
        };
        let alm = &report.alm_name;
        return format!("Connection test succeeded: {alm} {step} reachable.");
    }

    let mut lines = vec![format!(
        "{} of {} tasks in scope for {}",
        report.in_scope, report.fetched, report.alm_name
    )];
    for task_id in &report.removed {
        lines.push(format!("  REMOVE {task_id}"));
    }
    for task_id in &report.retained {
        lines.push(format!("  RETAIN {task_id} (deletion refused, left untouched)"));
    }
    for created in &report.created {
        lines.push(format!("  CREATE {} ({})", created.task_id, created.reference));
    }
    for event in &report.status_events {
        lines.push(format!("  STATUS {event}"));
    }
    for task_id in &report.matched {
        lines.push(format!("  UNCHANGED {task_id}"));
    }
    for task_id in &report.existing {
        lines.push(format!("  EXISTS {task_id}"));
    }
    for task_id in &report.skipped {
        lines.push(format!("  SKIP {task_id}"));
    }
    if report.changes() == 0 {
        lines.push("  nothing to change".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display_names_side_and_status() {
        let event = SyncEvent {
            task_id: "1042-T21".to_string(),
            updated: Side::Alm,
            status: TaskStatus::Done,
        };
        assert_eq!(event.to_string(), "1042-T21: updated ALM to DONE");
    }

    #[test]
    fn format_report_shows_all_outcomes() {
        let report = SyncReport {
            alm_name: "JIRA".to_string(),
            fetched: 6,
            in_scope: 5,
            removed: vec!["1-T1".to_string()],
            created: vec![Created {
                task_id: "1-T2".to_string(),
                reference: "SEC-7".to_string(),
            }],
            status_events: vec![SyncEvent {
                task_id: "1-T3".to_string(),
                updated: Side::Sde,
                status: TaskStatus::Todo,
            }],
            matched: vec!["1-T4".to_string()],
            skipped: vec!["1-T5".to_string()],
            ..SyncReport::default()
        };
        let output = format_report(&report);
        assert!(output.contains("5 of 6 tasks in scope for JIRA"));
        assert!(output.contains("REMOVE 1-T1"));
        assert!(output.contains("CREATE 1-T2 (SEC-7)"));
        assert!(output.contains("STATUS 1-T3: updated SDE to TODO"));
        assert!(output.contains("UNCHANGED 1-T4"));
        assert!(output.contains("SKIP 1-T5"));
        assert!(!output.contains("nothing to change"));
    }

    #[test]
    fn format_report_for_quiet_run() {
        let report = SyncReport {
            alm_name: "GitHub".to_string(),
            ..SyncReport::default()
        };
        assert!(format_report(&report).contains("nothing to change"));
    }

    #[test]
    fn format_report_for_connection_test() {
        let report = SyncReport {
            alm_name: "GitHub".to_string(),
            test_only: Some(TestConnection::Project),
            ..SyncReport::default()
        };
        assert_eq!(
            format_report(&report),
            "Connection test succeeded: GitHub project reachable."
        );
    }
}
