//! Decides which tasks take part in a run.

use crate::config::SyncConfig;
use crate::model::Task;

/// Returns `true` when the task participates in the run.
///
/// A non-empty `selected_tasks` list is the only criterion when present;
/// otherwise the task must be in a configured phase and at or above the
/// minimum priority.
#[must_use]
pub fn in_scope(task: &Task, config: &SyncConfig) -> bool {
    if !config.selected_tasks.is_empty() {
        let selected = &config.selected_tasks;
        return task.number().is_some_and(|n| selected.contains(&n));
    }
    config.alm_phases.contains(&task.phase) && task.priority >= config.sde_min_priority
}

/// Keeps the in-scope tasks, preserving source order.
#[must_use]
pub fn prune(tasks: Vec<Task>, config: &SyncConfig) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| in_scope(task, config))
        .collect()
}
