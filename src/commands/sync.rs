//! `almsync sync` command.

use crate::cli::SyncArgs;
use crate::config::{config_path, Settings, SyncConfig, SyncOptions};
use crate::context::ServiceContext;
use crate::error;
use crate::sync::{format_report, SyncEngine, SyncReport};

/// Execute the `sync` command.
///
/// # Errors
///
/// Returns an error string if the settings are invalid or the run aborts.
pub fn run(args: &SyncArgs) -> Result<(), String> {
    let (ctx, config) = prepare(args).map_err(|e| e.to_string())?;
    let report = run_with_context(ctx, config)?;
    println!("{}", format_report(&report));
    Ok(())
}

/// Loads the settings, applies the flags and builds the live context.
fn prepare(args: &SyncArgs) -> error::Result<(ServiceContext, SyncConfig)> {
    let path = config_path(args.config.as_deref());
    let mut settings = Settings::load(&path)?;
    apply_overrides(&mut settings.sync, args);
    let config = settings.sync_config()?;
    let ctx = ServiceContext::live(&settings)?;
    Ok((ctx, config))
}

/// Execute one synchronization against the adapters in `ctx`.
///
/// # Errors
///
/// Returns an error string if the run aborts.
pub fn run_with_context(ctx: ServiceContext, config: SyncConfig) -> Result<SyncReport, String> {
    let mut engine = SyncEngine::new(config, ctx.source, ctx.alm);
    engine.synchronize().map_err(|e| e.to_string())
}

/// Applies command-line flags on top of the `sync` section.
pub fn apply_overrides(options: &mut SyncOptions, args: &SyncArgs) {
    if args.start_fresh {
        options.start_fresh = true;
    }
    if let Some(policy) = &args.conflict_policy {
        options.conflict_policy.clone_from(policy);
    }
    if let Some(step) = &args.test_connection {
        options.test_connection = Some(step.clone());
    }
    if !args.tasks.is_empty() {
        options.selected_tasks.clone_from(&args.tasks);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::adapters::memory::{MemoryAlm, MemoryTaskSource};
    use crate::config::{ConfigError, ConflictPolicy};
    use crate::error::SyncError;
    use crate::model::{Task, TaskStatus};

    fn memory_context(tasks: Vec<Task>) -> ServiceContext {
        let clock = Utc.timestamp_opt(1_000, 0).unwrap();
        ServiceContext::new(
            Box::new(MemoryTaskSource::new(tasks, clock)),
            Box::new(MemoryAlm::new("Memory", clock)),
        )
    }

    #[test]
    fn overrides_replace_file_options() {
        let mut options = SyncOptions::default();
        let args = SyncArgs {
            start_fresh: true,
            conflict_policy: Some("timestamp".to_string()),
            tasks: vec!["T21".to_string()],
            ..SyncArgs::default()
        };
        apply_overrides(&mut options, &args);
        let config = SyncConfig::from_options(&options).unwrap();
        assert!(config.start_fresh);
        assert_eq!(config.conflict_policy, ConflictPolicy::Timestamp);
        assert!(config.selected_tasks.contains(&21));
    }

    #[test]
    fn absent_flags_keep_file_options() {
        let mut options = SyncOptions {
            start_fresh: true,
            ..SyncOptions::default()
        };
        apply_overrides(&mut options, &SyncArgs::default());
        assert!(options.start_fresh);
        assert_eq!(options.conflict_policy, "alm");
    }

    #[test]
    fn run_with_context_creates_missing_items() {
        let task = Task {
            id: "1042-T21".to_string(),
            title: "Validate input".to_string(),
            phase: "requirements".to_string(),
            priority: 8,
            status: TaskStatus::Todo,
            updated: Utc.timestamp_opt(500, 0).unwrap(),
            content: String::new(),
            how_tos: Vec::new(),
        };
        let ctx = memory_context(vec![task]);
        let report = run_with_context(ctx, SyncConfig::default()).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.progress, 100);
    }

    #[test]
    fn unreadable_settings_surface_as_config_error() {
        let args = SyncArgs {
            config: Some(PathBuf::from("/nonexistent/almsync.yaml")),
            ..SyncArgs::default()
        };
        let Err(err) = prepare(&args) else {
            panic!("expected a configuration error");
        };
        assert!(matches!(err, SyncError::Config(ConfigError::Read { .. })));
        assert!(err.to_string().starts_with("configuration error: "));
    }

    #[test]
    fn invalid_policy_flag_surfaces_as_config_error() {
        let path = std::env::temp_dir().join("almsync_sync_prepare_policy.yaml");
        std::fs::write(
            &path,
            "sde: {server: https://sde.test, project_id: 7}\n\
             alm: {tool: jira, server: https://jira.test, project: SEC}\n",
        )
        .unwrap();
        let args = SyncArgs {
            config: Some(path.clone()),
            conflict_policy: Some("newest".to_string()),
            ..SyncArgs::default()
        };
        let result = prepare(&args);
        let _ = std::fs::remove_file(&path);
        let Err(err) = result else {
            panic!("expected a configuration error");
        };
        assert!(matches!(
            err,
            SyncError::Config(ConfigError::UnknownConflictPolicy(_))
        ));
    }
}
