//! `almsync check` command.

use std::path::Path;

use crate::config::{config_path, Settings, SyncConfig};

/// Execute the `check` command: load and validate settings without
/// contacting any system.
///
/// # Errors
///
/// Returns an error string if the settings file is missing or invalid.
pub fn run(config: Option<&Path>) -> Result<(), String> {
    let path = config_path(config);
    let settings = Settings::load(&path).map_err(|e| e.to_string())?;
    let sync = settings.sync_config().map_err(|e| e.to_string())?;
    println!("Settings OK: {}", path.display());
    println!("{}", describe(&settings, &sync));
    Ok(())
}

fn describe(settings: &Settings, sync: &SyncConfig) -> String {
    let mut lines = vec![
        format!(
            "  task source: {} (project {})",
            settings.sde.server, settings.sde.project_id
        ),
        format!(
            "  ALM: {} {} ({})",
            settings.alm.tool, settings.alm.project, settings.alm.server
        ),
    ];
    if sync.selected_tasks.is_empty() {
        let phases: Vec<&str> = sync.alm_phases.iter().map(String::as_str).collect();
        lines.push(format!("  phases: {}", phases.join(", ")));
        lines.push(format!("  min priority: {}", sync.sde_min_priority));
    } else {
        let ids: Vec<String> = sync
            .selected_tasks
            .iter()
            .map(|n| format!("T{n}"))
            .collect();
        lines.push(format!("  selected tasks: {}", ids.join(", ")));
    }
    lines.push(format!("  conflict policy: {}", sync.conflict_policy));
    for (name, present) in [
        ("SDE_API_TOKEN", settings.sde.api_token.is_some()),
        ("ALM_USER", settings.alm.user.is_some()),
        ("ALM_API_TOKEN", settings.alm.api_token.is_some()),
    ] {
        if !present {
            lines.push(format!("  warning: {name} is not set"));
        }
    }
    lines.join("\n")
}
