use crate::output::print_json;
use anyhow::Context;
use crm_core::{config::Config, io, paths, state::CrmState};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "crm".to_string());

    let already = paths::is_initialized(root);
    let dir = paths::crm_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_created = if paths::config_path(root).exists() {
        false
    } else {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        true
    };

    let state_created = if paths::state_path(root).exists() {
        false
    } else {
        CrmState::new(&project_name)
            .save(root)
            .context("failed to write state.yaml")?;
        true
    };

    tracing::info!(root = %root.display(), config_created, state_created, "initialized");

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "project": project_name,
            "config_created": config_created,
            "state_created": state_created,
        }))?;
        return Ok(());
    }

    if already {
        println!("CRM already initialized in: {}", root.display());
    } else {
        println!("Initializing CRM in: {}", root.display());
    }
    let mark = |created: bool| if created { "created:" } else { "exists: " };
    println!("  {} {}", mark(config_created), paths::CONFIG_FILE);
    println!("  {} {}", mark(state_created), paths::STATE_FILE);
    Ok(())
}
