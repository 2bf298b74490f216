use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use crm_core::config::Config;
use std::path::Path;

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// List the user roster
    List,
    /// Show the acting user
    Whoami,
    /// Make a user the active user
    Use { name: String },
    /// Toggle the active user between salesperson and manager
    Switch,
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: UserSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        UserSubcommand::List => list(root, json),
        UserSubcommand::Whoami => whoami(root, as_user, json),
        UserSubcommand::Use { name } => use_user(root, &name, json),
        UserSubcommand::Switch => switch(root, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config.users);
    }
    let rows = config
        .users
        .iter()
        .map(|u| {
            let active = if u.name == config.active_user { "*" } else { "" };
            vec![
                active.to_string(),
                u.id.clone(),
                u.name.clone(),
                u.role.to_string(),
            ]
        })
        .collect();
    print_table(&["", "ID", "NAME", "ROLE"], rows);
    Ok(())
}

fn whoami(root: &Path, as_user: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let user = config.resolve_actor(as_user)?;
    if json {
        print_json(user)?;
    } else {
        println!("{} ({})", user.name, user.role);
    }
    Ok(())
}

fn use_user(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    let user = config.set_active(name)?.clone();
    config.save(root).context("failed to save config")?;
    tracing::info!(user = %user.name, "active user changed");

    if json {
        print_json(&user)?;
    } else {
        println!("Now acting as {} ({})", user.name, user.role);
    }
    Ok(())
}

fn switch(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    let user = config.switch_role()?.clone();
    config.save(root).context("failed to save config")?;
    tracing::info!(user = %user.name, role = %user.role, "role switched");

    if json {
        print_json(&user)?;
    } else {
        println!("Now acting as {} ({})", user.name, user.role);
    }
    Ok(())
}
