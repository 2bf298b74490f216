pub mod application;
pub mod config;
pub mod customer;
pub mod init;
pub mod notice;
pub mod opportunity;
pub mod report;
pub mod state;
pub mod user;
pub mod visit;

use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use crm_core::{
    config::Config,
    state::CrmState,
    user::User,
    workflow::{Action, Desk, Effect},
};
use std::path::Path;

/// Config, snapshot and acting user for one command.
pub struct Session {
    pub config: Config,
    pub state: CrmState,
    pub actor: User,
}

impl Session {
    pub fn open(root: &Path, as_user: Option<&str>) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let state = CrmState::load(root).context("failed to load state")?;
        let actor = config.resolve_actor(as_user)?.clone();
        Ok(Self {
            config,
            state,
            actor,
        })
    }
}

/// Run one mutating action and persist the resulting snapshot.
///
/// A refused action still saves its snapshot so the refusal notice survives,
/// then the refusal is returned as the error. Storage failures save nothing.
pub fn perform(root: &Path, as_user: Option<&str>, action: Action) -> anyhow::Result<Effect> {
    let Session {
        config,
        state,
        actor,
    } = Session::open(root, as_user)?;
    let mut desk = Desk::new(state, config.notifications.keep);
    match desk.run(&actor, action, Utc::now()) {
        Err(e) if !e.is_rule_refusal() => Err(e.into()),
        result => {
            desk.state().save(root).context("failed to save state")?;
            Ok(result?)
        }
    }
}

/// Print what an action did: its notice, or the effect plus notice as JSON.
pub fn report_effect(effect: &Effect, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({
            "effect": effect,
            "notice": effect.notice(),
        }))?;
    } else {
        println!("{}", effect.notice());
    }
    Ok(())
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
