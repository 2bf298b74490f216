use crate::output::{print_json, print_table};
use anyhow::Context;
use crm_core::state::CrmState;
use std::path::Path;

pub fn run(root: &Path, all: bool, json: bool) -> anyhow::Result<()> {
    let state = CrmState::load(root).context("failed to load state")?;

    if all {
        if json {
            return print_json(&state.notifications);
        }
        if state.notifications.is_empty() {
            println!("No notices.");
            return Ok(());
        }
        let rows = state
            .notifications
            .iter()
            .map(|n| {
                vec![
                    n.at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    n.message.clone(),
                ]
            })
            .collect();
        print_table(&["AT", "NOTICE"], rows);
        return Ok(());
    }

    let latest = state.latest_notification();
    if json {
        print_json(&latest)?;
    } else {
        match latest {
            Some(n) => println!("{}", n.message),
            None => println!("No notices."),
        }
    }
    Ok(())
}
