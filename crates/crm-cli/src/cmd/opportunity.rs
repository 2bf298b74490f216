use super::{perform, report_effect, Session};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use crm_core::{
    opportunity, CrmError,
    types::{OpportunityStage, Outcome},
    workflow::Action,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum OpportunitySubcommand {
    /// List opportunities visible to the acting user
    List,
    /// Show an opportunity with its stage history
    Show { code: String },
    /// Move an opportunity to another stage (owner only)
    Stage {
        code: String,
        /// evaluation, proposal, negotiation, settlement (or the Chinese label)
        stage: String,
    },
    /// Close an opportunity as won or closed (owner only)
    Settle {
        code: String,
        /// won / 成交, or closed / 关闭
        outcome: String,
    },
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: OpportunitySubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        OpportunitySubcommand::List => list(root, as_user, json),
        OpportunitySubcommand::Show { code } => show(root, as_user, &code, json),
        OpportunitySubcommand::Stage { code, stage } => {
            let stage: OpportunityStage = stage.parse()?;
            let effect = perform(root, as_user, Action::ChangeStage { code, stage })?;
            report_effect(&effect, json)
        }
        OpportunitySubcommand::Settle { code, outcome } => {
            let outcome: Outcome = outcome.parse()?;
            let effect = perform(root, as_user, Action::Settle { code, outcome })?;
            report_effect(&effect, json)
        }
    }
}

fn list(root: &Path, as_user: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Session { state, actor, .. } = Session::open(root, as_user)?;
    let opps = state.opportunities_for(&actor);
    if json {
        return print_json(&opps);
    }
    if opps.is_empty() {
        println!("No opportunities.");
        return Ok(());
    }
    let rows = opps
        .iter()
        .map(|o| {
            vec![
                o.code.clone(),
                o.customer.clone(),
                o.amount.grouped(),
                format!("{}. {}", o.stage.order(), o.stage),
                o.status.to_string(),
                o.owner.clone(),
            ]
        })
        .collect();
    print_table(&["CODE", "CUSTOMER", "AMOUNT", "STAGE", "STATUS", "OWNER"], rows);
    Ok(())
}

fn show(root: &Path, as_user: Option<&str>, code: &str, json: bool) -> anyhow::Result<()> {
    let Session { state, actor, .. } = Session::open(root, as_user)?;
    let o = opportunity::find(&state.opportunities, code)?;
    if !actor.sees(&o.owner) {
        // Someone else's deal reads as absent, matching `list`.
        return Err(CrmError::OpportunityNotFound(code.to_string()).into());
    }
    if json {
        return print_json(o);
    }

    println!("{} {}", o.code, o.customer);
    println!("  amount: {}", o.amount.grouped());
    println!("  stage:  {}/{} {}", o.stage.order(), OpportunityStage::all().len(), o.stage);
    println!("  status: {}", o.status);
    println!("  owner:  {}", o.owner);

    if !o.stage_history.is_empty() {
        println!("\nStage history:");
        for change in &o.stage_history {
            println!(
                "  {}  {} → {}",
                change.changed_at.format("%Y-%m-%d %H:%M"),
                change.from,
                change.to
            );
        }
    }
    Ok(())
}
