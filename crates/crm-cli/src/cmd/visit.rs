use super::{perform, report_effect, Session};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use crm_core::{
    visit::{VisitDraft, VisitRecord},
    workflow::Action,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum VisitSubcommand {
    /// Log a customer visit as the acting user
    Log {
        /// Customer name
        #[arg(long)]
        customer: Option<String>,
        /// Visit date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Customer stage, e.g. needs_confirmed or 需求确认
        #[arg(long)]
        stage: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List visits visible to the acting user
    List,
    /// List the acting user's visits that can become an application
    Eligible,
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: VisitSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        VisitSubcommand::Log {
            customer,
            date,
            stage,
            notes,
        } => {
            let draft = VisitDraft {
                customer,
                visit_date: date,
                stage,
                notes,
            };
            let effect = perform(root, as_user, Action::LogVisit(draft))?;
            report_effect(&effect, json)
        }
        VisitSubcommand::List => {
            let Session { state, actor, .. } = Session::open(root, as_user)?;
            print_visits(&state.visits_for(&actor), json)
        }
        VisitSubcommand::Eligible => {
            let Session { state, actor, .. } = Session::open(root, as_user)?;
            print_visits(&state.eligible_visits(&actor), json)
        }
    }
}

fn print_visits(visits: &[&VisitRecord], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&visits);
    }
    if visits.is_empty() {
        println!("No visits.");
        return Ok(());
    }
    let rows = visits
        .iter()
        .map(|v| {
            vec![
                v.id.clone(),
                v.visit_date.to_string(),
                v.customer.clone(),
                v.stage.to_string(),
                v.salesperson.clone(),
                v.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "DATE", "CUSTOMER", "STAGE", "SALESPERSON", "NOTES"], rows);
    Ok(())
}
