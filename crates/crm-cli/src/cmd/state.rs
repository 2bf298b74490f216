use super::Session;
use crate::output::print_json;
use std::path::Path;

pub fn run(root: &Path, as_user: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Session { state, actor, .. } = Session::open(root, as_user)?;

    let visits = state.visits_for(&actor).len();
    let applications = state.application_summary(&actor);
    let opportunities = state.opportunities_for(&actor).len();
    let notice = state.latest_notification().map(|n| n.message.clone());

    if json {
        print_json(&serde_json::json!({
            "project": state.project,
            "actor": actor,
            "customers": state.customers.len(),
            "visits": visits,
            "applications": applications,
            "opportunities": opportunities,
            "notice": notice,
            "last_updated": state.last_updated,
        }))?;
        return Ok(());
    }

    println!("Project:       {}", state.project);
    println!("Acting as:     {} ({})", actor.name, actor.role);
    println!("Customers:     {}", state.customers.len());
    println!("Visits:        {visits}");
    println!(
        "Applications:  {} (待审批 {}, 已通过 {}, 已驳回 {})",
        applications.total, applications.pending, applications.approved, applications.rejected
    );
    println!("Opportunities: {opportunities}");
    if let Some(n) = notice {
        println!("\nNotice: {n}");
    }
    Ok(())
}
