use super::{or_dash, perform, report_effect, Session};
use crate::output::{print_json, print_table};
use clap::{Args, Subcommand};
use crm_core::{
    customer::{self, CustomerDraft},
    workflow::Action,
};
use std::path::Path;

/// Customer form fields. Enumerated values accept either the key or the
/// Chinese label (e.g. `software` or `软件`).
#[derive(Args, Default)]
pub struct CustomerFieldArgs {
    /// 客户名称
    #[arg(long)]
    name: Option<String>,
    /// 客户行业
    #[arg(long)]
    industry: Option<String>,
    /// 客户分层 (A/B/C)
    #[arg(long)]
    tier: Option<String>,
    /// 人员规模
    #[arg(long)]
    headcount: Option<String>,
    /// 国家/地区
    #[arg(long)]
    region: Option<String>,
    /// 官方网站 (pass "" to clear)
    #[arg(long)]
    website: Option<String>,
}

impl From<CustomerFieldArgs> for CustomerDraft {
    fn from(a: CustomerFieldArgs) -> Self {
        CustomerDraft {
            name: a.name,
            industry: a.industry,
            tier: a.tier,
            headcount: a.headcount,
            region: a.region,
            website: a.website,
        }
    }
}

#[derive(Subcommand)]
pub enum CustomerSubcommand {
    /// Register a customer
    Create {
        #[command(flatten)]
        fields: CustomerFieldArgs,
    },
    /// Edit a customer; only the given fields change
    Edit {
        id: String,
        #[command(flatten)]
        fields: CustomerFieldArgs,
    },
    /// List customers
    List,
    /// Show a customer with its change log
    Show { id: String },
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: CustomerSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        CustomerSubcommand::Create { fields } => {
            let effect = perform(root, as_user, Action::CreateCustomer(fields.into()))?;
            report_effect(&effect, json)
        }
        CustomerSubcommand::Edit { id, fields } => edit(root, as_user, id, fields, json),
        CustomerSubcommand::List => list(root, as_user, json),
        CustomerSubcommand::Show { id } => show(root, as_user, &id, json),
    }
}

fn edit(
    root: &Path,
    as_user: Option<&str>,
    id: String,
    fields: CustomerFieldArgs,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, as_user)?;
    // An unknown id still goes through the workflow so the refusal is noticed.
    let base = customer::find(&session.state.customers, &id)
        .map(CustomerDraft::from_customer)
        .unwrap_or_default();
    let draft = base.merged(fields.into());

    let effect = perform(root, as_user, Action::EditCustomer { id, draft })?;
    report_effect(&effect, json)
}

fn list(root: &Path, as_user: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Session { state, .. } = Session::open(root, as_user)?;
    if json {
        return print_json(&state.customers);
    }
    if state.customers.is_empty() {
        println!("No customers.");
        return Ok(());
    }
    let rows = state
        .customers
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.name.clone(),
                c.industry.to_string(),
                c.tier.to_string(),
                or_dash(c.headcount.map(|h| h.label())),
                or_dash(c.region.map(|r| r.label())),
                c.created_by.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "INDUSTRY", "TIER", "HEADCOUNT", "REGION", "CREATED BY"],
        rows,
    );
    Ok(())
}

fn show(root: &Path, as_user: Option<&str>, id: &str, json: bool) -> anyhow::Result<()> {
    let Session { state, .. } = Session::open(root, as_user)?;
    let c = customer::find(&state.customers, id)?;
    if json {
        return print_json(c);
    }

    println!("{} {}", c.id, c.name);
    println!("  客户行业: {}", c.industry);
    println!("  客户分层: {}", c.tier);
    println!("  人员规模: {}", or_dash(c.headcount.map(|h| h.label())));
    println!("  国家/地区: {}", or_dash(c.region.map(|r| r.label())));
    println!("  官方网站: {}", or_dash(c.website.as_deref()));
    println!(
        "  created by {} at {}",
        c.created_by,
        c.created_at.format("%Y-%m-%d %H:%M")
    );

    if !c.change_log.is_empty() {
        println!("\nChange log:");
        for entry in &c.change_log {
            println!(
                "  {}  {}: {} → {}",
                entry.changed_at.format("%Y-%m-%d %H:%M"),
                entry.field,
                or_dash(Some(entry.old.as_str()).filter(|s| !s.is_empty())),
                or_dash(Some(entry.new.as_str()).filter(|s| !s.is_empty())),
            );
        }
    }
    Ok(())
}
