use super::Session;
use crate::output::{print_json, print_table};
use chrono::Local;
use clap::Subcommand;
use crm_core::types::Period;
use std::path::Path;

#[derive(Subcommand)]
pub enum ReportSubcommand {
    /// Opportunity count and amount per pipeline stage
    Funnel,
    /// Visit-to-application conversion rate
    Conversion {
        /// month, quarter, year or all (or 本月, 本季度, 本年, 全部)
        #[arg(long, default_value = "month")]
        period: String,
    },
    /// Per-salesperson performance (managers only)
    Ranking,
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: ReportSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, as_user)?;
    match subcmd {
        ReportSubcommand::Funnel => funnel(&session, json),
        ReportSubcommand::Conversion { period } => conversion(&session, period.parse()?, json),
        ReportSubcommand::Ranking => ranking(&session, json),
    }
}

fn funnel(session: &Session, json: bool) -> anyhow::Result<()> {
    let f = session.state.funnel(&session.actor);
    if json {
        return print_json(&f);
    }
    let rows = f
        .rows
        .iter()
        .map(|r| {
            vec![
                format!("{}. {}", r.stage.order(), r.stage),
                r.count.to_string(),
                r.amount.grouped(),
            ]
        })
        .collect();
    print_table(&["STAGE", "COUNT", "AMOUNT"], rows);
    println!(
        "\nTotal: {} opportunities, {} ({} active stages)",
        f.total_count,
        f.total_amount.grouped(),
        f.active_stages
    );
    Ok(())
}

fn conversion(session: &Session, period: Period, json: bool) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let c = session.state.conversion(&session.actor, period, today, &Local);
    if json {
        return print_json(&c);
    }
    match c.since {
        Some(since) => println!("{} (since {since})", c.period),
        None => println!("{}", c.period),
    }
    println!("  visits:       {}", c.visits);
    println!("  applications: {}", c.applications);
    println!("  conversion:   {}%", c.rate);
    Ok(())
}

fn ranking(session: &Session, json: bool) -> anyhow::Result<()> {
    let board = session.state.leaderboard(&session.actor)?;
    if json {
        return print_json(&board);
    }
    if board.is_empty() {
        println!("No visits logged yet.");
        return Ok(());
    }
    let rows = board
        .iter()
        .enumerate()
        .map(|(i, p)| {
            vec![
                (i + 1).to_string(),
                p.salesperson.clone(),
                p.visits.to_string(),
                p.applications.to_string(),
                p.opportunities.to_string(),
                p.won.to_string(),
                p.pipeline_amount.grouped(),
                p.won_amount.grouped(),
                format!("{}%", p.win_rate),
            ]
        })
        .collect();
    print_table(
        &[
            "#",
            "SALESPERSON",
            "VISITS",
            "APPS",
            "OPPS",
            "WON",
            "PIPELINE",
            "WON AMOUNT",
            "WIN RATE",
        ],
        rows,
    );
    Ok(())
}
