use super::{or_dash, perform, report_effect, Session};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use crm_core::{
    application::{ApplicationDraft, OpportunityApplication},
    types::ApplicationStatus,
    workflow::Action,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ApplicationSubcommand {
    /// Turn a qualified visit into an opportunity application
    Submit {
        /// Visit id (see `crm visit eligible`)
        visit_id: String,
        /// 预计签单金额, in yuan
        #[arg(long)]
        amount: Option<String>,
        /// 产品线, e.g. ai_platform or "AI 平台"
        #[arg(long)]
        product_line: Option<String>,
        /// 签单概率, e.g. 60%
        #[arg(long)]
        probability: Option<String>,
    },
    /// Approve a pending application (managers only)
    Approve { code: String },
    /// Reject a pending application with a reason (managers only)
    Reject {
        code: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// List applications visible to the acting user
    List {
        /// Only applications with this status (pending, approved, rejected)
        #[arg(long)]
        status: Option<String>,
    },
    /// Count applications by status
    Summary,
}

pub fn run(
    root: &Path,
    as_user: Option<&str>,
    subcmd: ApplicationSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let action = match subcmd {
        ApplicationSubcommand::Submit {
            visit_id,
            amount,
            product_line,
            probability,
        } => Action::SubmitApplication {
            visit_id,
            draft: ApplicationDraft {
                amount,
                product_line,
                probability,
            },
        },
        ApplicationSubcommand::Approve { code } => Action::Approve { code },
        ApplicationSubcommand::Reject { code, reason } => Action::Reject {
            code,
            reason: reason.join(" "),
        },
        ApplicationSubcommand::List { status } => {
            return list(root, as_user, status.as_deref(), json)
        }
        ApplicationSubcommand::Summary => return summary(root, as_user, json),
    };

    let effect = perform(root, as_user, action)?;
    report_effect(&effect, json)
}

fn list(root: &Path, as_user: Option<&str>, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let status = status.map(str::parse::<ApplicationStatus>).transpose()?;
    let Session { state, actor, .. } = Session::open(root, as_user)?;
    let apps: Vec<&OpportunityApplication> = state
        .applications_for(&actor)
        .into_iter()
        .filter(|a| status.map_or(true, |s| a.status == s))
        .collect();

    if json {
        return print_json(&apps);
    }
    if apps.is_empty() {
        println!("No applications.");
        return Ok(());
    }
    let rows = apps
        .iter()
        .map(|a| {
            vec![
                a.code.clone(),
                or_dash(a.customer.as_deref()),
                a.amount.grouped(),
                a.product_line.to_string(),
                a.probability.to_string(),
                a.applicant.clone(),
                a.status.to_string(),
                or_dash(a.rejection_reason.as_deref()),
            ]
        })
        .collect();
    print_table(
        &[
            "CODE",
            "CUSTOMER",
            "AMOUNT",
            "PRODUCT",
            "PROBABILITY",
            "APPLICANT",
            "STATUS",
            "REASON",
        ],
        rows,
    );
    Ok(())
}

fn summary(root: &Path, as_user: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Session { state, actor, .. } = Session::open(root, as_user)?;
    let s = state.application_summary(&actor);
    if json {
        return print_json(&s);
    }
    println!("全部: {}", s.total);
    println!("{}: {}", ApplicationStatus::Pending, s.pending);
    println!("{}: {}", ApplicationStatus::Approved, s.approved);
    println!("{}: {}", ApplicationStatus::Rejected, s.rejected);
    Ok(())
}
