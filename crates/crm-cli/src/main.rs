mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    application::ApplicationSubcommand, config::ConfigSubcommand, customer::CustomerSubcommand,
    opportunity::OpportunitySubcommand, report::ReportSubcommand, user::UserSubcommand,
    visit::VisitSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "crm",
    about = "Sales desk: customers, visit records, opportunity approval and pipeline reports",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .crm/ or .git/)
    #[arg(long, global = true, env = "CRM_ROOT")]
    root: Option<PathBuf>,

    /// Act as this user instead of the configured active user
    #[arg(long = "as", global = true, env = "CRM_USER", value_name = "NAME")]
    as_user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the CRM store in the current project
    Init,

    /// Show record counts and the latest notice
    State,

    /// Show the latest notice
    Notice {
        /// Show every retained notice, oldest first
        #[arg(long)]
        all: bool,
    },

    /// Inspect and switch the acting user
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Manage customers
    Customer {
        #[command(subcommand)]
        subcommand: CustomerSubcommand,
    },

    /// Log and list visit records
    Visit {
        #[command(subcommand)]
        subcommand: VisitSubcommand,
    },

    /// Submit and decide opportunity applications
    Application {
        #[command(subcommand)]
        subcommand: ApplicationSubcommand,
    },

    /// Track approved opportunities through the pipeline
    Opportunity {
        #[command(subcommand)]
        subcommand: OpportunitySubcommand,
    },

    /// Funnel, conversion and ranking reports
    Report {
        #[command(subcommand)]
        subcommand: ReportSubcommand,
    },

    /// Inspect and validate .crm/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let as_user = cli.as_user.as_deref();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::State => cmd::state::run(&root, as_user, cli.json),
        Commands::Notice { all } => cmd::notice::run(&root, all, cli.json),
        Commands::User { subcommand } => cmd::user::run(&root, as_user, subcommand, cli.json),
        Commands::Customer { subcommand } => {
            cmd::customer::run(&root, as_user, subcommand, cli.json)
        }
        Commands::Visit { subcommand } => cmd::visit::run(&root, as_user, subcommand, cli.json),
        Commands::Application { subcommand } => {
            cmd::application::run(&root, as_user, subcommand, cli.json)
        }
        Commands::Opportunity { subcommand } => {
            cmd::opportunity::run(&root, as_user, subcommand, cli.json)
        }
        Commands::Report { subcommand } => cmd::report::run(&root, as_user, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
