mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, intent::IntentSubcommand, phase::PhaseSubcommand,
    validate::ValidateSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "waveplan",
    about = "Validate phase plans and measure drift from project intent",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .planning/ or .git/)
    #[arg(long, global = true, env = "WAVEPLAN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold .planning/ in the current project
    Init,

    /// Inspect phases and their plans
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Check a phase's dependency graph and wave assignments
    Validate {
        #[command(subcommand)]
        subcommand: ValidateSubcommand,
    },

    /// Desired outcomes, plan tracing and drift scoring
    Intent {
        #[command(subcommand)]
        subcommand: IntentSubcommand,
    },

    /// Validate the project configuration
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
    tracing::debug!(root = %root.display(), "resolved project root");

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand, cli.json),
        Commands::Validate { subcommand } => cmd::validate::run(&root, subcommand, cli.json),
        Commands::Intent { subcommand } => cmd::intent::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
