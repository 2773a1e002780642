mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod format;
mod infra;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use crate::cmd::dispatch::{USAGE, dispatch};
use crate::cmd::parse::parse_args;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::intent::Intent;
use crate::error::AppResult;
use crate::infra::jira::JiraClient;

#[derive(Parser)]
#[command(
    name = "tix",
    author,
    version,
    about = "Look up, search and create Jira tickets with short text commands"
)]
struct Cli {
    /// Log more detail to stderr (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// The command, e.g. `ABC-123`, `search "login bug"`, `sprint ABC`,
    /// `sprint tickets ABC 42` or `create --json ticket.json`.
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.command.is_empty() {
        eprintln!("Please provide a Jira command. Example: ticket PROJ-123");
        std::process::exit(1);
    }

    match run(&cli.command).await {
        Ok(output) => println!("{output}"),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tix={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: &[String]) -> AppResult<String> {
    run_with(args, AppConfig::load).await
}

/// Parses the command first so an unrecognised one prints usage without
/// touching configuration.
async fn run_with<F>(args: &[String], load_config: F) -> AppResult<String>
where
    F: FnOnce() -> AppResult<AppConfig>,
{
    let intent = parse_args(args);
    if let Intent::Invalid { raw_input } = &intent {
        tracing::debug!(%raw_input, "no command rule matched");
        return Ok(USAGE.to_string());
    }

    let config = load_config()?;
    for setting in config.missing_settings() {
        tracing::warn!("{setting} is not set; requests to Jira will fail");
    }

    let issue_tracker = Arc::new(JiraClient::new(&config));
    let context = AppContext::new(config, issue_tracker);

    dispatch(&context, intent).await
}
