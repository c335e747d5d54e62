#![forbid(unsafe_code)]

mod cmd;
mod output;
mod store;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cmd::CommandContext;
use encore_core::config::resolve_config;
use encore_core::error::ErrorCode;
use encore_core::filter::ArchiveClock;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use store::JsonFileStore;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_TICKET_FILE: &str = "tickets.json";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "enc: personal performance ticket archive",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Config file. Defaults to `<config dir>/encore/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ticket file. Falls back to `ENCORE_TICKETS`, then `./tickets.json`.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Acting user ID. Falls back to `ENCORE_USER`.
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self, config_default: Option<&str>) -> OutputMode {
        resolve_output_mode(self.format, self.json, config_default)
    }

    fn ticket_file(&self) -> PathBuf {
        self.file
            .clone()
            .or_else(|| env::var_os("ENCORE_TICKETS").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TICKET_FILE))
    }

    fn acting_user(&self) -> Option<String> {
        self.user.clone().or_else(|| env::var("ENCORE_USER").ok())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List tickets by time window",
        long_about = "List the user's tickets newest first, with per-window counts.",
        after_help = "EXAMPLES:\n    # Everything\n    enc history --user u1\n\n    # This month only\n    enc history --user u1 --window thisMonth\n\n    # Emit machine-readable output\n    enc history --user u1 --json"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show which visit a ticket was",
        long_about = "Rank a ticket among the owner's tickets for the same title by performance date.",
        after_help = "EXAMPLES:\n    # Which Hamlet visit was this?\n    enc visits t42"
    )]
    Visits(cmd::visits::VisitsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Search the user's tickets",
        long_about = "Filter the user's tickets by title, venue, artist, genre and date range. All given filters must match.",
        after_help = "EXAMPLES:\n    # Musicals in the first quarter\n    enc search --user u1 --genre MUSICAL --from 2024-01-01 --to 2024-03-31\n\n    # By venue\n    enc search --user u1 --venue \"Blue Hall\""
    )]
    Search(cmd::search::SearchArgs),

    #[command(
        next_help_heading = "Write",
        about = "Edit a ticket",
        long_about = "Stage field changes on one of the user's tickets and save them in a single update.",
        after_help = "EXAMPLES:\n    # Fix the seat and time\n    enc edit t42 --user u1 --seat B7 --time 19:30\n\n    # Clear the review\n    enc edit t42 --user u1 --review \"\""
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Write",
        about = "Like or unlike a ticket",
        long_about = "Toggle the acting user's like on a ticket and print the server's count.",
        after_help = "EXAMPLES:\n    # Toggle a like\n    enc like t42 --user fan\n\n    # Toggle and list everyone who likes it\n    enc like t42 --user fan --who"
    )]
    Like(cmd::like::LikeArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ENCORE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "encore=debug,info"
        } else {
            "encore=info,warn"
        })
    });

    let format = env::var("ENCORE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Current time, or `ENCORE_NOW` (RFC 3339) when pinned.
fn now() -> anyhow::Result<DateTime<Utc>> {
    match env::var("ENCORE_NOW") {
        Ok(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .with_context(|| format!("invalid ENCORE_NOW '{raw}'")),
        Err(_) => Ok(Utc::now()),
    }
}

fn build_context(cli: &Cli) -> anyhow::Result<CommandContext> {
    let early_output = cli.output_mode(None);
    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                early_output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    let output = cli.output_mode(config.output.as_deref());

    let clock = match ArchiveClock::from_config(now()?, &config.archive) {
        Ok(clock) => clock,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::InvalidUtcOffset, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };

    let path = cli.ticket_file();
    let store = match JsonFileStore::open(&path) {
        Ok(store) => store,
        Err(err) => {
            render_error(
                output,
                &CliError::new(format!("{err:#}"))
                    .with_suggestion("pass --file <tickets.json> or set ENCORE_TICKETS"),
            )?;
            return Err(err);
        }
    };

    Ok(CommandContext {
        output,
        config,
        store,
        user: cli.acting_user(),
        clock,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let ctx = build_context(&cli)?;

    match cli.command {
        Commands::History(ref args) => cmd::history::run_history(args, &ctx).await,
        Commands::Visits(ref args) => cmd::visits::run_visits(args, &ctx).await,
        Commands::Search(ref args) => cmd::search::run_search(args, &ctx).await,
        Commands::Edit(ref args) => cmd::edit::run_edit(args, &ctx).await,
        Commands::Like(ref args) => cmd::like::run_like(args, &ctx).await,
    }
}
