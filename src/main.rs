mod commands;
mod config;
mod factory;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::App;

#[derive(Parser)]
#[command(name = "calblock")]
#[command(about = "Mirror busy time across your calendars as private blocker events")]
struct Cli {
    /// Config file (defaults to ~/.config/calblock/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite store, overriding `database_path` from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update and remove blockers so every calendar shows the others' busy time
    Sync,
    /// Delete every blocker calblock has created and forget them
    Desync,
    /// Delete every blocker-marked event from tracked calendars, including untracked leftovers
    Cleanup,
    /// Register a calendar
    Add {
        /// Account the calendar belongs to (e.g. me@gmail.com)
        account: String,

        /// "google" or "caldav"
        #[arg(short, long)]
        provider: Option<String>,

        /// Google calendar ID, or the CalDAV collection path/URL
        #[arg(short, long)]
        calendar_id: Option<String>,

        /// Configured CalDAV server name (from [caldav_servers.<name>])
        #[arg(short, long)]
        server: Option<String>,
    },
    /// Show registered calendars and their blocker counts
    List,
    /// Stop tracking a calendar and remove the blockers it is involved in
    Remove {
        account: String,
        calendar_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Authorize a Google account
    Auth { account: String },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let app = App::load(cli.config.as_deref(), cli.db.as_deref()).await?;

    match cli.command {
        Commands::Sync => commands::sync::run(&app).await,
        Commands::Desync => commands::desync::run(&app).await,
        Commands::Cleanup => commands::cleanup::run(&app).await,
        Commands::Add {
            account,
            provider,
            calendar_id,
            server,
        } => commands::add::run(&app, account, provider, calendar_id, server).await,
        Commands::List => commands::list::run(&app).await,
        Commands::Remove {
            account,
            calendar_id,
            yes,
        } => commands::remove::run(&app, &account, &calendar_id, yes).await,
        Commands::Auth { account } => commands::auth::run(&app, &account).await,
    }
}
