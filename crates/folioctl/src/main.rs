//! Folio Control - terminal driver for the Folio progress engine
//!
//! Stands in for the portfolio UI: visits pages, grants XP and shows the
//! resulting progress from the local store.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folioctl")]
#[command(about = "Folio - gamified portfolio progress", long_about = None)]
#[command(version = folio_common::VERSION)]
struct Cli {
    /// Config file (default: ~/.config/folio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show XP, level and unlock progress
    Status {
        /// Print the raw state as JSON
        #[arg(long)]
        json: bool,
    },

    /// List zones and their requirements
    Zones,

    /// Visit a page
    Visit {
        page: String,
    },

    /// Grant XP directly
    Award {
        #[arg(allow_negative_numbers = true)]
        amount: i64,

        /// Source tag shown in the toast
        #[arg(long, default_value = "general")]
        source: String,
    },

    /// Unlock a skill, puzzle or anime once
    Unlock {
        /// skill, puzzle or anime
        kind: String,

        id: String,

        /// Override the configured reward
        #[arg(long)]
        xp: Option<u64>,
    },

    /// Set a special flag
    Flag {
        name: String,

        /// on or off
        value: String,
    },

    /// Add (or remove) affection points
    Affection {
        #[arg(allow_negative_numbers = true)]
        points: i64,
    },

    /// Print the effective configuration
    Config,

    /// Erase all progress
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref(), cli.store)?;

    match cli.command {
        Commands::Status { json } => commands::status(config, json),
        Commands::Zones => commands::zones(config),
        Commands::Visit { page } => commands::visit(config, &page),
        Commands::Award { amount, source } => commands::award(config, amount, &source),
        Commands::Unlock { kind, id, xp } => commands::unlock(config, &kind, &id, xp),
        Commands::Flag { name, value } => commands::flag(config, &name, &value),
        Commands::Affection { points } => commands::affection(config, points),
        Commands::Config => commands::show_config(&config),
        Commands::Reset { yes } => commands::reset(config, yes),
    }
}
