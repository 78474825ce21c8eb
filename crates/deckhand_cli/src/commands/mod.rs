//! CLI command definitions.
//!
//! Running `deckhand` without a subcommand starts the bot.

use clap::{Parser, Subcommand};

pub mod check_key;
pub mod run;

/// deckhand - drive Render services from Telegram
#[derive(Parser)]
#[command(name = "deckhand")]
#[command(version, about = "deckhand - drive Render services from Telegram")]
#[command(long_about = r#"
deckhand is a Telegram bot that lets each chat user log in with their own
Render API key and manage services: deploys, logs, environment variables,
suspend/resume, scaling, renames and deletion.

COMMANDS:
  run        → Start the bot (default when no subcommand is given)
  check-key  → Validate a Render API key and print the account

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
  4 - API key rejected
"#)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    pub log_json: bool,

    #[command(flatten)]
    pub run: run::RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot
    Run(run::RunArgs),

    /// Validate a Render API key
    CheckKey(check_key::CheckKeyArgs),
}
