//! deckhand CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error
//! - 4: API key rejected

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deckhand_api::ApiError;

mod commands;
mod config;
mod health;
mod telegram;

use commands::{Cli, Commands};
use config::ConfigError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
    pub const AUTH_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ExitCodes::INVALID_ARGS)
            } else {
                ExitCode::from(ExitCodes::SUCCESS)
            };
        }
    };

    init_logging(&cli);

    let result = match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::CheckKey(args) => commands::check_key::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "deckhand_api={level},deckhand_chat={level},deckhand={level},warn"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if cli.log_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<ConfigError>().is_some() {
        return ExitCodes::CONFIG_ERROR;
    }
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthenticated) => ExitCodes::AUTH_FAILURE,
        Some(err) if matches!(err.status(), Some(401 | 403)) => ExitCodes::AUTH_FAILURE,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
