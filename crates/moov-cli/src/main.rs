//! moov CLI
//!
//! Moves, copies and erases attachment files of a library snapshot on the
//! local disk.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::Session;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    let Some(command) = cli.command else {
        // No command provided - show help hint
        println!("{} attachment mover", "moov".green().bold());
        println!();
        println!("Run {} for available commands.", "moov --help".cyan());
        return Ok(());
    };

    let session = Session::open(&cli.library, cli.prefs.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_command(&session, command))
}

async fn execute_command(session: &Session, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Transfer { ids, to } => {
            commands::run_transfer(session, &ids, to.as_deref()).await
        }
        Commands::Preview { ids, to, json } => {
            commands::run_preview(session, &ids, to.as_deref(), json).await
        }
        Commands::Erase { ids } => commands::run_erase(session, &ids).await,
    }
}
