//! Transfer command implementation

use colored::Colorize;
use moov_core::{BatchReport, Settings};

use crate::context::Session;
use crate::error::{CliError, Result};

/// Run the transfer command
pub async fn run_transfer(session: &Session, ids: &[u64], to: Option<&str>) -> Result<()> {
    let selection = session.require_ids(ids)?;
    let settings = Settings::load(session.prefs.as_ref())?;
    if to.is_none() && settings.dst_dir.is_empty() {
        return Err(CliError::user(
            "No destination: set dst_dir in the preference file or pass --to",
        ));
    }

    let bindings = session.bind();
    let result = match to {
        Some(dir) => bindings.actions().transfer_selected_to(&selection, dir).await,
        None => bindings.actions().transfer_selected(&selection).await,
    };
    bindings.destroy();
    let report = result?;

    // Records may have changed even if some transfers failed
    session.save()?;
    print_report(&report, &settings);

    let failed = report.failed().count();
    if failed > 0 {
        return Err(CliError::user(format!("{failed} transfer(s) failed")));
    }
    Ok(())
}

fn print_report(report: &BatchReport, settings: &Settings) {
    let verb = match settings.file_behavior {
        moov_core::FileBehavior::Move => "moved",
        moov_core::FileBehavior::Copy => "copied",
    };

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!(
                "{} {} -> {}",
                verb.green(),
                outcome.source,
                outcome
                    .destination
                    .as_ref()
                    .map(|d| d.as_str())
                    .unwrap_or_default()
            ),
            Err(e) => println!(
                "{} {} ({})",
                "failed".red().bold(),
                outcome.source,
                e
            ),
        }
    }

    let skipped = report.skipped_filtered.len() + report.skipped_noop.len();
    if skipped > 0 {
        println!("{} {} record(s) skipped", "note:".dimmed(), skipped);
    }
    if report.outcomes.is_empty() && skipped == 0 {
        println!("{}", "Nothing to transfer".dimmed());
    }
}
