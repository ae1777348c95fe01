//! Preview command implementation

use colored::Colorize;
use serde_json::json;

use crate::context::Session;
use crate::error::Result;

/// Run the preview command
pub async fn run_preview(session: &Session, ids: &[u64], to: Option<&str>, json: bool) -> Result<()> {
    let selection = session.require_ids(ids)?;
    let bindings = session.bind();
    let plan = bindings.actions().preview(&selection, to).await;
    bindings.destroy();
    let plan = plan?;

    if json {
        let tasks: Vec<_> = plan
            .tasks
            .iter()
            .map(|task| {
                json!({
                    "item": task.item.id,
                    "source": task.source,
                    "destination": task.destination,
                })
            })
            .collect();
        let rejected: Vec<_> = plan
            .rejected
            .iter()
            .map(|rejected| {
                json!({
                    "item": rejected.item_id,
                    "source": rejected.source,
                    "destination": rejected.destination,
                    "error": rejected.error.to_string(),
                })
            })
            .collect();
        let output = json!({
            "tasks": tasks,
            "rejected": rejected,
            "skipped_filtered": plan.skipped_filtered,
            "skipped_noop": plan.skipped_noop,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if plan.tasks.is_empty() && plan.rejected.is_empty() {
        println!("{}", "Nothing to transfer".dimmed());
    }
    for task in &plan.tasks {
        println!("{} -> {}", task.source, task.destination.as_str().cyan());
    }
    for rejected in &plan.rejected {
        println!(
            "{} {} ({})",
            "conflict".red().bold(),
            rejected.source,
            rejected.error
        );
    }
    for id in &plan.skipped_noop {
        println!("{} record {} is already in place", "note:".dimmed(), id);
    }
    Ok(())
}
