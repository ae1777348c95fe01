//! Erase command implementation

use colored::Colorize;
use moov_core::store::{EraseOptions, ItemEraser, RecordStore};

use crate::context::Session;
use crate::error::Result;

/// Run the erase command
///
/// Erasure goes through the intercepted eraser, so linked files inside
/// dst_dir are deleted when `delete_files` is on.
pub async fn run_erase(session: &Session, ids: &[u64]) -> Result<()> {
    let selection = session.require_ids(ids)?;
    let bindings = session.bind();
    let eraser = bindings.eraser();

    let mut result = Ok(());
    for id in selection {
        // An earlier erase may already have taken this record with its parent
        let Some(item) = session.store.get(id).await? else {
            continue;
        };
        if let Err(e) = eraser.erase(&item, EraseOptions::default()).await {
            result = Err(e);
            break;
        }
        println!("{} {}", "erased".green(), id);
    }
    bindings.destroy();

    session.save()?;
    Ok(result?)
}
