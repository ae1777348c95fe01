//! Library and preference loading for a single CLI invocation

use std::path::Path;
use std::sync::Arc;

use moov_core::{Bindings, HostContext, ItemId, MemoryStore, PrefStore};
use moov_fs::{LocalFs, NormalizedPath};

use crate::error::{CliError, Result};

/// The library snapshot, preferences and real filesystem a command runs
/// against.
pub struct Session {
    library_path: NormalizedPath,
    pub store: Arc<MemoryStore>,
    pub prefs: Arc<PrefStore>,
}

impl Session {
    /// Load the library at `library` and, if given, the preference file.
    pub fn open(library: &Path, prefs: Option<&Path>) -> Result<Self> {
        let library_path = NormalizedPath::new(library);
        if !library_path.is_file() {
            return Err(CliError::user(format!(
                "Library not found: {}",
                library_path
            )));
        }
        let store = MemoryStore::load(&library_path)?;

        let prefs = match prefs {
            Some(path) => PrefStore::load(&NormalizedPath::new(path))?,
            None => PrefStore::new(),
        };
        tracing::debug!(library = %library_path, "Opened library");

        Ok(Self {
            library_path,
            store: Arc::new(store),
            prefs: Arc::new(prefs),
        })
    }

    /// Install the engine over this session's store and the local disk.
    pub fn bind(&self) -> Bindings {
        Bindings::init(HostContext::memory(
            Arc::clone(&self.store),
            Arc::new(LocalFs::new()),
            self.prefs.clone(),
        ))
    }

    /// Fail if any id is unknown, so typos are not silently skipped.
    pub fn require_ids(&self, ids: &[u64]) -> Result<Vec<ItemId>> {
        ids.iter()
            .map(|&raw| {
                let id = ItemId(raw);
                if self.store.contains(id) {
                    Ok(id)
                } else {
                    Err(CliError::user(format!("No record with id {raw}")))
                }
            })
            .collect()
    }

    /// Write the library back atomically.
    pub fn save(&self) -> Result<()> {
        self.store.save_snapshot(&self.library_path)?;
        tracing::debug!(library = %self.library_path, "Saved library");
        Ok(())
    }
}
