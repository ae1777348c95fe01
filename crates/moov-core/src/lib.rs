//! Attachment file reconciliation for a reference library
//!
//! Keeps the files behind a reference manager's attachments in a
//! user-chosen directory tree:
//!
//! - **Transfers**: move (or copy) attachment files into the managed tree,
//!   optionally into templated subfolders, replacing moved records with
//!   linked ones
//! - **Auto-transfer**: a debounced observer that batches newly added
//!   attachments once the host stops modifying them
//! - **Interception**: decorators around host erase, conversion and sync
//!   operations so deleted records take their files with them
//!
//! # Architecture
//!
//! ```text
//!              moov-cli / host plugin
//!                        |
//!                    Bindings
//!          +-------------+--------------+
//!          |             |              |
//!   AutoMoveObserver  ManualActions  Interceptors
//!          |             |              |
//!          +----> TransferEngine   DeletionCoordinator
//!                        |              |
//!                 RecordStore        moov-fs
//! ```
//!
//! The host is reached only through the traits in [`store`];
//! [`MemoryStore`] implements all of them.

pub mod actions;
pub mod bindings;
pub mod deletion;
pub mod error;
pub mod intercept;
pub mod model;
pub mod observer;
pub mod prefs;
pub mod resolver;
pub mod store;
pub mod suppress;
pub mod template;
pub mod transfer;

pub use actions::ManualActions;
pub use bindings::{Bindings, HostContext};
pub use deletion::{DeleteOptions, DeletionCoordinator, DeletionReport};
pub use error::{Error, Result};
pub use intercept::{
    FileDeletingEraser, HostServices, Interceptors, LinkedAwareDeletedItems, SuppressingConverter,
};
pub use model::{Creator, Item, ItemId, ItemKind, ItemMetadata, LibraryId, LinkMode};
pub use observer::{AutoMoveObserver, PendingChangeSet};
pub use prefs::{FileBehavior, PrefKey, PrefStore, Preferences, Settings};
pub use resolver::compute_destination;
pub use store::{LibrarySnapshot, MemoryStore};
pub use suppress::{NotifySuppressor, SuppressGuard};
pub use template::{Template, expand};
pub use transfer::{
    BatchReport, PlannedTransfer, RejectedTransfer, TransferEngine, TransferMode, TransferOptions,
    TransferOutcome, TransferPlan,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_types_are_accessible() {
        let err = Error::ItemNotFound { id: ItemId(7) };
        assert_eq!(err.to_string(), "Item not found: 7");
    }
}
