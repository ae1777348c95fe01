//! Host collaborators
//!
//! The engine never touches the host's database directly. Everything it
//! needs from the host is expressed as one of the traits below, which the
//! embedding application implements (and [`MemoryStore`] implements for
//! tests and the CLI).

mod memory;

pub use memory::{LibrarySnapshot, MemoryStore};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::{Item, ItemId, LibraryId};

/// Options for [`RecordStore::clone_item`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneOptions {
    /// Copy collection membership onto the clone
    pub include_collections: bool,
}

/// Options for [`ItemEraser::erase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EraseOptions {
    /// Erase even if the library is read-only
    pub skip_edit_check: bool,
    /// Do not record the deletion for sync
    pub skip_delete_log: bool,
}

/// Record lookups and transactional writes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// Resolve ids to records, silently skipping unknown ids.
    async fn get_many(&self, ids: &[ItemId]) -> Result<Vec<Item>>;

    async fn get_by_key(&self, library: LibraryId, key: &str) -> Result<Option<Item>>;

    /// Child attachments of a regular item.
    async fn attachments_of(&self, parent: ItemId) -> Result<Vec<Item>>;

    /// Build an unsaved copy of `item` (its id is [`ItemId::NEW`]).
    fn clone_item(&self, item: &Item, options: CloneOptions) -> Item;

    /// Persist an item in its own transaction, returning its id.
    ///
    /// New items (id [`ItemId::NEW`]) are assigned an id and a key.
    async fn save(&self, item: &Item) -> Result<ItemId>;

    /// Reparent every child of `from` onto `to` in one transaction.
    async fn move_child_items(&self, from: ItemId, to: ItemId) -> Result<()>;
}

/// The host's record erasure.
#[async_trait]
pub trait ItemEraser: Send + Sync {
    async fn erase(&self, item: &Item, options: EraseOptions) -> Result<()>;
}

/// The host's "convert linked file to stored file" operation.
#[async_trait]
pub trait LinkedFileConverter: Send + Sync {
    /// Returns the converted record, or `None` if nothing was converted.
    async fn convert_linked_file_to_stored_file(&self, item: &Item) -> Result<Option<Item>>;
}

/// Library type as the sync API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryType {
    User,
    Group,
}

/// Keys the sync server reports as deleted since a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObjects {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub searches: Vec<String>,
}

/// The sync client's "get deleted" call.
#[async_trait]
pub trait DeletedItemsSource: Send + Sync {
    async fn get_deleted(&self, library_type: LibraryType, since: u64) -> Result<DeletedObjects>;
}

/// Full-text indexing of attachment contents.
#[async_trait]
pub trait FulltextIndexer: Send + Sync {
    async fn index_items(&self, ids: &[ItemId]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyEvent {
    Add,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyType {
    Item,
    Collection,
}

/// Receiver of host change notifications.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn notify(&self, event: NotifyEvent, notify_type: NotifyType, ids: &[ItemId]);
}

/// Handle returned by [`Notifier::register_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// The host's notification hub.
pub trait Notifier: Send + Sync {
    /// Observers with a lower priority number are notified first.
    fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        types: &[NotifyType],
        name: &str,
        priority: i32,
    ) -> ObserverId;

    fn unregister_observer(&self, id: ObserverId);
}
