//! In-memory host store
//!
//! Implements every host collaborator over a map of records and raises the
//! same notifications a real host would: `Add` for new records, `Modify`
//! for updates and reparenting, `Delete` for erasure.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use moov_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use super::{
    CloneOptions, DeletedItemsSource, DeletedObjects, EraseOptions, FulltextIndexer, ItemEraser,
    LibraryType, LinkedFileConverter, Notifier, NotifyEvent, NotifyType, Observer, ObserverId,
    RecordStore,
};
use crate::model::{Item, ItemId, LibraryId, LinkMode};
use crate::{Error, Result};

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    /// Libraries that refuse edits unless the edit check is skipped
    #[serde(default)]
    pub read_only: Vec<LibraryId>,
    /// Keys of erased records, as the sync layer would upload them
    #[serde(default)]
    pub delete_log: Vec<String>,
    /// Keys the sync server reports as deleted in the user library
    #[serde(default)]
    pub remote_deleted: Vec<String>,
}

#[derive(Default)]
struct State {
    items: BTreeMap<ItemId, Item>,
    read_only: BTreeSet<LibraryId>,
    delete_log: Vec<String>,
    remote_deleted: Vec<String>,
    indexed: Vec<ItemId>,
    fail_saves: bool,
}

impl State {
    fn next_id(&self) -> ItemId {
        let max = self.items.keys().next_back().map_or(0, |id| id.0);
        ItemId(max + 1)
    }

    fn require(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(Error::ItemNotFound { id })
    }

    /// `root` and all records below it, parents before children.
    fn subtree(&self, root: ItemId) -> Vec<ItemId> {
        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            let current = ids[cursor];
            ids.extend(
                self.items
                    .values()
                    .filter(|item| item.parent == Some(current))
                    .map(|item| item.id),
            );
            cursor += 1;
        }
        ids
    }
}

struct Registration {
    id: ObserverId,
    types: Vec<NotifyType>,
    priority: i32,
    observer: Arc<dyn Observer>,
}

/// A complete host backend held in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    observers: Mutex<Vec<Registration>>,
    next_observer: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LibrarySnapshot) -> Self {
        let store = Self::new();
        {
            let mut state = store.state();
            state.items = snapshot.items.into_iter().map(|i| (i.id, i)).collect();
            state.read_only = snapshot.read_only.into_iter().collect();
            state.delete_log = snapshot.delete_log;
            state.remote_deleted = snapshot.remote_deleted;
        }
        store
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        let state = self.state();
        LibrarySnapshot {
            items: state.items.values().cloned().collect(),
            read_only: state.read_only.iter().copied().collect(),
            delete_log: state.delete_log.clone(),
            remote_deleted: state.remote_deleted.clone(),
        }
    }

    /// Load a JSON/TOML/YAML library snapshot.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let snapshot: LibrarySnapshot = ConfigStore::new().load(path)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save_snapshot(&self, path: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(path, &self.snapshot())?;
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a record without raising notifications.
    pub fn insert(&self, item: Item) {
        self.state().items.insert(item.id, item);
    }

    pub fn items(&self) -> Vec<Item> {
        self.state().items.values().cloned().collect()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.state().items.contains_key(&id)
    }

    pub fn set_read_only(&self, library: LibraryId, read_only: bool) {
        let mut state = self.state();
        if read_only {
            state.read_only.insert(library);
        } else {
            state.read_only.remove(&library);
        }
    }

    /// Make every subsequent `save` fail, to exercise partial-move handling.
    pub fn fail_saves(&self, fail: bool) {
        self.state().fail_saves = fail;
    }

    /// Ids handed to the full-text indexer so far.
    pub fn indexed(&self) -> Vec<ItemId> {
        self.state().indexed.clone()
    }

    pub fn delete_log(&self) -> Vec<String> {
        self.state().delete_log.clone()
    }

    /// Record keys as deleted on the (simulated) sync server.
    pub fn set_remote_deleted(&self, keys: Vec<String>) {
        self.state().remote_deleted = keys;
    }

    async fn dispatch(&self, event: NotifyEvent, ids: &[ItemId]) {
        if ids.is_empty() {
            return;
        }
        let observers: Vec<Arc<dyn Observer>> = {
            let registered = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut matching: Vec<&Registration> = registered
                .iter()
                .filter(|r| r.types.contains(&NotifyType::Item))
                .collect();
            matching.sort_by_key(|r| r.priority);
            matching.iter().map(|r| Arc::clone(&r.observer)).collect()
        };
        for observer in observers {
            observer.notify(event, NotifyType::Item, ids).await;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.state().items.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect())
    }

    async fn get_by_key(&self, library: LibraryId, key: &str) -> Result<Option<Item>> {
        Ok(self
            .state()
            .items
            .values()
            .find(|item| item.library == library && item.key == key)
            .cloned())
    }

    async fn attachments_of(&self, parent: ItemId) -> Result<Vec<Item>> {
        Ok(self
            .state()
            .items
            .values()
            .filter(|item| item.parent == Some(parent) && item.is_attachment())
            .cloned()
            .collect())
    }

    fn clone_item(&self, item: &Item, options: CloneOptions) -> Item {
        Item {
            id: ItemId::NEW,
            key: String::new(),
            collections: if options.include_collections {
                item.collections.clone()
            } else {
                Vec::new()
            },
            ..item.clone()
        }
    }

    async fn save(&self, item: &Item) -> Result<ItemId> {
        let (id, event) = {
            let mut state = self.state();
            if state.fail_saves {
                return Err(Error::store(format!("save rejected for item {}", item.id)));
            }
            let mut item = item.clone();
            let event = if item.id.is_new() {
                item.id = state.next_id();
                if item.key.is_empty() {
                    item.key = format!("{:08X}", item.id.0);
                }
                NotifyEvent::Add
            } else {
                state.require(item.id)?;
                NotifyEvent::Modify
            };
            let id = item.id;
            state.items.insert(id, item);
            (id, event)
        };
        self.dispatch(event, &[id]).await;
        Ok(id)
    }

    async fn move_child_items(&self, from: ItemId, to: ItemId) -> Result<()> {
        let moved: Vec<ItemId> = {
            let mut state = self.state();
            state.require(from)?;
            state.require(to)?;
            state
                .items
                .values_mut()
                .filter(|item| item.parent == Some(from))
                .map(|item| {
                    item.parent = Some(to);
                    item.id
                })
                .collect()
        };
        self.dispatch(NotifyEvent::Modify, &moved).await;
        Ok(())
    }
}

#[async_trait]
impl ItemEraser for MemoryStore {
    async fn erase(&self, item: &Item, options: EraseOptions) -> Result<()> {
        let removed = {
            let mut state = self.state();
            let library = state.require(item.id)?.library;
            if state.read_only.contains(&library) && !options.skip_edit_check {
                return Err(Error::store(format!("library {library:?} is read-only")));
            }
            let ids = state.subtree(item.id);
            for id in &ids {
                if let Some(erased) = state.items.remove(id)
                    && !options.skip_delete_log
                {
                    state.delete_log.push(erased.key);
                }
            }
            ids
        };
        self.dispatch(NotifyEvent::Delete, &removed).await;
        Ok(())
    }
}

#[async_trait]
impl LinkedFileConverter for MemoryStore {
    async fn convert_linked_file_to_stored_file(&self, item: &Item) -> Result<Option<Item>> {
        if !item.is_linked_file() {
            return Ok(None);
        }
        let converted = Item {
            link_mode: Some(LinkMode::ImportedFile),
            ..item.clone()
        };
        self.save(&converted).await?;
        Ok(Some(converted))
    }
}

#[async_trait]
impl DeletedItemsSource for MemoryStore {
    async fn get_deleted(&self, library_type: LibraryType, _since: u64) -> Result<DeletedObjects> {
        let items = match library_type {
            LibraryType::User => self.state().remote_deleted.clone(),
            LibraryType::Group => Vec::new(),
        };
        Ok(DeletedObjects {
            items,
            ..Default::default()
        })
    }
}

#[async_trait]
impl FulltextIndexer for MemoryStore {
    async fn index_items(&self, ids: &[ItemId]) -> Result<()> {
        self.state().indexed.extend_from_slice(ids);
        Ok(())
    }
}

impl Notifier for MemoryStore {
    fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        types: &[NotifyType],
        name: &str,
        priority: i32,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(observer = name, id = id.0, "Registering observer");
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                types: types.to_vec(),
                priority,
                observer,
            });
        id
    }

    fn unregister_observer(&self, id: ObserverId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.id != id);
    }
}
