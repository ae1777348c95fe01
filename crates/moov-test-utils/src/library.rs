//! [`TestLibrary`]: an in-memory host for engine scenarios.

use std::sync::Arc;

use moov_core::{
    Creator, HostContext, Item, ItemId, ItemMetadata, LinkMode, MemoryStore, PrefKey, PrefStore,
    TransferEngine,
};
use moov_fs::{MemoryFs, NormalizedPath};

/// A [`MemoryStore`], a [`MemoryFs`] and a preference map, seeded through
/// builder-style helpers.
///
/// # Example
///
/// ```rust,no_run
/// use moov_test_utils::TestLibrary;
///
/// let lib = TestLibrary::new()
///     .with_dst("/dst")
///     .paper(1, "Lovelace", "1843")
///     .imported(2, 1, "/src/a.pdf");
/// assert!(lib.has_file("/src/a.pdf"));
/// ```
pub struct TestLibrary {
    pub store: Arc<MemoryStore>,
    pub fs: Arc<MemoryFs>,
    pub prefs: Arc<PrefStore>,
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLibrary {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            fs: Arc::new(MemoryFs::new()),
            prefs: Arc::new(PrefStore::new()),
        }
    }

    pub fn with_pref(self, key: PrefKey, value: impl Into<serde_json::Value>) -> Self {
        self.prefs.set(key, value);
        self
    }

    pub fn with_dst(self, dst: &str) -> Self {
        self.with_pref(PrefKey::DstDir, dst)
    }

    /// Seed a regular item with one author and a date.
    pub fn paper(self, id: u64, author: &str, date: &str) -> Self {
        self.store.insert(Item::regular(
            ItemId(id),
            format!("PAPER{id:03}"),
            ItemMetadata {
                item_type: Some("journalArticle".into()),
                title: Some(format!("Paper {id}")),
                creators: vec![Creator::author("A.", author)],
                date: Some(date.into()),
                ..Default::default()
            },
        ));
        self
    }

    /// Seed an imported attachment under `parent` and its file.
    pub fn imported(self, id: u64, parent: u64, path: &str) -> Self {
        self.attachment(id, parent, LinkMode::ImportedFile, path)
    }

    /// Seed a linked attachment under `parent` and its file.
    pub fn linked(self, id: u64, parent: u64, path: &str) -> Self {
        self.attachment(id, parent, LinkMode::LinkedFile, path)
    }

    fn attachment(self, id: u64, parent: u64, link_mode: LinkMode, path: &str) -> Self {
        self.store.insert(
            Item::attachment(ItemId(id), format!("ATT{id:03}"), link_mode, path)
                .with_parent(ItemId(parent)),
        );
        self.fs.add_file(path, format!("contents of {path}"));
        self
    }

    /// Seed a note under `parent`.
    pub fn note(self, id: u64, parent: u64) -> Self {
        let mut note = Item::regular(ItemId(id), format!("NOTE{id:03}"), ItemMetadata::default())
            .with_parent(ItemId(parent));
        note.kind = moov_core::ItemKind::Note;
        self.store.insert(note);
        self
    }

    pub fn item(&self, id: u64) -> Option<Item> {
        self.store
            .items()
            .into_iter()
            .find(|item| item.id == ItemId(id))
    }

    /// Fetch records by id, panicking on unknown ids.
    pub fn items(&self, ids: &[u64]) -> Vec<Item> {
        ids.iter()
            .map(|&id| {
                self.item(id)
                    .unwrap_or_else(|| panic!("TestLibrary: no item with id {id}"))
            })
            .collect()
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.fs.has_file(&NormalizedPath::new(path))
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.fs.has_dir(&NormalizedPath::new(path))
    }

    /// An engine that erases through the store directly.
    pub fn engine(&self) -> TransferEngine {
        TransferEngine::new(
            self.store.clone(),
            self.fs.clone(),
            self.store.clone(),
            self.store.clone(),
        )
    }

    pub fn host(&self) -> HostContext {
        HostContext::memory(self.store.clone(), self.fs.clone(), self.prefs.clone())
    }
}
