//! Decorators around host operations
//!
//! Three host operations get extra behaviour while the plugin is active:
//!
//! - converting a linked file to a stored file mutes the auto-transfer
//!   observer, so the conversion is not immediately undone;
//! - erasing a record also deletes its linked file from the managed tree;
//! - records deleted remotely are erased locally *without* touching their
//!   linked files, since another machine's deletion says nothing about
//!   this machine's disk.
//!
//! [`Interceptors`] builds the wrapped services and keeps the originals so
//! they can be handed back on shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use moov_fs::FileSystem;

use crate::Result;
use crate::deletion::{DeleteOptions, DeletionCoordinator};
use crate::model::{Item, LibraryId};
use crate::prefs::{Preferences, Settings};
use crate::store::{
    DeletedItemsSource, DeletedObjects, EraseOptions, ItemEraser, LibraryType,
    LinkedFileConverter, RecordStore,
};
use crate::suppress::NotifySuppressor;

/// The unwrapped host operations.
#[derive(Clone)]
pub struct HostServices {
    pub eraser: Arc<dyn ItemEraser>,
    pub converter: Arc<dyn LinkedFileConverter>,
    pub deleted_items: Arc<dyn DeletedItemsSource>,
}

/// Mutes notifications for the duration of a conversion.
pub struct SuppressingConverter {
    inner: Arc<dyn LinkedFileConverter>,
    suppressor: NotifySuppressor,
}

impl SuppressingConverter {
    pub fn new(inner: Arc<dyn LinkedFileConverter>, suppressor: NotifySuppressor) -> Self {
        Self { inner, suppressor }
    }

    pub fn into_inner(self) -> Arc<dyn LinkedFileConverter> {
        self.inner
    }
}

#[async_trait]
impl LinkedFileConverter for SuppressingConverter {
    async fn convert_linked_file_to_stored_file(&self, item: &Item) -> Result<Option<Item>> {
        let _guard = self.suppressor.suppress();
        self.inner.convert_linked_file_to_stored_file(item).await
    }
}

/// Deletes an erased record's linked file after the erase succeeds.
pub struct FileDeletingEraser {
    inner: Arc<dyn ItemEraser>,
    prefs: Arc<dyn Preferences>,
    coordinator: DeletionCoordinator,
}

impl FileDeletingEraser {
    pub fn new(
        inner: Arc<dyn ItemEraser>,
        prefs: Arc<dyn Preferences>,
        coordinator: DeletionCoordinator,
    ) -> Self {
        Self {
            inner,
            prefs,
            coordinator,
        }
    }

    pub fn into_inner(self) -> Arc<dyn ItemEraser> {
        self.inner
    }
}

#[async_trait]
impl ItemEraser for FileDeletingEraser {
    async fn erase(&self, item: &Item, options: EraseOptions) -> Result<()> {
        self.inner.erase(item, options).await?;

        let settings = Settings::load_lenient(self.prefs.as_ref());
        if settings.delete_files {
            let report = self
                .coordinator
                .delete(
                    std::slice::from_ref(item),
                    &settings.dst_dir,
                    DeleteOptions {
                        prune_empty_dir: settings.prune_empty_dir,
                    },
                )
                .await;
            for (id, e) in &report.errors {
                tracing::warn!(item = %id, "Record erased but its file was not deleted: {}", e);
            }
        }

        Ok(())
    }
}

/// Erases remotely deleted linked-file records locally, bypassing file
/// deletion, and hides them from the caller.
pub struct LinkedAwareDeletedItems {
    inner: Arc<dyn DeletedItemsSource>,
    store: Arc<dyn RecordStore>,
    /// Must be the host's own eraser, not [`FileDeletingEraser`]
    eraser: Arc<dyn ItemEraser>,
    prefs: Arc<dyn Preferences>,
}

impl LinkedAwareDeletedItems {
    pub fn new(
        inner: Arc<dyn DeletedItemsSource>,
        store: Arc<dyn RecordStore>,
        eraser: Arc<dyn ItemEraser>,
        prefs: Arc<dyn Preferences>,
    ) -> Self {
        Self {
            inner,
            store,
            eraser,
            prefs,
        }
    }

    pub fn into_inner(self) -> Arc<dyn DeletedItemsSource> {
        self.inner
    }
}

#[async_trait]
impl DeletedItemsSource for LinkedAwareDeletedItems {
    async fn get_deleted(&self, library_type: LibraryType, since: u64) -> Result<DeletedObjects> {
        let mut deleted = self.inner.get_deleted(library_type, since).await?;

        // Linked files only exist in the user library
        if library_type != LibraryType::User || !Settings::load_lenient(self.prefs.as_ref()).delete_files {
            return Ok(deleted);
        }

        let mut remaining = Vec::with_capacity(deleted.items.len());
        for key in deleted.items {
            let local = self.store.get_by_key(LibraryId::User, &key).await?;
            let Some(item) = local.filter(Item::is_linked_file) else {
                remaining.push(key);
                continue;
            };

            let options = EraseOptions {
                skip_edit_check: true,
                skip_delete_log: true,
            };
            match self.eraser.erase(&item, options).await {
                Ok(()) => tracing::debug!(key = %key, "Erased remotely deleted linked attachment, file kept"),
                Err(e) => tracing::warn!(key = %key, "Failed to erase remotely deleted attachment: {}", e),
            }
        }
        deleted.items = remaining;

        Ok(deleted)
    }
}

/// The installed decorators plus the originals they wrap.
pub struct Interceptors {
    original: HostServices,
    eraser: Arc<FileDeletingEraser>,
    converter: Arc<SuppressingConverter>,
    deleted_items: Arc<LinkedAwareDeletedItems>,
}

impl Interceptors {
    pub fn install(
        original: HostServices,
        store: Arc<dyn RecordStore>,
        fs: Arc<dyn FileSystem>,
        prefs: Arc<dyn Preferences>,
        suppressor: NotifySuppressor,
    ) -> Self {
        let eraser = Arc::new(FileDeletingEraser::new(
            Arc::clone(&original.eraser),
            Arc::clone(&prefs),
            DeletionCoordinator::new(fs),
        ));
        let converter = Arc::new(SuppressingConverter::new(
            Arc::clone(&original.converter),
            suppressor,
        ));
        let deleted_items = Arc::new(LinkedAwareDeletedItems::new(
            Arc::clone(&original.deleted_items),
            store,
            Arc::clone(&original.eraser),
            prefs,
        ));
        Self {
            original,
            eraser,
            converter,
            deleted_items,
        }
    }

    pub fn eraser(&self) -> Arc<dyn ItemEraser> {
        self.eraser.clone()
    }

    pub fn converter(&self) -> Arc<dyn LinkedFileConverter> {
        self.converter.clone()
    }

    pub fn deleted_items(&self) -> Arc<dyn DeletedItemsSource> {
        self.deleted_items.clone()
    }

    /// Drop the decorators and return the services they wrapped.
    pub fn restore(self) -> HostServices {
        self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemId, LinkMode};
    use crate::prefs::{PrefKey, PrefStore};
    use crate::store::MemoryStore;
    use moov_fs::{MemoryFs, NormalizedPath};

    struct FixedDeleted(Vec<&'static str>);

    #[async_trait]
    impl DeletedItemsSource for FixedDeleted {
        async fn get_deleted(&self, _: LibraryType, _: u64) -> Result<DeletedObjects> {
            Ok(DeletedObjects {
                items: self.0.iter().map(|k| k.to_string()).collect(),
                ..Default::default()
            })
        }
    }

    struct Setup {
        store: Arc<MemoryStore>,
        fs: Arc<MemoryFs>,
        interceptors: Interceptors,
    }

    fn setup(prefs: PrefStore, remote: Vec<&'static str>) -> Setup {
        let store = Arc::new(MemoryStore::new());
        let fs = Arc::new(MemoryFs::new());
        let interceptors = Interceptors::install(
            HostServices {
                eraser: store.clone(),
                converter: store.clone(),
                deleted_items: Arc::new(FixedDeleted(remote)),
            },
            store.clone(),
            fs.clone(),
            Arc::new(prefs.with(PrefKey::DstDir, "/dst")),
            NotifySuppressor::new(),
        );
        Setup {
            store,
            fs,
            interceptors,
        }
    }

    fn linked(id: u64, key: &str, path: &str) -> Item {
        Item::attachment(ItemId(id), key, LinkMode::LinkedFile, path)
    }

    #[tokio::test]
    async fn erase_deletes_linked_file_and_prunes() {
        let s = setup(PrefStore::new(), vec![]);
        s.fs.add_file("/dst/sub/a.pdf", "pdf");
        s.store.insert(linked(1, "A", "/dst/sub/a.pdf"));

        s.interceptors
            .eraser()
            .erase(&linked(1, "A", "/dst/sub/a.pdf"), EraseOptions::default())
            .await
            .unwrap();

        assert!(!s.store.contains(ItemId(1)));
        assert!(!s.fs.has_file(&"/dst/sub/a.pdf".into()));
        assert!(!s.fs.has_dir(&"/dst/sub".into()));
        assert!(s.fs.has_dir(&NormalizedPath::new("/dst")));
    }

    #[tokio::test]
    async fn erase_keeps_file_when_deletion_disabled() {
        let s = setup(PrefStore::new().with(PrefKey::DeleteFiles, false), vec![]);
        s.fs.add_file("/dst/a.pdf", "pdf");
        s.store.insert(linked(1, "A", "/dst/a.pdf"));

        s.interceptors
            .eraser()
            .erase(&linked(1, "A", "/dst/a.pdf"), EraseOptions::default())
            .await
            .unwrap();

        assert!(s.fs.has_file(&"/dst/a.pdf".into()));
    }

    #[tokio::test]
    async fn failed_erase_leaves_file() {
        let s = setup(PrefStore::new(), vec![]);
        s.fs.add_file("/dst/a.pdf", "pdf");

        let result = s
            .interceptors
            .eraser()
            .erase(&linked(1, "A", "/dst/a.pdf"), EraseOptions::default())
            .await;

        assert!(result.is_err());
        assert!(s.fs.has_file(&"/dst/a.pdf".into()));
    }

    #[tokio::test]
    async fn sync_erases_linked_locally_and_filters_keys() {
        let s = setup(PrefStore::new(), vec!["LINKED", "IMPORTED", "UNKNOWN"]);
        s.fs.add_file("/dst/a.pdf", "pdf");
        s.store.insert(linked(1, "LINKED", "/dst/a.pdf"));
        s.store
            .insert(Item::attachment(ItemId(2), "IMPORTED", LinkMode::ImportedFile, "/s/b.pdf"));

        let deleted = s
            .interceptors
            .deleted_items()
            .get_deleted(LibraryType::User, 0)
            .await
            .unwrap();

        assert_eq!(deleted.items, vec!["IMPORTED", "UNKNOWN"]);
        assert!(!s.store.contains(ItemId(1)));
        assert!(s.fs.has_file(&"/dst/a.pdf".into()), "remote deletion keeps the file");
        assert!(s.store.delete_log().is_empty());
    }

    #[tokio::test]
    async fn sync_for_group_library_passes_through() {
        let s = setup(PrefStore::new(), vec!["LINKED"]);
        s.store.insert(linked(1, "LINKED", "/dst/a.pdf"));

        let deleted = s
            .interceptors
            .deleted_items()
            .get_deleted(LibraryType::Group, 0)
            .await
            .unwrap();

        assert_eq!(deleted.items, vec!["LINKED"]);
        assert!(s.store.contains(ItemId(1)));
    }

    #[tokio::test]
    async fn conversion_is_suppressed_only_while_running() {
        struct RecordsSuppression(NotifySuppressor);

        #[async_trait]
        impl LinkedFileConverter for RecordsSuppression {
            async fn convert_linked_file_to_stored_file(&self, _: &Item) -> Result<Option<Item>> {
                assert!(self.0.is_suppressed());
                Err(crate::Error::store("conversion failed"))
            }
        }

        let suppressor = NotifySuppressor::new();
        let converter = SuppressingConverter::new(Arc::new(RecordsSuppression(suppressor.clone())), suppressor.clone());

        let result = converter
            .convert_linked_file_to_stored_file(&linked(1, "A", "/dst/a.pdf"))
            .await;

        assert!(result.is_err());
        assert!(!suppressor.is_suppressed());
    }

    #[tokio::test]
    async fn restored_eraser_leaves_files_alone() {
        let s = setup(PrefStore::new(), vec![]);
        s.fs.add_file("/dst/a.pdf", "pdf");
        s.store.insert(linked(1, "A", "/dst/a.pdf"));

        let original = s.interceptors.restore();
        original
            .eraser
            .erase(&linked(1, "A", "/dst/a.pdf"), EraseOptions::default())
            .await
            .unwrap();

        assert!(!s.store.contains(ItemId(1)));
        assert!(s.fs.has_file(&"/dst/a.pdf".into()));
    }
}
