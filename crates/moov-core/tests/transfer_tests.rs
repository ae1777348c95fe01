use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use moov_core::store::{CloneOptions, RecordStore};
use moov_core::{Error, Item, ItemId, LibraryId, LinkMode, MemoryStore, TransferEngine, TransferOptions};
use moov_fs::{LocalFs, NormalizedPath};
use moov_test_utils::{TestLibrary, TestTree};
use pretty_assertions::assert_eq;

fn manual() -> TransferOptions {
    TransferOptions {
        ignore_linked: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_move_relinks_reparents_and_erases_original() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .imported(2, 1, "/src/a.pdf")
        .note(3, 2);
    let mut original = lib.item(2).unwrap();
    original.collections = vec!["COLL1".into()];
    lib.store.insert(original.clone());

    let report = lib
        .engine()
        .move_many(&[original], "/dst", &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    let new_id = report.outcomes[0].result.as_ref().unwrap().unwrap();

    assert!(!lib.has_file("/src/a.pdf"));
    assert!(lib.has_file("/dst/a.pdf"));
    assert!(lib.item(2).is_none(), "original record erased");

    let linked = lib.item(new_id.0).unwrap();
    assert_eq!(linked.link_mode, Some(LinkMode::LinkedFile));
    assert_eq!(linked.path, Some(NormalizedPath::new("/dst/a.pdf")));
    assert_eq!(linked.parent, Some(ItemId(1)));
    assert_eq!(linked.collections, vec!["COLL1".to_string()]);

    assert_eq!(lib.item(3).unwrap().parent, Some(new_id), "children follow the new record");
    assert_eq!(lib.store.indexed(), vec![new_id]);
}

#[tokio::test]
async fn test_copy_leaves_source_and_records() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .imported(2, 1, "/src/a.pdf");
    let before = lib.store.snapshot();

    let report = lib
        .engine()
        .copy_many(&lib.items(&[2]), "/dst", &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    assert!(lib.has_file("/src/a.pdf"));
    assert!(lib.has_file("/dst/a.pdf"));
    assert_eq!(lib.store.snapshot(), before);
}

#[tokio::test]
async fn test_move_skips_linked_when_ignoring_linked() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .linked(2, 1, "/elsewhere/a.pdf");

    let report = lib
        .engine()
        .move_many(&lib.items(&[2]), "/dst", &TransferOptions::default())
        .await
        .unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(report.skipped_filtered, vec![ItemId(2)]);
    assert!(lib.fs.operations().is_empty());
}

// Copies never look at the link mode, even with `ignore_linked` set.
#[tokio::test]
async fn test_copy_ignores_link_mode_filter() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .linked(2, 1, "/elsewhere/a.pdf");

    let report = lib
        .engine()
        .copy_many(&lib.items(&[2]), "/dst", &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    assert!(lib.has_file("/dst/a.pdf"));
}

#[tokio::test]
async fn test_second_move_is_a_noop() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .imported(2, 1, "/src/a.pdf");
    let engine = lib.engine();

    let first = engine
        .move_many(&lib.items(&[2]), "/dst", &manual())
        .await
        .unwrap();
    let new_id = first.outcomes[0].result.as_ref().unwrap().unwrap();
    let ops_after_first = lib.fs.operations();
    let snapshot_after_first = lib.store.snapshot();

    let second = engine
        .move_many(&lib.items(&[new_id.0]), "/dst", &manual())
        .await
        .unwrap();

    assert!(second.outcomes.is_empty());
    assert_eq!(second.skipped_noop, vec![new_id]);
    assert_eq!(lib.fs.operations(), ops_after_first);
    assert_eq!(lib.store.snapshot(), snapshot_after_first);
}

#[tokio::test]
async fn test_failure_is_isolated_per_record() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .imported(2, 1, "/src/a.pdf")
        .imported(3, 1, "/src/b.pdf")
        .imported(4, 1, "/src/c.pdf");
    lib.fs.fail_on("/src/b.pdf", ErrorKind::PermissionDenied);

    let report = lib
        .engine()
        .move_many(&lib.items(&[2, 3, 4]), "/dst", &TransferOptions::default())
        .await
        .unwrap();

    let failed: Vec<ItemId> = report.failed().map(|o| o.item_id).collect();
    assert_eq!(failed, vec![ItemId(3)]);
    assert_eq!(report.succeeded().count(), 2);
    assert!(lib.has_file("/dst/a.pdf"));
    assert!(lib.has_file("/dst/c.pdf"));
    assert!(lib.has_file("/src/b.pdf"));
    assert!(lib.item(3).is_some());
}

#[tokio::test]
async fn test_failed_save_leaves_moved_file_and_original_record() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .imported(2, 1, "/src/a.pdf");
    lib.store.fail_saves(true);

    let report = lib
        .engine()
        .move_many(&lib.items(&[2]), "/dst", &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(report.failed().count(), 1);
    assert!(lib.has_file("/dst/a.pdf"), "the file move is not rolled back");
    assert_eq!(
        lib.item(2).unwrap().path,
        Some(NormalizedPath::new("/src/a.pdf"))
    );
}

#[tokio::test]
async fn test_subfolder_template_on_real_disk() {
    let tree = TestTree::new();
    let source = tree.write("inbox/a.pdf", "pdf bytes");
    let store = Arc::new(MemoryStore::new());
    let lib = TestLibrary {
        store: store.clone(),
        ..TestLibrary::new()
    }
    .paper(1, "Lovelace", "1843");
    store.insert(
        moov_core::Item::attachment(ItemId(2), "ATT", LinkMode::ImportedUrl, source)
            .with_parent(ItemId(1)),
    );
    let engine = TransferEngine::new(store.clone(), Arc::new(LocalFs::new()), store.clone(), store.clone());
    let options = TransferOptions {
        into_subfolder: true,
        subdir_template: "%a/{%y - }%T".into(),
        ..Default::default()
    };

    let report = engine
        .move_many(&lib.items(&[2]), tree.normalized("papers").as_str(), &options)
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    tree.assert_not_exists("inbox/a.pdf");
    tree.assert_content("papers/Lovelace/1843 - journalArticle/a.pdf", "pdf bytes");

    let new_id = report.outcomes[0].result.as_ref().unwrap().unwrap();
    let linked = store.get(new_id).await.unwrap().unwrap();
    assert_eq!(
        linked.path,
        Some(tree.normalized("papers/Lovelace/1843 - journalArticle/a.pdf"))
    );
}

#[tokio::test]
async fn test_same_file_name_in_one_batch_keeps_both_files() {
    let tree = TestTree::new();
    let first = tree.write("s1/Full Text.pdf", "first");
    let second = tree.write("s2/Full Text.pdf", "second");
    let store = Arc::new(MemoryStore::new());
    store.insert(Item::attachment(ItemId(1), "ONE", LinkMode::ImportedFile, first));
    store.insert(Item::attachment(ItemId(2), "TWO", LinkMode::ImportedFile, second));
    let items = store.get_many(&[ItemId(1), ItemId(2)]).await.unwrap();
    let engine = TransferEngine::new(store.clone(), Arc::new(LocalFs::new()), store.clone(), store.clone());

    let report = engine
        .move_many(&items, tree.normalized("dst").as_str(), &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 1);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].item_id, ItemId(2));
    assert!(matches!(
        failed[0].result,
        Err(Error::Fs(moov_fs::Error::AlreadyExists { .. }))
    ));

    tree.assert_content("dst/Full Text.pdf", "first");
    tree.assert_content("s2/Full Text.pdf", "second");
    assert!(store.contains(ItemId(2)), "rejected record keeps its original");
}

/// Delegates to a [`MemoryStore`] but fails lookups of one record.
struct FailingLookupStore {
    inner: Arc<MemoryStore>,
    broken: ItemId,
}

#[async_trait]
impl RecordStore for FailingLookupStore {
    async fn get(&self, id: ItemId) -> moov_core::Result<Option<Item>> {
        if id == self.broken {
            return Err(Error::store(format!("lookup of {id} failed")));
        }
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[ItemId]) -> moov_core::Result<Vec<Item>> {
        self.inner.get_many(ids).await
    }

    async fn get_by_key(&self, library: LibraryId, key: &str) -> moov_core::Result<Option<Item>> {
        self.inner.get_by_key(library, key).await
    }

    async fn attachments_of(&self, parent: ItemId) -> moov_core::Result<Vec<Item>> {
        self.inner.attachments_of(parent).await
    }

    fn clone_item(&self, item: &Item, options: CloneOptions) -> Item {
        self.inner.clone_item(item, options)
    }

    async fn save(&self, item: &Item) -> moov_core::Result<ItemId> {
        self.inner.save(item).await
    }

    async fn move_child_items(&self, from: ItemId, to: ItemId) -> moov_core::Result<()> {
        self.inner.move_child_items(from, to).await
    }
}

#[tokio::test]
async fn test_parent_lookup_failure_fails_only_that_record() {
    let lib = TestLibrary::new()
        .paper(1, "Lovelace", "1843")
        .paper(2, "Hopper", "1952")
        .imported(3, 1, "/src/a.pdf")
        .imported(4, 2, "/src/b.pdf");
    let store = Arc::new(FailingLookupStore {
        inner: lib.store.clone(),
        broken: ItemId(1),
    });
    let engine = TransferEngine::new(store, lib.fs.clone(), lib.store.clone(), lib.store.clone());
    let options = TransferOptions {
        into_subfolder: true,
        subdir_template: "%a".into(),
        ..Default::default()
    };

    let report = engine
        .copy_many(&lib.items(&[3, 4]), "/dst", &options)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].item_id, ItemId(3));
    assert_eq!(failed[0].destination, None);
    assert!(lib.has_file("/dst/Hopper/b.pdf"));
    assert!(!lib.has_file("/dst/Lovelace/a.pdf"));
}
