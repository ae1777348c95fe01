use moov_core::store::{
    DeletedItemsSource, EraseOptions, ItemEraser, LibraryType, LinkedFileConverter, RecordStore,
};
use moov_core::{Bindings, ItemId, LinkMode, PrefKey};
use moov_test_utils::TestLibrary;
use pretty_assertions::assert_eq;

fn library() -> TestLibrary {
    TestLibrary::new()
        .with_dst("/dst")
        .paper(1, "Lovelace", "1843")
        .linked(2, 1, "/dst/Lovelace/a.pdf")
        .imported(3, 1, "/src/b.pdf")
}

#[tokio::test]
async fn test_erase_deletes_managed_file_and_prunes() {
    let lib = library();
    let bindings = Bindings::init(lib.host());

    bindings
        .eraser()
        .erase(&lib.item(2).unwrap(), EraseOptions::default())
        .await
        .unwrap();

    assert!(lib.item(2).is_none());
    assert!(!lib.has_file("/dst/Lovelace/a.pdf"));
    assert!(!lib.has_dir("/dst/Lovelace"));
    assert!(lib.has_dir("/dst"));
}

#[tokio::test]
async fn test_erase_keeps_file_when_deletion_disabled() {
    let lib = library().with_pref(PrefKey::DeleteFiles, false);
    let bindings = Bindings::init(lib.host());

    bindings
        .eraser()
        .erase(&lib.item(2).unwrap(), EraseOptions::default())
        .await
        .unwrap();

    assert!(lib.has_file("/dst/Lovelace/a.pdf"));
}

#[tokio::test]
async fn test_remote_deletion_keeps_linked_file() {
    let lib = library();
    lib.store
        .set_remote_deleted(vec!["ATT002".into(), "ATT003".into(), "GONE".into()]);
    let bindings = Bindings::init(lib.host());

    let deleted = bindings
        .deleted_items()
        .get_deleted(LibraryType::User, 0)
        .await
        .unwrap();

    assert_eq!(deleted.items, vec!["ATT003", "GONE"]);
    assert!(lib.item(2).is_none(), "linked record erased locally");
    assert!(lib.has_file("/dst/Lovelace/a.pdf"));
    assert!(lib.store.delete_log().is_empty());
}

#[tokio::test]
async fn test_remote_deletion_untouched_when_deletion_disabled() {
    let lib = library().with_pref(PrefKey::DeleteFiles, false);
    lib.store.set_remote_deleted(vec!["ATT002".into()]);
    let bindings = Bindings::init(lib.host());

    let deleted = bindings
        .deleted_items()
        .get_deleted(LibraryType::User, 0)
        .await
        .unwrap();

    assert_eq!(deleted.items, vec!["ATT002"]);
    assert!(lib.item(2).is_some());
}

#[tokio::test]
async fn test_conversion_does_not_arm_auto_transfer() {
    let lib = library();
    let bindings = Bindings::init(lib.host());

    let converted = bindings
        .converter()
        .convert_linked_file_to_stored_file(&lib.item(2).unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(converted.link_mode, Some(LinkMode::ImportedFile));
    assert!(!bindings.observer().is_timer_armed());

    // An ordinary modification still arms it
    lib.store.save(&lib.item(3).unwrap()).await.unwrap();
    assert!(bindings.observer().is_timer_armed());
    bindings.destroy();
}

#[tokio::test]
async fn test_manual_move_through_bindings() {
    let lib = library()
        .with_pref(PrefKey::EnableSubdirMove, true)
        .with_pref(PrefKey::SubdirectoryString, "%a");
    let bindings = Bindings::init(lib.host());

    let report = bindings.actions().transfer_selected(&[ItemId(1)]).await.unwrap();

    // a.pdf is already in place; b.pdf moves next to it
    assert_eq!(report.skipped_noop, vec![ItemId(2)]);
    assert_eq!(report.succeeded().count(), 1);
    assert!(lib.has_file("/dst/Lovelace/b.pdf"));
    assert!(lib.has_file("/dst/Lovelace/a.pdf"));
    assert!(lib.item(3).is_none());
    bindings.destroy();
}

#[tokio::test]
async fn test_destroy_restores_plain_eraser() {
    let lib = library();
    let bindings = Bindings::init(lib.host());

    let original = bindings.destroy();
    original
        .eraser
        .erase(&lib.item(2).unwrap(), EraseOptions::default())
        .await
        .unwrap();

    assert!(lib.item(2).is_none());
    assert!(lib.has_file("/dst/Lovelace/a.pdf"));
}
