//! User-triggered transfers of a selection

use std::collections::HashSet;
use std::sync::Arc;

use crate::Result;
use crate::model::{Item, ItemId};
use crate::prefs::{Preferences, Settings};
use crate::transfer::{BatchReport, TransferEngine, TransferOptions, TransferPlan};

/// Transfers started from a selection of records rather than by the observer.
///
/// Unlike automatic transfers these never skip linked files: a user who
/// explicitly selects an attachment wants it moved.
#[derive(Clone)]
pub struct ManualActions {
    engine: TransferEngine,
    prefs: Arc<dyn Preferences>,
}

impl ManualActions {
    pub fn new(engine: TransferEngine, prefs: Arc<dyn Preferences>) -> Self {
        Self { engine, prefs }
    }

    /// Expand a selection to attachments.
    ///
    /// Selected regular items contribute their child attachments; selected
    /// attachments are kept as they are. Order follows the selection and
    /// each attachment appears once.
    pub async fn collect_attachments(&self, selection: &[ItemId]) -> Result<Vec<Item>> {
        let store = self.engine.store();
        let mut seen = HashSet::new();
        let mut attachments = Vec::new();

        for item in store.get_many(selection).await? {
            let expanded = if item.is_regular() {
                store.attachments_of(item.id).await?
            } else if item.is_attachment() {
                vec![item]
            } else {
                Vec::new()
            };
            attachments.extend(expanded.into_iter().filter(|a| seen.insert(a.id)));
        }

        Ok(attachments)
    }

    /// Transfer the selection into the configured destination, honouring
    /// the subfolder settings.
    pub async fn transfer_selected(&self, selection: &[ItemId]) -> Result<BatchReport> {
        let settings = Settings::load(self.prefs.as_ref())?;
        let options = Self::configured_options(&settings);
        let items = self.collect_attachments(selection).await?;
        self.engine
            .transfer_many(settings.file_behavior.into(), &items, &settings.dst_dir, &options)
            .await
    }

    /// Transfer the selection straight into `dir`, without subfolders.
    pub async fn transfer_selected_to(&self, selection: &[ItemId], dir: &str) -> Result<BatchReport> {
        let settings = Settings::load(self.prefs.as_ref())?;
        let items = self.collect_attachments(selection).await?;
        self.engine
            .transfer_many(settings.file_behavior.into(), &items, dir, &Self::custom_dir_options())
            .await
    }

    /// What [`transfer_selected`](Self::transfer_selected) or, with `dir`,
    /// [`transfer_selected_to`](Self::transfer_selected_to) would do.
    pub async fn preview(&self, selection: &[ItemId], dir: Option<&str>) -> Result<TransferPlan> {
        let settings = Settings::load(self.prefs.as_ref())?;
        let items = self.collect_attachments(selection).await?;
        match dir {
            Some(dir) => {
                self.engine
                    .resolve_many(&items, dir, &Self::custom_dir_options())
                    .await
            }
            None => {
                self.engine
                    .resolve_many(&items, &settings.dst_dir, &Self::configured_options(&settings))
                    .await
            }
        }
    }

    fn configured_options(settings: &Settings) -> TransferOptions {
        TransferOptions {
            ignore_linked: false,
            into_subfolder: settings.subfolder_enabled,
            subdir_template: settings.subdir_template.clone(),
        }
    }

    fn custom_dir_options() -> TransferOptions {
        TransferOptions {
            ignore_linked: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemMetadata, LinkMode};
    use crate::prefs::{PrefKey, PrefStore};
    use crate::store::MemoryStore;
    use moov_fs::{MemoryFs, NormalizedPath};
    use pretty_assertions::assert_eq;

    fn actions(prefs: PrefStore) -> (Arc<MemoryStore>, Arc<MemoryFs>, ManualActions) {
        let store = Arc::new(MemoryStore::new());
        let fs = Arc::new(MemoryFs::new());
        let engine = TransferEngine::new(store.clone(), fs.clone(), store.clone(), store.clone());
        store.insert(Item::regular(ItemId(1), "P", ItemMetadata::default()));
        store.insert(
            Item::attachment(ItemId(2), "A", LinkMode::ImportedFile, "/src/a.pdf")
                .with_parent(ItemId(1)),
        );
        store.insert(
            Item::attachment(ItemId(3), "B", LinkMode::LinkedFile, "/elsewhere/b.pdf")
                .with_parent(ItemId(1)),
        );
        fs.add_file("/src/a.pdf", "a");
        fs.add_file("/elsewhere/b.pdf", "b");
        (store, fs, ManualActions::new(engine, Arc::new(prefs)))
    }

    #[tokio::test]
    async fn selection_expands_and_dedups() {
        let (_store, _fs, actions) = actions(PrefStore::new());

        let ids: Vec<ItemId> = actions
            .collect_attachments(&[ItemId(3), ItemId(1), ItemId(99)])
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(ids, vec![ItemId(3), ItemId(2)]);
    }

    #[tokio::test]
    async fn manual_move_includes_linked_files() {
        let (_store, fs, actions) = actions(PrefStore::new().with(PrefKey::DstDir, "/dst"));

        let report = actions.transfer_selected(&[ItemId(1)]).await.unwrap();

        assert_eq!(report.succeeded().count(), 2);
        assert!(fs.has_file(&"/dst/a.pdf".into()));
        assert!(fs.has_file(&"/dst/b.pdf".into()));
    }

    #[tokio::test]
    async fn custom_dir_ignores_subfolder_setting() {
        let (_store, _fs, actions) = actions(
            PrefStore::new()
                .with(PrefKey::DstDir, "/dst")
                .with(PrefKey::EnableSubdirMove, true)
                .with(PrefKey::SubdirectoryString, "sub"),
        );

        let configured = actions.preview(&[ItemId(2)], None).await.unwrap();
        let custom = actions.preview(&[ItemId(2)], Some("/custom")).await.unwrap();

        assert_eq!(configured.tasks[0].destination, NormalizedPath::new("/dst/sub/a.pdf"));
        assert_eq!(custom.tasks[0].destination, NormalizedPath::new("/custom/a.pdf"));
    }

    #[tokio::test]
    async fn copy_behavior_leaves_records() {
        let (store, fs, actions) = actions(PrefStore::new().with(PrefKey::FileBehavior, "copy"));

        let report = actions.transfer_selected_to(&[ItemId(2)], "/out").await.unwrap();

        assert_eq!(report.succeeded().count(), 1);
        assert!(fs.has_file(&"/src/a.pdf".into()));
        assert!(fs.has_file(&"/out/a.pdf".into()));
        assert!(store.contains(ItemId(2)));
    }
}
