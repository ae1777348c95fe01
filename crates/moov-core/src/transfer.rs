//! Batch move/copy of attachment files into the managed tree
//!
//! A batch is planned first (dedup, filter, compute destinations) and then
//! every planned record runs as its own task. Tasks are polled together
//! and a failing record never affects its siblings: the batch always
//! settles with one [`TransferOutcome`] per attempted record.
//!
//! Two records that resolve to the same destination are never both
//! attempted. The first one in input order claims the path and the
//! others are rejected during planning.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use moov_fs::{FileSystem, NormalizedPath};

use crate::model::{Item, ItemId, LinkMode};
use crate::prefs::FileBehavior;
use crate::resolver::compute_destination;
use crate::store::{CloneOptions, EraseOptions, FulltextIndexer, ItemEraser, RecordStore};
use crate::{Error, Result};

/// Per-batch knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Skip records that are not imported files (moves only)
    pub ignore_linked: bool,
    /// Place files in a subfolder expanded from `subdir_template`
    pub into_subfolder: bool,
    pub subdir_template: String,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            ignore_linked: true,
            into_subfolder: false,
            subdir_template: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Move,
    Copy,
}

impl From<FileBehavior> for TransferMode {
    fn from(behavior: FileBehavior) -> Self {
        match behavior {
            FileBehavior::Move => Self::Move,
            FileBehavior::Copy => Self::Copy,
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => f.write_str("move"),
            Self::Copy => f.write_str("copy"),
        }
    }
}

/// One record scheduled for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub item: Item,
    pub source: NormalizedPath,
    pub destination: NormalizedPath,
}

/// A record the planner refused to schedule.
#[derive(Debug)]
pub struct RejectedTransfer {
    pub item_id: ItemId,
    pub source: NormalizedPath,
    /// Unknown when the destination could not be computed
    pub destination: Option<NormalizedPath>,
    pub error: Error,
}

/// Result of planning a batch without touching anything.
#[derive(Debug, Default)]
pub struct TransferPlan {
    pub tasks: Vec<PlannedTransfer>,
    /// Records that fail before any file is touched
    pub rejected: Vec<RejectedTransfer>,
    /// Records rejected by the attachment/link-mode filters
    pub skipped_filtered: Vec<ItemId>,
    /// Records already at their destination
    pub skipped_noop: Vec<ItemId>,
}

/// How one record fared.
#[derive(Debug)]
pub struct TransferOutcome {
    pub item_id: ItemId,
    pub source: NormalizedPath,
    pub destination: Option<NormalizedPath>,
    /// For moves, the id of the linked record that replaced the original
    pub result: Result<Option<ItemId>>,
}

/// Settled batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TransferOutcome>,
    pub skipped_filtered: Vec<ItemId>,
    pub skipped_noop: Vec<ItemId>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.skipped_filtered.is_empty() && self.skipped_noop.is_empty()
    }
}

/// Moves or copies attachment files and keeps the record store in step.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn RecordStore>,
    fs: Arc<dyn FileSystem>,
    indexer: Arc<dyn FulltextIndexer>,
    eraser: Arc<dyn ItemEraser>,
}

impl TransferEngine {
    /// `eraser` is used to erase originals after a move; pass the
    /// intercepted eraser so file deletion preferences apply.
    pub fn new(
        store: Arc<dyn RecordStore>,
        fs: Arc<dyn FileSystem>,
        indexer: Arc<dyn FulltextIndexer>,
        eraser: Arc<dyn ItemEraser>,
    ) -> Self {
        Self {
            store,
            fs,
            indexer,
            eraser,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Plan a move of `items` without mutating anything.
    pub async fn resolve_many(
        &self,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
    ) -> Result<TransferPlan> {
        self.plan(items, dest_root, options, TransferMode::Move).await
    }

    /// Move files into `dest_root` and replace each original record with a
    /// linked one pointing at the new location.
    pub async fn move_many(
        &self,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
    ) -> Result<BatchReport> {
        self.run(items, dest_root, options, TransferMode::Move).await
    }

    /// Copy files into `dest_root`; records are left untouched.
    pub async fn copy_many(
        &self,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
    ) -> Result<BatchReport> {
        self.run(items, dest_root, options, TransferMode::Copy).await
    }

    /// Dispatch on `mode`.
    pub async fn transfer_many(
        &self,
        mode: TransferMode,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
    ) -> Result<BatchReport> {
        self.run(items, dest_root, options, mode).await
    }

    async fn plan(
        &self,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
        mode: TransferMode,
    ) -> Result<TransferPlan> {
        let mut plan = TransferPlan::default();
        if dest_root.is_empty() {
            tracing::debug!("No destination directory configured; nothing to do");
            return Ok(plan);
        }
        let root = NormalizedPath::new(dest_root);

        let mut seen = HashSet::new();
        let mut claimed = HashSet::new();
        for item in items.iter().filter(|item| seen.insert(item.id)) {
            let Some(source) = item.file_path() else {
                tracing::debug!(item = %item.id, "Skipping record without a file");
                plan.skipped_filtered.push(item.id);
                continue;
            };
            if mode == TransferMode::Move
                && options.ignore_linked
                && !item.link_mode.is_some_and(LinkMode::is_imported)
            {
                tracing::debug!(item = %item.id, "Skipping record that is not an imported file");
                plan.skipped_filtered.push(item.id);
                continue;
            }

            let parent = match (options.into_subfolder, item.parent) {
                (true, Some(parent_id)) => match self.store.get(parent_id).await {
                    Ok(parent) => parent,
                    Err(error) => {
                        tracing::debug!(
                            item = %item.id,
                            parent = %parent_id,
                            "Parent lookup failed: {}",
                            error
                        );
                        plan.rejected.push(RejectedTransfer {
                            item_id: item.id,
                            source: source.clone(),
                            destination: None,
                            error,
                        });
                        continue;
                    }
                },
                _ => None,
            };
            let Some(destination) = compute_destination(
                item,
                parent.as_ref(),
                &root,
                options.into_subfolder,
                &options.subdir_template,
            ) else {
                plan.skipped_filtered.push(item.id);
                continue;
            };

            if destination == *source {
                tracing::debug!(item = %item.id, path = %source, "Already in place");
                plan.skipped_noop.push(item.id);
                continue;
            }

            if !claimed.insert(destination.clone()) {
                tracing::debug!(
                    item = %item.id,
                    path = %destination,
                    "Destination claimed by an earlier record"
                );
                plan.rejected.push(RejectedTransfer {
                    item_id: item.id,
                    source: source.clone(),
                    error: moov_fs::Error::AlreadyExists {
                        path: destination.to_native(),
                    }
                    .into(),
                    destination: Some(destination),
                });
                continue;
            }

            plan.tasks.push(PlannedTransfer {
                source: source.clone(),
                destination,
                item: item.clone(),
            });
        }

        Ok(plan)
    }

    async fn run(
        &self,
        items: &[Item],
        dest_root: &str,
        options: &TransferOptions,
        mode: TransferMode,
    ) -> Result<BatchReport> {
        let plan = self.plan(items, dest_root, options, mode).await?;
        if !plan.tasks.is_empty() {
            tracing::info!(mode = %mode, count = plan.tasks.len(), dest = dest_root, "Transferring attachments");
        }

        let mut outcomes = join_all(plan.tasks.into_iter().map(|task| async move {
            let result = match mode {
                TransferMode::Move => self.move_one(&task).await.map(Some),
                TransferMode::Copy => self.copy_one(&task).await.map(|()| None),
            };
            if let Err(e) = &result {
                tracing::warn!(
                    item = %task.item.id,
                    source = %task.source,
                    destination = %task.destination,
                    "Failed to {} attachment: {}",
                    mode,
                    e
                );
            }
            TransferOutcome {
                item_id: task.item.id,
                source: task.source,
                destination: Some(task.destination),
                result,
            }
        }))
        .await;

        for rejected in plan.rejected {
            tracing::warn!(
                item = %rejected.item_id,
                source = %rejected.source,
                "Failed to {} attachment: {}",
                mode,
                rejected.error
            );
            outcomes.push(TransferOutcome {
                item_id: rejected.item_id,
                source: rejected.source,
                destination: rejected.destination,
                result: Err(rejected.error),
            });
        }

        Ok(BatchReport {
            outcomes,
            skipped_filtered: plan.skipped_filtered,
            skipped_noop: plan.skipped_noop,
        })
    }

    async fn copy_one(&self, task: &PlannedTransfer) -> Result<()> {
        self.fs.copy_file(&task.source, &task.destination).await?;
        Ok(())
    }

    async fn move_one(&self, task: &PlannedTransfer) -> Result<ItemId> {
        let original = &task.item;
        self.fs.move_file(&task.source, &task.destination).await?;

        let mut linked = self.store.clone_item(
            original,
            CloneOptions {
                include_collections: true,
            },
        );
        linked.link_mode = Some(LinkMode::LinkedFile);
        linked.path = Some(task.destination.clone());

        let linked_id = match self.store.save(&linked).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    item = %original.id,
                    path = %task.destination,
                    "File moved but its record could not be saved; the file is now orphaned"
                );
                return Err(e);
            }
        };

        if let Err(e) = self.store.move_child_items(original.id, linked_id).await {
            tracing::warn!(
                original = %original.id,
                linked = %linked_id,
                "Child items not moved; both records now point at the attachment"
            );
            return Err(e);
        }

        if let Err(e) = self.indexer.index_items(&[linked_id]).await {
            tracing::warn!(item = %linked_id, "Failed to index moved attachment: {}", e);
        }

        if let Err(e) = self.eraser.erase(original, EraseOptions::default()).await {
            tracing::warn!(
                original = %original.id,
                linked = %linked_id,
                "Original record not erased; both records now point at the attachment"
            );
            return Err(e);
        }
        Ok(linked_id)
    }
}
