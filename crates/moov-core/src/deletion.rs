//! Deletion of linked files when their records are erased

use std::sync::Arc;

use moov_fs::{FileSystem, NormalizedPath};

use crate::model::{Item, ItemId};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Remove ancestor directories left empty, up to (not including) the root
    pub prune_empty_dir: bool,
}

/// What a deletion pass did.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub removed: Vec<NormalizedPath>,
    /// Files that were already gone (not an error)
    pub missing: Vec<NormalizedPath>,
    pub pruned: Vec<NormalizedPath>,
    /// Records that are not linked files inside the managed tree
    pub skipped: usize,
    pub errors: Vec<(ItemId, moov_fs::Error)>,
}

/// Removes the files behind erased records and tidies the managed tree.
#[derive(Clone)]
pub struct DeletionCoordinator {
    fs: Arc<dyn FileSystem>,
}

impl DeletionCoordinator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Delete the files of `items` that live under `dest_root`.
    ///
    /// Only linked files are touched: imported files belong to the host's
    /// own storage. Files outside `dest_root` are left alone, so an empty
    /// root deletes nothing. Items are processed in order so pruning sees
    /// the effect of earlier removals.
    pub async fn delete(
        &self,
        items: &[Item],
        dest_root: &str,
        options: DeleteOptions,
    ) -> DeletionReport {
        let mut report = DeletionReport::default();
        if dest_root.is_empty() {
            report.skipped = items.len();
            return report;
        }
        let root = NormalizedPath::new(dest_root);

        for item in items {
            let path = match item.file_path() {
                Some(path) if item.is_linked_file() && path.is_within(&root) && *path != root => {
                    path.clone()
                }
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };

            match self.fs.remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path, item = %item.id, "Deleted linked file");
                    report.removed.push(path.clone());
                }
                Err(e) if e.is_not_found() => report.missing.push(path.clone()),
                Err(e) => {
                    tracing::warn!(path = %path, item = %item.id, "Failed to delete file: {}", e);
                    report.errors.push((item.id, e));
                    continue;
                }
            }

            if options.prune_empty_dir
                && let Err(e) = self.prune(&path, &root, &mut report.pruned).await
            {
                tracing::warn!(path = %path, "Failed to prune empty directories: {}", e);
                report.errors.push((item.id, e));
            }
        }

        report
    }

    /// Walk up from `file`'s directory removing empty directories, stopping
    /// at `root`, at the first non-empty directory, or outside `root`.
    async fn prune(
        &self,
        file: &NormalizedPath,
        root: &NormalizedPath,
        pruned: &mut Vec<NormalizedPath>,
    ) -> moov_fs::Result<()> {
        let mut current = file.parent();
        while let Some(dir) = current {
            if dir == *root || !dir.is_within(root) {
                break;
            }
            match self.fs.is_dir_empty(&dir).await {
                Ok(true) => {}
                Ok(false) => break,
                // Already gone; keep climbing
                Err(e) if e.is_not_found() => {
                    current = dir.parent();
                    continue;
                }
                Err(e) => return Err(e),
            }
            self.fs.remove_dir(&dir).await?;
            tracing::debug!(dir = %dir, "Pruned empty directory");
            current = dir.parent();
            pruned.push(dir);
        }
        Ok(())
    }
}
