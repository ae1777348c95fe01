//! Async filesystem service used by the transfer and deletion paths

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use crate::{Error, NormalizedPath, Result};

/// Filesystem operations the engine needs.
///
/// Every method reports a missing path as [`Error::NotFound`] and an access
/// problem as [`Error::PermissionDenied`] so callers can treat them
/// differently (deletion tolerates the former, transfers report both).
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Move a file, creating the destination's parent directories.
    ///
    /// Fails with [`Error::AlreadyExists`] instead of overwriting.
    async fn move_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()>;

    /// Copy a file, creating the destination's parent directories.
    ///
    /// Fails with [`Error::AlreadyExists`] instead of overwriting.
    async fn copy_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()>;

    async fn exists(&self, path: &NormalizedPath) -> Result<bool>;

    async fn remove_file(&self, path: &NormalizedPath) -> Result<()>;

    /// Remove an empty directory.
    async fn remove_dir(&self, path: &NormalizedPath) -> Result<()>;

    async fn is_dir_empty(&self, path: &NormalizedPath) -> Result<bool>;
}

/// [`FileSystem`] backed by the real disk through `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    async fn create_parent(&self, to: &NormalizedPath) -> Result<()> {
        if let Some(parent) = to.parent() {
            let parent = parent.to_native();
            tokio::fs::create_dir_all(&parent)
                .await
                .map_err(|e| Error::io(&parent, e))?;
        }
        Ok(())
    }

    async fn require_source(&self, from: &NormalizedPath) -> Result<()> {
        let native = from.to_native();
        match tokio::fs::metadata(&native).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(Error::NotFound { path: native }),
            Err(e) => Err(Error::io(native, e)),
        }
    }

    /// Copy into a file that must not exist yet. The existence check and
    /// the create are one `create_new` open, so concurrent writers to the
    /// same path cannot both win. A partial copy is removed on failure.
    async fn copy_new(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut reader = tokio::fs::File::open(src)
            .await
            .map_err(|e| Error::io(src, e))?;
        let mut writer = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dst)
            .await
            .map_err(|e| Error::io(dst, e))?;

        let copied = async {
            tokio::io::copy(&mut reader, &mut writer).await?;
            writer.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            drop(writer);
            let _ = tokio::fs::remove_file(dst).await;
            return Err(Error::io(dst, e));
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn move_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        self.require_source(from).await?;
        self.create_parent(to).await?;

        // `rename` replaces an existing destination; a hard link fails instead
        let (src, dst) = (from.to_native(), to.to_native());
        match tokio::fs::hard_link(&src, &dst).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyExists { path: dst });
            }
            Err(e) => {
                tracing::debug!(from = %from, to = %to, "Hard link failed ({}), copying instead", e);
                self.copy_new(&src, &dst).await?;
            }
        }

        if let Err(e) = tokio::fs::remove_file(&src).await {
            let _ = tokio::fs::remove_file(&dst).await;
            return Err(Error::io(&src, e));
        }
        Ok(())
    }

    async fn copy_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        self.require_source(from).await?;
        self.create_parent(to).await?;
        self.copy_new(&from.to_native(), &to.to_native()).await
    }

    async fn exists(&self, path: &NormalizedPath) -> Result<bool> {
        let native = path.to_native();
        tokio::fs::try_exists(&native)
            .await
            .map_err(|e| Error::io(&native, e))
    }

    async fn remove_file(&self, path: &NormalizedPath) -> Result<()> {
        let native = path.to_native();
        tokio::fs::remove_file(&native)
            .await
            .map_err(|e| Error::io(&native, e))
    }

    async fn remove_dir(&self, path: &NormalizedPath) -> Result<()> {
        let native = path.to_native();
        tokio::fs::remove_dir(&native)
            .await
            .map_err(|e| Error::io(&native, e))
    }

    async fn is_dir_empty(&self, path: &NormalizedPath) -> Result<bool> {
        let native = path.to_native();
        let mut entries = tokio::fs::read_dir(&native)
            .await
            .map_err(|e| Error::io(&native, e))?;
        let first = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(&native, e))?;
        Ok(first.is_none())
    }
}
