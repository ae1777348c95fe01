//! In-memory [`FileSystem`] for tests and previews

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{Error, FileSystem, NormalizedPath, Result};

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<NormalizedPath, Vec<u8>>,
    dirs: BTreeSet<NormalizedPath>,
    failures: HashMap<NormalizedPath, ErrorKind>,
    operations: Vec<String>,
}

impl Tree {
    fn add_ancestors(&mut self, path: &NormalizedPath) {
        let mut current = path.parent();
        while let Some(dir) = current {
            current = dir.parent();
            self.dirs.insert(dir);
        }
    }

    fn occupied(&self, path: &NormalizedPath) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn has_children(&self, dir: &NormalizedPath) -> bool {
        let within = |p: &&NormalizedPath| *p != dir && p.is_within(dir);
        self.files.keys().any(|p| within(&p)) || self.dirs.iter().any(|p| within(&p))
    }

    fn check_failure(&self, path: &NormalizedPath) -> Result<()> {
        match self.failures.get(path) {
            Some(kind) => Err(Error::io(
                path.to_native(),
                std::io::Error::new(*kind, "injected failure"),
            )),
            None => Ok(()),
        }
    }

    fn take_source(&mut self, from: &NormalizedPath, to: &NormalizedPath) -> Result<Vec<u8>> {
        self.check_failure(from)?;
        self.check_failure(to)?;
        let content = self
            .files
            .get(from)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                path: from.to_native(),
            })?;
        if self.occupied(to) {
            return Err(Error::AlreadyExists {
                path: to.to_native(),
            });
        }
        Ok(content)
    }
}

/// A filesystem that lives entirely in memory.
///
/// Directories are implicit: adding a file creates its ancestors. Every
/// mutating call is appended to an operation log so tests can assert that
/// nothing touched the disk. Failures can be injected per path.
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: Mutex<Tree>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a file (and its parent directories).
    pub fn add_file(&self, path: impl Into<NormalizedPath>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut tree = self.tree();
        tree.add_ancestors(&path);
        tree.files.insert(path, content.into());
    }

    pub fn add_dir(&self, path: impl Into<NormalizedPath>) {
        let path = path.into();
        let mut tree = self.tree();
        tree.add_ancestors(&path);
        tree.dirs.insert(path);
    }

    /// Make every operation touching `path` fail with `kind`.
    pub fn fail_on(&self, path: impl Into<NormalizedPath>, kind: ErrorKind) {
        self.tree().failures.insert(path.into(), kind);
    }

    pub fn read(&self, path: &NormalizedPath) -> Option<Vec<u8>> {
        self.tree().files.get(path).cloned()
    }

    pub fn has_file(&self, path: &NormalizedPath) -> bool {
        self.tree().files.contains_key(path)
    }

    pub fn has_dir(&self, path: &NormalizedPath) -> bool {
        self.tree().dirs.contains(path)
    }

    /// Mutating operations performed so far, oldest first.
    pub fn operations(&self) -> Vec<String> {
        self.tree().operations.clone()
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn move_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        let mut tree = self.tree();
        tree.operations.push(format!("move {from} -> {to}"));
        let content = tree.take_source(from, to)?;
        tree.files.remove(from);
        tree.add_ancestors(to);
        tree.files.insert(to.clone(), content);
        Ok(())
    }

    async fn copy_file(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        let mut tree = self.tree();
        tree.operations.push(format!("copy {from} -> {to}"));
        let content = tree.take_source(from, to)?;
        tree.add_ancestors(to);
        tree.files.insert(to.clone(), content);
        Ok(())
    }

    async fn exists(&self, path: &NormalizedPath) -> Result<bool> {
        let tree = self.tree();
        tree.check_failure(path)?;
        Ok(tree.occupied(path))
    }

    async fn remove_file(&self, path: &NormalizedPath) -> Result<()> {
        let mut tree = self.tree();
        tree.operations.push(format!("remove {path}"));
        tree.check_failure(path)?;
        tree.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                path: path.to_native(),
            })
    }

    async fn remove_dir(&self, path: &NormalizedPath) -> Result<()> {
        let mut tree = self.tree();
        tree.operations.push(format!("rmdir {path}"));
        tree.check_failure(path)?;
        if !tree.dirs.contains(path) {
            return Err(Error::NotFound {
                path: path.to_native(),
            });
        }
        if tree.has_children(path) {
            return Err(Error::io(
                path.to_native(),
                std::io::Error::new(ErrorKind::DirectoryNotEmpty, "directory not empty"),
            ));
        }
        tree.dirs.remove(path);
        Ok(())
    }

    async fn is_dir_empty(&self, path: &NormalizedPath) -> Result<bool> {
        let tree = self.tree();
        tree.check_failure(path)?;
        if !tree.dirs.contains(path) {
            return Err(Error::NotFound {
                path: path.to_native(),
            });
        }
        Ok(!tree.has_children(path))
    }
}
