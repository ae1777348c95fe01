//! Preferences: typed reads over a flat key/value store
//!
//! The host keeps preferences as a flat map. [`Settings`] is a typed
//! snapshot taken at the moment an operation starts, so a batch runs with
//! one consistent view even if the user edits preferences mid-flight.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use moov_fs::{ConfigStore, NormalizedPath};
use serde_json::Value;

use crate::{Error, Result};

/// Keys understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// Destination root of the managed tree
    DstDir,
    /// `move` or `copy`
    FileBehavior,
    /// Transfer new attachments automatically
    EnableAutomove,
    /// Settle delay in milliseconds
    AutoProcessDelay,
    /// Delete linked files when their record is erased
    DeleteFiles,
    /// Remove directories emptied by a deletion
    PruneEmptyDir,
    /// Place files in a templated subfolder
    EnableSubdirMove,
    /// The subfolder template
    SubdirectoryString,
}

impl PrefKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DstDir => "dst_dir",
            Self::FileBehavior => "file_behavior",
            Self::EnableAutomove => "enable_automove",
            Self::AutoProcessDelay => "auto_process_delay",
            Self::DeleteFiles => "delete_files",
            Self::PruneEmptyDir => "prune_empty_dir",
            Self::EnableSubdirMove => "enable_subdir_move",
            Self::SubdirectoryString => "subdirectory_string",
        }
    }
}

impl fmt::Display for PrefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed read access to host preferences.
///
/// Each getter returns `None` when the key is unset or holds a value of a
/// different type; callers fall back to defaults.
pub trait Preferences: Send + Sync {
    fn get_bool(&self, key: PrefKey) -> Option<bool>;
    fn get_string(&self, key: PrefKey) -> Option<String>;
    fn get_u64(&self, key: PrefKey) -> Option<u64>;
}

/// In-process preference map, optionally backed by a TOML/JSON/YAML file.
#[derive(Debug, Default)]
pub struct PrefStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl PrefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a flat preference file; the format follows the extension.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let values: BTreeMap<String, Value> = ConfigStore::new().load(path)?;
        Ok(Self {
            values: RwLock::new(values),
        })
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        ConfigStore::new().save(path, &*values)?;
        Ok(())
    }

    pub fn set(&self, key: PrefKey, value: impl Into<Value>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.as_str().to_string(), value.into());
    }

    pub fn with(self, key: PrefKey, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    fn get(&self, key: PrefKey) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .cloned()
    }
}

impl Preferences for PrefStore {
    fn get_bool(&self, key: PrefKey) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    fn get_string(&self, key: PrefKey) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_u64(&self, key: PrefKey) -> Option<u64> {
        self.get(key)?.as_u64()
    }
}

/// Whether transfers relocate the file or leave the original in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileBehavior {
    #[default]
    Move,
    Copy,
}

impl std::str::FromStr for FileBehavior {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            other => Err(Error::InvalidPreference {
                key: PrefKey::FileBehavior.to_string(),
                message: format!("expected \"move\" or \"copy\", got {other:?}"),
            }),
        }
    }
}

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;
pub const DEFAULT_SUBDIR_TEMPLATE: &str = "%a";

/// Snapshot of every preference the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dst_dir: String,
    pub file_behavior: FileBehavior,
    pub automove: bool,
    pub settle_delay: Duration,
    pub delete_files: bool,
    pub prune_empty_dir: bool,
    pub subfolder_enabled: bool,
    pub subdir_template: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dst_dir: String::new(),
            file_behavior: FileBehavior::Move,
            automove: true,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            delete_files: true,
            prune_empty_dir: true,
            subfolder_enabled: false,
            subdir_template: DEFAULT_SUBDIR_TEMPLATE.to_string(),
        }
    }
}

impl Settings {
    /// Read all engine preferences, applying defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPreference`] if `file_behavior` is neither
    /// `move` nor `copy`.
    pub fn load(prefs: &dyn Preferences) -> Result<Self> {
        let file_behavior = match prefs.get_string(PrefKey::FileBehavior) {
            Some(raw) => raw.parse()?,
            None => FileBehavior::default(),
        };
        Ok(Self {
            file_behavior,
            ..Self::load_lenient(prefs)
        })
    }

    /// Like [`Settings::load`], but an unparseable `file_behavior` keeps
    /// its default. For callers that never transfer files (observer
    /// bookkeeping, file deletion) and must not fail on it.
    pub fn load_lenient(prefs: &dyn Preferences) -> Self {
        let defaults = Self::default();

        Self {
            dst_dir: prefs
                .get_string(PrefKey::DstDir)
                .unwrap_or(defaults.dst_dir),
            file_behavior: prefs
                .get_string(PrefKey::FileBehavior)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.file_behavior),
            automove: prefs
                .get_bool(PrefKey::EnableAutomove)
                .unwrap_or(defaults.automove),
            settle_delay: prefs
                .get_u64(PrefKey::AutoProcessDelay)
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            delete_files: prefs
                .get_bool(PrefKey::DeleteFiles)
                .unwrap_or(defaults.delete_files),
            prune_empty_dir: prefs
                .get_bool(PrefKey::PruneEmptyDir)
                .unwrap_or(defaults.prune_empty_dir),
            subfolder_enabled: prefs
                .get_bool(PrefKey::EnableSubdirMove)
                .unwrap_or(defaults.subfolder_enabled),
            subdir_template: prefs
                .get_string(PrefKey::SubdirectoryString)
                .unwrap_or(defaults.subdir_template),
        }
    }
}
