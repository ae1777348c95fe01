//! Records as seen by the engine
//!
//! The host application owns the real data model. These types carry just
//! enough of it to decide whether an attachment qualifies for a transfer,
//! where its file lives, and which metadata feeds subfolder templates.

use std::fmt;

use moov_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

/// Identifier of a record in the host store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Placeholder carried by clones that have not been saved yet.
    pub const NEW: ItemId = ItemId(0);

    pub fn is_new(self) -> bool {
        self == Self::NEW
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Library a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryId {
    /// The local user library, the only place linked files exist
    #[default]
    User,
    Group(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    #[default]
    Regular,
    Attachment,
    Note,
}

/// How an attachment's file relates to the host's managed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    /// File was imported into managed storage
    ImportedFile,
    /// File was downloaded from a URL into managed storage
    ImportedUrl,
    /// File lives outside managed storage and is only referenced
    LinkedFile,
    /// A bare URL, no file at all
    LinkedUrl,
    EmbeddedImage,
}

impl LinkMode {
    pub fn is_imported(self) -> bool {
        matches!(self, Self::ImportedFile | Self::ImportedUrl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// `author`, `editor`, `contributor`, ...
    #[serde(default = "default_creator_type")]
    pub creator_type: String,
}

fn default_creator_type() -> String {
    "author".to_string()
}

impl Creator {
    pub fn author(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            creator_type: default_creator_type(),
        }
    }

    pub fn editor(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            creator_type: "editor".to_string(),
            ..Self::author(first_name, last_name)
        }
    }
}

/// Bibliographic fields read by the template expander.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMetadata {
    pub item_type: Option<String>,
    pub title: Option<String>,
    pub creators: Vec<Creator>,
    pub date: Option<String>,
    pub publication_title: Option<String>,
    pub journal_abbreviation: Option<String>,
    pub publisher: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub citation_key: Option<String>,
}

impl ItemMetadata {
    /// First creator with the given role.
    pub fn first_creator(&self, creator_type: &str) -> Option<&Creator> {
        self.creators
            .iter()
            .find(|c| c.creator_type == creator_type)
    }

    /// First author, or the first creator of any role if there is no author.
    pub fn primary_creator(&self) -> Option<&Creator> {
        self.first_creator("author").or_else(|| self.creators.first())
    }

    /// The first run of four digits in `date`.
    pub fn year(&self) -> Option<&str> {
        let date = self.date.as_deref()?;
        let bytes = date.as_bytes();
        (0..bytes.len().saturating_sub(3))
            .find(|&i| bytes[i..i + 4].iter().all(u8::is_ascii_digit))
            .map(|i| &date[i..i + 4])
    }
}

/// A record in the host store: a regular item, a note, or an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Sync key, unique within a library
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub library: LibraryId,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub link_mode: Option<LinkMode>,
    #[serde(default)]
    pub path: Option<NormalizedPath>,
    #[serde(default)]
    pub parent: Option<ItemId>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

impl Item {
    pub fn regular(id: ItemId, key: impl Into<String>, metadata: ItemMetadata) -> Self {
        Self {
            id,
            key: key.into(),
            library: LibraryId::User,
            kind: ItemKind::Regular,
            link_mode: None,
            path: None,
            parent: None,
            collections: Vec::new(),
            metadata,
        }
    }

    pub fn attachment(
        id: ItemId,
        key: impl Into<String>,
        link_mode: LinkMode,
        path: impl Into<NormalizedPath>,
    ) -> Self {
        Self {
            kind: ItemKind::Attachment,
            link_mode: Some(link_mode),
            path: Some(path.into()),
            ..Self::regular(id, key, ItemMetadata::default())
        }
    }

    pub fn with_parent(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn in_library(mut self, library: LibraryId) -> Self {
        self.library = library;
        self
    }

    pub fn is_attachment(&self) -> bool {
        self.kind == ItemKind::Attachment
    }

    pub fn is_regular(&self) -> bool {
        self.kind == ItemKind::Regular
    }

    /// An attachment backed by a file on disk (anything but a bare URL).
    pub fn is_file_attachment(&self) -> bool {
        self.is_attachment() && !matches!(self.link_mode, Some(LinkMode::LinkedUrl) | None)
    }

    pub fn is_linked_file(&self) -> bool {
        self.is_file_attachment() && self.link_mode == Some(LinkMode::LinkedFile)
    }

    /// Path of the attachment's file, if it is a file attachment with a path.
    pub fn file_path(&self) -> Option<&NormalizedPath> {
        if !self.is_file_attachment() {
            return None;
        }
        self.path.as_ref().filter(|p| !p.is_empty())
    }
}
