//! Filesystem abstraction for the attachment mover
//!
//! Provides normalized path handling, an async filesystem service with a
//! local and an in-memory implementation, and format-agnostic config loading.

pub mod config;
pub mod error;
pub mod memory;
pub mod path;
pub mod service;

pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use memory::MemoryFs;
pub use path::NormalizedPath;
pub use service::{FileSystem, LocalFs};
