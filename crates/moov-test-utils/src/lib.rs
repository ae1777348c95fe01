//! Shared test fixtures for the moov workspace.
//!
//! A dev-dependency only, never published. Use it from integration tests
//! (`tests/`) rather than from `#[cfg(test)]` modules inside `moov-core`.
//!
//! # Modules
//!
//! - [`library`]: [`TestLibrary`], an in-memory host with files and prefs
//! - [`tree`]: [`TestTree`], a temporary directory on the real disk

pub mod library;
pub mod tree;

pub use library::TestLibrary;
pub use tree::TestTree;
