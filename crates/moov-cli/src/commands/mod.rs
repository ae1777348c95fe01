//! Command implementations for moov-cli

pub mod erase;
pub mod preview;
pub mod transfer;

pub use erase::run_erase;
pub use preview::run_preview;
pub use transfer::run_transfer;
