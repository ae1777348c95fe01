//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// moov - keep reference-library attachments in a directory tree you control
#[derive(Parser, Debug)]
#[command(name = "moov")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Library snapshot to operate on (JSON, TOML or YAML)
    #[arg(long, global = true, env = "MOOV_LIBRARY", default_value = "library.json")]
    pub library: PathBuf,

    /// Preference file; defaults apply when omitted
    #[arg(long, global = true, env = "MOOV_PREFS")]
    pub prefs: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Move or copy the files of the selected records
    ///
    /// Selected regular items contribute all their attachments. Without
    /// --to, files go to the configured dst_dir and subfolder template.
    ///
    /// Examples:
    ///   moov transfer 12 15          # Into dst_dir
    ///   moov transfer 12 --to ~/tmp  # Into a specific directory
    Transfer {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Destination directory instead of the configured one
        #[arg(long)]
        to: Option<String>,
    },

    /// Show where `transfer` would put each file, without changing anything
    Preview {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Destination directory instead of the configured one
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Erase records, deleting their linked files from dst_dir
    Erase {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}
