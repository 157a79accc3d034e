pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notifeed")]
#[command(about = "Keep a local view of your notification feed in sync", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/notifeed/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the notification service base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notifications, unseen first
    List {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Mark a notification as seen
    Seen {
        /// Notification id
        id: String,
    },
    /// Delete a notification
    Delete {
        /// Notification id
        id: String,
    },
    /// Delete every notification
    Clear,
    /// Load the feed, then merge pushed notifications read as JSON lines from stdin
    Watch,
}
