//! CLI argument definitions for biseo.

use clap::{Parser, Subcommand};

/// biseo -- a Korean calendar and to-do assistant.
#[derive(Parser)]
#[command(
    name = "biseo",
    version,
    about = "biseo -- Korean calendar and to-do assistant",
    long_about = "Understands Korean requests about your calendar and to-do list, and asks \
                  before acting whenever it is not sure which entry you mean."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive session in the terminal.
    Run {
        /// User id for this session (defaults to `assistant.user_id`).
        #[arg(long, short)]
        user: Option<String>,

        /// Use in-memory backends and no model.
        #[arg(long)]
        offline: bool,
    },

    /// Classify one utterance and print the result as JSON.
    Classify {
        /// The utterance to classify.
        text: String,

        /// Classify without a model.
        #[arg(long)]
        offline: bool,
    },

    /// Show configuration and which backends would be used.
    Status,
}
