//! CLI module for the Bible assistant.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Bible Assistant - talk with the Holy Bible
///
/// Answers questions from passages of the Bible retrieved from a vector index,
/// using a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "bible-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and system prompt
    Init,

    /// Check secrets, configuration and index connectivity
    Doctor,

    /// Start an interactive chat session
    Chat,

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Print the refined search query
        #[arg(long)]
        show_query: bool,

        /// Hide the source passages
        #[arg(long)]
        no_sources: bool,
    },

    /// Show the passages retrieved for a query
    Search {
        /// Search query
        query: String,

        /// Number of passages (defaults to vector_store.top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Start the HTTP chat API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8501")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
