//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MoneyTalk - A conversation with your money
#[derive(Parser)]
#[command(name = "moneytalk")]
#[command(about = "Personal finance API with monthly reports and AI summaries", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "moneytalk.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set MONEYTALK_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    ///
    /// Requires MONEYTALK_SECRET_KEY for signing bearer tokens.
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Print a monthly financial report
    Report {
        /// Email of the user to report on
        #[arg(long)]
        email: String,

        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Ask the AI backend to narrate the report
        #[arg(long)]
        insight: bool,

        /// Override OLLAMA_MODEL for this report
        #[arg(long, requires = "insight")]
        model: Option<String>,
    },

    /// Manage AI prompts (list, show, path)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a new user
    Add {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Password (8-72 bytes)
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., financial_summary)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
