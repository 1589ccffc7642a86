//! CLI argument parsing using clap 4.x derive macros

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ask Reddit things in plain language.
///
/// Requests are classified by a language model, routed to the matching
/// Reddit API call, and the result is summarized back in plain text.
#[derive(Parser, Debug)]
#[command(name = "reddit-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: REDDIT_AGENT_CONFIG, then config/agent.yaml
    /// searched upward from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// With --verbose, emit JSON log lines
    #[arg(long, global = true, requires = "verbose")]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one request, e.g. `ask top 5 posts of r/rust`
    Ask {
        /// The request, in plain language
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Print the phases the request went through
        #[arg(long)]
        trace: bool,
    },

    /// Interactive session; follow-ups see the previous request
    Chat,

    /// Record the URL Reddit redirected to after the consent screen
    Callback {
        /// Full redirect URL, including `?state=…&code=…`
        url: String,
    },

    /// Show which credentials are stored
    Status,

    /// Delete all stored credentials
    Logout,
}
