//! CLI definitions for jobfill.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobfill CLI.
#[derive(Parser)]
#[command(name = "jobfill")]
#[command(about = "Autofill job-application forms in a running Chrome")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.jobfill/config.toml)
    #[arg(short, long, global = true, env = "JOBFILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Fill the application form open in a browser tab
    Fill {
        /// Target id of the tab, or a substring of its URL
        #[arg(long)]
        tab: String,

        /// Page URL to attach to usage and error reports
        #[arg(long)]
        url: Option<String>,

        /// Scrape scope passed to the page collaborator
        #[arg(long)]
        scope: Option<String>,

        /// Applicant tracking system of the page (guessed from --url when omitted)
        #[arg(long)]
        ats: Option<String>,

        /// Print the fill report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fingerprint cache commands
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Bearer token commands
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Stored résumé commands
    Resume {
        #[command(subcommand)]
        action: ResumeAction,
    },

    /// Send submitted values back so the mapping service can learn from edits
    Feedback {
        /// JSON file holding the submission feedback document
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show entry counts of both cache tiers
    Stats,

    /// Drop every cached mapping and the stored autofill context
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum TokenAction {
    /// Store a new bearer token
    Set {
        token: String,
    },

    /// Show whether a token is stored
    Show,

    /// Forget the stored token
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum ResumeAction {
    /// Store a résumé file for upload fields
    Set {
        file: PathBuf,
    },

    /// Show the stored résumé
    Show,
}
