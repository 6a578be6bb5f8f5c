//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cached, rate-limit-aware GitHub API fetcher
#[derive(Parser, Debug)]
#[command(name = "stargazers-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cache root directory (overrides the config file)
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL and print the decoded JSON
    Get {
        /// Repository the fetch is made on behalf of (owner/repo)
        #[arg(long)]
        repo: String,

        /// GitHub access token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Media type to request instead of the default
        #[arg(long)]
        accept: Option<String>,

        /// Follow next-page cursors and print the whole collection
        #[arg(long)]
        all: bool,

        /// Refetch a cached final page
        #[arg(long)]
        revalidate: bool,

        /// URL to fetch
        url: String,
    },

    /// Remove every cached response of a repository
    Clear {
        /// Repository whose cache is cleared (owner/repo)
        #[arg(long)]
        repo: String,
    },
}
