//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Planning Center API command-line client
#[derive(Parser, Debug)]
#[command(name = "pco")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client options file (YAML or JSON); defaults to PCO_* environment variables
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Log request and response bodies
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET an endpoint, e.g. /people/v2/people
    Get {
        /// Endpoint path or full URL
        endpoint: String,

        /// Equality filter as field=value (repeatable)
        #[arg(short, long = "where", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        /// Relationships to include (comma-separated or repeated)
        #[arg(short, long, value_delimiter = ',')]
        include: Vec<String>,

        /// Sort field, prefix with '-' for descending
        #[arg(short, long)]
        order: Option<String>,

        /// Items per page
        #[arg(long)]
        per_page: Option<u32>,

        /// 1-based page number
        #[arg(long)]
        page: Option<u32>,

        /// Follow pagination and print every item
        #[arg(long)]
        all: bool,

        /// Stop after this many items (with --all)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Check that the API is reachable with the configured credentials
    Health,

    /// Show the authenticated person
    Me,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}
