//! CLI commands and argument parsing

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Quota-scheduled paginated listing fetcher
#[derive(Parser, Debug)]
#[command(name = "quota-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
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
    /// Fetch every page of a listing and print the items
    Fetch(FetchArgs),

    /// Print the effective configuration
    Config,
}

/// Arguments for `fetch`
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// URL of the first page
    pub url: String,

    /// User name for Basic auth
    #[arg(short, long, env = "QUOTA_PAGER_USER")]
    pub user: String,

    /// Password for Basic auth
    #[arg(short, long, env = "QUOTA_PAGER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Stop once any item is older than this many days
    #[arg(long)]
    pub max_age_days: Option<i64>,

    /// Item field holding the date checked by --max-age-days
    #[arg(long)]
    pub date_field: Option<String>,

    /// Pin "now" for the age check (YYYY-MM-DD)
    #[arg(long)]
    pub now: Option<NaiveDate>,

    /// Fail instead of fetching more than this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Decode non-2xx response bodies instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
