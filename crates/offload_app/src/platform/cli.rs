use std::path::PathBuf;

use clap::Parser;

/// Parse a JSON file off the main thread, then sort and filter it.
#[derive(Debug, Parser)]
#[command(name = "offload", version, about)]
pub struct Args {
    /// JSON file holding an array of records or an object of records.
    pub file: PathBuf,

    /// Sort the loaded records before filtering.
    #[arg(long)]
    pub sort: bool,

    /// Keep records containing TEXT, ignoring case. Repeat to narrow further.
    #[arg(long = "filter", value_name = "TEXT")]
    pub filters: Vec<String>,

    /// RON settings file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides the reply timeout from the settings file. 0 waits forever.
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,

    /// Run transformations inline when no worker thread can be used.
    #[arg(long)]
    pub inline_fallback: bool,

    /// Also write log records to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}
