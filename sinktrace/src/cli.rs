//! Command line interface configuration using `clap`.

use clap::Parser;
use std::path::PathBuf;

/// Command line options for the analysis driver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AST files (JSON) produced by a language front end.
    pub paths: Vec<PathBuf>,

    /// Rule file (JSON) with sources, sanitizers and sinks.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Entry point descriptor file (JSON). When absent, entry points are
    /// synthesized from the call-graph boundary set.
    #[arg(long)]
    pub entry_points: Option<PathBuf>,

    /// Output raw JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the resolved boundary entry points and exit.
    #[arg(long)]
    pub call_graph: bool,

    /// One line per finding.
    #[arg(long, short)]
    pub quiet: bool,

    /// Override the interpreted-node budget per entry point.
    #[arg(long)]
    pub node_budget: Option<usize>,
}
