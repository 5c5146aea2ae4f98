use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Production floor task tracker.
/// Storage defaults to ~/.shopfloor/shopfloor.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "shop", version, about = "Production task, workflow and QC tracker")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
