//! # shop - production floor task tracker
//!
//! A command-line front end over the production core of a headphone workshop:
//! tasks planned from order line items move through a batch's workflow
//! stages, and quality checkpoints decide whether a task may start or finish.
//!
//! ## Key Features
//!
//! - **Workflow progress**: where each task sits in its batch's workflow and
//!   which stages come next
//! - **Task grouping**: a worker's tasks grouped by batch, unbatched work
//!   grouped by headphone model
//! - **Quality checkpoints**: configurable pre-work and post-work checklists
//!   with photo and measurement requirements, plus a fixed final QC sign-off
//! - **Local JSON store**: one file standing in for the production database,
//!   written atomically with timestamped backups
//!
//! ## Quick Start
//!
//! ```bash
//! # A worker's task list, unbatched work grouped by model
//! shop tasks --worker 3 --by model
//!
//! # Where is task 12?
//! shop progress 12
//!
//! # Pre-work checklist; starts the task when it lets the task through
//! shop inspect 12 --type pre-work --pass 1,2 --measure 2=8.5
//!
//! # Final QC and completion
//! shop qc 12 --visual pass --hardware pass --sound pass --complete
//! ```
//!
//! Data lives in `~/.shopfloor/shopfloor.json` unless `SHOP_DIR` or `--db`
//! point elsewhere. Set `SHOP_LOG` (e.g. `info`, `shop::gate=debug`) to
//! control logging.

use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

pub mod checkpoint;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod gate;
pub mod grouping;
pub mod lifecycle;
pub mod qc;
pub mod task;
pub mod workflow;

use cli::Cli;
use cmd::{run, Shop};
use config::Settings;

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::resolve(cli.db.clone(), cli.verbose) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(&settings.log_level);

    if let Err(e) = settings.ensure_store_dir() {
        eprintln!("Failed to create store directory for {}: {}", settings.store_path.display(), e);
        std::process::exit(1);
    }

    let mut shop = match Shop::open(settings) {
        Ok(shop) => shop,
        Err(e) => {
            eprintln!("Failed to open store: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut shop, cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
