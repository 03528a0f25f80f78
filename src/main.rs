//! # diabetes-risk command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging (console + rolling files)
//!   └─> Run the subcommand
//!         ├─> pipeline stages run synchronously
//!         └─> `serve` starts a Tokio runtime for the web form
//! ```
//!
//! ```bash
//! diabetes-risk run
//! diabetes-risk transform --encoding one-hot
//! diabetes-risk predict 1 54 0 0 1 27.32 6.6 140
//! diabetes-risk serve --addr 127.0.0.1:8080
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    diabetes_risk::logging::init(&cli.log_dir)?;

    cli::run_command(cli).inspect_err(|e| {
        tracing::error!("{e:#}");
    })
}
