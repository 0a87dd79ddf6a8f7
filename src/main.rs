//! Main entry point for the seqsero_stats application.
//!
//! Post-processes SeqSero serotyping output for Salmonella validation runs:
//! 1. Extracting serotype calls from per-sample SeqSero reports into a table.
//! 2. Scoring those calls against a reference panel of known serotypes
//!    (TP/TN/FP/FN, accuracy, sensitivity, precision, specificity).
//! 3. Tabulating the scores across coverage levels.
//! 4. Working out how many reads to subsample for a target coverage.

// Modules defined within the project
mod cli;
mod coverage;
mod io;
mod pipeline;
mod reference;
mod stats;
use cli::{run_cli, Cli};

// External Crate Imports
use anyhow::Result;
use clap::Parser;

/// Main function: parses arguments and runs the requested command.
fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Run CLI
    run_cli(cli)?;

    Ok(())
}
