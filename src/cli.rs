use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io;
use std::path::{Path, PathBuf};

use crate::coverage::{required_reads, ReadSetSummary};
use crate::io::{
    read_serotype_table, write_tsv, write_tsv_to, IsolateRow, SummaryRow, ISOLATE_HEADER,
    SUMMARY_HEADER,
};
use crate::pipeline::extract::{DEFAULT_SAMPLE_PATTERN, REPORT_HEADER};
use crate::pipeline::{build_stat_table, collect_reports, SampleLayout, StatMode};
use crate::reference::load_reference;
use crate::stats::{compute_isolate_stats, compute_summary_stats};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect SeqSero serotype predictions from result directories into one table
    Extract {
        /// Directory holding one sub-directory per sample (defaults to the current directory)
        #[arg(short, long)]
        samples: Option<PathBuf>,

        /// Path to the output table
        #[arg(short, long, default_value = "seqsero_serotypes.tsv")]
        output: PathBuf,

        /// Regex that sample directory names must match at their start
        #[arg(long, default_value = DEFAULT_SAMPLE_PATTERN)]
        pattern: String,

        /// File of sample IDs, one per line; uses the SeqSero_result*/Seqsero_result.txt layout
        #[arg(long, conflicts_with = "pattern")]
        id_list: Option<PathBuf>,
    },

    /// Score one serotype table against the reference panel
    Accuracy {
        /// Serotype table produced by `extract`
        #[arg(short, long)]
        table: PathBuf,

        /// Reference panel (Isolate and Serotype columns, N/A for no serotype)
        #[arg(short, long)]
        reference: PathBuf,

        /// Summary over all replicates, or one row per isolate
        #[arg(short, long, value_enum, default_value_t = StatMode::Summary)]
        mode: StatMode,

        /// Label for the Coverage column (defaults to the table's directory name)
        #[arg(short, long)]
        label: Option<String>,

        /// Print JSON instead of a tab-delimited table
        #[arg(long)]
        json: bool,
    },

    /// Build an accuracy table across coverage-level directories
    StatTable {
        /// Directory holding one sub-directory per coverage level
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the output table
        #[arg(short, long)]
        output: PathBuf,

        /// Reference panel (Isolate and Serotype columns, N/A for no serotype)
        #[arg(short, long)]
        reference: PathBuf,

        /// Summary per coverage level, or one row per isolate per coverage level
        #[arg(short, long, value_enum, default_value_t = StatMode::Summary)]
        mode: StatMode,
    },

    /// Number of reads to subsample for a target genome coverage
    CoverageReads {
        /// Read-set summary files (e.g. R1 and R2)
        #[arg(short, long = "info", required = true, num_args = 1..)]
        info: Vec<PathBuf>,

        /// Genome size in bases
        #[arg(short, long)]
        genome_size: f64,

        /// Target fold coverage
        #[arg(short, long)]
        coverage: f64,
    },
}

fn coverage_label(table: &Path) -> String {
    table
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "-".to_string())
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract {
            samples,
            output,
            pattern,
            id_list,
        } => {
            let sample_root = match samples {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            if !sample_root.is_dir() {
                return Err(anyhow!(
                    "Not a valid sample directory: {}",
                    sample_root.display()
                ));
            }

            let layout = match id_list {
                Some(path) => SampleLayout::from_id_file(&path)?,
                None => SampleLayout::scan(&pattern)?,
            };
            let reports = collect_reports(&sample_root, &layout)?;
            let written = write_tsv(&output, &REPORT_HEADER, &reports)?;
            println!("Wrote {} serotype records to {}", written, output.display());
        }

        Commands::Accuracy {
            table,
            reference,
            mode,
            label,
            json,
        } => {
            let reference = load_reference(&reference)?;
            let replicates = read_serotype_table(&table)?;
            info!("Read {} replicates from {}", replicates.len(), table.display());
            let label = label.unwrap_or_else(|| coverage_label(&table));

            match mode {
                StatMode::Summary => {
                    let summary = compute_summary_stats(&replicates, &reference)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                    } else {
                        write_tsv_to(
                            io::stdout().lock(),
                            &SUMMARY_HEADER,
                            [SummaryRow::new(&label, &summary)],
                        )?;
                    }
                }
                StatMode::Isolate => {
                    let isolates = compute_isolate_stats(&replicates, &reference)?;
                    if json {
                        let records: Vec<_> = isolates.values().collect();
                        println!("{}", serde_json::to_string_pretty(&records)?);
                    } else {
                        write_tsv_to(
                            io::stdout().lock(),
                            &ISOLATE_HEADER,
                            isolates.values().map(|iso| IsolateRow::new(&label, iso)),
                        )?;
                    }
                }
            }
        }

        Commands::StatTable {
            input,
            output,
            reference,
            mode,
        } => {
            let reference = load_reference(&reference)?;
            let written = build_stat_table(&input, &output, &reference, mode)?;
            println!("Wrote {} rows to {}", written, output.display());
        }

        Commands::CoverageReads {
            info,
            genome_size,
            coverage,
        } => {
            let read_sets = info
                .iter()
                .map(|path| ReadSetSummary::from_path(path))
                .collect::<Result<Vec<_>>>()?;
            let reads = required_reads(&read_sets, genome_size, coverage)?;
            println!("{}", reads);
        }
    }

    Ok(())
}
