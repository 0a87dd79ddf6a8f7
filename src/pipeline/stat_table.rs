//! Builds accuracy tables across coverage levels.
//!
//! The input root holds one directory per coverage level (`10x`, `20x`, ...), each with
//! a `seqsero_serotypes*.tsv` table from the extraction step.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::{
    read_serotype_table, write_tsv, IsolateRow, SummaryRow, ISOLATE_HEADER, SUMMARY_HEADER,
};
use crate::reference::ReferencePanel;
use crate::stats::{compute_isolate_stats, compute_summary_stats};

const SEROTYPE_TABLE_PREFIX: &str = "seqsero_serotypes";

/// Which statistics table to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatMode {
    /// One row per coverage level
    Summary,
    /// One row per isolate per coverage level
    Isolate,
}

/// A coverage-level directory and the serotype table found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRun {
    pub label: String,
    pub table_path: PathBuf,
}

/// Capitalises the first letter of every run of letters and lowercases the rest.
pub fn title_case(label: &str) -> String {
    let mut titled = String::with_capacity(label.len());
    let mut in_word = false;
    for c in label.chars() {
        if c.is_alphabetic() {
            if in_word {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            titled.push(c);
            in_word = false;
        }
    }
    titled
}

fn is_serotype_table(name: &str) -> bool {
    name.strip_prefix(SEROTYPE_TABLE_PREFIX)
        .map_or(false, |rest| rest.contains(".tsv"))
}

/// Lists the coverage directories under `root` in name order.
pub fn discover_coverage_runs(root: &Path) -> Result<Vec<CoverageRun>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut runs = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let mut tables: Vec<String> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| is_serotype_table(name))
            .collect();
        tables.sort();

        let table = tables.into_iter().next().ok_or_else(|| {
            anyhow!(
                "No {}*.tsv table in coverage directory {}",
                SEROTYPE_TABLE_PREFIX,
                dir.display()
            )
        })?;
        let label = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        runs.push(CoverageRun {
            label,
            table_path: dir.join(table),
        });
    }

    Ok(runs)
}

/// Scores every coverage run under `root` and writes the table to `output`.
///
/// Returns the number of data rows written.
pub fn build_stat_table(
    root: &Path,
    output: &Path,
    reference: &ReferencePanel,
    mode: StatMode,
) -> Result<usize> {
    let runs = discover_coverage_runs(root)?;
    info!("Found {} coverage levels under {}", runs.len(), root.display());

    let written = match mode {
        StatMode::Summary => {
            let mut rows = Vec::with_capacity(runs.len());
            for run in &runs {
                let table = read_serotype_table(&run.table_path)?;
                let summary = compute_summary_stats(&table, reference)?;
                info!(
                    "{}: {} replicates, accuracy {:.1}%",
                    run.label, summary.tally.replicates, summary.stats.accuracy
                );
                rows.push((run.label.clone(), summary));
            }
            write_tsv(
                output,
                &SUMMARY_HEADER,
                rows.iter().map(|(label, summary)| SummaryRow::new(label, summary)),
            )?
        }
        StatMode::Isolate => {
            let mut per_run = Vec::with_capacity(runs.len());
            for run in &runs {
                let table = read_serotype_table(&run.table_path)?;
                let isolates = compute_isolate_stats(&table, reference)?;
                info!("{}: {} isolates", run.label, isolates.len());
                per_run.push((title_case(&run.label), isolates));
            }
            write_tsv(
                output,
                &ISOLATE_HEADER,
                per_run.iter().flat_map(|(label, isolates)| {
                    isolates
                        .values()
                        .map(move |isolate| IsolateRow::new(label, isolate))
                }),
            )?
        }
    };

    info!("Wrote {} rows to {}", written, output.display());
    Ok(written)
}
