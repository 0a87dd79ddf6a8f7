//! Input/Output operations module.
//!
//! Handles reading serotype tables and writing the tab-delimited tables produced by
//! the extraction and statistics commands.

use anyhow::{Context, Result};
use log::warn;
use serde::{Serialize, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::stats::classification::NO_CALL;
use crate::stats::{AccuracyError, IsolateStats, ReplicateTable, SerotypeCall, SummaryStats};

/// Column order of the aggregate statistics table.
pub const SUMMARY_HEADER: [&str; 10] = [
    "Coverage",
    "Replicates",
    "TP",
    "TN",
    "FP",
    "FN",
    "Accuracy",
    "Sensitivity",
    "Precision",
    "Specificity",
];

/// Column order of the per-isolate statistics table.
pub const ISOLATE_HEADER: [&str; 12] = [
    "Isolate",
    "Coverage",
    "Serotype",
    "Replicates",
    "TP",
    "TN",
    "FP",
    "FN",
    "Accuracy",
    "Sensitivity",
    "Precision",
    "Specificity",
];

/// Formats a float the way the downstream spreadsheets expect: whole numbers keep
/// one decimal (`80.0`), everything else uses the shortest exact form.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Formats an optional percentage, `N/A` when undefined.
pub fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| NO_CALL.to_string(), format_float)
}

fn serialize_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_float(*value))
}

fn serialize_ratio<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_ratio(*value))
}

/// One line of the aggregate statistics table.
#[derive(Debug, Serialize)]
pub struct SummaryRow<'a> {
    pub coverage: &'a str,
    pub replicates: u32,
    pub tp: u32,
    pub tn: u32,
    pub fp: u32,
    pub fn_: u32,
    #[serde(serialize_with = "serialize_float")]
    pub accuracy: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub sensitivity: Option<f64>,
    #[serde(serialize_with = "serialize_ratio")]
    pub precision: Option<f64>,
    #[serde(serialize_with = "serialize_ratio")]
    pub specificity: Option<f64>,
}

impl<'a> SummaryRow<'a> {
    pub fn new(coverage: &'a str, summary: &SummaryStats) -> Self {
        SummaryRow {
            coverage,
            replicates: summary.tally.replicates,
            tp: summary.tally.tp,
            tn: summary.tally.tn,
            fp: summary.tally.fp,
            fn_: summary.tally.fn_,
            accuracy: summary.stats.accuracy,
            sensitivity: summary.stats.sensitivity,
            precision: summary.stats.precision,
            specificity: summary.stats.specificity,
        }
    }
}

/// One line of the per-isolate statistics table.
#[derive(Debug, Serialize)]
pub struct IsolateRow<'a> {
    pub isolate: &'a str,
    pub coverage: &'a str,
    pub serotype: &'a str,
    pub replicates: u32,
    pub tp: u32,
    pub tn: u32,
    pub fp: u32,
    pub fn_: u32,
    #[serde(serialize_with = "serialize_float")]
    pub accuracy: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub sensitivity: Option<f64>,
    #[serde(serialize_with = "serialize_ratio")]
    pub precision: Option<f64>,
    #[serde(serialize_with = "serialize_ratio")]
    pub specificity: Option<f64>,
}

impl<'a> IsolateRow<'a> {
    pub fn new(coverage: &'a str, isolate: &'a IsolateStats) -> Self {
        IsolateRow {
            isolate: &isolate.isolate,
            coverage,
            serotype: isolate.serotype.as_str(),
            replicates: isolate.tally.replicates,
            tp: isolate.tally.tp,
            tn: isolate.tally.tn,
            fp: isolate.tally.fp,
            fn_: isolate.tally.fn_,
            accuracy: isolate.stats.accuracy,
            sensitivity: isolate.stats.sensitivity,
            precision: isolate.stats.precision,
            specificity: isolate.stats.specificity,
        }
    }
}

/// Reads a serotype table: replicate id from the first column, call from the last.
///
/// The first line is a header. Rows with fewer than two columns, an empty replicate
/// id or an empty call fail with [`AccuracyError::MalformedRow`].
pub fn read_serotype_table(path: &Path) -> Result<ReplicateTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open serotype table {}", path.display()))?;
    let mut table = ReplicateTable::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |pos| pos.line());
        let malformed = |reason: &str| AccuracyError::MalformedRow {
            line,
            reason: reason.to_string(),
        };

        if record.len() < 2 {
            return Err(malformed("expected a replicate column and a serotype column").into());
        }
        let replicate = record[0].trim();
        if replicate.is_empty() {
            return Err(malformed("empty replicate id").into());
        }
        let call = SerotypeCall::parse(&record[record.len() - 1])
            .ok_or_else(|| malformed("empty serotype call"))?;

        if table.insert(replicate, call).is_some() {
            warn!(
                "Replicate '{}' appears more than once in {}; keeping the last call.",
                replicate,
                path.display()
            );
        }
    }

    Ok(table)
}

/// Writes `rows` as a tab-delimited table under `header` to any writer.
///
/// The header is written even when there are no rows. Returns the number of rows.
pub fn write_tsv_to<W, T, I>(out: W, header: &[&str], rows: I) -> Result<usize>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out);

    writer.write_record(header)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }

    writer.flush()?; // Ensure all data is written to the file
    Ok(count)
}

/// Like [`write_tsv_to`], writing to `output_path` and creating missing parent directories.
pub fn write_tsv<T, I>(output_path: &Path, header: &[&str], rows: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    write_tsv_to(BufWriter::new(file), header, rows)
}
