//! Read-count targets for subsampling to a given genome coverage.
//!
//! Works from read-set summary files whose first line is comma-separated with the
//! sequence count in the second field and the nucleotide count in the third, e.g.
//! `reads_R1.fastq.gz, 1.2M seqs, 181.4M nts, ...`.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoverageError {
    #[error("Unrecognised number '{0}'")]
    BadScaledNumber(String),

    #[error("Summary line has no field {field}: '{line}'")]
    MissingField { field: usize, line: String },

    #[error("Read set reports zero sequences")]
    NoSequences,

    #[error("No read sets given")]
    NoReadSets,
}

/// Parses numbers such as `950`, `12.5k`, `1.2M` or `3G`.
pub fn parse_scaled(raw: &str) -> Result<f64, CoverageError> {
    let bad = || CoverageError::BadScaledNumber(raw.to_string());
    let last = raw.chars().last().ok_or_else(bad)?;

    let (digits, scale) = match last {
        '0'..='9' => (raw, 1.0),
        'k' => (&raw[..raw.len() - 1], 1e3),
        'M' => (&raw[..raw.len() - 1], 1e6),
        'G' => (&raw[..raw.len() - 1], 1e9),
        _ => return Err(bad()),
    };
    let value: f64 = digits.parse().map_err(|_| bad())?;
    Ok(value * scale)
}

/// Sequence and nucleotide totals of one read file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadSetSummary {
    pub sequences: f64,
    pub nucleotides: f64,
}

impl ReadSetSummary {
    /// Parses the totals line of a summary file.
    pub fn parse(line: &str) -> Result<Self, CoverageError> {
        let fields: Vec<&str> = line.split(',').collect();
        let leading = |field: usize| {
            fields
                .get(field)
                .and_then(|f| f.split_whitespace().next())
                .ok_or_else(|| CoverageError::MissingField {
                    field,
                    line: line.trim_end().to_string(),
                })
        };

        let sequences = parse_scaled(leading(1)?)?;
        let nucleotides = parse_scaled(leading(2)?)?;
        if sequences <= 0.0 {
            return Err(CoverageError::NoSequences);
        }
        Ok(ReadSetSummary {
            sequences,
            nucleotides,
        })
    }

    /// Reads the first line of a summary file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut line = String::new();
        BufReader::new(file).read_line(&mut line)?;
        Self::parse(&line).with_context(|| format!("Bad summary file {}", path.display()))
    }

    pub fn mean_length(&self) -> f64 {
        self.nucleotides / self.sequences
    }
}

/// Number of reads needed for `coverage`-fold coverage of a `genome_size` genome.
///
/// Mean lengths of the read sets are added together, so mates of a pair count as one
/// fragment. The result never exceeds the sequence count of the last read set.
pub fn required_reads(
    read_sets: &[ReadSetSummary],
    genome_size: f64,
    coverage: f64,
) -> Result<u64, CoverageError> {
    let last = read_sets.last().ok_or(CoverageError::NoReadSets)?;
    let fragment_length: f64 = read_sets.iter().map(ReadSetSummary::mean_length).sum();

    let required = genome_size * coverage / fragment_length;
    if required > last.sequences {
        log::warn!(
            "Requested {}x coverage needs {:.0} reads but only {:.0} are available",
            coverage,
            required,
            last.sequences
        );
        Ok(last.sequences as u64)
    } else {
        Ok(required as u64)
    }
}
