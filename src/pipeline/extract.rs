//! Extraction of serotype predictions from SeqSero result files.
//!
//! Each SeqSero run leaves a plain-text report of `Key: value` lines. This module
//! finds those reports under a sample directory and collapses each into one
//! [`SerotypeReport`] row.

use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid sample pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Report {} has no '{}' line", .path.display(), .field)]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Report {} has an empty '{}' value", .path.display(), .field)]
    EmptyField { path: PathBuf, field: &'static str },

    #[error("No SeqSero_result directory under {}", .0.display())]
    MissingResultDir(PathBuf),
}

/// Default pattern for validation-set sample directories.
pub const DEFAULT_SAMPLE_PATTERN: &str = r"^VS\d{2}";

/// Column order of the extracted serotype table.
pub const REPORT_HEADER: [&str; 7] = [
    "Isolate",
    "O antigen",
    "H1 antigen",
    "H2 antigen",
    "Profile",
    "Sdf",
    "Serotype",
];

const INPUT_FILES_KEY: &str = "Input files";
const SEROTYPE_KEY: &str = "Predicted serotype(s)";

/// Serotype fields pulled out of one SeqSero report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerotypeReport {
    #[serde(rename = "Isolate")]
    pub isolate: String,
    #[serde(rename = "O antigen")]
    pub o_antigen: String,
    #[serde(rename = "H1 antigen")]
    pub h1_antigen: String,
    #[serde(rename = "H2 antigen")]
    pub h2_antigen: String,
    #[serde(rename = "Profile")]
    pub profile: String,
    #[serde(rename = "Sdf")]
    pub sdf: String,
    #[serde(rename = "Serotype")]
    pub serotype: String,
}

impl SerotypeReport {
    /// Parses the text of a SeqSero report. `source` is only used in error messages.
    pub fn parse(text: &str, source: &Path) -> Result<Self, ExtractError> {
        let mut report = SerotypeReport::default();
        let mut input_files = None;
        let mut serotype = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                INPUT_FILES_KEY => input_files = Some(value),
                "O antigen prediction" => report.o_antigen = value,
                "H1 antigen prediction(fliC)" => report.h1_antigen = value,
                "H2 antigen prediction(fljB)" => report.h2_antigen = value,
                "Predicted antigenic profile" => report.profile = value,
                SEROTYPE_KEY => serotype = Some(value),
                "Sdf prediction" => report.sdf = value,
                _ => {}
            }
        }

        let input_files = input_files.ok_or_else(|| ExtractError::MissingField {
            path: source.to_path_buf(),
            field: INPUT_FILES_KEY,
        })?;
        report.isolate = replicate_from_input_files(&input_files).ok_or_else(|| {
            ExtractError::EmptyField {
                path: source.to_path_buf(),
                field: INPUT_FILES_KEY,
            }
        })?;

        let serotype = serotype.ok_or_else(|| ExtractError::MissingField {
            path: source.to_path_buf(),
            field: SEROTYPE_KEY,
        })?;
        report.serotype = collapse_serotypes(&serotype);

        Ok(report)
    }

    /// Reads and parses a report file.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, path)
    }
}

/// Replicate id from the `Input files` value: the first file name, cut at its first `_`.
fn replicate_from_input_files(value: &str) -> Option<String> {
    let first_file = value.split_whitespace().next()?;
    first_file
        .split('_')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Turns `A or B*` into `A,B`.
pub fn collapse_serotypes(value: &str) -> String {
    value.trim_end_matches('*').split(" or ").join(",")
}

/// How sample directories and their reports are laid out on disk.
#[derive(Debug, Clone)]
pub enum SampleLayout {
    /// Every entry whose name matches the pattern at its start is a sample; reports are
    /// the `*_seqsero_result.txt` files directly inside it.
    Scan { sample_pattern: Regex },
    /// Samples are named explicitly; reports are `Seqsero_result.txt` files inside the
    /// sample's `SeqSero_result*` directory.
    IdList { sample_ids: Vec<String> },
}

impl SampleLayout {
    pub fn scan(pattern: &str) -> Result<Self, ExtractError> {
        Ok(SampleLayout::Scan {
            sample_pattern: Regex::new(pattern)?,
        })
    }

    /// Reads sample ids, one per line, from `path`. Blank lines are skipped.
    pub fn from_id_file(path: &Path) -> Result<Self, ExtractError> {
        let sample_ids = fs::read_to_string(path)?
            .lines()
            .map(str::trim_end)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Ok(SampleLayout::IdList { sample_ids })
    }
}

fn matches_at_start(pattern: &Regex, name: &str) -> bool {
    pattern.find(name).map_or(false, |m| m.start() == 0)
}

/// Sorted names of the entries of `dir` accepted by `keep`.
fn sorted_entries(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<String>, ExtractError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if keep(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Finds the report files of one sample.
fn report_paths(
    sample_root: &Path,
    sample: &str,
    layout: &SampleLayout,
) -> Result<Vec<PathBuf>, ExtractError> {
    let sample_dir = sample_root.join(sample);

    let result_dir = match layout {
        SampleLayout::Scan { .. } => sample_dir,
        SampleLayout::IdList { .. } => {
            let result_dirs =
                sorted_entries(&sample_dir, |name| name.starts_with("SeqSero_result"))?;
            let first = result_dirs
                .into_iter()
                .next()
                .ok_or_else(|| ExtractError::MissingResultDir(sample_dir.clone()))?;
            sample_dir.join(first)
        }
    };

    let is_report = |name: &str| match layout {
        SampleLayout::Scan { .. } => name.ends_with("_seqsero_result.txt"),
        SampleLayout::IdList { .. } => name.starts_with("Seqsero_result.txt"),
    };

    Ok(sorted_entries(&result_dir, is_report)?
        .into_iter()
        .map(|name| result_dir.join(name))
        .collect())
}

/// Collects one [`SerotypeReport`] per result file of every sample under `sample_root`.
pub fn collect_reports(
    sample_root: &Path,
    layout: &SampleLayout,
) -> Result<Vec<SerotypeReport>, ExtractError> {
    let samples = match layout {
        SampleLayout::Scan { sample_pattern } => {
            let mut samples = Vec::new();
            let candidates =
                sorted_entries(sample_root, |name| matches_at_start(sample_pattern, name))?;
            for name in candidates {
                if sample_root.join(&name).is_dir() {
                    samples.push(name);
                } else {
                    warn!("Skipping {}: not a directory", sample_root.join(&name).display());
                }
            }
            samples
        }
        SampleLayout::IdList { sample_ids } => sample_ids.clone(),
    };
    info!("Found {} samples under {}", samples.len(), sample_root.display());

    let mut reports = Vec::new();
    for sample in &samples {
        let paths = report_paths(sample_root, sample, layout)?;
        if paths.is_empty() {
            warn!("No SeqSero result files for sample {}", sample);
        }
        for path in paths {
            debug!("Reading {}", path.display());
            reports.push(SerotypeReport::from_path(&path)?);
        }
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REPORT: &str = "\
This file contains the SeqSero results.
Input files:\tVS06-1_S6_L001_R1_001.fastq.gz VS06-1_S6_L001_R2_001.fastq.gz
O antigen prediction:\t4
H1 antigen prediction(fliC):\ti
H2 antigen prediction(fljB):\t1,2
Predicted antigenic profile:\t4:i:1,2
Predicted subspecies:\tI
Predicted serotype(s):\tTyphimurium or Lagos*
Sdf prediction:\tSdf prediction: - (not Enteritidis)
";

    fn write_report(path: &Path, isolate: &str, serotype: &str) {
        let text = REPORT
            .replace("VS06-1", isolate)
            .replace("Typhimurium or Lagos*", serotype);
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_parse_report() {
        let report = SerotypeReport::parse(REPORT, Path::new("r.txt")).unwrap();
        assert_eq!(report.isolate, "VS06-1");
        assert_eq!(report.o_antigen, "4");
        assert_eq!(report.h2_antigen, "1,2");
        assert_eq!(report.profile, "4:i:1,2");
        assert_eq!(report.serotype, "Typhimurium,Lagos");
        // Only the first ':' separates key from value.
        assert_eq!(report.sdf, "Sdf prediction: - (not Enteritidis)");
    }

    #[test]
    fn test_parse_report_missing_fields() {
        let no_serotype = "Input files:\tVS01-1_R1.fastq\nO antigen prediction:\t-\n";
        assert!(matches!(
            SerotypeReport::parse(no_serotype, Path::new("r.txt")),
            Err(ExtractError::MissingField { field: SEROTYPE_KEY, .. })
        ));

        let no_input = "Predicted serotype(s):\tN/A\n";
        assert!(matches!(
            SerotypeReport::parse(no_input, Path::new("r.txt")),
            Err(ExtractError::MissingField { field: INPUT_FILES_KEY, .. })
        ));

        // Optional fields stay empty.
        let minimal = "Input files:\tVS01-1_R1.fastq\nPredicted serotype(s):\tN/A\n";
        let report = SerotypeReport::parse(minimal, Path::new("r.txt")).unwrap();
        assert_eq!(report.isolate, "VS01-1");
        assert_eq!(report.serotype, "N/A");
        assert!(report.o_antigen.is_empty());
    }

    #[test]
    fn test_collapse_serotypes() {
        assert_eq!(collapse_serotypes("Paratyphi A"), "Paratyphi A");
        assert_eq!(
            collapse_serotypes("Typhimurium or Lagos or Agama*"),
            "Typhimurium,Lagos,Agama"
        );
        assert_eq!(collapse_serotypes("See comments below*"), "See comments below");
    }

    #[test]
    fn test_collect_reports_scan_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for sample in ["VS06", "VS05", "other"] {
            fs::create_dir(root.join(sample)).unwrap();
        }
        write_report(&root.join("VS05/VS05-2_seqsero_result.txt"), "VS05-2", "Choleraesuis");
        write_report(&root.join("VS05/VS05-1_seqsero_result.txt"), "VS05-1", "Choleraesuis");
        write_report(&root.join("VS06/VS06-1_seqsero_result.txt"), "VS06-1", "Typhimurium");
        write_report(&root.join("VS06/notes.txt"), "VS06-9", "Typhimurium");
        write_report(&root.join("other/X-1_seqsero_result.txt"), "X-1", "Newport");
        fs::write(root.join("VS99.log"), "not a sample").unwrap();

        let layout = SampleLayout::scan(DEFAULT_SAMPLE_PATTERN).unwrap();
        let reports = collect_reports(root, &layout).unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.isolate.as_str()).collect();
        assert_eq!(ids, vec!["VS05-1", "VS05-2", "VS06-1"]);
        assert_eq!(reports[2].serotype, "Typhimurium");
    }

    #[test]
    fn test_collect_reports_id_list_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let result_dir = root.join("PNUSAS000001/SeqSero_result_run1");
        fs::create_dir_all(&result_dir).unwrap();
        write_report(&result_dir.join("Seqsero_result.txt"), "PNUSAS000001", "Newport");
        fs::create_dir_all(root.join("PNUSAS000002")).unwrap();

        let id_file = root.join("ids.txt");
        fs::write(&id_file, "PNUSAS000001\n\n").unwrap();
        let layout = SampleLayout::from_id_file(&id_file).unwrap();
        let reports = collect_reports(root, &layout).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].isolate, "PNUSAS000001");
        assert_eq!(reports[0].serotype, "Newport");

        let missing = SampleLayout::IdList {
            sample_ids: vec!["PNUSAS000002".to_string()],
        };
        assert!(matches!(
            collect_reports(root, &missing),
            Err(ExtractError::MissingResultDir(_))
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            SampleLayout::scan("VS(["),
            Err(ExtractError::PatternError(_))
        ));
    }
}
