//! Reference panel handling module.
//!
//! The reference panel maps each isolate id to its known serotype, or to `N/A` for
//! isolates that have none (negative controls).

use anyhow::Result;
use indexmap::IndexMap;
use std::path::Path;

use crate::stats::Truth;

/// Known serotypes for the isolates of a validation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePanel {
    /// Maps isolate IDs to their true serotype
    truths: IndexMap<String, Truth>,
}

impl ReferencePanel {
    /// Creates a new, empty panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an isolate, returning the truth it replaced if it was already present
    pub fn insert(&mut self, isolate: &str, truth: Truth) -> Option<Truth> {
        self.truths.insert(isolate.to_string(), truth)
    }

    /// Looks up an isolate, handing back the panel's own copy of the id with its truth
    pub fn get_key_value(&self, isolate: &str) -> Option<(&str, &Truth)> {
        self.truths
            .get_key_value(isolate)
            .map(|(key, truth)| (key.as_str(), truth))
    }

    /// Returns the number of isolates in the panel
    pub fn len(&self) -> usize {
        self.truths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truths.is_empty()
    }

    /// Number of isolates with no true serotype
    pub fn negative_controls(&self) -> usize {
        self.truths
            .values()
            .filter(|truth| **truth == Truth::Absent)
            .count()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Truth)> for ReferencePanel {
    fn from_iter<I: IntoIterator<Item = (S, Truth)>>(iter: I) -> Self {
        let mut panel = ReferencePanel::new();
        for (isolate, truth) in iter {
            panel.insert(isolate.as_ref(), truth);
        }
        panel
    }
}

/// Loads a reference panel from a tab-delimited file.
///
/// The file needs a header with an isolate column (`Isolate` or `Sample`) and a
/// truth column (`Serotype` or `Truth`). Any other columns are ignored.
pub fn load_reference(path: &Path) -> Result<ReferencePanel> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let mut panel = ReferencePanel::new();

    // Find column indices for required fields
    let headers = rdr.headers()?.clone();
    let isolate_col = headers.iter().position(|h| {
        h.trim().eq_ignore_ascii_case("isolate") || h.trim().eq_ignore_ascii_case("sample")
    });
    let truth_col = headers.iter().position(|h| {
        h.trim().eq_ignore_ascii_case("serotype") || h.trim().eq_ignore_ascii_case("truth")
    });

    let isolate_col = isolate_col
        .ok_or_else(|| anyhow::anyhow!("Reference file missing 'Isolate'/'Sample' column"))?;
    let truth_col = truth_col
        .ok_or_else(|| anyhow::anyhow!("Reference file missing 'Serotype'/'Truth' column"))?;

    for result in rdr.records() {
        let record = result?;
        let isolate = record
            .get(isolate_col)
            .ok_or_else(|| anyhow::anyhow!("Missing isolate ID in reference row"))?
            .trim();
        let truth = record
            .get(truth_col)
            .ok_or_else(|| anyhow::anyhow!("Missing serotype for isolate '{}'", isolate))?
            .trim();

        if isolate.is_empty() {
            log::warn!("Skipping reference row with empty isolate ID.");
            continue;
        }
        if truth.is_empty() {
            return Err(anyhow::anyhow!(
                "Isolate '{}' has an empty serotype; use N/A for isolates without one",
                isolate
            ));
        }

        if panel.insert(isolate, Truth::parse(truth)).is_some() {
            log::warn!("Isolate '{}' listed twice in reference; keeping the last entry.", isolate);
        }
    }

    if panel.is_empty() {
        return Err(anyhow::anyhow!(
            "No isolates found in reference file '{}'",
            path.display()
        ));
    }

    log::info!(
        "Loaded {} reference isolates ({} without a serotype) from {}",
        panel.len(),
        panel.negative_controls(),
        path.display()
    );
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_test_reference_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_load_reference_basic() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("reference.tsv");
        create_test_reference_file(
            &file_path,
            "Isolate\tSerotype\tNote\nVS01\tN/A\tblank\nVS05\tCholeraesuis\t\nVS09\tParatyphi A\t",
        );

        let panel = load_reference(&file_path).unwrap();

        assert_eq!(panel.len(), 3);
        assert_eq!(panel.get_key_value("VS01"), Some(("VS01", &Truth::Absent)));
        assert_eq!(
            panel.get_key_value("VS09").map(|(_, truth)| truth),
            Some(&Truth::Known("Paratyphi A".to_string()))
        );
        assert_eq!(panel.negative_controls(), 1);
        assert_eq!(panel.get_key_value("VS05").map(|(k, _)| k), Some("VS05"));
    }

    #[test]
    fn test_load_reference_column_names() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.tsv");
        create_test_reference_file(&file_path, "Isolate\tOtherField\nVS01\tValue1\n");
        assert!(load_reference(&file_path).is_err());

        // Alternative names, any case
        let file_path2 = dir.path().join("alt_names.tsv");
        create_test_reference_file(&file_path2, "sample\ttruth\nVS05\tCholeraesuis\n");
        let panel = load_reference(&file_path2).unwrap();
        assert_eq!(panel.len(), 1);
    }

    #[test]
    fn test_load_reference_rejects_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.tsv");
        create_test_reference_file(&file_path, "Isolate\tSerotype");
        assert!(load_reference(&file_path).is_err());

        let blank_truth = dir.path().join("blank.tsv");
        create_test_reference_file(&blank_truth, "Isolate\tSerotype\nVS05\t\n");
        assert!(load_reference(&blank_truth).is_err());
    }
}
