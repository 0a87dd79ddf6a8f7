//! Confusion-matrix accuracy statistics for SeqSero serotype calls.
//!
//! Both entry points make a single pass over a [`ReplicateTable`], classify every
//! replicate against the [`ReferencePanel`] and derive percentages from the tallies.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use super::classification::{classify, NegativeCallPolicy, Outcome, SerotypeCall, Truth};
use crate::reference::ReferencePanel;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccuracyError {
    #[error("Isolate '{isolate}' (replicate '{replicate}') is not in the reference panel")]
    UnknownIsolate { isolate: String, replicate: String },

    #[error("No replicates to score; accuracy is undefined")]
    EmptyTable,

    #[error("Malformed row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

/// Replicate id -> serotype call, in input order.
///
/// A replicate id seen twice keeps its first position and its last call.
#[derive(Debug, Clone, Default)]
pub struct ReplicateTable {
    rows: IndexMap<String, SerotypeCall>,
}

impl ReplicateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a replicate, returning the call it replaced if the id was already present.
    pub fn insert(&mut self, replicate: &str, call: SerotypeCall) -> Option<SerotypeCall> {
        self.rows.insert(replicate.to_string(), call)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SerotypeCall)> {
        self.rows.iter().map(|(rep, call)| (rep.as_str(), call))
    }
}

impl<S: AsRef<str>> FromIterator<(S, SerotypeCall)> for ReplicateTable {
    fn from_iter<I: IntoIterator<Item = (S, SerotypeCall)>>(iter: I) -> Self {
        let mut table = ReplicateTable::new();
        for (replicate, call) in iter {
            table.insert(replicate.as_ref(), call);
        }
        table
    }
}

/// Isolate id of a replicate: everything before the first `-`.
pub fn isolate_of(replicate: &str) -> &str {
    replicate.split('-').next().unwrap_or(replicate)
}

/// TP/TN/FP/FN counters plus the number of replicates scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionTally {
    pub tp: u32,
    pub tn: u32,
    pub fp: u32,
    #[serde(rename = "fn")]
    pub fn_: u32,
    pub replicates: u32,
}

impl ConfusionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.tp += 1,
            Outcome::TrueNegative => self.tn += 1,
            Outcome::FalsePositive => self.fp += 1,
            Outcome::FalseNegative => self.fn_ += 1,
        }
        self.replicates += 1;
    }

    /// Sum of the four confusion classes.
    pub fn classified(&self) -> u32 {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Percentages derived from a tally. A ratio whose denominator is zero is `None` (`N/A`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedStats {
    pub accuracy: f64,
    pub sensitivity: Option<f64>,
    pub precision: Option<f64>,
    pub specificity: Option<f64>,
}

fn percent(numerator: u32, denominator: u32) -> Option<f64> {
    if denominator > 0 {
        Some(100.0 * numerator as f64 / denominator as f64)
    } else {
        None
    }
}

impl DerivedStats {
    /// Derives the four percentages, with accuracy taken over `total` replicates.
    pub fn from_tally(tally: &ConfusionTally, total: u32) -> Result<Self, AccuracyError> {
        let accuracy = percent(tally.tp + tally.tn, total).ok_or(AccuracyError::EmptyTable)?;

        Ok(DerivedStats {
            accuracy,
            sensitivity: percent(tally.tp, tally.tp + tally.fn_),
            precision: percent(tally.tp, tally.tp + tally.fp),
            specificity: percent(tally.tn, tally.tn + tally.fp),
        })
    }
}

/// Aggregate statistics over every replicate of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub tally: ConfusionTally,
    pub stats: DerivedStats,
}

/// Statistics for the replicates of a single isolate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsolateStats {
    pub isolate: String,
    pub serotype: Truth,
    pub tally: ConfusionTally,
    pub stats: DerivedStats,
}

fn lookup<'a>(
    reference: &'a ReferencePanel,
    replicate: &str,
) -> Result<(&'a str, &'a Truth), AccuracyError> {
    let isolate = isolate_of(replicate);
    reference
        .get_key_value(isolate)
        .ok_or_else(|| AccuracyError::UnknownIsolate {
            isolate: isolate.to_string(),
            replicate: replicate.to_string(),
        })
}

/// Scores every replicate of `table` in one tally.
///
/// Deferred calls (`See ...`) for isolates without a true serotype count as false
/// positives here.
pub fn compute_summary_stats(
    table: &ReplicateTable,
    reference: &ReferencePanel,
) -> Result<SummaryStats, AccuracyError> {
    if table.is_empty() {
        return Err(AccuracyError::EmptyTable);
    }
    let mut tally = ConfusionTally::new();

    for (replicate, call) in table.iter() {
        let (_, truth) = lookup(reference, replicate)?;
        let outcome = classify(call, truth, NegativeCallPolicy::UnresolvedOnly);
        debug!("{}: {} vs {} -> {:?}", replicate, call, truth, outcome);
        tally.record(outcome);
    }
    debug_assert_eq!(tally.classified(), tally.replicates);

    let stats = DerivedStats::from_tally(&tally, table.len() as u32)?;
    Ok(SummaryStats { tally, stats })
}

/// Scores replicates grouped by isolate, in the order isolates first appear.
///
/// Deferred calls for isolates without a true serotype count as true negatives here.
pub fn compute_isolate_stats(
    table: &ReplicateTable,
    reference: &ReferencePanel,
) -> Result<IndexMap<String, IsolateStats>, AccuracyError> {
    let mut tallies: IndexMap<&str, (&Truth, ConfusionTally)> = IndexMap::new();

    for (replicate, call) in table.iter() {
        let (isolate, truth) = lookup(reference, replicate)?;
        let outcome = classify(call, truth, NegativeCallPolicy::UnresolvedOrDeferred);
        debug!("{}: {} vs {} -> {:?}", replicate, call, truth, outcome);
        tallies
            .entry(isolate)
            .or_insert_with(|| (truth, ConfusionTally::new()))
            .1
            .record(outcome);
    }

    let mut results = IndexMap::with_capacity(tallies.len());
    for (isolate, (truth, tally)) in tallies {
        let stats = DerivedStats::from_tally(&tally, tally.replicates)?;
        results.insert(
            isolate.to_string(),
            IsolateStats {
                isolate: isolate.to_string(),
                serotype: truth.clone(),
                tally,
                stats,
            },
        );
    }

    Ok(results)
}
