//! Accuracy statistics module.
//!
//! Scores SeqSero serotype calls against a reference panel of known serotypes and
//! reports confusion-matrix counts with accuracy, sensitivity, precision and specificity.

pub mod accuracy;
pub mod classification;

pub use accuracy::{
    compute_isolate_stats, compute_summary_stats, AccuracyError, IsolateStats, ReplicateTable,
    SummaryStats,
};
pub use classification::{SerotypeCall, Truth};
