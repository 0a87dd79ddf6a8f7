pub mod extract;
pub mod stat_table;

pub use extract::{collect_reports, SampleLayout};
pub use stat_table::{build_stat_table, StatMode};
