//! Outcome statistics: cross-configuration comparison and depth tables.

pub mod aggregator;
pub mod depth;
pub mod report;

pub use aggregator::{compare, HoleKey, HoleOutcome, StatisticsAggregator, Verdict, UNKNOWN_PROJECT};
pub use depth::{depth_stats, DepthStats, DepthThreshold};
pub use report::{project_rows, read_json, write_json, ConfigSummary, ProjectRow, SummaryReport};
