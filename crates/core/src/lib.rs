//! mergemine core library.
//!
//! This crate provides the building blocks for mining merge scenarios from
//! git histories and evaluating a merge-resolution tool on them: history
//! parsing, scenario materialization with three-way pruning, the tool runner,
//! execution-log parsing, and cross-configuration statistics.

pub mod config;
pub mod errors;
pub mod git;
pub mod history;
pub mod materialize;
pub mod models;
pub mod outcome;
pub mod runner;
pub mod scenario_list;
pub mod stats;

// Re-exports for convenience.
pub use config::MineConfig;
pub use git::GitClient;
pub use history::{parse_history, HistoryParser};
pub use materialize::ScenarioMaterializer;
pub use outcome::{parse_outcome_log, OutcomeParser};
pub use runner::ToolRunner;
pub use stats::StatisticsAggregator;
