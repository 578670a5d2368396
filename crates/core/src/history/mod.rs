//! Merge-scenario mining from version-history text.

pub mod parser;

pub use parser::{parse_history, AncestorLookup, HistoryDiagnostic, HistoryParser, HistoryScan, HistoryState};
