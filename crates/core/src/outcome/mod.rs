//! Parsing of merge-tool execution logs into structured outcomes.

pub mod parser;

use std::path::Path;

use tracing::info;

use crate::config::PathsConfig;
use crate::errors::ReportError;
use crate::stats::report::{write_json, write_text};

pub use parser::{classify, parse_outcome_log, strip_timestamp, LineKind, OutcomeLog, OutcomeParser, END_MARKER};

/// Read `<outputs>/<label>.log` and parse it.
pub fn parse_log_file(path: &Path) -> Result<OutcomeLog, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    Ok(parse_outcome_log(&text))
}

/// Write the three derived artifacts of one configuration: the diagnostic
/// stream, the records and the tree samples.
pub fn write_artifacts(paths: &PathsConfig, label: &str, log: &OutcomeLog) -> Result<(), ReportError> {
    write_text(&paths.config_artifact(label, "filtered.log"), &log.diagnostics_text())?;
    write_json(&paths.config_artifact(label, "json"), &log.records)?;
    write_json(&paths.config_artifact(label, "mergedASTData.json"), &log.samples)?;
    info!(
        label,
        records = log.records.len(),
        samples = log.samples.len(),
        "wrote outcome artifacts"
    );
    Ok(())
}
