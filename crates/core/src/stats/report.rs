//! Summary report types and JSON artifact I/O.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ReportError;
use crate::models::ScenarioEntry;

/// Aggregated figures of one configuration. Field names on the wire are the
/// ones downstream table generators read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub better: u64,
    pub worse: u64,
    pub same: u64,

    #[serde(rename = "total holes")]
    pub total_holes: u64,
    #[serde(rename = "total resolved holes")]
    pub total_resolved_holes: u64,
    #[serde(rename = "total k")]
    pub total_k: u64,
    #[serde(rename = "max. k")]
    pub max_k: u64,
    #[serde(rename = "total time")]
    pub total_time: u64,

    #[serde(rename = "holes by project")]
    pub holes_by_project: BTreeMap<String, u64>,
    #[serde(rename = "resolved holes by project")]
    pub resolved_holes_by_project: BTreeMap<String, u64>,
    #[serde(rename = "total k by project")]
    pub total_k_by_project: BTreeMap<String, u64>,
    #[serde(rename = "max. k by project")]
    pub max_k_by_project: BTreeMap<String, u64>,
    #[serde(rename = "time by project")]
    pub time_by_project: BTreeMap<String, u64>,
}

/// The whole report, keyed by configuration label.
pub type SummaryReport = BTreeMap<String, ConfigSummary>;

/// One row of the per-project table of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRow {
    pub project: String,
    pub conflict_files: u64,
    pub holes: u64,
    pub resolved: u64,
    pub resolved_rate: f64,
    pub max_k: u64,
    pub avg_k: f64,
    pub avg_time_ms: f64,
    /// Average k of the comparison configuration, when one is given.
    pub comparison_avg_k: Option<f64>,
}

fn ratio(x: u64, y: u64) -> f64 {
    if y == 0 {
        0.0
    } else {
        x as f64 / y as f64
    }
}

/// Per-project rows for `summary`, one per project of the scenario list,
/// sorted case-insensitively, followed by an `Overall` row. Averages of
/// `comparison` are divided by its own hole counts.
pub fn project_rows(
    summary: &ConfigSummary,
    comparison: Option<&ConfigSummary>,
    entries: &[ScenarioEntry],
) -> Vec<ProjectRow> {
    let mut files: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in entries {
        *files.entry(entry.project.as_str()).or_default() += 1;
    }
    let mut projects: Vec<&str> = files.keys().copied().collect();
    projects.sort_by_key(|p| p.to_lowercase());

    let get = |m: &BTreeMap<String, u64>, p: &str| m.get(p).copied().unwrap_or(0);
    let mut rows: Vec<ProjectRow> = projects
        .iter()
        .map(|&p| {
            let holes = get(&summary.holes_by_project, p);
            let resolved = get(&summary.resolved_holes_by_project, p);
            ProjectRow {
                project: p.to_string(),
                conflict_files: files[p],
                holes,
                resolved,
                resolved_rate: ratio(resolved, holes),
                max_k: get(&summary.max_k_by_project, p),
                avg_k: ratio(get(&summary.total_k_by_project, p), holes),
                avg_time_ms: ratio(get(&summary.time_by_project, p), holes),
                comparison_avg_k: comparison.map(|c| {
                    ratio(get(&c.total_k_by_project, p), get(&c.holes_by_project, p))
                }),
            }
        })
        .collect();

    rows.push(ProjectRow {
        project: "Overall".into(),
        conflict_files: entries.len() as u64,
        holes: summary.total_holes,
        resolved: summary.total_resolved_holes,
        resolved_rate: ratio(summary.total_resolved_holes, summary.total_holes),
        max_k: summary.max_k,
        avg_k: ratio(summary.total_k, summary.total_holes),
        avg_time_ms: ratio(summary.total_time, summary.total_holes),
        comparison_avg_k: comparison.map(|c| ratio(c.total_k, c.total_holes)),
    });
    rows
}

// ---------------------------------------------------------------------------
// Artifact I/O
// ---------------------------------------------------------------------------

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    Ok(())
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| ReportError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| ReportError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON artifact");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| ReportError::json(path, e))
}

pub fn write_text(path: &Path, text: &str) -> Result<(), ReportError> {
    ensure_parent(path)?;
    std::fs::write(path, text).map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json_keys() {
        let mut summary = ConfigSummary {
            better: 1,
            max_k: 9,
            ..Default::default()
        };
        summary.holes_by_project.insert("guava".into(), 3);
        let value = serde_json::to_value(&summary).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "better",
            "worse",
            "same",
            "total holes",
            "total resolved holes",
            "total k",
            "max. k",
            "total time",
            "holes by project",
            "resolved holes by project",
            "total k by project",
            "max. k by project",
            "time by project",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(value["max. k"], 9);
        assert_eq!(value["holes by project"]["guava"], 3);
    }

    #[test]
    fn test_write_and_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/summary.json");
        let mut report = SummaryReport::new();
        report.insert("default".into(), ConfigSummary::default());
        write_json(&path, &report).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"default\""));
        let back: SummaryReport = read_json(&path).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_read_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        let err = read_json::<SummaryReport>(&path).unwrap_err();
        assert!(matches!(err, ReportError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    fn entry(project: &str) -> ScenarioEntry {
        ScenarioEntry {
            project: project.into(),
            base: String::new(),
            left: String::new(),
            right: String::new(),
            expected: String::new(),
        }
    }

    #[test]
    fn test_project_rows() {
        let mut summary = ConfigSummary {
            total_holes: 4,
            total_resolved_holes: 2,
            total_k: 40,
            max_k: 20,
            total_time: 100,
            ..Default::default()
        };
        summary.holes_by_project.insert("guava".into(), 4);
        summary.resolved_holes_by_project.insert("guava".into(), 2);
        summary.total_k_by_project.insert("guava".into(), 40);
        summary.max_k_by_project.insert("guava".into(), 20);
        summary.time_by_project.insert("guava".into(), 100);

        let rows = project_rows(&summary, None, &[entry("guava"), entry("guava"), entry("Antlr")]);
        let names: Vec<_> = rows.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(names, vec!["Antlr", "guava", "Overall"]);

        assert_eq!(rows[0].holes, 0);
        assert_eq!(rows[0].resolved_rate, 0.0);
        assert_eq!(rows[1].conflict_files, 2);
        assert_eq!(rows[1].resolved_rate, 0.5);
        assert_eq!(rows[1].avg_k, 10.0);
        assert_eq!(rows[2].conflict_files, 3);
        assert_eq!(rows[2].avg_time_ms, 25.0);
    }

    #[test]
    fn test_project_rows_with_comparison() {
        let mut baseline = ConfigSummary {
            total_holes: 2,
            total_k: 30,
            ..Default::default()
        };
        baseline.holes_by_project.insert("guava".into(), 2);
        baseline.total_k_by_project.insert("guava".into(), 30);

        let mut ps = ConfigSummary {
            total_holes: 4,
            total_k: 12,
            ..Default::default()
        };
        ps.holes_by_project.insert("guava".into(), 4);
        ps.total_k_by_project.insert("guava".into(), 12);

        let rows = project_rows(&baseline, Some(&ps), &[entry("guava"), entry("jsoup")]);
        assert_eq!(rows[0].avg_k, 15.0);
        assert_eq!(rows[0].comparison_avg_k, Some(3.0));
        assert_eq!(rows[1].comparison_avg_k, Some(0.0));
        assert_eq!(rows[2].project, "Overall");
        assert_eq!(rows[2].comparison_avg_k, Some(3.0));

        let rows = project_rows(&baseline, None, &[entry("guava")]);
        assert!(rows.iter().all(|r| r.comparison_avg_k.is_none()));
    }
}
