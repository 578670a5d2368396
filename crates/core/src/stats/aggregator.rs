//! Cross-configuration aggregation of synthesis outcomes.
//!
//! A *hole* is identified by its scenario key and its 0-based position among
//! the synthesis attempts of that scenario's record. The same hole observed
//! under two configurations is compared step-for-step against the baseline:
//!
//! | baseline found | config found | verdict                         |
//! |----------------|--------------|---------------------------------|
//! | yes            | yes          | fewer steps better, more worse  |
//! | yes            | no           | worse                           |
//! | no             | yes          | better                          |
//! | no             | no           | same                            |

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::errors::ReportError;
use crate::models::{project_from_path, MergeAttemptRecord};

use super::report::{ConfigSummary, SummaryReport};

/// Project name used when a left path carries no `commits/` segment.
pub const UNKNOWN_PROJECT: &str = "unknown";

/// `(scenario key, hole ordinal)`
pub type HoleKey = (String, usize);

/// What one configuration achieved on one hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleOutcome {
    pub found: bool,
    pub steps: u64,
    pub time: u64,
    pub project: String,
}

/// Per-verdict outcome of comparing a configuration against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Better,
    Worse,
    Same,
}

/// Classify one hole against the baseline.
pub fn compare(baseline: &HoleOutcome, now: &HoleOutcome) -> Verdict {
    match (baseline.found, now.found) {
        (true, true) => match now.steps.cmp(&baseline.steps) {
            std::cmp::Ordering::Less => Verdict::Better,
            std::cmp::Ordering::Greater => Verdict::Worse,
            std::cmp::Ordering::Equal => Verdict::Same,
        },
        (true, false) => Verdict::Worse,
        (false, true) => Verdict::Better,
        (false, false) => Verdict::Same,
    }
}

/// Collects records per configuration and produces the summary report.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    baseline: String,
    /// Labels in insertion order.
    labels: Vec<String>,
    holes: BTreeMap<HoleKey, BTreeMap<String, HoleOutcome>>,
}

impl StatisticsAggregator {
    pub fn new(baseline: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            ..Default::default()
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    pub fn outcome(&self, key: &HoleKey, label: &str) -> Option<&HoleOutcome> {
        self.holes.get(key).and_then(|by_conf| by_conf.get(label))
    }

    /// Register every hole of `records` under configuration `label`.
    pub fn add_records(&mut self, label: &str, records: &[MergeAttemptRecord]) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }

        for record in records {
            let key = record.scenario.key();
            let project = match project_from_path(&record.scenario.left) {
                Some(p) => p.to_string(),
                None => {
                    warn!(left = %record.scenario.left, "no project segment in scenario path");
                    UNKNOWN_PROJECT.to_string()
                }
            };

            for (ordinal, attempt) in record.synthesis_attempts.iter().enumerate() {
                let outcome = HoleOutcome {
                    found: attempt.is_resolved(),
                    steps: attempt.steps.unwrap_or(0),
                    time: if attempt.error { 0 } else { attempt.time.unwrap_or(0) },
                    project: project.clone(),
                };
                self.holes
                    .entry((key.clone(), ordinal))
                    .or_default()
                    .insert(label.to_string(), outcome);
            }
        }
    }

    /// Summarize every registered configuration.
    pub fn summarize(&self) -> Result<SummaryReport, ReportError> {
        if !self.labels.iter().any(|l| *l == self.baseline) {
            return Err(ReportError::UnknownBaseline(self.baseline.clone()));
        }

        let mut report = SummaryReport::new();
        for label in &self.labels {
            let summary = self.summarize_one(label);
            info!(
                label = %label,
                holes = summary.total_holes,
                resolved = summary.total_resolved_holes,
                better = summary.better,
                worse = summary.worse,
                same = summary.same,
                "summarized configuration"
            );
            report.insert(label.clone(), summary);
        }
        Ok(report)
    }

    fn summarize_one(&self, label: &str) -> ConfigSummary {
        let mut s = ConfigSummary::default();

        for by_conf in self.holes.values() {
            let Some(now) = by_conf.get(label) else {
                continue;
            };
            let project = now.project.clone();

            s.total_holes += 1;
            s.total_k += now.steps;
            s.total_time += now.time;
            s.max_k = s.max_k.max(now.steps);
            *s.holes_by_project.entry(project.clone()).or_default() += 1;
            *s.total_k_by_project.entry(project.clone()).or_default() += now.steps;
            *s.time_by_project.entry(project.clone()).or_default() += now.time;
            let max = s.max_k_by_project.entry(project.clone()).or_default();
            *max = (*max).max(now.steps);

            if now.found {
                s.total_resolved_holes += 1;
                *s.resolved_holes_by_project.entry(project).or_default() += 1;
            }

            if let Some(baseline) = by_conf.get(&self.baseline) {
                match compare(baseline, now) {
                    Verdict::Better => s.better += 1,
                    Verdict::Worse => s.worse += 1,
                    Verdict::Same => s.same += 1,
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseRef, ScenarioPaths, SynthesisAttempt};

    fn attempt(found: bool, steps: u64, time: u64) -> SynthesisAttempt {
        SynthesisAttempt {
            depth: Some(2),
            steps: Some(steps),
            found,
            time: Some(time),
            error: false,
        }
    }

    fn record(project: &str, file: &str, attempts: Vec<SynthesisAttempt>) -> MergeAttemptRecord {
        let root = format!("/w/commits/{}/m1", project);
        MergeAttemptRecord {
            scenario: ScenarioPaths {
                base: BaseRef::Present(format!("{}/base/{}", root, file)),
                left: format!("{}/left/{}", root, file),
                right: format!("{}/right/{}", root, file),
                expected: format!("{}/expected/{}", root, file),
            },
            error: false,
            synthesis_attempts: attempts,
        }
    }

    fn outcome(found: bool, steps: u64) -> HoleOutcome {
        HoleOutcome {
            found,
            steps,
            time: 0,
            project: "p".into(),
        }
    }

    #[test]
    fn test_compare_table() {
        assert_eq!(compare(&outcome(true, 10), &outcome(true, 5)), Verdict::Better);
        assert_eq!(compare(&outcome(true, 10), &outcome(true, 15)), Verdict::Worse);
        assert_eq!(compare(&outcome(true, 10), &outcome(true, 10)), Verdict::Same);
        assert_eq!(compare(&outcome(true, 1), &outcome(false, 0)), Verdict::Worse);
        assert_eq!(compare(&outcome(false, 99), &outcome(true, 100)), Verdict::Better);
        assert_eq!(compare(&outcome(false, 1), &outcome(false, 9)), Verdict::Same);
    }

    #[test]
    fn test_baseline_against_itself_is_all_same() {
        let mut agg = StatisticsAggregator::new("default");
        agg.add_records(
            "default",
            &[record("guava", "A.java", vec![attempt(true, 3, 10), attempt(false, 7, 20)])],
        );
        let report = agg.summarize().unwrap();
        let s = &report["default"];
        assert_eq!((s.better, s.worse, s.same), (0, 0, 2));
        assert_eq!(s.total_holes, 2);
        assert_eq!(s.total_resolved_holes, 1);
        assert_eq!(s.total_k, 10);
        assert_eq!(s.max_k, 7);
        assert_eq!(s.total_time, 30);
    }

    #[test]
    fn test_verdicts_sum_to_shared_holes() {
        let mut agg = StatisticsAggregator::new("default");
        agg.add_records(
            "default",
            &[
                record("guava", "A.java", vec![attempt(true, 10, 1), attempt(true, 10, 1)]),
                record("guava", "B.java", vec![attempt(false, 10, 1)]),
            ],
        );
        agg.add_records(
            "PS",
            &[
                record("guava", "A.java", vec![attempt(true, 4, 1), attempt(false, 4, 1), attempt(true, 1, 1)]),
                record("guava", "B.java", vec![attempt(true, 50, 1)]),
                record("error-prone", "C.java", vec![attempt(true, 2, 1)]),
            ],
        );

        let report = agg.summarize().unwrap();
        let ps = &report["PS"];
        assert_eq!(ps.better, 2);
        assert_eq!(ps.worse, 1);
        assert_eq!(ps.same, 0);
        assert_eq!(ps.better + ps.worse + ps.same, 3);
        assert_eq!(ps.total_holes, 5);
        assert_eq!(ps.total_resolved_holes, 4);
        assert_eq!(ps.holes_by_project["guava"], 4);
        assert_eq!(ps.holes_by_project["error-prone"], 1);
        assert_eq!(ps.max_k_by_project["guava"], 50);
        assert_eq!(ps.total_k_by_project["error-prone"], 2);
    }

    #[test]
    fn test_error_attempt_counts_zero_time_and_unresolved() {
        let mut agg = StatisticsAggregator::new("default");
        let errored = SynthesisAttempt {
            depth: None,
            steps: None,
            found: true,
            time: Some(500),
            error: true,
        };
        let rec = record("guava", "A.java", vec![errored]);
        let key = (rec.scenario.key(), 0);
        agg.add_records("default", &[rec]);

        let outcome = agg.outcome(&key, "default").unwrap();
        assert!(!outcome.found);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.time, 0);
    }

    #[test]
    fn test_unknown_project_fallback() {
        let mut agg = StatisticsAggregator::new("default");
        let mut rec = record("guava", "A.java", vec![attempt(true, 1, 1)]);
        rec.scenario.left = "/elsewhere/A.java".into();
        agg.add_records("default", &[rec]);
        let report = agg.summarize().unwrap();
        assert_eq!(report["default"].holes_by_project[UNKNOWN_PROJECT], 1);
    }

    #[test]
    fn test_unknown_baseline_is_an_error() {
        let mut agg = StatisticsAggregator::new("default");
        agg.add_records("PS", &[]);
        assert!(matches!(agg.summarize(), Err(ReportError::UnknownBaseline(_))));
    }

    #[test]
    fn test_configuration_without_records_still_reported() {
        let mut agg = StatisticsAggregator::new("default");
        agg.add_records("default", &[record("guava", "A.java", vec![attempt(true, 1, 1)])]);
        agg.add_records("PS", &[]);
        let report = agg.summarize().unwrap();
        assert_eq!(report["PS"], ConfigSummary::default());
        assert_eq!(agg.labels(), &["default".to_string(), "PS".to_string()]);
    }
}
