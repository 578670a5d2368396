//! `mergemine stats`: parse execution logs and compare configurations.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use mergemine_core::outcome::{parse_log_file, write_artifacts};
use mergemine_core::stats::{project_rows, write_json, ConfigSummary, StatisticsAggregator};
use mergemine_core::{scenario_list, MineConfig};

use super::style;

/// `baseline` defaults to the first `--only` label, then to `stats.baseline`.
pub fn run_stats(config: &MineConfig, only: &[String], baseline: Option<&str>) -> Result<()> {
    let selected = super::select_configurations(config, only)?;
    let baseline = baseline
        .or_else(|| only.first().map(String::as_str))
        .unwrap_or(&config.stats.baseline);

    let mut aggregator = StatisticsAggregator::new(baseline);
    for configuration in &selected {
        let label = &configuration.label;
        let log_path = config.paths.config_artifact(label, "log");
        let log = parse_log_file(&log_path)
            .with_context(|| format!("failed to read execution log of '{}'", label))?;
        write_artifacts(&config.paths, label, &log)
            .with_context(|| format!("failed to write outcome artifacts of '{}'", label))?;
        aggregator.add_records(label, &log.records);
    }

    let report = aggregator.summarize().context("failed to summarize configurations")?;
    let summary_path = config.paths.summary();
    write_json(&summary_path, &report).context("failed to write summary")?;

    println!();
    println!("{}", style::header(&format!("Comparison against '{}'", baseline)));
    println!();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Config", "Better", "Worse", "Same", "Holes", "Resolved", "Total k", "Max. k", "Time (ms)",
    ]);
    for configuration in &selected {
        if let Some(s) = report.get(&configuration.label) {
            table.add_row(vec![
                Cell::new(&configuration.label),
                Cell::new(s.better),
                Cell::new(s.worse),
                Cell::new(s.same),
                Cell::new(s.total_holes),
                Cell::new(s.total_resolved_holes),
                Cell::new(s.total_k),
                Cell::new(s.max_k),
                Cell::new(s.total_time),
            ]);
        }
    }
    println!("{}", table);

    let comparison = config
        .stats
        .comparison
        .as_deref()
        .filter(|label| *label != baseline)
        .and_then(|label| report.get(label).map(|summary| (label, summary)));
    if let Some(summary) = report.get(baseline) {
        print_projects(config, baseline, summary, comparison)?;
    }

    println!();
    println!("{}", style::success(&format!("Summary written to {}", summary_path.display())));
    println!();
    Ok(())
}

fn print_projects(
    config: &MineConfig,
    baseline: &str,
    summary: &ConfigSummary,
    comparison: Option<(&str, &ConfigSummary)>,
) -> Result<()> {
    let list_path = config.paths.scenario_list();
    if !list_path.exists() {
        println!();
        println!("{}", style::dim("no scenario list; per-project table skipped"));
        return Ok(());
    }
    let entries = scenario_list::load(&list_path).context("failed to load scenario list")?;

    println!();
    println!("{}", style::header(&format!("Projects ({})", baseline)));
    println!();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header: Vec<String> = [
        "Project", "Conflict files", "Holes", "Resolved", "Rate", "Max. k", "Avg. k",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    if let Some((label, _)) = comparison {
        header.push(format!("Avg. k ({})", label));
    }
    header.push("Time (ms)".to_string());
    table.set_header(header);

    for row in project_rows(summary, comparison.map(|(_, c)| c), &entries) {
        let mut cells = vec![
            Cell::new(&row.project),
            Cell::new(row.conflict_files),
            Cell::new(row.holes),
            Cell::new(row.resolved),
            Cell::new(format!("{:.2}", row.resolved_rate)),
            Cell::new(row.max_k),
            Cell::new(format!("{:.1}", row.avg_k)),
        ];
        if let Some(avg) = row.comparison_avg_k {
            cells.push(Cell::new(format!("{:.1}", avg)));
        }
        cells.push(Cell::new(format!("{:.1}", row.avg_time_ms)));
        table.add_row(cells);
    }
    println!("{}", table);
    Ok(())
}
