//! `mergemine mine`: extract merge scenarios from project histories.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::{info, warn};

use mergemine_core::git::GitClient;
use mergemine_core::history::parse_history;
use mergemine_core::materialize::{MaterializeSummary, ScenarioMaterializer};
use mergemine_core::models::short_hash;
use mergemine_core::{scenario_list, MineConfig};

use super::style;

struct ProjectResult {
    scenarios: usize,
    diagnostics: usize,
    summary: MaterializeSummary,
}

/// Mine every project in turn. A project that cannot be opened or read is
/// reported and skipped; the scenario list still covers the others.
pub fn run_mine(config: &MineConfig, projects: &[String], write_list: bool) -> Result<()> {
    let mut results = Vec::with_capacity(projects.len());
    for project in projects {
        let outcome = mine_project(config, project);
        if let Err(e) = &outcome {
            warn!(project = %project, error = %e, "project mining failed");
            println!("{}", style::warn(&format!("{}: {:#}", project, e)));
        }
        results.push((project.as_str(), outcome));
    }

    println!();
    println!("{}", style::header("Mined scenarios"));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Project",
        "Merges",
        "Diagnostics",
        "Materialized",
        "Skipped",
        "Failed",
        "Changed files",
    ]);
    for (project, outcome) in &results {
        match outcome {
            Ok(r) => table.add_row(vec![
                Cell::new(project),
                Cell::new(r.scenarios),
                Cell::new(r.diagnostics),
                Cell::new(r.summary.materialized),
                Cell::new(r.summary.skipped),
                Cell::new(r.summary.failed),
                Cell::new(r.summary.changed_files),
            ]),
            Err(_) => table.add_row(vec![
                Cell::new(project),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("project failed"),
                Cell::new("-"),
            ]),
        };
    }
    println!("{}", table);

    let failed = results.iter().filter(|(_, outcome)| outcome.is_err()).count();
    if failed == results.len() {
        anyhow::bail!("none of the {} projects could be mined", failed);
    }

    if write_list {
        let entries = scenario_list::collect_entries(&config.paths)
            .context("failed to collect scenario list")?;
        let path = config.paths.scenario_list();
        scenario_list::save(&path, &entries).context("failed to write scenario list")?;
        println!();
        println!(
            "{}",
            style::success(&format!("{} conflict files listed in {}", entries.len(), path.display()))
        );
    }
    if failed > 0 {
        println!("{}", style::warn(&format!("{} of {} projects failed", failed, results.len())));
    }
    println!();
    Ok(())
}

fn mine_project(config: &MineConfig, project: &str) -> Result<ProjectResult> {
    let repo_path = config.paths.projects().join(project);
    let client = GitClient::new(&repo_path)
        .with_context(|| format!("failed to open project '{}'", project))?;

    let text = client
        .history_text()
        .with_context(|| format!("failed to read history of '{}'", project))?;
    let scan = parse_history(&text, &client);
    info!(project, scenarios = scan.scenarios.len(), "collected merge scenarios");
    for diag in &scan.diagnostics {
        println!("{}", style::warn(&diag.to_string()));
    }

    let materializer = ScenarioMaterializer::new(
        &client,
        config.paths.commits().join(project),
        &config.mining.source_extension,
    );

    let bar = style::progress(scan.scenarios.len(), project)?;
    let summary = materializer.materialize_all(&scan.scenarios, |i, scenario| {
        bar.set_position(i as u64);
        bar.set_message(short_hash(&scenario.id).to_string());
    });
    bar.finish_and_clear();

    Ok(ProjectResult {
        scenarios: scan.scenarios.len(),
        diagnostics: scan.diagnostics.len(),
        summary,
    })
}
