//! `mergemine list`: rebuild the scenario list from materialized scenarios.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use mergemine_core::{scenario_list, MineConfig};

use super::style;

pub fn run_list(config: &MineConfig) -> Result<()> {
    let entries = scenario_list::collect_entries(&config.paths)
        .context("failed to collect scenario list")?;
    let path = config.paths.scenario_list();
    scenario_list::save(&path, &entries).context("failed to write scenario list")?;

    let mut by_project: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for entry in &entries {
        let counts = by_project.entry(entry.project.as_str()).or_default();
        counts.0 += 1;
        if entry.base.is_empty() {
            counts.1 += 1;
        }
    }

    println!();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Project", "Conflict files", "Without base"]);
    for (project, (files, no_base)) in &by_project {
        table.add_row(vec![Cell::new(project), Cell::new(files), Cell::new(no_base)]);
    }
    println!("{}", table);
    println!();
    println!(
        "{}",
        style::success(&format!("{} conflict files written to {}", entries.len(), path.display()))
    );
    println!();
    Ok(())
}
