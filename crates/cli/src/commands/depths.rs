//! `mergemine depths`: depth distribution of synthesized trees.

use anyhow::{Context, Result};

use mergemine_core::models::AstSample;
use mergemine_core::stats::{depth_stats, read_json};
use mergemine_core::MineConfig;

use super::style;

pub fn run_depths(config: &MineConfig, label: Option<&str>, json: bool) -> Result<()> {
    let label = label.unwrap_or(&config.stats.baseline);
    let path = config.paths.config_artifact(label, "mergedASTData.json");
    let samples: Vec<AstSample> = read_json(&path)
        .with_context(|| format!("failed to read tree samples of '{}' (run `mergemine stats` first)", label))?;
    let stats = depth_stats(&samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("Tree depths ({}, {} samples)", label, stats.total)));
    println!();
    for t in &stats.distribution {
        println!("  Depth >= {}: {} ({:.2}%)", t.depth, t.count, t.percentage);
    }
    if let Some(s) = stats.max_by_depth {
        println!("  Max. by depth: depth = {}, size = {}", s.depth, s.size);
    }
    if let Some(s) = stats.max_by_size {
        println!("  Max. by size : depth = {}, size = {}", s.depth, s.size);
    }
    println!();
    Ok(())
}
