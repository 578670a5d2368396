//! Pipeline subcommands.

pub mod depths;
pub mod list;
pub mod mine;
pub mod run;
pub mod stats;
pub mod style;

use anyhow::Result;

use mergemine_core::config::ToolConfiguration;
use mergemine_core::MineConfig;

/// The named configurations, or all of them when `labels` is empty.
pub fn select_configurations<'a>(
    config: &'a MineConfig,
    labels: &[String],
) -> Result<Vec<&'a ToolConfiguration>> {
    if labels.is_empty() {
        return Ok(config.tool.configurations.iter().collect());
    }
    labels
        .iter()
        .map(|label| {
            config
                .configuration(label)
                .ok_or_else(|| anyhow::anyhow!("unknown tool configuration '{}'", label))
        })
        .collect()
}
