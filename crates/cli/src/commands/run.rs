//! `mergemine run`: invoke the merge tool on every listed conflict file.

use anyhow::{Context, Result};

use mergemine_core::runner::ToolRunner;
use mergemine_core::{scenario_list, MineConfig};

use super::style;

pub async fn run_tool(config: &MineConfig, labels: &[String]) -> Result<()> {
    let selected = super::select_configurations(config, labels)?;

    let list_path = config.paths.scenario_list();
    let entries = scenario_list::load(&list_path)
        .with_context(|| format!("failed to load scenario list {}", list_path.display()))?;
    let runner = ToolRunner::from_config(config);

    for configuration in selected {
        let options = if configuration.options.is_empty() {
            "<default>".to_string()
        } else {
            configuration.options.join(" ")
        };
        println!("{}", style::header(&format!("[{}] options: {}", configuration.label, options)));

        let log = config.paths.config_artifact(&configuration.label, "log");
        let bar = style::progress(entries.len(), &configuration.label)?;
        let summary = runner
            .run_configuration(configuration, &entries, &log, |i, entry| {
                bar.set_position(i as u64);
                bar.set_message(entry.left.clone());
            })
            .await
            .with_context(|| format!("configuration '{}' failed", configuration.label))?;
        bar.finish_and_clear();

        println!(
            "{}",
            style::success(&format!(
                "{} completed, {} failed, {} timed out",
                summary.completed, summary.failed, summary.timed_out
            ))
        );
        println!("  {}", style::dim(&format!("log: {}", log.display())));
    }
    Ok(())
}
