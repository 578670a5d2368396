//! mergemine command-line tool.
//!
//! Mines merge scenarios from project histories, runs the merge tool on the
//! resulting conflict files under several configurations, and summarizes
//! how each configuration fared against a baseline.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mergemine_core::config::DEFAULT_CONFIG_TOML;
use mergemine_core::MineConfig;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mergemine command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergemine",
    version,
    about = "Mine merge scenarios and evaluate a merge-resolution tool on them"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./mergemine.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and materialize merge scenarios of the given projects.
    Mine {
        /// Project directory names under `paths.projects_dir`.
        #[arg(required = true)]
        projects: Vec<String>,

        /// Do not rewrite the scenario list afterwards.
        #[arg(long)]
        no_list: bool,
    },

    /// Rebuild the scenario list from materialized scenarios.
    List,

    /// Run the merge tool on every listed conflict file.
    Run {
        /// Configuration labels to run (default: all).
        labels: Vec<String>,
    },

    /// Parse execution logs and write the summary report.
    Stats {
        /// Only aggregate these configurations; the first is the baseline.
        #[arg(long, num_args = 1..)]
        only: Vec<String>,

        /// Override the baseline configuration.
        #[arg(long)]
        baseline: Option<String>,
    },

    /// Show the depth distribution of synthesized trees.
    Depths {
        /// Configuration label (default: the baseline).
        label: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./mergemine.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_tracing("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_tracing("warn");
            cmd_validate(&cli.config)
        }
        command => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.logging.level);

            match command {
                Commands::Mine { projects, no_list } => {
                    commands::mine::run_mine(&config, &projects, !no_list)
                }
                Commands::List => commands::list::run_list(&config),
                Commands::Run { labels } => commands::run::run_tool(&config, &labels).await,
                Commands::Stats { only, baseline } => {
                    commands::stats::run_stats(&config, &only, baseline.as_deref())
                }
                Commands::Depths { label, json } => {
                    commands::depths::run_depths(&config, label.as_deref(), json)
                }
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<MineConfig> {
    MineConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration file {}", path.display()))
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG_TOML).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Clone the projects to mine under the projects directory");
    println!("  2. Put the merge tool in the tool working directory and adjust [tool]");
    println!(
        "  3. Validate with: mergemine validate --config {}",
        output.display()
    );
    println!(
        "  4. Mine scenarios: mergemine mine <project>... --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        MineConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => {
            println!("  [OK] All required fields are valid");
        }
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let labels: Vec<&str> = config.labels().collect();
    println!();
    println!("Configuration summary:");
    println!("  Workspace root : {}", config.paths.root.display());
    println!("  Projects       : {}", config.paths.projects().display());
    println!("  Scenarios      : {}", config.paths.commits().display());
    println!("  Outputs        : {}", config.paths.outputs().display());
    println!("  Source ext.    : .{}", config.mining.source_extension);
    println!("  Tool           : {} {}", config.tool.program, config.tool.args.join(" "));
    println!("  Tool directory : {}", config.tool_working_dir().display());
    println!("  Timeout        : {}s", config.tool.timeout_secs);
    println!("  Configurations : {}", labels.join(", "));
    println!("  Baseline       : {}", config.stats.baseline);
    println!();
    println!("Configuration is valid.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["mergemine", "mine", "guava", "error-prone"]).unwrap();
        match cli.command {
            Commands::Mine { projects, no_list } => {
                assert_eq!(projects, vec!["guava", "error-prone"]);
                assert!(!no_list);
            }
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::try_parse_from(["mergemine", "stats", "--only", "PS", "default"]).unwrap();
        match cli.command {
            Commands::Stats { only, baseline } => {
                assert_eq!(only, vec!["PS", "default"]);
                assert!(baseline.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from(["mergemine", "mine"]).is_err());
    }

    #[test]
    fn test_init_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergemine.toml");
        cmd_init(&path).unwrap();
        assert!(cmd_init(&path).is_err());
        cmd_validate(&path).unwrap();
    }
}
