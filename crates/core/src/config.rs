//! TOML-based configuration for mergemine.
//!
//! Every directory the pipeline touches is derived from [`PathsConfig`] and
//! passed explicitly to the components; nothing relies on the process's
//! current working directory. Relative paths resolve against `paths.root`,
//! which itself resolves against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub mining: MiningConfig,

    pub tool: ToolConfig,

    pub stats: StatsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Directory layout of a mining workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Workspace root. Scenario-list paths are written relative to it.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding one cloned repository per project.
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,

    /// Output directory for materialized scenarios. Its last component must
    /// be `commits` so project names can be recovered from paths.
    #[serde(default = "default_commits_dir")]
    pub commits_dir: PathBuf,

    /// Logs, scenario list, records, and summary.
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_projects_dir() -> PathBuf {
    PathBuf::from("projects")
}
fn default_commits_dir() -> PathBuf {
    PathBuf::from("commits")
}
fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            projects_dir: default_projects_dir(),
            commits_dir: default_commits_dir(),
            outputs_dir: default_outputs_dir(),
        }
    }
}

impl PathsConfig {
    pub fn projects(&self) -> PathBuf {
        self.root.join(&self.projects_dir)
    }

    pub fn commits(&self) -> PathBuf {
        self.root.join(&self.commits_dir)
    }

    pub fn outputs(&self) -> PathBuf {
        self.root.join(&self.outputs_dir)
    }

    /// `<outputs>/conflicts.json`
    pub fn scenario_list(&self) -> PathBuf {
        self.outputs().join("conflicts.json")
    }

    /// `<outputs>/summary.json`
    pub fn summary(&self) -> PathBuf {
        self.outputs().join("summary.json")
    }

    /// Per-configuration artifact path, e.g. `<outputs>/default.log`.
    pub fn config_artifact(&self, label: &str, suffix: &str) -> PathBuf {
        self.outputs().join(format!("{}.{}", label, suffix))
    }
}

// ---------------------------------------------------------------------------
// Mining
// ---------------------------------------------------------------------------

/// Scenario mining settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Source-file extension kept in snapshots, without the dot.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

fn default_source_extension() -> String {
    "java".into()
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// How to invoke the external merge-resolution tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable to spawn.
    pub program: String,

    /// Leading arguments. `{expected}` is replaced by the expected file path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory of the tool (relative to `paths.root`).
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Wall-clock budget per invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Tool configurations to run and compare.
    #[serde(default)]
    pub configurations: Vec<ToolConfiguration>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("bin")
}
fn default_timeout_secs() -> u64 {
    15 * 60
}

/// A labelled set of extra tool options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfiguration {
    pub label: String,
    #[serde(default)]
    pub options: Vec<String>,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Label of the configuration every other one is compared against.
    pub baseline: String,
    /// Configuration whose average k is shown beside the baseline's in the
    /// per-project table.
    #[serde(default)]
    pub comparison: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl MineConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// A relative `paths.root` is anchored at the config file's directory.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;

        if config.paths.root.is_relative() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            config.paths.root = dir.join(&config.paths.root);
        }

        debug!(root = %config.paths.root.display(), "configuration parsed successfully");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.mining.source_extension;
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::InvalidValue {
                field: "mining.source_extension".into(),
                detail: "extension must be non-empty and given without a leading dot".into(),
            });
        }
        if self.paths.commits_dir.file_name().and_then(|n| n.to_str()) != Some("commits") {
            return Err(ConfigError::InvalidValue {
                field: "paths.commits_dir".into(),
                detail: "last path component must be 'commits'".into(),
            });
        }
        if self.tool.program.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tool.program".into(),
                detail: "tool program must not be empty".into(),
            });
        }
        if self.tool.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tool.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.tool.configurations.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tool.configurations".into(),
                detail: "at least one configuration is required".into(),
            });
        }
        for (i, conf) in self.tool.configurations.iter().enumerate() {
            if conf.label.is_empty() || conf.label.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue {
                    field: format!("tool.configurations[{}].label", i),
                    detail: "label must be non-empty and usable as a file name".into(),
                });
            }
            if self.tool.configurations[..i].iter().any(|c| c.label == conf.label) {
                return Err(ConfigError::InvalidValue {
                    field: format!("tool.configurations[{}].label", i),
                    detail: format!("duplicate label '{}'", conf.label),
                });
            }
        }
        if !self.labels().any(|l| l == self.stats.baseline) {
            return Err(ConfigError::InvalidValue {
                field: "stats.baseline".into(),
                detail: format!(
                    "baseline '{}' is not a configured tool configuration",
                    self.stats.baseline
                ),
            });
        }
        if let Some(comparison) = &self.stats.comparison {
            if !self.labels().any(|l| l == comparison) {
                return Err(ConfigError::InvalidValue {
                    field: "stats.comparison".into(),
                    detail: format!(
                        "comparison '{}' is not a configured tool configuration",
                        comparison
                    ),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration labels in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tool.configurations.iter().map(|c| c.label.as_str())
    }

    pub fn configuration(&self, label: &str) -> Option<&ToolConfiguration> {
        self.tool.configurations.iter().find(|c| c.label == label)
    }

    /// Tool working directory anchored at the workspace root.
    pub fn tool_working_dir(&self) -> PathBuf {
        self.paths.root.join(&self.tool.working_dir)
    }
}

/// Default configuration written by `mergemine init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# mergemine configuration

[paths]
root = "."
projects_dir = "projects"
commits_dir = "commits"
outputs_dir = "outputs"

[mining]
source_extension = "java"

[tool]
program = "java"
args = ["-jar", "AutoMerge.jar", "-e", "{expected}", "-o", "tmp.java", "-m", "structured", "-log", "info", "-f", "-S"]
working_dir = "bin"
timeout_secs = 900

[[tool.configurations]]
label = "default"
options = []

[[tool.configurations]]
label = "PS"
options = ["-PS"]

[stats]
baseline = "default"
comparison = "PS"

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.mining.source_extension, "java");
        assert_eq!(config.tool.timeout_secs, 900);
        assert_eq!(config.labels().collect::<Vec<_>>(), vec!["default", "PS"]);
        assert_eq!(config.stats.baseline, "default");
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = MineConfig::from_toml_str(
            r#"
[tool]
program = "java"
[[tool.configurations]]
label = "default"
[stats]
baseline = "default"
"#,
        )
        .unwrap();
        assert_eq!(config.paths.commits_dir, PathBuf::from("commits"));
        assert_eq!(config.tool.working_dir, PathBuf::from("bin"));
        assert_eq!(config.tool.timeout_secs, 900);
        assert_eq!(config.logging.level, "info");
        assert!(config.tool.configurations[0].options.is_empty());
    }

    #[test]
    fn test_load_from_file_anchors_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergemine.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(DEFAULT_CONFIG_TOML.as_bytes()).unwrap();

        let config = MineConfig::load_and_validate(&path).unwrap();
        assert_eq!(config.paths.root, dir.path().join("."));
        assert_eq!(config.paths.commits(), dir.path().join(".").join("commits"));
        assert_eq!(
            config.paths.config_artifact("PS", "filtered.log"),
            dir.path().join(".").join("outputs").join("PS.filtered.log")
        );
    }

    #[test]
    fn test_file_not_found() {
        let result = MineConfig::load_from_file("/nonexistent/mergemine.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_baseline() {
        let mut config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        config.stats.baseline = "missing".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stats.baseline"));
    }

    #[test]
    fn test_comparison_is_optional_but_must_be_known() {
        let config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.stats.comparison.as_deref(), Some("PS"));

        let mut config = config;
        config.stats.comparison = None;
        assert!(config.validate().is_ok());

        config.stats.comparison = Some("missing".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stats.comparison"));
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let mut config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        config.tool.configurations[1].label = "default".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let mut config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        config.mining.source_extension = ".java".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_commits_dir() {
        let mut config = MineConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        config.paths.commits_dir = PathBuf::from("scenarios");
        assert!(config.validate().is_err());
    }
}
