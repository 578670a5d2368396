//! Asynchronous invocation of the external merge tool.
//!
//! Each scenario entry is handed to the tool once per configuration. The
//! tool's stdout and stderr are appended to `<outputs>/<label>.log`, which is
//! later read back by the outcome parser.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::{MineConfig, ToolConfiguration};
use crate::errors::RunnerError;
use crate::models::ScenarioEntry;

/// Placeholder in `tool.args` replaced by the expected file path.
pub const EXPECTED_PLACEHOLDER: &str = "{expected}";

/// Appended to the execution log when an invocation is killed.
pub const TIMEOUT_MARKER: &str = "Timeout!";

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(Option<i32>),
    TimedOut,
}

/// Counters over one configuration's batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
}

#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    root: PathBuf,
    timeout: Duration,
}

impl ToolRunner {
    /// `root` anchors the relative paths of scenario entries.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            root: root.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MineConfig) -> Self {
        Self::new(
            config.tool.program.clone(),
            config.tool.args.clone(),
            config.tool_working_dir(),
            config.paths.root.clone(),
            Duration::from_secs(config.tool.timeout_secs),
        )
    }

    /// Full argument list for one invocation: configured args, then the
    /// configuration's options, then `left [base] right`.
    pub fn command_args(&self, options: &[String], entry: &ScenarioEntry) -> Vec<String> {
        let resolve = |rel: &str| self.root.join(rel).display().to_string();
        let expected = resolve(&entry.expected);

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(EXPECTED_PLACEHOLDER, &expected))
            .collect();
        args.extend(options.iter().cloned());
        args.push(resolve(&entry.left));
        if !entry.base.is_empty() {
            args.push(resolve(&entry.base));
        }
        args.push(resolve(&entry.right));
        args
    }

    /// Run the tool once, appending its output to `log`.
    #[instrument(skip(self, options, entry, log), fields(left = %entry.left))]
    pub async fn run_one(
        &self,
        options: &[String],
        entry: &ScenarioEntry,
        log: &Path,
    ) -> Result<RunStatus, RunnerError> {
        let stdout = open_log(log)?;
        let stderr = stdout.try_clone().map_err(|e| log_error(log, e))?;
        let args = self.command_args(options, entry);

        debug!(cmd = ?format!("{} {}", self.program, args.join(" ")), "running merge tool");
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(RunStatus::Exited(status.code())),
            Ok(Err(e)) => Err(log_error(log, e)),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "merge tool timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill merge tool");
                }
                append_line(log, TIMEOUT_MARKER)?;
                Ok(RunStatus::TimedOut)
            }
        }
    }

    /// Run every entry under one configuration. A non-zero exit is counted
    /// but does not stop the batch. `progress` is called before each entry.
    pub async fn run_configuration(
        &self,
        configuration: &ToolConfiguration,
        entries: &[ScenarioEntry],
        log: &Path,
        mut progress: impl FnMut(usize, &ScenarioEntry),
    ) -> Result<RunSummary, RunnerError> {
        info!(
            label = %configuration.label,
            options = ?configuration.options,
            entries = entries.len(),
            "running configuration"
        );

        let mut summary = RunSummary::default();
        for (i, entry) in entries.iter().enumerate() {
            progress(i, entry);
            match self.run_one(&configuration.options, entry, log).await? {
                RunStatus::Exited(Some(0)) => summary.completed += 1,
                RunStatus::Exited(code) => {
                    debug!(?code, left = %entry.left, "merge tool exited with failure");
                    summary.failed += 1;
                }
                RunStatus::TimedOut => summary.timed_out += 1,
            }
        }
        Ok(summary)
    }
}

fn log_error(log: &Path, source: std::io::Error) -> RunnerError {
    RunnerError::Log {
        path: log.display().to_string(),
        source,
    }
}

fn open_log(log: &Path) -> Result<std::fs::File, RunnerError> {
    if let Some(parent) = log.parent() {
        std::fs::create_dir_all(parent).map_err(|e| log_error(log, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .map_err(|e| log_error(log, e))
}

fn append_line(log: &Path, line: &str) -> Result<(), RunnerError> {
    use std::io::Write;
    let mut file = open_log(log)?;
    writeln!(file, "{}", line).map_err(|e| log_error(log, e))
}
