//! Scenario materialization: snapshot extraction and three-way pruning.
//!
//! Layout produced for each scenario:
//!
//! ```text
//! <commits_root>/<project>/<scenario-id>/{expected,base,left,right}/<relative-path>
//! ```

pub mod filter;
pub mod prune;
pub mod tree;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::errors::{GitError, MaterializeError};
use crate::models::{same_commit, short_hash, BaseRef, MergeScenario};

pub use filter::SourceFilter;
pub use prune::{plan_prune, PrunePlan, RoleRemovals};
pub use tree::{ArtifactSet, FileTree, Role};

/// Something that can write the full file tree of a commit into a directory.
pub trait SnapshotSource {
    fn export(&self, commit: &str, dst: &Path) -> Result<(), GitError>;
}

/// Why a scenario was not materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BaseEqualsLeft,
    BaseEqualsRight,
}

/// Result of materializing one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Skipped(SkipReason),
    Materialized {
        dir: PathBuf,
        changed: usize,
        unchanged: usize,
    },
}

/// Counters over a batch of scenarios.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub materialized: usize,
    pub skipped: usize,
    pub failed: usize,
    pub changed_files: usize,
    pub unchanged_files: usize,
}

/// Extracts and prunes the snapshots of one project's scenarios.
pub struct ScenarioMaterializer<'a, S: SnapshotSource + ?Sized> {
    source: &'a S,
    project_dir: PathBuf,
    filter: SourceFilter,
}

impl<'a, S: SnapshotSource + ?Sized> ScenarioMaterializer<'a, S> {
    /// `project_dir` is `<commits_root>/<project>`.
    pub fn new(source: &'a S, project_dir: impl Into<PathBuf>, source_extension: &str) -> Self {
        Self {
            source,
            project_dir: project_dir.into(),
            filter: SourceFilter::new(source_extension),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Materialize one scenario, or skip it when it is degenerate.
    #[instrument(skip(self, scenario), fields(scenario = %scenario.short_id()))]
    pub fn materialize(&self, scenario: &MergeScenario) -> Result<MaterializeOutcome, MaterializeError> {
        if let BaseRef::Present(base) = &scenario.base {
            if same_commit(base, &scenario.left) {
                info!("ignore: base commit = left commit");
                return Ok(MaterializeOutcome::Skipped(SkipReason::BaseEqualsLeft));
            }
            if same_commit(base, &scenario.right) {
                info!("ignore: base commit = right commit");
                return Ok(MaterializeOutcome::Skipped(SkipReason::BaseEqualsRight));
            }
        }

        let dir = self.project_dir.join(&scenario.id);
        if dir.exists() {
            debug!(path = %dir.display(), "clearing previous materialization");
            std::fs::remove_dir_all(&dir).map_err(|e| MaterializeError::io(&dir, e))?;
        }

        self.extract(Some(scenario.id.as_str()), Role::Expected, &dir)?;
        self.extract(scenario.base.present(), Role::Base, &dir)?;
        self.extract(Some(scenario.left.as_str()), Role::Left, &dir)?;
        self.extract(Some(scenario.right.as_str()), Role::Right, &dir)?;

        let set = ArtifactSet::load(&dir)?;
        let plan = plan_prune(&set);
        plan.apply(&dir)?;

        info!(
            changed = plan.changed,
            total = plan.changed + plan.unchanged,
            "pruned unchanged files"
        );
        Ok(MaterializeOutcome::Materialized {
            dir,
            changed: plan.changed,
            unchanged: plan.unchanged,
        })
    }

    /// Materialize every scenario, logging and counting per-scenario
    /// failures instead of aborting. `progress` is called before each one.
    pub fn materialize_all(
        &self,
        scenarios: &[MergeScenario],
        mut progress: impl FnMut(usize, &MergeScenario),
    ) -> MaterializeSummary {
        let mut summary = MaterializeSummary::default();
        for (i, scenario) in scenarios.iter().enumerate() {
            progress(i, scenario);
            match self.materialize(scenario) {
                Ok(MaterializeOutcome::Skipped(_)) => summary.skipped += 1,
                Ok(MaterializeOutcome::Materialized { changed, unchanged, .. }) => {
                    summary.materialized += 1;
                    summary.changed_files += changed;
                    summary.unchanged_files += unchanged;
                }
                Err(e) => {
                    warn!(scenario = %scenario.short_id(), error = %e, "materialization failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Export one role's snapshot and keep only source files. A missing
    /// commit or a failed export leaves the snapshot empty.
    fn extract(&self, commit: Option<&str>, role: Role, dir: &Path) -> Result<(), MaterializeError> {
        let dst = dir.join(role.dir_name());
        std::fs::create_dir_all(&dst).map_err(|e| MaterializeError::io(&dst, e))?;

        match commit.filter(|c| !c.is_empty()) {
            Some(commit) => {
                debug!(commit = short_hash(commit), role = %role, "checkout");
                if let Err(e) = self.source.export(commit, &dst) {
                    warn!(commit, role = %role, error = %e, "extraction failed, snapshot left empty");
                    std::fs::remove_dir_all(&dst).map_err(|e| MaterializeError::io(&dst, e))?;
                    return Ok(());
                }
            }
            None => {
                warn!(role = %role, "ignore empty commit");
            }
        }

        let kept = self.filter.apply(&dst)?;
        debug!(role = %role, kept, "filtered snapshot");
        Ok(())
    }
}
