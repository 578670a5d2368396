//! Domain model types used throughout mergemine.
//!
//! These types bridge the history miner, the snapshot materializer, the
//! tool-outcome parser, and the statistics aggregator.

use serde::{Deserialize, Serialize};

/// Length of an abbreviated commit id as printed by `git log` on merge lines.
pub const SHORT_HASH_LEN: usize = 7;

/// Directory marker preceding the project name in materialized scenario paths.
pub const COMMITS_MARKER: &str = "commits/";

// ---------------------------------------------------------------------------
// Base reference
// ---------------------------------------------------------------------------

/// Why a scenario has no usable base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AbsentBase {
    /// The merge-base lookup of the two parents returned nothing.
    NoCommonAncestor,
    /// The tool reported a base living in a scratch location (`/tmp...`),
    /// i.e. it synthesized an empty base for a two-way merge.
    ScratchPath,
    /// The tool log never printed a base line for the attempt.
    Unreported,
}

/// The base of a scenario: a commit id or path, or a tagged absence.
///
/// All absent forms render as the empty string in scenario keys and in the
/// scenario-list file, so two configurations that saw "no base" for different
/// reasons still correlate on the same hole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum BaseRef {
    Present(String),
    Absent(AbsentBase),
}

impl BaseRef {
    /// The textual form used in keys: the id/path, or `""` when absent.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present(s) => s,
            Self::Absent(_) => "",
        }
    }

    pub fn present(&self) -> Option<&str> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl Default for BaseRef {
    fn default() -> Self {
        Self::Absent(AbsentBase::Unreported)
    }
}

// ---------------------------------------------------------------------------
// Merge scenario (history side)
// ---------------------------------------------------------------------------

/// One historical merge: the merge commit, its common ancestor, and its two
/// parents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeScenario {
    /// The merge commit (the human-resolved expected result).
    pub id: String,
    /// First line of the commit message.
    pub message: String,
    pub base: BaseRef,
    /// First parent: the existing line of development.
    pub left: String,
    /// Second parent: the incoming change.
    pub right: String,
}

impl MergeScenario {
    /// `true` if the base is the same commit as one of the parents, i.e. the
    /// merge was fast-forward-like and carries no three-way information.
    pub fn is_degenerate(&self) -> bool {
        match &self.base {
            BaseRef::Present(base) => same_commit(base, &self.left) || same_commit(base, &self.right),
            BaseRef::Absent(_) => false,
        }
    }

    /// Abbreviated merge commit id, for logging.
    pub fn short_id(&self) -> &str {
        short_hash(&self.id)
    }
}

/// Truncate a commit id to [`SHORT_HASH_LEN`] characters.
pub fn short_hash(id: &str) -> &str {
    id.get(..SHORT_HASH_LEN).unwrap_or(id)
}

/// Compare two commit ids by their abbreviated form. Empty ids never match.
pub fn same_commit(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && short_hash(a) == short_hash(b)
}

// ---------------------------------------------------------------------------
// Tool outcome side
// ---------------------------------------------------------------------------

/// The artifact paths a merge attempt was run on, as printed by the tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioPaths {
    pub base: BaseRef,
    pub left: String,
    pub right: String,
    pub expected: String,
}

impl ScenarioPaths {
    /// Identity of the scenario across configurations:
    /// `base:left:right:expected`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.base.as_str(),
            self.left,
            self.right,
            self.expected
        )
    }
}

/// One attempted repair ("hole") within a merge attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthesisAttempt {
    pub depth: Option<u32>,
    pub steps: Option<u64>,
    pub found: bool,
    /// Milliseconds; absent when the attempt ended in an exception.
    pub time: Option<u64>,
    pub error: bool,
}

impl SynthesisAttempt {
    /// Resolved means an explicit success marker and no exception.
    pub fn is_resolved(&self) -> bool {
        self.found && !self.error
    }
}

/// One tool invocation on one scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeAttemptRecord {
    pub scenario: ScenarioPaths,
    pub error: bool,
    pub synthesis_attempts: Vec<SynthesisAttempt>,
}

/// Depth and node count of one synthesized tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AstSample {
    pub depth: u32,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Scenario list
// ---------------------------------------------------------------------------

/// One conflicting file of a materialized scenario, as handed to the tool.
///
/// Paths are relative to the workspace root; `base` is empty when the file
/// has no base counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioEntry {
    pub project: String,
    pub base: String,
    pub left: String,
    pub right: String,
    pub expected: String,
}

/// Derive the project name from a scenario path: the path segment following
/// the `commits/` marker.
pub fn project_from_path(path: &str) -> Option<&str> {
    let (_, rest) = path.split_once(COMMITS_MARKER)?;
    let project = rest.split('/').next()?;
    if project.is_empty() {
        None
    } else {
        Some(project)
    }
}
