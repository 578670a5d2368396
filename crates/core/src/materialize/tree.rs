//! In-memory view of the four snapshot trees of one scenario.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::MaterializeError;

/// The four roles of a materialized scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Expected,
    Base,
    Left,
    Right,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Expected, Role::Base, Role::Left, Role::Right];

    /// Directory name under the scenario root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Expected => "expected",
            Self::Base => "base",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Files and directories of one snapshot, keyed by `/`-separated relative
/// path. The snapshot root itself is the directory `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl FileTree {
    /// An empty tree whose root directory exists.
    pub fn with_root() -> Self {
        let mut tree = Self::default();
        tree.dirs.insert(String::new());
        tree
    }

    /// Add a file, creating its parent directories (and the root).
    pub fn insert_file(&mut self, rel: &str, content: impl Into<Vec<u8>>) {
        let mut parent = rel;
        while let Some((dir, _)) = parent.rsplit_once('/') {
            self.dirs.insert(dir.to_string());
            parent = dir;
        }
        self.dirs.insert(String::new());
        self.files.insert(rel.to_string(), content.into());
    }

    /// Add an (empty) directory and its ancestors.
    pub fn insert_dir(&mut self, rel: &str) {
        let mut dir = rel;
        self.dirs.insert(dir.to_string());
        while let Some((parent, _)) = dir.rsplit_once('/') {
            self.dirs.insert(parent.to_string());
            dir = parent;
        }
        self.dirs.insert(String::new());
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn dirs(&self) -> &BTreeSet<String> {
        &self.dirs
    }

    pub fn file(&self, rel: &str) -> Option<&[u8]> {
        self.files.get(rel).map(Vec::as_slice)
    }

    pub fn has_dir(&self, rel: &str) -> bool {
        self.dirs.contains(rel)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    pub(crate) fn remove_file(&mut self, rel: &str) {
        self.files.remove(rel);
    }

    pub(crate) fn remove_dir(&mut self, rel: &str) {
        self.dirs.remove(rel);
    }

    /// Read a snapshot from disk. A missing root yields an empty tree.
    pub fn load(root: &Path) -> Result<Self, MaterializeError> {
        let mut tree = Self::default();
        if !root.is_dir() {
            return Ok(tree);
        }
        tree.dirs.insert(String::new());
        load_inner(root, "", &mut tree)?;
        Ok(tree)
    }
}

fn load_inner(dir: &Path, prefix: &str, tree: &mut FileTree) -> Result<(), MaterializeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MaterializeError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MaterializeError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if path.is_dir() {
            tree.dirs.insert(rel.clone());
            load_inner(&path, &rel, tree)?;
        } else if path.is_file() {
            let content = std::fs::read(&path).map_err(|e| MaterializeError::io(&path, e))?;
            tree.files.insert(rel, content);
        }
    }
    Ok(())
}

/// `true` if `path` lies strictly below directory `dir`.
pub(crate) fn is_under(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        !path.is_empty()
    } else {
        path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
    }
}

/// Join a `/`-separated relative path onto a filesystem root.
pub(crate) fn join_rel(root: &Path, rel: &str) -> PathBuf {
    rel.split('/').filter(|s| !s.is_empty()).fold(root.to_path_buf(), |p, s| p.join(s))
}

/// The four snapshot trees of one scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    pub expected: FileTree,
    pub base: FileTree,
    pub left: FileTree,
    pub right: FileTree,
}

impl ArtifactSet {
    pub fn get(&self, role: Role) -> &FileTree {
        match role {
            Role::Expected => &self.expected,
            Role::Base => &self.base,
            Role::Left => &self.left,
            Role::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut FileTree {
        match role {
            Role::Expected => &mut self.expected,
            Role::Base => &mut self.base,
            Role::Left => &mut self.left,
            Role::Right => &mut self.right,
        }
    }

    /// Load `<scenario_dir>/{expected,base,left,right}`.
    pub fn load(scenario_dir: &Path) -> Result<Self, MaterializeError> {
        let mut set = Self::default();
        for role in Role::ALL {
            *set.get_mut(role) = FileTree::load(&scenario_dir.join(role.dir_name()))?;
        }
        Ok(set)
    }
}
