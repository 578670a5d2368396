//! The scenario list: one entry per conflicting source file of every
//! materialized scenario, handed to the tool runner.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::PathsConfig;
use crate::errors::ReportError;
use crate::materialize::Role;
use crate::models::ScenarioEntry;
use crate::stats::report::{read_json, write_json};

/// Collect entries for every scenario under `<commits>/<project>/<id>/left`.
///
/// Projects and scenarios are visited in name order. A scenario without a
/// `left` snapshot contributes nothing.
pub fn collect_entries(paths: &PathsConfig) -> Result<Vec<ScenarioEntry>, ReportError> {
    let commits = paths.commits();
    let mut entries = Vec::new();

    for project_dir in sorted_subdirs(&commits)? {
        let project = file_name(&project_dir);
        for scenario_dir in sorted_subdirs(&project_dir)? {
            let before = entries.len();
            collect_scenario(paths, &project, &scenario_dir, &mut entries)?;
            debug!(
                project = %project,
                scenario = %file_name(&scenario_dir),
                files = entries.len() - before,
                "collected scenario files"
            );
        }
    }

    info!(entries = entries.len(), "scenario list collected");
    Ok(entries)
}

fn collect_scenario(
    paths: &PathsConfig,
    project: &str,
    scenario_dir: &Path,
    entries: &mut Vec<ScenarioEntry>,
) -> Result<(), ReportError> {
    let left_root = scenario_dir.join(Role::Left.dir_name());
    let mut files = Vec::new();
    walk_files(&left_root, &left_root, &mut files)?;
    files.sort();

    for rel in files {
        let at = |role: Role| scenario_dir.join(role.dir_name()).join(&rel);
        let base = at(Role::Base);
        let right = at(Role::Right);
        if !right.is_file() {
            warn!(path = %right.display(), "right file missing");
        }
        entries.push(ScenarioEntry {
            project: project.to_string(),
            base: if base.is_file() {
                relative(&paths.root, &base)
            } else {
                String::new()
            },
            left: relative(&paths.root, &at(Role::Left)),
            right: relative(&paths.root, &right),
            expected: relative(&paths.root, &at(Role::Expected)),
        });
    }
    Ok(())
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ReportError::io(dir, e))? {
        let path = entry.map_err(|e| ReportError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn walk_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ReportError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir).map_err(|e| ReportError::io(dir, e))? {
        let path = entry.map_err(|e| ReportError::io(dir, e))?.path();
        if path.is_dir() {
            walk_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `path` relative to `root` with `/` separators; absolute when outside it.
fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn save(path: &Path, entries: &[ScenarioEntry]) -> Result<(), ReportError> {
    write_json(path, entries)?;
    info!(path = %path.display(), entries = entries.len(), "saved scenario list");
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<ScenarioEntry>, ReportError> {
    read_json(path)
}
