//! Three-way pruning of unchanged content.
//!
//! Planning is a pure function over an [`ArtifactSet`]; applying the plan is
//! a separate step, either in memory ([`PrunePlan::apply_to`]) or on disk
//! ([`PrunePlan::apply`]).
//!
//! A base file is *unchanged* when the same path exists in both left and
//! right with byte-identical content. Unchanged files are removed from base,
//! left and right, and from expected when present there. Every directory of
//! the base snapshot is then visited deepest-first (the snapshot root last);
//! in each role, the directory is removed when nothing survives below it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::debug;

use super::tree::{is_under, join_rel, ArtifactSet, FileTree, Role};
use crate::errors::MaterializeError;

/// What to delete from one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRemovals {
    pub files: BTreeSet<String>,
    /// Deepest first; `""` is the role root.
    pub dirs: Vec<String>,
}

impl RoleRemovals {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

/// The deletion plan for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePlan {
    pub removals: BTreeMap<Role, RoleRemovals>,
    /// Base files kept because they differ (or are missing) somewhere.
    pub changed: usize,
    /// Base files removed because all three versions agree.
    pub unchanged: usize,
}

impl PrunePlan {
    pub fn is_empty(&self) -> bool {
        self.removals.values().all(RoleRemovals::is_empty)
    }

    pub fn for_role(&self, role: Role) -> Option<&RoleRemovals> {
        self.removals.get(&role)
    }

    /// Apply the plan to an in-memory set.
    pub fn apply_to(&self, set: &mut ArtifactSet) {
        for (role, removals) in &self.removals {
            let tree = set.get_mut(*role);
            for file in &removals.files {
                tree.remove_file(file);
            }
            for dir in &removals.dirs {
                tree.remove_dir(dir);
            }
        }
    }

    /// Apply the plan below `<scenario_dir>/<role>/`. Paths already gone are
    /// ignored.
    pub fn apply(&self, scenario_dir: &Path) -> Result<(), MaterializeError> {
        for (role, removals) in &self.removals {
            let root = scenario_dir.join(role.dir_name());
            for file in &removals.files {
                let path = join_rel(&root, file);
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(MaterializeError::io(&path, e)),
                }
            }
            for dir in &removals.dirs {
                let path = join_rel(&root, dir);
                match std::fs::remove_dir(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(MaterializeError::io(&path, e)),
                }
            }
            debug!(
                role = %role,
                files = removals.files.len(),
                dirs = removals.dirs.len(),
                "applied prune plan"
            );
        }
        Ok(())
    }
}

/// Compute the deletion plan for `set` without touching the filesystem.
pub fn plan_prune(set: &ArtifactSet) -> PrunePlan {
    let unchanged: BTreeSet<String> = set
        .base
        .files()
        .iter()
        .filter(|(path, content)| {
            set.left.file(path) == Some(content.as_slice())
                && set.right.file(path) == Some(content.as_slice())
        })
        .map(|(path, _)| path.clone())
        .collect();

    let mut visit: Vec<&String> = set.base.dirs().iter().collect();
    visit.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));

    let mut removals = BTreeMap::new();
    for role in Role::ALL {
        let tree = set.get(role);
        let files: BTreeSet<String> = unchanged
            .iter()
            .filter(|path| tree.file(path).is_some())
            .cloned()
            .collect();

        let mut pruned: BTreeSet<&str> = BTreeSet::new();
        let mut dirs = Vec::new();
        for dir in &visit {
            if tree.has_dir(dir) && empties(tree, dir, &files, &pruned) {
                pruned.insert(dir.as_str());
                dirs.push((*dir).clone());
            }
        }

        removals.insert(role, RoleRemovals { files, dirs });
    }

    PrunePlan {
        removals,
        changed: set.base.files().len() - unchanged.len(),
        unchanged: unchanged.len(),
    }
}

/// Depth of a directory; the root is shallowest.
fn depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.split('/').count()
    }
}

/// `true` if nothing would remain below `dir` once `removed` files and
/// `pruned` directories are gone.
fn empties(tree: &FileTree, dir: &str, removed: &BTreeSet<String>, pruned: &BTreeSet<&str>) -> bool {
    let file_survives = tree
        .files()
        .keys()
        .any(|f| is_under(f, dir) && !removed.contains(f));
    if file_survives {
        return false;
    }
    !tree
        .dirs()
        .iter()
        .any(|d| is_under(d, dir) && !pruned.contains(d.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(files: &[(&str, &str)]) -> FileTree {
        let mut t = FileTree::with_root();
        for (path, content) in files {
            t.insert_file(path, *content);
        }
        t
    }

    fn sample_set() -> ArtifactSet {
        ArtifactSet {
            expected: tree(&[
                ("same/Util.java", "u"),
                ("conf/Merge.java", "m-resolved"),
            ]),
            base: tree(&[
                ("same/Util.java", "u"),
                ("conf/Merge.java", "m0"),
                ("conf/Gone.java", "g"),
            ]),
            left: tree(&[
                ("same/Util.java", "u"),
                ("conf/Merge.java", "m-left"),
                ("conf/Gone.java", "g"),
                ("added/New.java", "n"),
            ]),
            right: tree(&[
                ("same/Util.java", "u"),
                ("conf/Merge.java", "m-right"),
            ]),
        }
    }

    #[test]
    fn test_unchanged_file_removed_everywhere() {
        let plan = plan_prune(&sample_set());
        for role in Role::ALL {
            let r = plan.for_role(role).unwrap();
            assert!(r.files.contains("same/Util.java"), "{role}");
            assert!(r.dirs.contains(&"same".to_string()), "{role}");
        }
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.changed, 2);
    }

    #[test]
    fn test_file_missing_on_one_side_is_changed() {
        let plan = plan_prune(&sample_set());
        let base = plan.for_role(Role::Base).unwrap();
        assert!(!base.files.contains("conf/Gone.java"));
        assert!(!base.files.contains("conf/Merge.java"));
        assert!(!base.dirs.contains(&"conf".to_string()));
        assert!(!base.dirs.contains(&String::new()));
    }

    #[test]
    fn test_dirs_only_in_other_roles_are_untouched() {
        let plan = plan_prune(&sample_set());
        let left = plan.for_role(Role::Left).unwrap();
        assert!(!left.dirs.contains(&"added".to_string()));
    }

    #[test]
    fn test_fully_unchanged_scenario_removes_roots() {
        let t = tree(&[("a/b/C.java", "c")]);
        let set = ArtifactSet {
            expected: t.clone(),
            base: t.clone(),
            left: t.clone(),
            right: t,
        };
        let plan = plan_prune(&set);
        for role in Role::ALL {
            assert_eq!(
                plan.for_role(role).unwrap().dirs,
                vec!["a/b".to_string(), "a".to_string(), String::new()]
            );
        }
        let mut pruned = set.clone();
        plan.apply_to(&mut pruned);
        for role in Role::ALL {
            assert!(pruned.get(role).is_empty());
        }
    }

    #[test]
    fn test_expected_keeps_its_own_extra_files() {
        let mut set = sample_set();
        set.expected.insert_file("same/Extra.java", "x");
        let plan = plan_prune(&set);
        let expected = plan.for_role(Role::Expected).unwrap();
        assert!(expected.files.contains("same/Util.java"));
        assert!(!expected.dirs.contains(&"same".to_string()));
    }

    #[test]
    fn test_unchanged_file_missing_from_expected() {
        let mut set = sample_set();
        set.expected.remove_file("same/Util.java");
        let plan = plan_prune(&set);

        let expected = plan.for_role(Role::Expected).unwrap();
        assert!(!expected.files.contains("same/Util.java"));
        for role in [Role::Base, Role::Left, Role::Right] {
            assert!(plan.for_role(role).unwrap().files.contains("same/Util.java"), "{role}");
        }
        assert_eq!(plan.unchanged, 1);

        let mut pruned = set.clone();
        plan.apply_to(&mut pruned);
        assert!(pruned.expected.file("conf/Merge.java").is_some());
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let mut set = sample_set();
        let first = plan_prune(&set);
        first.apply_to(&mut set);
        let snapshot = set.clone();

        let second = plan_prune(&set);
        assert!(second.is_empty());
        second.apply_to(&mut set);
        assert_eq!(set, snapshot);
    }

    #[test]
    fn test_remaining_base_paths_differ_or_are_absent() {
        let mut set = sample_set();
        plan_prune(&set).apply_to(&mut set);
        for (path, content) in set.base.files() {
            let same_left = set.left.file(path) == Some(content.as_slice());
            let same_right = set.right.file(path) == Some(content.as_slice());
            assert!(!(same_left && same_right), "{path} should have been pruned");
        }
    }

    #[test]
    fn test_empty_base_plans_nothing() {
        let set = ArtifactSet {
            expected: tree(&[("A.java", "a")]),
            base: FileTree::default(),
            left: tree(&[("A.java", "a")]),
            right: tree(&[("A.java", "a")]),
        };
        let plan = plan_prune(&set);
        assert!(plan.is_empty());
        assert_eq!(plan.changed + plan.unchanged, 0);
    }

    #[test]
    fn test_apply_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        for role in Role::ALL {
            let root = dir.path().join(role.dir_name());
            std::fs::create_dir_all(root.join("same")).unwrap();
            std::fs::write(root.join("same/Util.java"), "u").unwrap();
            std::fs::create_dir_all(root.join("conf")).unwrap();
            std::fs::write(root.join("conf/Merge.java"), role.dir_name()).unwrap();
        }

        let set = ArtifactSet::load(dir.path()).unwrap();
        let plan = plan_prune(&set);
        plan.apply(dir.path()).unwrap();

        for role in Role::ALL {
            let root = dir.path().join(role.dir_name());
            assert!(!root.join("same").exists());
            assert!(root.join("conf/Merge.java").exists());
        }
        assert_eq!(ArtifactSet::load(dir.path()).unwrap(), {
            let mut s = set;
            plan.apply_to(&mut s);
            s
        });
    }
}
