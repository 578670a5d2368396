//! End-to-end tests for the mining pipeline on a real repository.
//!
//! A small history with one three-way merge is built with `git2` in a
//! temporary directory, then run through history rendering, scenario
//! parsing, materialization, scenario listing, log parsing, and aggregation.

use std::path::Path;

use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

use mergemine_core::config::PathsConfig;
use mergemine_core::git::GitClient;
use mergemine_core::history::parse_history;
use mergemine_core::materialize::{MaterializeOutcome, ScenarioMaterializer};
use mergemine_core::models::BaseRef;
use mergemine_core::outcome::parse_outcome_log;
use mergemine_core::scenario_list::collect_entries;
use mergemine_core::stats::StatisticsAggregator;

// ===========================================================================
// Helpers
// ===========================================================================

/// Commit `src/*` files plus root files. `update_head` moves HEAD.
fn commit(
    repo: &Repository,
    src: &[(&str, &str)],
    root: &[(&str, &str)],
    parents: &[Oid],
    msg: &str,
    time: i64,
    update_head: bool,
) -> Oid {
    let mut src_builder = repo.treebuilder(None).unwrap();
    for (name, content) in src {
        let blob = repo.blob(content.as_bytes()).unwrap();
        src_builder.insert(name, blob, 0o100644).unwrap();
    }
    let src_tree = src_builder.write().unwrap();

    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert("src", src_tree, 0o040000).unwrap();
    for (name, content) in root {
        let blob = repo.blob(content.as_bytes()).unwrap();
        builder.insert(name, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let sig = Signature::new("Dev", "dev@example.com", &git2::Time::new(time, 0)).unwrap();
    let parent_commits: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
    let parent_refs: Vec<_> = parent_commits.iter().collect();
    let head = if update_head { Some("HEAD") } else { None };
    repo.commit(head, &sig, &sig, msg, &tree, &parent_refs).unwrap()
}

struct Fixture {
    _dir: TempDir,
    repo_path: std::path::PathBuf,
    root: std::path::PathBuf,
    base: Oid,
    merge: Oid,
}

/// base -> left (HEAD), base -> right (detached), merge(left, right).
fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().join("projects/demo");
    let repo = Repository::init(&repo_path).unwrap();

    let base = commit(
        &repo,
        &[("A.java", "class A { int x; }"), ("U.java", "class U {}")],
        &[("pom.xml", "<project/>")],
        &[],
        "initial",
        1_736_157_600,
        true,
    );
    let left = commit(
        &repo,
        &[("A.java", "class A { int left; }"), ("U.java", "class U {}")],
        &[("pom.xml", "<project/>")],
        &[base],
        "left change",
        1_736_157_700,
        true,
    );
    let right = commit(
        &repo,
        &[("A.java", "class A { int right; }"), ("U.java", "class U {}")],
        &[("pom.xml", "<project version='2'/>")],
        &[base],
        "right change",
        1_736_157_800,
        false,
    );
    let merge = commit(
        &repo,
        &[("A.java", "class A { int left; int right; }"), ("U.java", "class U {}")],
        &[("pom.xml", "<project version='2'/>")],
        &[left, right],
        "Merge branch 'feature'",
        1_736_157_900,
        true,
    );

    let root = dir.path().to_path_buf();
    Fixture { _dir: dir, repo_path, root, base, merge }
}

fn paths(root: &Path) -> PathsConfig {
    PathsConfig {
        root: root.to_path_buf(),
        ..Default::default()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_history_yields_one_scenario() {
    let fx = fixture();
    let client = GitClient::new(&fx.repo_path).unwrap();

    let text = client.history_text().unwrap();
    assert!(text.contains("Merge: "));

    let scan = parse_history(&text, &client);
    assert!(scan.diagnostics.is_empty(), "{:?}", scan.diagnostics);
    assert_eq!(scan.scenarios.len(), 1);

    let scenario = &scan.scenarios[0];
    assert_eq!(scenario.id, fx.merge.to_string());
    assert_eq!(scenario.message, "Merge branch 'feature'");
    assert_eq!(scenario.base, BaseRef::Present(fx.base.to_string()));
    assert!(!scenario.is_degenerate());
}

#[test]
fn test_materialize_and_list() {
    let fx = fixture();
    let client = GitClient::new(&fx.repo_path).unwrap();
    let scan = parse_history(&client.history_text().unwrap(), &client);
    let paths = paths(&fx.root);

    let materializer = ScenarioMaterializer::new(&client, paths.commits().join("demo"), "java");
    let outcome = materializer.materialize(&scan.scenarios[0]).unwrap();
    let dir = match outcome {
        MaterializeOutcome::Materialized { dir, changed, unchanged } => {
            assert_eq!(changed, 1);
            assert_eq!(unchanged, 1);
            dir
        }
        other => panic!("unexpected outcome {:?}", other),
    };

    for role in ["expected", "base", "left", "right"] {
        assert!(dir.join(role).join("src/A.java").is_file(), "{role}");
        assert!(!dir.join(role).join("src/U.java").exists(), "{role}");
        assert!(!dir.join(role).join("pom.xml").exists(), "{role}");
    }
    assert_eq!(
        std::fs::read_to_string(dir.join("left/src/A.java")).unwrap(),
        "class A { int left; }"
    );

    let entries = collect_entries(&paths).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    let id = fx.merge.to_string();
    assert_eq!(entry.project, "demo");
    assert_eq!(entry.left, format!("commits/demo/{}/left/src/A.java", id));
    assert_eq!(entry.base, format!("commits/demo/{}/base/src/A.java", id));

    // Materializing twice gives the same tree.
    materializer.materialize(&scan.scenarios[0]).unwrap();
    assert_eq!(collect_entries(&paths).unwrap(), entries);
}

#[test]
fn test_logs_to_summary() {
    let fx = fixture();
    let client = GitClient::new(&fx.repo_path).unwrap();
    let scan = parse_history(&client.history_text().unwrap(), &client);
    let paths = paths(&fx.root);
    ScenarioMaterializer::new(&client, paths.commits().join("demo"), "java")
        .materialize(&scan.scenarios[0])
        .unwrap();
    let entry = collect_entries(&paths).unwrap().remove(0);

    let header = format!(
        "INFO: Merging:\nLeft: {}\nBase: {}\nRight: {}\nINFO: Expected: {}\n",
        entry.left, entry.base, entry.right, entry.expected
    );
    let default_log = format!(
        "{header}INFO: Synthesis: Expected: x\nINFO: Synthesis: Searched total steps: 30\n\
         SUCCESS: Synthesis: FOUND\nINFO: Synthesis time: 12 ms\n"
    );
    let ps_log = format!(
        "{header}INFO: Synthesis: Expected: x\nINFO: Synthesis: Searched total steps: 8\n\
         SUCCESS: Synthesis: FOUND\nINFO: Synthesis time: 4 ms\n"
    );

    let mut agg = StatisticsAggregator::new("default");
    agg.add_records("default", &parse_outcome_log(&default_log).records);
    agg.add_records("PS", &parse_outcome_log(&ps_log).records);
    let report = agg.summarize().unwrap();

    let ps = &report["PS"];
    assert_eq!((ps.better, ps.worse, ps.same), (1, 0, 0));
    assert_eq!(ps.holes_by_project["demo"], 1);
    assert_eq!(report["default"].total_k, 30);
}
