//! Local Git repository operations via `git2`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, ObjectType, Oid, Repository, Sort, TreeWalkMode, TreeWalkResult};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;
use crate::history::AncestorLookup;
use crate::materialize::SnapshotSource;

/// High-level Git client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self { repo, repo_path: path.to_path_buf() })
    }

    pub fn repo_path(&self) -> &Path { &self.repo_path }
    pub fn repo(&self) -> &Repository { &self.repo }

    /// Resolve a full or abbreviated commit id.
    pub fn resolve_commit(&self, id: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(id)
            .map_err(|_| GitError::RefNotFound(id.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::RefNotFound(id.to_string()))?;
        Ok(commit.id())
    }

    /// Render the history reachable from HEAD in `git log` default format,
    /// newest first. Merge commits carry a `Merge:` line with abbreviated
    /// parent ids.
    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    pub fn history_text(&self) -> Result<String, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut out = String::new();
        let mut count = 0usize;
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            if count > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "commit {}", oid);

            if commit.parent_count() > 1 {
                let mut shorts = Vec::with_capacity(commit.parent_count());
                for parent in commit.parents() {
                    let short = parent.as_object().short_id()?;
                    shorts.push(short.as_str().unwrap_or_default().to_string());
                }
                let _ = writeln!(out, "Merge: {}", shorts.join(" "));
            }

            let author = commit.author();
            let _ = writeln!(
                out,
                "Author: {} <{}>",
                author.name().unwrap_or(""),
                author.email().unwrap_or("")
            );
            let _ = writeln!(out, "Date:   {}", format_git_date(author.when()));
            out.push('\n');
            for line in commit.message().unwrap_or("").trim_end().lines() {
                let line = line.trim_end();
                if line.is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "    {}", line);
                }
            }
            count += 1;
        }
        debug!(count, "rendered history");
        Ok(out)
    }

    /// Write every regular file of `commit`'s tree below `dst`.
    #[instrument(skip(self), fields(dst = %dst.display()))]
    pub fn export_commit(&self, commit: &str, dst: &Path) -> Result<usize, GitError> {
        let oid = self.resolve_commit(commit)?;
        let tree = self.repo.find_commit(oid)?.tree()?;

        let mut blobs: Vec<(PathBuf, Oid)> = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            let is_regular_file = matches!(entry.filemode(), 0o100644 | 0o100755);
            if entry.kind() == Some(ObjectType::Blob) && is_regular_file {
                if let Some(name) = entry.name() {
                    blobs.push((PathBuf::from(root).join(name), entry.id()));
                }
            } else if entry.kind() == Some(ObjectType::Commit) {
                debug!(root, name = entry.name().unwrap_or(""), "skipping submodule");
            }
            TreeWalkResult::Ok
        })?;

        std::fs::create_dir_all(dst)?;
        for (rel, blob_oid) in &blobs {
            let target = dst.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let blob = self.repo.find_blob(*blob_oid)?;
            std::fs::write(&target, blob.content())?;
        }
        debug!(files = blobs.len(), "exported commit tree");
        Ok(blobs.len())
    }
}

impl AncestorLookup for GitClient {
    fn merge_base(&self, left: &str, right: &str) -> Result<Option<String>, GitError> {
        let left_oid = self.resolve_commit(left)?;
        let right_oid = self.resolve_commit(right)?;
        match self.repo.merge_base(left_oid, right_oid) {
            Ok(base) => Ok(Some(base.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl SnapshotSource for GitClient {
    fn export(&self, commit: &str, dst: &Path) -> Result<(), GitError> {
        match self.export_commit(commit, dst) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(commit, error = %e, "snapshot export failed");
                Err(e)
            }
        }
    }
}

/// Format a signature time the way `git log` prints it, e.g.
/// `Mon Jan 6 10:00:00 2025 +0000`.
fn format_git_date(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    match DateTime::from_timestamp(time.seconds(), 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string(),
        None => time.seconds().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    fn commit_file(repo: &Repository, name: &str, content: &str, parents: &[Oid], msg: &str) -> Oid {
        let blob = repo.blob(content.as_bytes()).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert(name, blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::new("Test", "test@test.com", &git2::Time::new(1_736_157_600, 0)).unwrap();
        let parent_commits: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parent_refs: Vec<_> = parent_commits.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, msg, &tree, &parent_refs).unwrap()
    }

    #[test]
    fn test_repo_not_found() {
        assert!(matches!(GitClient::new("/nonexistent"), Err(GitError::RepositoryNotFound(_))));
    }

    #[test]
    fn test_history_text_format() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let root = commit_file(&repo, "A.java", "class A {}", &[], "initial\n\nbody line\n");
        let client = GitClient::new(dir.path()).unwrap();

        let text = client.history_text().unwrap();
        assert!(text.starts_with(&format!("commit {}\n", root)));
        assert!(text.contains("Author: Test <test@test.com>\n"));
        assert!(text.contains("Date:   Mon Jan 6 10:00:00 2025 +0000\n"));
        assert!(text.contains("\n    initial\n\n    body line\n"));
        assert!(!text.contains("Merge:"));
    }

    #[test]
    fn test_export_commit_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let oid = commit_file(&repo, "A.java", "class A {}", &[], "initial");
        let client = GitClient::new(dir.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let n = client.export_commit(&oid.to_string()[..7], out.path()).unwrap();
        assert_eq!(n, 1);
        assert_eq!(std::fs::read_to_string(out.path().join("A.java")).unwrap(), "class A {}");
    }

    #[test]
    fn test_resolve_unknown_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "A.java", "class A {}", &[], "initial");
        let client = GitClient::new(dir.path()).unwrap();
        assert!(matches!(client.resolve_commit("deadbeef"), Err(GitError::RefNotFound(_))));
    }
}
