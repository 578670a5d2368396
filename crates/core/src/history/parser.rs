//! Line-driven state machine over `git log` output.
//!
//! # Transition table
//!
//! | State            | Line                  | Next state / action                         |
//! |------------------|-----------------------|---------------------------------------------|
//! | any              | `commit <id>`         | `Seeking`; remember id, forget parents      |
//! | any              | `Merge: <p1> <p2> ..` | `HasParents`; capture parent ids            |
//! | any              | `Author: ..`          | unchanged                                   |
//! | `HasParents`     | `Date: ..`            | `ExpectMessage`                             |
//! | `ExpectMessage`  | blank                 | `ReadingMessage`                            |
//! | `ReadingMessage` | non-blank             | `MessageDone`; message = trimmed line       |
//! | `MessageDone`    | blank                 | finalize candidate, `Seeking`               |
//! | any other pair   |                       | unchanged                                   |
//!
//! Header lines are classified before the message line, so a message line
//! must be indented (as `git log` prints it) to be captured.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, warn};

use crate::errors::GitError;
use crate::models::{AbsentBase, BaseRef, MergeScenario};

/// Resolves the common ancestor of two commits.
pub trait AncestorLookup {
    /// `Ok(None)` when the commits share no history.
    fn merge_base(&self, left: &str, right: &str) -> Result<Option<String>, GitError>;
}

/// Position of the parser within one commit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Seeking,
    HasParents,
    ExpectMessage,
    ReadingMessage,
    MessageDone,
}

/// An anomaly found while scanning. None of them abort the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryDiagnostic {
    TooFewParents { commit: String, parents: Vec<String> },
    TooManyParents { commit: String, parents: Vec<String> },
    MissingBase { commit: String, left: String, right: String },
}

impl fmt::Display for HistoryDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewParents { commit, parents } => {
                write!(f, "{}: too few parents: {:?}", commit, parents)
            }
            Self::TooManyParents { commit, parents } => {
                write!(f, "{}: too many parents, keeping first two: {:?}", commit, parents)
            }
            Self::MissingBase { commit, left, right } => {
                write!(f, "{}: base commit missing for {} and {}", commit, left, right)
            }
        }
    }
}

/// Result of scanning one history.
#[derive(Debug, Clone, Default)]
pub struct HistoryScan {
    pub scenarios: Vec<MergeScenario>,
    pub diagnostics: Vec<HistoryDiagnostic>,
}

enum HistoryLine<'a> {
    Commit(&'a str),
    Merge(&'a str),
    Author,
    Date,
    Blank,
    Other(&'a str),
}

struct LinePatterns {
    commit: Regex,
    merge: Regex,
    author: Regex,
    date: Regex,
}

fn patterns() -> &'static LinePatterns {
    static PATTERNS: OnceLock<LinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinePatterns {
        commit: Regex::new(r"^commit (?P<id>[0-9a-fA-F]+)").expect("valid commit pattern"),
        merge: Regex::new(r"^Merge: (?P<parents>.*)$").expect("valid merge pattern"),
        author: Regex::new(r"^Author:").expect("valid author pattern"),
        date: Regex::new(r"^Date:").expect("valid date pattern"),
    })
}

fn classify(line: &str) -> HistoryLine<'_> {
    let p = patterns();
    if let Some(caps) = p.commit.captures(line) {
        if let Some(id) = caps.name("id") {
            return HistoryLine::Commit(id.as_str());
        }
    }
    if let Some(caps) = p.merge.captures(line) {
        if let Some(parents) = caps.name("parents") {
            return HistoryLine::Merge(parents.as_str());
        }
    }
    if p.author.is_match(line) {
        return HistoryLine::Author;
    }
    if p.date.is_match(line) {
        return HistoryLine::Date;
    }
    if line.is_empty() {
        return HistoryLine::Blank;
    }
    HistoryLine::Other(line)
}

/// Incremental history parser. Feed lines most-recent-first, then call
/// [`HistoryParser::finish`].
pub struct HistoryParser<'a, L: AncestorLookup + ?Sized> {
    lookup: &'a L,
    state: HistoryState,
    commit_id: String,
    parents: Vec<String>,
    message: String,
    scan: HistoryScan,
}

impl<'a, L: AncestorLookup + ?Sized> HistoryParser<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            state: HistoryState::Seeking,
            commit_id: String::new(),
            parents: Vec::new(),
            message: String::new(),
            scan: HistoryScan::default(),
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn feed_line(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match classify(line) {
            HistoryLine::Commit(id) => {
                self.commit_id = id.to_string();
                self.parents.clear();
                self.message.clear();
                self.state = HistoryState::Seeking;
            }
            HistoryLine::Merge(parents) => {
                self.parents = parents.split_whitespace().map(str::to_string).collect();
                self.state = HistoryState::HasParents;
            }
            HistoryLine::Author => {}
            HistoryLine::Date => {
                if self.state == HistoryState::HasParents {
                    self.state = HistoryState::ExpectMessage;
                }
            }
            HistoryLine::Blank => match self.state {
                HistoryState::ExpectMessage => self.state = HistoryState::ReadingMessage,
                HistoryState::MessageDone => {
                    self.finalize();
                    self.state = HistoryState::Seeking;
                }
                _ => {}
            },
            HistoryLine::Other(text) => {
                if self.state == HistoryState::ReadingMessage {
                    self.message = text.trim().to_string();
                    self.state = HistoryState::MessageDone;
                }
            }
        }
    }

    /// Finish the scan. A final entry whose message is not followed by a
    /// blank line (end of text) is still finalized.
    pub fn finish(mut self) -> HistoryScan {
        if self.state == HistoryState::MessageDone {
            self.finalize();
        }
        debug!(count = self.scan.scenarios.len(), "parsed merge scenarios");
        self.scan
    }

    fn finalize(&mut self) {
        let commit = self.commit_id.clone();
        let mut parents = std::mem::take(&mut self.parents);

        if parents.len() < 2 {
            let diag = HistoryDiagnostic::TooFewParents { commit, parents };
            warn!(%diag, "discarding merge candidate");
            self.scan.diagnostics.push(diag);
            return;
        }
        if parents.len() > 2 {
            let diag = HistoryDiagnostic::TooManyParents {
                commit: commit.clone(),
                parents: parents.clone(),
            };
            warn!(%diag, "truncating merge parents");
            self.scan.diagnostics.push(diag);
            parents.truncate(2);
        }

        let right = parents.pop().unwrap_or_default();
        let left = parents.pop().unwrap_or_default();

        let base = match self.lookup.merge_base(&left, &right) {
            Ok(Some(base)) if !base.is_empty() => BaseRef::Present(base),
            Ok(_) => {
                self.missing_base(&commit, &left, &right);
                BaseRef::Absent(AbsentBase::NoCommonAncestor)
            }
            Err(e) => {
                warn!(commit = %commit, error = %e, "merge-base lookup failed");
                self.missing_base(&commit, &left, &right);
                BaseRef::Absent(AbsentBase::NoCommonAncestor)
            }
        };

        self.scan.scenarios.push(MergeScenario {
            id: commit,
            message: std::mem::take(&mut self.message),
            base,
            left,
            right,
        });
    }

    fn missing_base(&mut self, commit: &str, left: &str, right: &str) {
        let diag = HistoryDiagnostic::MissingBase {
            commit: commit.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        };
        warn!(%diag, "recording scenario without base");
        self.scan.diagnostics.push(diag);
    }
}

/// Parse a whole history text.
pub fn parse_history<L: AncestorLookup + ?Sized>(text: &str, lookup: &L) -> HistoryScan {
    let mut parser = HistoryParser::new(lookup);
    for line in text.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}
