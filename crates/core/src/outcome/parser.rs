//! Line-driven parser for merge-tool execution logs.
//!
//! The log covers many merge invocations run back to back. Lines are
//! classified against a fixed vocabulary (see [`LineKind`]); anything not
//! recognized is preserved verbatim in a diagnostic stream. Lines must arrive
//! in the order the tool emitted them: no reordering or lookahead is done.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{AbsentBase, AstSample, BaseRef, MergeAttemptRecord, SynthesisAttempt};

/// Appended to the diagnostic stream after the lines captured for one
/// attempt.
pub const END_MARKER: &str = "---------------END---------------";

/// Informational lines dropped without trace.
const BOILERPLATE: [&str; 2] = [
    "Logging configuration file JDimeLogging.properties does not exist. Falling back to defaults.",
    "WARNING: JDime.properties can not be used as a config file as it does not exist.",
];

/// Base paths under this prefix are scratch files the tool created for a
/// two-way merge.
const SCRATCH_PREFIX: &str = "/tmp";

/// Everything extracted from one execution log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLog {
    pub records: Vec<MergeAttemptRecord>,
    pub samples: Vec<AstSample>,
    /// Unrecognized and noteworthy lines, with end markers between attempts.
    pub diagnostics: Vec<String>,
}

impl OutcomeLog {
    /// The diagnostic stream as text, one line per entry.
    pub fn diagnostics_text(&self) -> String {
        let mut text = String::new();
        for line in &self.diagnostics {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// Classification of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    MergingHeader,
    Left(&'a str),
    Right(&'a str),
    Base(&'a str),
    Expected(&'a str),
    MergeException,
    StructuralError,
    SynthesisStart,
    SearchedDepth(u32),
    SearchedSteps(u64),
    Found,
    NotFound,
    SynthesisTime(u64),
    SynthesisException,
    TreeSample(AstSample),
    Boilerplate,
    Other,
}

struct Patterns {
    timestamp: Regex,
    merging: Regex,
    left: Regex,
    right: Regex,
    base: Regex,
    expected: Regex,
    merge_exception: Regex,
    structural_error: Regex,
    synthesis_start: Regex,
    depth: Regex,
    steps: Regex,
    found: Regex,
    not_found: Regex,
    time: Regex,
    synthesis_exception: Regex,
    tree_sample: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid outcome log pattern");
        Patterns {
            timestamp: re(r"^\[[^\]]*\]\s*"),
            merging: re(r"^INFO: Merging:"),
            left: re(r"^Left: (?P<path>.*)$"),
            right: re(r"^Right: (?P<path>.*)$"),
            base: re(r"^Base: (?P<path>.*)$"),
            expected: re(r"^INFO: Expected:(?P<path>.*)$"),
            merge_exception: re(r"^SEVERE: Exception while merging"),
            structural_error: re(r"^The class"),
            synthesis_start: re(r"^INFO: Synthesis: Expected"),
            depth: re(r"^INFO: Synthesis: Searched depth: (?P<depth>\d+)\s*$"),
            steps: re(r"^INFO: Synthesis: Searched total steps: (?P<steps>\d+)\s*$"),
            found: re(r"^SUCCESS: Synthesis: FOUND"),
            not_found: re(r"^SEVERE: Synthesis: NOT FOUND"),
            time: re(r"^INFO: Synthesis time: (?P<time>\d+)"),
            synthesis_exception: re(r"^SEVERE: Exception while synthesizing"),
            tree_sample: re(
                r"^INFO: Synthesis: found a tree with depth = (?P<depth>\d+), size = (?P<size>\d+)",
            ),
        }
    })
}

/// Strip a leading bracketed timestamp such as `[12:00:01] `.
pub fn strip_timestamp(line: &str) -> &str {
    match patterns().timestamp.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

fn capture<'a>(re: &Regex, line: &'a str, name: &str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.name(name)).map(|m| m.as_str())
}

/// Classify one line (timestamp already stripped).
pub fn classify(line: &str) -> LineKind<'_> {
    let p = patterns();
    if p.merging.is_match(line) {
        return LineKind::MergingHeader;
    }
    if let Some(path) = capture(&p.left, line, "path") {
        return LineKind::Left(path.trim());
    }
    if let Some(path) = capture(&p.right, line, "path") {
        return LineKind::Right(path.trim());
    }
    if let Some(path) = capture(&p.base, line, "path") {
        return LineKind::Base(path.trim());
    }
    if let Some(path) = capture(&p.expected, line, "path") {
        return LineKind::Expected(path.trim());
    }
    if p.merge_exception.is_match(line) {
        return LineKind::MergeException;
    }
    if p.structural_error.is_match(line) {
        return LineKind::StructuralError;
    }
    if p.synthesis_start.is_match(line) {
        return LineKind::SynthesisStart;
    }
    if let Some(depth) = capture(&p.depth, line, "depth").and_then(|d| d.parse().ok()) {
        return LineKind::SearchedDepth(depth);
    }
    if let Some(steps) = capture(&p.steps, line, "steps").and_then(|s| s.parse().ok()) {
        return LineKind::SearchedSteps(steps);
    }
    if p.found.is_match(line) {
        return LineKind::Found;
    }
    if p.not_found.is_match(line) {
        return LineKind::NotFound;
    }
    if let Some(time) = capture(&p.time, line, "time").and_then(|t| t.parse().ok()) {
        return LineKind::SynthesisTime(time);
    }
    if p.synthesis_exception.is_match(line) {
        return LineKind::SynthesisException;
    }
    if let Some(caps) = p.tree_sample.captures(line) {
        let depth = caps.name("depth").and_then(|m| m.as_str().parse().ok());
        let size = caps.name("size").and_then(|m| m.as_str().parse().ok());
        if let (Some(depth), Some(size)) = (depth, size) {
            return LineKind::TreeSample(AstSample { depth, size });
        }
    }
    if BOILERPLATE.iter().any(|b| line.starts_with(b)) {
        return LineKind::Boilerplate;
    }
    LineKind::Other
}

/// Incremental execution-log parser.
#[derive(Debug, Default)]
pub struct OutcomeParser {
    current: Option<MergeAttemptRecord>,
    synthesis: Option<SynthesisAttempt>,
    /// Whether diagnostic lines were captured since the last header.
    captured: bool,
    log: OutcomeLog,
}

impl OutcomeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, raw: &str) {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let line = strip_timestamp(raw);

        match classify(line) {
            LineKind::MergingHeader => self.open_attempt(),
            LineKind::Left(path) => self.with_attempt(line, |r| r.scenario.left = path.to_string()),
            LineKind::Right(path) => self.with_attempt(line, |r| r.scenario.right = path.to_string()),
            LineKind::Base(path) => {
                let base = normalize_base(path);
                self.with_attempt(line, |r| r.scenario.base = base);
            }
            LineKind::Expected(path) => {
                self.with_attempt(line, |r| r.scenario.expected = path.to_string())
            }
            LineKind::MergeException | LineKind::StructuralError => {
                if let Some(record) = self.current.as_mut() {
                    record.error = true;
                }
                self.capture(line);
            }
            LineKind::SynthesisStart => {
                if self.synthesis.is_some() {
                    debug!("discarding synthesis attempt without time");
                }
                self.synthesis = Some(SynthesisAttempt::default());
                self.capture(line);
            }
            LineKind::SearchedDepth(depth) => {
                self.with_synthesis(line, |s| s.depth = Some(depth));
            }
            LineKind::SearchedSteps(steps) => {
                self.with_synthesis(line, |s| s.steps = Some(steps));
            }
            LineKind::Found => {
                self.with_synthesis(line, |s| s.found = true);
            }
            LineKind::NotFound => {
                if self.with_synthesis(line, |s| s.found = false) {
                    self.capture(line);
                }
            }
            LineKind::SynthesisTime(time) => {
                if self.with_synthesis(line, |s| s.time = Some(time)) {
                    self.push_synthesis(line);
                }
            }
            LineKind::SynthesisException => {
                if self.with_synthesis(line, |s| s.error = true) && self.push_synthesis(line) {
                    self.capture(line);
                }
            }
            LineKind::TreeSample(sample) => self.log.samples.push(sample),
            LineKind::Boilerplate => {}
            LineKind::Other => self.capture(line),
        }
    }

    /// Finalize the open attempt, if any, and return everything parsed.
    pub fn finish(mut self) -> OutcomeLog {
        self.close_attempt();
        debug!(
            records = self.log.records.len(),
            samples = self.log.samples.len(),
            diagnostics = self.log.diagnostics.len(),
            "parsed execution log"
        );
        self.log
    }

    fn open_attempt(&mut self) {
        if self.current.is_some() && self.captured {
            self.log.diagnostics.push(END_MARKER.to_string());
            self.log.diagnostics.push(String::new());
        }
        self.close_attempt();
        self.current = Some(MergeAttemptRecord::default());
        self.captured = false;
    }

    fn close_attempt(&mut self) {
        if self.synthesis.take().is_some() {
            debug!("discarding synthesis attempt without time");
        }
        if let Some(record) = self.current.take() {
            self.log.records.push(record);
        }
    }

    fn capture(&mut self, line: &str) {
        self.captured = true;
        self.log.diagnostics.push(line.to_string());
    }

    fn with_attempt(&mut self, line: &str, f: impl FnOnce(&mut MergeAttemptRecord)) {
        match self.current.as_mut() {
            Some(record) => f(record),
            None => {
                warn!(line, "attempt line before any merge header");
                self.capture(line);
            }
        }
    }

    /// Apply `f` to the open synthesis attempt. Without one, the line is
    /// kept as a diagnostic and `false` is returned.
    fn with_synthesis(&mut self, line: &str, f: impl FnOnce(&mut SynthesisAttempt)) -> bool {
        match self.synthesis.as_mut() {
            Some(synthesis) => {
                f(synthesis);
                true
            }
            None => {
                warn!(line, "synthesis line without an open synthesis attempt");
                self.capture(line);
                false
            }
        }
    }

    /// Store the open synthesis attempt on the current merge attempt.
    /// Returns `false` (after capturing `line`) when there is none to store it on.
    fn push_synthesis(&mut self, line: &str) -> bool {
        let Some(synthesis) = self.synthesis.take() else {
            return false;
        };
        match self.current.as_mut() {
            Some(record) => {
                record.synthesis_attempts.push(synthesis);
                true
            }
            None => {
                warn!(line, "synthesis attempt outside of any merge attempt");
                self.capture(line);
                false
            }
        }
    }
}

fn normalize_base(path: &str) -> BaseRef {
    if path.starts_with(SCRATCH_PREFIX) {
        BaseRef::Absent(AbsentBase::ScratchPath)
    } else if path.is_empty() {
        BaseRef::Absent(AbsentBase::Unreported)
    } else {
        BaseRef::Present(path.to_string())
    }
}

/// Parse a whole execution log.
pub fn parse_outcome_log(text: &str) -> OutcomeLog {
    let mut parser = OutcomeParser::new();
    for line in text.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}
