//! Hierarchical pass/warn/fail diagnostics
//!
//! A [`Diagnostics`] tree has one scope per stage and, below that, one scope
//! per element (set, file, type set). Scopes are shared behind `Arc` and
//! accept entries from many tasks at once; entries are append-only.
//! The tree renders as text at four verbosity levels and exports to JSON.

use std::error::Error as StdError;
use std::fmt::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Outcome class of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Completed without findings
    Pass,
    /// Completed with a non-fatal finding
    Warn,
    /// Did not complete
    Fail,
}

/// How much of the tree to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Tallies only
    Summary,
    /// Tallies and warnings
    #[default]
    Warnings,
    /// Tallies, warnings and failures
    Failures,
    /// Everything, including the causal chain of failures
    Trace,
}

/// One recorded outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Element the entry is about
    pub label: String,
    /// Outcome class
    pub status: Status,
    /// Message for warnings and failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Causal chain of a failure, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

/// Pass/warn/fail counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Passed entries
    pub pass: usize,
    /// Warned entries
    pub warn: usize,
    /// Failed entries
    pub fail: usize,
}

impl Tally {
    fn add(&mut self, status: Status) {
        match status {
            Status::Pass => self.pass += 1,
            Status::Warn => self.warn += 1,
            Status::Fail => self.fail += 1,
        }
    }

    fn merge(&mut self, other: Tally) {
        self.pass += other.pass;
        self.warn += other.warn;
        self.fail += other.fail;
    }

    /// Worst status present, `Pass` when empty
    pub fn status(&self) -> Status {
        if self.fail > 0 {
            Status::Fail
        } else if self.warn > 0 {
            Status::Warn
        } else {
            Status::Pass
        }
    }
}

/// A named node of the diagnostics tree
#[derive(Debug)]
pub struct Scope {
    name: String,
    entries: Mutex<Vec<Entry>>,
    children: Mutex<Vec<Arc<Scope>>>,
}

impl Scope {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a child scope
    pub fn scope(&self, name: impl Into<String>) -> Arc<Scope> {
        let child = Arc::new(Scope::new(name));
        self.children.lock().push(child.clone());
        child
    }

    /// Record a passing element
    pub fn pass(&self, label: impl Into<String>) {
        self.push(Entry {
            label: label.into(),
            status: Status::Pass,
            message: None,
            trace: Vec::new(),
        });
    }

    /// Record a non-fatal finding
    pub fn warn(&self, label: impl Into<String>, message: impl Into<String>) {
        self.push(Entry {
            label: label.into(),
            status: Status::Warn,
            message: Some(message.into()),
            trace: Vec::new(),
        });
    }

    /// Record a failure with its causal chain
    pub fn fail(&self, label: impl Into<String>, error: &(dyn StdError + 'static)) {
        let mut trace = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }
        self.push(Entry {
            label: label.into(),
            status: Status::Fail,
            message: Some(error.to_string()),
            trace,
        });
    }

    fn push(&self, entry: Entry) {
        self.entries.lock().push(entry);
    }

    /// Entries recorded directly in this scope
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    /// Child scopes in creation order
    pub fn children(&self) -> Vec<Arc<Scope>> {
        self.children.lock().clone()
    }

    /// Counts over this scope and every descendant
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for entry in self.entries.lock().iter() {
            tally.add(entry.status);
        }
        for child in self.children() {
            tally.merge(child.tally());
        }
        tally
    }

    /// Serializable snapshot of the subtree
    pub fn snapshot(&self) -> ScopeReport {
        ScopeReport {
            name: self.name.clone(),
            tally: self.tally(),
            entries: self.entries(),
            children: self.children().iter().map(|c| c.snapshot()).collect(),
        }
    }
}

/// Snapshot of a scope for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    /// Scope name
    pub name: String,
    /// Counts over the subtree
    pub tally: Tally,
    /// Entries of the scope itself
    pub entries: Vec<Entry>,
    /// Child scopes
    pub children: Vec<ScopeReport>,
}

/// Root of the diagnostics tree for one run
#[derive(Debug, Clone)]
pub struct Diagnostics {
    root: Arc<Scope>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new("templar")
    }
}

impl Diagnostics {
    /// Create an empty tree
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Arc::new(Scope::new(name)),
        }
    }

    /// Root scope
    pub fn root(&self) -> &Arc<Scope> {
        &self.root
    }

    /// Open a top-level scope
    pub fn scope(&self, name: impl Into<String>) -> Arc<Scope> {
        self.root.scope(name)
    }

    /// Counts over the whole tree
    pub fn tally(&self) -> Tally {
        self.root.tally()
    }

    /// Serializable snapshot of the whole tree
    pub fn snapshot(&self) -> ScopeReport {
        self.root.snapshot()
    }

    /// Export the tree as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Render the tree as indented text
    pub fn render(&self, verbosity: Verbosity) -> String {
        let mut out = String::new();
        render_scope(&mut out, &self.snapshot(), verbosity, 0);
        out
    }
}

fn render_scope(out: &mut String, scope: &ScopeReport, verbosity: Verbosity, depth: usize) {
    let pad = "  ".repeat(depth);
    let tally = scope.tally;
    let _ = writeln!(
        out,
        "{pad}{} [{}] pass: {}, warn: {}, fail: {}",
        scope.name,
        label(tally.status()),
        tally.pass,
        tally.warn,
        tally.fail
    );

    for entry in &scope.entries {
        let shown = match entry.status {
            Status::Pass => false,
            Status::Warn => verbosity >= Verbosity::Warnings,
            Status::Fail => verbosity >= Verbosity::Failures,
        };
        if !shown {
            continue;
        }
        let _ = writeln!(
            out,
            "{pad}  {} {}: {}",
            label(entry.status),
            entry.label,
            entry.message.as_deref().unwrap_or_default()
        );
        if verbosity >= Verbosity::Trace {
            for cause in &entry.trace {
                let _ = writeln!(out, "{pad}    caused by: {cause}");
            }
        }
    }

    for child in &scope.children {
        // Quiet subtrees collapse into their parent's tally.
        if verbosity == Verbosity::Summary && depth > 0 {
            continue;
        }
        render_scope(out, child, verbosity, depth + 1);
    }
}

fn label(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASS",
        Status::Warn => "WARN",
        Status::Fail => "FAIL",
    }
}
