use crate::enums::ObjectKind;
use crate::error::CoreError;
use crate::identifier::is_plain_identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One executable unit extracted from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// 1-based position of the statement within its script.
    pub index: usize,
    /// 1-based source line of the statement's first significant character.
    pub line: usize,
    /// Trimmed statement text, including its terminating `;` when present.
    pub text: String,
}

impl Statement {
    pub fn new(index: usize, line: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            line,
            text: text.into(),
        }
    }

    /// A single-line rendition of the statement, cut to `max_chars`.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.text, max_chars)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Collapses whitespace runs and truncates `text` to `max_chars`, appending
/// `...` when something was cut off.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// A single object to be dropped during teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownTarget {
    pub kind: ObjectKind,
    pub name: String,
}

impl TeardownTarget {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if !is_plain_identifier(&name) {
            return Err(CoreError::InvalidIdentifier(name));
        }
        Ok(Self { kind, name })
    }

    /// Builds the drop statement for this target.
    ///
    /// No `IF EXISTS` guard: a missing object must come back from the store as
    /// an error so teardown can report it as already absent.
    pub fn drop_statement(&self, cascade: bool) -> String {
        let mut sql = format!("DROP {} {}", self.kind.keyword(), self.name);
        if cascade {
            sql.push_str(" CASCADE");
        }
        sql
    }
}

impl fmt::Display for TeardownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// A dependency-ordered list of objects to drop: views before the tables they
/// read from, child tables before the parents they reference.
///
/// The order is taken verbatim from the caller and never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownPlan {
    targets: Vec<TeardownTarget>,
}

impl TeardownPlan {
    pub fn new(targets: Vec<TeardownTarget>) -> Result<Self, CoreError> {
        if targets.is_empty() {
            return Err(CoreError::EmptyTeardownPlan);
        }
        let mut seen = HashSet::new();
        for target in &targets {
            if !is_plain_identifier(&target.name) {
                return Err(CoreError::InvalidIdentifier(target.name.clone()));
            }
            if !seen.insert(target.name.to_ascii_lowercase()) {
                return Err(CoreError::DuplicateTeardownTarget(target.name.clone()));
            }
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[TeardownTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TeardownTarget> {
        self.targets.iter()
    }
}
