//! File identity of a single change between two revisions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::patch::Patch;

/// A file at a specific revision: a commit sha or the merge base reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    pub path: String,
    pub reference: String,
}

impl Revision {
    pub fn new(path: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reference: reference.into(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.reference)
    }
}

/// The type of change made to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// File was added.
    Add,
    /// File was modified.
    Modify,
    /// File was deleted.
    Delete,
    /// File was renamed.
    Rename,
}

impl ChangeType {
    /// Single-letter status code, as printed by `git diff --name-status`.
    pub fn status_letter(self) -> char {
        match self {
            ChangeType::Add => 'A',
            ChangeType::Modify => 'M',
            ChangeType::Delete => 'D',
            ChangeType::Rename => 'R',
        }
    }
}

/// A change to one file, identified by its before and after revisions.
///
/// Equality and hashing cover both revisions, so two changes touching the same
/// path in different commits are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    before: Option<Revision>,
    after: Option<Revision>,
}

impl Change {
    pub fn new(before: Option<Revision>, after: Option<Revision>) -> Self {
        Self { before, after }
    }

    /// Builds the change a patch describes between two references.
    pub fn from_patch(before_ref: &str, after_ref: &str, patch: &Patch) -> Self {
        Self {
            before: patch
                .before_path()
                .map(|path| Revision::new(path, before_ref)),
            after: patch.after_path().map(|path| Revision::new(path, after_ref)),
        }
    }

    pub fn before(&self) -> Option<&Revision> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Revision> {
        self.after.as_ref()
    }

    /// The path of the file after the change, or before it for deletions.
    pub fn file_path(&self) -> Option<&str> {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(|revision| revision.path.as_str())
    }

    pub fn change_type(&self) -> ChangeType {
        match (&self.before, &self.after) {
            (None, _) => ChangeType::Add,
            (Some(_), None) => ChangeType::Delete,
            (Some(before), Some(after)) if before.path != after.path => ChangeType::Rename,
            (Some(_), Some(_)) => ChangeType::Modify,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) if before.path != after.path => {
                write!(f, "{} -> {}", before.path, after.path)
            }
            _ => write!(f, "{}", self.file_path().unwrap_or("<none>")),
        }
    }
}
