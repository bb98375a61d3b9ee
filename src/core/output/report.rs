//! Serializable summary of a built change model.
//!
//! The report is what the CLI prints: every commit's changes with the
//! cumulative change each one belongs to, followed by the cumulative changes
//! themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::changes::{Change, ChangeType, ChangesProvider};

/// One file change, flattened to paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub status: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl From<&Change> for ChangeSummary {
    fn from(change: &Change) -> Self {
        Self {
            status: change.change_type(),
            before: change.before().map(|revision| revision.path.clone()),
            after: change.after().map(|revision| revision.path.clone()),
        }
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = self.status.status_letter();
        match (&self.before, &self.after) {
            (Some(before), Some(after)) if before != after => {
                write!(f, "{} {} -> {}", letter, before, after)
            }
            (_, Some(path)) | (Some(path), None) => write!(f, "{} {}", letter, path),
            (None, None) => write!(f, "{}", letter),
        }
    }
}

/// A commit change and the cumulative change its file lineage leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitChangeEntry {
    #[serde(flatten)]
    pub change: ChangeSummary,
    /// `None` when the file cannot be related to any cumulative change.
    pub cumulative: Option<ChangeSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub sha: String,
    pub parents: Vec<String>,
    pub changes: Vec<CommitChangeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeEntry {
    #[serde(flatten)]
    pub change: ChangeSummary,
    /// Whether diff data (and so a file lineage) is bound to the change.
    pub bound: bool,
}

/// The rendered view of a [`ChangesProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesReport {
    pub merge_base: String,
    pub head: String,
    pub linear_history: bool,
    pub commits: Vec<CommitEntry>,
    pub cumulative_changes: Vec<CumulativeEntry>,
}

impl ChangesReport {
    pub fn from_provider(provider: &ChangesProvider) -> Self {
        let commits = provider
            .commits()
            .map(|commit| {
                let changes = provider
                    .commit_changes(commit.sha())
                    .unwrap_or_default()
                    .iter()
                    .map(|change| CommitChangeEntry {
                        change: ChangeSummary::from(change),
                        cumulative: change
                            .file_path()
                            .and_then(|path| provider.find_cumulative_change(commit.sha(), path))
                            .map(ChangeSummary::from),
                    })
                    .collect();

                CommitEntry {
                    sha: commit.sha().to_string(),
                    parents: commit.parents().to_vec(),
                    changes,
                }
            })
            .collect();

        let cumulative_changes = provider
            .changes()
            .iter()
            .map(|change| CumulativeEntry {
                change: ChangeSummary::from(change),
                bound: provider.find_change_diff_data(change).is_some(),
            })
            .collect();

        Self {
            merge_base: provider.merge_base().to_string(),
            head: provider.head().to_string(),
            linear_history: provider.is_linear_history(),
            commits,
            cumulative_changes,
        }
    }

    /// Number of commit changes correlated to a cumulative change.
    pub fn correlated_count(&self) -> usize {
        self.commits
            .iter()
            .flat_map(|commit| &commit.changes)
            .filter(|entry| entry.cumulative.is_some())
            .count()
    }
}
