//! Per-change correlation data binding a change to its patches and lineage.

use std::sync::Arc;

use super::history::FileHistory;
use super::hunk::DiffRange;
use super::patch::Patch;

/// Correlation data attached to a change.
///
/// `Commit` entries describe a change inside a single commit, `Cumulative`
/// entries describe a change of the whole review unit (merge base to head).
/// Both carry the file's lineage so that positions can be related across
/// the two views.
#[derive(Debug, Clone)]
pub enum DiffData {
    Commit {
        commit_sha: String,
        file_path: String,
        patch: Arc<Patch>,
        cumulative_patch: Arc<Patch>,
        history: Arc<dyn FileHistory>,
    },
    Cumulative {
        commit_sha: String,
        file_path: String,
        patch: Arc<Patch>,
        history: Arc<dyn FileHistory>,
    },
}

impl DiffData {
    pub fn commit_sha(&self) -> &str {
        match self {
            DiffData::Commit { commit_sha, .. } | DiffData::Cumulative { commit_sha, .. } => {
                commit_sha
            }
        }
    }

    pub fn file_path(&self) -> &str {
        match self {
            DiffData::Commit { file_path, .. } | DiffData::Cumulative { file_path, .. } => {
                file_path
            }
        }
    }

    /// The patch this entry describes: the commit's own patch, or the cumulative one.
    pub fn patch(&self) -> &Patch {
        match self {
            DiffData::Commit { patch, .. } | DiffData::Cumulative { patch, .. } => patch,
        }
    }

    /// The merge base to commit patch of the same file.
    pub fn cumulative_patch(&self) -> &Patch {
        match self {
            DiffData::Commit {
                cumulative_patch, ..
            } => cumulative_patch,
            DiffData::Cumulative { patch, .. } => patch,
        }
    }

    pub fn history(&self) -> &dyn FileHistory {
        match self {
            DiffData::Commit { history, .. } | DiffData::Cumulative { history, .. } => {
                history.as_ref()
            }
        }
    }

    pub fn is_cumulative(&self) -> bool {
        matches!(self, DiffData::Cumulative { .. })
    }

    /// Returns true if `file_path` at `commit_sha` belongs to this file's lineage.
    pub fn contains(&self, commit_sha: &str, file_path: &str) -> bool {
        self.history().contains(commit_sha, file_path)
    }

    /// Changed line ranges of the described patch.
    pub fn diff_ranges(&self) -> Vec<DiffRange> {
        self.patch().diff_ranges()
    }

    /// Carries a line of the file as of `from_commit` to this entry's commit.
    pub fn map_line_from(&self, from_commit: &str, line: u32) -> Option<u32> {
        self.history()
            .map_line(from_commit, self.commit_sha(), line)
    }
}
