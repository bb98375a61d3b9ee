//! Builds the change model of a review unit and answers lookups against it.
//!
//! Construction runs once per review unit:
//!
//! 1. Commits reachable from the head are ordered parents-first and paired
//!    with their patches.
//! 2. The history is classified as linear (no commit has more than one
//!    parent inside the review unit) or as containing merges.
//! 3. The matching pass fills the per-commit change lists, the cumulative
//!    change list, and the [`DiffData`] index.
//!
//! Linear histories get rename tracking per commit; histories with merges
//! only bind cumulative changes, to lineages derived from the graph on demand.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use super::change::Change;
use super::commit::{CommitGraph, CommitPatches, CommitWithPatches};
use super::diff_data::DiffData;
use super::history::{GraphFileHistory, LinearFileHistory, LinearFileHistoryBuilder};
use super::patch::Patch;
use crate::error::ChangesError;

/// Returns true if no commit has more than one parent inside the review unit.
///
/// Parents outside the set (other branches merged in) are ignored.
pub fn is_linear_history(commits: &IndexMap<String, CommitWithPatches>) -> bool {
    commits.values().all(|commit| {
        commit
            .parents()
            .iter()
            .filter(|parent| commits.contains_key(*parent))
            .count()
            <= 1
    })
}

/// The immutable change model of a review unit.
#[derive(Debug)]
pub struct ChangesProvider {
    merge_base: String,
    head: String,
    linear_history: bool,
    commits: Arc<IndexMap<String, CommitWithPatches>>,
    changes: Vec<Change>,
    changes_by_commits: IndexMap<String, Vec<Change>>,
    diff_data_by_change: IndexMap<Change, DiffData>,
}

impl ChangesProvider {
    /// Builds the model from the commit graph and the patches of every commit.
    ///
    /// `patches` must hold an entry for every commit reachable from `head`.
    /// Contract violations abort construction; correlation misses only leave
    /// the affected change without diff data.
    #[instrument(skip_all, fields(merge_base = %merge_base, head = %head))]
    pub fn build(
        merge_base: &str,
        graph: &CommitGraph,
        head: &str,
        patches: &HashMap<String, CommitPatches>,
    ) -> Result<Self, ChangesError> {
        let commits = Arc::new(graph.with_patches(head, patches)?);
        let linear_history = is_linear_history(&commits);

        let mut builder = ModelBuilder::new(merge_base, head);
        if linear_history {
            builder.build_for_linear_history(&commits)?;
        } else {
            builder.build_for_history_with_merges(&commits)?;
        }

        let provider = builder.finish(linear_history, commits);
        info!(
            commits = provider.commits.len(),
            linear_history,
            changes = provider.changes.len(),
            bound = provider.diff_data_by_change.len(),
            "Built review unit changes"
        );
        Ok(provider)
    }

    pub fn merge_base(&self) -> &str {
        &self.merge_base
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    /// Whether the linear construction pass was used.
    pub fn is_linear_history(&self) -> bool {
        self.linear_history
    }

    /// Commits of the review unit, parents first, ending at the head.
    pub fn commits(&self) -> impl Iterator<Item = &CommitWithPatches> {
        self.commits.values()
    }

    /// Cumulative changes from the merge base to the head.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Changes of every commit, in commit order.
    pub fn changes_by_commits(&self) -> &IndexMap<String, Vec<Change>> {
        &self.changes_by_commits
    }

    pub fn commit_changes(&self, commit_sha: &str) -> Option<&[Change]> {
        self.changes_by_commits.get(commit_sha).map(Vec::as_slice)
    }

    /// Every bound change with its diff data, in binding order.
    pub fn diff_data(&self) -> impl Iterator<Item = (&Change, &DiffData)> {
        self.diff_data_by_change.iter()
    }

    /// Looks up the diff data bound to a change.
    pub fn find_change_diff_data(&self, change: &Change) -> Option<&DiffData> {
        self.diff_data_by_change.get(change)
    }

    /// Finds the cumulative change whose file lineage contains `file_path` at `commit_sha`.
    pub fn find_cumulative_change(&self, commit_sha: &str, file_path: &str) -> Option<&Change> {
        self.diff_data_by_change
            .iter()
            .find(|(_, data)| data.is_cumulative() && data.contains(commit_sha, file_path))
            .map(|(change, _)| change)
    }
}

/// A commit change waiting for its file history to be frozen.
struct PendingCommitDiff {
    change: Change,
    commit_sha: String,
    patch: Arc<Patch>,
    cumulative_patch: Arc<Patch>,
    tracker: usize,
}

/// Mutable state of a single construction pass.
struct ModelBuilder {
    merge_base: String,
    head: String,
    changes: Vec<Change>,
    changes_by_commits: IndexMap<String, Vec<Change>>,
    diff_data_by_change: IndexMap<Change, DiffData>,
}

impl ModelBuilder {
    fn new(merge_base: &str, head: &str) -> Self {
        Self {
            merge_base: merge_base.to_string(),
            head: head.to_string(),
            changes: Vec::new(),
            changes_by_commits: IndexMap::new(),
            diff_data_by_change: IndexMap::new(),
        }
    }

    fn head_commit<'a>(
        &self,
        commits: &'a IndexMap<String, CommitWithPatches>,
    ) -> Result<&'a CommitWithPatches, ChangesError> {
        commits
            .get(&self.head)
            .ok_or_else(|| ChangesError::HeadNotInGraph {
                sha: self.head.clone(),
            })
    }

    fn build_for_linear_history(
        &mut self,
        commits: &IndexMap<String, CommitWithPatches>,
    ) -> Result<(), ChangesError> {
        let ordered: Arc<[String]> = commits.keys().cloned().collect();
        let mut trackers: Vec<LinearFileHistoryBuilder> = Vec::new();
        let mut trackers_by_last_known_path: HashMap<String, usize> = HashMap::new();
        let mut pending = Vec::new();

        let mut previous_commit_sha = self.merge_base.clone();
        for commit in commits.values() {
            let commit_sha = commit.sha();
            let mut commit_changes = Vec::new();

            for patch in &commit.direct_patches {
                let change = Change::from_patch(&previous_commit_sha, commit_sha, patch);
                if !push_unique(&mut commit_changes, change.clone()) || !patch.is_text() {
                    continue;
                }

                let tracker = match patch
                    .before_path()
                    .and_then(|path| trackers_by_last_known_path.remove(path))
                {
                    Some(tracker) => tracker,
                    None => {
                        trackers.push(LinearFileHistoryBuilder::new(ordered.clone()));
                        trackers.len() - 1
                    }
                };
                trackers[tracker].append(commit_sha, patch.clone());

                let after_path = patch.after_path();
                if let Some(after_path) = after_path {
                    trackers_by_last_known_path.insert(after_path.to_string(), tracker);
                }

                let first_known_path = trackers[tracker].first_known_file_path();
                let Some(cumulative_patch) =
                    find_patch_by_file_paths(&commit.cumulative_patches, first_known_path, after_path)
                        .filter(|candidate| candidate.is_text())
                else {
                    debug!(
                        commit = %commit_sha,
                        file = %patch.file_path(),
                        "Unable to find cumulative patch for commit patch"
                    );
                    continue;
                };

                pending.push(PendingCommitDiff {
                    change,
                    commit_sha: commit_sha.to_string(),
                    patch: patch.clone(),
                    cumulative_patch: cumulative_patch.clone(),
                    tracker,
                });
            }

            self.changes_by_commits
                .insert(commit_sha.to_string(), commit_changes);
            previous_commit_sha = commit_sha.to_string();
        }

        let histories: Vec<Arc<LinearFileHistory>> = trackers
            .into_iter()
            .map(|tracker| Arc::new(tracker.build()))
            .collect();

        for entry in pending {
            let data = DiffData::Commit {
                commit_sha: entry.commit_sha,
                file_path: entry.patch.file_path().to_string(),
                patch: entry.patch,
                cumulative_patch: entry.cumulative_patch,
                history: histories[entry.tracker].clone(),
            };
            self.diff_data_by_change.insert(entry.change, data);
        }

        let histories_by_summary_path: HashMap<String, Arc<LinearFileHistory>> =
            trackers_by_last_known_path
                .values()
                .filter_map(|&tracker| {
                    let history = &histories[tracker];
                    history
                        .last_known_file_path()
                        .map(|path| (path.to_string(), history.clone()))
                })
                .collect();

        let head = self.head_commit(commits)?;
        for patch in &head.cumulative_patches {
            let change = Change::from_patch(&self.merge_base, &self.head, patch);
            if !push_unique(&mut self.changes, change.clone()) || !patch.is_text() {
                continue;
            }

            let file_path = patch.file_path();
            let Some(history) = histories_by_summary_path.get(file_path) else {
                debug!(
                    file = %file_path,
                    "Unable to find file history for cumulative patch"
                );
                continue;
            };

            self.diff_data_by_change.insert(
                change,
                DiffData::Cumulative {
                    commit_sha: self.head.clone(),
                    file_path: file_path.to_string(),
                    patch: patch.clone(),
                    history: history.clone(),
                },
            );
        }

        Ok(())
    }

    fn build_for_history_with_merges(
        &mut self,
        commits: &Arc<IndexMap<String, CommitWithPatches>>,
    ) -> Result<(), ChangesError> {
        for commit in commits.values() {
            let previous_commit_sha = commit
                .parents()
                .iter()
                .find(|parent| commits.contains_key(*parent))
                .unwrap_or(&self.merge_base);

            let mut commit_changes = Vec::new();
            for patch in &commit.direct_patches {
                push_unique(
                    &mut commit_changes,
                    Change::from_patch(previous_commit_sha, commit.sha(), patch),
                );
            }
            self.changes_by_commits
                .insert(commit.sha().to_string(), commit_changes);
        }

        let head = self.head_commit(commits)?;
        for patch in &head.cumulative_patches {
            let change = Change::from_patch(&self.merge_base, &self.head, patch);
            if !push_unique(&mut self.changes, change.clone()) || !patch.is_text() {
                continue;
            }

            let file_path = patch.file_path();
            let history = GraphFileHistory::new(commits.clone(), self.head.clone(), file_path);
            self.diff_data_by_change.insert(
                change,
                DiffData::Cumulative {
                    commit_sha: self.head.clone(),
                    file_path: file_path.to_string(),
                    patch: patch.clone(),
                    history: Arc::new(history),
                },
            );
        }

        Ok(())
    }

    fn finish(
        self,
        linear_history: bool,
        commits: Arc<IndexMap<String, CommitWithPatches>>,
    ) -> ChangesProvider {
        ChangesProvider {
            merge_base: self.merge_base,
            head: self.head,
            linear_history,
            commits,
            changes: self.changes,
            changes_by_commits: self.changes_by_commits,
            diff_data_by_change: self.diff_data_by_change,
        }
    }
}

/// Appends a change unless an equal one is already listed.
fn push_unique(changes: &mut Vec<Change>, change: Change) -> bool {
    if changes.contains(&change) {
        debug!(change = %change, "Skipping duplicate change");
        return false;
    }
    changes.push(change);
    true
}

/// Finds the patch producing `after_path`, or for a deleted file the one removing `before_path`.
fn find_patch_by_file_paths<'a>(
    patches: &'a [Arc<Patch>],
    before_path: Option<&str>,
    after_path: Option<&str>,
) -> Option<&'a Arc<Patch>> {
    patches.iter().find(|patch| match after_path {
        Some(after_path) => patch.after_path() == Some(after_path),
        None => patch.before_path() == before_path,
    })
}
