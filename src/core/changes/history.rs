//! Rename-aware lineage of a single file across the commits of a review unit.
//!
//! Two strategies answer the same questions:
//!
//! - [`LinearFileHistory`] is accumulated while scanning a linear history
//!   oldest to newest, one patch per touching commit.
//! - [`GraphFileHistory`] derives the lineage on demand by walking the commit
//!   graph backward from the head, which stays sound when several parents can
//!   touch the same logical file.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::commit::CommitWithPatches;
use super::hunk::{Direction, transfer_line};
use super::patch::Patch;

/// Membership and ordering queries over one file's lineage.
pub trait FileHistory: fmt::Debug + Send + Sync {
    /// Returns true if `file_path` at `commit_sha` is a state of this file.
    ///
    /// A commit that touches the file matches both the name it had before the
    /// commit and the name after it.
    fn contains(&self, commit_sha: &str, file_path: &str) -> bool;

    /// Orders two commits within the lineage, `None` if they are unrelated.
    fn compare(&self, first: &str, second: &str) -> Option<Ordering>;

    /// Carries a line of the file as of `from_commit` to its position as of `to_commit`.
    ///
    /// Histories without a linear order cannot map lines.
    fn map_line(&self, _from_commit: &str, _to_commit: &str, _line: u32) -> Option<u32> {
        None
    }
}

/// Mutable tracker used while scanning a linear history.
#[derive(Debug, Clone)]
pub struct LinearFileHistoryBuilder {
    commits: Arc<[String]>,
    entries: Vec<(String, Arc<Patch>)>,
}

impl LinearFileHistoryBuilder {
    /// Starts a history over the ordered commit list of the review unit.
    pub fn new(commits: Arc<[String]>) -> Self {
        Self {
            commits,
            entries: Vec::new(),
        }
    }

    /// Records the patch a commit applied to this file.
    pub fn append(&mut self, commit_sha: impl Into<String>, patch: Arc<Patch>) {
        self.entries.push((commit_sha.into(), patch));
    }

    /// Name of the file before the first recorded patch, or its created name.
    pub fn first_known_file_path(&self) -> Option<&str> {
        self.entries
            .first()
            .map(|(_, patch)| patch.before_path().unwrap_or_else(|| patch.file_path()))
    }

    pub fn build(self) -> LinearFileHistory {
        let positions = self
            .commits
            .iter()
            .enumerate()
            .map(|(position, sha)| (sha.clone(), position))
            .collect();
        LinearFileHistory {
            positions,
            entries: self.entries,
        }
    }
}

/// Frozen lineage of a file in a linear history.
#[derive(Debug, Clone)]
pub struct LinearFileHistory {
    positions: IndexMap<String, usize>,
    entries: Vec<(String, Arc<Patch>)>,
}

impl LinearFileHistory {
    /// Name of the file after the last recorded patch.
    pub fn last_known_file_path(&self) -> Option<&str> {
        self.entries.last().map(|(_, patch)| patch.file_path())
    }

    fn position(&self, commit_sha: &str) -> Option<usize> {
        self.positions.get(commit_sha).copied()
    }

    /// Path of the file after `position`, `None` if it does not exist there.
    fn path_after(&self, position: usize) -> Option<&str> {
        let mut path = None;
        for (sha, patch) in &self.entries {
            match self.position(sha) {
                Some(p) if p <= position => path = Some(patch.after_path()),
                _ => break,
            }
        }
        match path {
            Some(after) => after,
            // Untouched so far: the file exists under its merge base name.
            None => self.entries.first().and_then(|(_, patch)| patch.before_path()),
        }
    }

    fn patch_at(&self, position: usize) -> Option<&Patch> {
        self.entries
            .iter()
            .find(|(sha, _)| self.position(sha) == Some(position))
            .map(|(_, patch)| patch.as_ref())
    }
}

impl FileHistory for LinearFileHistory {
    fn contains(&self, commit_sha: &str, file_path: &str) -> bool {
        let Some(position) = self.position(commit_sha) else {
            return false;
        };
        if let Some(patch) = self.patch_at(position) {
            return patch.before_path() == Some(file_path)
                || patch.after_path() == Some(file_path);
        }
        self.path_after(position) == Some(file_path)
    }

    fn compare(&self, first: &str, second: &str) -> Option<Ordering> {
        Some(self.position(first)?.cmp(&self.position(second)?))
    }

    fn map_line(&self, from_commit: &str, to_commit: &str, line: u32) -> Option<u32> {
        let from = self.position(from_commit)?;
        let to = self.position(to_commit)?;

        let mut line = line;
        if from <= to {
            for (sha, patch) in &self.entries {
                let position = self.position(sha)?;
                if position > from && position <= to {
                    line = transfer_line(patch.hunks()?, line, Direction::Forward)?;
                }
            }
        } else {
            for (sha, patch) in self.entries.iter().rev() {
                let position = self.position(sha)?;
                if position > to && position <= from {
                    line = transfer_line(patch.hunks()?, line, Direction::Backward)?;
                }
            }
        }
        Some(line)
    }
}

/// Lineage of a file in a history with merges, derived by graph traversal.
///
/// The walk starts at the head under the file's final path and follows each
/// commit's direct patches backward: a commit whose patch produced the
/// current path continues under the patch's before path. Direct patches
/// describe the diff against the first in-set parent only, so a creation ends
/// the first-parent branch of the walk and other parents are visited under
/// both the current path and the first parent's path. A branch of the walk is dropped
/// at a commit whose cumulative patches show the path is not this file there.
#[derive(Clone)]
pub struct GraphFileHistory {
    commits: Arc<IndexMap<String, CommitWithPatches>>,
    head: String,
    final_file_path: String,
    /// Name of the file at the merge base, `None` if it was created in the review unit.
    base_file_path: Option<String>,
}

impl fmt::Debug for GraphFileHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphFileHistory")
            .field("head", &self.head)
            .field("final_file_path", &self.final_file_path)
            .finish()
    }
}

impl GraphFileHistory {
    pub fn new(
        commits: Arc<IndexMap<String, CommitWithPatches>>,
        head: impl Into<String>,
        final_file_path: impl Into<String>,
    ) -> Self {
        let head = head.into();
        let final_file_path = final_file_path.into();
        let base_file_path = match commits.get(&head).and_then(|commit| {
            commit
                .cumulative_patches
                .iter()
                .find(|patch| patch.file_path() == final_file_path)
        }) {
            Some(patch) => patch.before_path().map(str::to_string),
            None => Some(final_file_path.clone()),
        };
        Self {
            commits,
            head,
            final_file_path,
            base_file_path,
        }
    }

    fn in_set_parents<'a>(&'a self, commit: &'a CommitWithPatches) -> impl Iterator<Item = &'a str> {
        commit
            .parents()
            .iter()
            .map(String::as_str)
            .filter(|parent| self.commits.contains_key(*parent))
    }

    /// True if `path` at `commit` can be a state of this file.
    fn exists_at(&self, commit: &CommitWithPatches, path: &str) -> bool {
        let cumulative = &commit.cumulative_patches;
        if cumulative.iter().any(|patch| patch.after_path() == Some(path)) {
            return true;
        }
        self.base_file_path.as_deref() == Some(path)
            && !cumulative
                .iter()
                .any(|patch| patch.before_path() == Some(path))
    }

    /// True if `ancestor` is reachable from `descendant` through in-set parents.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut stack = vec![descendant];
        let mut visited = HashSet::new();
        while let Some(sha) = stack.pop() {
            if sha == ancestor {
                return true;
            }
            if !visited.insert(sha) {
                continue;
            }
            if let Some(commit) = self.commits.get(sha) {
                stack.extend(self.in_set_parents(commit));
            }
        }
        false
    }
}

impl FileHistory for GraphFileHistory {
    fn contains(&self, commit_sha: &str, file_path: &str) -> bool {
        if !self.commits.contains_key(commit_sha) {
            return false;
        }

        let mut stack: Vec<(&str, &str)> = vec![(self.head.as_str(), self.final_file_path.as_str())];
        let mut visited = HashSet::new();

        while let Some((sha, path)) = stack.pop() {
            if !visited.insert((sha, path)) {
                continue;
            }
            let Some(commit) = self.commits.get(sha) else {
                continue;
            };
            if !self.exists_at(commit, path) {
                continue;
            }
            let patch = commit
                .direct_patches
                .iter()
                .find(|patch| patch.after_path() == Some(path));

            if sha == commit_sha
                && (path == file_path
                    || patch.is_some_and(|patch| patch.before_path() == Some(file_path)))
            {
                return true;
            }

            // A creation ends the first-parent branch only. Other parents may
            // still carry the file under its current name.
            let previous_path = match patch {
                Some(patch) => patch.before_path(),
                None => Some(path),
            };

            for (index, parent) in self.in_set_parents(commit).enumerate() {
                if let Some(previous_path) = previous_path {
                    stack.push((parent, previous_path));
                }
                if index > 0 && previous_path != Some(path) {
                    stack.push((parent, path));
                }
            }
        }

        false
    }

    fn compare(&self, first: &str, second: &str) -> Option<Ordering> {
        if !self.commits.contains_key(first) || !self.commits.contains_key(second) {
            return None;
        }
        if first == second {
            Some(Ordering::Equal)
        } else if self.is_ancestor(first, second) {
            Some(Ordering::Less)
        } else if self.is_ancestor(second, first) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::changes::commit::{Commit, CommitGraph, CommitPatches};
    use crate::core::changes::hunk::Hunk;
    use crate::core::changes::patch::{PatchKind, text};
    use std::collections::HashMap;

    fn ordered(commits: &[&str]) -> Arc<[String]> {
        commits.iter().map(|c| c.to_string()).collect()
    }

    fn with_hunks(hunks: Vec<Hunk>) -> PatchKind {
        PatchKind::Text { hunks }
    }

    /// # Linear Rename Membership
    ///
    /// Tests that a renaming commit matches both names and later commits match
    /// only the new name.
    ///
    /// ## Test Scenario
    /// - c1 edits a.txt, c2 renames a.txt -> b.txt, c3 does not touch the file
    ///
    /// ## Expected Outcome
    /// - c1 matches a.txt, c2 matches a.txt and b.txt, c3 matches b.txt only
    #[test]
    fn test_linear_contains_follows_rename() {
        let mut builder = LinearFileHistoryBuilder::new(ordered(&["c1", "c2", "c3"]));
        builder.append("c1", Arc::new(Patch::modified("a.txt", text())));
        builder.append("c2", Arc::new(Patch::renamed("a.txt", "b.txt", text())));
        assert_eq!(builder.first_known_file_path(), Some("a.txt"));

        let history = builder.build();
        assert_eq!(history.last_known_file_path(), Some("b.txt"));
        assert!(history.contains("c1", "a.txt"));
        assert!(!history.contains("c1", "b.txt"));
        assert!(history.contains("c2", "a.txt"));
        assert!(history.contains("c2", "b.txt"));
        assert!(history.contains("c3", "b.txt"));
        assert!(!history.contains("c3", "a.txt"));
        assert!(!history.contains("unknown", "b.txt"));
    }

    /// # Linear Membership Before First Touch
    ///
    /// Tests that commits preceding the first patch see the merge base name,
    /// and that a file created later does not exist before its creation.
    #[test]
    fn test_linear_contains_before_first_patch() {
        let mut existing = LinearFileHistoryBuilder::new(ordered(&["c1", "c2"]));
        existing.append("c2", Arc::new(Patch::modified("x.txt", text())));
        let existing = existing.build();
        assert!(existing.contains("c1", "x.txt"));

        let mut created = LinearFileHistoryBuilder::new(ordered(&["c1", "c2", "c3"]));
        created.append("c2", Arc::new(Patch::added("new.txt", text())));
        created.append("c3", Arc::new(Patch::deleted("new.txt", text())));
        let created = created.build();
        assert!(!created.contains("c1", "new.txt"));
        assert!(created.contains("c2", "new.txt"));
        assert!(created.contains("c3", "new.txt"));
    }

    /// # Linear Ordering
    ///
    /// Tests commit comparison by position in the review unit.
    #[test]
    fn test_linear_compare() {
        let mut builder = LinearFileHistoryBuilder::new(ordered(&["c1", "c2", "c3"]));
        builder.append("c1", Arc::new(Patch::added("a", text())));
        builder.append("c3", Arc::new(Patch::modified("a", text())));
        let history = builder.build();

        assert_eq!(history.compare("c1", "c3"), Some(Ordering::Less));
        assert_eq!(history.compare("c3", "c2"), Some(Ordering::Greater));
        assert_eq!(history.compare("c1", "nope"), None);
        assert_eq!(history.compare("c2", "c2"), Some(Ordering::Equal));
    }

    /// # Line Mapping Across Commits
    ///
    /// Tests that lines are carried forward and backward through successive patches.
    #[test]
    fn test_linear_map_line() {
        let mut builder = LinearFileHistoryBuilder::new(ordered(&["c1", "c2", "c3"]));
        builder.append(
            "c2",
            Arc::new(Patch::modified("f", with_hunks(vec![Hunk::new(1, 0, 2, 3)]))),
        );
        builder.append(
            "c3",
            Arc::new(Patch::renamed("f", "g", with_hunks(vec![Hunk::new(20, 0, 21, 1)]))),
        );
        let history = builder.build();

        assert_eq!(history.map_line("c1", "c3", 10), Some(13));
        assert_eq!(history.map_line("c1", "c3", 30), Some(34));
        assert_eq!(history.map_line("c3", "c1", 34), Some(30));
        assert_eq!(history.map_line("c2", "c2", 7), Some(7));
    }

    fn merge_commits() -> Arc<IndexMap<String, CommitWithPatches>> {
        // c1 adds a.txt; c2 renames it to b.txt; c3 edits elsewhere; c4 merges c2 and c3.
        let graph = CommitGraph::new([
            Commit::new("c1", ["base"]),
            Commit::new("c2", ["c1"]),
            Commit::new("c3", ["c1"]),
            Commit::new("c4", ["c2", "c3"]),
        ])
        .unwrap();
        let patches = HashMap::from([
            (
                "c1".to_string(),
                CommitPatches::new(
                    vec![Patch::added("a.txt", text())],
                    vec![Patch::added("a.txt", text())],
                ),
            ),
            (
                "c2".to_string(),
                CommitPatches::new(
                    vec![Patch::renamed("a.txt", "b.txt", text())],
                    vec![Patch::added("b.txt", text())],
                ),
            ),
            (
                "c3".to_string(),
                CommitPatches::new(
                    vec![Patch::modified("other.txt", text())],
                    vec![
                        Patch::added("a.txt", text()),
                        Patch::modified("other.txt", text()),
                    ],
                ),
            ),
            (
                "c4".to_string(),
                CommitPatches::new(
                    vec![Patch::modified("other.txt", text())],
                    vec![
                        Patch::added("b.txt", text()),
                        Patch::modified("other.txt", text()),
                    ],
                ),
            ),
        ]);
        Arc::new(graph.with_patches("c4", &patches).unwrap())
    }

    /// # Graph Membership Across A Merge
    ///
    /// Tests that the backward walk follows the rename through the merge.
    ///
    /// ## Expected Outcome
    /// - b.txt at c4 and c2, a.txt at c2 and c1 belong to the file; a.txt at c4 does not
    #[test]
    fn test_graph_contains() {
        let history = GraphFileHistory::new(merge_commits(), "c4", "b.txt");
        assert!(history.contains("c4", "b.txt"));
        assert!(history.contains("c2", "b.txt"));
        assert!(history.contains("c2", "a.txt"));
        assert!(history.contains("c1", "a.txt"));
        assert!(!history.contains("c4", "a.txt"));
        assert!(!history.contains("c1", "b.txt"));
        assert!(!history.contains("c3", "b.txt"));
        assert!(!history.contains("missing", "b.txt"));
    }

    /// # Graph Membership For A File Created On The Second Branch
    ///
    /// Tests that a file the merge shows as new against its first parent is
    /// still traced into the branch that created it.
    ///
    /// ## Test Scenario
    /// - c1 and c2 branch from base, c2 adds feature.txt, c3 merges (c1, c2)
    ///
    /// ## Expected Outcome
    /// - feature.txt belongs to the file at c3 and c2 but not at c1
    #[test]
    fn test_graph_contains_file_created_on_second_parent() {
        let graph = CommitGraph::new([
            Commit::new("c1", ["base"]),
            Commit::new("c2", ["base"]),
            Commit::new("c3", ["c1", "c2"]),
        ])
        .unwrap();
        let patches = HashMap::from([
            (
                "c1".to_string(),
                CommitPatches::new(
                    vec![Patch::modified("main.txt", text())],
                    vec![Patch::modified("main.txt", text())],
                ),
            ),
            (
                "c2".to_string(),
                CommitPatches::new(
                    vec![Patch::added("feature.txt", text())],
                    vec![Patch::added("feature.txt", text())],
                ),
            ),
            (
                "c3".to_string(),
                CommitPatches::new(
                    vec![Patch::added("feature.txt", text())],
                    vec![
                        Patch::added("feature.txt", text()),
                        Patch::modified("main.txt", text()),
                    ],
                ),
            ),
        ]);
        let commits = Arc::new(graph.with_patches("c3", &patches).unwrap());

        let history = GraphFileHistory::new(commits, "c3", "feature.txt");
        assert!(history.contains("c3", "feature.txt"));
        assert!(history.contains("c2", "feature.txt"));
        assert!(!history.contains("c1", "feature.txt"));
    }

    /// # Graph Ordering
    ///
    /// Tests ancestry-based comparison and unrelated branches.
    #[test]
    fn test_graph_compare() {
        let history = GraphFileHistory::new(merge_commits(), "c4", "b.txt");
        assert_eq!(history.compare("c1", "c4"), Some(Ordering::Less));
        assert_eq!(history.compare("c4", "c2"), Some(Ordering::Greater));
        assert_eq!(history.compare("c2", "c3"), None);
        assert_eq!(history.compare("c3", "c3"), Some(Ordering::Equal));
        assert_eq!(history.map_line("c1", "c4", 1), None);
    }
}
