//! Commits of a review unit and their ancestry graph.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use serde::{Deserialize, Serialize};

use super::patch::Patch;
use crate::error::ChangesError;

/// A commit identifier with its ordered parents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl Commit {
    pub fn new<P, S>(sha: impl Into<String>, parents: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sha: sha.into(),
            parents: parents.into_iter().map(Into::into).collect(),
        }
    }
}

/// The two patch lists fetched for every commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPatches {
    /// Diff against the first in-set parent, or the merge base if there is none.
    pub direct: Vec<Patch>,
    /// Diff against the merge base.
    pub cumulative: Vec<Patch>,
}

impl CommitPatches {
    pub fn new(direct: Vec<Patch>, cumulative: Vec<Patch>) -> Self {
        Self { direct, cumulative }
    }
}

/// A commit paired with its patches, shared by the built model.
#[derive(Debug, Clone)]
pub struct CommitWithPatches {
    pub commit: Commit,
    pub direct_patches: Vec<Arc<Patch>>,
    pub cumulative_patches: Vec<Arc<Patch>>,
}

impl CommitWithPatches {
    fn new(commit: Commit, patches: &CommitPatches) -> Self {
        Self {
            commit,
            direct_patches: patches.direct.iter().cloned().map(Arc::new).collect(),
            cumulative_patches: patches.cumulative.iter().cloned().map(Arc::new).collect(),
        }
    }

    pub fn sha(&self) -> &str {
        &self.commit.sha
    }

    pub fn parents(&self) -> &[String] {
        &self.commit.parents
    }
}

/// Ancestry graph of the commits in a review unit.
///
/// Edges point from a commit to its parents. Parents outside the graph (the
/// merge base, or commits of other branches merged in) are not nodes.
#[derive(Debug, Default)]
pub struct CommitGraph {
    graph: DiGraph<Commit, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl CommitGraph {
    /// Builds the graph from a set of commits.
    pub fn new(commits: impl IntoIterator<Item = Commit>) -> Result<Self, ChangesError> {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for commit in commits {
            if nodes.contains_key(&commit.sha) {
                return Err(ChangesError::DuplicateCommit { sha: commit.sha });
            }
            let sha = commit.sha.clone();
            let index = graph.add_node(commit);
            nodes.insert(sha, index);
        }

        let edges: Vec<(NodeIndex, NodeIndex)> = graph
            .node_indices()
            .flat_map(|index| {
                graph[index]
                    .parents
                    .iter()
                    .filter_map(|parent| nodes.get(parent))
                    .map(move |&parent| (index, parent))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (child, parent) in edges {
            graph.add_edge(child, parent, ());
        }

        Ok(Self { graph, nodes })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, sha: &str) -> bool {
        self.nodes.contains_key(sha)
    }

    pub fn get(&self, sha: &str) -> Option<&Commit> {
        self.nodes.get(sha).map(|&index| &self.graph[index])
    }

    /// Commits reachable from `head`, every parent before its children.
    ///
    /// Depth-first post-order over parent edges, iterative with an explicit
    /// visited set. The head is always last.
    pub fn ancestors_first(&self, head: &str) -> Result<Vec<&Commit>, ChangesError> {
        let start = *self
            .nodes
            .get(head)
            .ok_or_else(|| ChangesError::HeadNotInGraph {
                sha: head.to_string(),
            })?;

        let mut ordered = Vec::with_capacity(self.graph.node_count());
        let mut dfs = DfsPostOrder::new(&self.graph, start);
        while let Some(index) = dfs.next(&self.graph) {
            ordered.push(&self.graph[index]);
        }
        Ok(ordered)
    }

    /// Pairs every commit reachable from `head` with its patches, in ancestry order.
    ///
    /// Every reachable commit must have an entry in `patches`.
    pub fn with_patches(
        &self,
        head: &str,
        patches: &HashMap<String, CommitPatches>,
    ) -> Result<IndexMap<String, CommitWithPatches>, ChangesError> {
        self.ancestors_first(head)?
            .into_iter()
            .map(|commit| {
                let commit_patches =
                    patches
                        .get(&commit.sha)
                        .ok_or_else(|| ChangesError::MissingPatches {
                            sha: commit.sha.clone(),
                        })?;
                Ok((
                    commit.sha.clone(),
                    CommitWithPatches::new(commit.clone(), commit_patches),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shas(commits: &[&Commit]) -> Vec<String> {
        commits.iter().map(|c| c.sha.clone()).collect()
    }

    /// # Linear Ordering
    ///
    /// Tests that a chain is ordered oldest first, ignoring the merge base parent.
    #[test]
    fn test_ancestors_first_linear() {
        let graph = CommitGraph::new([
            Commit::new("c3", ["c2"]),
            Commit::new("c1", ["base"]),
            Commit::new("c2", ["c1"]),
        ])
        .unwrap();

        let ordered = graph.ancestors_first("c3").unwrap();
        assert_eq!(shas(&ordered), vec!["c1", "c2", "c3"]);
    }

    /// # Merge Ordering
    ///
    /// Tests that both parents of a merge precede it and the shared root comes first.
    #[test]
    fn test_ancestors_first_merge() {
        let graph = CommitGraph::new([
            Commit::new("c1", ["base"]),
            Commit::new("c2", ["c1"]),
            Commit::new("c3", ["c1"]),
            Commit::new("c4", ["c2", "c3"]),
        ])
        .unwrap();

        let ordered = shas(&graph.ancestors_first("c4").unwrap());
        assert_eq!(ordered.len(), 4);
        assert_eq!(ordered[0], "c1");
        assert_eq!(ordered[3], "c4");
    }

    /// # Unreachable Commits Skipped
    ///
    /// Tests that commits not reachable from the head are not ordered.
    #[test]
    fn test_unreachable_commits_skipped() {
        let graph = CommitGraph::new([
            Commit::new("c1", ["base"]),
            Commit::new("stray", ["base"]),
        ])
        .unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(shas(&graph.ancestors_first("c1").unwrap()), vec!["c1"]);
    }

    /// # Contract Violations
    ///
    /// Tests that a missing head, duplicate commits, and missing patches are errors.
    #[test]
    fn test_contract_violations() {
        let graph = CommitGraph::new([Commit::new("c1", ["base"])]).unwrap();
        assert!(matches!(
            graph.ancestors_first("nope"),
            Err(ChangesError::HeadNotInGraph { .. })
        ));
        assert!(matches!(
            graph.with_patches("c1", &HashMap::new()),
            Err(ChangesError::MissingPatches { sha }) if sha == "c1"
        ));

        let duplicate = CommitGraph::new([Commit::new("c1", ["base"]), Commit::new("c1", ["x"])]);
        assert!(matches!(
            duplicate,
            Err(ChangesError::DuplicateCommit { .. })
        ));
    }
}
