//! Loading a review unit from a local git repository.
//!
//! Every query shells out to the `git` binary; nothing is cached between
//! calls.

use crate::config::Settings;
use crate::error::GitError;
use crate::models::{CommitRecord, PatchList, ReviewUnit};
use rayon::prelude::*;
use std::{collections::HashSet, path::Path, process::Command};
use tracing::{debug, instrument};

/// How `git diff` detects renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub find_renames: bool,
    /// Similarity percentage (1-100) passed to `-M`.
    pub rename_threshold: u8,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            find_renames: true,
            rename_threshold: crate::config::DEFAULT_RENAME_THRESHOLD,
        }
    }
}

impl DiffOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            find_renames: *settings.find_renames.value(),
            rename_threshold: *settings.rename_threshold.value(),
        }
    }

    fn rename_arg(&self) -> String {
        if self.find_renames {
            format!("-M{}%", self.rename_threshold)
        } else {
            "--no-renames".to_string()
        }
    }
}

/// A commit listed by `git rev-list --parents`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListedCommit {
    sha: String,
    parents: Vec<String>,
}

/// Rejects references git would read as an option or a range.
pub fn validate_reference(reference: &str) -> Result<(), GitError> {
    let forbidden = reference.is_empty()
        || reference.starts_with('-')
        || reference.contains("..")
        || reference.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '~' | '^' | ':' | '?' | '*' | '[')
        });

    if forbidden {
        return Err(GitError::InvalidReference {
            reference: reference.to_string(),
        });
    }
    Ok(())
}

fn run_git(repo_path: &Path, args: &[&str]) -> Result<String, GitError> {
    let command = format!("git {}", args.join(" "));
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .map_err(|e| GitError::CommandFailed {
            command: command.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ensure_repository(repo_path: &Path) -> Result<(), GitError> {
    if !repo_path.exists() {
        return Err(GitError::PathNotFound {
            path: repo_path.to_path_buf(),
        });
    }

    run_git(repo_path, &["rev-parse", "--git-dir"]).map_err(|_| GitError::NotARepository {
        path: repo_path.to_path_buf(),
    })?;
    Ok(())
}

fn resolve_commit(repo_path: &Path, reference: &str) -> Result<String, GitError> {
    let spec = format!("{}^{{commit}}", reference);
    let sha = run_git(repo_path, &["rev-parse", "--verify", "--quiet", &spec])?;
    Ok(sha.trim().to_string())
}

fn get_merge_base(repo_path: &Path, base: &str, head: &str) -> Result<String, GitError> {
    let output =
        run_git(repo_path, &["merge-base", base, head]).map_err(|_| GitError::NoMergeBase {
            base: base.to_string(),
            head: head.to_string(),
        })?;
    Ok(output.trim().to_string())
}

fn list_commits(
    repo_path: &Path,
    merge_base: &str,
    head: &str,
) -> Result<Vec<ListedCommit>, GitError> {
    let range = format!("{}..{}", merge_base, head);
    let output = run_git(repo_path, &["rev-list", "--parents", &range])?;

    Ok(parse_rev_list(&output))
}

fn parse_rev_list(output: &str) -> Vec<ListedCommit> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let sha = fields.next()?.to_string();
            Some(ListedCommit {
                sha,
                parents: fields.map(str::to_string).collect(),
            })
        })
        .collect()
}

fn diff(repo_path: &Path, from: &str, to: &str, options: &DiffOptions) -> Result<String, GitError> {
    let rename_arg = options.rename_arg();
    run_git(
        repo_path,
        &[
            "-c",
            "core.quotePath=false",
            "diff",
            "--no-color",
            "--no-ext-diff",
            &rename_arg,
            from,
            to,
        ],
    )
}

/// Loads the commits between the merge base of `base` and `head`, and `head`,
/// with their direct and cumulative patches as raw diff text.
#[instrument(skip(options), fields(repo = %repo_path.display()))]
pub fn load_review_unit(
    repo_path: &Path,
    base: &str,
    head: &str,
    options: &DiffOptions,
) -> Result<ReviewUnit, GitError> {
    ensure_repository(repo_path)?;
    validate_reference(base)?;
    validate_reference(head)?;

    let head_sha = resolve_commit(repo_path, head)?;
    let merge_base = get_merge_base(repo_path, base, &head_sha)?;
    let listed = list_commits(repo_path, &merge_base, &head_sha)?;
    if listed.is_empty() {
        return Err(GitError::CommandFailed {
            command: format!("git rev-list {}..{}", merge_base, head_sha),
            message: format!("'{}' has no commits over '{}'", head, base),
        });
    }
    debug!(merge_base = %merge_base, commits = listed.len(), "Listed review unit commits");

    let in_set: HashSet<&str> = listed.iter().map(|c| c.sha.as_str()).collect();
    let commits = listed
        .par_iter()
        .map(|commit| {
            let previous = commit
                .parents
                .iter()
                .find(|parent| in_set.contains(parent.as_str()))
                .map(String::as_str)
                .unwrap_or(merge_base.as_str());

            let cumulative = diff(repo_path, &merge_base, &commit.sha, options)?;
            let direct = if previous == merge_base {
                cumulative.clone()
            } else {
                diff(repo_path, previous, &commit.sha, options)?
            };

            Ok(CommitRecord {
                sha: commit.sha.clone(),
                parents: commit.parents.clone(),
                direct_patches: PatchList::Diff(direct),
                cumulative_patches: PatchList::Diff(cumulative),
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    Ok(ReviewUnit {
        merge_base,
        head: head_sha,
        commits,
    })
}
