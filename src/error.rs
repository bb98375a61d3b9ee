//! Unified error handling for the pr-changes library.
//!
//! This module provides the error hierarchy using `thiserror`, so callers can
//! tell malformed input apart from environment failures.
//!
//! ## Error Categories
//!
//! - [`ChangesError`]: Contract violations found while building the change model
//! - [`DiffParseError`]: Unified diff text that cannot be parsed
//! - [`GitError`]: Errors from git invocations
//! - [`ConfigError`]: Errors from configuration loading and validation
//!
//! ## Example
//!
//! ```rust
//! use pr_changes::error::{ChangesError, PrChangesError};
//!
//! fn example() -> Result<(), PrChangesError> {
//!     // Errors are automatically converted via From trait
//!     Err(ChangesError::MalformedPatch)?;
//!     Ok(())
//! }
//! # assert!(example().is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pr-changes library.
#[derive(Error, Debug)]
pub enum PrChangesError {
    /// The review unit violates the input contract.
    #[error("Invalid review unit: {0}")]
    Changes(#[from] ChangesError),

    /// A patch supplied as diff text could not be parsed.
    #[error("Diff parse error: {0}")]
    DiffParse(#[from] DiffParseError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O and other failures outside the typed categories.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PrChangesError {
    /// Returns true if the error comes from malformed input rather than the environment.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PrChangesError::Changes(_) | PrChangesError::DiffParse(_))
    }
}

/// Contract violations detected while building the change model.
///
/// Construction aborts on the first violation; no partial model is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangesError {
    /// A commit reachable from the head has no patches.
    #[error("No patches supplied for commit {sha}")]
    MissingPatches {
        /// The commit lacking patches.
        sha: String,
    },

    /// A patch has neither a before nor an after path.
    #[error("Patch has neither a before nor an after path")]
    MalformedPatch,

    /// The head commit is not part of the commit graph.
    #[error("Head commit {sha} is not in the commit graph")]
    HeadNotInGraph {
        /// The missing head.
        sha: String,
    },

    /// The same commit was supplied twice.
    #[error("Commit {sha} appears more than once")]
    DuplicateCommit {
        /// The repeated commit.
        sha: String,
    },
}

/// Errors from parsing unified diff text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffParseError {
    /// A `@@` line could not be parsed.
    #[error("Line {line}: invalid hunk header '{header}'")]
    InvalidHunkHeader {
        /// Line number of the header (1-indexed).
        line: usize,
        /// The offending header.
        header: String,
    },

    /// The input ended before the hunk body was complete.
    #[error("Line {line}: hunk is missing {missing} line(s)")]
    TruncatedHunk {
        /// Line number of the hunk header (1-indexed).
        line: usize,
        /// Number of lines still expected.
        missing: u32,
    },

    /// A hunk body line does not fit the remaining line counts.
    #[error("Line {line}: unexpected line in hunk: '{content}'")]
    UnexpectedHunkLine {
        /// Line number (1-indexed).
        line: usize,
        /// The offending line.
        content: String,
    },

    /// A file section names no path at all.
    #[error("Line {line}: file section has no paths")]
    MissingPaths {
        /// Line number of the `diff --git` header (1-indexed).
        line: usize,
    },
}

/// Failures of the git-backed review unit loader.
#[derive(Error, Debug, Clone)]
pub enum GitError {
    /// The path is not inside a git work tree.
    #[error("{path} is not a git repository")]
    NotARepository {
        path: PathBuf,
    },

    #[error("Repository path {path} does not exist")]
    PathNotFound {
        path: PathBuf,
    },

    /// git could not be run or exited unsuccessfully.
    #[error("`{command}` failed: {message}")]
    CommandFailed {
        command: String,
        /// Trimmed stderr of git.
        message: String,
    },

    /// The two references share no history.
    #[error("No merge base between '{base}' and '{head}'")]
    NoMergeBase {
        /// The base reference.
        base: String,
        /// The head reference.
        head: String,
    },

    /// A reference git would read as an option or a range.
    #[error("Refusing reference '{reference}'")]
    InvalidReference {
        reference: String,
    },
}

/// Problems with the config file or a configured value.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {message}")]
    FileReadError {
        path: PathBuf,
        message: String,
    },

    #[error("Invalid TOML in {path}: {message}")]
    ParseError {
        path: PathBuf,
        message: String,
    },

    #[error("Invalid {field}: {message}")]
    InvalidValue {
        /// Config key, e.g. `rename_threshold`.
        field: String,
        message: String,
    },

    #[error("Cannot create config directory {path}: {message}")]
    DirectoryCreationError {
        path: PathBuf,
        message: String,
    },
}

/// Type alias for Results using PrChangesError.
///
/// Not re-exported from the crate root, which exports `anyhow::Result`.
pub type PrChangesResult<T> = std::result::Result<T, PrChangesError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// # Changes Error Display
    ///
    /// Tests that contract violations name the offending commit.
    ///
    /// ## Test Scenario
    /// - Creates each ChangesError variant
    /// - Tests their Display implementation
    ///
    /// ## Expected Outcome
    /// - Messages include the commit sha where one exists
    #[test]
    fn test_changes_error_display() {
        let missing = ChangesError::MissingPatches {
            sha: "abc123".to_string(),
        };
        assert!(missing.to_string().contains("abc123"));

        let head = ChangesError::HeadNotInGraph {
            sha: "def456".to_string(),
        };
        assert!(head.to_string().contains("def456"));

        let duplicate = ChangesError::DuplicateCommit {
            sha: "c1".to_string(),
        };
        assert!(duplicate.to_string().contains("more than once"));
        assert!(ChangesError::MalformedPatch.to_string().contains("neither"));
    }

    /// # Diff Parse Error Display
    ///
    /// Tests that parse errors report their line numbers.
    #[test]
    fn test_diff_parse_error_display() {
        let header = DiffParseError::InvalidHunkHeader {
            line: 12,
            header: "@@ nope @@".to_string(),
        };
        assert!(header.to_string().starts_with("Line 12"));
        assert!(header.to_string().contains("@@ nope @@"));

        let truncated = DiffParseError::TruncatedHunk { line: 3, missing: 2 };
        assert!(truncated.to_string().contains("2 line(s)"));
    }

    /// # Git And Config Error Display
    ///
    /// Tests that environment errors display correctly formatted messages.
    #[test]
    fn test_git_and_config_error_display() {
        let failed = GitError::CommandFailed {
            command: "git rev-list".to_string(),
            message: "bad revision".to_string(),
        };
        assert!(failed.to_string().contains("git rev-list"));
        assert!(failed.to_string().contains("bad revision"));

        let no_base = GitError::NoMergeBase {
            base: "main".to_string(),
            head: "feature".to_string(),
        };
        assert!(no_base.to_string().contains("'main'"));

        let invalid = ConfigError::InvalidValue {
            field: "rename_threshold".to_string(),
            message: "must be between 1 and 100".to_string(),
        };
        assert!(invalid.to_string().contains("rename_threshold"));
    }

    /// # Error Conversion
    ///
    /// Tests that errors convert correctly through the From trait.
    ///
    /// ## Test Scenario
    /// - Creates specific error types
    /// - Converts them to PrChangesError
    ///
    /// ## Expected Outcome
    /// - All error types convert to PrChangesError
    /// - Only input errors count as contract violations
    #[test]
    fn test_error_conversion() {
        let changes: PrChangesError = ChangesError::MalformedPatch.into();
        assert!(matches!(changes, PrChangesError::Changes(_)));
        assert!(changes.is_contract_violation());

        let parse: PrChangesError = DiffParseError::MissingPaths { line: 1 }.into();
        assert!(parse.is_contract_violation());

        let git: PrChangesError = GitError::InvalidReference {
            reference: "a..b".to_string(),
        }
        .into();
        assert!(matches!(git, PrChangesError::Git(_)));
        assert!(!git.is_contract_violation());

        let other: PrChangesError = anyhow::anyhow!("boom").into();
        assert!(matches!(other, PrChangesError::Other(_)));
    }
}
