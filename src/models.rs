use crate::{
    config::{Config, Settings},
    core::changes::{ChangesProvider, Commit, CommitGraph, CommitPatches, Patch, unified_diff},
    error::{DiffParseError, PrChangesError},
    logging::{LogFormat, LogLevel},
    parsed_property::ParsedProperty,
};
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// CLI Arguments
// ============================================================================

/// Output format for the change report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Pretty-printed JSON report.
    Json,
}

impl OutputFormat {
    /// Parse an output format from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{}'", s))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format '{}'", s))
}

#[derive(Parser, Clone, Debug, Default)]
#[command(
    name = "pr-changes",
    author,
    version = crate::VERSION_STRING,
    about = "Reconstruct the changes of a pull request from its commits",
    long_about = "Reconstructs the file changes of a pull request (the commits between a merge \
        base and a head) both per commit and cumulatively, and correlates each per-commit \
        change with the cumulative change of the same file across renames.\n\n\
        Configuration can be provided via CLI arguments, environment variables (PR_CHANGES_*),\n\
        or a config file (~/.config/pr-changes/config.toml).",
    after_help = "EXAMPLES:\n    \
        # Changes of the current branch since main\n    \
        pr-changes --base main\n\n    \
        # Changes between two refs of another repository, as JSON\n    \
        pr-changes /path/to/repo --base origin/main --head feature -o json\n\n    \
        # Changes of a review unit described in a JSON file\n    \
        pr-changes --input review-unit.json\n\n    \
        # Create sample config file\n    \
        pr-changes --create-config"
)]
pub struct Args {
    /// Local repository path (defaults to the current directory)
    #[arg(conflicts_with = "input")]
    pub path: Option<PathBuf>,

    /// Base reference; the merge base with the head starts the review unit
    #[arg(long, help_heading = "Review Unit", conflicts_with = "input")]
    pub base: Option<String>,

    /// Head reference (defaults to HEAD)
    #[arg(long, help_heading = "Review Unit", conflicts_with = "input")]
    pub head: Option<String>,

    /// Read the review unit from a JSON file instead of git
    #[arg(short, long, help_heading = "Review Unit")]
    pub input: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, help_heading = "Output Options")]
    pub output: Option<OutputFormat>,

    /// Disable rename detection when diffing commits
    #[arg(long, help_heading = "Diff Options")]
    pub no_renames: bool,

    /// Similarity percentage for rename detection (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100), help_heading = "Diff Options")]
    pub rename_threshold: Option<u8>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_parser = parse_log_level, help_heading = "Logging")]
    pub log_level: Option<LogLevel>,

    /// Log format (text, json)
    #[arg(long, value_parser = parse_log_format, help_heading = "Logging")]
    pub log_format: Option<LogFormat>,

    /// Write logs to this file instead of stderr
    #[arg(long, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Create a sample configuration file at ~/.config/pr-changes/config.toml
    #[arg(long)]
    pub create_config: bool,
}

/// Where the review unit comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A JSON file holding a [`ReviewUnit`].
    Json(PathBuf),
    /// A local repository diffed between two references.
    Git {
        repo: PathBuf,
        base: String,
        head: String,
    },
}

impl Args {
    /// Build the CLI configuration layer.
    pub fn cli_config(&self) -> Config {
        Config {
            log_level: self
                .log_level
                .map(|v| ParsedProperty::Cli(v, v.as_filter_str().to_string())),
            log_format: self
                .log_format
                .map(|v| ParsedProperty::Cli(v, format!("{:?}", v).to_lowercase())),
            log_file: self
                .log_file
                .as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.display().to_string())),
            output: self.output.map(|v| ParsedProperty::Cli(v, v.to_string())),
            find_renames: self
                .no_renames
                .then(|| ParsedProperty::Cli(false, "--no-renames".to_string())),
            rename_threshold: self
                .rename_threshold
                .map(|v| ParsedProperty::Cli(v, v.to_string())),
        }
    }

    /// Resolve configuration from CLI args, environment variables, config file, and defaults
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn resolve_config(&self) -> Result<Settings> {
        let file_config = Config::load_from_file()?;
        let env_config = Config::load_from_env();

        let settings = file_config
            .merge(env_config)
            .merge(self.cli_config())
            .resolve()?;
        Ok(settings)
    }

    /// Determine the review unit source from the arguments.
    pub fn input_source(&self) -> Result<InputSource> {
        if let Some(input) = &self.input {
            return Ok(InputSource::Json(input.clone()));
        }

        let base = self
            .base
            .clone()
            .context("either --base or --input is required")?;
        let repo = match &self.path {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        Ok(InputSource::Git {
            repo,
            base,
            head: self.head.clone().unwrap_or_else(|| "HEAD".to_string()),
        })
    }
}

// ============================================================================
// Review Unit Input
// ============================================================================

/// Patches of one commit side: structured, or raw `git diff` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchList {
    Patches(Vec<Patch>),
    Diff(String),
}

impl Default for PatchList {
    fn default() -> Self {
        PatchList::Patches(Vec::new())
    }
}

impl PatchList {
    /// Returns the structured patches, parsing diff text when needed.
    pub fn to_patches(&self) -> Result<Vec<Patch>, DiffParseError> {
        match self {
            PatchList::Patches(patches) => Ok(patches.clone()),
            PatchList::Diff(text) => unified_diff::parse(text),
        }
    }
}

/// A commit of a review unit with its two patch lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    #[serde(default)]
    pub parents: Vec<String>,
    /// Diff against the first in-set parent, or the merge base.
    #[serde(default)]
    pub direct_patches: PatchList,
    /// Diff against the merge base.
    #[serde(default)]
    pub cumulative_patches: PatchList,
}

/// The commits between a merge base and a head, with their patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUnit {
    pub merge_base: String,
    pub head: String,
    pub commits: Vec<CommitRecord>,
}

impl ReviewUnit {
    /// Reads a review unit from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read review unit: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse review unit: {}", path.display()))
    }

    /// Builds the change model of this review unit.
    pub fn build(&self) -> Result<ChangesProvider, PrChangesError> {
        let graph = CommitGraph::new(
            self.commits
                .iter()
                .map(|record| Commit::new(record.sha.clone(), record.parents.iter().cloned())),
        )?;

        let patches = self
            .commits
            .iter()
            .map(|record| {
                Ok((
                    record.sha.clone(),
                    CommitPatches::new(
                        record.direct_patches.to_patches()?,
                        record.cumulative_patches.to_patches()?,
                    ),
                ))
            })
            .collect::<Result<HashMap<_, _>, DiffParseError>>()?;

        Ok(ChangesProvider::build(
            &self.merge_base,
            &graph,
            &self.head,
            &patches,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::changes::{PatchKind, Revision, text};
    use crate::error::ChangesError;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pr-changes").chain(args.iter().copied())).unwrap()
    }

    /// # CLI Definition
    ///
    /// Verifies the clap definition is internally consistent.
    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    /// # Args Parsing With All Flags
    ///
    /// Tests parsing a git-based invocation with every option set.
    ///
    /// ## Test Scenario
    /// - Parses path, refs, output, diff and logging flags
    ///
    /// ## Expected Outcome
    /// - All fields are assigned and the CLI layer carries them as CLI values
    #[test]
    fn test_args_parsing_with_all_flags() {
        let args = parse(&[
            "/tmp/repo",
            "--base",
            "main",
            "--head",
            "feature",
            "-o",
            "json",
            "--no-renames",
            "--rename-threshold",
            "70",
            "--log-level",
            "DEBUG",
            "--log-format",
            "json",
            "--log-file",
            "/tmp/log.txt",
        ]);

        assert_eq!(args.path, Some(PathBuf::from("/tmp/repo")));
        assert_eq!(args.output, Some(OutputFormat::Json));
        assert_eq!(args.log_level, Some(LogLevel::Debug));

        let config = args.cli_config();
        assert_eq!(
            config.find_renames,
            Some(ParsedProperty::Cli(false, "--no-renames".to_string()))
        );
        assert_eq!(
            config.rename_threshold,
            Some(ParsedProperty::Cli(70, "70".to_string()))
        );
        assert_eq!(
            config.log_format,
            Some(ParsedProperty::Cli(LogFormat::Json, "json".to_string()))
        );

        assert_eq!(
            args.input_source().unwrap(),
            InputSource::Git {
                repo: PathBuf::from("/tmp/repo"),
                base: "main".to_string(),
                head: "feature".to_string(),
            }
        );
    }

    /// # Args Validation
    ///
    /// Tests that conflicting or out-of-range arguments are rejected.
    #[test]
    fn test_args_validation() {
        let base = ["pr-changes", "--input", "unit.json", "--base", "main"];
        assert!(Args::try_parse_from(base).is_err());
        assert!(Args::try_parse_from(["pr-changes", "--rename-threshold", "0"]).is_err());
        assert!(Args::try_parse_from(["pr-changes", "--log-level", "loud"]).is_err());

        let json = parse(&["--input", "unit.json"]);
        assert_eq!(
            json.input_source().unwrap(),
            InputSource::Json(PathBuf::from("unit.json"))
        );
        assert!(parse(&[]).input_source().is_err());
        assert_eq!(parse(&[]).cli_config(), Config::empty());
    }

    /// # Review Unit From JSON
    ///
    /// Tests a review unit mixing structured patches and raw diff text.
    ///
    /// ## Test Scenario
    /// - C1 renames a.txt to b.txt (structured), C2 edits b.txt (diff text)
    ///
    /// ## Expected Outcome
    /// - Both commits resolve to the same cumulative change
    #[test]
    fn test_review_unit_from_json() {
        let json = r#"{
            "merge_base": "M",
            "head": "C2",
            "commits": [
                {
                    "sha": "C2",
                    "parents": ["C1"],
                    "direct_patches": "diff --git a/b.txt b/b.txt\n--- a/b.txt\n+++ b/b.txt\n@@ -1 +1,2 @@\n one\n+two\n",
                    "cumulative_patches": "diff --git a/a.txt b/b.txt\nsimilarity index 80%\nrename from a.txt\nrename to b.txt\n--- a/a.txt\n+++ b/b.txt\n@@ -1 +1,2 @@\n one\n+two\n"
                },
                {
                    "sha": "C1",
                    "parents": ["M"],
                    "direct_patches": [
                        {"before_name": "a.txt", "after_name": "b.txt", "kind": {"text": {}}}
                    ],
                    "cumulative_patches": [
                        {"before_name": "a.txt", "after_name": "b.txt", "kind": {"text": {}}}
                    ]
                }
            ]
        }"#;

        let unit: ReviewUnit = serde_json::from_str(json).unwrap();
        assert!(matches!(unit.commits[0].direct_patches, PatchList::Diff(_)));
        assert!(matches!(unit.commits[1].direct_patches, PatchList::Patches(_)));

        let provider = unit.build().unwrap();
        assert!(provider.is_linear_history());
        let first = provider.find_cumulative_change("C1", "a.txt").unwrap();
        let second = provider.find_cumulative_change("C2", "b.txt").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.before(), Some(&Revision::new("a.txt", "M")));
    }

    /// # Review Unit Contract Violations
    ///
    /// Tests that invalid units surface typed errors.
    #[test]
    fn test_review_unit_errors() {
        let unit = ReviewUnit {
            merge_base: "M".to_string(),
            head: "C1".to_string(),
            commits: vec![CommitRecord {
                sha: "C1".to_string(),
                parents: vec!["M".to_string()],
                direct_patches: PatchList::Diff("diff --git a/x b/x\n@@ -1 +1 @@\n".to_string()),
                cumulative_patches: PatchList::default(),
            }],
        };
        let err = unit.build().unwrap_err();
        assert!(matches!(err, PrChangesError::DiffParse(_)));
        assert!(err.is_contract_violation());

        let missing_head = ReviewUnit {
            head: "nope".to_string(),
            commits: vec![CommitRecord {
                direct_patches: PatchList::Patches(vec![Patch::added("x", PatchKind::Other)]),
                ..unit.commits[0].clone()
            }],
            ..unit.clone()
        };
        assert!(matches!(
            missing_head.build(),
            Err(PrChangesError::Changes(ChangesError::HeadNotInGraph { .. }))
        ));

        let duplicate = ReviewUnit {
            commits: vec![unit.commits[0].clone(), unit.commits[0].clone()],
            ..unit.clone()
        };
        assert!(matches!(
            duplicate.build(),
            Err(PrChangesError::Changes(ChangesError::DuplicateCommit { .. }))
        ));
    }

    /// # Patch List Serialization
    ///
    /// Tests that structured patch lists keep their shape through JSON.
    #[test]
    fn test_patch_list_serialization() {
        let list = PatchList::Patches(vec![Patch::modified("a.rs", text())]);
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.starts_with('['));
        let back: PatchList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
    }
}
