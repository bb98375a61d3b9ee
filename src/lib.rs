//! # pr-changes
//!
//! Reconstructs the file changes of a pull request from its commit graph and
//! per-commit patches. This library provides:
//!
//! - The change model of a review unit, with per-commit and cumulative changes
//! - Correlation of every commit change to its cumulative change across renames
//! - Unified diff parsing and git-backed input loading
//! - Layered configuration and structured logging for the CLI
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pr_changes::ReviewUnit;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let unit = ReviewUnit::load(Path::new("review-unit.json"))?;
//! let provider = unit.build()?;
//!
//! for change in provider.changes() {
//!     println!("{}", change);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod logging;
pub mod models;
pub mod parsed_property;

// Re-export commonly used types for convenience
pub use config::Config;
pub use core::changes::ChangesProvider;
pub use models::{Args, ReviewUnit};

/// Core result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version with the git hash recorded at build time.
pub const VERSION_STRING: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");
