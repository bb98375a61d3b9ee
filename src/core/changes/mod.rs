//! Reconstruction of a review unit's changes from its commits and patches.
//!
//! A review unit is the set of commits between a merge base and a head.
//! [`ChangesProvider`] builds, once per unit:
//!
//! - the changes of every commit,
//! - the cumulative changes from the merge base to the head,
//! - a [`DiffData`] index relating both views through each file's lineage,
//!   so that a file seen in any commit can be mapped to its cumulative change
//!   even across renames.

mod change;
mod commit;
mod diff_data;
mod history;
mod hunk;
mod patch;
mod provider;
pub mod unified_diff;

pub use change::{Change, ChangeType, Revision};
pub use commit::{Commit, CommitGraph, CommitPatches, CommitWithPatches};
pub use diff_data::DiffData;
pub use history::{FileHistory, GraphFileHistory, LinearFileHistory, LinearFileHistoryBuilder};
pub use hunk::{DiffRange, Direction, Hunk, HunkLine, LineRange, transfer_line};
pub use patch::{Patch, PatchKind, text};
pub use provider::{ChangesProvider, is_linear_history};
