//! Rendering of a built change model.
//!
//! [`ChangesReport`] is the serializable view of a [`ChangesProvider`];
//! [`OutputWriter`] prints it as text or JSON.
//!
//! [`ChangesProvider`]: crate::core::changes::ChangesProvider

mod format;
mod report;

pub use format::{OutputFormatter, OutputWriter};
pub use report::{ChangeSummary, ChangesReport, CommitChangeEntry, CommitEntry, CumulativeEntry};
