//! Core of pr-changes.
//!
//! - [`changes`]: the change model of a review unit
//! - [`output`]: rendering a built model as text or JSON
//! - [`ExitCode`]: process exit codes of the CLI

pub mod changes;
pub mod output;

use crate::error::PrChangesError;

/// Exit codes of the `pr-changes` binary.
///
/// Automation can tell broken input (2) apart from environment failures (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// The report was written.
    Success = 0,

    /// General error (configuration, git, I/O, etc.).
    GeneralError = 1,

    /// The review unit violates the input contract.
    InvalidInput = 2,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Changes reported successfully",
            ExitCode::GeneralError => "General error occurred",
            ExitCode::InvalidInput => "The review unit is malformed",
        }
    }

    /// Picks the exit code for a failed run.
    pub fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<PrChangesError>() {
            Some(e) if e.is_contract_violation() => ExitCode::InvalidInput,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
