//! File patches as supplied by the diff backend.

use serde::{Deserialize, Serialize};

use super::hunk::{DiffRange, Hunk};
use crate::error::ChangesError;

/// The content carried by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    /// A textual diff. Only text patches take part in rename tracking.
    Text {
        #[serde(default)]
        hunks: Vec<Hunk>,
    },
    /// Opaque content, e.g. a binary file.
    Other,
}

/// A single file's diff between two revisions.
///
/// At least one of the before/after names is always present; the
/// constructors and deserialization both enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPatch")]
pub struct Patch {
    before_name: Option<String>,
    after_name: Option<String>,
    new_file: bool,
    deleted_file: bool,
    kind: PatchKind,
}

/// Unvalidated wire form of [`Patch`].
#[derive(Deserialize)]
struct RawPatch {
    #[serde(default)]
    before_name: Option<String>,
    #[serde(default)]
    after_name: Option<String>,
    #[serde(default)]
    new_file: bool,
    #[serde(default)]
    deleted_file: bool,
    kind: PatchKind,
}

impl TryFrom<RawPatch> for Patch {
    type Error = ChangesError;

    fn try_from(raw: RawPatch) -> Result<Self, Self::Error> {
        Self::with_flags(
            raw.before_name,
            raw.after_name,
            raw.new_file,
            raw.deleted_file,
            raw.kind,
        )
    }
}

impl Patch {
    /// Creates a patch, inferring the new/deleted flags from the missing side.
    pub fn new(
        before_name: Option<String>,
        after_name: Option<String>,
        kind: PatchKind,
    ) -> Result<Self, ChangesError> {
        let new_file = before_name.is_none();
        let deleted_file = after_name.is_none();
        Self::with_flags(before_name, after_name, new_file, deleted_file, kind)
    }

    /// Creates a patch with explicit new/deleted flags.
    ///
    /// Fails when neither name is present.
    pub fn with_flags(
        before_name: Option<String>,
        after_name: Option<String>,
        new_file: bool,
        deleted_file: bool,
        kind: PatchKind,
    ) -> Result<Self, ChangesError> {
        if before_name.is_none() && after_name.is_none() {
            return Err(ChangesError::MalformedPatch);
        }
        Ok(Self {
            before_name,
            after_name,
            new_file,
            deleted_file,
            kind,
        })
    }

    /// A newly created file.
    pub fn added(path: impl Into<String>, kind: PatchKind) -> Self {
        Self {
            before_name: None,
            after_name: Some(path.into()),
            new_file: true,
            deleted_file: false,
            kind,
        }
    }

    /// A deleted file.
    pub fn deleted(path: impl Into<String>, kind: PatchKind) -> Self {
        Self {
            before_name: Some(path.into()),
            after_name: None,
            new_file: false,
            deleted_file: true,
            kind,
        }
    }

    /// A file modified in place.
    pub fn modified(path: impl Into<String>, kind: PatchKind) -> Self {
        let path = path.into();
        Self {
            before_name: Some(path.clone()),
            after_name: Some(path),
            new_file: false,
            deleted_file: false,
            kind,
        }
    }

    /// A file moved from one path to another, possibly with edits.
    pub fn renamed(from: impl Into<String>, to: impl Into<String>, kind: PatchKind) -> Self {
        Self {
            before_name: Some(from.into()),
            after_name: Some(to.into()),
            new_file: false,
            deleted_file: false,
            kind,
        }
    }

    /// Path on the before side, or `None` for a newly created file.
    pub fn before_path(&self) -> Option<&str> {
        if self.new_file {
            None
        } else {
            self.before_name.as_deref()
        }
    }

    /// Path on the after side, or `None` for a deleted file.
    pub fn after_path(&self) -> Option<&str> {
        if self.deleted_file {
            None
        } else {
            self.after_name.as_deref()
        }
    }

    /// The path this patch is known by: the after side, falling back to the before side.
    pub fn file_path(&self) -> &str {
        self.after_path()
            .or(self.before_path())
            .or(self.after_name.as_deref())
            .or(self.before_name.as_deref())
            .unwrap_or_default()
    }

    pub fn is_new_file(&self) -> bool {
        self.new_file
    }

    pub fn is_deleted_file(&self) -> bool {
        self.deleted_file
    }

    pub fn kind(&self) -> &PatchKind {
        &self.kind
    }

    /// Returns the hunks of a text patch.
    pub fn hunks(&self) -> Option<&[Hunk]> {
        match &self.kind {
            PatchKind::Text { hunks } => Some(hunks),
            PatchKind::Other => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, PatchKind::Text { .. })
    }

    /// Returns true when the patch moves the file to a different path.
    pub fn is_rename(&self) -> bool {
        match (self.before_path(), self.after_path()) {
            (Some(before), Some(after)) => before != after,
            _ => false,
        }
    }

    /// Changed line ranges of every hunk, empty for non-text patches.
    pub fn diff_ranges(&self) -> Vec<DiffRange> {
        self.hunks()
            .map(|hunks| hunks.iter().map(Hunk::range).collect())
            .unwrap_or_default()
    }
}

/// Convenience for a text patch without hunk data.
pub fn text() -> PatchKind {
    PatchKind::Text { hunks: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # Path Resolution Through Flags
    ///
    /// Tests that new and deleted flags hide the corresponding side.
    #[test]
    fn test_paths_respect_flags() {
        let patch = Patch::with_flags(
            Some("foo.txt".to_string()),
            Some("foo.txt".to_string()),
            true,
            false,
            text(),
        )
        .unwrap();
        assert_eq!(patch.before_path(), None);
        assert_eq!(patch.after_path(), Some("foo.txt"));
        assert_eq!(patch.file_path(), "foo.txt");

        let deleted = Patch::deleted("gone.txt", text());
        assert_eq!(deleted.after_path(), None);
        assert_eq!(deleted.file_path(), "gone.txt");
    }

    /// # Malformed Patch Rejected
    ///
    /// Tests that a patch with neither path is a contract violation.
    #[test]
    fn test_malformed_patch() {
        let result = Patch::new(None, None, PatchKind::Other);
        assert!(matches!(result, Err(ChangesError::MalformedPatch)));
    }

    /// # Deserialization Validates Paths
    ///
    /// Tests that deserialization goes through the same validation.
    #[test]
    fn test_deserialize_validates() {
        let ok: Patch = serde_json::from_str(
            r#"{"before_name": "a.txt", "after_name": "b.txt", "kind": {"text": {}}}"#,
        )
        .unwrap();
        assert!(ok.is_rename());
        assert!(ok.is_text());

        let err = serde_json::from_str::<Patch>(r#"{"kind": "other"}"#);
        assert!(err.is_err());
    }

    /// # Diff Ranges
    ///
    /// Tests that binary patches report no ranges.
    #[test]
    fn test_diff_ranges() {
        let patch = Patch::modified(
            "a.rs",
            PatchKind::Text {
                hunks: vec![Hunk::new(1, 2, 1, 3)],
            },
        );
        assert_eq!(patch.diff_ranges().len(), 1);
        assert!(Patch::added("img.png", PatchKind::Other).diff_ranges().is_empty());
    }
}
