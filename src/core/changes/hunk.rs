//! Hunk data carried by text patches and line transfer across a patch.

use serde::{Deserialize, Serialize};

/// A range of lines in a file.
///
/// Both `start` and `end` are inclusive (1-indexed, matching git output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// Starting line number (1-indexed, inclusive).
    pub start: u32,
    /// Ending line number (1-indexed, inclusive).
    pub end: u32,
}

impl LineRange {
    /// Creates a new line range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Creates a line range for a single line.
    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    /// Checks if the range contains the given line.
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Returns the number of lines in this range.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Returns true if the range is empty (which shouldn't happen in practice).
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// A single line inside a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "text")]
pub enum HunkLine {
    /// Present on both sides.
    Context(String),
    /// Present only on the after side.
    Added(String),
    /// Present only on the before side.
    Removed(String),
}

/// One contiguous block of changes, as described by an `@@ -a,b +c,d @@` header.
///
/// For an empty side (`len == 0`) git reports `start` as the line *preceding*
/// the hunk, so `@@ -10,0 +11,2 @@` inserts two lines after old line 10.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    #[serde(default)]
    pub lines: Vec<HunkLine>,
}

/// Which way a line number is carried across a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the before side to the after side.
    Forward,
    /// From the after side to the before side.
    Backward,
}

/// Changed line ranges of a hunk on both sides.
///
/// A side is `None` when the hunk has no lines there (pure insertion or
/// pure removal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    pub before: Option<LineRange>,
    pub after: Option<LineRange>,
}

impl Hunk {
    /// Creates a hunk without line content.
    pub fn new(old_start: u32, old_len: u32, new_start: u32, new_len: u32) -> Self {
        Self {
            old_start,
            old_len,
            new_start,
            new_len,
            lines: Vec::new(),
        }
    }

    /// Attaches line content to the hunk.
    pub fn with_lines(mut self, lines: Vec<HunkLine>) -> Self {
        self.lines = lines;
        self
    }

    /// Returns the ranges covered by this hunk on each side.
    pub fn range(&self) -> DiffRange {
        DiffRange {
            before: side_range(self.old_start, self.old_len),
            after: side_range(self.new_start, self.new_len),
        }
    }

    /// (start, len) of the side a line is read from, then of the side it lands on.
    fn sides(&self, direction: Direction) -> ((u32, u32), (u32, u32)) {
        match direction {
            Direction::Forward => (
                (self.old_start, self.old_len),
                (self.new_start, self.new_len),
            ),
            Direction::Backward => (
                (self.new_start, self.new_len),
                (self.old_start, self.old_len),
            ),
        }
    }

    /// Maps a line that falls inside this hunk by walking its lines.
    fn transfer_inside(&self, line: u32, direction: Direction) -> Option<u32> {
        let ((from_start, _), (to_start, _)) = self.sides(direction);
        let mut from = from_start;
        let mut to = to_start;

        for hunk_line in &self.lines {
            let (on_from, on_to) = match (hunk_line, direction) {
                (HunkLine::Context(_), _) => (true, true),
                (HunkLine::Removed(_), Direction::Forward)
                | (HunkLine::Added(_), Direction::Backward) => (true, false),
                (HunkLine::Added(_), Direction::Forward)
                | (HunkLine::Removed(_), Direction::Backward) => (false, true),
            };

            if on_from && from == line {
                return on_to.then_some(to);
            }
            if on_from {
                from += 1;
            }
            if on_to {
                to += 1;
            }
        }

        None
    }
}

fn side_range(start: u32, len: u32) -> Option<LineRange> {
    (len > 0).then(|| LineRange::new(start, start + len - 1))
}

/// First line of a side and the line just past it.
fn side_bounds(start: u32, len: u32) -> (u32, u32) {
    if len == 0 {
        (start + 1, start + 1)
    } else {
        (start, start + len)
    }
}

/// Carries a 1-indexed line number across a patch.
///
/// Lines outside every hunk shift by the size difference of the hunks above
/// them. Context lines inside a hunk map to their counterpart; added or
/// removed lines have none and yield `None`. Hunks must be ordered and
/// non-overlapping, as git emits them.
pub fn transfer_line(hunks: &[Hunk], line: u32, direction: Direction) -> Option<u32> {
    let mut delta: i64 = 0;

    for hunk in hunks {
        let ((from_start, from_len), (to_start, to_len)) = hunk.sides(direction);
        let (from_first, from_end) = side_bounds(from_start, from_len);
        let (_, to_end) = side_bounds(to_start, to_len);

        if line < from_first {
            break;
        }
        if line < from_end {
            return hunk.transfer_inside(line, direction);
        }
        delta = i64::from(to_end) - i64::from(from_end);
    }

    u32::try_from(i64::from(line) + delta).ok()
}
