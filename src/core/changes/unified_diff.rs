//! Parser for `git diff` output in unified format.
//!
//! Produces one [`Patch`] per `diff --git` section. Extended header lines
//! (`new file mode`, `deleted file mode`, `rename from`, `rename to`) and the
//! `---`/`+++` lines determine the paths; hunk bodies are counted against
//! the lengths in their `@@` header. Binary sections become
//! [`PatchKind::Other`]. Lines before the first section are ignored.

use std::sync::OnceLock;

use regex::Regex;

use super::hunk::{Hunk, HunkLine};
use super::patch::{Patch, PatchKind};
use crate::error::DiffParseError;

static HUNK_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_hunk_header_regex() -> &'static Regex {
    HUNK_HEADER_REGEX.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
            .expect("Failed to compile hunk header regex")
    })
}

const DEV_NULL: &str = "/dev/null";

/// Header state of the file section being parsed.
#[derive(Debug, Default)]
struct FileSection {
    start_line: usize,
    before_name: Option<String>,
    after_name: Option<String>,
    new_file: bool,
    deleted_file: bool,
    binary: bool,
    hunks: Vec<Hunk>,
}

impl FileSection {
    fn from_git_header(line_number: usize, names: &str) -> Self {
        let (before_name, after_name) = split_git_header_names(names);
        Self {
            start_line: line_number,
            before_name,
            after_name,
            ..Self::default()
        }
    }

    fn finish(self) -> Result<Patch, DiffParseError> {
        let kind = if self.binary {
            PatchKind::Other
        } else {
            PatchKind::Text { hunks: self.hunks }
        };
        Patch::with_flags(
            self.before_name,
            self.after_name,
            self.new_file,
            self.deleted_file,
            kind,
        )
        .map_err(|_| DiffParseError::MissingPaths {
            line: self.start_line,
        })
    }
}

/// Parses the output of `git diff` into patches.
pub fn parse(text: &str) -> Result<Vec<Patch>, DiffParseError> {
    let mut patches = Vec::new();
    let mut section: Option<FileSection> = None;
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let line_number = index + 1;

        if let Some(names) = line.strip_prefix("diff --git ") {
            if let Some(finished) = section.take() {
                patches.push(finished.finish()?);
            }
            section = Some(FileSection::from_git_header(line_number, names));
            continue;
        }

        let Some(current) = section.as_mut() else {
            continue;
        };

        if line.starts_with("@@") {
            let hunk = parse_hunk_header(line_number, line)?;
            let body = read_hunk_body(&hunk, &mut lines, line_number)?;
            current.hunks.push(hunk.with_lines(body));
        } else if line.starts_with("new file mode") {
            current.new_file = true;
        } else if line.starts_with("deleted file mode") {
            current.deleted_file = true;
        } else if let Some(name) = line.strip_prefix("rename from ") {
            current.before_name = Some(unquote(name));
        } else if let Some(name) = line.strip_prefix("rename to ") {
            current.after_name = Some(unquote(name));
        } else if let Some(name) = line.strip_prefix("--- ") {
            match strip_side_prefix(name, "a/") {
                None => current.new_file = true,
                Some(name) => current.before_name = Some(name),
            }
        } else if let Some(name) = line.strip_prefix("+++ ") {
            match strip_side_prefix(name, "b/") {
                None => current.deleted_file = true,
                Some(name) => current.after_name = Some(name),
            }
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            current.binary = true;
        }
    }

    if let Some(finished) = section.take() {
        patches.push(finished.finish()?);
    }
    Ok(patches)
}

/// Parses an `@@ -a,b +c,d @@` line. Omitted lengths default to 1.
pub fn parse_hunk_header(line_number: usize, line: &str) -> Result<Hunk, DiffParseError> {
    let invalid = || DiffParseError::InvalidHunkHeader {
        line: line_number,
        header: line.to_string(),
    };
    let captures = get_hunk_header_regex().captures(line).ok_or_else(invalid)?;
    let number = |group: usize| -> Result<u32, DiffParseError> {
        match captures.get(group) {
            Some(value) => value.as_str().parse().map_err(|_| invalid()),
            None => Ok(1),
        }
    };
    Ok(Hunk::new(number(1)?, number(2)?, number(3)?, number(4)?))
}

/// Consumes the body lines announced by the hunk header.
fn read_hunk_body<'a>(
    hunk: &Hunk,
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    header_line: usize,
) -> Result<Vec<HunkLine>, DiffParseError> {
    let mut old_remaining = hunk.old_len;
    let mut new_remaining = hunk.new_len;
    let mut body = Vec::new();

    while old_remaining > 0 || new_remaining > 0 {
        let Some((index, line)) = lines.next() else {
            return Err(DiffParseError::TruncatedHunk {
                line: header_line,
                missing: old_remaining.max(new_remaining),
            });
        };

        let (marker, content) = match line.char_indices().nth(1) {
            Some((split, _)) => line.split_at(split),
            None => (line, ""),
        };
        match marker {
            // Some tools strip the trailing space of empty context lines.
            " " | "" if old_remaining > 0 && new_remaining > 0 => {
                old_remaining -= 1;
                new_remaining -= 1;
                body.push(HunkLine::Context(content.to_string()));
            }
            "-" if old_remaining > 0 => {
                old_remaining -= 1;
                body.push(HunkLine::Removed(content.to_string()));
            }
            "+" if new_remaining > 0 => {
                new_remaining -= 1;
                body.push(HunkLine::Added(content.to_string()));
            }
            "\\" => {}
            _ => {
                return Err(DiffParseError::UnexpectedHunkLine {
                    line: index + 1,
                    content: line.to_string(),
                });
            }
        }
    }

    Ok(body)
}

/// Splits `a/<old> b/<new>` from a `diff --git` line.
///
/// Quoted names are read up to their closing quote. Unquoted names are
/// unambiguous when both are equal; otherwise the line splits at the last
/// ` b/`. Renames are corrected by the `rename` and `---`/`+++` lines.
fn split_git_header_names(names: &str) -> (Option<String>, Option<String>) {
    let names = names.trim();
    if names.starts_with('"') {
        let Some((before, rest)) = take_quoted(names) else {
            return (None, None);
        };
        let after = unquote(rest.trim_start());
        return (
            Some(strip_owned_prefix(before, "a/")),
            (!after.is_empty()).then(|| strip_owned_prefix(after, "b/")),
        );
    }
    if let Some(rest) = names.strip_prefix("a/") {
        if let Some(name) = symmetric_name(rest) {
            return (Some(name.to_string()), Some(name.to_string()));
        }
    }
    let before_name = |before: &str| before.strip_prefix("a/").unwrap_or(before).to_string();
    if let Some(split) = names.rfind(" \"b/") {
        let after = unquote(&names[split + 1..]);
        return (
            Some(before_name(&names[..split])),
            Some(strip_owned_prefix(after, "b/")),
        );
    }
    match names.rfind(" b/") {
        Some(split) => (
            Some(before_name(&names[..split])),
            Some(names[split + 3..].to_string()),
        ),
        None => (None, None),
    }
}

fn strip_owned_prefix(name: String, prefix: &str) -> String {
    match name.strip_prefix(prefix) {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// Returns `x` when `rest` reads `x b/x`.
fn symmetric_name(rest: &str) -> Option<&str> {
    let half = rest.len().checked_sub(3)? / 2;
    if !rest.is_char_boundary(half) {
        return None;
    }
    let (before, after) = rest.split_at(half);
    (after.strip_prefix(" b/")? == before).then_some(before)
}

/// Strips the `a/` or `b/` prefix of a `---`/`+++` name, `None` for `/dev/null`.
fn strip_side_prefix(name: &str, prefix: &str) -> Option<String> {
    // git appends a tab before timestamps on some platforms
    let name = name.split('\t').next().unwrap_or(name);
    if name == DEV_NULL {
        return None;
    }
    let name = unquote(name);
    Some(name.strip_prefix(prefix).map(str::to_string).unwrap_or(name))
}

/// Removes the quotes git puts around names with special characters.
fn unquote(name: &str) -> String {
    match take_quoted(name) {
        Some((unquoted, rest)) if rest.is_empty() => unquoted,
        _ => name.to_string(),
    }
}

/// Reads a C-style quoted name at the start of `input`.
///
/// Returns the decoded name and the text after the closing quote. Octal
/// escapes are bytes of the UTF-8 encoded name.
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let inner = input.strip_prefix('"')?;
    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => {
                let name = String::from_utf8_lossy(&bytes).into_owned();
                return Some((name, &inner[index + 1..]));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'a' => bytes.push(0x07),
                    'b' => bytes.push(0x08),
                    't' => bytes.push(b'\t'),
                    'n' => bytes.push(b'\n'),
                    'v' => bytes.push(0x0b),
                    'f' => bytes.push(0x0c),
                    'r' => bytes.push(b'\r'),
                    '0'..='7' => {
                        let mut value = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            match chars.peek().and_then(|(_, digit)| digit.to_digit(8)) {
                                Some(digit) => {
                                    value = value * 8 + digit;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        bytes.push(u8::try_from(value).ok()?);
                    }
                    other => push_char(&mut bytes, other),
                }
            }
            other => push_char(&mut bytes, other),
        }
    }
    None
}

fn push_char(bytes: &mut Vec<u8>, ch: char) {
    let mut buffer = [0; 4];
    bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
}
