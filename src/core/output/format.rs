//! Output formatters for the text and JSON output modes.

use super::report::{ChangesReport, CommitChangeEntry};
use crate::models::OutputFormat;
use std::io::{self, Write};

/// Trait for formatting and writing reports.
pub trait OutputFormatter {
    /// Writes a complete report.
    fn write_report(&mut self, report: &ChangesReport) -> io::Result<()>;

    /// Flushes any buffered output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Writer that renders reports as text or JSON.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> OutputWriter<W> {
    /// Creates a writer for the given output format.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Returns the output format.
    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// Writes a line of text.
    fn writeln(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)
    }

    fn write_text_report(&mut self, report: &ChangesReport) -> io::Result<()> {
        self.writeln(&format!("Merge base: {}", report.merge_base))?;
        self.writeln(&format!("Head:       {}", report.head))?;
        let history = if report.linear_history {
            "linear"
        } else {
            "with merges"
        };
        self.writeln(&format!("History:    {}", history))?;
        self.writeln("")?;

        for commit in &report.commits {
            self.writeln(&format!(
                "Commit {} (parents: {})",
                commit.sha,
                commit.parents.join(", ")
            ))?;
            if commit.changes.is_empty() {
                self.writeln("  (no changes)")?;
            }
            for entry in &commit.changes {
                self.writeln(&format!("  {}", Self::format_commit_change(entry)))?;
            }
        }

        self.writeln("")?;
        self.writeln(&format!(
            "Cumulative changes ({}):",
            report.cumulative_changes.len()
        ))?;
        for entry in &report.cumulative_changes {
            let suffix = if entry.bound { "" } else { " (unbound)" };
            self.writeln(&format!("  {}{}", entry.change, suffix))?;
        }
        Ok(())
    }

    fn format_commit_change(entry: &CommitChangeEntry) -> String {
        match &entry.cumulative {
            Some(cumulative) => format!("{} => {}", entry.change, cumulative),
            None => format!("{} (uncorrelated)", entry.change),
        }
    }
}

impl<W: Write> OutputFormatter for OutputWriter<W> {
    fn write_report(&mut self, report: &ChangesReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text_report(report),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
                self.writeln(&json)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::changes::ChangeType;
    use crate::core::output::report::{ChangeSummary, CommitEntry, CumulativeEntry};
    use insta::assert_snapshot;

    fn summary(status: ChangeType, before: Option<&str>, after: Option<&str>) -> ChangeSummary {
        ChangeSummary {
            status,
            before: before.map(str::to_string),
            after: after.map(str::to_string),
        }
    }

    fn sample_report() -> ChangesReport {
        let rename = summary(ChangeType::Rename, Some("a.txt"), Some("b.txt"));
        ChangesReport {
            merge_base: "BASE".to_string(),
            head: "C3".to_string(),
            linear_history: false,
            commits: vec![
                CommitEntry {
                    sha: "C1".to_string(),
                    parents: vec!["BASE".to_string()],
                    changes: vec![
                        CommitChangeEntry {
                            change: rename.clone(),
                            cumulative: Some(rename.clone()),
                        },
                        CommitChangeEntry {
                            change: summary(ChangeType::Add, None, Some("tmp.txt")),
                            cumulative: None,
                        },
                    ],
                },
                CommitEntry {
                    sha: "C2".to_string(),
                    parents: vec!["BASE".to_string()],
                    changes: vec![CommitChangeEntry {
                        change: summary(ChangeType::Modify, Some("b.txt"), Some("b.txt")),
                        cumulative: Some(rename.clone()),
                    }],
                },
                CommitEntry {
                    sha: "C3".to_string(),
                    parents: vec!["C1".to_string(), "C2".to_string()],
                    changes: vec![],
                },
            ],
            cumulative_changes: vec![
                CumulativeEntry {
                    change: rename,
                    bound: true,
                },
                CumulativeEntry {
                    change: summary(ChangeType::Modify, Some("logo.png"), Some("logo.png")),
                    bound: false,
                },
            ],
        }
    }

    /// # Text Report
    ///
    /// Verifies the text rendering of a report.
    ///
    /// ## Test Scenario
    /// - Writes a report with a merge commit, an uncorrelated change and an unbound change
    ///
    /// ## Expected Outcome
    /// - Header, per-commit correlation and cumulative list match the snapshot
    #[test]
    fn test_text_report() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Text);
        writer.write_report(&sample_report()).unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_snapshot!(output, @r"
        Merge base: BASE
        Head:       C3
        History:    with merges

        Commit C1 (parents: BASE)
          R a.txt -> b.txt => R a.txt -> b.txt
          A tmp.txt (uncorrelated)
        Commit C2 (parents: BASE)
          M b.txt => R a.txt -> b.txt
        Commit C3 (parents: C1, C2)
          (no changes)

        Cumulative changes (2):
          R a.txt -> b.txt
          M logo.png (unbound)
        ");
    }

    /// # JSON Report
    ///
    /// Verifies the JSON formatter writes the report as a single document.
    ///
    /// ## Expected Outcome
    /// - Output parses back into an equal report
    #[test]
    fn test_json_report() {
        let report = sample_report();
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json);
        assert_eq!(writer.format(), &OutputFormat::Json);
        writer.write_report(&report).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let parsed: ChangesReport = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, report);
        assert!(output.contains("\"linear_history\": false"));
    }
}
