//! Item list parsing.
//!
//! Every section of the deck (achievements, plans, unfinished work, timeline)
//! is authored as a plain text file with one record per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! Fix login bug --Backend
//! Write docs
//! Survey feedback -- Research
//! ```
//!
//! The line is split on the **first** separator (`--` by default). The part
//! before becomes the item name, the part after becomes an optional category
//! badge. Parsing is best-effort by contract: a line never fails to parse. The
//! worst case is a name-only item, and lines that end up with no name at all
//! are dropped and reported as [`MalformedRecord`]s so callers can surface
//! them.
//!
//! ## Section labels
//!
//! Source filenames usually carry the reporting period, e.g.
//! `October Achievements.txt`. [`section_label`] pulls that out with a simple
//! "first capitalized word" rule so it can flow into slide titles.

use serde::Serialize;
use std::path::Path;

/// One parsed text record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Display text.
    pub name: String,
    /// Optional short tag rendered as a badge. Never `Some("")`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Position in the parsed output, 0-based. Drives page order.
    pub origin_index: usize,
}

/// A line that could only be parsed in degraded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    /// 1-based line number in the source.
    pub line: usize,
    pub text: String,
    pub reason: MalformedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    /// Nothing left before the separator; the line was dropped.
    EmptyName,
    /// A separator was present but nothing followed it; the item has no category.
    EmptyCategory,
}

/// Items plus the degraded lines encountered while producing them.
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords {
    pub items: Vec<Item>,
    pub malformed: Vec<MalformedRecord>,
}

/// Line syntax for record files.
#[derive(Debug, Clone)]
pub struct RecordSyntax {
    pub separator: String,
    pub comment_prefix: String,
}

impl Default for RecordSyntax {
    fn default() -> Self {
        Self {
            separator: "--".to_string(),
            comment_prefix: "#".to_string(),
        }
    }
}

impl RecordSyntax {
    fn is_comment(&self, trimmed: &str) -> bool {
        !self.comment_prefix.is_empty() && trimmed.starts_with(&self.comment_prefix)
    }
}

/// Parse record lines into items, preserving source order.
///
/// Blank and comment lines are skipped silently. Everything else yields an
/// item unless its name is empty after trimming.
pub fn parse_records<'a, I>(lines: I, syntax: &RecordSyntax) -> ParsedRecords
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = ParsedRecords::default();

    for (idx, raw) in lines.into_iter().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || syntax.is_comment(trimmed) {
            continue;
        }

        let (name, category) = split_record(trimmed, &syntax.separator);

        if name.is_empty() {
            parsed.malformed.push(MalformedRecord {
                line: idx + 1,
                text: trimmed.to_string(),
                reason: MalformedReason::EmptyName,
            });
            continue;
        }

        let category = match category {
            Some(c) if c.is_empty() => {
                parsed.malformed.push(MalformedRecord {
                    line: idx + 1,
                    text: trimmed.to_string(),
                    reason: MalformedReason::EmptyCategory,
                });
                None
            }
            Some(c) => Some(c.to_string()),
            None => None,
        };

        let origin_index = parsed.items.len();
        parsed.items.push(Item {
            name: name.to_string(),
            category,
            origin_index,
        });
    }

    parsed
}

/// Convenience wrapper over [`parse_records`] for a whole file body.
///
/// A leading byte order mark is dropped.
pub fn parse_text(text: &str, syntax: &RecordSyntax) -> ParsedRecords {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_records(text.lines(), syntax)
}

/// Split on the first separator. Both halves come back trimmed.
fn split_record<'a>(line: &'a str, separator: &str) -> (&'a str, Option<&'a str>) {
    if separator.is_empty() {
        return (line.trim(), None);
    }
    match line.split_once(separator) {
        Some((name, category)) => (name.trim(), Some(category.trim())),
        None => (line.trim(), None),
    }
}

/// Extract a section label from a source filename.
///
/// Returns the first whitespace/underscore/dash separated token of the stem
/// that starts with an uppercase letter:
/// - `October Achievements.txt` → `Some("October")`
/// - `november_plans.txt` → `None`
/// - `notCompletedKPIS.txt` → `None`
pub fn section_label(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let first = stem
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .find(|t| !t.is_empty())?;
    let starts_upper = first.chars().next().is_some_and(char::is_uppercase);
    let alphabetic = first.chars().all(char::is_alphabetic);
    let has_lower = first.chars().any(char::is_lowercase);
    (starts_upper && alphabetic && has_lower).then(|| first.to_string())
}
