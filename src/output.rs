//! CLI output formatting for `build` and `check`.
//!
//! Every report is produced by a pure `format_*` function returning lines,
//! with a thin `print_*` wrapper for stdout. Logging goes to stderr through
//! `tracing`; what is printed here is the report itself, so it stays clean
//! when piped.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! October Achievements (8 items, 2 slides, 5 images)
//!     Slide 1: 6 items
//!     Slide 2: 2 items
//! November Plans (3 items, 1 slide)
//!     Slide 1: 3 items
//! Team (4 members)
//! Slots: title, subtitle, accomplished-count
//!
//! Warnings
//!     no image for 'Billing' (suggested filename: Billing-01.png)
//!
//! Wrote October-KPI.html: 11 items, 3 slides, 5 images (7/8 items matched)
//! ```
//!
//! ## Check
//!
//! ```text
//! Sections
//! 001 accomplished: October Achievements.txt (8 items)
//! 002 planned: November Plans.txt (3 items)
//!
//! Images
//! 001 Login page → Login page-01.png, Login page-02.png (1.00)
//! 002 Billing → no match
//!     Closest: Reports (0.41)
//!     Suggested filename: Billing-01.png
//! Background: background.svg
//! Team photos: TeamMember-01.png, TeamMember-02.png
//! ```

use crate::deck::{BuildSummary, CheckReport, Diagnostic, ItemMatch, SectionSummary};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn section_header(section: &SectionSummary) -> String {
    let mut detail = vec![
        plural(section.items, "item", "items"),
        plural(section.pages.len(), "slide", "slides"),
    ];
    if section.images > 0 {
        detail.push(plural(section.images, "image", "images"));
    }
    format!("{} ({})", section.title, detail.join(", "))
}

fn warning_lines(diagnostics: &[Diagnostic]) -> Vec<String> {
    if diagnostics.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Warnings".to_string()];
    lines.extend(diagnostics.iter().map(|d| format!("    {d}")));
    lines
}

fn match_lines(index: usize, item: &ItemMatch) -> Vec<String> {
    match item.score {
        Some(score) => vec![format!(
            "{} {} \u{2192} {} ({:.2})",
            format_index(index),
            item.item,
            item.files.join(", "),
            score
        )],
        None => {
            let mut lines = vec![format!("{} {} \u{2192} no match", format_index(index), item.item)];
            if let Some(best) = &item.best {
                lines.push(format!("    Closest: {} ({:.2})", best.label, best.score));
            }
            if let Some(suggested) = &item.suggested_filename {
                lines.push(format!("    Suggested filename: {suggested}"));
            }
            lines
        }
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(summary: &BuildSummary) -> Vec<String> {
    let mut lines = Vec::new();

    for section in &summary.sections {
        lines.push(section_header(section));
        for (idx, size) in section.pages.iter().enumerate() {
            lines.push(format!("    Slide {}: {}", idx + 1, plural(*size, "item", "items")));
        }
    }
    if summary.team_members > 0 {
        lines.push(format!("Team ({})", plural(summary.team_members, "member", "members")));
    }
    if !summary.slots_filled.is_empty() {
        lines.push(format!("Slots: {}", summary.slots_filled.join(", ")));
    }

    lines.extend(warning_lines(&summary.diagnostics));

    let items: usize = summary.sections.iter().map(|s| s.items).sum();
    let slides: usize = summary.sections.iter().map(|s| s.pages.len()).sum();
    let target = summary
        .output
        .as_deref()
        .map(file_name)
        .unwrap_or_else(|| "deck".to_string());
    lines.push(String::new());
    lines.push(format!(
        "Wrote {}: {}, {}, {} ({}/{} items matched)",
        target,
        plural(items, "item", "items"),
        plural(slides, "slide", "slides"),
        plural(summary.images_embedded, "image", "images"),
        summary.items_matched,
        summary.items_matched + summary.items_unmatched
    ));

    lines
}

pub fn print_build_output(summary: &BuildSummary) {
    for line in format_build_output(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec!["Sections".to_string()];
    for (idx, section) in report.sections.iter().enumerate() {
        lines.push(format!(
            "{} {}: {} ({})",
            format_index(idx + 1),
            section.section,
            file_name(&section.file),
            plural(section.items, "item", "items")
        ));
    }

    lines.push(String::new());
    lines.push("Images".to_string());
    if report.matches.is_empty() {
        lines.push("    (no accomplished items)".to_string());
    }
    for (idx, item) in report.matches.iter().enumerate() {
        lines.extend(match_lines(idx + 1, item));
    }
    if let Some(background) = &report.background {
        lines.push(format!("Background: {background}"));
    }
    if !report.team_photos.is_empty() {
        lines.push(format!("Team photos: {}", report.team_photos.join(", ")));
    }

    let unclaimed: Vec<&Diagnostic> = report
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::UnclaimedAssetGroup { .. }))
        .collect();
    let matched = report.matches.iter().filter(|m| m.score.is_some()).count();
    lines.extend(warning_lines(&report.diagnostics));
    lines.push(String::new());
    lines.push(format!(
        "{}/{} items matched, {} unused",
        matched,
        report.matches.len(),
        plural(unclaimed.len(), "image group", "image groups")
    ));

    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{BestCandidate, SectionKind, SectionReport};
    use std::path::PathBuf;

    fn summary() -> BuildSummary {
        BuildSummary {
            output: Some(PathBuf::from("/tmp/deck/October-KPI.html")),
            sections: vec![
                SectionSummary {
                    section: SectionKind::Accomplished,
                    title: "October Achievements".into(),
                    items: 8,
                    pages: vec![6, 2],
                    images: 5,
                },
                SectionSummary {
                    section: SectionKind::Planned,
                    title: "November Plans".into(),
                    items: 1,
                    pages: vec![1],
                    images: 0,
                },
            ],
            team_members: 0,
            images_embedded: 5,
            items_matched: 7,
            items_unmatched: 1,
            slots_filled: vec!["title".into(), "subtitle".into()],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn build_output_lists_sections_and_slides() {
        let lines = format_build_output(&summary());
        assert_eq!(lines[0], "October Achievements (8 items, 2 slides, 5 images)");
        assert_eq!(lines[1], "    Slide 1: 6 items");
        assert_eq!(lines[2], "    Slide 2: 2 items");
        assert_eq!(lines[3], "November Plans (1 item, 1 slide)");
        assert_eq!(lines[4], "    Slide 1: 1 item");
        assert_eq!(lines[5], "Slots: title, subtitle");
    }

    #[test]
    fn build_output_summary_line() {
        let lines = format_build_output(&summary());
        assert_eq!(
            lines.last().unwrap(),
            "Wrote October-KPI.html: 9 items, 3 slides, 5 images (7/8 items matched)"
        );
        assert!(!lines.iter().any(|l| l == "Warnings"));
    }

    #[test]
    fn build_output_lists_warnings() {
        let mut s = summary();
        s.team_members = 2;
        s.diagnostics.push(Diagnostic::MissingRegion {
            region: "timeline".into(),
        });
        let lines = format_build_output(&s);
        assert!(lines.contains(&"Team (2 members)".to_string()));
        let warnings = lines.iter().position(|l| l == "Warnings").unwrap();
        assert_eq!(
            lines[warnings + 1],
            "    template has no 'timeline' region, section not rendered"
        );
    }

    #[test]
    fn check_output_matched_and_unmatched() {
        let report = CheckReport {
            sections: vec![SectionReport {
                section: SectionKind::Accomplished,
                file: PathBuf::from("deck/October Achievements.txt"),
                label: Some("October".into()),
                items: 2,
            }],
            matches: vec![
                ItemMatch {
                    item: "Login page".into(),
                    files: vec!["Login page-01.png".into(), "Login page-02.png".into()],
                    score: Some(1.0),
                    best: None,
                    suggested_filename: None,
                },
                ItemMatch {
                    item: "Billing".into(),
                    files: vec![],
                    score: None,
                    best: Some(BestCandidate {
                        label: "Reports".into(),
                        score: 0.4,
                    }),
                    suggested_filename: Some("Billing-01.png".into()),
                },
            ],
            background: Some("background.svg".into()),
            team_photos: vec![],
            diagnostics: vec![Diagnostic::UnclaimedAssetGroup {
                group: "Reports".into(),
                files: vec!["Reports.png".into()],
            }],
        };
        let lines = format_check_output(&report);
        assert_eq!(lines[1], "001 accomplished: October Achievements.txt (2 items)");
        assert!(lines.contains(
            &"001 Login page \u{2192} Login page-01.png, Login page-02.png (1.00)".to_string()
        ));
        assert!(lines.contains(&"002 Billing \u{2192} no match".to_string()));
        assert!(lines.contains(&"    Closest: Reports (0.40)".to_string()));
        assert!(lines.contains(&"    Suggested filename: Billing-01.png".to_string()));
        assert!(lines.contains(&"Background: background.svg".to_string()));
        assert_eq!(lines.last().unwrap(), "1/2 items matched, 1 image group unused");
    }
}
