//! In-place editing of the template document.
//!
//! The template is an ordinary HTML file written by hand. It is never parsed
//! into a tree and re-serialized; instead a handful of marked spans are
//! located by bounded, leftmost-first, non-greedy search and only their
//! interiors are rewritten. Every byte outside those interiors survives
//! untouched, which is what lets a generated deck be diffed against its
//! template and promoted to become the next template.
//!
//! ## Regions
//!
//! A region is a named, repeatable block:
//!
//! ```html
//! <!-- deck:accomplished -->
//!   ...replaced...
//! <!-- /deck:accomplished -->
//! ```
//!
//! Occurrences are processed one at a time, left to right. After each
//! replacement the search resumes right after the end marker of the region
//! just written, so a fragment can never swallow the next region's marker
//! and a region is never visited twice. Before anything is rewritten the
//! markers are validated: start and end counts must agree and a region must
//! not contain another start marker of the same name.
//!
//! ## Slots
//!
//! A slot is a single scalar value identified by a unique label:
//!
//! ```html
//! <title data-slot="title">Monthly KPI</title>
//! <style> :root { --bg-image: /*slot:background*/none/*/slot*/; } </style>
//! ```
//!
//! The element form replaces the element's text (which may not contain
//! tags) and HTML-escapes the value. The comment form is for CSS and script
//! contexts and inserts the value verbatim. Both forms count together, and
//! anything other than exactly one occurrence is an error: there is no
//! sensible way to pick between two candidates.

use maud::html;
use regex::Regex;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("invalid anchor name '{0}' (use lowercase letters, digits and dashes)")]
    InvalidName(String),
    #[error("mandatory region '{0}' not found in template")]
    MissingRegion(String),
    #[error("region '{name}' is unbalanced: {opens} start marker(s), {closes} end marker(s)")]
    UnbalancedAnchor {
        name: String,
        opens: usize,
        closes: usize,
    },
    #[error("region '{name}' opened at byte {outer} contains another '{name}' region at byte {inner}")]
    NestedAnchor {
        name: String,
        outer: usize,
        inner: usize,
    },
    #[error("slot '{label}' found {count} time(s) in template, expected exactly one")]
    AmbiguousAnchor { label: String, count: usize },
}

/// Whether a region must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Mandatory,
    Optional,
}

/// What happened to a region kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    Replaced(usize),
    /// Optional region absent from the template. Not an error.
    Missing,
}

/// Byte offsets of one region occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSpan {
    pub outer: Range<usize>,
    pub inner: Range<usize>,
}

fn check_name(name: &str) -> Result<(), TemplateError> {
    let valid = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}

fn compile(pattern: &str) -> Regex {
    // Patterns are built from validated names and regex::escape, so they
    // always compile.
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("anchor pattern {pattern}: {e}"))
}

struct RegionMarkers {
    open: Regex,
    close: Regex,
}

impl RegionMarkers {
    fn new(name: &str) -> Result<Self, TemplateError> {
        check_name(name)?;
        let name = regex::escape(name);
        Ok(Self {
            open: compile(&format!(r"<!--\s*deck:{name}\s*-->")),
            close: compile(&format!(r"<!--\s*/deck:{name}\s*-->")),
        })
    }
}

/// Locate and validate every occurrence of a region, left to right.
pub fn locate_regions(doc: &str, name: &str) -> Result<Vec<RegionSpan>, TemplateError> {
    let markers = RegionMarkers::new(name)?;
    let opens = markers.open.find_iter(doc).count();
    let closes = markers.close.find_iter(doc).count();
    if opens != closes {
        return Err(TemplateError::UnbalancedAnchor {
            name: name.to_string(),
            opens,
            closes,
        });
    }

    let mut spans = Vec::with_capacity(opens);
    let mut cursor = 0;
    while let Some(open) = markers.open.find_at(doc, cursor) {
        let close = markers.close.find_at(doc, open.end()).ok_or_else(|| {
            TemplateError::UnbalancedAnchor {
                name: name.to_string(),
                opens,
                closes,
            }
        })?;
        if let Some(inner_open) = markers.open.find_at(doc, open.end())
            && inner_open.start() < close.start()
        {
            return Err(TemplateError::NestedAnchor {
                name: name.to_string(),
                outer: open.start(),
                inner: inner_open.start(),
            });
        }
        spans.push(RegionSpan {
            outer: open.start()..close.end(),
            inner: open.end()..close.start(),
        });
        cursor = close.end();
    }

    // A close marker before its open marker leaves counts equal but pairs
    // nothing up correctly.
    if spans.len() != opens {
        return Err(TemplateError::UnbalancedAnchor {
            name: name.to_string(),
            opens,
            closes,
        });
    }
    if let Some(first_close) = markers.close.find(doc)
        && spans.first().is_some_and(|s| first_close.end() <= s.outer.start)
    {
        return Err(TemplateError::UnbalancedAnchor {
            name: name.to_string(),
            opens,
            closes,
        });
    }

    Ok(spans)
}

/// Break up `/*` in generated HTML so user text can never read as a
/// comment-form slot. `&#42;` renders as `*`.
pub fn inert(html: &str) -> String {
    html.replace("/*", "/&#42;")
}

/// Slot patterns for both syntaxes.
struct SlotPatterns {
    element: Regex,
    comment: Regex,
}

impl SlotPatterns {
    fn new(label: &str) -> Result<Self, TemplateError> {
        check_name(label)?;
        let label = regex::escape(label);
        Ok(Self {
            element: compile(&format!(
                r#"<[A-Za-z][A-Za-z0-9-]*(?:\s[^>]*?)?\sdata-slot\s*=\s*"{label}"[^>]*>([^<]*)</"#
            )),
            comment: compile(&format!(r"(?s)/\*\s*slot:{label}\s*\*/(.*?)/\*\s*/slot\s*\*/")),
        })
    }

    /// Interior ranges of every match, plus whether each is element form.
    fn interiors(&self, doc: &str) -> Vec<(Range<usize>, bool)> {
        let mut found: Vec<(Range<usize>, bool)> = self
            .element
            .captures_iter(doc)
            .filter_map(|c| c.get(1).map(|m| (m.range(), true)))
            .chain(
                self.comment
                    .captures_iter(doc)
                    .filter_map(|c| c.get(1).map(|m| (m.range(), false))),
            )
            .collect();
        found.sort_by_key(|(r, _)| r.start);
        found
    }
}

/// The document being assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    buffer: String,
}

impl TemplateDocument {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            buffer: contents.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Rewrite the interior of every occurrence of region `name`.
    ///
    /// `render` receives the 0-based occurrence number and the current
    /// interior and returns the new interior. Returning the interior
    /// unchanged leaves the document byte-identical.
    pub fn replace_region<F>(
        &mut self,
        name: &str,
        requirement: Requirement,
        mut render: F,
    ) -> Result<RegionOutcome, TemplateError>
    where
        F: FnMut(usize, &str) -> String,
    {
        let spans = locate_regions(&self.buffer, name)?;
        if spans.is_empty() {
            return match requirement {
                Requirement::Mandatory => Err(TemplateError::MissingRegion(name.to_string())),
                Requirement::Optional => Ok(RegionOutcome::Missing),
            };
        }

        let markers = RegionMarkers::new(name)?;
        let mut cursor = 0;
        let mut replaced = 0;
        while let Some(open) = markers.open.find_at(&self.buffer, cursor) {
            let Some(close) = markers.close.find_at(&self.buffer, open.end()) else {
                break;
            };
            let (inner_start, inner_end, close_len) = (open.end(), close.start(), close.len());
            let fragment = render(replaced, &self.buffer[inner_start..inner_end]);
            self.buffer.replace_range(inner_start..inner_end, &fragment);
            cursor = inner_start + fragment.len() + close_len;
            replaced += 1;
            if replaced == spans.len() {
                break;
            }
        }

        debug!(region = name, occurrences = replaced, "replaced region");
        Ok(RegionOutcome::Replaced(replaced))
    }

    /// Number of times slot `label` occurs, across both syntaxes.
    pub fn slot_count(&self, label: &str) -> Result<usize, TemplateError> {
        Ok(SlotPatterns::new(label)?.interiors(&self.buffer).len())
    }

    /// Replace the value of a unique slot.
    pub fn replace_slot(&mut self, label: &str, value: &str) -> Result<(), TemplateError> {
        let patterns = SlotPatterns::new(label)?;
        let found = patterns.interiors(&self.buffer);
        let [(range, is_element)] = found.as_slice() else {
            return Err(TemplateError::AmbiguousAnchor {
                label: label.to_string(),
                count: found.len(),
            });
        };

        let replacement = if *is_element {
            inert(&html! { (value) }.into_string())
        } else {
            value.to_string()
        };
        self.buffer.replace_range(range.clone(), &replacement);
        debug!(slot = label, "replaced slot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<html>\n<body>\n<!-- deck:items -->old one<!-- /deck:items -->\n<p>keep</p>\n<!--deck:items-->old two<!--/deck:items-->\n</body>\n</html>\n";

    #[test]
    fn locates_regions_in_order() {
        let spans = locate_regions(DOC, "items").unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(&DOC[spans[0].inner.clone()], "old one");
        assert_eq!(&DOC[spans[1].inner.clone()], "old two");
        assert!(spans[0].outer.end <= spans[1].outer.start);
    }

    #[test]
    fn replaces_each_occurrence_with_its_fragment() {
        let mut doc = TemplateDocument::new(DOC);
        let outcome = doc
            .replace_region("items", Requirement::Mandatory, |n, _| format!("new {n}"))
            .unwrap();
        assert_eq!(outcome, RegionOutcome::Replaced(2));
        assert_eq!(
            doc.as_str(),
            "<html>\n<body>\n<!-- deck:items -->new 0<!-- /deck:items -->\n<p>keep</p>\n<!--deck:items-->new 1<!--/deck:items-->\n</body>\n</html>\n"
        );
    }

    #[test]
    fn identity_replacement_is_byte_identical() {
        let mut doc = TemplateDocument::new(DOC);
        doc.replace_region("items", Requirement::Mandatory, |_, inner| inner.to_string())
            .unwrap();
        assert_eq!(doc.as_str(), DOC);
    }

    #[test]
    fn fragment_containing_markers_is_not_reprocessed() {
        let mut doc = TemplateDocument::new(DOC);
        let mut calls = 0;
        doc.replace_region("items", Requirement::Mandatory, |_, _| {
            calls += 1;
            "<!-- deck:items -->sneaky<!-- /deck:items -->".to_string()
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert!(doc.as_str().contains("<p>keep</p>"));
    }

    #[test]
    fn bytes_outside_regions_unchanged() {
        let mut doc = TemplateDocument::new(DOC);
        doc.replace_region("items", Requirement::Mandatory, |_, _| "X".repeat(50))
            .unwrap();
        let out = doc.as_str();
        assert!(out.starts_with("<html>\n<body>\n<!-- deck:items -->"));
        assert!(out.ends_with("<!--/deck:items-->\n</body>\n</html>\n"));
        assert!(out.contains("<!-- /deck:items -->\n<p>keep</p>\n<!--deck:items-->"));
    }

    #[test]
    fn sibling_regions_of_other_kinds_untouched() {
        let src = "<!-- deck:a -->1<!-- /deck:a --><!-- deck:ab -->2<!-- /deck:ab -->";
        let mut doc = TemplateDocument::new(src);
        doc.replace_region("a", Requirement::Mandatory, |_, _| "x".into())
            .unwrap();
        assert_eq!(
            doc.as_str(),
            "<!-- deck:a -->x<!-- /deck:a --><!-- deck:ab -->2<!-- /deck:ab -->"
        );
    }

    #[test]
    fn missing_optional_region_is_reported_not_error() {
        let mut doc = TemplateDocument::new("<p>nothing</p>");
        let outcome = doc
            .replace_region("timeline", Requirement::Optional, |_, _| "x".into())
            .unwrap();
        assert_eq!(outcome, RegionOutcome::Missing);
        assert_eq!(doc.as_str(), "<p>nothing</p>");
    }

    #[test]
    fn missing_mandatory_region_is_error() {
        let mut doc = TemplateDocument::new("<p>nothing</p>");
        let err = doc
            .replace_region("planned", Requirement::Mandatory, |_, _| "x".into())
            .unwrap_err();
        assert_eq!(err, TemplateError::MissingRegion("planned".into()));
    }

    #[test]
    fn unbalanced_markers_rejected() {
        let err = locate_regions("<!-- deck:a -->x", "a").unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedAnchor { opens: 1, closes: 0, .. }));
    }

    #[test]
    fn close_before_open_rejected() {
        let err = locate_regions("<!-- /deck:a --> <!-- deck:a -->", "a").unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedAnchor { .. }));
    }

    #[test]
    fn nested_same_kind_rejected() {
        let src = "<!-- deck:a --><!-- deck:a -->x<!-- /deck:a --><!-- /deck:a -->";
        let err = locate_regions(src, "a").unwrap_err();
        assert!(matches!(err, TemplateError::NestedAnchor { outer: 0, .. }));
    }

    #[test]
    fn failed_validation_leaves_document_untouched() {
        let src = "<!-- deck:a -->1<!-- /deck:a --><!-- deck:a -->";
        let mut doc = TemplateDocument::new(src);
        assert!(doc
            .replace_region("a", Requirement::Mandatory, |_, _| "x".into())
            .is_err());
        assert_eq!(doc.as_str(), src);
    }

    #[test]
    fn invalid_names_rejected() {
        assert!(matches!(locate_regions("", "Bad Name"), Err(TemplateError::InvalidName(_))));
        assert!(matches!(locate_regions("", ""), Err(TemplateError::InvalidName(_))));
    }

    // =========================================================================
    // Slots
    // =========================================================================

    #[test]
    fn element_slot_replaced_and_escaped() {
        let mut doc = TemplateDocument::new(r#"<title data-slot="title">Old</title>"#);
        doc.replace_slot("title", "Q3 <Review> & more").unwrap();
        assert_eq!(
            doc.as_str(),
            r#"<title data-slot="title">Q3 &lt;Review&gt; &amp; more</title>"#
        );
    }

    #[test]
    fn element_slot_with_other_attributes() {
        let src = r#"<div class="stat-number" data-slot="planned-count" id="p">15</div>"#;
        let mut doc = TemplateDocument::new(src);
        doc.replace_slot("planned-count", "9").unwrap();
        assert_eq!(
            doc.as_str(),
            r#"<div class="stat-number" data-slot="planned-count" id="p">9</div>"#
        );
    }

    #[test]
    fn comment_slot_inserted_verbatim() {
        let src = "const stats = /*slot:stats*/[22, 15]/*/slot*/;";
        let mut doc = TemplateDocument::new(src);
        doc.replace_slot("stats", "[3, 4]").unwrap();
        assert_eq!(doc.as_str(), "const stats = /*slot:stats*/[3, 4]/*/slot*/;");
    }

    #[test]
    fn slot_missing_is_ambiguous() {
        let mut doc = TemplateDocument::new("<p>none</p>");
        let err = doc.replace_slot("title", "x").unwrap_err();
        assert_eq!(
            err,
            TemplateError::AmbiguousAnchor {
                label: "title".into(),
                count: 0
            }
        );
    }

    #[test]
    fn slot_twice_is_ambiguous_across_syntaxes() {
        let src = r#"<h1 data-slot="title">a</h1> /*slot:title*/b/*/slot*/"#;
        let mut doc = TemplateDocument::new(src);
        let err = doc.replace_slot("title", "x").unwrap_err();
        assert_eq!(
            err,
            TemplateError::AmbiguousAnchor {
                label: "title".into(),
                count: 2
            }
        );
        assert_eq!(doc.as_str(), src);
    }

    #[test]
    fn slot_label_must_match_exactly() {
        let src = r#"<h1 data-slot="title-extra">a</h1><h2 data-slot="title">b</h2>"#;
        let mut doc = TemplateDocument::new(src);
        assert_eq!(doc.slot_count("title").unwrap(), 1);
        doc.replace_slot("title", "c").unwrap();
        assert_eq!(
            doc.as_str(),
            r#"<h1 data-slot="title-extra">a</h1><h2 data-slot="title">c</h2>"#
        );
    }

    #[test]
    fn prefixed_data_attribute_is_not_a_slot() {
        let src = r#"<div x-data-slot="title">A</div><h1 data-slot="title">B</h1>"#;
        let mut doc = TemplateDocument::new(src);
        assert_eq!(doc.slot_count("title").unwrap(), 1);
        doc.replace_slot("title", "C").unwrap();
        assert_eq!(
            doc.as_str(),
            r#"<div x-data-slot="title">A</div><h1 data-slot="title">C</h1>"#
        );
    }

    #[test]
    fn element_value_cannot_open_a_comment_slot() {
        let mut doc = TemplateDocument::new(
            r#"<h1 data-slot="title">A</h1><style>b{c:/*slot:bg*/none/*/slot*/}</style>"#,
        );
        doc.replace_slot("title", "x /*slot:bg*/y/*/slot*/").unwrap();
        assert_eq!(doc.slot_count("bg").unwrap(), 1);
        assert!(doc.as_str().contains("x /&#42;slot:bg*/y/&#42;/slot*/"));
    }

    #[test]
    fn inert_breaks_comment_openers_only() {
        assert_eq!(inert("a /* b */ c"), "a /&#42; b */ c");
        assert_eq!(inert("<p>1/2 * 3</p>"), "<p>1/2 * 3</p>");
    }

    #[test]
    fn slot_no_op_is_byte_identical() {
        let src = "<x>\n<span data-slot=\"subtitle\">October</span>\n</x>";
        let mut doc = TemplateDocument::new(src);
        doc.replace_slot("subtitle", "October").unwrap();
        assert_eq!(doc.as_str(), src);
    }
}
