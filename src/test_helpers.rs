//! Shared test utilities for the slide-deck test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let config = config::load_config(tmp.path()).unwrap();
//! let paths = DeckPaths::new(tmp.path(), &config);
//! let content = load_content(&paths, &config).unwrap();
//!
//! let item = find_item(&content, SectionKind::Accomplished, "Login page");
//! assert_eq!(item.category.as_deref(), Some("Frontend"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::deck::{BuildSummary, DeckContent, SectionKind, SectionSummary};
use crate::records::Item;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/deck/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/deck");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a section summary by kind. Panics if not found.
pub fn find_section(summary: &BuildSummary, kind: SectionKind) -> &SectionSummary {
    summary
        .sections
        .iter()
        .find(|s| s.section == kind)
        .unwrap_or_else(|| {
            let kinds: Vec<SectionKind> = summary.sections.iter().map(|s| s.section).collect();
            panic!("section '{kind}' not in summary. Available: {kinds:?}")
        })
}

/// Find an item by name within a section. Panics if not found.
pub fn find_item<'a>(content: &'a DeckContent, kind: SectionKind, name: &str) -> &'a Item {
    let section = content
        .section(kind)
        .unwrap_or_else(|| panic!("section '{kind}' not loaded"));
    section
        .items
        .iter()
        .find(|i| i.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = section.items.iter().map(|i| i.name.as_str()).collect();
            panic!("item '{name}' not in {kind}. Available: {names:?}")
        })
}

/// Filenames of the image group matched to a named accomplished item.
pub fn matched_files<'a>(content: &'a DeckContent, name: &str) -> Vec<&'a str> {
    let item = find_item(content, SectionKind::Accomplished, name);
    content
        .matched_group(item.origin_index)
        .map(|(group, _)| group.filenames())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::deck::{DeckPaths, load_content};

    #[test]
    fn fixtures_load() {
        let tmp = setup_fixtures();
        let config = config::load_config(tmp.path()).unwrap();
        let paths = DeckPaths::new(tmp.path(), &config);
        let content = load_content(&paths, &config).unwrap();

        let item = find_item(&content, SectionKind::Accomplished, "Login page");
        assert_eq!(item.category.as_deref(), Some("Frontend"));
        assert_eq!(
            matched_files(&content, "Login page"),
            vec!["Login page-01.png", "Login page-02.png"]
        );
    }
}
