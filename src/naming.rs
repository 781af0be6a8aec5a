//! Centralized filename parsing for image assets.
//!
//! Images that belong to one deck item are tied together by their filename.
//! Two conventions are accepted, plus a plain fallback:
//!
//! | Filename | Group | Sequence | Label |
//! |----------|-------|----------|-------|
//! | `03_02_Login page.png` | declared `03` | 2 | `Login page` |
//! | `Login page-02.png` | label `Login page` | 2 | `Login page` |
//! | `Login page.png` | label `Login page` | none | `Login page` |
//!
//! The **label** is what the matcher compares against item names. The
//! **group** decides which files end up on the same item, and the
//! **sequence** orders them inside the group.

use serde::Serialize;
use std::fmt;

/// Which files belong together.
///
/// A declared group (`<group>_<seq>_<label>`) and a label group never
/// collide, even if the label happens to look like a group number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum GroupKey {
    Declared(String),
    Label(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Declared(g) => write!(f, "group {g}"),
            GroupKey::Label(l) => write!(f, "{l}"),
        }
    }
}

/// Result of parsing an image filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetName {
    /// Filename without extension, untouched.
    pub stem: String,
    /// Stem with any group/sequence decoration removed.
    pub label: String,
    pub group_key: GroupKey,
    /// Position inside the group. `None` when the filename carries none.
    pub sequence: Option<u32>,
}

/// Parse an image filename stem.
///
/// - `"03_02_Login page"` → declared group `03`, sequence 2, label `Login page`
/// - `"Login page-02"` → label group, sequence 2, label `Login page`
/// - `"Login page"` → label group, no sequence
/// - `"Survey_feedback_old"` → plain (group and sequence must be numeric)
pub fn parse_asset_name(stem: &str) -> AssetName {
    if let Some((group, sequence, label)) = split_prefixed(stem) {
        return AssetName {
            stem: stem.to_string(),
            label: label.to_string(),
            group_key: GroupKey::Declared(group.to_string()),
            sequence: Some(sequence),
        };
    }

    if let Some((label, sequence)) = split_suffixed(stem) {
        return AssetName {
            stem: stem.to_string(),
            label: label.to_string(),
            group_key: GroupKey::Label(label.to_string()),
            sequence: Some(sequence),
        };
    }

    AssetName {
        stem: stem.to_string(),
        label: stem.to_string(),
        group_key: GroupKey::Label(stem.to_string()),
        sequence: None,
    }
}

/// `<digits>_<digits>_<label>`
fn split_prefixed(stem: &str) -> Option<(&str, u32, &str)> {
    let mut parts = stem.splitn(3, '_');
    let group = parts.next()?;
    let sequence = parts.next()?;
    let label = parts.next()?.trim();
    if !is_digits(group) || !is_digits(sequence) || label.is_empty() {
        return None;
    }
    Some((group, sequence.parse().ok()?, label))
}

/// `<label>-<digits>`
fn split_suffixed(stem: &str) -> Option<(&str, u32)> {
    let (label, sequence) = stem.rsplit_once('-')?;
    let label = label.trim();
    if label.is_empty() || !is_digits(sequence) {
        return None;
    }
    Some((label, sequence.parse().ok()?))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Characters that cannot appear in filenames on at least one common platform.
const UNSAFE_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', ','];

/// Suggest the image filename an author should use for an item.
///
/// Shown next to unmatched items: `"Login / SSO"` → `"Login _ SSO-01.png"`.
pub fn suggest_filename(item_name: &str) -> String {
    let replaced: String = item_name
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut prev_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push('_');
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = collapsed.trim_matches(|c| c == ' ' || c == '_');
    format!("{trimmed}-01.png")
}
