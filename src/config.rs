//! Deck configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file is
//! optional and sparse: whatever it contains is merged key by key over the
//! stock defaults, then the merged result is validated as a whole.
//!
//! ## Config File Location
//!
//! ```text
//! deck/
//! ├── config.toml                 # optional
//! ├── template.html
//! ├── October Achievements.txt
//! ├── November Plans.txt
//! └── images/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [records]
//! separator = "--"          # First occurrence splits name / category
//! comment_prefix = "#"      # Lines starting with this are skipped
//!
//! [sources]
//! accomplished = ["achievement", "achivment"]
//! planned = ["plans"]
//! unresolved = ["notcompleted", "unresolved"]
//! timeline = ["timeline"]
//!
//! [pagination]
//! items_per_slide = 6
//!
//! [matching]
//! threshold = 0.70
//!
//! [images]
//! dir = "images"
//! background = "background"
//! team_label = "TeamMember"
//!
//! [team]
//! name = "Team"
//! full_name = "Development Team"
//! members = []
//! contact_email = ""
//!
//! [template]
//! file = "template.html"
//! mandatory_regions = ["accomplished", "planned"]
//! slots = ["title", "subtitle", "accomplished-count", "accomplished-label",
//!          "planned-count", "planned-label"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::paginate::{Capacity, CapacityConfigError};
use crate::records::RecordSyntax;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Capacity(#[from] CapacityConfigError),
}

/// Slots the assembler knows how to fill.
pub const KNOWN_SLOTS: &[&str] = &[
    "title",
    "subtitle",
    "accomplished-count",
    "accomplished-label",
    "planned-count",
    "planned-label",
    "unresolved-count",
    "team-name",
    "team-full-name",
    "contact-email",
    "background",
];

/// Regions the assembler knows how to fill.
pub const KNOWN_REGIONS: &[&str] = &["accomplished", "planned", "unresolved", "timeline", "team"];

/// Deck configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckConfig {
    /// Line syntax of the text sources.
    pub records: RecordsConfig,
    /// Filename patterns that identify each section's source file.
    pub sources: SourcesConfig,
    pub pagination: PaginationConfig,
    pub matching: MatchingConfig,
    /// Image directory and reserved group labels.
    pub images: ImagesConfig,
    pub team: TeamConfig,
    /// Template file, mandatory regions and filled slots.
    pub template: TemplateConfig,
}

impl DeckConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capacity()?;

        let threshold = self.matching.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation(format!(
                "matching.threshold must be within 0-1, got {threshold}"
            )));
        }
        if self.records.separator.trim().is_empty() {
            return Err(ConfigError::Validation(
                "records.separator must not be empty".into(),
            ));
        }
        for (section, patterns) in [
            ("accomplished", &self.sources.accomplished),
            ("planned", &self.sources.planned),
        ] {
            if patterns.iter().all(|p| p.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "sources.{section} needs at least one filename pattern"
                )));
            }
        }
        if let Some(slot) = self
            .template
            .slots
            .iter()
            .find(|s| !KNOWN_SLOTS.contains(&s.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "template.slots: unknown slot '{slot}' (known: {})",
                KNOWN_SLOTS.join(", ")
            )));
        }
        if let Some(region) = self
            .template
            .mandatory_regions
            .iter()
            .find(|r| !KNOWN_REGIONS.contains(&r.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "template.mandatory_regions: unknown region '{region}' (known: {})",
                KNOWN_REGIONS.join(", ")
            )));
        }
        Ok(())
    }

    /// Validated slide capacity.
    pub fn capacity(&self) -> Result<Capacity, CapacityConfigError> {
        Capacity::try_from(self.pagination.items_per_slide)
    }

    pub fn is_mandatory(&self, region: &str) -> bool {
        self.template.mandatory_regions.iter().any(|r| r == region)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordsConfig {
    pub separator: String,
    pub comment_prefix: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        let syntax = RecordSyntax::default();
        Self {
            separator: syntax.separator,
            comment_prefix: syntax.comment_prefix,
        }
    }
}

impl RecordsConfig {
    pub fn syntax(&self) -> RecordSyntax {
        RecordSyntax {
            separator: self.separator.clone(),
            comment_prefix: self.comment_prefix.clone(),
        }
    }
}

/// Case-insensitive filename substrings per section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub accomplished: Vec<String>,
    pub planned: Vec<String>,
    pub unresolved: Vec<String>,
    pub timeline: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            accomplished: vec!["achievement".into(), "achivment".into()],
            planned: vec!["plans".into()],
            unresolved: vec!["notcompleted".into(), "unresolved".into()],
            timeline: vec!["timeline".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// Kept signed so that zero and negative values reach validation.
    pub items_per_slide: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            items_per_slide: crate::paginate::DEFAULT_CAPACITY as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: crate::matching::DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Image directory, relative to the source directory.
    pub dir: String,
    /// Group label of the background image.
    pub background: String,
    /// Group label of the team photos.
    pub team_label: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: "images".to_string(),
            background: "background".to_string(),
            team_label: "TeamMember".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeamConfig {
    pub name: String,
    pub full_name: String,
    pub members: Vec<String>,
    pub contact_email: String,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: "Team".to_string(),
            full_name: "Development Team".to_string(),
            members: Vec::new(),
            contact_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template file, relative to the source directory.
    pub file: String,
    pub mandatory_regions: Vec<String>,
    /// Slots filled on every build. Each must occur exactly once.
    pub slots: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            file: "template.html".to_string(),
            mandatory_regions: vec!["accomplished".into(), "planned".into()],
            slots: [
                "title",
                "subtitle",
                "accomplished-count",
                "accomplished-label",
                "planned-count",
                "planned-label",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(DeckConfig::default())?)
}

/// Deep-merge two TOML values. Tables merge recursively; anything else in
/// `overlay` replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `config.toml` from `dir` without deserializing into a struct.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<DeckConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: DeckConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the deck config for a source directory.
pub fn load_config(source: &Path) -> Result<DeckConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(source)?;
    resolve_config(base, overlay)
}

/// A fully commented stock `config.toml`.
pub fn stock_config_toml() -> &'static str {
    r##"# Slide Deck Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file next to the template and the text sources.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Text sources
# ---------------------------------------------------------------------------
[records]
# Each line is "<name> -- <category>". Only the first separator splits.
separator = "--"

# Lines starting with this (after trimming) are ignored.
comment_prefix = "#"

# Which file feeds which section: case-insensitive substrings of the
# filename. The first match in filename order wins.
[sources]
accomplished = ["achievement", "achivment"]
planned = ["plans"]
unresolved = ["notcompleted", "unresolved"]   # optional section
timeline = ["timeline"]                       # optional section

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[pagination]
# Items shown per slide. Must be at least 1.
items_per_slide = 6

# ---------------------------------------------------------------------------
# Image matching
# ---------------------------------------------------------------------------
[matching]
# Minimum similarity (0-1) between an item name and an image label.
threshold = 0.70

[images]
# Image directory, relative to this file.
dir = "images"

# Reserved image groups, excluded from item matching.
background = "background"
team_label = "TeamMember"

# ---------------------------------------------------------------------------
# Team
# ---------------------------------------------------------------------------
[team]
name = "Team"
full_name = "Development Team"
# Paired in order with the TeamMember photos.
members = []
contact_email = ""

# ---------------------------------------------------------------------------
# Template
# ---------------------------------------------------------------------------
[template]
file = "template.html"

# A missing mandatory region aborts the build; other regions only warn.
mandatory_regions = ["accomplished", "planned"]

# Slots filled on every build; each must appear exactly once.
# Known: title, subtitle, accomplished-count, accomplished-label,
# planned-count, planned-label, unresolved-count, team-name,
# team-full-name, contact-email, background
slots = ["title", "subtitle", "accomplished-count", "accomplished-label",
         "planned-count", "planned-label"]
"##
}
