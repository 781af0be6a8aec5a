//! The assembly pipeline.
//!
//! ```text
//! sources/*.txt ──parse──▶ sections ─┐
//! images/       ──scan──▶ groups ────┼─match─▶ encode ─▶ render ─▶ surgery ─▶ write
//! template.html ─────────────────────┘
//! ```
//!
//! [`load_content`] covers everything up to and including matching. It reads
//! the disk but writes nothing, so `check` stops there. [`assemble`] is pure:
//! content plus template text in, document text plus summary out. [`build`]
//! wraps both and is the only place that writes, once, at the very end.
//!
//! ## Failure Policy
//!
//! Anything that would leave the generated document structurally wrong is a
//! [`DeckError`] and aborts before the output path is touched. Anything that
//! only makes the deck less complete (an item without screenshots, an image
//! type that can't be embedded, an optional region the template lacks) is a
//! [`Diagnostic`]: logged as a warning, collected in the summary, and the
//! build carries on.
//!
//! ## Reserved Image Groups
//!
//! Two image groups are not illustrations of items: the background image and
//! the team photos. They are identified by label (see `[images]` in the
//! config), set aside before matching, and used for the `background` slot
//! and the `team` region. Any image whose label contains the team label is a
//! team photo, so `TeamMember-01` and `TeamMember_01` both qualify.

use crate::assets::{
    AssetGroup, ScanError, ScannedAssets, group_assets, order_by_sequence, scan_images,
};
use crate::config::{self, ConfigError, DeckConfig, SourcesConfig};
use crate::encode::{InlineImage, encode, placeholder};
use crate::matching::{self, MatchCandidate, MatchOutcome, Scored, assign};
use crate::naming::{GroupKey, suggest_filename};
use crate::paginate::{CapacityConfigError, paginate};
use crate::records::{Item, MalformedReason, parse_text, section_label};
use crate::render::{self, SlideItem, TeamMember};
use crate::template::{
    RegionOutcome, Requirement, TemplateDocument, TemplateError, inert, locate_regions,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("config: {0}")]
    Capacity(#[from] CapacityConfigError),
    #[error("sources: directory not found: {0}")]
    MissingSourceDirectory(PathBuf),
    #[error("sources: no {section} file in {dir} (filename containing one of: {patterns})")]
    MissingSourceFile {
        section: &'static str,
        dir: PathBuf,
        patterns: String,
    },
    #[error("sources: failed to list directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("sources: failed to read {path}: {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("images: {0}")]
    Scan(#[from] ScanError),
    #[error("template: failed to read {path}: {source}")]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template: {0}")]
    Template(#[from] TemplateError),
    #[error("write: output {0} is the template itself; the template is never overwritten by build")]
    OutputIsTemplate(PathBuf),
    #[error("promote: {0} is already the template")]
    PromoteOntoItself(PathBuf),
    #[error("write: failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

// =============================================================================
// Sections
// =============================================================================

/// The logical sections of a deck, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Accomplished,
    Planned,
    Unresolved,
    Timeline,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Accomplished,
        SectionKind::Planned,
        SectionKind::Unresolved,
        SectionKind::Timeline,
    ];

    /// Region name and config key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Accomplished => "accomplished",
            Self::Planned => "planned",
            Self::Unresolved => "unresolved",
            Self::Timeline => "timeline",
        }
    }

    pub fn required(self) -> bool {
        matches!(self, Self::Accomplished | Self::Planned)
    }

    pub fn patterns(self, sources: &SourcesConfig) -> &[String] {
        match self {
            Self::Accomplished => &sources.accomplished,
            Self::Planned => &sources.planned,
            Self::Unresolved => &sources.unresolved,
            Self::Timeline => &sources.timeline,
        }
    }

    /// Slide title, e.g. `October Achievements`.
    pub fn title(self, label: Option<&str>) -> String {
        let base = match self {
            Self::Accomplished => "Achievements",
            Self::Planned => "Plans",
            Self::Unresolved => return "Not Completed".to_string(),
            Self::Timeline => return "Timeline".to_string(),
        };
        match label {
            Some(label) => format!("{label} {base}"),
            None => base.to_string(),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A text file chosen as a section's source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub kind: SectionKind,
    pub path: PathBuf,
    pub label: Option<String>,
}

/// A parsed section.
#[derive(Debug, Clone)]
pub struct Section {
    pub kind: SectionKind,
    pub path: PathBuf,
    pub label: Option<String>,
    pub title: String,
    pub items: Vec<Item>,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Best candidate an unmatched item came close to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestCandidate {
    pub label: String,
    pub score: f64,
}

impl BestCandidate {
    /// Pair the score with the group label that produced it.
    fn from_scored(group: &AssetGroup, scored: Scored) -> Self {
        let labels = group.labels();
        Self {
            label: labels
                .get(scored.label)
                .copied()
                .unwrap_or_else(|| group.label())
                .to_string(),
            score: scored.score,
        }
    }
}

/// A non-fatal problem. The build continues with reduced content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MalformedRecord {
        section: SectionKind,
        line: usize,
        text: String,
        reason: MalformedReason,
    },
    NoAssetMatch {
        item: String,
        suggested_filename: String,
        best: Option<BestCandidate>,
    },
    UnsupportedAssetType {
        filename: String,
    },
    MissingImageDirectory {
        path: PathBuf,
    },
    MissingRegion {
        region: String,
    },
    DuplicateSource {
        section: SectionKind,
        used: PathBuf,
        ignored: PathBuf,
    },
    MissingBackground {
        label: String,
    },
    UnclaimedAssetGroup {
        group: String,
        files: Vec<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord {
                section,
                line,
                text,
                reason,
            } => {
                let what = match reason {
                    MalformedReason::EmptyName => "no item name, line dropped",
                    MalformedReason::EmptyCategory => "empty category, kept without badge",
                };
                write!(f, "{section} line {line}: {what}: {text:?}")
            }
            Self::NoAssetMatch {
                item,
                suggested_filename,
                best,
            } => {
                write!(f, "no image for '{item}' (suggested filename: {suggested_filename})")?;
                if let Some(best) = best {
                    write!(f, "; closest was '{}' at {:.2}", best.label, best.score)?;
                }
                Ok(())
            }
            Self::UnsupportedAssetType { filename } => {
                write!(f, "skipped {filename}: not an embeddable image type")
            }
            Self::MissingImageDirectory { path } => {
                write!(f, "image directory {} not found, building without images", path.display())
            }
            Self::MissingRegion { region } => {
                write!(f, "template has no '{region}' region, section not rendered")
            }
            Self::DuplicateSource {
                section,
                used,
                ignored,
            } => write!(
                f,
                "{section}: using {}, ignoring {}",
                used.display(),
                ignored.display()
            ),
            Self::MissingBackground { label } => {
                write!(f, "no '{label}' image found, background slot left unchanged")
            }
            Self::UnclaimedAssetGroup { group, files } => {
                write!(f, "images not used by any item ({group}): {}", files.join(", "))
            }
        }
    }
}

fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

// =============================================================================
// Paths
// =============================================================================

/// Load `config.toml` from the source directory, failing as the config stage.
pub fn load_config(source: &Path) -> Result<DeckConfig, DeckError> {
    Ok(config::load_config(source)?)
}

/// Input locations for one deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckPaths {
    pub source: PathBuf,
    pub template: PathBuf,
    pub images: PathBuf,
}

impl DeckPaths {
    /// Locations relative to `source` as configured.
    pub fn new(source: &Path, config: &DeckConfig) -> Self {
        Self {
            source: source.to_path_buf(),
            template: source.join(&config.template.file),
            images: source.join(&config.images.dir),
        }
    }

    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        if let Some(template) = template {
            self.template = template;
        }
        self
    }

    pub fn with_images(mut self, images: Option<PathBuf>) -> Self {
        if let Some(images) = images {
            self.images = images;
        }
        self
    }
}

// =============================================================================
// Source discovery
// =============================================================================

/// Pick one `.txt` file per section from `dir`.
///
/// A file belongs to a section when its name contains one of the section's
/// patterns, case-insensitively. Files are considered in filename order and
/// the first hit wins.
pub fn discover_sources(
    dir: &Path,
    sources: &SourcesConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<SourceFile>, DeckError> {
    if !dir.is_dir() {
        return Err(DeckError::MissingSourceDirectory(dir.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        let is_text = entry
            .path()
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if entry.file_type().is_file() && is_text && !name.starts_with('.') {
            candidates.push((name.to_lowercase(), entry.into_path()));
        }
    }

    let mut found = Vec::new();
    for kind in SectionKind::ALL {
        let patterns: Vec<String> = kind
            .patterns(sources)
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let mut matches = candidates
            .iter()
            .filter(|(name, _)| patterns.iter().any(|p| name.contains(p.as_str())))
            .map(|(_, path)| path);

        let Some(path) = matches.next() else {
            if kind.required() {
                return Err(DeckError::MissingSourceFile {
                    section: kind.key(),
                    dir: dir.to_path_buf(),
                    patterns: patterns.join(", "),
                });
            }
            debug!(section = kind.key(), "no source file, section skipped");
            continue;
        };
        for ignored in matches {
            report(
                diagnostics,
                Diagnostic::DuplicateSource {
                    section: kind,
                    used: path.clone(),
                    ignored: ignored.clone(),
                },
            );
        }
        debug!(section = kind.key(), file = %path.display(), "found source");
        found.push(SourceFile {
            kind,
            path: path.clone(),
            label: section_label(path),
        });
    }

    Ok(found)
}

// =============================================================================
// Content: parse, scan, group, match
// =============================================================================

/// Everything read from disk, grouped and matched, ready to assemble.
#[derive(Debug, Clone)]
pub struct DeckContent {
    /// Present sections in rendering order.
    pub sections: Vec<Section>,
    /// Image groups eligible for matching, ordered by first filename.
    pub groups: Vec<AssetGroup>,
    pub background: Option<AssetGroup>,
    pub team_photos: Option<AssetGroup>,
    /// Accomplished items against [`DeckContent::groups`].
    pub matching: MatchOutcome,
    pub diagnostics: Vec<Diagnostic>,
}

impl DeckContent {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// The deck label, taken from the accomplished source filename.
    pub fn label(&self) -> Option<&str> {
        self.section(SectionKind::Accomplished)?.label.as_deref()
    }

    /// Group claimed by the accomplished item at `index`.
    pub fn matched_group(&self, index: usize) -> Option<(&AssetGroup, f64)> {
        let Scored { candidate, score, .. } = self.matching.assignments.get(index)?.matched?;
        Some((self.groups.get(candidate)?, score))
    }
}

fn is_reserved(group: &AssetGroup, label: &str) -> bool {
    let wanted = matching::normalize(label);
    !wanted.is_empty()
        && group
            .labels()
            .iter()
            .any(|l| matching::normalize(l) == wanted)
}

fn compact(label: &str) -> String {
    matching::normalize(label).replace(' ', "")
}

/// Team photos may be one `TeamMember-NN` group or one group per file
/// (`TeamMember_01`, `TeamMember_02`): any label containing the team label.
fn is_team_photo(group: &AssetGroup, label: &str) -> bool {
    let wanted = compact(label);
    !wanted.is_empty() && group.labels().iter().any(|l| compact(l).contains(&wanted))
}

/// Merge every team group into one, ordered by sequence then filename.
fn merge_team_groups(groups: Vec<AssetGroup>) -> Option<AssetGroup> {
    let key = groups.first()?.key.clone();
    let mut assets: Vec<_> = groups.into_iter().flat_map(|g| g.assets).collect();
    order_by_sequence(&mut assets);
    Some(AssetGroup { key, assets })
}

/// Read sources and images and match accomplished items to image groups.
pub fn load_content(paths: &DeckPaths, config: &DeckConfig) -> Result<DeckContent, DeckError> {
    let mut diagnostics = Vec::new();

    let sources = discover_sources(&paths.source, &config.sources, &mut diagnostics)?;
    let syntax = config.records.syntax();
    let mut sections = Vec::with_capacity(sources.len());
    for source in sources {
        let text = fs::read_to_string(&source.path).map_err(|e| DeckError::ReadSource {
            path: source.path.clone(),
            source: e,
        })?;
        let parsed = parse_text(&text, &syntax);
        for bad in parsed.malformed {
            report(
                &mut diagnostics,
                Diagnostic::MalformedRecord {
                    section: source.kind,
                    line: bad.line,
                    text: bad.text,
                    reason: bad.reason,
                },
            );
        }
        info!(
            section = source.kind.key(),
            file = %source.path.display(),
            items = parsed.items.len(),
            "parsed section"
        );
        sections.push(Section {
            kind: source.kind,
            title: source.kind.title(source.label.as_deref()),
            path: source.path,
            label: source.label,
            items: parsed.items,
        });
    }

    let scanned = if paths.images.is_dir() {
        scan_images(&paths.images)?
    } else {
        report(
            &mut diagnostics,
            Diagnostic::MissingImageDirectory {
                path: paths.images.clone(),
            },
        );
        ScannedAssets::default()
    };
    for filename in &scanned.unsupported {
        report(
            &mut diagnostics,
            Diagnostic::UnsupportedAssetType {
                filename: filename.clone(),
            },
        );
    }
    let image_count = scanned.assets.len();

    let mut background = None;
    let mut team_groups = Vec::new();
    let mut groups = Vec::new();
    for group in group_assets(scanned.assets) {
        if background.is_none() && is_reserved(&group, &config.images.background) {
            background = Some(group);
        } else if is_team_photo(&group, &config.images.team_label) {
            team_groups.push(group);
        } else {
            groups.push(group);
        }
    }
    let team_photos = merge_team_groups(team_groups);
    info!(images = image_count, groups = groups.len(), "scanned images");

    let candidates: Vec<MatchCandidate> = groups.iter().map(MatchCandidate::from_group).collect();
    let accomplished = sections
        .iter()
        .find(|s| s.kind == SectionKind::Accomplished)
        .map(|s| s.items.as_slice())
        .unwrap_or_default();
    let outcome = assign(accomplished, &candidates, config.matching.threshold);

    for assignment in &outcome.assignments {
        let item = &accomplished[assignment.item];
        match assignment.matched {
            Some(Scored { candidate, score, .. }) => debug!(
                item = %item.name,
                group = %groups[candidate].key,
                score,
                "matched"
            ),
            None => report(
                &mut diagnostics,
                Diagnostic::NoAssetMatch {
                    item: item.name.clone(),
                    suggested_filename: suggest_filename(&item.name),
                    best: assignment
                        .best
                        .map(|b| BestCandidate::from_scored(&groups[b.candidate], b)),
                },
            ),
        }
    }
    for &idx in &outcome.unclaimed {
        let group = &groups[idx];
        report(
            &mut diagnostics,
            Diagnostic::UnclaimedAssetGroup {
                group: group.key.to_string(),
                files: group.filenames().into_iter().map(String::from).collect(),
            },
        );
    }
    info!(
        matched = outcome.matched_count(),
        unmatched = outcome.assignments.len() - outcome.matched_count(),
        "matched images"
    );

    Ok(DeckContent {
        sections,
        groups,
        background,
        team_photos,
        matching: outcome,
        diagnostics,
    })
}

// =============================================================================
// Check report
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section: SectionKind,
    pub file: PathBuf,
    pub label: Option<String>,
    pub items: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemMatch {
    pub item: String,
    pub files: Vec<String>,
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<BestCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_filename: Option<String>,
}

/// What `build` would do with the images, without building.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub sections: Vec<SectionReport>,
    pub matches: Vec<ItemMatch>,
    pub background: Option<String>,
    pub team_photos: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn from_content(content: &DeckContent) -> Self {
        let sections = content
            .sections
            .iter()
            .map(|s| SectionReport {
                section: s.kind,
                file: s.path.clone(),
                label: s.label.clone(),
                items: s.items.len(),
            })
            .collect();

        let items = content
            .section(SectionKind::Accomplished)
            .map(|s| s.items.as_slice())
            .unwrap_or_default();
        let matches = items
            .iter()
            .enumerate()
            .map(|(idx, item)| match content.matched_group(idx) {
                Some((group, score)) => ItemMatch {
                    item: item.name.clone(),
                    files: group.filenames().into_iter().map(String::from).collect(),
                    score: Some(score),
                    best: None,
                    suggested_filename: None,
                },
                None => ItemMatch {
                    item: item.name.clone(),
                    files: Vec::new(),
                    score: None,
                    best: content.matching.assignments[idx].best.and_then(|b| {
                        content
                            .groups
                            .get(b.candidate)
                            .map(|g| BestCandidate::from_scored(g, b))
                    }),
                    suggested_filename: Some(suggest_filename(&item.name)),
                },
            })
            .collect();

        Self {
            sections,
            matches,
            background: content
                .background
                .as_ref()
                .map(|g| g.first_filename().to_string()),
            team_photos: content
                .team_photos
                .as_ref()
                .map(|g| g.filenames().into_iter().map(String::from).collect())
                .unwrap_or_default(),
            diagnostics: content.diagnostics.clone(),
        }
    }
}

/// Load and match without writing anything.
pub fn check(paths: &DeckPaths, config: &DeckConfig) -> Result<CheckReport, DeckError> {
    config.capacity()?;
    let content = load_content(paths, config)?;
    Ok(CheckReport::from_content(&content))
}

// =============================================================================
// Assembly
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub section: SectionKind,
    pub title: String,
    pub items: usize,
    /// Items per slide, in slide order.
    pub pages: Vec<usize>,
    pub images: usize,
}

/// What a build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub output: Option<PathBuf>,
    pub sections: Vec<SectionSummary>,
    pub team_members: usize,
    pub images_embedded: usize,
    pub items_matched: usize,
    pub items_unmatched: usize,
    pub slots_filled: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A finished document, still in memory.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub document: String,
    pub summary: BuildSummary,
}

/// Encode every claimed group once, keyed by group.
fn encode_claimed_groups(content: &DeckContent) -> HashMap<GroupKey, Vec<InlineImage>> {
    content
        .matching
        .assignments
        .iter()
        .filter_map(|a| a.matched)
        .filter_map(|m| content.groups.get(m.candidate))
        .map(|group| {
            let images = group
                .assets
                .iter()
                .map(|a| encode(&a.bytes, a.media_type))
                .collect();
            (group.key.clone(), images)
        })
        .collect()
}

fn team_members<'a>(config: &'a DeckConfig, photos: Option<&AssetGroup>) -> Vec<TeamMember<'a>> {
    let photos = photos.map(|g| g.assets.as_slice()).unwrap_or_default();
    if photos.len() > config.team.members.len() {
        debug!(
            photos = photos.len(),
            members = config.team.members.len(),
            "more team photos than members"
        );
    }
    config
        .team
        .members
        .iter()
        .enumerate()
        .map(|(idx, name)| TeamMember {
            name,
            photo: photos
                .get(idx)
                .map(|a| encode(&a.bytes, a.media_type))
                .unwrap_or_else(placeholder),
        })
        .collect()
}

fn requirement(config: &DeckConfig, region: &str) -> Requirement {
    if config.is_mandatory(region) {
        Requirement::Mandatory
    } else {
        Requirement::Optional
    }
}

/// Replace a region, recording a diagnostic when an optional one is absent.
fn fill_region(
    doc: &mut TemplateDocument,
    region: &str,
    config: &DeckConfig,
    fragment: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), TemplateError> {
    let fragment = inert(fragment);
    let outcome = doc.replace_region(region, requirement(config, region), |_, _| {
        format!("\n{fragment}\n")
    })?;
    if outcome == RegionOutcome::Missing {
        report(
            diagnostics,
            Diagnostic::MissingRegion {
                region: region.to_string(),
            },
        );
    }
    Ok(())
}

/// Scalar slot values known for this deck.
fn slot_values(
    content: &DeckContent,
    config: &DeckConfig,
    background: Option<&InlineImage>,
) -> BTreeMap<&'static str, String> {
    let count = |kind| content.section(kind).map_or(0, |s| s.items.len());
    let title = |kind: SectionKind| {
        content
            .section(kind)
            .map_or_else(|| kind.title(None), |s| s.title.clone())
    };

    let mut values = BTreeMap::new();
    values.insert(
        "title",
        match content.label() {
            Some(label) => format!("{label} KPI"),
            None => "KPI".to_string(),
        },
    );
    values.insert(
        "subtitle",
        format!(
            "{} / {}",
            title(SectionKind::Accomplished),
            title(SectionKind::Planned)
        ),
    );
    values.insert("accomplished-count", count(SectionKind::Accomplished).to_string());
    values.insert("accomplished-label", title(SectionKind::Accomplished));
    values.insert("planned-count", count(SectionKind::Planned).to_string());
    values.insert("planned-label", title(SectionKind::Planned));
    values.insert("unresolved-count", count(SectionKind::Unresolved).to_string());
    values.insert("team-name", config.team.name.clone());
    values.insert("team-full-name", config.team.full_name.clone());
    values.insert("contact-email", config.team.contact_email.clone());
    if let Some(image) = background {
        values.insert("background", render::css_url(image));
    }
    values
}

/// Build the document in memory. Nothing is written.
pub fn assemble(
    content: &DeckContent,
    template: &str,
    config: &DeckConfig,
) -> Result<Assembled, DeckError> {
    let capacity = config.capacity()?;
    let mut diagnostics = content.diagnostics.clone();
    let encoded = encode_claimed_groups(content);
    let mut doc = TemplateDocument::new(template);

    // Slots first: rendered fragments carry user text and must not be
    // searched for slot anchors.
    let background = content
        .background
        .as_ref()
        .and_then(|g| g.assets.first())
        .map(|a| encode(&a.bytes, a.media_type));
    let values = slot_values(content, config, background.as_ref());
    let mut slots_filled = Vec::new();
    for slot in &config.template.slots {
        match values.get(slot.as_str()) {
            Some(value) => {
                doc.replace_slot(slot, value)?;
                slots_filled.push(slot.clone());
            }
            None if slot == "background" => report(
                &mut diagnostics,
                Diagnostic::MissingBackground {
                    label: config.images.background.clone(),
                },
            ),
            None => debug!(slot = %slot, "no value for slot"),
        }
    }

    let mut sections = Vec::new();

    for kind in SectionKind::ALL {
        let region = kind.key();
        let Some(section) = content.section(kind) else {
            // No source: clear whatever the template shows there.
            doc.replace_region(region, requirement(config, region), |_, _| "\n".to_string())?;
            continue;
        };

        let (fragment, pages, images) = match kind {
            SectionKind::Timeline => {
                let fragment = if section.items.is_empty() {
                    String::new()
                } else {
                    render::render_timeline(&section.title, &section.items).into_string()
                };
                let pages = if section.items.is_empty() {
                    Vec::new()
                } else {
                    vec![section.items.len()]
                };
                (fragment, pages, 0)
            }
            _ => {
                let slide_items: Vec<SlideItem<'_>> = section
                    .items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        let images: &[InlineImage] = match kind {
                            SectionKind::Accomplished => content
                                .matched_group(idx)
                                .and_then(|(group, _)| encoded.get(&group.key))
                                .map(Vec::as_slice)
                                .unwrap_or_default(),
                            _ => &[],
                        };
                        SlideItem { item, images }
                    })
                    .collect();
                let pages = paginate(&slide_items, capacity);
                let fragment = render::render_section(region, &section.title, &pages).into_string();
                let sizes: Vec<usize> = pages.iter().map(|p| p.items.len()).collect();
                let images: usize = slide_items.iter().map(|s| s.images.len()).sum();
                (fragment, sizes, images)
            }
        };

        fill_region(&mut doc, region, config, &fragment, &mut diagnostics)?;
        debug!(section = region, pages = pages.len(), images, "rendered section");
        sections.push(SectionSummary {
            section: kind,
            title: section.title.clone(),
            items: section.items.len(),
            pages,
            images,
        });
    }

    let mut team_members_rendered = 0;
    if !config.team.members.is_empty() || config.is_mandatory("team") {
        let members = team_members(config, content.team_photos.as_ref());
        let fragment = render::render_team(&members).into_string();
        fill_region(&mut doc, "team", config, &fragment, &mut diagnostics)?;
        team_members_rendered = members.len();
    }

    let images_embedded: usize = encoded.values().map(Vec::len).sum::<usize>()
        + usize::from(background.is_some())
        + content
            .team_photos
            .as_ref()
            .map_or(0, |g| g.assets.len().min(config.team.members.len()));
    let items_matched = content.matching.matched_count();

    info!(
        sections = sections.len(),
        slots = slots_filled.len(),
        images = images_embedded,
        "assembled document"
    );

    Ok(Assembled {
        document: doc.into_string(),
        summary: BuildSummary {
            output: None,
            sections,
            team_members: team_members_rendered,
            images_embedded,
            items_matched,
            items_unmatched: content.matching.assignments.len() - items_matched,
            slots_filled,
            diagnostics,
        },
    })
}

// =============================================================================
// Writing
// =============================================================================

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Write `contents` to `path` through a temp file in the same directory.
///
/// The temp file is renamed over `path` only once fully written, so a
/// failure leaves any previous file at `path` intact.
pub fn write_document(path: &Path, contents: &str) -> Result<(), DeckError> {
    let write_err = |source: std::io::Error| DeckError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
    staged.write_all(contents.as_bytes()).map_err(write_err)?;
    staged.flush().map_err(write_err)?;
    staged.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// `<source>/<Label>-KPI.html`, or `<source>/deck.html` without a label.
pub fn default_output_path(source: &Path, content: &DeckContent) -> PathBuf {
    match content.label() {
        Some(label) => source.join(format!("{label}-KPI.html")),
        None => source.join("deck.html"),
    }
}

/// Run the whole pipeline and write the deck.
pub fn build(
    paths: &DeckPaths,
    output: Option<&Path>,
    config: &DeckConfig,
) -> Result<BuildSummary, DeckError> {
    config.capacity()?;
    let content = load_content(paths, config)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(&paths.source, &content));
    if same_file(&output, &paths.template) {
        return Err(DeckError::OutputIsTemplate(output));
    }

    let template = fs::read_to_string(&paths.template).map_err(|source| DeckError::ReadTemplate {
        path: paths.template.clone(),
        source,
    })?;
    let Assembled {
        document,
        mut summary,
    } = assemble(&content, &template, config)?;

    write_document(&output, &document)?;
    info!(output = %output.display(), bytes = document.len(), "wrote deck");
    summary.output = Some(output);
    Ok(summary)
}

/// Replace the template with a reviewed generated document.
///
/// The generated document must still be usable as a template: every
/// mandatory region present and every configured slot present exactly once.
pub fn promote(generated: &Path, template: &Path, config: &DeckConfig) -> Result<(), DeckError> {
    if same_file(generated, template) {
        return Err(DeckError::PromoteOntoItself(generated.to_path_buf()));
    }
    let text = fs::read_to_string(generated).map_err(|source| DeckError::ReadTemplate {
        path: generated.to_path_buf(),
        source,
    })?;

    for region in &config.template.mandatory_regions {
        if locate_regions(&text, region)?.is_empty() {
            return Err(TemplateError::MissingRegion(region.clone()).into());
        }
    }
    let doc = TemplateDocument::new(text);
    for slot in &config.template.slots {
        let count = doc.slot_count(slot)?;
        if count != 1 {
            return Err(TemplateError::AmbiguousAnchor {
                label: slot.clone(),
                count,
            }
            .into());
        }
    }

    write_document(template, doc.as_str())?;
    info!(from = %generated.display(), to = %template.display(), "promoted deck to template");
    Ok(())
}
