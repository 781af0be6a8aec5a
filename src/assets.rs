//! Image directory scanning and grouping.
//!
//! The image directory is flat. Every file is classified by extension
//! ([`MediaType`]), its stem is parsed with [`naming::parse_asset_name`], and
//! files sharing a [`GroupKey`] are clustered into an [`AssetGroup`].
//!
//! ## Ordering inside a group
//!
//! Sequence numbers are compared **numerically**: `-2` sorts before `-10`.
//! Files without a sequence go last, in filename order. Ties on sequence
//! fall back to filename order as well, so the result never depends on
//! directory listing order.
//!
//! ## Ordering of groups
//!
//! Groups are ordered by their lexicographically first raw filename. The
//! matcher relies on this for its tie-break.

use crate::encode::MediaType;
use crate::naming::{self, GroupKey};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("image directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to list image directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A single image file with its parsed naming metadata and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub filename: String,
    pub stem: String,
    pub label: String,
    pub group_key: GroupKey,
    pub sequence: Option<u32>,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    /// Build an asset from a filename and its contents.
    ///
    /// Returns `None` when the extension is not an embeddable image type.
    pub fn from_file(filename: &str, bytes: Vec<u8>) -> Option<Self> {
        let path = Path::new(filename);
        let media_type = MediaType::from_path(path)?;
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        let parsed = naming::parse_asset_name(&stem);
        Some(Self {
            filename: filename.to_string(),
            stem,
            label: parsed.label,
            group_key: parsed.group_key,
            sequence: parsed.sequence,
            media_type,
            bytes,
        })
    }
}

/// Result of scanning the image directory.
#[derive(Debug, Default)]
pub struct ScannedAssets {
    pub assets: Vec<ImageAsset>,
    /// Filenames skipped because their extension is not an image type.
    pub unsupported: Vec<String>,
}

/// Read every image in `dir` (non-recursive).
///
/// Hidden files are ignored. Files with an unrecognised extension are listed
/// in [`ScannedAssets::unsupported`] and not read.
pub fn scan_images(dir: &Path) -> Result<ScannedAssets, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDirectory(dir.to_path_buf()));
    }

    let mut scanned = ScannedAssets::default();
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename.starts_with('.') {
            continue;
        }
        if MediaType::from_path(entry.path()).is_none() {
            scanned.unsupported.push(filename);
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| ScanError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if let Some(asset) = ImageAsset::from_file(&filename, bytes) {
            debug!(file = %asset.filename, group = %asset.group_key, "scanned image");
            scanned.assets.push(asset);
        }
    }

    Ok(scanned)
}

/// Images that belong to one logical item, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetGroup {
    pub key: GroupKey,
    pub assets: Vec<ImageAsset>,
}

impl AssetGroup {
    /// Lexicographically smallest raw filename in the group.
    pub fn first_filename(&self) -> &str {
        self.assets
            .iter()
            .map(|a| a.filename.as_str())
            .min()
            .unwrap_or_default()
    }

    /// Label of the first image in display order.
    pub fn label(&self) -> &str {
        self.assets
            .first()
            .map(|a| a.label.as_str())
            .unwrap_or_default()
    }

    /// Distinct labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for asset in &self.assets {
            if !labels.contains(&asset.label.as_str()) {
                labels.push(&asset.label);
            }
        }
        labels
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.filename.as_str()).collect()
    }
}

/// Sort images by numeric sequence; missing sequences last, filename breaks ties.
pub fn order_by_sequence(assets: &mut [ImageAsset]) {
    assets.sort_by(|a, b| {
        let key_a = (a.sequence.is_none(), a.sequence, &a.filename);
        let key_b = (b.sequence.is_none(), b.sequence, &b.filename);
        key_a.cmp(&key_b)
    });
}

/// Cluster images by group key and order each cluster.
pub fn group_assets(assets: Vec<ImageAsset>) -> Vec<AssetGroup> {
    let mut by_key: BTreeMap<GroupKey, Vec<ImageAsset>> = BTreeMap::new();
    for asset in assets {
        by_key.entry(asset.group_key.clone()).or_default().push(asset);
    }

    let mut groups: Vec<AssetGroup> = by_key
        .into_iter()
        .map(|(key, mut assets)| {
            order_by_sequence(&mut assets);
            AssetGroup { key, assets }
        })
        .collect();

    groups.sort_by(|a, b| a.first_filename().cmp(b.first_filename()));
    groups
}
