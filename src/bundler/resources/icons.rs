//! Icon set normalization.
//!
//! Users configure icons either as one file or as a table of resolution keys
//! to files:
//!
//! ```toml
//! [icon]
//! scalable = "assets/icon.svg"
//! "256x256" = "assets/icon-256.png"
//! "1024x1024" = "assets/icon-1024.png"
//! strict = true
//! ```
//!
//! [`normalize_icons`] turns either shape into an [`IconSet`] with a resolved
//! default entry, which the staging step installs under
//! `usr/share/icons/hicolor/<key>/apps/`.
//!
//! # Default Selection
//!
//! 1. An explicit `default` key wins.
//! 2. Otherwise, when the set is `strict` or has no `scalable` entry, the
//!    fixed-resolution entry with the largest pixel area is chosen. Ties go to
//!    the entry listed first.
//! 3. Otherwise `scalable` is the default.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    resources::image_meta::{self, ImageFormat, ImageMetadata},
    settings::{IconSetConfig, IconSpec},
};
use std::path::{Path, PathBuf};

/// Resolution key for vector icons.
pub const SCALABLE: &str = "scalable";

/// One icon file filed under a resolution key.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IconEntry {
    /// `"{width}x{height}"` or [`SCALABLE`].
    pub key: String,
    /// Source file.
    pub path: PathBuf,
    /// Extension used for the installed file (without the dot).
    pub extension: String,
}

impl IconEntry {
    /// Pixel dimensions encoded in the key, `None` for scalable entries.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        parse_resolution(&self.key)
    }

    /// Pixel area, used to rank fixed-resolution entries.
    pub fn area(&self) -> Option<u64> {
        self.dimensions().map(|(w, h)| u64::from(w) * u64::from(h))
    }
}

/// Normalized icon set with a resolved default.
///
/// Empty when no icon was configured; otherwise `default` names one of the
/// entries.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct IconSet {
    entries: Vec<IconEntry>,
    default: Option<String>,
}

impl IconSet {
    /// Whether no icon is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in configuration order.
    pub fn entries(&self) -> &[IconEntry] {
        &self.entries
    }

    /// Key of the default entry.
    pub fn default_key(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The default entry.
    pub fn default_entry(&self) -> Option<&IconEntry> {
        let key = self.default.as_deref()?;
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Parse a `"{width}x{height}"` key.
pub fn parse_resolution(key: &str) -> Option<(u32, u32)> {
    let (w, h) = key.split_once('x')?;
    let valid = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !valid(w) || !valid(h) {
        return None;
    }
    let (w, h) = (w.parse().ok()?, h.parse().ok()?);
    (w != 0 && h != 0).then_some((w, h))
}

async fn sniff_file(path: &Path) -> Result<ImageMetadata> {
    let bytes = tokio::fs::read(path).await.fs_context("reading icon", path)?;
    image_meta::sniff(&bytes)
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

async fn extension_of(path: &Path) -> Result<String> {
    match file_extension(path) {
        Some(ext) => Ok(ext),
        None => Ok(sniff_file(path).await?.format.extension().to_string()),
    }
}

/// Resolve an icon option into a validated [`IconSet`].
///
/// # Errors
///
/// - [`Error::InvalidIcon`] for unknown keys, a dangling `default`, an empty
///   set, or a single icon whose resolution cannot be determined
/// - [`Error::ValidationError`] when a `strict` entry's file disagrees with
///   its key
/// - [`Error::UnsupportedFormat`] when a sniffed file is not PNG, SVG or XPM
pub async fn normalize_icons(spec: Option<&IconSpec>) -> Result<IconSet> {
    match spec {
        None => Ok(IconSet::default()),
        Some(IconSpec::Path(path)) => normalize_single(path).await,
        Some(IconSpec::Set(set)) => normalize_set(set).await,
    }
}

async fn normalize_single(path: &Path) -> Result<IconSet> {
    let meta = sniff_file(path).await?;
    let key = if meta.format == ImageFormat::Svg {
        SCALABLE.to_string()
    } else {
        meta.resolution_key().ok_or_else(|| {
            Error::InvalidIcon(format!(
                "cannot determine the resolution of {} ({}); configure it as an icon set",
                path.display(),
                meta.format
            ))
        })?
    };
    let extension = file_extension(path).unwrap_or_else(|| meta.format.extension().to_string());
    log::debug!("Icon {} filed as {}", path.display(), key);
    Ok(IconSet {
        entries: vec![IconEntry {
            key: key.clone(),
            path: path.to_path_buf(),
            extension,
        }],
        default: Some(key),
    })
}

async fn normalize_set(config: &IconSetConfig) -> Result<IconSet> {
    if config.entries.is_empty() {
        return Err(Error::InvalidIcon("icon set has no entries".into()));
    }

    let mut entries = Vec::with_capacity(config.entries.0.len());
    for (key, path) in config.entries.iter() {
        if key != SCALABLE && parse_resolution(key).is_none() {
            return Err(Error::InvalidIcon(format!(
                "unknown icon set key '{key}', expected '<width>x<height>' or '{SCALABLE}'"
            )));
        }
        entries.push(IconEntry {
            key: key.to_string(),
            path: path.clone(),
            extension: extension_of(path).await?,
        });
    }

    if config.strict {
        validate_dimensions(&entries).await?;
    }

    let has_scalable = entries.iter().any(|e| e.key == SCALABLE);
    let default = match &config.default {
        Some(key) => {
            if !entries.iter().any(|e| &e.key == key) {
                return Err(Error::InvalidIcon(format!(
                    "default icon '{key}' is not part of the icon set"
                )));
            }
            key.clone()
        }
        None if config.strict || !has_scalable => match largest_fixed(&entries) {
            Some(entry) => entry.key.clone(),
            None => SCALABLE.to_string(),
        },
        None => SCALABLE.to_string(),
    };

    Ok(IconSet {
        entries,
        default: Some(default),
    })
}

/// Fixed-resolution entry with the largest area; first one wins ties.
fn largest_fixed(entries: &[IconEntry]) -> Option<&IconEntry> {
    entries.iter().fold(None, |best: Option<&IconEntry>, entry| {
        match (best.and_then(IconEntry::area), entry.area()) {
            (_, None) => best,
            (None, Some(_)) => Some(entry),
            (Some(best_area), Some(area)) if area > best_area => Some(entry),
            _ => best,
        }
    })
}

async fn validate_dimensions(entries: &[IconEntry]) -> Result<()> {
    for entry in entries.iter().filter(|e| e.key != SCALABLE) {
        let meta = sniff_file(&entry.path).await?;
        if meta.resolution_key().as_deref() != Some(entry.key.as_str()) {
            return Err(Error::ValidationError {
                key: entry.key.clone(),
                path: entry.path.clone(),
                actual: meta
                    .resolution_key()
                    .unwrap_or_else(|| format!("a {} of undeclared size", meta.format)),
            });
        }
    }
    Ok(())
}
