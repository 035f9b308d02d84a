//! Sitemap generation.
//!
//! Runs after every destination has been written, over the whole output
//! tree, so hand-written pages (`index.html`, `about.html`, ...) are listed
//! alongside generated ones.
//!
//! The work is split so the interesting part is testable without a disk:
//!
//! ```text
//! discover(root, ...)       filesystem → [ArtifactDescriptor]   (walkdir)
//! build(descriptors, ...)   [ArtifactDescriptor] → SitemapDocument   (pure)
//! SitemapDocument::to_xml   SitemapDocument → sitemap XML            (pure)
//! ```
//!
//! ## What gets listed
//!
//! Only `.html` files that are not internal. A file is internal when any
//! directory above it is named `templates` or `partials`, when its file
//! name is listed in `sitemap.exclude_files` (`404.html` by default), or
//! when it is one of the configured templates or the header partial.
//!
//! ## Priority tiers
//!
//! | Path | Priority |
//! |------|----------|
//! | `city/...` | 0.8 |
//! | `city-info/...` | 0.6 |
//! | anything else | 1.0 |
//!
//! Path segments are percent-encoded in `<loc>`, so `about us.html` becomes
//! `about%20us.html`.
//!
//! Entries are deduplicated by URL and sorted lexicographically so successive
//! runs produce the same document regardless of directory iteration order.

use crate::types::ArtifactCategory;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const SITEMAP_FILENAME: &str = "sitemap.xml";

/// Directory names whose HTML is never published.
const RESERVED_DIRS: &[&str] = &["templates", "partials"];

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("Output tree unreadable at {}: {source}", path.display())]
    OutputTreeUnreadable {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// A file found in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Path relative to the output root, `/`-separated.
    pub rel_path: String,
    pub category: ArtifactCategory,
}

impl ArtifactDescriptor {
    pub fn new(rel_path: impl Into<String>, category: ArtifactCategory) -> Self {
        Self {
            rel_path: rel_path.into(),
            category,
        }
    }
}

/// Fixed relative-importance tier of a published page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTier {
    Primary,
    Listing,
    Info,
}

impl PriorityTier {
    pub fn for_path(rel_path: &str) -> Self {
        let dirs = dir_segments(rel_path);
        if dirs.contains(&"city-info") {
            PriorityTier::Info
        } else if dirs.contains(&"city") {
            PriorityTier::Listing
        } else {
            PriorityTier::Primary
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Primary => "1.0",
            PriorityTier::Listing => "0.8",
            PriorityTier::Info => "0.6",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub last_modified: String,
    pub change_frequency: String,
    pub priority: PriorityTier,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitemapDocument {
    /// Sorted by `loc`, no duplicates.
    pub entries: Vec<SitemapEntry>,
}

fn dir_segments(rel_path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = rel_path.split('/').collect();
    segments.pop();
    segments
}

/// Categorize a file by its path relative to the output root.
///
/// Returns `None` for files that are neither pages nor data (images, CSS,
/// the sitemap itself, ...).
pub fn classify(rel_path: &str, exclude_files: &[String]) -> Option<ArtifactCategory> {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" => {
            let reserved = dir_segments(rel_path)
                .iter()
                .any(|dir| RESERVED_DIRS.contains(dir));
            if reserved || exclude_files.iter().any(|f| f == file_name) {
                Some(ArtifactCategory::Internal)
            } else {
                Some(ArtifactCategory::Page)
            }
        }
        "json" => Some(ArtifactCategory::Data),
        _ => None,
    }
}

/// Walk `root` and describe every page, data and internal file in it.
///
/// `internal_files` are always internal wherever they sit, so configured
/// templates and partials kept inside the output tree are never published.
/// Results are ordered by path. Any directory that cannot be read fails the
/// whole walk.
pub fn discover(
    root: &Path,
    exclude_files: &[String],
    internal_files: &[&Path],
) -> Result<Vec<ArtifactDescriptor>, SitemapError> {
    let mut descriptors = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| SitemapError::OutputTreeUnreadable {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let category = if internal_files.contains(&entry.path()) {
            Some(ArtifactCategory::Internal)
        } else {
            classify(&rel_path, exclude_files)
        };
        if let Some(category) = category {
            descriptors.push(ArtifactDescriptor { rel_path, category });
        }
    }
    Ok(descriptors)
}

/// Build the sitemap for a set of descriptors.
///
/// Only [`ArtifactCategory::Page`] descriptors produce entries.
pub fn build(
    descriptors: &[ArtifactDescriptor],
    base_url: &str,
    last_modified: &str,
    change_frequency: &str,
) -> SitemapDocument {
    let base = base_url.trim_end_matches('/');
    let entries: BTreeMap<String, SitemapEntry> = descriptors
        .iter()
        .filter(|d| d.category == ArtifactCategory::Page)
        .map(|d| {
            let rel = d.rel_path.trim_start_matches('/');
            let loc = format!("{base}/{}", encode_path(rel));
            let entry = SitemapEntry {
                loc: loc.clone(),
                last_modified: last_modified.to_string(),
                change_frequency: change_frequency.to_string(),
                priority: PriorityTier::for_path(rel),
            };
            (loc, entry)
        })
        .collect();

    SitemapDocument {
        entries: entries.into_values().collect(),
    }
}

/// Percent-encode each `/`-separated segment of a relative path.
fn encode_path(rel_path: &str) -> String {
    rel_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SitemapDocument {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a sitemaps.org 0.9 `urlset`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for entry in &self.entries {
            xml.push_str(&format!(
                "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
                escape_xml(&entry.loc),
                escape_xml(&entry.last_modified),
                escape_xml(&entry.change_frequency),
                entry.priority.as_str(),
            ));
        }
        xml.push_str("</urlset>\n");
        xml
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
