//! Template rendering.
//!
//! Pages are produced by plain placeholder substitution over HTML templates
//! kept alongside the site, so designers can edit them without touching the
//! generator. The recognized placeholders are fixed:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `{{cityName}}` | destination display name |
//! | `{{title}}` | page title |
//! | `{{description}}` | meta description |
//! | `{{imageUrl}}` | hero image URL |
//! | `{{canonicalUrl}}` | canonical page URL |
//! | `{{date}}` | run date, `YYYY-MM-DD` |
//! | `{{ROBOTS}}` | `index,follow` or `noindex,nofollow` |
//! | `{{HEADER_SEARCH}}` | shared header fragment (first occurrence) |
//! | `{{HOTEL_JSON}}` | schema.org `ItemList` of top listings (first occurrence) |
//!
//! Text values are HTML-escaped; the header fragment and structured data are
//! inserted as-is. Substitution is a single pass, so a value that itself
//! looks like a placeholder is never expanded. Any other `{{name}}` token is
//! left in the output verbatim.
//! [`unmatched_placeholders`] lists them so the pipeline can warn once per
//! template instead of failing the run.
//!
//! Two page kinds are rendered per destination, see [`PageKind`].

use crate::naming;
use crate::types::{DestinationEntry, ListingGroupSet, ListingRecord, GROUP_LIMIT};
use maud::html;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template unavailable at {}: {source}", path.display())]
    TemplateUnavailable { path: PathBuf, source: io::Error },
    #[error("Structured data error: {0}")]
    StructuredData(#[from] serde_json::Error),
}

pub const PH_CITY_NAME: &str = "{{cityName}}";
pub const PH_TITLE: &str = "{{title}}";
pub const PH_DESCRIPTION: &str = "{{description}}";
pub const PH_IMAGE_URL: &str = "{{imageUrl}}";
pub const PH_CANONICAL_URL: &str = "{{canonicalUrl}}";
pub const PH_DATE: &str = "{{date}}";
pub const PH_ROBOTS: &str = "{{ROBOTS}}";
pub const PH_HEADER: &str = "{{HEADER_SEARCH}}";
pub const PH_STRUCTURED_DATA: &str = "{{HOTEL_JSON}}";

/// Every placeholder the renderer substitutes.
pub const PLACEHOLDERS: &[&str] = &[
    PH_CITY_NAME,
    PH_TITLE,
    PH_DESCRIPTION,
    PH_IMAGE_URL,
    PH_CANONICAL_URL,
    PH_DATE,
    PH_ROBOTS,
    PH_HEADER,
    PH_STRUCTURED_DATA,
];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("placeholder pattern is valid"));

static HEADER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?header[^>]*>").expect("header tag pattern is valid"));

/// Per-run values shared by every rendered page.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    /// Base for canonical URLs, without trailing slash.
    pub base_url: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Crawler directive for `{{ROBOTS}}`.
    pub robots: &'static str,
    /// Contents of the header partial, if one exists.
    pub header: Option<String>,
    pub site_name: String,
    pub currency: String,
}

/// The two pages produced for every destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Hotel picks with structured data: `city/{slug}.html`.
    Listing,
    /// Travel information: `city-info/{slug}.html`.
    Info,
}

impl PageKind {
    pub const ALL: [PageKind; 2] = [PageKind::Listing, PageKind::Info];

    pub fn label(self) -> &'static str {
        match self {
            PageKind::Listing => "listing",
            PageKind::Info => "info",
        }
    }

    /// Output path relative to the output root.
    pub fn output_path(self, slug: &str) -> String {
        match self {
            PageKind::Listing => naming::listing_page_path(slug),
            PageKind::Info => naming::info_page_path(slug),
        }
    }

    fn title(self, display: &str, site_name: &str) -> String {
        match self {
            PageKind::Listing => format!("{display} Hotel Picks | {site_name}"),
            PageKind::Info => format!("{display} Travel Guide | {site_name}"),
        }
    }

    fn description(self, display: &str) -> String {
        match self {
            PageKind::Listing => format!(
                "Compare popular hotels, family stays and pet-friendly lodging in {display} at a glance."
            ),
            PageKind::Info => {
                format!("Top sights, local food and places to stay in {display}, all in one place.")
            }
        }
    }

    fn image_url(self, destination: &DestinationEntry, base_url: &str) -> String {
        let slug = &destination.id;
        match self {
            PageKind::Listing => format!("{base_url}/assets/og/{slug}.jpg"),
            PageKind::Info => match destination.image.as_deref() {
                Some(img) if img.starts_with("http") || img.starts_with("/images/") => {
                    img.to_string()
                }
                _ => format!("/images/city/{slug}-main.jpg"),
            },
        }
    }

    /// Header fragment for this kind: the partial (listing pages drop its
    /// own `<header>` wrapper to avoid nesting) or a fallback banner.
    fn header_fragment(self, meta: &RunMetadata) -> String {
        match (&meta.header, self) {
            (Some(header), PageKind::Listing) => {
                HEADER_TAG_RE.replace_all(header, "").trim().to_string()
            }
            (Some(header), PageKind::Info) => header.clone(),
            (None, kind) => fallback_header(kind, &meta.site_name),
        }
    }
}

fn fallback_header(kind: PageKind, site_name: &str) -> String {
    let label = match kind {
        PageKind::Listing => "Hotel Search",
        PageKind::Info => "City Info",
    };
    html! {
        div.fallback-header { (site_name) " " (label) }
    }
    .into_string()
}

/// Read a page template. A missing or unreadable template is fatal.
pub fn load_template(path: &Path) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|source| RenderError::TemplateUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the shared header partial.
///
/// Returns `None` when the file is absent or unreadable; pages then use a
/// fallback header. A leading BOM and surrounding whitespace are removed.
pub fn load_header(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Some(raw.trim_start_matches('\u{feff}').trim().to_string()),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "header partial unreadable, using fallback");
            }
            None
        }
    }
}

/// Distinct `{{...}}` tokens in `template` the renderer does not know.
pub fn unmatched_placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .find_iter(template)
        .map(|m| m.as_str())
        .filter(|token| !PLACEHOLDERS.contains(token))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render one page for `destination`.
///
/// Deterministic for identical inputs apart from `meta.date`.
pub fn render(
    template: &str,
    kind: PageKind,
    destination: &DestinationEntry,
    groups: &ListingGroupSet,
    meta: &RunMetadata,
) -> Result<String, RenderError> {
    let display = destination.display_name.as_str();
    let canonical = format!("{}/{}", meta.base_url, kind.output_path(&destination.id));
    let mut structured = if template.contains(PH_STRUCTURED_DATA) {
        Some(structured_data(display, &groups.top_rated, &meta.currency)?)
    } else {
        None
    };

    // One pass over the template: substituted values are never rescanned
    let mut header = Some(kind.header_fragment(meta));
    let page = PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures| {
        let token = &caps[0];
        match token {
            PH_CITY_NAME => escape(display),
            PH_TITLE => escape(&kind.title(display, &meta.site_name)),
            PH_DESCRIPTION => escape(&kind.description(display)),
            PH_IMAGE_URL => escape(&kind.image_url(destination, &meta.base_url)),
            PH_CANONICAL_URL => escape(&canonical),
            PH_DATE => meta.date.clone(),
            PH_ROBOTS => meta.robots.to_string(),
            // Raw HTML and JSON, first occurrence only
            PH_HEADER => header.take().unwrap_or_else(|| token.to_string()),
            PH_STRUCTURED_DATA => structured.take().unwrap_or_else(|| token.to_string()),
            _ => token.to_string(),
        }
    });

    Ok(page.into_owned())
}

/// HTML-escape a text value for element content or a quoted attribute.
fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

// ============================================================================
// Structured data
// ============================================================================

#[derive(Serialize)]
struct ItemList<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    name: String,
    #[serde(rename = "itemListElement")]
    items: Vec<HotelItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HotelItem<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    name: &'a str,
    address: &'a str,
    image: &'a str,
    aggregate_rating: AggregateRating,
    price_range: String,
    position: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRating {
    #[serde(rename = "@type")]
    kind: &'static str,
    rating_value: f64,
    review_count: u32,
}

/// schema.org `ItemList` JSON for up to five listings, safe to embed in a
/// `<script>` element.
pub fn structured_data(
    display: &str,
    listings: &[ListingRecord],
    currency: &str,
) -> Result<String, RenderError> {
    let doc = ItemList {
        context: "https://schema.org",
        kind: "ItemList",
        name: format!("{display} Popular Hotels"),
        items: listings
            .iter()
            .take(GROUP_LIMIT)
            .enumerate()
            .map(|(idx, listing)| HotelItem {
                kind: "Hotel",
                name: &listing.name,
                address: &listing.address,
                image: &listing.image,
                aggregate_rating: AggregateRating {
                    kind: "AggregateRating",
                    rating_value: listing.rating,
                    review_count: review_count(&listing.name),
                },
                price_range: format!("{currency}{}~", format_thousands(listing.lowest_price)),
                position: idx + 1,
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    Ok(json.replace("</", "<\\/"))
}

/// Stable review count in `50..250`, derived from the listing name.
pub fn review_count(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    let n = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    50 + n % 200
}

/// `1234567` → `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
