//! Stock project scaffold for `staypages init`.
//!
//! Writes everything a build needs at the default locations:
//!
//! ```text
//! config.toml                                 commented stock config
//! destinations.json                           sample registry
//! public/templates/city-template.html         listing page template
//! public/templates/city-info-template.html    info page template
//! public/partials/header-search.html          shared header
//! ```
//!
//! Templates are built with Maud so their markup is checked at compile time;
//! placeholders survive because Maud does not escape braces.

use crate::config::{self, CONFIG_FILENAME, SiteConfig};
use crate::render::{
    PH_CANONICAL_URL, PH_CITY_NAME, PH_DATE, PH_DESCRIPTION, PH_HEADER, PH_IMAGE_URL, PH_ROBOTS,
    PH_STRUCTURED_DATA, PH_TITLE,
};
use crate::types::DestinationEntry;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("{} already exists, refusing to overwrite", .0.display())]
    Exists(PathBuf),
    #[error("IO error writing {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Registry serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;color:#222}\
main{max-width:960px;margin:0 auto;padding:1rem}\
.fallback-header{padding:1rem;font-weight:600;border-bottom:1px solid #eee}";

fn head(extra: Markup) -> Markup {
    html! {
        head {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            title { (PH_TITLE) }
            meta name="description" content=(PH_DESCRIPTION);
            meta name="robots" content=(PH_ROBOTS);
            link rel="canonical" href=(PH_CANONICAL_URL);
            meta property="og:title" content=(PH_TITLE);
            meta property="og:description" content=(PH_DESCRIPTION);
            meta property="og:image" content=(PH_IMAGE_URL);
            meta property="og:url" content=(PH_CANONICAL_URL);
            style { (PreEscaped(STYLE)) }
            (extra)
        }
    }
}

/// Template for `city/{slug}.html`.
pub fn listing_template() -> String {
    let structured_data = html! {
        script type="application/ld+json" { (PreEscaped(PH_STRUCTURED_DATA)) }
    };
    html! {
        (DOCTYPE)
        html lang="ko" {
            (head(structured_data))
            body {
                header.site-header { (PreEscaped(PH_HEADER)) }
                main {
                    h1 { (PH_CITY_NAME) " hotels" }
                    section #top-rated { h2 { "Top rated in " (PH_CITY_NAME) } }
                    section #pet-friendly { h2 { "Pet friendly" } }
                    section #family { h2 { "Family stays" } }
                }
                footer { small { "Updated " time { (PH_DATE) } } }
            }
        }
    }
    .into_string()
}

/// Template for `city-info/{slug}.html`.
pub fn info_template() -> String {
    html! {
        (DOCTYPE)
        html lang="ko" {
            (head(html! {}))
            body {
                (PreEscaped(PH_HEADER))
                main {
                    img.hero src=(PH_IMAGE_URL) alt=(PH_CITY_NAME);
                    h1 { (PH_CITY_NAME) " travel guide" }
                    p { (PH_DESCRIPTION) }
                }
                footer { small { "Updated " time { (PH_DATE) } } }
            }
        }
    }
    .into_string()
}

/// Shared search header, included by both templates.
pub fn header_partial() -> String {
    html! {
        header.search-header {
            a.logo href="/" { "RapidStay" }
            form.search action="/search.html" method="get" {
                input type="search" name="q" placeholder="City or hotel";
                button type="submit" { "Search" }
            }
        }
    }
    .into_string()
}

/// Sample registry with a handful of destinations.
pub fn stock_registry_json() -> Result<String, serde_json::Error> {
    let sample = [
        ("seoul", "서울"),
        ("busan", "부산"),
        ("jeju", "제주"),
        ("tokyo", "도쿄"),
    ];
    let entries: Vec<DestinationEntry> = sample
        .iter()
        .map(|(id, display)| DestinationEntry {
            id: id.to_string(),
            display_name: display.to_string(),
            image: None,
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&entries)?;
    json.push('\n');
    Ok(json)
}

/// Write a stock project into `root`.
///
/// Fails without writing anything if any target file already exists.
/// Returns the written paths.
pub fn init(root: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let paths = SiteConfig::default().paths(root);
    let files = vec![
        (root.join(CONFIG_FILENAME), config::stock_config_toml().to_string()),
        (paths.registry, stock_registry_json()?),
        (paths.listing_template, listing_template()),
        (paths.info_template, info_template()),
        (paths.header, header_partial()),
    ];

    if let Some((existing, _)) = files.iter().find(|(path, _)| path.exists()) {
        return Err(ScaffoldError::Exists(existing.clone()));
    }

    let mut written = Vec::with_capacity(files.len());
    for (path, content) in files {
        let io_err = |source| ScaffoldError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, content).map_err(io_err)?;
        written.push(path);
    }
    Ok(written)
}
