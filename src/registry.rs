//! Destination registry loading.
//!
//! The registry is a JSON array of destinations and the source of truth for
//! iteration order: pages, snapshots and the run report all follow it.
//!
//! ```json
//! [
//!   { "id": "seoul", "display_name": "서울" },
//!   { "id": "busan", "display_name": "부산", "image": "/images/busan.jpg" }
//! ]
//! ```
//!
//! Ids are normalized with [`naming::normalize_slug`](crate::naming::normalize_slug)
//! on load. Any problem with the file is fatal for the run.

use crate::naming::normalize_slug;
use crate::types::DestinationEntry;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Registry {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Registry entry {index} has an invalid id {id:?} (expected [a-z0-9-])")]
    InvalidId { index: usize, id: String },
    #[error("Registry entry {index} repeats destination {slug:?}")]
    DuplicateId { index: usize, slug: String },
}

/// Load and validate the registry at `path`.
pub fn load(path: &Path) -> Result<Vec<DestinationEntry>, RegistryError> {
    let content = fs::read_to_string(path).map_err(|source| RegistryError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|err| match err {
        ParseError::Json(source) => RegistryError::Malformed {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Registry(err) => err,
    })
}

enum ParseError {
    Json(serde_json::Error),
    Registry(RegistryError),
}

fn parse(content: &str) -> Result<Vec<DestinationEntry>, ParseError> {
    let raw: Vec<DestinationEntry> = serde_json::from_str(content).map_err(ParseError::Json)?;
    normalize(raw).map_err(ParseError::Registry)
}

/// Normalize ids in place, rejecting invalid and colliding ones.
fn normalize(entries: Vec<DestinationEntry>) -> Result<Vec<DestinationEntry>, RegistryError> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let slug = normalize_slug(&entry.id).ok_or_else(|| RegistryError::InvalidId {
                index,
                id: entry.id.clone(),
            })?;
            if !seen.insert(slug.clone()) {
                return Err(RegistryError::DuplicateId { index, slug });
            }
            let display_name = match entry.display_name.trim() {
                "" => entry.id.trim().to_string(),
                name => name.to_string(),
            };
            Ok(DestinationEntry {
                id: slug,
                display_name,
                image: entry.image.filter(|i| !i.trim().is_empty()),
            })
        })
        .collect()
}
