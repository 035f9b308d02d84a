//! Shared types passed between pipeline stages.
//!
//! Destinations come from the registry, listings from the synthesizer, and
//! artifacts flow from the renderer into the writer and, later, the sitemap
//! builder. All of them are created fresh for every run.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

/// Maximum number of records kept in any listing group.
pub const GROUP_LIMIT: usize = 5;

/// Snapshot key for the rating-ordered group.
pub const TOP_RATED_KEY: &str = "topRated";

/// Upper bound of the rating scale.
pub const MAX_RATING: f64 = 5.0;

/// One destination from the registry.
///
/// `id` is the normalized slug and the join key for every artifact produced
/// for this destination (`city/{id}.html`, `city-data/{id}-top5.json`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationEntry {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(alias = "display")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One bookable property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub name: String,
    pub city: String,
    pub address: String,
    /// 0.0 to 5.0, one decimal place for synthesized records.
    pub rating: f64,
    pub lowest_price: u64,
    pub image: String,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl ListingRecord {
    /// Case-insensitive substring match of `tag` against any amenity.
    /// Ratings are on a 0-5 scale; anything else (including NaN) is bad data.
    pub fn has_valid_rating(&self) -> bool {
        (0.0..=MAX_RATING).contains(&self.rating)
    }

    pub fn has_amenity(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.amenities
            .iter()
            .any(|a| a.to_lowercase().contains(&needle))
    }
}

/// Listings partitioned into named groups.
///
/// Serializes as a flat JSON object: `topRated` first, then each tagged
/// group in configuration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingGroupSet {
    pub top_rated: Vec<ListingRecord>,
    pub tagged: Vec<(String, Vec<ListingRecord>)>,
}

impl ListingGroupSet {
    /// A set with every configured group present and empty.
    pub fn empty(group_keys: &[&str]) -> Self {
        Self {
            top_rated: Vec::new(),
            tagged: group_keys
                .iter()
                .map(|k| (k.to_string(), Vec::new()))
                .collect(),
        }
    }

    pub fn group(&self, key: &str) -> Option<&[ListingRecord]> {
        if key == TOP_RATED_KEY {
            return Some(&self.top_rated);
        }
        self.tagged
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.top_rated.is_empty() && self.tagged.iter().all(|(_, g)| g.is_empty())
    }
}

impl Serialize for ListingGroupSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.tagged.len()))?;
        map.serialize_entry(TOP_RATED_KEY, &self.top_rated)?;
        for (key, records) in &self.tagged {
            map.serialize_entry(key, records)?;
        }
        map.end()
    }
}

/// Where an artifact belongs in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactCategory {
    /// Published HTML page, listed in the sitemap.
    Page,
    /// Published JSON snapshot.
    Data,
    /// Template or partial; never published.
    Internal,
}

/// A rendered artifact ready for the writer.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    /// Path relative to the output root.
    pub output_path: PathBuf,
    pub content: String,
    pub category: ArtifactCategory,
}

impl PageArtifact {
    pub fn page(output_path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            output_path: output_path.into(),
            content,
            category: ArtifactCategory::Page,
        }
    }

    pub fn data(output_path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            output_path: output_path.into(),
            content,
            category: ArtifactCategory::Data,
        }
    }
}
