//! Listing synthesis and grouping.
//!
//! Each destination gets a bounded collection of [`ListingRecord`]s from a
//! [`ListingSource`], which is then partitioned into a [`ListingGroupSet`]:
//!
//! - `topRated`: rating descending, ties keep source order, at most 5.
//! - one group per configured tag: case-insensitive amenity match, source
//!   order, at most 5.
//!
//! ## Sources
//!
//! - [`SyntheticSource`] builds sample listings from a generator seeded per
//!   destination, so the same registry and seed always yield the same data.
//! - [`JsonDirSource`] reads `{dir}/{slug}.json` exported from an external
//!   listings service.
//!
//! Records rated outside 0-5 are dropped before grouping, with a warning.
//!
//! A failing or empty source never aborts the run: [`synthesize`] falls back
//! to an empty group set and reports a warning for that destination only.

use crate::config::{GroupConfig, ListingsConfig};
use crate::types::{DestinationEntry, GROUP_LIMIT, ListingGroupSet, ListingRecord};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no listings for {slug} in {}", dir.display())]
    Missing { slug: String, dir: PathBuf },
    #[error("IO error reading {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed listings in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("listings source returned no records for {0}")]
    Empty(String),
    #[error("all {count} listings for {slug} have a rating outside 0-5")]
    InvalidRatings { slug: String, count: usize },
}

/// Supplies raw listing records for one destination.
///
/// Implementations must be shareable across the worker pool.
pub trait ListingSource: Sync {
    fn fetch(&self, destination: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError>;
}

/// Result of synthesizing one destination.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub groups: ListingGroupSet,
    /// Valid records received from the source before grouping.
    pub record_count: usize,
    /// Set when records were dropped or the groups fell back to empty.
    pub warning: Option<String>,
}

/// Fetch and partition listings for `destination`.
///
/// Source errors, empty results and sources with no validly rated records
/// degrade to an empty group set with a warning. Nothing here is fatal.
pub fn synthesize(
    source: &dyn ListingSource,
    destination: &DestinationEntry,
    groups: &[GroupConfig],
) -> Synthesis {
    let fetched = source.fetch(destination).and_then(|records| {
        if records.is_empty() {
            return Err(SourceError::Empty(destination.id.clone()));
        }
        let total = records.len();
        let valid: Vec<ListingRecord> =
            records.into_iter().filter(|r| r.has_valid_rating()).collect();
        if valid.is_empty() {
            return Err(SourceError::InvalidRatings {
                slug: destination.id.clone(),
                count: total,
            });
        }
        Ok((valid, total))
    });

    match fetched {
        Ok((records, total)) => {
            let dropped = total - records.len();
            let warning = (dropped > 0).then(|| {
                tracing::warn!(destination = %destination.id, dropped, "dropping listings rated outside 0-5");
                format!("dropped {dropped} of {total} listings with a rating outside 0-5")
            });
            Synthesis {
                groups: partition(&records, groups),
                record_count: records.len(),
                warning,
            }
        }
        Err(err) => {
            tracing::warn!(destination = %destination.id, error = %err, "listings unavailable, writing empty groups");
            let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
            Synthesis {
                groups: ListingGroupSet::empty(&keys),
                record_count: 0,
                warning: Some(err.to_string()),
            }
        }
    }
}

/// Partition records into `topRated` plus one group per tag.
pub fn partition(records: &[ListingRecord], groups: &[GroupConfig]) -> ListingGroupSet {
    let mut top_rated = records.to_vec();
    // sort_by is stable, so equal ratings keep their source order
    top_rated.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    top_rated.truncate(GROUP_LIMIT);

    let tagged = groups
        .iter()
        .map(|group| {
            let matches = records
                .iter()
                .filter(|r| r.has_amenity(&group.tag))
                .take(GROUP_LIMIT)
                .cloned()
                .collect();
            (group.key.clone(), matches)
        })
        .collect();

    ListingGroupSet { top_rated, tagged }
}

// ============================================================================
// Synthetic source
// ============================================================================

/// Deterministic sample listings.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: ListingsConfig,
}

impl SyntheticSource {
    pub fn new(config: ListingsConfig) -> Self {
        Self { config }
    }

    /// Generate `count` records for `destination`.
    pub fn generate(&self, destination: &DestinationEntry) -> Vec<ListingRecord> {
        let mut rng = ChaCha8Rng::seed_from_u64(destination_seed(self.config.seed, &destination.id));
        let [rating_lo, rating_hi] = self.config.rating_range;
        let [price_lo, price_hi] = self.config.price_range;
        let display = &destination.display_name;

        (0..self.config.count)
            .map(|i| {
                let rating: f64 = rng.gen_range(rating_lo..=rating_hi);
                let amenities = if i % 2 == 0 {
                    &self.config.even_amenities
                } else {
                    &self.config.odd_amenities
                };
                ListingRecord {
                    name: format!("{display} Hotel {}", i + 1),
                    city: display.clone(),
                    address: format!("{} Central Street, {display}", i + 10),
                    rating: (rating * 10.0).round() / 10.0,
                    lowest_price: rng.gen_range(price_lo..price_hi),
                    image: format!("https://picsum.photos/seed/{}-{i}/400/250", destination.id),
                    amenities: amenities.clone(),
                }
            })
            .collect()
    }
}

impl ListingSource for SyntheticSource {
    fn fetch(&self, destination: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError> {
        Ok(self.generate(destination))
    }
}

/// Per-destination generator seed: the first 8 bytes (little-endian) of
/// SHA-256 over `"listings\0"`, the run seed as little-endian `u64`, and the
/// slug.
pub fn destination_seed(seed: u64, slug: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"listings\0");
    hasher.update(seed.to_le_bytes());
    hasher.update(slug.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

// ============================================================================
// JSON directory source
// ============================================================================

/// Reads `{dir}/{slug}.json`, each a JSON array of listing records.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ListingSource for JsonDirSource {
    fn fetch(&self, destination: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError> {
        let path = self.dir.join(format!("{}.json", destination.id));
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::Missing {
                    slug: destination.id.clone(),
                    dir: self.dir.clone(),
                });
            }
            Err(source) => return Err(SourceError::Io { path, source }),
        };
        serde_json::from_str(&content).map_err(|source| SourceError::Malformed { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::test_helpers::{destination, listing};
    use tempfile::TempDir;

    fn default_groups() -> Vec<GroupConfig> {
        SiteConfig::default().groups
    }

    struct FailingSource;

    impl ListingSource for FailingSource {
        fn fetch(&self, d: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError> {
            Err(SourceError::Missing {
                slug: d.id.clone(),
                dir: PathBuf::from("nowhere"),
            })
        }
    }

    struct EmptySource;

    impl ListingSource for EmptySource {
        fn fetch(&self, _: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError> {
            Ok(Vec::new())
        }
    }

    struct FixedSource(Vec<ListingRecord>);

    impl ListingSource for FixedSource {
        fn fetch(&self, _: &DestinationEntry) -> Result<Vec<ListingRecord>, SourceError> {
            Ok(self.0.clone())
        }
    }

    // =========================================================================
    // partition
    // =========================================================================

    #[test]
    fn top_rated_sorted_descending_and_truncated() {
        let records: Vec<_> = [4.1, 4.9, 4.3, 5.0, 4.0, 4.7, 4.5]
            .iter()
            .enumerate()
            .map(|(i, r)| listing(&format!("H{i}"), *r, &[]))
            .collect();
        let set = partition(&records, &[]);
        let ratings: Vec<f64> = set.top_rated.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![5.0, 4.9, 4.7, 4.5, 4.3]);
    }

    #[test]
    fn top_rated_is_stable_on_ties() {
        let records = vec![
            listing("first", 4.5, &[]),
            listing("second", 4.8, &[]),
            listing("third", 4.5, &[]),
            listing("fourth", 4.5, &[]),
        ];
        let set = partition(&records, &[]);
        let names: Vec<&str> = set.top_rated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first", "third", "fourth"]);
    }

    #[test]
    fn top_rated_shorter_than_limit() {
        let records = vec![listing("a", 4.0, &[]), listing("b", 4.2, &[])];
        assert_eq!(partition(&records, &[]).top_rated.len(), 2);
    }

    #[test]
    fn tagged_groups_filter_case_insensitively_in_source_order() {
        let records = vec![
            listing("a", 4.0, &["Family", "WiFi"]),
            listing("b", 4.9, &["Pet Friendly", "Pool"]),
            listing("c", 4.1, &["FAMILY suites"]),
            listing("d", 4.2, &["pets welcome"]),
        ];
        let set = partition(&records, &default_groups());

        let pets: Vec<&str> = set
            .group("petFriendly")
            .unwrap()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(pets, vec!["b", "d"]);

        let family: Vec<&str> = set
            .group("family")
            .unwrap()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(family, vec!["a", "c"]);
    }

    #[test]
    fn tagged_groups_capped_at_limit() {
        let records: Vec<_> = (0..8)
            .map(|i| listing(&format!("H{i}"), 4.0, &["Family"]))
            .collect();
        let set = partition(&records, &default_groups());
        assert_eq!(set.group("family").unwrap().len(), GROUP_LIMIT);
        assert_eq!(set.group("family").unwrap()[4].name, "H4");
        assert!(set.group("petFriendly").unwrap().is_empty());
    }

    // =========================================================================
    // SyntheticSource
    // =========================================================================

    #[test]
    fn synthetic_generates_configured_count() {
        let source = SyntheticSource::new(ListingsConfig::default());
        let records = source.generate(&destination("seoul", "Seoul"));
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].name, "Seoul Hotel 1");
        assert_eq!(records[9].name, "Seoul Hotel 10");
        assert_eq!(records[0].address, "10 Central Street, Seoul");
        assert_eq!(records[3].image, "https://picsum.photos/seed/seoul-3/400/250");
    }

    #[test]
    fn synthetic_values_within_ranges() {
        let config = ListingsConfig::default();
        let source = SyntheticSource::new(config.clone());
        for record in source.generate(&destination("tokyo", "Tokyo")) {
            assert!((4.0..=5.0).contains(&record.rating), "{}", record.rating);
            assert_eq!((record.rating * 10.0).round() / 10.0, record.rating);
            assert!((70_000..170_000).contains(&record.lowest_price));
        }
    }

    #[test]
    fn synthetic_amenities_alternate_by_parity() {
        let source = SyntheticSource::new(ListingsConfig::default());
        let records = source.generate(&destination("seoul", "Seoul"));
        assert_eq!(records[0].amenities, vec!["Family", "WiFi"]);
        assert_eq!(records[1].amenities, vec!["Pet Friendly", "Pool"]);
        assert_eq!(records[2].amenities, vec!["Family", "WiFi"]);
    }

    #[test]
    fn synthetic_is_deterministic_per_destination() {
        let source = SyntheticSource::new(ListingsConfig::default());
        let seoul = destination("seoul", "Seoul");
        assert_eq!(source.generate(&seoul), source.generate(&seoul));

        let ratings = |d: &DestinationEntry| -> Vec<(f64, u64)> {
            source
                .generate(d)
                .iter()
                .map(|r| (r.rating, r.lowest_price))
                .collect()
        };
        assert_ne!(ratings(&seoul), ratings(&destination("busan", "Busan")));
    }

    #[test]
    fn destination_seed_depends_on_seed_and_slug() {
        assert_eq!(destination_seed(0, "seoul"), destination_seed(0, "seoul"));
        assert_ne!(destination_seed(0, "seoul"), destination_seed(1, "seoul"));
        assert_ne!(destination_seed(0, "seoul"), destination_seed(0, "busan"));
    }

    #[test]
    fn destination_seed_is_pinned() {
        // Changing these reshuffles every published synthetic page
        assert_eq!(destination_seed(0, "seoul"), 6732762747602095918);
        assert_eq!(destination_seed(42, "busan"), 9198380936100797752);
    }

    #[test]
    fn synthesize_seoul_scenario() {
        let source = SyntheticSource::new(ListingsConfig::default());
        let out = synthesize(&source, &destination("seoul", "Seoul"), &default_groups());
        assert!(out.warning.is_none());
        assert_eq!(out.record_count, 10);
        assert_eq!(out.groups.top_rated.len(), 5);
        let max = source
            .generate(&destination("seoul", "Seoul"))
            .iter()
            .map(|r| r.rating)
            .fold(f64::MIN, f64::max);
        assert_eq!(out.groups.top_rated[0].rating, max);
        // 5 even (Family) and 5 odd (Pet Friendly) records
        assert_eq!(out.groups.group("family").unwrap().len(), 5);
        assert_eq!(out.groups.group("petFriendly").unwrap().len(), 5);
    }

    #[test]
    fn out_of_range_ratings_are_dropped_with_warning() {
        let source = FixedSource(vec![
            listing("Broken High", 9.7, &["Family"]),
            listing("Broken Low", -3.0, &["Pet Friendly"]),
            listing("Fine", 4.2, &["Family"]),
        ]);
        let out = synthesize(&source, &destination("seoul", "Seoul"), &default_groups());

        let top: Vec<&str> = out.groups.top_rated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["Fine"]);
        assert_eq!(out.groups.group("family").unwrap().len(), 1);
        assert!(out.groups.group("petFriendly").unwrap().is_empty());
        assert_eq!(out.record_count, 1);
        assert_eq!(
            out.warning.as_deref(),
            Some("dropped 2 of 3 listings with a rating outside 0-5")
        );
    }

    // =========================================================================
    // Fallback
    // =========================================================================

    #[test]
    fn failing_source_falls_back_to_empty_groups() {
        let out = synthesize(&FailingSource, &destination("busan", "Busan"), &default_groups());
        assert!(out.groups.is_empty());
        assert!(out.warning.unwrap().contains("busan"));
        let json = serde_json::to_string(&out.groups).unwrap();
        assert_eq!(json, r#"{"topRated":[],"petFriendly":[],"family":[]}"#);
    }

    #[test]
    fn all_invalid_ratings_fall_back_to_empty_groups() {
        let source = FixedSource(vec![listing("A", 12.0, &[]), listing("B", f64::NAN, &[])]);
        let out = synthesize(&source, &destination("jeju", "Jeju"), &default_groups());
        assert!(out.groups.is_empty());
        assert_eq!(out.record_count, 0);
        assert!(out.warning.unwrap().contains("all 2 listings for jeju"));
    }

    #[test]
    fn empty_source_falls_back_with_warning() {
        let out = synthesize(&EmptySource, &destination("busan", "Busan"), &default_groups());
        assert!(out.groups.is_empty());
        assert!(out.warning.is_some());
    }

    // =========================================================================
    // JsonDirSource
    // =========================================================================

    #[test]
    fn json_dir_reads_destination_file() {
        let tmp = TempDir::new().unwrap();
        let records = vec![listing("Hotel A", 4.4, &["WiFi"])];
        fs::write(
            tmp.path().join("seoul.json"),
            serde_json::to_string(&records).unwrap(),
        )
        .unwrap();

        let source = JsonDirSource::new(tmp.path());
        assert_eq!(source.fetch(&destination("seoul", "Seoul")).unwrap(), records);
    }

    #[test]
    fn json_dir_missing_file() {
        let tmp = TempDir::new().unwrap();
        let source = JsonDirSource::new(tmp.path());
        let result = source.fetch(&destination("busan", "Busan"));
        assert!(matches!(result, Err(SourceError::Missing { .. })));
    }

    #[test]
    fn json_dir_malformed_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("busan.json"), "[{").unwrap();
        let source = JsonDirSource::new(tmp.path());
        let result = source.fetch(&destination("busan", "Busan"));
        assert!(matches!(result, Err(SourceError::Malformed { .. })));
    }
}
