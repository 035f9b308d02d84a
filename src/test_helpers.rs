//! Shared test utilities for the staypages test suite.
//!
//! Builders for the core value types plus a throwaway project on disk laid
//! out at the default config locations.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = write_project(&[("seoul", "Seoul"), ("busan", "Busan")]);
//! let config = SiteConfig::default();
//! let report = Pipeline::new(&config, tmp.path())
//!     .with_timestamp(fixed_time())
//!     .run()
//!     .unwrap();
//! ```

use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::render::RunMetadata;
use crate::scaffold;
use crate::types::{DestinationEntry, ListingRecord};

// =========================================================================
// Value builders
// =========================================================================

pub fn destination(id: &str, display_name: &str) -> DestinationEntry {
    DestinationEntry {
        id: id.to_string(),
        display_name: display_name.to_string(),
        image: None,
    }
}

/// A listing priced at 90,000 in Seoul.
pub fn listing(name: &str, rating: f64, amenities: &[&str]) -> ListingRecord {
    ListingRecord {
        name: name.to_string(),
        city: "Seoul".to_string(),
        address: "10 Central Street, Seoul".to_string(),
        rating,
        lowest_price: 90_000,
        image: "https://picsum.photos/seed/test/400/250".to_string(),
        amenities: amenities.iter().map(|a| a.to_string()).collect(),
    }
}

/// Staging metadata with no header partial.
pub fn run_metadata() -> RunMetadata {
    RunMetadata {
        base_url: "https://example.com".to_string(),
        date: "2026-10-15".to_string(),
        robots: "noindex,nofollow",
        header: None,
        site_name: "RapidStay".to_string(),
        currency: "₩".to_string(),
    }
}

/// 2026-10-15 09:30:00 UTC.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap()
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a project with the given `(id, display_name)` registry, the stock
/// templates and header partial at their default paths, and no config file.
pub fn write_project(destinations: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let paths = SiteConfig::default().paths(tmp.path());

    let entries: Vec<DestinationEntry> = destinations
        .iter()
        .map(|(id, display)| destination(id, display))
        .collect();
    fs::write(&paths.registry, serde_json::to_string(&entries).unwrap()).unwrap();

    for (path, content) in [
        (&paths.listing_template, scaffold::listing_template()),
        (&paths.info_template, scaffold::info_template()),
        (&paths.header, scaffold::header_partial()),
    ] {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    tmp
}
