//! Project configuration.
//!
//! Handles loading, validating, and layering `config.toml`. Stock defaults
//! are overridden by the project's `config.toml`, which is in turn
//! overridden by the run environment:
//!
//! ```text
//! stock defaults  →  <root>/config.toml  →  BASE_URL / PROD
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "public"             # Publishable tree, relative to the project root
//! registry = "destinations.json"    # Destination registry
//!
//! [site]
//! name = "RapidStay"
//! base_url = "https://rapidstay-c7f8e.web.app"
//! currency = "₩"
//! production = false                # true → index,follow
//!
//! [templates]
//! listing = "public/templates/city-template.html"
//! info = "public/templates/city-info-template.html"
//! header = "public/partials/header-search.html"
//!
//! [listings]
//! mode = "synthetic"                # or "source"
//! count = 10
//! seed = 0
//! rating_range = [4.0, 5.0]
//! price_range = [70000, 170000]
//! even_amenities = ["Family", "WiFi"]
//! odd_amenities = ["Pet Friendly", "Pool"]
//! source_dir = "data/listings"
//!
//! [[groups]]
//! key = "petFriendly"
//! tag = "pet"
//!
//! [sitemap]
//! change_frequency = "weekly"
//! exclude_files = ["404.html"]
//!
//! [processing]
//! max_processes = 4                 # Omit for auto = CPU cores
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.
//!
//! ## Environment
//!
//! - `BASE_URL` replaces `site.base_url`.
//! - `PROD=true` sets `site.production`; any other value clears it.

use crate::types::TOP_RATED_KEY;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
///
/// All fields have defaults; user config files only specify what they
/// override. Paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Root of the publishable tree. The sitemap is written here.
    pub output_dir: String,
    /// Destination registry (JSON array).
    pub registry: String,
    pub site: SiteSection,
    pub templates: TemplatesConfig,
    pub listings: ListingsConfig,
    /// Tagged listing groups, in snapshot order.
    pub groups: Vec<GroupConfig>,
    pub sitemap: SitemapConfig,
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            output_dir: "public".to_string(),
            registry: "destinations.json".to_string(),
            site: SiteSection::default(),
            templates: TemplatesConfig::default(),
            listings: ListingsConfig::default(),
            groups: vec![
                GroupConfig {
                    key: "petFriendly".to_string(),
                    tag: "pet".to_string(),
                },
                GroupConfig {
                    key: "family".to_string(),
                    tag: "family".to_string(),
                },
            ],
            sitemap: SitemapConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.site.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "site.base_url must start with http:// or https://, got {base:?}"
            )));
        }
        if self.listings.count == 0 {
            return Err(ConfigError::Validation(
                "listings.count must be at least 1".into(),
            ));
        }
        let [lo, hi] = self.listings.rating_range;
        if !(0.0..=5.0).contains(&lo) || !(0.0..=5.0).contains(&hi) || lo > hi {
            return Err(ConfigError::Validation(
                "listings.rating_range must be [min, max] within 0-5".into(),
            ));
        }
        let [lo, hi] = self.listings.price_range;
        if lo >= hi {
            return Err(ConfigError::Validation(
                "listings.price_range must be [min, max) with min < max".into(),
            ));
        }
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.key.is_empty() || group.tag.is_empty() {
                return Err(ConfigError::Validation(
                    "groups entries need a non-empty key and tag".into(),
                ));
            }
            if group.key == TOP_RATED_KEY {
                return Err(ConfigError::Validation(format!(
                    "group key {TOP_RATED_KEY:?} is reserved"
                )));
            }
            if !seen.insert(group.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate group key {:?}",
                    group.key
                )));
            }
        }
        Ok(())
    }

    /// Apply `BASE_URL` / `PROD` overrides using the given lookup.
    ///
    /// Takes a lookup function rather than reading the process environment
    /// directly so tests can supply their own values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.site.base_url = url.trim().to_string();
        }
        if let Some(prod) = lookup("PROD") {
            self.site.production = prod == "true";
        }
    }

    /// Resolve every configured path against the project root.
    pub fn paths(&self, root: &Path) -> ProjectPaths {
        ProjectPaths {
            output_dir: root.join(&self.output_dir),
            registry: root.join(&self.registry),
            listing_template: root.join(&self.templates.listing),
            info_template: root.join(&self.templates.info),
            header: root.join(&self.templates.header),
            source_dir: root.join(&self.listings.source_dir),
        }
    }

    pub fn group_keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.key.as_str()).collect()
    }
}

/// Absolute (root-joined) locations of everything a run touches.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub output_dir: PathBuf,
    pub registry: PathBuf,
    pub listing_template: PathBuf,
    pub info_template: PathBuf,
    pub header: PathBuf,
    pub source_dir: PathBuf,
}

/// Site identity and crawler visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Brand appended to page titles.
    pub name: String,
    /// Base for canonical and sitemap URLs, without trailing slash.
    pub base_url: String,
    /// Prefix for structured-data price ranges.
    pub currency: String,
    /// Production builds are indexable.
    pub production: bool,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            name: "RapidStay".to_string(),
            base_url: "https://rapidstay-c7f8e.web.app".to_string(),
            currency: "₩".to_string(),
            production: false,
        }
    }
}

impl SiteSection {
    /// Value for the `{{ROBOTS}}` placeholder.
    pub fn robots(&self) -> &'static str {
        if self.production {
            "index,follow"
        } else {
            "noindex,nofollow"
        }
    }

    /// Base URL with any trailing slashes removed.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Template for `city/{slug}.html`.
    pub listing: String,
    /// Template for `city-info/{slug}.html`.
    pub info: String,
    /// Shared header partial. Optional on disk.
    pub header: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            listing: "public/templates/city-template.html".to_string(),
            info: "public/templates/city-info-template.html".to_string(),
            header: "public/partials/header-search.html".to_string(),
        }
    }
}

/// Where listing records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// Deterministic generator seeded per destination.
    Synthetic,
    /// Per-destination JSON files under `listings.source_dir`.
    Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingsConfig {
    pub mode: ListingMode,
    /// Records synthesized per destination.
    pub count: usize,
    /// Mixed with each destination slug to seed its generator.
    pub seed: u64,
    /// Inclusive rating bounds.
    pub rating_range: [f64; 2],
    /// Half-open price bounds `[min, max)`.
    pub price_range: [u64; 2],
    /// Amenities for even-indexed records.
    pub even_amenities: Vec<String>,
    /// Amenities for odd-indexed records.
    pub odd_amenities: Vec<String>,
    /// Directory of `{slug}.json` files in source mode.
    pub source_dir: String,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            mode: ListingMode::Synthetic,
            count: 10,
            seed: 0,
            rating_range: [4.0, 5.0],
            price_range: [70_000, 170_000],
            even_amenities: vec!["Family".to_string(), "WiFi".to_string()],
            odd_amenities: vec!["Pet Friendly".to_string(), "Pool".to_string()],
            source_dir: "data/listings".to_string(),
        }
    }
}

/// A named snapshot group filtered by amenity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// JSON key in the snapshot.
    pub key: String,
    /// Case-insensitive amenity substring.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub change_frequency: String,
    /// File names never listed, wherever they live.
    pub exclude_files: Vec<String>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            change_frequency: "weekly".to_string(),
            exclude_files: vec!["404.html".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of destinations processed concurrently.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never below one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so an
///   overlay `[[groups]]` list replaces the stock groups.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize.
///
/// Validation is left to the caller so environment overrides can be applied
/// first.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load config for a project root with an explicit environment lookup.
pub fn load_config_with_env<F>(root: &Path, env: F) -> Result<SiteConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = resolve_config(stock_defaults_value(), load_raw_config(root)?)?;
    config.apply_env(env);
    config.validate()?;
    Ok(config)
}

/// Load config for a project root, applying the process environment.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_with_env(root, |key| std::env::var(key).ok())
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` and `init` commands.
pub fn stock_config_toml() -> &'static str {
    r##"# staypages configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Paths are relative to this file.
# Unknown keys will cause an error.
#
# Environment overrides (applied after this file):
#   BASE_URL=https://example.com   replaces site.base_url
#   PROD=true                      makes pages indexable (index,follow)

# Publishable tree. sitemap.xml is written at its root.
output_dir = "public"

# Destination registry: JSON array of {"id", "display_name", "image"?}.
registry = "destinations.json"

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
name = "RapidStay"
base_url = "https://rapidstay-c7f8e.web.app"
# Prefix for structured-data price ranges.
currency = "₩"
# false → noindex,nofollow on every page.
production = false

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
listing = "public/templates/city-template.html"
info = "public/templates/city-info-template.html"
# Optional. A fallback header is used when the file is missing.
header = "public/partials/header-search.html"

# ---------------------------------------------------------------------------
# Listings
# ---------------------------------------------------------------------------
[listings]
# "synthetic" generates deterministic sample listings.
# "source" reads <source_dir>/<slug>.json for each destination.
mode = "synthetic"
count = 10
seed = 0
rating_range = [4.0, 5.0]
price_range = [70000, 170000]
even_amenities = ["Family", "WiFi"]
odd_amenities = ["Pet Friendly", "Pool"]
source_dir = "data/listings"

# ---------------------------------------------------------------------------
# Snapshot groups (after topRated), matched case-insensitively on amenities
# ---------------------------------------------------------------------------
[[groups]]
key = "petFriendly"
tag = "pet"

[[groups]]
key = "family"
tag = "family"

# ---------------------------------------------------------------------------
# Sitemap
# ---------------------------------------------------------------------------
[sitemap]
change_frequency = "weekly"
exclude_files = ["404.html"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum destinations rendered in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.output_dir, "public");
        assert_eq!(config.listings.count, 10);
        assert_eq!(config.listings.mode, ListingMode::Synthetic);
        assert_eq!(config.group_keys(), vec!["petFriendly", "family"]);
        assert!(!config.site.production);
    }

    #[test]
    fn robots_follows_production_flag() {
        let mut site = SiteSection::default();
        assert_eq!(site.robots(), "noindex,nofollow");
        site.production = true;
        assert_eq!(site.robots(), "index,follow");
    }

    #[test]
    fn base_strips_trailing_slash() {
        let site = SiteSection {
            base_url: "https://example.com//".to_string(),
            ..SiteSection::default()
        };
        assert_eq!(site.base(), "https://example.com");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[listings]
count = 4
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.listings.count, 4);
        // Defaults preserved
        assert_eq!(config.listings.rating_range, [4.0, 5.0]);
        assert_eq!(config.site.name, "RapidStay");
    }

    #[test]
    fn parse_listing_mode() {
        let config: SiteConfig = toml::from_str("[listings]\nmode = \"source\"\n").unwrap();
        assert_eq!(config.listings.mode, ListingMode::Source);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_with_env(tmp.path(), no_env).unwrap();
        assert_eq!(config.site.base_url, "https://rapidstay-c7f8e.web.app");
        assert_eq!(config.registry, "destinations.json");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
output_dir = "dist"

[site]
name = "Stays"
"#,
        )
        .unwrap();

        let config = load_config_with_env(tmp.path(), no_env).unwrap();
        assert_eq!(config.output_dir, "dist");
        assert_eq!(config.site.name, "Stays");
        assert_eq!(config.site.currency, "₩");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "not valid toml [[[").unwrap();
        let result = load_config_with_env(tmp.path(), no_env);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn env_overrides_base_url_and_production() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_with_env(tmp.path(), |key| match key {
            "BASE_URL" => Some("https://staging.example.com".to_string()),
            "PROD" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.site.base_url, "https://staging.example.com");
        assert!(config.site.production);
    }

    #[test]
    fn prod_other_than_true_is_not_production() {
        let mut config = SiteConfig::default();
        config.site.production = true;
        config.apply_env(|key| (key == "PROD").then(|| "1".to_string()));
        assert!(!config.site.production);
    }

    #[test]
    fn env_base_url_is_validated() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_with_env(tmp.path(), |key| {
            (key == "BASE_URL").then(|| "ftp://nope".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn paths_are_joined_to_root() {
        let config = SiteConfig::default();
        let paths = config.paths(Path::new("/project"));
        assert_eq!(paths.output_dir, Path::new("/project/public"));
        assert_eq!(paths.registry, Path::new("/project/destinations.json"));
        assert_eq!(
            paths.header,
            Path::new("/project/public/partials/header-search.html")
        );
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r#"
[site]
name = "A"
currency = "$"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[site]\nname = \"B\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let site = merged.get("site").unwrap();
        assert_eq!(site.get("name").unwrap().as_str(), Some("B"));
        assert_eq!(site.get("currency").unwrap().as_str(), Some("$"));
    }

    #[test]
    fn overlay_groups_replace_stock_groups() {
        let overlay: toml::Value = toml::from_str(
            r#"
[[groups]]
key = "pool"
tag = "pool"
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.group_keys(), vec!["pool"]);
    }

    // =========================================================================
    // Unknown key rejection and validation tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[listings]\ncout = 3\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_count() {
        let mut config = SiteConfig::default();
        config.listings.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rating_range() {
        let mut config = SiteConfig::default();
        config.listings.rating_range = [4.5, 4.0];
        assert!(config.validate().is_err());
        config.listings.rating_range = [4.0, 5.5];
        assert!(config.validate().is_err());
        config.listings.rating_range = [5.0, 5.0];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_price_range() {
        let mut config = SiteConfig::default();
        config.listings.price_range = [100, 100];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_group_keys() {
        let mut config = SiteConfig::default();
        config.groups.push(GroupConfig {
            key: "family".to_string(),
            tag: "kids".to_string(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let mut config = SiteConfig::default();
        config.groups[0].key = TOP_RATED_KEY.to_string();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.output_dir, defaults.output_dir);
        assert_eq!(config.site.base_url, defaults.site.base_url);
        assert_eq!(config.listings.price_range, defaults.listings.price_range);
        assert_eq!(config.groups, defaults.groups);
        assert_eq!(config.sitemap.exclude_files, defaults.sitemap.exclude_files);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for section in ["site", "templates", "listings", "groups", "sitemap"] {
            assert!(val.get(section).is_some(), "missing {section}");
        }
    }
}
