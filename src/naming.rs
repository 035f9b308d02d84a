//! Destination slug handling.
//!
//! Every artifact produced for a destination is keyed by its slug: the
//! registry id, trimmed and lowercased. Slugs appear verbatim in file names
//! and URLs, so only `[a-z0-9-]` survives normalization:
//!
//! - `"Seoul"` → `"seoul"`
//! - `"ChiangMai"` → `"chiangmai"`
//! - `" busan "` → `"busan"`
//! - `"ho chi minh"` → rejected (space)
//! - `"../etc"` → rejected

/// Normalize a registry id into a slug.
///
/// Returns `None` when the id is empty after trimming or contains anything
/// other than ASCII letters, digits and dashes.
pub fn normalize_slug(id: &str) -> Option<String> {
    let slug = id.trim().to_lowercase();
    if slug.is_empty() || slug.starts_with('-') || slug.ends_with('-') {
        return None;
    }
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        .then_some(slug)
}

/// Relative path of a destination's listing page.
pub fn listing_page_path(slug: &str) -> String {
    format!("city/{slug}.html")
}

/// Relative path of a destination's informational page.
pub fn info_page_path(slug: &str) -> String {
    format!("city-info/{slug}.html")
}

/// Relative path of a destination's JSON snapshot.
pub fn snapshot_path(slug: &str) -> String {
    format!("city-data/{slug}-top5.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_mixed_case() {
        assert_eq!(normalize_slug("ChiangMai").as_deref(), Some("chiangmai"));
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(normalize_slug("  busan ").as_deref(), Some("busan"));
    }

    #[test]
    fn keeps_digits_and_inner_dashes() {
        assert_eq!(normalize_slug("new-york-2").as_deref(), Some("new-york-2"));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(normalize_slug(""), None);
        assert_eq!(normalize_slug("   "), None);
    }

    #[test]
    fn rejects_spaces_and_separators() {
        assert_eq!(normalize_slug("ho chi minh"), None);
        assert_eq!(normalize_slug("../etc"), None);
        assert_eq!(normalize_slug("a/b"), None);
    }

    #[test]
    fn rejects_non_ascii() {
        assert_eq!(normalize_slug("서울"), None);
    }

    #[test]
    fn rejects_edge_dashes() {
        assert_eq!(normalize_slug("-seoul"), None);
        assert_eq!(normalize_slug("seoul-"), None);
    }

    #[test]
    fn artifact_paths() {
        assert_eq!(listing_page_path("seoul"), "city/seoul.html");
        assert_eq!(info_page_path("seoul"), "city-info/seoul.html");
        assert_eq!(snapshot_path("seoul"), "city-data/seoul-top5.json");
    }
}
