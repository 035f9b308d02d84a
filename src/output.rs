//! CLI output formatting.
//!
//! Output is **destination-centric**: each destination leads with its
//! positional index and display name, and the files written for it follow as
//! indented context lines. Paths are shown relative to the output root.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Destinations
//! 001 Seoul (seoul, 10 listings)
//!     city-data/seoul-top5.json
//!     city/seoul.html
//!     city-info/seoul.html
//! 002 Busan (busan, no listings)
//!     Warning: no listings for busan in data/listings
//!     ...
//!
//! Sitemap → sitemap.xml (4 URLs)
//!
//! Warnings
//!     busan: no listings for busan in data/listings
//!
//! Generated 2 destinations, 4 pages, 2 snapshots
//! ```
//!
//! ## Check
//!
//! ```text
//! Destinations
//! 001 Seoul (seoul)
//! 002 Busan (busan)
//!
//! Templates
//!     listing: public/templates/city-template.html
//!     info: public/templates/city-info-template.html
//!     header: public/partials/header-search.html
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{CheckReport, RunReport, SitemapSummary};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` with `/` separators, or as-is if outside it.
fn display_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn format_warnings(warnings: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    if warnings.is_empty() {
        return lines;
    }
    lines.push(String::new());
    lines.push("Warnings".to_string());
    for warning in warnings {
        lines.push(format!("{}{}", indent(1), warning));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the report of a full build.
pub fn format_run_output(report: &RunReport) -> Vec<String> {
    let mut lines = vec!["Destinations".to_string()];
    let mut pages = 0;
    let mut snapshots = 0;

    for (i, outcome) in report.destinations.iter().enumerate() {
        let listings = match outcome.record_count {
            0 => "no listings".to_string(),
            n => plural(n, "listing", "listings"),
        };
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            outcome.display_name,
            outcome.slug,
            listings
        ));
        if let Some(warning) = &outcome.warning {
            lines.push(format!("{}Warning: {}", indent(1), warning));
        }
        for artifact in &outcome.artifacts {
            let rel = display_path(artifact, &report.output_dir);
            if rel.ends_with(".json") {
                snapshots += 1;
            } else {
                pages += 1;
            }
            lines.push(format!("{}{}", indent(1), rel));
        }
    }

    lines.push(String::new());
    lines.push(format_sitemap_line(&report.sitemap, &report.output_dir));
    lines.extend(format_warnings(&report.warnings));

    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {}, {}",
        plural(report.destinations.len(), "destination", "destinations"),
        plural(pages, "page", "pages"),
        plural(snapshots, "snapshot", "snapshots"),
    ));
    lines
}

/// Print build output to stdout.
pub fn print_run_output(report: &RunReport) {
    for line in format_run_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Sitemap
// ============================================================================

/// `Sitemap → sitemap.xml (4 URLs)`
pub fn format_sitemap_line(summary: &SitemapSummary, output_dir: &Path) -> String {
    format!(
        "Sitemap \u{2192} {} ({})",
        display_path(&summary.path, output_dir),
        plural(summary.entries, "URL", "URLs")
    )
}

/// Print the result of a sitemap-only rebuild.
pub fn print_sitemap_output(summary: &SitemapSummary, output_dir: &Path) {
    println!("{}", format_sitemap_line(summary, output_dir));
}

// ============================================================================
// Check
// ============================================================================

/// Format the inputs a build would use. Paths are shown relative to `root`.
pub fn format_check_output(report: &CheckReport, root: &Path) -> Vec<String> {
    let mut lines = vec!["Destinations".to_string()];
    for (i, destination) in report.destinations.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            destination.display_name,
            destination.id
        ));
    }

    lines.push(String::new());
    lines.push("Templates".to_string());
    lines.push(format!(
        "{}listing: {}",
        indent(1),
        display_path(&report.listing_template, root)
    ));
    lines.push(format!(
        "{}info: {}",
        indent(1),
        display_path(&report.info_template, root)
    ));
    match &report.header {
        Some(header) => lines.push(format!("{}header: {}", indent(1), display_path(header, root))),
        None => lines.push(format!("{}header: (fallback)", indent(1))),
    }

    lines.extend(format_warnings(&report.warnings));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &CheckReport, root: &Path) {
    for line in format_check_output(report, root) {
        println!("{}", line);
    }
}
