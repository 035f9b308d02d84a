//! # staypages
//!
//! A batch generator for destination landing pages. Given a registry of
//! destinations and two HTML templates, it produces for every destination a
//! JSON snapshot of grouped hotel listings, a listing page and an
//! informational page, then a `sitemap.xml` covering the whole output tree.
//!
//! # Architecture: One Run, Fixed Stages
//!
//! ```text
//! destinations.json ──→ registry ──┐
//!                                  ├─ per destination (parallel) ─────────────────┐
//! listings source ───→ synth ──────┤   snapshot  city-data/{slug}-top5.json       │
//! templates ─────────→ render ─────┤   listing   city/{slug}.html                 │
//!                                  └─→ writer    city-info/{slug}.html            │
//!                                                                                 ↓
//!                                          sitemap: walk output tree → sitemap.xml
//! ```
//!
//! Each destination is independent and runs on a bounded worker pool. The
//! sitemap waits for all of them, then walks the output directory so pages
//! written by hand are listed too.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Loads and validates the ordered destination list |
//! | [`synth`] | Fetches or generates listings and partitions them into groups |
//! | [`render`] | Placeholder substitution and schema.org structured data |
//! | [`writer`] | Atomic per-file writes under the output root |
//! | [`sitemap`] | Output tree discovery, classification and sitemap XML |
//! | [`pipeline`] | Orchestration, run states and the run report |
//! | [`config`] | `config.toml` loading, merging, validation and env overrides |
//! | [`scaffold`] | Stock project for `staypages init` |
//! | [`types`] | Values passed between stages (`DestinationEntry`, `ListingRecord`, ...) |
//! | [`naming`] | Slug normalization and per-destination output paths |
//! | [`output`] | CLI output formatting of run and check reports |
//!
//! # Design Decisions
//!
//! ## Templates Stay on Disk
//!
//! Unlike the stock templates written by `init`, page templates are plain
//! files edited by designers. Rendering is a fixed set of `{{placeholder}}`
//! substitutions; unknown tokens are left alone and reported once per
//! template instead of failing the run.
//!
//! ## Deterministic Output
//!
//! Synthetic listings come from a ChaCha generator seeded by the run seed and
//! the destination slug, review counts are derived from listing names, and
//! sitemap entries are sorted. Two runs over the same inputs differ only in
//! `{{date}}` and `<lastmod>`.
//!
//! ## Degrade Per Destination, Fail Per Run
//!
//! A listings source that fails or returns nothing only empties that
//! destination's groups. Missing templates, a bad registry, invalid config
//! and write errors stop the run; files written before the failure remain.

pub mod config;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod scaffold;
pub mod sitemap;
pub mod synth;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
