//! Run orchestration.
//!
//! A build walks a fixed sequence of states:
//!
//! ```text
//! Idle → RegistryLoaded → PerDestinationProcessing → SitemapBuilding → Done
//!   └──────────────┴───────────────┴────────────────────┴──→ Failed
//! ```
//!
//! Per destination the work is synthesize → render both pages → write the
//! snapshot and pages. Destinations own disjoint files and run on a bounded
//! rayon pool; results are collected in registry order. The sitemap is
//! built only after every destination has finished.
//!
//! Listing source problems never stop a run (the destination gets empty
//! groups and a warning). Everything else that goes wrong is fatal and
//! leaves the pipeline in [`RunState::Failed`]. Artifacts already written
//! stay on disk.

use crate::config::{self, ConfigError, ListingMode, ProjectPaths, SiteConfig};
use crate::naming;
use crate::registry::{self, RegistryError};
use crate::render::{self, PageKind, RenderError, RunMetadata};
use crate::sitemap::{self, SITEMAP_FILENAME, SitemapError};
use crate::synth::{self, JsonDirSource, ListingSource, SyntheticSource};
use crate::types::{DestinationEntry, PageArtifact};
use crate::writer::{ArtifactWriter, WriteError};
use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
    #[error("Snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RegistryLoaded,
    PerDestinationProcessing,
    SitemapBuilding,
    Done,
    Failed,
}

/// What happened to one destination.
#[derive(Debug, Clone)]
pub struct DestinationOutcome {
    pub slug: String,
    pub display_name: String,
    /// Records received from the listing source.
    pub record_count: usize,
    /// Absolute paths written, snapshot first.
    pub artifacts: Vec<PathBuf>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SitemapSummary {
    pub path: PathBuf,
    pub entries: usize,
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_dir: PathBuf,
    /// In registry order.
    pub destinations: Vec<DestinationOutcome>,
    /// Non-fatal diagnostics: template problems, then per-destination ones.
    pub warnings: Vec<String>,
    pub sitemap: SitemapSummary,
    pub state: RunState,
}

/// Result of `check`: inputs that would be used by a build.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub destinations: Vec<DestinationEntry>,
    pub listing_template: PathBuf,
    pub info_template: PathBuf,
    /// `None` when the header partial is absent and the fallback is used.
    pub header: Option<PathBuf>,
    pub warnings: Vec<String>,
}

struct Templates {
    listing: String,
    info: String,
}

impl Templates {
    fn load(paths: &ProjectPaths) -> Result<Self, RenderError> {
        Ok(Self {
            listing: render::load_template(&paths.listing_template)?,
            info: render::load_template(&paths.info_template)?,
        })
    }

    fn for_kind(&self, kind: PageKind) -> &str {
        match kind {
            PageKind::Listing => &self.listing,
            PageKind::Info => &self.info,
        }
    }

    /// One warning per template that contains unknown placeholders.
    fn warnings(&self, paths: &ProjectPaths) -> Vec<String> {
        PageKind::ALL
            .iter()
            .filter_map(|&kind| {
                let unknown = render::unmatched_placeholders(self.for_kind(kind));
                if unknown.is_empty() {
                    return None;
                }
                let path = match kind {
                    PageKind::Listing => &paths.listing_template,
                    PageKind::Info => &paths.info_template,
                };
                Some(format!(
                    "{} template {} has unknown placeholders left as-is: {}",
                    kind.label(),
                    path.display(),
                    unknown.join(", ")
                ))
            })
            .collect()
    }
}

/// Drives one build for a project root.
pub struct Pipeline<'a> {
    config: &'a SiteConfig,
    paths: ProjectPaths,
    started_at: DateTime<Utc>,
    state: RunState,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a SiteConfig, root: &Path) -> Self {
        Self {
            config,
            paths: config.paths(root),
            started_at: Utc::now(),
            state: RunState::Idle,
        }
    }

    /// Pin the run timestamp used for `{{date}}` and sitemap `lastmod`.
    pub fn with_timestamp(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Run with the listing source selected by `listings.mode`.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let source = listing_source(self.config, &self.paths);
        self.run_with_source(source.as_ref())
    }

    /// Run with an explicit listing source.
    pub fn run_with_source(
        &mut self,
        source: &dyn ListingSource,
    ) -> Result<RunReport, PipelineError> {
        let result = self.execute(source);
        if result.is_err() {
            self.advance(RunState::Failed);
        }
        result
    }

    fn advance(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn execute(&mut self, source: &dyn ListingSource) -> Result<RunReport, PipelineError> {
        let destinations = registry::load(&self.paths.registry)?;
        tracing::info!(count = destinations.len(), "registry loaded");
        self.advance(RunState::RegistryLoaded);

        let templates = Templates::load(&self.paths)?;
        let mut warnings = templates.warnings(&self.paths);
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        let meta = self.run_metadata();
        let writer = ArtifactWriter::new(&self.paths.output_dir);
        std::fs::create_dir_all(writer.root()).map_err(|source| WriteError::Failure {
            path: writer.root().to_path_buf(),
            source,
        })?;

        self.advance(RunState::PerDestinationProcessing);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config::effective_threads(&self.config.processing))
            .build()?;
        let outcomes: Vec<DestinationOutcome> = pool.install(|| {
            destinations
                .par_iter()
                .map(|destination| {
                    self.process_destination(destination, source, &templates, &meta, &writer)
                })
                .collect::<Result<Vec<_>, PipelineError>>()
        })?;
        warnings.extend(
            outcomes
                .iter()
                .filter_map(|o| o.warning.as_ref().map(|w| format!("{}: {w}", o.slug))),
        );

        self.advance(RunState::SitemapBuilding);
        let sitemap = write_sitemap(self.config, &self.paths, self.started_at)?;

        self.advance(RunState::Done);
        Ok(RunReport {
            output_dir: self.paths.output_dir.clone(),
            destinations: outcomes,
            warnings,
            sitemap,
            state: self.state,
        })
    }

    fn run_metadata(&self) -> RunMetadata {
        let header = render::load_header(&self.paths.header);
        if header.is_none() {
            tracing::info!(path = %self.paths.header.display(), "no header partial, using fallback");
        }
        RunMetadata {
            base_url: self.config.site.base().to_string(),
            date: self.started_at.format("%Y-%m-%d").to_string(),
            robots: self.config.site.robots(),
            header,
            site_name: self.config.site.name.clone(),
            currency: self.config.site.currency.clone(),
        }
    }

    fn process_destination(
        &self,
        destination: &DestinationEntry,
        source: &dyn ListingSource,
        templates: &Templates,
        meta: &RunMetadata,
        writer: &ArtifactWriter,
    ) -> Result<DestinationOutcome, PipelineError> {
        let slug = &destination.id;
        let synthesis = synth::synthesize(source, destination, &self.config.groups);

        let mut artifacts = vec![PageArtifact::data(
            naming::snapshot_path(slug),
            serde_json::to_string_pretty(&synthesis.groups)?,
        )];
        for kind in PageKind::ALL {
            let html = render::render(
                templates.for_kind(kind),
                kind,
                destination,
                &synthesis.groups,
                meta,
            )?;
            artifacts.push(PageArtifact::page(kind.output_path(slug), html));
        }

        let written = artifacts
            .iter()
            .map(|artifact| writer.write(artifact))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(destination = %slug, records = synthesis.record_count, "destination written");

        Ok(DestinationOutcome {
            slug: slug.clone(),
            display_name: destination.display_name.clone(),
            record_count: synthesis.record_count,
            artifacts: written,
            warning: synthesis.warning,
        })
    }
}

/// The listing source configured by `listings.mode`.
pub fn listing_source(config: &SiteConfig, paths: &ProjectPaths) -> Box<dyn ListingSource> {
    match config.listings.mode {
        ListingMode::Synthetic => Box::new(SyntheticSource::new(config.listings.clone())),
        ListingMode::Source => Box::new(JsonDirSource::new(&paths.source_dir)),
    }
}

/// Validate config, registry and templates without writing anything.
pub fn check(config: &SiteConfig, root: &Path) -> Result<CheckReport, PipelineError> {
    let paths = config.paths(root);
    let destinations = registry::load(&paths.registry)?;
    let templates = Templates::load(&paths)?;
    let warnings = templates.warnings(&paths);
    let header = render::load_header(&paths.header).map(|_| paths.header.clone());

    Ok(CheckReport {
        destinations,
        listing_template: paths.listing_template,
        info_template: paths.info_template,
        header,
        warnings,
    })
}

/// Regenerate `sitemap.xml` from whatever is currently in the output tree.
pub fn rebuild_sitemap(
    config: &SiteConfig,
    root: &Path,
    now: DateTime<Utc>,
) -> Result<SitemapSummary, PipelineError> {
    write_sitemap(config, &config.paths(root), now)
}

fn write_sitemap(
    config: &SiteConfig,
    paths: &ProjectPaths,
    now: DateTime<Utc>,
) -> Result<SitemapSummary, PipelineError> {
    let output_dir = &paths.output_dir;
    let internal = [
        paths.listing_template.as_path(),
        paths.info_template.as_path(),
        paths.header.as_path(),
    ];
    let descriptors = sitemap::discover(output_dir, &config.sitemap.exclude_files, &internal)?;
    let document = sitemap::build(
        &descriptors,
        config.site.base(),
        &now.to_rfc3339_opts(SecondsFormat::Secs, true),
        &config.sitemap.change_frequency,
    );
    let path = ArtifactWriter::new(output_dir)
        .write_bytes(Path::new(SITEMAP_FILENAME), document.to_xml().as_bytes())?;
    tracing::info!(entries = document.len(), path = %path.display(), "sitemap written");
    Ok(SitemapSummary {
        path,
        entries: document.len(),
    })
}
