use clap::{Parser, Subcommand};
use staypages::{config, output, pipeline, scaffold};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("STAYPAGES_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("STAYPAGES_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "staypages")]
#[command(about = "Generate destination landing pages, listing snapshots and a sitemap")]
#[command(long_about = "\
Generate destination landing pages, listing snapshots and a sitemap

Every destination in the registry gets a JSON snapshot of grouped hotel
listings and two pages rendered from HTML templates. A sitemap covering the
whole output tree is written last.

Project structure (default paths, see config.toml):

  config.toml                          # Optional, overrides stock defaults
  destinations.json                    # Registry: [{\"id\", \"display_name\", \"image\"?}]
  data/listings/{slug}.json            # Listing records (listings.mode = \"source\")
  public/
  ├── templates/
  │   ├── city-template.html           # → city/{slug}.html
  │   └── city-info-template.html      # → city-info/{slug}.html
  ├── partials/header-search.html      # {{HEADER_SEARCH}} (optional)
  ├── city/  city-info/  city-data/    # Generated
  └── sitemap.xml                      # Generated

Environment:
  BASE_URL   overrides site.base_url
  PROD=true  makes pages indexable (index,follow)
  RUST_LOG   log filter, e.g. RUST_LOG=staypages=debug

Run 'staypages init' to create a stock project.")]
#[command(version = version_string())]
struct Cli {
    /// Project root (directory containing config.toml)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: snapshots → pages → sitemap (default)
    Build,
    /// Validate config, registry and templates without writing anything
    Check,
    /// Rebuild sitemap.xml from the current output tree
    Sitemap,
    /// Write a stock project (config, registry, templates, header)
    Init,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let site_config = config::load_config(&cli.root)?;
            let mut run = pipeline::Pipeline::new(&site_config, &cli.root);
            println!("==> Building {}", run.paths().output_dir.display());
            let report = run.run()?;
            output::print_run_output(&report);
            println!("==> Build complete: {}", report.output_dir.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let site_config = config::load_config(&cli.root)?;
            let report = pipeline::check(&site_config, &cli.root)?;
            output::print_check_output(&report, &cli.root);
            println!("==> Project is valid");
        }
        Command::Sitemap => {
            let site_config = config::load_config(&cli.root)?;
            let summary = pipeline::rebuild_sitemap(&site_config, &cli.root, chrono::Utc::now())?;
            output::print_sitemap_output(&summary, &site_config.paths(&cli.root).output_dir);
        }
        Command::Init => {
            let written = scaffold::init(&cli.root)?;
            for path in &written {
                println!("    {}", path.display());
            }
            println!("==> Project created in {}", cli.root.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
