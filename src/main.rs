//! publist - Google Scholar publication list exporter
//!
//! Resolves one author's Scholar profile, normalizes the publication list and
//! writes the JSON file consumed by the website.
//!
//! ## Usage
//!
//! ```bash
//! publist update --id RZAgZ88AAAAJ --out lab_website/assets/publications.json --selected 3
//! publist update --id RZAgZ88AAAAJ --name "Anna Nowak" --affiliation "warsaw|fuw.edu.pl" \
//!     --out assets/publications.json --metadata assets/publications.meta.json --strict
//! publist authors --name "Anna Nowak" --affiliation warsaw
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use publist::config::{ProxyConfig, RunConfig, DEFAULT_SELECTED};
use publist::pipeline::HarvestOptions;
use publist::report::EXIT_FAILURE;
use publist::resolver::{AffiliationMatcher, AuthorQuery, AuthorResolver};
use publist::retry::RetryPolicy;
use publist::scholar::ScholarSource;
use publist::source::{save_snapshot, PublicationSource, SnapshotSource};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Google Scholar publication list exporter
#[derive(Parser)]
#[command(name = "publist")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch publications and write the website JSON
    Update {
        #[command(flatten)]
        author: AuthorArgs,

        /// Output JSON path, e.g. lab_website/assets/publications.json
        #[arg(short, long)]
        out: PathBuf,

        /// Optional run metadata JSON path
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// How many newest publications to mark as selected
        #[arg(long, default_value_t = DEFAULT_SELECTED, allow_negative_numbers = true)]
        selected: i64,

        /// Seconds to wait between publication detail fetches
        #[arg(long, default_value_t = 0.5)]
        delay: f64,

        /// Exit with status 2 if fewer publications are written than listed
        #[arg(long)]
        strict: bool,

        /// Fetch full detail only for the newest N publications
        #[arg(long)]
        enrich_limit: Option<usize>,

        /// Replay a saved profile snapshot instead of querying Scholar
        #[arg(long)]
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        net: NetArgs,
    },

    /// Search author profiles by name
    Authors {
        /// Author display name
        #[arg(long)]
        name: String,

        /// Pattern matched against affiliation or e-mail domain
        #[arg(long)]
        affiliation: Option<String>,

        #[command(flatten)]
        net: NetArgs,
    },

    /// Save a resolved profile for later offline runs
    Snapshot {
        #[command(flatten)]
        author: AuthorArgs,

        /// Snapshot JSON path
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        net: NetArgs,
    },
}

#[derive(Args)]
struct AuthorArgs {
    /// Google Scholar user id (from citations?user=...)
    #[arg(long)]
    id: Option<String>,

    /// Author display name, used when the ID lookup fails
    #[arg(long)]
    name: Option<String>,

    /// Pattern matched against affiliation or e-mail domain of name-search hits
    #[arg(long)]
    affiliation: Option<String>,
}

impl AuthorArgs {
    fn query(&self) -> Result<AuthorQuery> {
        if self.id.is_none() && self.name.is_none() {
            anyhow::bail!("either --id or --name is required");
        }
        Ok(AuthorQuery {
            id: self.id.clone(),
            name: self.name.clone(),
            affiliation: self.affiliation.clone(),
        })
    }
}

#[derive(Args)]
struct NetArgs {
    /// Proxy URL (e.g., http://127.0.0.1:7890)
    #[arg(long, env = "SCHOLAR_PROXY")]
    proxy: Option<String>,

    /// ScraperAPI key; routes requests through ScraperAPI
    #[arg(long, env = "SCRAPERAPI_KEY", hide_env_values = true)]
    scraperapi_key: Option<String>,

    /// Rotate through the proxies given in --proxy-pool
    #[arg(long, env = "FREE_PROXIES")]
    free_proxies: bool,

    /// Comma-separated proxy URLs for the rotating pool
    #[arg(long, env = "PROXY_POOL", value_delimiter = ',')]
    proxy_pool: Vec<String>,

    /// Mirror site URL
    #[arg(long)]
    mirror: Option<String>,
}

impl NetArgs {
    fn source(&self) -> Result<ScholarSource> {
        let proxy = ProxyConfig::from_parts(
            self.proxy.clone(),
            self.scraperapi_key.clone(),
            self.free_proxies,
            &self.proxy_pool,
        )?;
        ScholarSource::new(&proxy, self.mirror.as_deref()).context("Failed to set up Scholar client")
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let result = match cli.command {
        Commands::Update {
            author,
            out,
            metadata,
            selected,
            delay,
            strict,
            enrich_limit,
            snapshot,
            net,
        } => {
            run_update(
                author,
                RunConfig {
                    selected,
                    output: out,
                    metadata,
                    strict,
                },
                delay,
                enrich_limit,
                snapshot,
                net,
            )
            .await
        }
        Commands::Authors {
            name,
            affiliation,
            net,
        } => run_authors(name, affiliation, net).await,
        Commands::Snapshot { author, out, net } => run_snapshot(author, out, net).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_update(
    author: AuthorArgs,
    config: RunConfig,
    delay: f64,
    enrich_limit: Option<usize>,
    snapshot: Option<PathBuf>,
    net: NetArgs,
) -> Result<u8> {
    let query = author.query()?;
    let options = HarvestOptions {
        delay: Duration::try_from_secs_f64(delay).context("Invalid --delay")?,
        enrich_limit,
    };

    match snapshot {
        Some(path) => {
            let source = SnapshotSource::load(&path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            update_with(&source, &query, RetryPolicy::immediate(1), &options, &config).await
        }
        None => {
            let source = net.source()?;
            update_with(&source, &query, RetryPolicy::default(), &options, &config).await
        }
    }
}

async fn update_with<S: PublicationSource>(
    source: &S,
    query: &AuthorQuery,
    retry: RetryPolicy,
    options: &HarvestOptions,
    config: &RunConfig,
) -> Result<u8> {
    let summary = publist::run::update(source, query, retry, options, config)
        .await
        .context("Update failed")?;
    let meta = &summary.metadata;

    println!(
        "Successfully wrote {} publications to {} ({} listed, {} skipped, {} selected)",
        meta.written_count,
        config.output.display(),
        meta.raw_count,
        meta.skipped_count,
        meta.selected_count
    );
    if let Some(path) = &config.metadata {
        println!("Metadata: {}", path.display());
    }

    Ok(summary.outcome.exit_code())
}

async fn run_authors(name: String, affiliation: Option<String>, net: NetArgs) -> Result<u8> {
    let source = net.source()?;
    let matcher = AffiliationMatcher::new(affiliation.as_deref())?;
    let everyone = AffiliationMatcher::new(None)?;

    let resolver = AuthorResolver::new(&source, RetryPolicy::default());
    let candidates = resolver.candidates(&name, &everyone).await?;

    if candidates.is_empty() {
        println!("No profiles found for '{}'.", name);
        return Ok(0);
    }

    for c in &candidates {
        let mark = if matcher.matches(c) { "*" } else { " " };
        println!("{} {}  {}  {}  {}", mark, c.id, c.name, c.affiliation, c.email_domain);
    }
    println!("\n{} profiles; * = matches the affiliation pattern", candidates.len());
    Ok(0)
}

async fn run_snapshot(author: AuthorArgs, out: PathBuf, net: NetArgs) -> Result<u8> {
    let query = author.query()?;
    let source = net.source()?;

    let resolution = AuthorResolver::new(&source, RetryPolicy::default())
        .resolve(&query)
        .await
        .context("Could not resolve author")?;

    save_snapshot(&resolution.author, &out)?;
    println!(
        "Saved {} ({} publications, via {}) to {}",
        resolution.author.name,
        resolution.author.publications.len(),
        resolution.method,
        out.display()
    );
    Ok(0)
}
