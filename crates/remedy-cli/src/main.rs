//! Remedy Review - operator CLI
//!
//! The `remedy` command seeds the catalog and runs ranking and stats
//! maintenance against the configured store.
//!
//! ## Commands
//!
//! - `import`: Load users, sources and remedies from a JSON seed file
//! - `search`: Keyword search ordered by average rating
//! - `query`: Keyword search ranked by relevance score
//! - `recompute`: Recompute one remedy's stats
//! - `reconcile`: Recompute every remedy's stats

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use remedy_core::metrics::METRICS;
use remedy_core::{
    parse_id, Actor, EngineConfig, NewRemedy, NewSource, NewUser, RemedyEngine, RemedyId,
    RemedyRecord, ScoreBreakdown, UserId,
};
use remedy_state::{EntityStore, SurrealEntityStore};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "remedy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Remedy review platform operator tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON seed document through the catalog
    Import {
        /// Path to the seed file
        file: PathBuf,
    },

    /// Remedies treating any of the keywords, best rated first
    Search {
        /// Symptom name to match (repeatable)
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,
    },

    /// Remedies treating any of the keywords, ranked by relevance
    Query {
        /// Symptom name to match (repeatable)
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Include the per-component score breakdown
        #[arg(long)]
        explain: bool,
    },

    /// Recompute one remedy's stats from its approved reviews
    Recompute {
        /// Remedy id
        remedy_id: String,
    },

    /// Recompute every remedy's stats and report the stale ones
    Reconcile,
}

/// Seed document accepted by `remedy import`.
#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    users: Vec<NewUser>,
    #[serde(default)]
    sources: Vec<NewSource>,
    #[serde(default)]
    remedies: Vec<SeedRemedy>,
}

/// A remedy whose sources are referenced by URL.
#[derive(Debug, Deserialize)]
struct SeedRemedy {
    #[serde(flatten)]
    remedy: NewRemedy,
    #[serde(default)]
    source_urls: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct ImportSummary {
    users: usize,
    sources: usize,
    remedies: usize,
}

#[derive(Serialize)]
struct RankedView<'a> {
    remedy: &'a RemedyRecord,
    calculated_relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<ScoreBreakdown>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    remedy_core::telemetry::init_tracing(cli.json, level);

    let store = SurrealEntityStore::from_env()
        .await
        .context("Failed to connect to the remedy store")?;
    let engine = RemedyEngine::with_config(Arc::new(store), EngineConfig::from_env());

    let result = match cli.command {
        Commands::Import { file } => cmd_import(&engine, &file).await.map(|summary| {
            println!(
                "Imported {} users, {} sources, {} remedies",
                summary.users, summary.sources, summary.remedies
            );
        }),
        Commands::Search { keywords } => cmd_search(&engine, &keywords).await,
        Commands::Query { keywords, explain } => cmd_query(&engine, &keywords, explain).await,
        Commands::Recompute { remedy_id } => cmd_recompute(&engine, &remedy_id).await,
        Commands::Reconcile => cmd_reconcile(&engine).await,
    };

    METRICS.flush();
    result
}

/// Catalog writes from the CLI run with operator privileges.
fn operator() -> Actor {
    Actor::admin(UserId::new())
}

/// Import a seed file: users first, then sources, then remedies linked to
/// sources by URL.
async fn cmd_import<S: EntityStore>(engine: &RemedyEngine<S>, path: &Path) -> Result<ImportSummary> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let seed: Seed = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid seed file {}", path.display()))?;

    let actor = operator();
    let catalog = engine.catalog();
    let mut summary = ImportSummary::default();

    for user in seed.users {
        let username = user.username.clone();
        catalog
            .register_user(user)
            .await
            .with_context(|| format!("Failed to register user {username}"))?;
        summary.users += 1;
    }

    let mut sources_by_url = HashMap::new();
    for source in seed.sources {
        let url = source.url.clone();
        let created = catalog
            .create_source(&actor, source)
            .await
            .with_context(|| format!("Failed to create source {url}"))?;
        sources_by_url.insert(url, created.id);
        summary.sources += 1;
    }

    for SeedRemedy {
        mut remedy,
        source_urls,
    } in seed.remedies
    {
        for url in &source_urls {
            match sources_by_url.get(url) {
                Some(id) => remedy.source_ids.push(*id),
                None => bail!("Remedy {} cites unknown source {url}", remedy.name),
            }
        }
        let name = remedy.name.clone();
        catalog
            .create_remedy(&actor, remedy)
            .await
            .with_context(|| format!("Failed to create remedy {name}"))?;
        summary.remedies += 1;
    }

    info!(
        users = summary.users,
        sources = summary.sources,
        remedies = summary.remedies,
        "seed imported"
    );
    Ok(summary)
}

async fn cmd_search<S: EntityStore>(engine: &RemedyEngine<S>, keywords: &[String]) -> Result<()> {
    let found = engine.search().search_remedies(keywords).await?;
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

async fn cmd_query<S: EntityStore>(
    engine: &RemedyEngine<S>,
    keywords: &[String],
    explain: bool,
) -> Result<()> {
    let ranked = engine.search().query_remedies(keywords).await?;
    let view: Vec<RankedView<'_>> = ranked
        .iter()
        .map(|r| RankedView {
            remedy: &r.remedy,
            calculated_relevance_score: r.calculated_relevance_score,
            breakdown: explain.then_some(r.breakdown),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn cmd_recompute<S: EntityStore>(engine: &RemedyEngine<S>, raw_id: &str) -> Result<()> {
    let remedy_id: RemedyId = parse_id(raw_id)?;
    engine.catalog().get_remedy(&remedy_id).await?;
    let stats = engine.aggregator().recompute_remedy_stats(&remedy_id).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn cmd_reconcile<S: EntityStore>(engine: &RemedyEngine<S>) -> Result<()> {
    let report = engine.aggregator().reconcile_all().await?;
    println!(
        "Reconciled {} remedies: {} changed, {} lagging",
        report.remedies,
        report.changed.len(),
        report.lagging.len()
    );
    if !report.lagging.is_empty() {
        bail!("{} remedies could not be recomputed", report.lagging.len());
    }
    Ok(())
}
