//! AssessRec CLI - build, query and evaluate the hybrid retrieval index
//!
//! # Commands
//!
//! ```bash
//! # Index every assessment named in the training set
//! assessrec build --corpus data/train.jsonl
//!
//! # Recommend assessments for a job description
//! assessrec query "Mid-level Java developer with SQL" -k 5 --explain
//!
//! # Recall@10 over the test queries, written as JSON
//! assessrec evaluate --corpus data/train.jsonl --queries data/test.jsonl --report reports/recall.json
//!
//! # Show the skill/seniority tags found in a text
//! assessrec keywords "Senior C++ engineer, team lead"
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level); results go to stdout.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use assessrec_lib::{
    config::{Config, EmbeddingBackend},
    dataset::{load_catalog, load_test_queries, load_training_rows},
    embed::Embedder,
    eval::{MetricMode, RecallEvaluator, TrainingCorpus},
    item::Item,
    search::HybridRetriever,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

type Retriever = HybridRetriever<Box<dyn Embedder>>;

#[derive(Parser)]
#[command(name = "assessrec")]
#[command(about = "Hybrid semantic + keyword assessment recommender")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $ASSESSREC_CONFIG or ./assessrec.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the index artifacts
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Embedding backend: "fastembed" or "hash"
    #[arg(long, global = true)]
    embedder: Option<EmbeddingBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed items and save the index
    Build {
        /// Training rows; their unique items are indexed when no catalog is given
        #[arg(long, required_unless_present = "catalog")]
        corpus: Option<PathBuf>,

        /// Catalog of items with descriptive texts
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Recommend items for a query
    Query {
        /// Free-text query
        text: String,

        /// Number of results (defaults to retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Rank on semantic similarity alone
        #[arg(long)]
        no_keyword_boost: bool,

        /// Catalog whose texts are used for keyword matching
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Show the score breakdown per result
        #[arg(long)]
        explain: bool,
    },

    /// Compute Recall@K over a set of test queries
    Evaluate {
        /// Labelled (query, item) training rows
        #[arg(long)]
        corpus: PathBuf,

        /// Test queries
        #[arg(long)]
        queries: PathBuf,

        /// Cut-off K (defaults to retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Relevance mode: "exact" or "semantic"
        #[arg(long, default_value = "exact")]
        metric: MetricMode,

        /// Write the full report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the keyword profile of a text
    Keywords {
        /// Text to scan
        text: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = &cli.index_dir {
        config.index.dir = dir.clone();
    }
    if let Some(backend) = cli.embedder {
        config.embedding.backend = backend;
    }
    Ok(config)
}

fn create_retriever(config: &Config) -> Result<Retriever> {
    if config.embedding.backend == EmbeddingBackend::Fastembed {
        eprintln!(
            "Loading embedding model {} (first run downloads it)...",
            config.embedding.model
        );
    }
    let embedder = config
        .embedding
        .create_embedder()
        .context("failed to initialise embedding provider")?;
    let keywords = config
        .keyword_extractor()
        .context("failed to compile keyword vocabulary")?;

    Ok(HybridRetriever::with_config(embedder, config.retrieval.clone())?.with_keywords(keywords))
}

fn open_index(config: &Config) -> Result<Retriever> {
    let mut retriever = create_retriever(config)?;
    retriever.load_index(&config.index.dir).with_context(|| {
        format!(
            "failed to load index from {} (run `assessrec build` first)",
            config.index.dir.display()
        )
    })?;
    Ok(retriever)
}

fn load_corpus(path: &Path) -> Result<TrainingCorpus> {
    let rows = load_training_rows(path)
        .with_context(|| format!("failed to read training rows from {}", path.display()))?;
    Ok(TrainingCorpus::from_rows(&rows))
}

fn read_catalog(path: &Path) -> Result<Vec<Item>> {
    load_catalog(path).with_context(|| format!("failed to read catalog from {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Build { corpus, catalog } => {
            let items = match (&catalog, &corpus) {
                (Some(path), _) => read_catalog(path)?,
                (None, Some(path)) => load_corpus(path)?.to_items(),
                (None, None) => bail!("either --corpus or --catalog is required"),
            };
            println!("Indexing {} items...", items.len());

            let mut retriever = create_retriever(&config)?;
            retriever.build_index(&items).context("failed to build index")?;
            retriever.save_index(&config.index.dir).with_context(|| {
                format!("failed to save index to {}", config.index.dir.display())
            })?;

            println!(
                "Done! Index of {} items (dimension {}) saved to {}",
                retriever.len(),
                retriever.embedder().dimension(),
                config.index.dir.display()
            );
        }

        Commands::Query {
            text,
            k,
            no_keyword_boost,
            catalog,
            json,
            explain,
        } => {
            let mut retriever = open_index(&config)?;
            if let Some(path) = &catalog {
                let attached = retriever.attach_texts(&read_catalog(path)?);
                tracing::info!(attached, "attached catalog texts");
            }

            let top_k = k.unwrap_or(config.retrieval.top_k);
            let boost = config.retrieval.use_keyword_boost && !no_keyword_boost;
            let results = retriever.retrieve_detailed(&text, top_k, boost)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("=== Top {} for '{text}' ===\n", results.len());
                for result in &results {
                    println!("#{} (score: {:.4}) {}", result.rank, result.final_score, result.id);
                    if explain {
                        println!(
                            "    semantic {:.4} (distance {:.4}), keyword {:.4}",
                            result.semantic_score, result.distance, result.keyword_score
                        );
                    }
                }
            }
        }

        Commands::Evaluate {
            corpus,
            queries,
            k,
            metric,
            report,
        } => {
            let corpus = load_corpus(&corpus)?;
            let queries = load_test_queries(&queries)
                .with_context(|| format!("failed to read test queries from {}", queries.display()))?;
            let retriever = open_index(&config)?;

            let k = k.unwrap_or(config.retrieval.top_k);
            let result = RecallEvaluator::new(k, metric).evaluate(&retriever, &corpus, &queries)?;

            println!(
                "=== Recall@{k} ({}) over {} queries ===\n",
                result.metric_type, result.total_queries
            );
            println!("  Mean:   {:.4}", result.mean_recall);
            println!("  Median: {:.4}", result.median_recall);
            println!("  Min:    {:.4}", result.min_recall);
            println!("  Max:    {:.4}", result.max_recall);
            println!("\nNote: {}", result.note);

            if let Some(path) = report {
                result
                    .save(&path)
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                println!("Report written to {}", path.display());
            }
        }

        Commands::Keywords { text, json } => {
            let profile = config
                .keyword_extractor()
                .context("failed to compile keyword vocabulary")?
                .extract(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                let join = |set: &std::collections::BTreeSet<String>| {
                    set.iter().cloned().collect::<Vec<_>>().join(", ")
                };
                println!("Skills:    {}", join(&profile.skills));
                println!("Seniority: {}", join(&profile.seniority));
            }
        }
    }

    Ok(())
}
