mod display;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use spellbook_ai::{AnthropicClient, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL, RulesAssistant, SessionStore};
use spellbook_core::{CARD_DATABASE_ID, parse_rules};
use spellbook_refresh::{CardDatabaseRefresher, RulesIngestor, StalenessGate, run_periodic};
use spellbook_store::{CardStore, DuckStore, MetadataStore, RuleStore};
use spellbook_sync::{BulkCardLoader, DEFAULT_BULK_DATA_URL, DEFAULT_RULES_URL, RulebookClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "spellbook", version, about = "Card database and rules assistant")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every subcommand. Each one falls back to an
/// environment variable.
#[derive(Args)]
struct Config {
    /// DuckDB database file
    #[arg(long, env = "SPELLBOOK_DB", default_value = "data/spellbook.duckdb", global = true)]
    db: PathBuf,

    /// Comprehensive rules text file to download
    #[arg(long, env = "SPELLBOOK_RULES_URL", default_value = DEFAULT_RULES_URL, global = true)]
    rules_url: String,

    /// Local rulebook used when the download fails
    #[arg(
        long,
        env = "SPELLBOOK_RULES_FALLBACK",
        default_value = "data/MagicCompRules.txt",
        global = true
    )]
    rules_fallback: PathBuf,

    /// Bulk-data index describing the card snapshot
    #[arg(long, env = "SPELLBOOK_BULK_DATA_URL", default_value = DEFAULT_BULK_DATA_URL, global = true)]
    bulk_data_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one card database refresh cycle (cards, then rules, then metadata)
    Refresh {
        /// Ignore the freshness windows
        #[arg(long)]
        force: bool,
    },
    /// Refresh only the rules, downloading the rulebook unless it is fresh
    RefreshRules {
        /// Ignore the seven-day freshness window
        #[arg(long)]
        force: bool,
    },
    /// Replace the stored rules from a local rulebook file
    IngestRules {
        /// Path to the plain-text rulebook
        path: PathBuf,
    },
    /// Parse a rulebook and print the result without touching the database
    ParseRules {
        /// Path to the plain-text rulebook
        path: PathBuf,
        /// Max rules to print
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show one rule by number (e.g. 702.19b)
    Rule { number: String },
    /// Search the stored rules
    Search {
        query: String,
        /// Max results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Ask the rules assistant questions interactively
    Chat {
        /// Anthropic API key
        #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Model name
        #[arg(long, env = "SPELLBOOK_MODEL", default_value = DEFAULT_MODEL)]
        model: String,
        /// Messages API base URL
        #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = DEFAULT_ANTHROPIC_URL)]
        api_url: String,
    },
    /// Refresh at startup and then on a fixed period until interrupted
    Daemon {
        /// Hours between refresh cycles
        #[arg(long, default_value = "24")]
        interval_hours: u64,
    },
    /// Show refresh metadata and table counts
    Status,
    /// Run a SQL query against the database and print the result
    Query { sql: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let t0 = Instant::now();

    match cli.command {
        Commands::ParseRules { path, limit } => {
            let raw = std::fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let rules = parse_rules(&String::from_utf8_lossy(&raw));
            println!("Parsed {} rules from {}", rules.len(), path.display());
            for rule in rules.iter().take(limit) {
                display::print_rule_line(rule);
            }
        }
        Commands::Refresh { force } => {
            let store = open_store(&cli.config.db)?;
            let refresher = build_refresher(&cli.config, store);
            let outcome = if force {
                refresher.force_update_card_database().await
            } else {
                refresher.update_card_database().await
            };
            display::print_outcome("Refresh", &outcome);
            if !outcome.success {
                bail!("refresh failed");
            }
        }
        Commands::RefreshRules { force } => {
            let store = open_store(&cli.config.db)?;
            let ingest = build_ingestor(&cli.config, store);
            let gate = if force {
                StalenessGate::Ignore
            } else {
                StalenessGate::Check
            };
            let outcome = ingest.refresh_rules(gate).await;
            display::print_outcome("Rules", &outcome);
            if !outcome.success {
                bail!("rules refresh failed");
            }
        }
        Commands::IngestRules { path } => {
            let store = open_store(&cli.config.db)?;
            let ingest = build_ingestor(&cli.config, store);
            let count = ingest
                .update_rules_database(&path)
                .await
                .with_context(|| format!("ingesting {}", path.display()))?;
            println!("Stored {count} rules from {}", path.display());
        }
        Commands::Rule { number } => {
            let store = open_store(&cli.config.db)?;
            match store.get_rule(&number).await? {
                Some(rule) => display::print_rule_card(&rule),
                None => bail!("no rule numbered {number}"),
            }
        }
        Commands::Search { query, limit } => {
            let store = open_store(&cli.config.db)?;
            let found = store.search_rules(&query, limit).await?;
            if found.is_empty() {
                println!("No matching rules. Run 'refresh-rules' first if the table is empty.");
            } else {
                println!("{} matching rules:", found.len());
                for rule in &found {
                    display::print_rule_line(rule);
                }
            }
        }
        Commands::Chat {
            api_key,
            model,
            api_url,
        } => {
            let Some(api_key) = api_key else {
                bail!("set ANTHROPIC_API_KEY or pass --api-key");
            };
            let store = open_store(&cli.config.db)?;
            let llm = Arc::new(AnthropicClient::new(api_url, api_key, model));
            run_chat(RulesAssistant::new(llm, store)).await?;
        }
        Commands::Daemon { interval_hours } => {
            let store = open_store(&cli.config.db)?;
            let refresher = build_refresher(&cli.config, store);
            let period = Duration::from_secs(interval_hours.max(1) * 60 * 60);
            info!(interval_hours, "refresh daemon started, Ctrl-C to stop");
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            let runs = run_periodic(&refresher, period, shutdown).await;
            println!("Stopped after {runs} refresh cycle(s)");
        }
        Commands::Status => {
            let store = open_store(&cli.config.db)?;
            match store.get_metadata(CARD_DATABASE_ID).await? {
                Some(meta) => display::print_metadata(&meta),
                None => println!("Card database has never been refreshed.\n"),
            }
            println!("Tables");
            println!("  {:<26} {}", "rules", store.rule_count().await?);
            println!("  {:<26} {}", "cards", store.count_cards().await?);
            if let Some(created) = store.latest_rule_created_at().await? {
                println!("  {:<26} {}", "rules_loaded_at", created.to_rfc3339());
            }
        }
        Commands::Query { sql } => {
            let store = open_store(&cli.config.db)?;
            let batches = store.query_arrow(&sql)?;
            let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
            println!("{}", arrow::util::pretty::pretty_format_batches(&batches)?);
            println!("{rows} row(s)");
        }
    }

    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "done");
    Ok(())
}

fn open_store(path: &Path) -> anyhow::Result<Arc<DuckStore>> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let store = DuckStore::open_persistent(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_ingestor(config: &Config, store: Arc<DuckStore>) -> RulesIngestor {
    let source = Arc::new(RulebookClient::new(config.rules_url.clone()));
    RulesIngestor::new(store, source, config.rules_fallback.clone())
}

fn build_refresher(config: &Config, store: Arc<DuckStore>) -> CardDatabaseRefresher {
    let loader = Arc::new(BulkCardLoader::new(config.bulk_data_url.clone(), store.clone()));
    let ingest = build_ingestor(config, store.clone());
    CardDatabaseRefresher::new(loader, ingest, store.clone(), store)
}

async fn run_chat(assistant: RulesAssistant) -> anyhow::Result<()> {
    const SESSION: &str = "cli";

    let mut sessions = SessionStore::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask a rules question. Empty line or Ctrl-D to quit, '/reset' to forget the conversation.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }
        if question == "/reset" {
            sessions.end(SESSION);
            println!("Conversation cleared.");
            continue;
        }

        match assistant.ask(&mut sessions, SESSION, question).await {
            Ok(answer) => {
                println!("\n{}\n", answer.text);
                if !answer.context_rules.is_empty() {
                    println!("  (context: {})\n", answer.context_rules.join(", "));
                }
            }
            Err(e) => eprintln!("  error: {e}"),
        }
    }
    Ok(())
}
