use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cache;
mod cli_output;
mod complexity;
mod config;
mod error;
mod extractor;
mod feedback;
mod github;
mod ingest;
mod language;
mod patterns;
mod report;
mod rules;
mod scoring;
mod server;

use cache::ResultCache;
use cli_output::{OutputMode, OutputWriter};
use config::{ConfigOverrides, ServiceConfig};
use ingest::Ingestor;
use rules::RuleStore;

#[derive(Parser)]
#[command(name = "skilllens")]
#[command(about = "Estimate developer skills from source code and suggest learning resources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/skilllens/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding skill_rules.json and resources.json
    #[arg(long, global = true, env = "SKILLLENS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Result cache directory
    #[arg(long, global = true, env = "SKILLLENS_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Result cache lifetime in seconds
    #[arg(long, global = true, env = "SKILLLENS_CACHE_TTL")]
    cache_ttl: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (e.g. 127.0.0.1:8000)
        #[arg(short, long, env = "SKILLLENS_BIND")]
        bind: Option<String>,

        /// URL that receives feedback notifications as JSON
        #[arg(long, env = "SKILLLENS_FEEDBACK_WEBHOOK")]
        feedback_webhook: Option<String>,
    },

    /// Analyze a source file, zip archive or directory
    Analyze {
        path: PathBuf,

        /// Output format (human, plain, json); detected from the terminal by default
        #[arg(short, long)]
        format: Option<String>,

        /// Also report per-skill confidence signals
        #[arg(long)]
        signals: bool,
    },

    /// Manage the skill rule files
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Inspect or clear the repository result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Write the default rule files and config file if they are missing
    Init,
    /// Print categories and their mappings
    Show,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count and size
    Stats,
    /// Delete every cached result
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut overrides = ConfigOverrides {
        data_dir: cli.data_dir,
        cache_dir: cli.cache_dir,
        cache_ttl_secs: cli.cache_ttl,
        ..Default::default()
    };
    if let Commands::Serve {
        bind,
        feedback_webhook,
    } = &cli.command
    {
        overrides.bind = bind.clone();
        overrides.feedback_webhook = feedback_webhook.clone();
    }
    let config_path = cli.config.clone().unwrap_or_else(ServiceConfig::config_file_path);
    let config = ServiceConfig::load(cli.config.as_deref())?.with_overrides(overrides);

    match cli.command {
        Commands::Serve { .. } => {
            info!("Starting SkillLens API");
            let rules = RuleStore::load_or_bootstrap(&config.data_dir)?;
            let state = server::AppState::new(config, rules)?;
            server::serve(state).await
        }

        Commands::Analyze {
            path,
            format,
            signals,
        } => {
            let mode = match format.as_deref() {
                Some(name) => OutputMode::from_name(name)
                    .with_context(|| format!("Unknown format '{}'. Use human, plain or json", name))?,
                None => OutputMode::auto(),
            };
            analyze_path(&path, &config, OutputWriter::new(mode), signals)
        }

        Commands::Rules { action } => {
            let writer = OutputWriter::new(OutputMode::auto());
            match action {
                RulesAction::Init => {
                    let created = rules::init_rule_files(&config.data_dir)?;
                    if created.is_empty() {
                        writer.info(&format!(
                            "Rule files already present in {}",
                            config.data_dir.display()
                        ));
                    }
                    for path in created {
                        writer.success(&format!("Created {}", path.display()));
                    }
                    if !config_path.exists() {
                        config.save(&config_path)?;
                        writer.success(&format!("Created {}", config_path.display()));
                    }
                }
                RulesAction::Show => {
                    let store = RuleStore::load_or_bootstrap(&config.data_dir)?;
                    show_rules(&store, &writer);
                }
            }
            Ok(())
        }

        Commands::Cache { action } => {
            let writer = OutputWriter::new(OutputMode::auto());
            let cache = ResultCache::new(config.cache_dir.clone(), config.cache_ttl());
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats()?;
                    writer.section("Result cache");
                    writer.table(&[
                        ("Directory", stats.cache_dir.display().to_string()),
                        ("Entries", stats.file_count.to_string()),
                        ("Size", stats.format_size()),
                        ("TTL", format!("{}s", config.cache_ttl_secs)),
                    ]);
                }
                CacheAction::Clear => {
                    cache.clear()?;
                    writer.success(&format!("Cleared {}", cache.dir().display()));
                }
            }
            Ok(())
        }
    }
}

fn analyze_path(path: &Path, config: &ServiceConfig, writer: OutputWriter, with_signals: bool) -> Result<()> {
    let store = RuleStore::load_or_bootstrap(&config.data_dir)?;
    let ingestor = Ingestor::all_known(config.max_archive_file_bytes);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let sources = if path.is_dir() {
        ingestor.ingest_dir(path)?
    } else {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        ingestor.ingest_upload(&name, &bytes)?
    };
    info!("Analyzing {} source files from {}", sources.len(), path.display());

    let result = report::analyze_sources(&name, &sources, &store);
    let libraries = sources.libraries().all_libraries();
    let rank = complexity::rank_profile(sources.contents(), &libraries, sources.languages());
    let signals = with_signals.then(|| sources.signals().1);

    if writer.mode() == OutputMode::Json {
        writer.json(&json!({
            "analysis": result,
            "rank": rank,
            "signals": signals,
        }));
        return Ok(());
    }

    writer.analysis(&result);
    if !result.is_error() {
        writer.rank(&rank);
    }
    if let Some(signals) = &signals {
        writer.signals(signals);
    }
    Ok(())
}

fn show_rules(store: &RuleStore, writer: &OutputWriter) {
    let table = store.rules();
    if writer.mode() == OutputMode::Json {
        writer.json(table);
        return;
    }

    writer.section("Categories");
    let rows: Vec<(&str, String)> = table
        .categories
        .iter()
        .map(|(name, rule)| (name.as_str(), rule.description.clone()))
        .collect();
    writer.table(&rows);

    writer.section("Languages");
    let mut languages: Vec<(&str, String)> = table
        .languages
        .iter()
        .map(|(label, category)| (label.as_str(), category.clone()))
        .collect();
    languages.sort();
    writer.table(&languages);

    writer.section("Libraries");
    let mut libraries: Vec<(&str, String)> = table
        .libraries
        .iter()
        .map(|(library, category)| (library.as_str(), category.clone()))
        .collect();
    libraries.sort();
    writer.table(&libraries);
}
