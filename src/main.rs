use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dupefinder::config::{DuplicateConfig, Sensitivity};
use dupefinder::core::candidate::build_candidates;
use dupefinder::core::exact::{find_duplicate_by_page_count_and_size, find_duplicate_by_url};
use dupefinder::core::image::ImageCrateDecoder;
use dupefinder::core::indexer::{CoverIndexer, IndexError, IndexObserver};
use dupefinder::core::language::BuiltinLanguages;
use dupefinder::core::scanner::DuplicateScanner;
use dupefinder::database::connection::default_database_path;
use dupefinder::database::models::{CatalogEntry, NewEntry};
use dupefinder::database::SqliteCatalog;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "dupefinder", version, about = "Find duplicate entries in a media library")]
struct Cli {
    /// Catalog database (default: `<data dir>/dupefinder/catalog.db`)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add entries from a JSON manifest to the catalog
    Import {
        /// JSON array of entries
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },

    /// Hash the covers of every entry that has no fingerprint yet
    Index {
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Compare every pair of entries and list likely duplicates
    Scan {
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// 0 (lenient) to 2 (strict)
        #[arg(long, value_name = "LEVEL")]
        sensitivity: Option<u8>,
        /// Print one JSON object per duplicate pair
        #[arg(long)]
        json: bool,
    },

    /// Look for an exact copy of an entry, by URL then by page layout
    FindUrl {
        #[arg(value_name = "ENTRY_ID")]
        entry_id: i64,
    },

    /// Write the default configuration to a file
    InitConfig {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Import { manifest } => {
            let catalog = open_catalog(cli.db)?;
            let content = fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read manifest {:?}", manifest))?;
            let entries: Vec<NewEntry> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid manifest {:?}", manifest))?;

            println!("▶ Importing {} entries…", entries.len());
            let bar = progress_bar(entries.len() as u64)?;
            for entry in &entries {
                catalog
                    .insert_entry(entry)
                    .with_context(|| format!("Failed to import {:?}", entry.title))?;
                bar.inc(1);
            }
            bar.finish_and_clear();
            println!("✅ Catalog now holds {} entries", catalog.count()?);
        }

        Commands::Index { config } => {
            let config = load_config(config)?;
            let catalog = open_catalog(cli.db)?;
            let indexer = CoverIndexer::from_config(&config).context("Invalid hash settings")?;

            let bar = progress_bar(0)?;
            let info_bar = bar.clone();
            let position_bar = bar.clone();
            let error_bar = bar.clone();
            let observer = IndexObserver::new()
                .on_info(Box::new(move |entry: &CatalogEntry| {
                    info_bar.set_message(entry.title.clone())
                }))
                .on_progress(Box::new(move |done: usize, total: usize| {
                    position_bar.set_length(total as u64);
                    position_bar.set_position(done as u64);
                }))
                .on_error(Box::new(move |e: IndexError| {
                    error_bar.println(format!("⚠️  {}", e))
                }));

            let decoder = ImageCrateDecoder::new();
            let report = benchmark(
                "indexing covers",
                indexer.index_covers(&catalog, &decoder, &observer),
            )
            .await
            .context("Indexing failed")?;
            bar.finish_and_clear();

            println!(
                "✅ {} processed: {} hashed, {} undecodable, {} failed",
                report.processed, report.hashed, report.undecodable, report.failed
            );
        }

        Commands::Scan {
            config,
            sensitivity,
            json,
        } => {
            let mut config = load_config(config)?;
            if let Some(level) = sensitivity {
                config.sensitivity = Sensitivity::try_from(level)?;
            }
            let catalog = open_catalog(cli.db)?;

            let entries = catalog.all_entries().context("Failed to load catalog")?;
            let candidates = build_candidates(
                &entries,
                &config.signals,
                &BuiltinLanguages::new(),
                &config.chapters,
            );

            let bar = progress_bar(candidates.len() as u64)?;
            let row_bar = bar.clone();
            let scanner = DuplicateScanner::from_config(&config).with_progress_callback(Box::new(
                move |done: usize, _total: usize| row_bar.set_position(done as u64),
            ));
            let report = scanner.scan(&candidates);
            bar.finish_and_clear();

            if json {
                for duplicate in &report.duplicates {
                    println!("{}", serde_json::to_string(duplicate)?);
                }
                return Ok(());
            }

            let titles: HashMap<i64, &str> =
                entries.iter().map(|e| (e.id, e.title.as_str())).collect();
            if report.duplicates.is_empty() {
                println!("No duplicates found.");
            } else {
                println!("Found {} duplicate pair(s):", report.duplicates.len());
                for (i, pair) in report.duplicates.iter().enumerate() {
                    println!(
                        " {}. [{:.2}] #{} {} ⇄ #{} {}",
                        i + 1,
                        pair.total_score,
                        pair.reference_id,
                        titles.get(&pair.reference_id).unwrap_or(&"?"),
                        pair.candidate_id,
                        titles.get(&pair.candidate_id).unwrap_or(&"?"),
                    );
                }
            }
            if report.deferred_pairs > 0 {
                println!(
                    "⚠️  {} pair(s) skipped until their covers are indexed",
                    report.deferred_pairs
                );
            }
        }

        Commands::FindUrl { entry_id } => {
            let catalog = open_catalog(cli.db)?;
            let entry = catalog
                .get_entry(entry_id)
                .with_context(|| format!("Unknown entry {}", entry_id))?;

            let found = match find_duplicate_by_url(&entry, &catalog)? {
                Some(found) => Some(("URL", found)),
                None => find_duplicate_by_page_count_and_size(&entry, &catalog)?
                    .map(|found| ("page count and size", found)),
            };

            match found {
                Some((how, duplicate)) => println!(
                    "▶ #{} {} is a copy of #{} {} (same {})",
                    entry.id, entry.title, duplicate.id, duplicate.title, how
                ),
                None => println!("No exact duplicate of #{} {}", entry.id, entry.title),
            }
        }

        Commands::InitConfig { path } => {
            let path = match path {
                Some(path) => path,
                None => default_config_path().context("No config directory available")?,
            };
            DuplicateConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("✅ Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

fn open_catalog(db: Option<PathBuf>) -> Result<SqliteCatalog> {
    let path = match db {
        Some(path) => path,
        None => default_database_path()?,
    };
    SqliteCatalog::open(&path).with_context(|| format!("Failed to open catalog {:?}", path))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dupefinder").join("config.json"))
}

/// An explicit path must exist; the default location falls back to defaults.
fn load_config(path: Option<PathBuf>) -> Result<DuplicateConfig> {
    match path {
        Some(path) => DuplicateConfig::load(&path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => match default_config_path() {
            Some(path) => load_default_location(&path),
            None => Ok(DuplicateConfig::default()),
        },
    }
}

fn load_default_location(path: &Path) -> Result<DuplicateConfig> {
    DuplicateConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config {:?}", path))
}

fn progress_bar(length: u64) -> Result<ProgressBar> {
    let bar = ProgressBar::new(length);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Await `task`, print how long it took (with `label`), and return its result.
async fn benchmark<T>(label: &str, task: impl Future<Output = T>) -> T {
    let start = Instant::now();
    let result = task.await;
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
