// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Taxis: AI Image Sorter
//!
//! Classifies the images in a folder with a multimodal model and copies each
//! one into a folder per returned category.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use taxis::catalog::Catalog;
use taxis::classifier::Classifier;
use taxis::config::AppConfig;
use taxis::history::{History, UndoOutcome};
use taxis::{model, Result, TaxisError};

/// Taxis CLI - AI Image Sorter
#[derive(Parser, Debug)]
#[command(name = "taxis")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Sort images into category folders with a multimodal model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every image in the source folder
    Run {
        /// Image folder (overrides image_folder)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output root (overrides dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds to wait after each model call (overrides interval_seconds)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Classify but do not copy anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the path of an image by category and 1-based ID
    Lookup {
        category: String,

        id: i64,

        /// Output root to search (overrides dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// List categories in the output root
    Catalog {
        /// Output root to scan (overrides dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Copy history and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent copies
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Remove recent copies from the output folders
    Undo {
        /// Number of copies to undo
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be removed)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "conf.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Run { source, output, interval, dry_run }) => {
            run_classify(config, source, output, interval, dry_run, &cli.format).await
        }
        Some(Commands::Lookup { category, id, dir }) => {
            let root = dir.unwrap_or_else(|| config.output_root());
            let catalog = Catalog::scan(&root)?;
            println!("{}", catalog.lookup(&category, id)?.display());
            Ok(())
        }
        Some(Commands::Catalog { dir }) => {
            let root = dir.unwrap_or_else(|| config.output_root());
            run_catalog(&root, &cli.format)
        }
        Some(Commands::History { action }) => run_history_command(&config, action),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_classify(config, None, None, None, false, &cli.format).await,
    }
}

/// Run one classification pass
async fn run_classify(
    mut config: AppConfig,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    interval: Option<u64>,
    dry_run: bool,
    format: &str,
) -> Result<()> {
    if let Some(source) = source {
        config.image_folder = source.to_string_lossy().to_string();
    }
    if let Some(output) = output {
        config.dir = output.to_string_lossy().to_string();
    }
    if let Some(interval) = interval {
        config.interval_seconds = interval;
    }

    let model = model::from_config(&config)?;
    let kind = config.validate()?;
    info!(
        "Using {} model '{}' with categories {:?}",
        model.name(),
        config.model_name_for(kind),
        config.allowed_categories()
    );

    if dry_run {
        warn!("DRY RUN MODE - files will not be copied");
    }

    let mut classifier = Classifier::from_config(&config, model, dry_run);
    let summary = classifier.run(Path::new(&config.image_folder)).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

fn run_catalog(root: &Path, format: &str) -> Result<()> {
    let catalog = Catalog::scan(root)?;
    let categories = catalog.categories();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    println!("Categories in {}:", root.display());
    for cat in categories {
        println!("  {} ({} images)", cat.name, cat.count);
    }
    Ok(())
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::new(config.history_path());

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!("  {} [{}] {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.category,
                    entry.source_path.display(),
                    entry.dest_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let outcomes = history.undo(count, dry_run)?;
            if outcomes.is_empty() {
                println!("No copies to undo");
                return Ok(());
            }

            for outcome in outcomes {
                match outcome {
                    UndoOutcome::Removed(p) => println!("Removed: {}", p.display()),
                    UndoOutcome::WouldRemove(p) => println!("Would remove: {}", p.display()),
                    UndoOutcome::Missing(p) => println!("Skipped (missing): {}", p.display()),
                    UndoOutcome::Modified(p) => println!("Skipped (modified): {}", p.display()),
                    UndoOutcome::Failed(p, e) => println!("Failed: {} ({})", p.display(), e),
                }
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config.redacted())?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            if output.exists() {
                return Err(TaxisError::Config(format!(
                    "{} already exists",
                    output.display()
                )));
            }
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            let kind = config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Provider: {:?}", kind);
            println!("  Model: {}", config.model_name_for(kind));
            println!("  Image folder: {}", config.image_folder);
            println!("  Output root: {}", config.output_root().display());
            println!("  Categories: {:?}", config.allowed_categories());
        }
    }

    Ok(())
}
