//! Command-line interface for groundcheck.

use anyhow::Context;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::{self, collect_files, AnalysisContext};
use crate::config::{self, Config, SchemaConfig};
use crate::graph::{GraphBuilder, GraphStore, IngestStats, MemoryStore, Neo4jStore};
use crate::report::{self, RunSummary};
use crate::schema::{Introspector, RestBackend, SchemaCatalog};
use crate::validate::Validator;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Catalog file name inside the per-user cache directory.
const CACHED_CATALOG: &str = "catalog.json";

/// Ground AI-generated code in what actually exists.
///
/// Groundcheck ingests a repository's structure into a knowledge graph and
/// validates source files against that structure and the live database
/// schema, flagging references to components, hooks, tables and functions
/// that do not exist or are called with the wrong parameters.
#[derive(Parser)]
#[command(name = "groundcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a repository and merge its structure into the graph
    Ingest(IngestArgs),
    /// Remove everything stored for a repository
    Clear(ClearArgs),
    /// Validate source files against the repository and schema
    #[command(visible_alias = "check")]
    Validate(ValidateArgs),
    /// Introspect the schema backend and export the catalog
    Catalog(CatalogArgs),
    /// Create a groundcheck config file from the template
    Init(InitArgs),
}

#[derive(Parser)]
pub struct IngestArgs {
    /// Repository root
    pub path: PathBuf,

    /// Repository name in the graph (default: directory name)
    #[arg(short, long)]
    pub repo_name: Option<String>,

    /// Merge into the existing graph instead of clearing it first
    #[arg(long)]
    pub no_clear: bool,

    /// Ingest into an in-memory graph and only report counts
    #[arg(long)]
    pub dry_run: bool,

    /// Also upsert schema nodes from an exported catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ClearArgs {
    /// Repository name in the graph
    pub repo_name: String,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to validate (file or directory)
    pub path: PathBuf,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Load the schema catalog from this file instead of introspecting
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Never contact the schema backend
    #[arg(long)]
    pub offline: bool,

    /// Minimum acceptable confidence per file (exit non-zero if below)
    #[arg(short, long)]
    pub min_confidence: Option<f64>,
}

#[derive(Parser)]
pub struct CatalogArgs {
    /// Write the catalog to this file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the catalog to the per-user cache directory
    #[arg(long, conflicts_with = "output")]
    pub cache: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "groundcheck.yaml")]
    pub output: PathBuf,
}

/// Load and validate the config, printing the problem on failure.
fn load_config(explicit: Option<&Path>) -> Option<Config> {
    let config = match Config::load(explicit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return None;
        }
    };
    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return None;
    }
    Some(config)
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn progress_bar(len: usize, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(message.to_string());
    bar
}

/// Directory name of `root`, used when no repository name is given.
fn default_repo_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "repository".to_string())
}

/// Per-user cache location for an exported catalog.
pub fn cached_catalog_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "groundcheck").map(|dirs| dirs.cache_dir().join(CACHED_CATALOG))
}

fn resolve_root(path: &Path) -> Option<PathBuf> {
    match path.canonicalize() {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", path, e);
            None
        }
    }
}

/// Run the ingest command.
pub fn run_ingest(args: &IngestArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };
    let Some(root) = resolve_root(&args.path) else {
        return Ok(EXIT_ERROR);
    };
    let repo_name = args.repo_name.clone().unwrap_or_else(|| default_repo_name(&root));

    let files = collect_files(&root, &config.analysis)?;
    if files.is_empty() {
        eprintln!("Warning: no files to ingest");
        return Ok(EXIT_SUCCESS);
    }
    info!(repository = %repo_name, files = files.len(), "analyzing repository");

    let batch = {
        let analyzers = analysis::analyzers_for(&config.analysis, &root);
        let ctx = AnalysisContext::for_files(&root, &files);
        let bar = progress_bar(files.len(), "analyzing");
        let batch = analysis::analyze_files(
            &analyzers,
            &ctx,
            &files,
            config.analysis.worker_count(),
            Some(&bar),
        )?;
        bar.finish_and_clear();
        batch
    };
    if !batch.failures.is_empty() {
        warn!(failed = batch.failures.len(), "some files could not be analyzed");
    }
    let catalog = match &args.catalog {
        Some(path) => Some(SchemaCatalog::load(path)?),
        None => None,
    };

    let rt = runtime()?;
    let result = rt.block_on(async {
        let store: Arc<dyn GraphStore> = if args.dry_run {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(Neo4jStore::connect(&config.graph).await?)
        };
        let builder = GraphBuilder::new(store.clone())
            .with_write_concurrency(config.graph.write_concurrency);

        builder.initialize().await?;
        if !args.no_clear {
            builder.clear_repository(&repo_name).await?;
        }
        let mut stats = builder.ingest(&repo_name, &batch.analyses).await?;
        if let Some(catalog) = &catalog {
            let schema_stats = builder.ingest_catalog(catalog).await?;
            stats.nodes_merged += schema_stats.nodes_merged;
            stats.edges_merged += schema_stats.edges_merged;
            stats.nodes_created += schema_stats.nodes_created;
            stats.edges_created += schema_stats.edges_created;
        }
        let counts = store.counts().await?;
        anyhow::Ok((stats, counts))
    });

    let (stats, counts) = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "ingestion aborted");
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    print_ingest_summary(&repo_name, &stats, batch.failures.len(), batch.fallback_count(), args.dry_run);
    println!("  Graph now holds {} nodes and {} edges", counts.nodes, counts.edges);
    Ok(EXIT_SUCCESS)
}

fn print_ingest_summary(repo: &str, stats: &IngestStats, analysis_failures: usize, fallbacks: usize, dry_run: bool) {
    println!();
    if dry_run {
        println!("  Dry run for {} (nothing written)", repo);
    } else {
        println!("  Ingested {}", repo);
    }
    println!(
        "  Files: {} processed, {} failed to write, {} failed to analyze, {} via fallback parser",
        stats.files_processed, stats.files_failed, analysis_failures, fallbacks
    );
    println!(
        "  Merged {} nodes ({} new) and {} edges ({} new)",
        stats.nodes_merged, stats.nodes_created, stats.edges_merged, stats.edges_created
    );
}

/// Run the clear command.
pub fn run_clear(args: &ClearArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };

    let rt = runtime()?;
    let deleted = rt.block_on(async {
        let store = Arc::new(Neo4jStore::connect(&config.graph).await?);
        let builder = GraphBuilder::new(store);
        anyhow::Ok(builder.clear_repository(&args.repo_name).await?)
    });

    match deleted {
        Ok(n) => {
            println!("Removed {} nodes for {}", n, args.repo_name);
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Ok(EXIT_ERROR)
        }
    }
}

/// Introspect the configured backend.
fn introspect(schema: &SchemaConfig) -> anyhow::Result<SchemaCatalog> {
    let (Some(url), Some(key)) = (schema.url.as_deref(), schema.api_key.as_deref()) else {
        anyhow::bail!("schema backend not configured (set schema.url and schema.api_key)");
    };
    let backend = RestBackend::new(url, key, Duration::from_millis(schema.timeout_ms))?;
    let introspector = Introspector::new(Arc::new(backend))
        .with_probe_tables(schema.probe_tables.clone())
        .with_max_concurrency(schema.max_concurrency);
    runtime()?.block_on(introspector.build_catalog())
}

/// Pick the catalog for a validation run: explicit file, configured file,
/// then live introspection unless offline.
fn catalog_for(args: &ValidateArgs, config: &Config) -> anyhow::Result<Option<SchemaCatalog>> {
    if let Some(path) = args.catalog.as_ref().or(config.validation.catalog_file.as_ref()) {
        let catalog = SchemaCatalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
        return Ok(Some(catalog));
    }
    if args.offline {
        return Ok(None);
    }
    if !config.schema.is_configured() {
        info!("no schema backend configured, table and RPC checks are skipped");
        return Ok(None);
    }
    introspect(&config.schema).map(Some)
}

/// Run the validate command.
pub fn run_validate(args: &ValidateArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "sarif" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };
    let min_confidence = args.min_confidence.unwrap_or(config.validation.min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        eprintln!("Error: min-confidence must be between 0 and 1, got {}", min_confidence);
        return Ok(EXIT_ERROR);
    }
    let Some(abs_path) = resolve_root(&args.path) else {
        return Ok(EXIT_ERROR);
    };

    let catalog = match catalog_for(args, &config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "schema catalog unavailable");
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = collect_files(&abs_path, &config.analysis)?;
    if files.is_empty() {
        eprintln!("Warning: no files to validate");
        return Ok(EXIT_SUCCESS);
    }

    let root = if abs_path.is_file() {
        abs_path.parent().map(Path::to_path_buf).unwrap_or_else(|| abs_path.clone())
    } else {
        abs_path.clone()
    };
    let ctx = AnalysisContext::for_files(&root, &files);
    let mut validator = Validator::new(analysis::analyzers_for(&config.analysis, &root), ctx);
    if let Some(catalog) = catalog {
        validator = validator.with_catalog(Arc::new(catalog));
    }
    let validator = validator.with_config(&config.validation);

    let show_progress = args.format == "pretty";
    let bar = show_progress.then(|| progress_bar(files.len(), "validating"));
    let reports = validator.validate_files(&files, config.analysis.worker_count(), bar.as_ref())?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let summary = RunSummary::new(&reports, min_confidence);
    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => println!("{}", report::to_json(&path_str, &reports, &summary)?),
        "sarif" => println!("{}", report::to_sarif(&reports)?),
        _ => report::write_pretty(&path_str, &reports, &summary),
    }

    if summary.passed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the catalog command.
pub fn run_catalog(args: &CatalogArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };

    let catalog = match introspect(&config.schema) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if !catalog.failed_facets.is_empty() {
        warn!(facets = ?catalog.failed_facets, "catalog is incomplete");
    }

    let output = if args.cache {
        match cached_catalog_path() {
            Some(p) => Some(p),
            None => {
                eprintln!("Error: no cache directory available for this user");
                return Ok(EXIT_ERROR);
            }
        }
    } else {
        args.output.clone()
    };

    match output {
        Some(path) => {
            catalog.save(&path)?;
            eprintln!(
                "Wrote catalog with {} tables, {} functions, {} enums to {}",
                catalog.tables.len(),
                catalog.functions.len(),
                catalog.enums.len(),
                path.display()
            );
        }
        None => println!("{}", catalog.to_json()?),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, config::TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set graph and schema credentials in {} or the environment", args.output.display());
    println!("  2. Run: groundcheck ingest .");
    println!("  3. Run: groundcheck validate . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["groundcheck", "ingest", "./repo", "--repo-name", "shop", "--dry-run"]);
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.repo_name.as_deref(), Some("shop"));
                assert!(args.dry_run);
                assert!(!args.no_clear);
            }
            _ => panic!("expected ingest"),
        }

        let cli = Cli::parse_from(["groundcheck", "-v", "check", ".", "--format", "json", "--offline"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.format, "json");
                assert!(args.offline);
                assert!(args.min_confidence.is_none());
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_default_repo_name() {
        assert_eq!(default_repo_name(Path::new("/home/dev/shop")), "shop");
        assert_eq!(default_repo_name(Path::new("/")), "repository");
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf/groundcheck.yaml");
        let args = InitArgs { output: output.clone() };

        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, config::TEMPLATE);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let args = ValidateArgs {
            path: PathBuf::from("."),
            format: "xml".to_string(),
            catalog: None,
            offline: true,
            min_confidence: None,
        };
        assert_eq!(run_validate(&args, None).unwrap(), EXIT_ERROR);
    }
}
