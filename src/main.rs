//! Groundcheck CLI entry point.

use clap::Parser;
use groundcheck::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = std::env::var("GROUNDCHECK_LOG")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| {
            EnvFilter::new(if verbose { "groundcheck=debug" } else { "groundcheck=info" })
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    let result = match &cli.command {
        Commands::Ingest(args) => cli::run_ingest(args, config),
        Commands::Clear(args) => cli::run_clear(args, config),
        Commands::Validate(args) => cli::run_validate(args, config),
        Commands::Catalog(args) => cli::run_catalog(args, config),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
