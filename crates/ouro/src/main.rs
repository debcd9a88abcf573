use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use ouro::{config::Config, orchestrator::BundleOrchestrator};

#[derive(Parser)]
#[command(name = "ouro")]
#[command(version)]
#[command(about = "Inline a Python project's local imports into one file", long_about = None)]
struct Cli {
    /// Entry point Python file
    #[arg(short, long)]
    entry: PathBuf,

    /// Output file; the bundle goes to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Additional directories to search for local modules (repeatable)
    #[arg(long, value_name = "DIR")]
    src: Vec<PathBuf>,

    /// Path to a configuration file (defaults to ouro.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remove docstrings from the bundled output
    #[arg(long)]
    strip_docstrings: bool,

    /// Leave unresolved local-looking imports in place instead of failing
    #[arg(long)]
    allow_unresolved: bool,

    /// Suppress inline markers and consolidate imports into a header
    #[arg(long)]
    release: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    config.src.extend(cli.src.iter().cloned());
    if cli.strip_docstrings {
        config.strip_docstrings = true;
    }
    if cli.allow_unresolved {
        config.allow_unresolved = true;
    }
    if cli.release {
        config.release = true;
    }

    let orchestrator = BundleOrchestrator::new(config);
    match &cli.output {
        Some(output) => orchestrator.bundle_to_file(&cli.entry, output),
        None => {
            let bundled = orchestrator.bundle(&cli.entry)?;
            io::stdout().lock().write_all(bundled.as_bytes())?;
            Ok(())
        }
    }
}

/// Wire up env_logger: `RUST_LOG` drives filtering by default, `-v` flags
/// raise the level explicitly.
fn init_logging(verbosity: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbosity > 0 {
        builder.filter_level(if verbosity == 1 {
            LevelFilter::Debug
        } else {
            LevelFilter::Trace
        });
    }
    builder.init();
}
