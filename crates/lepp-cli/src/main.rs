//! lepp: Command-line interface for Lepp-Delaunay mesh refinement.
//!
//! Loads OFF triangulations, reports on their quality and refines them
//! until no triangle has an angle below the requested tolerance.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=lepp_refine=info` - Phase summaries
//! - `RUST_LOG=lepp_refine=debug` - Per-phase detail
//! - `RUST_LOG=lepp_refine::timing=debug` - Performance timing
//! - `RUST_LOG=lepp_gpu=debug` - GPU adapter and dispatch logging
//!
//! # Example
//!
//! ```bash
//! # Refine to a 30 degree minimum angle on the rayon engine
//! lepp refine input.off -o refined.off --angle 30 --engine parallel
//!
//! # Machine-readable quality report
//! lepp --format json detect input.off --angle 25
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{detect, info, refine, validate};

/// lepp - Lepp-Delaunay refinement of planar triangle meshes.
///
/// Improve the minimum angle of a triangulation by centroid insertion at
/// terminal edges.
#[derive(Parser)]
#[command(name = "lepp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Engine used for the detection phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Serial reference engine
    Sequential,
    /// Data-parallel engine on the rayon thread pool
    Parallel,
    /// Data-parallel engine on the GPU, falling back to rayon
    Gpu,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh statistics
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Check handles and cross references
    Validate {
        /// Input mesh file
        input: PathBuf,
    },

    /// Count bad triangles and terminal edges without modifying the mesh
    Detect {
        /// Input mesh file
        input: PathBuf,

        /// Minimum acceptable angle in degrees
        #[arg(long, short, default_value = "30")]
        angle: f64,

        /// Engine for the detection phases
        #[arg(long, default_value = "sequential")]
        engine: EngineKind,
    },

    /// Refine a mesh and write the result
    Refine {
        /// Input mesh file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum acceptable angle in degrees (overrides the config file)
        #[arg(long, short)]
        angle: Option<f64>,

        /// Cap on refinement iterations (overrides the config file)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Engine for the detection phases
        #[arg(long, default_value = "sequential")]
        engine: EngineKind,

        /// Worker threads for the parallel engine (default: all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// JSON file with refinement parameters
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "lepp_refine=info,lepp_gpu=info",
            2 => "lepp_refine=debug,lepp_gpu=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input } => info::run(input, &cli),
        Commands::Validate { input } => validate::run(input, &cli),
        Commands::Detect {
            input,
            angle,
            engine,
        } => detect::run(input, *angle, *engine, &cli),
        Commands::Refine {
            input,
            output,
            angle,
            max_iterations,
            engine,
            threads,
            config,
        } => refine::run(
            input,
            output,
            &refine::Options {
                angle: *angle,
                max_iterations: *max_iterations,
                engine: *engine,
                threads: *threads,
                config: config.as_deref(),
            },
            &cli,
        ),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(refine_err) = e.downcast_ref::<lepp_refine::RefineError>() {
                eprintln!("{}: {}", "Error".red().bold(), refine_err);
                eprintln!("  {}: {}", "Code".cyan(), refine_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    refine_err.recovery_suggestion()
                );
                if let Some(location) = refine_err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
