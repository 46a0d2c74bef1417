//! archivefs CLI - inspect the merged namespace of zip archives.
//!
//! Usage:
//!   archivefs -a a.zip -a b.zip ls [PATH]     # List a directory
//!   archivefs -a a.zip -a b.zip tree [PATH]   # Print the tree
//!   archivefs -a a.zip cat PATH               # Write a file to stdout
//!   archivefs -a a.zip stat PATH              # Show node details
//!
//! Archives are loaded in the order given; with the default settings the
//! first archive to provide a path keeps it.

mod commands;
mod error;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::common::{load_mapper, resolve_config, LayoutArg, MapperOverrides};
use commands::{inspect, InspectCommand};
use error::CliError;

/// Merge zip archives into one namespace and inspect it.
#[derive(Debug, Parser)]
#[command(name = "archivefs", version, about)]
struct Cli {
    /// Archive to load; repeat to merge several, earliest first
    #[arg(short = 'a', long = "archive", value_name = "ARCHIVE", required = true)]
    archives: Vec<String>,

    /// Later archives replace files already provided by earlier ones
    #[arg(long)]
    overwrite: bool,

    /// Place each archive's entries under a directory named after it
    #[arg(long)]
    include_arcname: bool,

    /// How entry names map to paths
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Configuration file (defaults to ~/.archivefs/config.ini when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: InspectCommand,
}

impl Cli {
    fn overrides(&self) -> MapperOverrides {
        MapperOverrides {
            overwrite: self.overwrite,
            include_arcname: self.include_arcname,
            layout: self.layout,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_config(cli.config.as_deref(), &cli.overrides())?;
    let mapper = load_mapper(config, &cli.archives)?;

    inspect::run(&cli.command, &mapper, out)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    match run(&cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
