//! parcel CLI - describe, check, and package modules that bundle native binaries

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use parcel_pkg::Platform;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod describe;
mod init;
mod package;

#[derive(Parser)]
#[command(name = "parcel")]
#[command(version)]
#[command(about = "Build distributions of modules that bundle precompiled binaries", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved package manifest
    Describe {
        /// Descriptor file, or a directory to search upward from
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Require a valid public version identifier
        #[arg(long)]
        strict: bool,
    },

    /// Verify the descriptor and every declared file without writing anything
    Check {
        /// Descriptor file, or a directory to search upward from
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only check artifact groups built for this platform
        #[arg(long)]
        platform: Option<Platform>,

        /// Require a valid public version identifier
        #[arg(long)]
        strict: bool,
    },

    /// Build a source archive
    Package {
        /// Descriptor file, or a directory to search upward from
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output directory, relative to the package root
        #[arg(short, long, default_value = parcel_pkg::DIST_DIR)]
        out_dir: PathBuf,

        /// Only ship artifact groups built for this platform
        #[arg(long)]
        platform: Option<Platform>,

        /// Require a valid public version identifier
        #[arg(long)]
        strict: bool,
    },

    /// Create a parcel.toml in the current directory
    Init {
        /// Set the package name (defaults to directory name)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Output formats for `parcel describe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Pretty-printed JSON
    Json,
    /// Core metadata, as written to PKG-INFO
    PkgInfo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Describe {
            path,
            format,
            strict,
        } => {
            let options = describe::DescribeCmdOptions {
                path,
                format,
                strict,
            };
            describe::describe_package(&options)?;
        }

        Commands::Check {
            path,
            platform,
            strict,
        } => {
            let options = package::PackageCmdOptions {
                path,
                out_dir: PathBuf::from(parcel_pkg::DIST_DIR),
                platform,
                strict,
                dry_run: true,
            };
            package::package(&options)?;
        }

        Commands::Package {
            path,
            out_dir,
            platform,
            strict,
        } => {
            let options = package::PackageCmdOptions {
                path,
                out_dir,
                platform,
                strict,
                dry_run: false,
            };
            package::package(&options)?;
        }

        Commands::Init { name } => {
            init::init_project(init::InitOptions { name })?;
        }
    }

    Ok(())
}

/// Set up logging to stderr. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
