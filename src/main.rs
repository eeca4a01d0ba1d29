use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testcompose::cli;

#[derive(Parser)]
#[command(name = "testcompose")]
#[command(about = "Scope-aware docker-compose environments for integration tests", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, start and wait for the environment, then print endpoints
    Up {
        /// Compose files (defaults to the configured ones)
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Skip the build step
        #[arg(long)]
        no_build: bool,
    },
    /// Stop and remove the environment
    Down {
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Also remove volumes
        #[arg(long)]
        volumes: bool,
    },
    /// Show container states for the project
    Status {
        #[arg(short, long)]
        file: Vec<PathBuf>,
    },
    /// Print host endpoints for exposed service ports
    Endpoints {
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Limit output to one service
        #[arg(short, long)]
        service: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Up { file, no_build } => {
            cli::up::run(file, no_build).context("starting environment")?
        }
        Commands::Down { file, volumes } => {
            cli::down::run(file, volumes).context("stopping environment")?
        }
        Commands::Status { file } => cli::status::run(file).context("querying status")?,
        Commands::Endpoints {
            file,
            service,
            json,
        } => cli::endpoints::run(file, service, json).context("extracting endpoints")?,
    }

    Ok(())
}
