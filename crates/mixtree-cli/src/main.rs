//! mixtree CLI - render WAV files through a configured mixing tree.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mixtree")]
#[command(
    author,
    version,
    about = "Mixing tree and post-processing pipeline CLI",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix WAV inputs through a config and write the result
    Render(commands::render::RenderArgs),

    /// Parse a config and print the tree it builds
    Check(commands::check::CheckArgs),

    /// List the registered processing stages
    Stages(commands::stages::StagesArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Stages(args) => commands::stages::run(args),
    }
}
