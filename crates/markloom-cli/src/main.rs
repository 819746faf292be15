// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markloom CLI
//!
//! - `render`: markdown to HTML with highlighted code and optional SVG diagrams
//! - `normalize`: parse and serialize back to markdown
//! - `tree`: the parsed document tree as JSON
//! - `languages`: canonical highlight languages and their aliases

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use commands::{NormalizeArgs, RenderArgs, TreeArgs};

#[derive(Parser)]
#[command(name = "markloom", version, about)]
struct Cli {
    /// Path to a markloom.toml configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render markdown to HTML.
    Render(RenderArgs),
    /// Parse and re-serialize markdown.
    Normalize(NormalizeArgs),
    /// Print the document tree as JSON.
    Tree(TreeArgs),
    /// List supported highlight languages.
    Languages,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = commands::load_settings(cli.config.as_deref())?;
    match cli.command {
        Commands::Render(args) => {
            let html = commands::render(&args, &settings).await?;
            commands::write_output(args.output.as_deref(), &html).await
        }
        Commands::Normalize(args) => {
            let markdown = commands::normalize(&args, &settings).await?;
            commands::write_output(args.output.as_deref(), &markdown).await
        }
        Commands::Tree(args) => {
            let json = commands::tree(&args, &settings).await?;
            commands::write_output(None, &json).await
        }
        Commands::Languages => commands::write_output(None, &commands::languages()).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -v forces debug, otherwise RUST_LOG or warnings only
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
