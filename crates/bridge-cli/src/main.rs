use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{print_usage, seed, serve};
use config::Config;

#[derive(Parser)]
#[command(name = "pg-bridge")]
#[command(author, version, about = "Serve a DuckDB database over the PostgreSQL wire protocol", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Address to listen on [default: 127.0.0.1:5432]
    #[arg(short, long, global = true)]
    listen: Option<String>,

    /// Path to the DuckDB database file
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the database to PostgreSQL clients (default)
    Serve,

    /// Create a sample database with `commits` and `projects` tables
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_overrides(cli.listen, cli.db, cli.verbose);

    init_logging(config.verbose)?;

    let Some(db_path) = config.db_path.clone() else {
        print_usage();
        std::process::exit(1);
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            print_banner();
            serve(&config, &db_path).await?;
        }
        Commands::Seed => seed(&db_path)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        "bridge_cli=debug,bridge_pgwire=debug,bridge_executor=debug,bridge_core=debug"
    } else {
        "bridge_cli=info,bridge_pgwire=info,bridge_executor=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
  _ __   __ _      | |__  _ __(_) __| | __ _  ___
 | '_ \ / _` |_____| '_ \| '__| |/ _` |/ _` |/ _ \
 | |_) | (_| |_____| |_) | |  | | (_| | (_| |  __/
 | .__/ \__, |     |_.__/|_|  |_|\__,_|\__, |\___|
 |_|    |___/                          |___/
    "#
        .bright_cyan()
    );
    println!(
        "{}",
        format!("PostgreSQL wire bridge for DuckDB v{}\n", env!("CARGO_PKG_VERSION")).bright_yellow()
    );
}
