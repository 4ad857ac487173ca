use crate::config::Config;
use anyhow::{Context, Result};
use bridge_executor::{seed_sample_database, DuckDbEngine, QueryBridge};
use bridge_pgwire::PgServer;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub fn print_usage() {
    println!(
        "{} pg-bridge --db /path/to/database.db",
        "Usage:".bright_yellow().bold()
    );
    println!();
    println!("Example with a Rill project database:");
    println!("  {}", "pg-bridge --db ./rill-github-analytics/stage.db".bright_cyan());
    println!();
    println!("Then connect with:");
    println!("  {}", "psql -h localhost -p 5432 -U rill".bright_cyan());
}

pub async fn serve(config: &Config, db_path: &Path) -> Result<()> {
    let engine = DuckDbEngine::open(db_path)
        .with_context(|| format!("Failed to open DuckDB database {}", db_path.display()))?;
    engine
        .ping()
        .with_context(|| format!("Failed to ping DuckDB database {}", db_path.display()))?;
    info!("Connected to DuckDB database: {}", db_path.display());

    info!("Example queries:");
    info!("  SHOW TABLES;");
    info!("  SELECT * FROM <table_name> LIMIT 10;");

    let bridge = Arc::new(QueryBridge::new(Arc::new(engine)));
    PgServer::new(config.listen_addr.clone(), bridge).start().await
}

pub fn seed(db_path: &Path) -> Result<()> {
    let engine = DuckDbEngine::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    seed_sample_database(&engine)
        .with_context(|| format!("Failed to seed {}", db_path.display()))?;

    println!(
        "{} Sample database created at {}",
        "✓".bright_green(),
        db_path.display()
    );
    println!(
        "  Serve it with: {}",
        format!("pg-bridge --db {}", db_path.display()).bright_cyan()
    );
    Ok(())
}
