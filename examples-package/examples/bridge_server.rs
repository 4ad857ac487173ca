//! PostgreSQL Wire Protocol Server Example
//!
//! Serves an in-memory DuckDB database filled with the sample `commits` and
//! `projects` tables.
//!
//! # Running the Example
//!
//! ```bash
//! cargo run --example bridge_server
//! ```
//!
//! Then connect with:
//! ```bash
//! psql -h 127.0.0.1 -p 5433 -U rill
//! ```

use anyhow::Result;
use bridge_executor::{seed_sample_database, DuckDbEngine, QueryBridge};
use bridge_pgwire::PgServer;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== DuckDB PostgreSQL Bridge Example ===\n");

    let engine = DuckDbEngine::open_in_memory()?;
    seed_sample_database(&engine)?;

    let bridge = Arc::new(QueryBridge::new(Arc::new(engine)));
    let server = PgServer::new("127.0.0.1:5433", bridge);

    println!("Server starting on 127.0.0.1:5433");
    println!("Tables 'commits' (10 rows) and 'projects' (3 rows) are loaded");
    println!("\nConnect with:");
    println!("  psql -h 127.0.0.1 -p 5433 -U rill");
    println!("\nExample queries:");
    println!("  \\dt");
    println!("  DESC commits;");
    println!("  SELECT author_name, SUM(additions) FROM commits GROUP BY author_name;");
    println!("\nPress Ctrl+C to stop the server.\n");

    server.start().await?;

    Ok(())
}
