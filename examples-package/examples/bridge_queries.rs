//! Query Bridge Example
//!
//! Runs a few statements straight through the [`QueryBridge`] without a
//! network listener and prints what a PostgreSQL client would receive.
//!
//! ```bash
//! cargo run --example bridge_queries
//! ```

use anyhow::Result;
use bridge_core::{PreparedResponse, WireValue};
use bridge_executor::{seed_sample_database, DuckDbEngine, QueryBridge};
use std::sync::Arc;

fn render(value: &WireValue) -> String {
    match value {
        WireValue::Null => "NULL".to_string(),
        WireValue::Bool(v) => v.to_string(),
        WireValue::Int2(v) => v.to_string(),
        WireValue::Int4(v) => v.to_string(),
        WireValue::Int8(v) => v.to_string(),
        WireValue::Float4(v) => v.to_string(),
        WireValue::Float8(v) => v.to_string(),
        WireValue::Text(v) => v.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let engine = DuckDbEngine::open_in_memory()?;
    seed_sample_database(&engine)?;
    let bridge = QueryBridge::new(Arc::new(engine));

    let queries = [
        "",
        "\\dt",
        "DESC projects;",
        "SELECT author_name, COUNT(*) AS commits FROM commits GROUP BY 1 ORDER BY 2 DESC",
        "SELECT * FROM missing_table",
    ];

    for query in queries {
        println!("> {:?}", query);
        match bridge.handle(query).await {
            Ok(PreparedResponse::Complete(tag)) => println!("{}\n", tag),
            Ok(PreparedResponse::Rows(batch)) => {
                let header: Vec<_> = batch
                    .columns()
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.oid()))
                    .collect();
                println!("{}", header.join(" | "));
                for row in batch.rows() {
                    let cells: Vec<_> = row.iter().map(render).collect();
                    println!("{}", cells.join(" | "));
                }
                println!("{}\n", batch.tag());
            }
            Err(e) => println!("ERROR {}: {}\n", e.sqlstate(), e),
        }
    }

    Ok(())
}
