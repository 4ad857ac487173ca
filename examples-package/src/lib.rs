//! Runnable demos for the DuckDB PostgreSQL bridge
//!
//! - `bridge_server`: serve a seeded in-memory database on 127.0.0.1:5433
//! - `bridge_queries`: run statements through the bridge and print the results
