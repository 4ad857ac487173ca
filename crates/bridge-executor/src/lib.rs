//! Query execution for the DuckDB PostgreSQL bridge
//!
//! - [`engine`]: the backend contract ([`QueryEngine`], [`RowCursor`]) and
//!   the cancellation-aware [`ExecutionContext`]
//! - [`duckdb_engine`]: [`DuckDbEngine`], the DuckDB implementation
//! - [`materializer`]: drains a cursor into a [`bridge_core::ResultBatch`]
//! - [`executor`]: runs one statement end to end
//! - [`bridge`]: [`QueryBridge`], interception plus execution per query
//! - [`seed`]: sample `commits` and `projects` tables

pub mod bridge;
pub mod duckdb_engine;
pub mod engine;
pub mod executor;
pub mod materializer;
pub mod seed;

pub use bridge::QueryBridge;
pub use duckdb_engine::DuckDbEngine;
pub use engine::{ExecutionContext, QueryEngine, RowCursor};
pub use executor::QueryExecutor;
pub use materializer::materialize;
pub use seed::seed_sample_database;
