//! PostgreSQL wire protocol front end for the DuckDB bridge
//!
//! Lets standard PostgreSQL clients (psql, DBeaver, BI tools) query a DuckDB
//! database. Every statement goes through [`bridge_executor::QueryBridge`];
//! this crate only adapts its results to pgwire responses.
//!
//! - **Simple Query Protocol**: the whole query string is one statement
//! - **Extended Query Protocol**: statements run at describe time and the
//!   result is replayed on execute; bind parameters are rejected
//!
//! Every connection is accepted without authentication or TLS.
//!
//! # Example
//!
//! ```no_run
//! use bridge_executor::{DuckDbEngine, QueryBridge};
//! use bridge_pgwire::PgServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(DuckDbEngine::open_in_memory()?);
//!     let server = PgServer::new("127.0.0.1:5432", Arc::new(QueryBridge::new(engine)));
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod extended;
pub mod result;
pub mod server;

pub use backend::{BridgeBackend, BridgeServerHandlers, SimpleStartupHandler};
pub use extended::{BridgeExtendedHandler, PreparedCache, DEFAULT_PREPARED_CACHE_CAPACITY};
pub use result::{
    bridge_error, descriptors_to_field_info, into_pg_response, pg_type, PgRowWriter,
};
pub use server::PgServer;
