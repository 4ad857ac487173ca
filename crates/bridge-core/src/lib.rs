pub mod batch;
pub mod error;
pub mod interceptor;
pub mod schema;
pub mod types;

pub use batch::{CompletionTag, DataWriter, PreparedResponse, ResultBatch};
pub use error::{BridgeError, Result};
pub use interceptor::{Interception, Interceptor, RewriteRule};
pub use schema::{BackendColumn, ColumnDescriptor, DEFAULT_DISPLAY_WIDTH, PgType, duckdb_type_to_pg};
pub use types::*;
