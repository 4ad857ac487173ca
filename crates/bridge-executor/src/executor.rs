//! Statement execution

use crate::engine::{ExecutionContext, QueryEngine, RowCursor};
use crate::materializer::materialize;
use bridge_core::{BridgeError, Result, ResultBatch};
use std::sync::Arc;
use tracing::{debug, error};

/// Runs one backend statement and materializes its result
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Execute `sql` and return the full result batch.
    ///
    /// The cursor is drained inside the engine's scope, so it is released
    /// before this returns on every path.
    pub fn execute(&self, sql: &str, ctx: &ExecutionContext) -> Result<ResultBatch> {
        debug!("Executing query: {}", sql);

        let mut batch = None;
        self.engine
            .run_query(sql, ctx, &mut |cursor: &mut dyn RowCursor| {
                batch = Some(materialize(cursor, ctx)?);
                Ok(())
            })
            .inspect_err(|e| error!("Query error: {}", e))?;

        let batch = batch.ok_or_else(|| {
            BridgeError::Internal("engine finished without producing a cursor".to_string())
        })?;
        debug!("Query returned {} rows", batch.num_rows());
        Ok(batch)
    }
}
