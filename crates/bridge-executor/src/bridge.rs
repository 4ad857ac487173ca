//! Query bridge facade: interception plus execution for one query

use crate::engine::{ExecutionContext, QueryEngine};
use crate::executor::QueryExecutor;
use bridge_core::{BridgeError, CompletionTag, Interception, Interceptor, PreparedResponse, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point used by the protocol handlers for every statement
#[derive(Clone)]
pub struct QueryBridge {
    executor: QueryExecutor,
    interceptor: Interceptor,
}

impl QueryBridge {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            executor: QueryExecutor::new(engine),
            interceptor: Interceptor::new(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Handle one query on tokio's blocking pool.
    ///
    /// If the returned future is dropped before the backend finishes, the
    /// execution context is cancelled and DuckDB is interrupted.
    pub async fn handle(&self, query: &str) -> Result<PreparedResponse> {
        info!("Query: {}", query);
        let Some(sql) = self.plan(query) else {
            return Ok(PreparedResponse::Complete(CompletionTag::ok()));
        };

        let ctx = ExecutionContext::new();
        let cancel_on_drop = ctx.token().clone().drop_guard();
        let executor = self.executor.clone();

        let result = tokio::task::spawn_blocking(move || executor.execute(&sql, &ctx))
            .await
            .map_err(|e| BridgeError::Internal(format!("query task failed: {}", e)))?;
        cancel_on_drop.disarm();

        result.map(PreparedResponse::Rows)
    }

    /// Handle one query on the calling thread
    pub fn handle_blocking(&self, query: &str, ctx: &ExecutionContext) -> Result<PreparedResponse> {
        info!("Query: {}", query);
        match self.plan(query) {
            Some(sql) => self.executor.execute(&sql, ctx).map(PreparedResponse::Rows),
            None => Ok(PreparedResponse::Complete(CompletionTag::ok())),
        }
    }

    /// SQL to run for `query`, `None` when there is nothing to execute
    fn plan(&self, query: &str) -> Option<String> {
        match self.interceptor.intercept(query) {
            Interception::Empty => {
                debug!("Empty query");
                None
            }
            Interception::Rewrite { sql, .. } | Interception::Passthrough(sql) => Some(sql),
        }
    }
}
