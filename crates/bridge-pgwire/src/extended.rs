//! Extended query protocol
//!
//! Statements are executed when the client first asks for their description,
//! since the bridge cannot learn a result's columns without running it. The
//! materialized result is kept for the connection and replayed by the
//! following Execute instead of running the statement a second time.

use crate::result::{bridge_error, descriptors_to_field_info, into_pg_response};
use async_trait::async_trait;
use bridge_core::{BridgeError, PreparedResponse};
use bridge_executor::QueryBridge;
use parking_lot::Mutex;
use pgwire::api::portal::Portal;
use pgwire::api::query::ExtendedQueryHandler;
use pgwire::api::results::{DescribePortalResponse, DescribeStatementResponse, Response};
use pgwire::api::stmt::{NoopQueryParser, StoredStatement};
use pgwire::api::ClientInfo;
use pgwire::error::{PgWireError, PgWireResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error};

/// Results a connection keeps before the oldest is evicted
pub const DEFAULT_PREPARED_CACHE_CAPACITY: usize = 32;

/// Results executed at describe time, keyed by statement text.
///
/// Bounded: a client that describes statements without executing them
/// (e.g. Parse/Describe followed by Close) only ever holds `capacity`
/// results, the oldest going first.
#[derive(Debug)]
pub struct PreparedCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
}

#[derive(Debug, Default)]
struct CacheEntries {
    results: HashMap<String, PreparedResponse>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

impl PreparedCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PREPARED_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    pub fn insert(&self, sql: &str, response: PreparedResponse) {
        let mut entries = self.entries.lock();
        if entries.results.insert(sql.to_string(), response).is_none() {
            entries.order.push_back(sql.to_string());
        }

        while entries.results.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.results.remove(&oldest);
            debug!("Evicted prepared result: {}", oldest);
        }
    }

    pub fn get(&self, sql: &str) -> Option<PreparedResponse> {
        self.entries.lock().results.get(sql).cloned()
    }

    /// Remove and return the result for `sql`; each result is replayed once
    pub fn take(&self, sql: &str) -> Option<PreparedResponse> {
        let mut entries = self.entries.lock();
        let taken = entries.results.remove(sql)?;
        entries.order.retain(|queued| queued != sql);
        Some(taken)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().results.is_empty()
    }
}

impl Default for PreparedCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Extended query handler for one connection
pub struct BridgeExtendedHandler {
    bridge: Arc<QueryBridge>,
    cache: PreparedCache,
    query_parser: Arc<NoopQueryParser>,
}

impl BridgeExtendedHandler {
    pub fn new(bridge: Arc<QueryBridge>) -> Self {
        Self {
            bridge,
            cache: PreparedCache::new(),
            query_parser: Arc::new(NoopQueryParser::new()),
        }
    }

    pub fn cache(&self) -> &PreparedCache {
        &self.cache
    }

    /// Result for `sql`, executing it unless a describe already did
    async fn describe(&self, sql: &str) -> PgWireResult<PreparedResponse> {
        if let Some(prepared) = self.cache.get(sql) {
            return Ok(prepared);
        }
        let prepared = self.run(sql).await?;
        self.cache.insert(sql, prepared.clone());
        Ok(prepared)
    }

    async fn run(&self, sql: &str) -> PgWireResult<PreparedResponse> {
        self.bridge.handle(sql).await.map_err(|e| {
            error!("Statement failed: {}", e);
            bridge_error(e)
        })
    }
}

fn reject_parameters(portal: &Portal<String>) -> PgWireResult<()> {
    if portal.parameter_len() == 0 {
        return Ok(());
    }
    Err(unsupported_parameters(portal.parameter_len()))
}

fn unsupported_parameters(count: usize) -> PgWireError {
    bridge_error(BridgeError::Unsupported(format!(
        "bind parameters are not supported ({} given)",
        count
    )))
}

#[async_trait]
impl ExtendedQueryHandler for BridgeExtendedHandler {
    type Statement = String;
    type QueryParser = NoopQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<'a, 'b, C>(
        &'b self,
        _client: &mut C,
        portal: &'a Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response<'a>>
    where
        'b: 'a,
        C: ClientInfo + Unpin + Send + Sync,
    {
        reject_parameters(portal)?;

        let sql = &portal.statement.statement;
        let prepared = match self.cache.take(sql) {
            Some(prepared) => {
                debug!("Replaying result prepared at describe time: {}", sql);
                prepared
            }
            None => self.run(sql).await?,
        };
        into_pg_response(&prepared)
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        stmt: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        debug!("Describe statement: {}", stmt.statement);
        if !stmt.parameter_types.is_empty() {
            return Err(unsupported_parameters(stmt.parameter_types.len()));
        }

        let prepared = self.describe(&stmt.statement).await?;
        Ok(DescribeStatementResponse::new(
            Vec::new(),
            descriptors_to_field_info(prepared.columns()),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        debug!("Describe portal: {}", portal.statement.statement);
        reject_parameters(portal)?;

        let prepared = self.describe(&portal.statement.statement).await?;
        Ok(DescribePortalResponse::new(descriptors_to_field_info(
            prepared.columns(),
        )))
    }
}
