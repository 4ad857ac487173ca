//! Simple query handler and per-connection handler set

use crate::extended::BridgeExtendedHandler;
use crate::result::{bridge_error, into_pg_response};
use async_trait::async_trait;
use bridge_executor::QueryBridge;
use pgwire::api::auth::noop::NoopStartupHandler;
use pgwire::api::copy::NoopCopyHandler;
use pgwire::api::query::SimpleQueryHandler;
use pgwire::api::results::Response;
use pgwire::api::{ClientInfo, NoopErrorHandler, PgWireServerHandlers};
use pgwire::error::PgWireResult;
use std::sync::Arc;
use tracing::error;

/// Answers simple-protocol queries through the bridge
pub struct BridgeBackend {
    bridge: Arc<QueryBridge>,
}

impl BridgeBackend {
    pub fn new(bridge: Arc<QueryBridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<QueryBridge> {
        &self.bridge
    }
}

#[async_trait]
impl SimpleQueryHandler for BridgeBackend {
    /// The whole query string is one statement; it is not split on `;`
    async fn do_query<'a, C>(
        &self,
        _client: &mut C,
        query: &'a str,
    ) -> PgWireResult<Vec<Response<'a>>>
    where
        C: ClientInfo + Unpin + Send,
    {
        let prepared = self.bridge.handle(query).await.map_err(|e| {
            error!("Statement failed: {}", e);
            bridge_error(e)
        })?;
        Ok(vec![into_pg_response(&prepared)?])
    }
}

/// Accepts every connection without authentication
pub struct SimpleStartupHandler;

impl NoopStartupHandler for SimpleStartupHandler {}

/// Handlers for one client connection
pub struct BridgeServerHandlers {
    startup_handler: Arc<SimpleStartupHandler>,
    simple_query_handler: Arc<BridgeBackend>,
    extended_query_handler: Arc<BridgeExtendedHandler>,
    copy_handler: Arc<NoopCopyHandler>,
    error_handler: Arc<NoopErrorHandler>,
}

impl BridgeServerHandlers {
    pub fn new(bridge: Arc<QueryBridge>) -> Self {
        Self {
            startup_handler: Arc::new(SimpleStartupHandler),
            simple_query_handler: Arc::new(BridgeBackend::new(Arc::clone(&bridge))),
            extended_query_handler: Arc::new(BridgeExtendedHandler::new(bridge)),
            copy_handler: Arc::new(NoopCopyHandler),
            error_handler: Arc::new(NoopErrorHandler),
        }
    }
}

impl PgWireServerHandlers for BridgeServerHandlers {
    type StartupHandler = SimpleStartupHandler;
    type SimpleQueryHandler = BridgeBackend;
    type ExtendedQueryHandler = BridgeExtendedHandler;
    type CopyHandler = NoopCopyHandler;
    type ErrorHandler = NoopErrorHandler;

    fn simple_query_handler(&self) -> Arc<Self::SimpleQueryHandler> {
        Arc::clone(&self.simple_query_handler)
    }

    fn extended_query_handler(&self) -> Arc<Self::ExtendedQueryHandler> {
        Arc::clone(&self.extended_query_handler)
    }

    fn startup_handler(&self) -> Arc<Self::StartupHandler> {
        Arc::clone(&self.startup_handler)
    }

    fn copy_handler(&self) -> Arc<Self::CopyHandler> {
        Arc::clone(&self.copy_handler)
    }

    fn error_handler(&self) -> Arc<Self::ErrorHandler> {
        Arc::clone(&self.error_handler)
    }
}
