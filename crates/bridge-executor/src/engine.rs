//! Backend engine contract

use bridge_core::{BackendColumn, BackendValue, Result};
use tokio_util::sync::CancellationToken;

/// Live cursor over one executed statement
pub trait RowCursor {
    /// Columns in backend order
    fn columns(&self) -> Result<Vec<BackendColumn>>;

    /// Next row, `None` once the cursor is exhausted
    fn next_row(&mut self) -> Result<Option<Vec<BackendValue>>>;
}

/// Synchronous query executor behind the bridge.
///
/// Implementations must be safe to call from many statements at once; any
/// serialization the backend needs is their own business.
pub trait QueryEngine: Send + Sync + 'static {
    /// Execute `sql` and hand the open cursor to `consume`.
    ///
    /// The cursor only lives for the duration of this call and is released
    /// before it returns, whether `consume` succeeds or fails.
    fn run_query(
        &self,
        sql: &str,
        ctx: &ExecutionContext,
        consume: &mut dyn FnMut(&mut dyn RowCursor) -> Result<()>,
    ) -> Result<()>;
}

/// Per-statement execution context carrying cancellation
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
