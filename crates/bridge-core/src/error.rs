use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Query error: {0}")]
    QueryExecution(String),

    #[error("Failed to get columns: {0}")]
    ColumnIntrospection(String),

    #[error("Failed to read row: {0}")]
    RowRead(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// SQLSTATE reported to the client for this error
    pub fn sqlstate(&self) -> &'static str {
        match self {
            BridgeError::QueryExecution(_) => "42000",
            BridgeError::ColumnIntrospection(_) => "XX000",
            BridgeError::RowRead(_) => "XX000",
            BridgeError::Cancelled => "57014",
            BridgeError::Connection(_) => "08006",
            BridgeError::Unsupported(_) => "0A000",
            BridgeError::Internal(_) => "XX000",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
