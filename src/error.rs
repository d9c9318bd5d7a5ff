use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteOrmError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Expression compile error: {0}")]
    CompileError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Connection not found in pool: {0}")]
    NotFoundInPool(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Value conversion error: {0}")]
    ConversionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqliteOrmError {
    /// Shorthand used throughout the compiler.
    pub(crate) fn compile(msg: impl Into<String>) -> Self {
        SqliteOrmError::CompileError(msg.into())
    }
}

impl From<tokio::task::JoinError> for SqliteOrmError {
    fn from(err: tokio::task::JoinError) -> Self {
        SqliteOrmError::ExecutionError(format!("blocking task failed: {err}"))
    }
}
