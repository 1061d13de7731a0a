use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid precision: {0}")]
    InvalidPrecision(String),

    #[error("Non-finite amount: {0}")]
    NonFiniteAmount(String),

    #[error("Unique constraint violation: {0}")]
    UniqueConstraintViolation(String),

    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    #[error("Unknown payable type: {0}")]
    UnknownPayableType(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LedgerError::UniqueConstraintViolation(
                    db_err
                        .constraint()
                        .map(str::to_string)
                        .unwrap_or_else(|| db_err.message().to_string()),
                )
            }
            sqlx::Error::Database(db_err)
                if db_err.is_check_violation()
                    && db_err
                        .constraint()
                        .map_or(false, |name| name.ends_with("type_check")) =>
            {
                LedgerError::InvalidTransactionType(db_err.message().to_string())
            }
            other => LedgerError::Database(other),
        }
    }
}

impl LedgerError {
    /// Errors caused by the caller's input rather than by storage.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Database(_))
    }
}
