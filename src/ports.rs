//! Storage ports for the ledger.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction};
use crate::error::LedgerResult;
use crate::query::Sort;

/// Persistence for transaction rows.
///
/// Implementations reject a second row with an existing `uuid` with
/// `LedgerError::UniqueConstraintViolation`.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &NewTransaction) -> LedgerResult<Transaction>;

    async fn get_by_id(&self, id: i64) -> LedgerResult<Transaction>;

    async fn get_by_uuid(&self, uuid: Uuid) -> LedgerResult<Transaction>;

    async fn list(&self, sort: Sort, limit: i64, offset: i64) -> LedgerResult<Vec<Transaction>>;

    /// Rows matching `term`, best match first, then by `sort`.
    async fn search(
        &self,
        term: &str,
        sort: Sort,
        limit: i64,
        offset: i64,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Flips `confirmed` to true. Returns false when it already was.
    async fn confirm(&self, id: i64) -> LedgerResult<bool>;
}
