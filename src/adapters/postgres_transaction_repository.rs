//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Meta, NewTransaction, PayableRef, Transaction, TransactionType};
use crate::error::{LedgerError, LedgerResult};
use crate::ports::TransactionRepository;
use crate::query::{page_size, SearchDescriptor, Sort};
use crate::validation::{validate_search_term, validate_sql_identifier, ValidationError};

const COLUMNS: &str =
    "id, payable_type, payable_id, wallet_id, uuid, \"type\", amount, confirmed, meta, created_at, updated_at";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
    table: String,
    search: SearchDescriptor,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: "transactions".to_string(),
            search: SearchDescriptor::transactions("transactions", "users"),
        }
    }

    pub fn with_tables(pool: PgPool, table: &str, users_table: &str) -> LedgerResult<Self> {
        validate_sql_identifier("transaction_table", table)?;
        let search = SearchDescriptor::transactions(table, users_table);
        search.validate()?;

        Ok(Self {
            pool,
            table: table.to_string(),
            search,
        })
    }

    pub fn from_config(pool: PgPool, config: &Config) -> LedgerResult<Self> {
        Self::with_tables(pool, &config.transaction_table, &config.users_table)
    }

    async fn fetch_one_by<T>(&self, column: &str, value: T, label: String) -> LedgerResult<Transaction>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            COLUMNS, self.table, column
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TransactionRow::into_domain)
            .unwrap_or_else(|| Err(LedgerError::NotFound(label)))
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    #[tracing::instrument(skip(self, tx), fields(uuid = %tx.uuid, wallet_id = tx.wallet_id))]
    async fn insert(&self, tx: &NewTransaction) -> LedgerResult<Transaction> {
        tx.validate()?;

        let sql = format!(
            r#"
            INSERT INTO {} (
                payable_type, payable_id, wallet_id, uuid, "type", amount, confirmed, meta
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            self.table, COLUMNS
        );

        let result = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(&tx.payable.payable_type)
            .bind(tx.payable.payable_id)
            .bind(tx.wallet_id)
            .bind(tx.uuid)
            .bind(tx.transaction_type.as_str())
            .bind(BigDecimal::new(tx.amount.clone(), 0))
            .bind(tx.confirmed)
            .bind(Json(&tx.meta))
            .fetch_one(&self.pool)
            .await;

        let row = match result {
            Ok(row) => row,
            Err(err) => {
                let err = LedgerError::from(err);
                if matches!(err, LedgerError::UniqueConstraintViolation(_)) {
                    tracing::warn!("duplicate transaction uuid rejected");
                }
                return Err(err);
            }
        };

        let inserted = row.into_domain()?;
        tracing::info!(id = inserted.id, "transaction recorded");
        Ok(inserted)
    }

    async fn get_by_id(&self, id: i64) -> LedgerResult<Transaction> {
        self.fetch_one_by("id", id, format!("transaction {}", id)).await
    }

    async fn get_by_uuid(&self, uuid: Uuid) -> LedgerResult<Transaction> {
        self.fetch_one_by("uuid", uuid, format!("transaction {}", uuid)).await
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, sort: Sort, limit: i64, offset: i64) -> LedgerResult<Vec<Transaction>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} ORDER BY {}",
            COLUMNS,
            self.table,
            sort.order_by_sql(&self.table)
        ));
        builder.push(" LIMIT ");
        builder.push_bind(page_size(Some(limit)));
        builder.push(" OFFSET ");
        builder.push_bind(offset.max(0));

        let rows = builder
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn search(
        &self,
        term: &str,
        sort: Sort,
        limit: i64,
        offset: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        let term = validate_search_term(term)?;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM (SELECT {}.*, ",
            COLUMNS, self.table
        ));
        self.search.push_relevance(&mut builder, &term);
        builder.push(format!(" AS relevance FROM {}", self.table));
        self.search.push_joins(&mut builder);
        builder.push(format!(
            ") AS scored WHERE relevance > 0 ORDER BY relevance DESC, {}",
            sort.order_by_sql("scored")
        ));
        builder.push(" LIMIT ");
        builder.push_bind(page_size(Some(limit)));
        builder.push(" OFFSET ");
        builder.push_bind(offset.max(0));

        let rows = builder
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(matches = rows.len(), "transaction search finished");
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn confirm(&self, id: i64) -> LedgerResult<bool> {
        let sql = format!(
            "UPDATE {} SET confirmed = TRUE, updated_at = NOW() WHERE id = $1 AND confirmed = FALSE",
            self.table
        );
        let updated = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 1 {
            tracing::info!("transaction confirmed");
            return Ok(true);
        }

        // Nothing changed: either already confirmed or missing.
        self.get_by_id(id).await.map(|_| false)
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    payable_type: String,
    payable_id: i64,
    wallet_id: i64,
    uuid: Uuid,
    #[sqlx(rename = "type")]
    transaction_type: String,
    amount: BigDecimal,
    confirmed: bool,
    meta: Json<Meta>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> LedgerResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            payable: PayableRef::new(self.payable_type, self.payable_id),
            wallet_id: self.wallet_id,
            uuid: self.uuid,
            transaction_type: self.transaction_type.parse::<TransactionType>()?,
            amount: minor_units(&self.amount)?,
            confirmed: self.confirmed,
            meta: self.meta.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Stored amounts are whole minor units; anything fractional is corrupt.
fn minor_units(value: &BigDecimal) -> LedgerResult<BigInt> {
    if !value.is_integer() {
        return Err(LedgerError::Validation(ValidationError::new(
            "amount",
            format!("stored amount {} is not a whole number of minor units", value),
        )));
    }
    let (mantissa, _) = value.with_scale(0).as_bigint_and_exponent();
    Ok(mantissa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn whole_numerics_convert_to_minor_units() {
        let value = BigDecimal::from_str("12345").unwrap();
        assert_eq!(minor_units(&value).unwrap(), BigInt::from(12345));

        let scaled = BigDecimal::from_str("-1200.00").unwrap();
        assert_eq!(minor_units(&scaled).unwrap(), BigInt::from(-1200));
    }

    #[test]
    fn fractional_numerics_are_rejected() {
        let value = BigDecimal::from_str("10.5").unwrap();
        assert!(matches!(minor_units(&value), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn unknown_type_in_row_is_rejected() {
        let row = TransactionRow {
            id: 1,
            payable_type: "user".to_string(),
            payable_id: 1,
            wallet_id: 1,
            uuid: Uuid::new_v4(),
            transaction_type: "refund".to_string(),
            amount: BigDecimal::from(1),
            confirmed: false,
            meta: Json(Meta::new()),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(matches!(
            row.into_domain(),
            Err(LedgerError::InvalidTransactionType(_))
        ));
    }
}
