//! Resolves user-owned transactions against the users table.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use crate::domain::{Payable, PayableRef, PayableResolver};
use crate::error::{LedgerError, LedgerResult};
use crate::validation::validate_sql_identifier;

#[derive(Clone)]
pub struct PostgresUserResolver {
    pool: PgPool,
    table: String,
}

impl PostgresUserResolver {
    pub fn new(pool: PgPool, table: &str) -> LedgerResult<Self> {
        validate_sql_identifier("users_table", table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl PayableResolver for PostgresUserResolver {
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    async fn resolve(&self, reference: &PayableRef) -> LedgerResult<Payable> {
        let sql = format!("SELECT id, email, username FROM {} WHERE id = $1", self.table);
        let row: Option<(i64, String, String)> = sqlx::query_as(&sql)
            .bind(reference.payable_id)
            .fetch_optional(&self.pool)
            .await?;

        let (id, email, username) = row.ok_or_else(|| {
            LedgerError::NotFound(format!(
                "{} {}",
                reference.payable_type, reference.payable_id
            ))
        })?;

        let mut attributes = serde_json::Map::new();
        attributes.insert("id".to_string(), json!(id));
        attributes.insert("email".to_string(), json!(email));
        attributes.insert("username".to_string(), json!(username));

        Ok(Payable {
            reference: reference.clone(),
            attributes,
        })
    }
}
