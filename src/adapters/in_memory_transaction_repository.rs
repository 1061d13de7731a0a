//! In-process TransactionRepository, for hosts without a database and for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction};
use crate::error::{LedgerError, LedgerResult};
use crate::ports::TransactionRepository;
use crate::query::{page_size, SearchDescriptor, Sort, WeightedColumn};
use crate::validation::validate_search_term;

const TRANSACTION_TABLE: &str = "transactions";
const USERS_TABLE: &str = "users";

#[derive(Default)]
struct State {
    next_id: i64,
    rows: Vec<Transaction>,
    users: HashMap<i64, HashMap<String, String>>,
}

pub struct InMemoryTransactionRepository {
    state: RwLock<State>,
    search: SearchDescriptor,
}

impl Default for InMemoryTransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            search: SearchDescriptor::transactions(TRANSACTION_TABLE, USERS_TABLE),
        }
    }

    /// Makes a user row available to the search join.
    pub async fn register_user(&self, id: i64, email: &str, username: &str) {
        let mut state = self.state.write().await;
        state.users.insert(
            id,
            HashMap::from([
                ("email".to_string(), email.to_string()),
                ("username".to_string(), username.to_string()),
            ]),
        );
    }

    fn column_value(state: &State, tx: &Transaction, column: &WeightedColumn) -> Option<String> {
        match column.table.as_str() {
            TRANSACTION_TABLE if column.column == "uuid" => Some(tx.uuid.to_string()),
            USERS_TABLE => state
                .users
                .get(&tx.payable.payable_id)
                .and_then(|user| user.get(&column.column))
                .cloned(),
            _ => None,
        }
    }
}

fn page(rows: Vec<Transaction>, limit: i64, offset: i64) -> Vec<Transaction> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(page_size(Some(limit)) as usize)
        .collect()
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, tx: &NewTransaction) -> LedgerResult<Transaction> {
        tx.validate()?;

        let mut state = self.state.write().await;
        if state.rows.iter().any(|row| row.uuid == tx.uuid) {
            tracing::warn!(uuid = %tx.uuid, "duplicate transaction uuid rejected");
            return Err(LedgerError::UniqueConstraintViolation(format!(
                "transactions.uuid {}",
                tx.uuid
            )));
        }

        state.next_id += 1;
        let inserted = tx.clone().into_transaction(state.next_id, Utc::now());
        state.rows.push(inserted.clone());
        tracing::debug!(id = inserted.id, uuid = %inserted.uuid, "transaction recorded");
        Ok(inserted)
    }

    async fn get_by_id(&self, id: i64) -> LedgerResult<Transaction> {
        let state = self.state.read().await;
        state
            .rows
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))
    }

    async fn get_by_uuid(&self, uuid: Uuid) -> LedgerResult<Transaction> {
        let state = self.state.read().await;
        state
            .rows
            .iter()
            .find(|row| row.uuid == uuid)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", uuid)))
    }

    async fn list(&self, sort: Sort, limit: i64, offset: i64) -> LedgerResult<Vec<Transaction>> {
        let mut rows = self.state.read().await.rows.clone();
        sort.sort(&mut rows);
        Ok(page(rows, limit, offset))
    }

    async fn search(
        &self,
        term: &str,
        sort: Sort,
        limit: i64,
        offset: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        let term = validate_search_term(term)?;
        let state = self.state.read().await;

        let mut scored: Vec<(u32, Transaction)> = state
            .rows
            .iter()
            .map(|tx| {
                let score = self
                    .search
                    .score(&term, |column| Self::column_value(&state, tx, column));
                (score, tx.clone())
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b.cmp(score_a).then_with(|| sort.compare(a, b))
        });

        Ok(page(
            scored.into_iter().map(|(_, tx)| tx).collect(),
            limit,
            offset,
        ))
    }

    async fn confirm(&self, id: i64) -> LedgerResult<bool> {
        let mut state = self.state.write().await;
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))?;

        let changed = row.confirm();
        if changed {
            row.updated_at = Utc::now();
        }
        Ok(changed)
    }
}
