//! Per-wallet decimal precision lookups.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use num_bigint::BigInt;
use sqlx::PgPool;

use crate::domain::WalletRef;
use crate::config::Config;
use crate::error::{LedgerError, LedgerResult};
use crate::services::math::{ensure_places, pow10};
use crate::validation::validate_sql_identifier;

pub const DEFAULT_DECIMAL_PLACES: i64 = 2;

/// Source of truth for how many fractional digits a wallet's currency has.
///
/// Callers query this on every conversion; nothing downstream caches it.
#[async_trait]
pub trait WalletPrecisionService: Send + Sync {
    async fn decimal_places(&self, wallet: WalletRef) -> LedgerResult<i64>;

    async fn decimal_places_value(&self, wallet: WalletRef) -> LedgerResult<BigInt> {
        Ok(self.precision(wallet).await?.value)
    }

    /// Places and `10^places` taken from a single read.
    async fn precision(&self, wallet: WalletRef) -> LedgerResult<Precision> {
        Precision::from_places(self.decimal_places(wallet).await?)
    }
}

/// A wallet's decimal places together with the matching `10^places`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precision {
    pub places: i64,
    pub value: BigInt,
}

impl Precision {
    pub fn from_places(places: i64) -> LedgerResult<Self> {
        ensure_places(places)?;
        let digits = u32::try_from(places).map_err(|_| {
            LedgerError::InvalidPrecision(format!("decimal places out of range: {}", places))
        })?;
        Ok(Self {
            places,
            value: pow10(digits),
        })
    }

    /// Rejects a pair whose value is not `10^places`.
    pub fn ensure_consistent(&self) -> LedgerResult<()> {
        let expected = Self::from_places(self.places)?;
        if expected.value != self.value {
            return Err(LedgerError::InvalidPrecision(format!(
                "decimal places value {} does not match {} places",
                self.value, self.places
            )));
        }
        Ok(())
    }
}

/// In-process precision table. Reads take a snapshot, writes swap it.
pub struct WalletPrecisionTable {
    default_places: i64,
    inner: ArcSwap<HashMap<i64, i64>>,
}

impl WalletPrecisionTable {
    pub fn new(default_places: i64) -> Self {
        Self {
            default_places,
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn with_wallets(default_places: i64, wallets: impl IntoIterator<Item = (i64, i64)>) -> Self {
        Self {
            default_places,
            inner: ArcSwap::from_pointee(wallets.into_iter().collect()),
        }
    }

    pub fn set_decimal_places(&self, wallet: WalletRef, places: i64) -> LedgerResult<()> {
        ensure_places(places)?;
        self.inner.rcu(|current| {
            let mut next: HashMap<i64, i64> = (**current).clone();
            next.insert(wallet.id, places);
            next
        });
        tracing::debug!(wallet_id = wallet.id, places, "wallet precision updated");
        Ok(())
    }
}

impl Default for WalletPrecisionTable {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMAL_PLACES)
    }
}

#[async_trait]
impl WalletPrecisionService for WalletPrecisionTable {
    async fn decimal_places(&self, wallet: WalletRef) -> LedgerResult<i64> {
        let snapshot = self.inner.load();
        Ok(snapshot
            .get(&wallet.id)
            .copied()
            .unwrap_or(self.default_places))
    }
}

/// Reads `decimal_places` straight from the wallet table.
#[derive(Clone)]
pub struct PostgresWalletPrecision {
    pool: PgPool,
    wallet_table: String,
    default_places: i64,
}

impl PostgresWalletPrecision {
    pub fn new(pool: PgPool, wallet_table: &str, default_places: i64) -> LedgerResult<Self> {
        validate_sql_identifier("wallet_table", wallet_table)?;
        ensure_places(default_places)?;

        Ok(Self {
            pool,
            wallet_table: wallet_table.to_string(),
            default_places,
        })
    }

    pub fn from_config(pool: PgPool, config: &Config) -> LedgerResult<Self> {
        Self::new(pool, &config.wallet_table, config.default_decimal_places)
    }
}

#[async_trait]
impl WalletPrecisionService for PostgresWalletPrecision {
    #[tracing::instrument(skip(self), fields(table = %self.wallet_table))]
    async fn decimal_places(&self, wallet: WalletRef) -> LedgerResult<i64> {
        let sql = format!(
            "SELECT decimal_places FROM {} WHERE id = $1",
            self.wallet_table
        );
        let row: Option<(Option<i32>,)> = sqlx::query_as(&sql)
            .bind(wallet.id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((places,)) => Ok(places.map(i64::from).unwrap_or(self.default_places)),
            None => Err(LedgerError::NotFound(format!("wallet {}", wallet.id))),
        }
    }
}
