//! Transaction domain entity.
//! One deposit or withdrawal against a wallet, amount held in minor units.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PayableRef, WalletRef};
use crate::error::{LedgerError, LedgerResult};
use crate::services::amount_codec::AmountCodec;

pub type Meta = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Deposit, TransactionType::Withdraw];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            other => Err(LedgerError::InvalidTransactionType(other.to_string())),
        }
    }
}

/// Domain entity representing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(flatten)]
    pub payable: PayableRef,
    pub wallet_id: i64,
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(serialize_with = "serialize_minor_units")]
    pub amount: BigInt,
    pub confirmed: bool,
    pub meta: Meta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_minor_units<S>(amount: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(amount)
}

impl Transaction {
    pub fn wallet(&self) -> WalletRef {
        WalletRef::new(self.wallet_id)
    }

    /// Marks the transaction as applied. Returns whether the flag changed.
    pub fn confirm(&mut self) -> bool {
        if self.confirmed {
            return false;
        }
        self.confirmed = true;
        true
    }

    pub fn meta_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    /// Decimal amount under the wallet's precision as of now.
    pub async fn amount_float(&self, codec: &AmountCodec) -> LedgerResult<BigDecimal> {
        codec.decode(self).await
    }

    /// Re-encodes `amount` from a decimal. Only `amount` is written.
    pub async fn set_amount_float(
        &mut self,
        amount: &BigDecimal,
        codec: &AmountCodec,
    ) -> LedgerResult<()> {
        codec.encode_into(self, amount).await
    }
}

/// Insert payload. Storage assigns `id` and the timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub payable: PayableRef,
    pub wallet_id: i64,
    pub uuid: Uuid,
    pub transaction_type: TransactionType,
    pub amount: BigInt,
    pub confirmed: bool,
    pub meta: Meta,
}

impl NewTransaction {
    pub fn new(
        payable: PayableRef,
        wallet_id: i64,
        transaction_type: TransactionType,
        amount: BigInt,
    ) -> Self {
        Self {
            payable,
            wallet_id,
            uuid: Uuid::new_v4(),
            transaction_type,
            amount,
            confirmed: false,
            meta: Meta::new(),
        }
    }

    pub fn deposit(payable: PayableRef, wallet_id: i64, amount: impl Into<BigInt>) -> Self {
        Self::new(payable, wallet_id, TransactionType::Deposit, amount.into())
    }

    pub fn withdraw(payable: PayableRef, wallet_id: i64, amount: impl Into<BigInt>) -> Self {
        Self::new(payable, wallet_id, TransactionType::Withdraw, amount.into())
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.payable.validate()
    }

    pub fn into_transaction(self, id: i64, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            payable: self.payable,
            wallet_id: self.wallet_id,
            uuid: self.uuid,
            transaction_type: self.transaction_type,
            amount: self.amount,
            confirmed: self.confirmed,
            meta: self.meta,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::wallet_precision::WalletPrecisionTable;
    use serde_json::json;
    use std::sync::Arc;

    fn sample(amount: i64) -> Transaction {
        NewTransaction::deposit(PayableRef::new("user", 1), 10, amount).into_transaction(1, Utc::now())
    }

    #[test]
    fn type_accepts_exactly_two_values() {
        assert_eq!("deposit".parse::<TransactionType>().unwrap(), TransactionType::Deposit);
        assert_eq!("withdraw".parse::<TransactionType>().unwrap(), TransactionType::Withdraw);
        for bad in ["Deposit", "refund", "", "withdrawal"] {
            assert!(matches!(
                bad.parse::<TransactionType>(),
                Err(LedgerError::InvalidTransactionType(_))
            ));
        }
    }

    #[test]
    fn type_deserialization_rejects_unknown_values() {
        assert!(serde_json::from_value::<TransactionType>(json!("deposit")).is_ok());
        assert!(serde_json::from_value::<TransactionType>(json!("transfer")).is_err());
    }

    #[test]
    fn new_transactions_start_unconfirmed_with_empty_meta() {
        let new_tx = NewTransaction::withdraw(PayableRef::new("user", 1), 10, -500);
        assert!(!new_tx.confirmed);
        assert!(new_tx.meta.is_empty());
        assert_eq!(new_tx.transaction_type, TransactionType::Withdraw);
        assert_eq!(new_tx.amount, BigInt::from(-500));
    }

    #[test]
    fn confirm_is_one_way() {
        let mut tx = sample(100);
        assert!(tx.confirm());
        assert!(tx.confirmed);
        assert!(!tx.confirm());
        assert!(tx.confirmed);
    }

    #[test]
    fn serializes_with_column_names() {
        let mut meta = Meta::new();
        meta.insert("source".to_string(), json!("purchase"));
        let tx = NewTransaction::deposit(PayableRef::new("user", 3), 10, 12345)
            .with_meta(meta)
            .into_transaction(9, Utc::now());

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["type"], "deposit");
        assert_eq!(value["amount"], "12345");
        assert_eq!(value["payable_type"], "user");
        assert_eq!(value["payable_id"], 3);
        assert_eq!(value["meta"]["source"], "purchase");
    }

    #[tokio::test]
    async fn amount_float_round_trips_through_codec() {
        let codec = AmountCodec::new(Arc::new(WalletPrecisionTable::default()));
        let mut tx = sample(12345);

        let decimal = tx.amount_float(&codec).await.unwrap();
        assert_eq!(decimal, "123.45".parse::<BigDecimal>().unwrap());

        tx.set_amount_float(&"10.005".parse::<BigDecimal>().unwrap(), &codec)
            .await
            .unwrap();
        assert_eq!(tx.amount, BigInt::from(1001));
        assert!(!tx.confirmed);
        assert!(tx.meta.is_empty());
    }

    #[tokio::test]
    async fn amount_float_follows_current_wallet_precision() {
        let table = Arc::new(WalletPrecisionTable::default());
        let codec = AmountCodec::new(table.clone());
        let tx = sample(12345);

        assert_eq!(
            tx.amount_float(&codec).await.unwrap(),
            "123.45".parse::<BigDecimal>().unwrap()
        );

        table.set_decimal_places(tx.wallet(), 3).unwrap();
        assert_eq!(
            tx.amount_float(&codec).await.unwrap(),
            "12.345".parse::<BigDecimal>().unwrap()
        );
        assert_eq!(tx.amount, BigInt::from(12345));
    }
}
