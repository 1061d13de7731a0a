use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use num_bigint::BigInt;
use serde_json::json;
use wallet_ledger::adapters::InMemoryTransactionRepository;
use wallet_ledger::domain::amount::{decimal_from_f64, decode, encode};
use wallet_ledger::domain::Meta;
use wallet_ledger::query::{Sort, SortKey};
use wallet_ledger::services::WalletPrecisionTable;
use wallet_ledger::{
    AmountCodec, LedgerError, NewTransaction, PayableRef, TransactionRepository, TransactionType,
};

fn decimal(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

fn with_meta(key: &str, value: serde_json::Value) -> NewTransaction {
    let mut meta = Meta::new();
    meta.insert(key.to_string(), value);
    NewTransaction::deposit(PayableRef::new("user", 1), 1, 100).with_meta(meta)
}

#[test]
fn test_decode_is_exact() {
    let value = decode(&BigInt::from(12345), 2, &BigInt::from(100)).unwrap();
    assert_eq!(value, decimal("123.45"));
    for _ in 0..3 {
        assert_eq!(
            decode(&BigInt::from(12345), 2, &BigInt::from(100)).unwrap(),
            value
        );
    }
}

#[test]
fn test_encode_rounding() {
    assert_eq!(encode(&decimal_from_f64(10.005).unwrap(), 2).unwrap(), BigInt::from(1001));
    assert_eq!(encode(&decimal_from_f64(-10.005).unwrap(), 2).unwrap(), BigInt::from(-1001));
}

#[test]
fn test_negative_precision_fails() {
    assert!(matches!(
        encode(&decimal("1"), -1),
        Err(LedgerError::InvalidPrecision(_))
    ));
    assert!(matches!(
        decode(&BigInt::from(1), -1, &BigInt::from(1)),
        Err(LedgerError::InvalidPrecision(_))
    ));
}

#[test]
fn test_type_boundary() {
    assert_eq!(TransactionType::ALL.len(), 2);
    assert!("deposit".parse::<TransactionType>().is_ok());
    assert!("withdraw".parse::<TransactionType>().is_ok());
    assert!(matches!(
        "chargeback".parse::<TransactionType>(),
        Err(LedgerError::InvalidTransactionType(_))
    ));
}

#[tokio::test]
async fn test_source_sort_ranking() {
    let repo = InMemoryTransactionRepository::new();
    for source in ["payout", "purchase", "transfer"] {
        repo.insert(&with_meta("source", json!(source))).await.unwrap();
    }

    let rows = repo.list(Sort::asc(SortKey::Source), 10, 0).await.unwrap();
    let sources: Vec<&str> = rows
        .iter()
        .map(|tx| tx.meta["source"].as_str().unwrap())
        .collect();
    assert_eq!(sources, vec!["purchase", "transfer", "payout"]);
}

#[tokio::test]
async fn test_order_id_sorts_numerically() {
    let repo = InMemoryTransactionRepository::new();
    repo.insert(&with_meta("order_id", json!("10"))).await.unwrap();
    repo.insert(&with_meta("order_id", json!("9"))).await.unwrap();

    let rows = repo.list(Sort::asc(SortKey::OrderId), 10, 0).await.unwrap();
    assert_eq!(rows[0].meta["order_id"], "9");
    assert_eq!(rows[1].meta["order_id"], "10");
}

#[tokio::test]
async fn test_uuid_uniqueness() {
    let repo = InMemoryTransactionRepository::new();
    let first = repo
        .insert(&NewTransaction::deposit(PayableRef::new("user", 1), 1, 100))
        .await
        .unwrap();
    let replay = NewTransaction::withdraw(PayableRef::new("user", 1), 1, -100).with_uuid(first.uuid);

    assert!(matches!(
        repo.insert(&replay).await,
        Err(LedgerError::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn test_amount_float_tracks_current_precision() {
    let precision = Arc::new(WalletPrecisionTable::default());
    let codec = AmountCodec::new(precision.clone());
    let tx = NewTransaction::deposit(PayableRef::new("user", 1), 4, 250_000).into_transaction(1, Utc::now());

    assert_eq!(tx.amount_float(&codec).await.unwrap(), decimal("2500.00"));
    precision.set_decimal_places(tx.wallet(), 4).unwrap();
    assert_eq!(tx.amount_float(&codec).await.unwrap(), decimal("25.0000"));
}
