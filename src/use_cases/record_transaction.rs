//! Record transaction use case.
//! Turns a decimal amount into minor units for the target wallet and stores the row.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::{Meta, NewTransaction, PayableRef, Transaction, TransactionType, WalletRef};
use crate::error::LedgerResult;
use crate::ports::TransactionRepository;
use crate::services::AmountCodec;
use crate::validation::validate_meta;

/// Input for the RecordTransaction use case.
#[derive(Debug)]
pub struct RecordInput {
    pub payable: PayableRef,
    pub wallet_id: i64,
    pub transaction_type: TransactionType,
    pub amount: BigDecimal,
    pub uuid: Option<Uuid>,
    pub confirmed: bool,
    pub meta: Option<serde_json::Value>,
}

pub struct RecordTransaction {
    transaction_repository: Arc<dyn TransactionRepository>,
    codec: AmountCodec,
}

impl RecordTransaction {
    pub fn new(transaction_repository: Arc<dyn TransactionRepository>, codec: AmountCodec) -> Self {
        Self {
            transaction_repository,
            codec,
        }
    }

    #[tracing::instrument(skip(self, input), fields(wallet_id = input.wallet_id, tx_type = %input.transaction_type))]
    pub async fn execute(&self, input: RecordInput) -> LedgerResult<Transaction> {
        let meta = match input.meta {
            Some(value) => {
                validate_meta(&value)?;
                match value {
                    serde_json::Value::Object(map) => map,
                    _ => Meta::new(),
                }
            }
            None => Meta::new(),
        };

        let amount = self
            .codec
            .encode_for(WalletRef::new(input.wallet_id), &input.amount)
            .await?;

        let mut new_tx = NewTransaction::new(
            input.payable,
            input.wallet_id,
            input.transaction_type,
            amount,
        )
        .with_meta(meta)
        .with_confirmed(input.confirmed);

        if let Some(uuid) = input.uuid {
            new_tx = new_tx.with_uuid(uuid);
        }

        self.transaction_repository.insert(&new_tx).await
    }
}
