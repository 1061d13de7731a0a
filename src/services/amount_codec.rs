use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::domain::amount;
use crate::domain::{Transaction, WalletRef};
use crate::error::LedgerResult;
use crate::services::math::{BigDecimalMath, DecimalMath};
use crate::services::wallet_precision::WalletPrecisionService;

/// Binds the pure amount conversions to a precision source and a math
/// implementation. Holds no mutable state; clone freely across tasks.
#[derive(Clone)]
pub struct AmountCodec {
    wallets: Arc<dyn WalletPrecisionService>,
    math: Arc<dyn DecimalMath>,
}

impl AmountCodec {
    pub fn new(wallets: Arc<dyn WalletPrecisionService>) -> Self {
        Self::with_math(wallets, Arc::new(BigDecimalMath))
    }

    pub fn with_math(wallets: Arc<dyn WalletPrecisionService>, math: Arc<dyn DecimalMath>) -> Self {
        Self { wallets, math }
    }

    pub async fn decode(&self, tx: &Transaction) -> LedgerResult<BigDecimal> {
        self.decode_for(tx.wallet(), &tx.amount).await
    }

    pub async fn decode_for(&self, wallet: WalletRef, minor_units: &BigInt) -> LedgerResult<BigDecimal> {
        let precision = self.wallets.precision(wallet).await?;
        precision.ensure_consistent()?;

        amount::decode_with(
            self.math.as_ref(),
            minor_units,
            precision.places,
            &precision.value,
        )
    }

    pub async fn encode_for(&self, wallet: WalletRef, value: &BigDecimal) -> LedgerResult<BigInt> {
        let decimal_places = self.wallets.decimal_places(wallet).await?;
        amount::encode_with(self.math.as_ref(), value, decimal_places)
    }

    pub async fn encode_into(&self, tx: &mut Transaction, value: &BigDecimal) -> LedgerResult<()> {
        let encoded = self.encode_for(tx.wallet(), value).await?;
        tracing::trace!(
            transaction_id = tx.id,
            wallet_id = tx.wallet_id,
            previous = %tx.amount,
            amount = %encoded,
            "amount re-encoded"
        );
        tx.amount = encoded;
        Ok(())
    }
}
