pub mod amount_codec;
pub mod math;
pub mod wallet_precision;

pub use amount_codec::AmountCodec;
pub use math::{BigDecimalMath, DecimalMath};
pub use wallet_precision::{
    PostgresWalletPrecision, Precision, WalletPrecisionService, WalletPrecisionTable,
};
