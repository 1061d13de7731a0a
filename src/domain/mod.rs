//! Framework-agnostic ledger types.

pub mod amount;
pub mod payable;
pub mod transaction;

pub use payable::{Payable, PayableRef, PayableRegistry, PayableResolver};
pub use transaction::{Meta, NewTransaction, Transaction, TransactionType};

use serde::{Deserialize, Serialize};

/// Reference to the wallet a transaction moves money in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletRef {
    pub id: i64,
}

impl WalletRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}
