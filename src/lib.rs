pub mod adapters;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ports;
pub mod query;
pub mod services;
pub mod telemetry;
pub mod use_cases;
pub mod validation;

pub use config::Config;
pub use domain::{NewTransaction, PayableRef, Transaction, TransactionType, WalletRef};
pub use error::{LedgerError, LedgerResult};
pub use ports::TransactionRepository;
pub use services::AmountCodec;
