pub mod record_transaction;

pub use record_transaction::{RecordInput, RecordTransaction};
