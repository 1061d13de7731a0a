//! Declarative ordering and search over the transaction table.

pub mod search;
pub mod sort;

pub use search::{SearchDescriptor, SearchJoin, WeightedColumn};
pub use sort::{Sort, SortDirection, SortKey};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamps a requested page size to `1..=MAX_PAGE_SIZE`.
pub fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
