pub mod in_memory_transaction_repository;
pub mod postgres_payable_resolver;
pub mod postgres_transaction_repository;

pub use in_memory_transaction_repository::InMemoryTransactionRepository;
pub use postgres_payable_resolver::PostgresUserResolver;
pub use postgres_transaction_repository::PostgresTransactionRepository;
