//! Repository implementations for the batching tables
//!
//! Repositories own the SQL and map rows to plain row structs; conversion to
//! domain types happens in the adapters. Queries are checked at runtime with
//! `sqlx::query_as` and `#[derive(sqlx::FromRow)]` rows.

pub mod claims;
pub mod batches;
pub mod insurers;
pub mod providers;

pub use claims::ClaimRepository;
pub use batches::BatchRepository;
pub use insurers::InsurerRepository;
pub use providers::ProviderRepository;
