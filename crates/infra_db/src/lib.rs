//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for claims, providers, insurers and batches using
//! SQLx, plus the adapter that exposes it through the batching ports.
//!
//! # Architecture
//!
//! Repositories own the SQL and speak in row types. The
//! [`PostgresBatchingAdapter`] converts rows into domain types and
//! implements the store ports, so the domain layer never sees SQLx.
//!
//! Batch writes run in one transaction under an advisory lock keyed by
//! insurer and batch date, which keeps daily capacity and batch size
//! ceilings exact under concurrent optimization runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBatchingAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims_batching")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBatchingAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::PostgresBatchingAdapter;
