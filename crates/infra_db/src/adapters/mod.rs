//! Domain Adapters
//!
//! Adapter implementations connecting the batching ports to PostgreSQL.

pub mod batching;

pub use batching::PostgresBatchingAdapter;
