//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claims batching test suite.
//!
//! # Modules
//!
//! - `fixtures`: The four reference insurers and fixed dates
//! - `builders`: Builder patterns for claims, insurers and submissions
//! - `database`: Database test helpers and container management
//! - `assertions`: Batch invariant checks
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
