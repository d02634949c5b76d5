//! Core Kernel - Foundational types for the claims batching system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for claims, insurers, providers and batches
//! - Port infrastructure for swapping storage and delivery adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, round_half_up};
pub use identifiers::{ClaimId, ClaimItemId, InsurerId, ProviderId, BatchId};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
