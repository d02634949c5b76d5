//! Claims Batching Core
//!
//! This crate groups submitted claims into daily, insurer-specific batches
//! and prices them with a synthetic processing cost model.
//!
//! # Flow
//!
//! ```text
//! new claim -> ClaimAssigner -> BatchOptimizer -> select_claims <-> cost
//!                    |                 |
//!                    |                 +-> BatchStore::commit_batch (one unit per batch)
//!                    +-> NotificationSender (best effort)
//!
//! CostAnalyzer, OptimizationAdvisor -> read-only reports over the cost model
//! ```
//!
//! # Failure Model
//!
//! Capacity exhaustion, undersized groups and failed batch writes are not
//! errors: they become optimization notes and log records, and the affected
//! claims stay unbatched for a later run.

pub mod cost;
pub mod selector;
pub mod ports;
pub mod optimizer;
pub mod assignment;
pub mod analysis;
pub mod recommendations;
pub mod notification;
pub mod intake;
pub mod error;

pub use cost::{batch_processing_cost, cost_breakdown, processing_cost, CostBreakdown};
pub use selector::{select_claims, SelectionPolicy};
pub use ports::{
    BatchCommit, BatchEntry, BatchStore, BatchWrite, BatchingPorts, AttachLimits,
    ClaimStore, InsurerStore, NotificationSender, ProviderStore,
};
pub use optimizer::{BatchOptimizer, OptimizationResult};
pub use assignment::{AssignmentOutcome, ClaimAssigner};
pub use analysis::{CostAnalysis, CostAnalyzer, CostBucket, CostOpportunity};
pub use recommendations::{OptimizationAdvisor, OptimizationOpportunity, OptimizationRecommendations};
pub use notification::BatchNotification;
pub use intake::{ClaimIntake, SubmissionReceipt};
pub use error::BatchingError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemoryStore, RecordingNotifier};
