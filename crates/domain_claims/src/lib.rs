//! Claims Batching Data Model
//!
//! This crate holds the entities the batching core operates on: claims with
//! their line items, the providers that submit them, the insurers whose policy
//! drives batching, and the daily batches claims are grouped into.
//!
//! # Batch Keying
//!
//! ```text
//! claim --(insurer.date_preference)--> relevant_date
//! relevant_date - 1 day               = batch_date
//! (insurer, provider, batch_date)     = one Batch
//! ```

pub mod claim;
pub mod insurer;
pub mod provider;
pub mod batch;
pub mod submission;
pub mod error;

pub use claim::{Claim, ClaimItem};
pub use insurer::{DatePreference, Insurer};
pub use provider::Provider;
pub use batch::{Batch, BatchKey};
pub use submission::{ClaimSubmission, ItemSubmission};
pub use error::ClaimError;
