//! Batch-ready message sent to insurers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{BatchId, InsurerId, Money};
use domain_claims::Batch;

pub const BATCH_READY_SUBJECT: &str = "New Claim Batch Ready for Processing";

/// A rendered batch-ready message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNotification {
    pub batch_id: BatchId,
    pub insurer_id: InsurerId,
    pub provider_name: String,
    pub batch_date: NaiveDate,
    pub claim_count: usize,
    pub total_amount: Money,
    pub subject: String,
    pub body: String,
}

impl BatchNotification {
    pub fn for_batch(batch: &Batch, provider_name: &str) -> Self {
        let body = format!(
            "{subject}\n\n\
             Provider: {provider}\n\
             Batch Date: {date}\n\
             Number of Claims: {count}\n\
             Total Amount: {total}\n",
            subject = BATCH_READY_SUBJECT,
            provider = provider_name,
            date = batch.batch_date.format("%b %-d, %Y"),
            count = batch.claim_count(),
            total = batch.total_cost,
        );

        Self {
            batch_id: batch.id,
            insurer_id: batch.insurer_id,
            provider_name: provider_name.to_string(),
            batch_date: batch.batch_date,
            claim_count: batch.claim_count(),
            total_amount: batch.total_cost,
            subject: BATCH_READY_SUBJECT.to_string(),
            body,
        }
    }
}
