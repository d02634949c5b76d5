//! Batching Domain Ports
//!
//! This module defines the collaborators the batching core needs from its
//! environment: claim, batch, insurer and provider storage, and delivery of
//! batch-ready notifications.
//!
//! # Architecture
//!
//! - **PostgreSQL Adapter**: `infra_db::PostgresBatchingAdapter`
//! - **In-memory Adapter**: [`mock::InMemoryStore`], for tests and demos
//!
//! # Batch Writes
//!
//! [`BatchStore::commit_batch`] is the only mutation of batch state. An
//! implementation must run it as one serialized unit per (insurer,
//! batch_date) so the capacity count it reads and the attachments it writes
//! cannot interleave with another writer:
//!
//! 1. drop entries whose claim already belongs to any batch
//! 2. if `limits.daily_capacity` is set, keep only as many entries as the
//!    (insurer, batch_date) has capacity left
//! 3. find or create the batch for the key
//! 4. if `limits.max_batch_size` is set, keep only as many entries as the
//!    batch has room left
//! 5. attach the entries and add their amounts to `total_cost`
//!
//! When nothing is left to attach no batch is created.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = Arc::new(InMemoryStore::new());
//! let ports = BatchingPorts::from_store(store, Arc::new(RecordingNotifier::new()));
//! let optimizer = BatchOptimizer::new(ports.claims.clone(), ports.batches.clone());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{BatchId, ClaimId, DomainPort, InsurerId, Money, PortError, ProviderId};
use domain_claims::{Batch, BatchKey, Claim, DatePreference, Insurer, Provider};

use crate::notification::BatchNotification;

/// One claim to attach, with the amount it adds to the batch total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    pub claim_id: ClaimId,
    pub amount: Money,
}

impl From<&Claim> for BatchEntry {
    fn from(claim: &Claim) -> Self {
        Self {
            claim_id: claim.id,
            amount: claim.total_amount,
        }
    }
}

/// Ceilings re-checked inside the batch write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachLimits {
    /// Claims allowed across all batches of the insurer on the batch_date
    pub daily_capacity: Option<u32>,
    /// Claims allowed in the batch itself
    pub max_batch_size: Option<u32>,
}

impl AttachLimits {
    /// No ceilings; used for the unconditional fallback attachment
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn for_insurer(insurer: &Insurer) -> Self {
        Self {
            daily_capacity: Some(insurer.daily_capacity),
            max_batch_size: Some(insurer.max_batch_size),
        }
    }
}

/// A request to attach claims to the batch for `key`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrite {
    pub key: BatchKey,
    pub entries: Vec<BatchEntry>,
    pub limits: AttachLimits,
}

/// What a batch write did
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommit {
    /// The batch after the write; None when nothing was attached and no batch existed
    pub batch: Option<Batch>,
    /// Claims attached by this write, in entry order
    pub attached: Vec<ClaimId>,
}

/// Port for claim storage
#[async_trait]
pub trait ClaimStore: DomainPort {
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Stores a new claim with its items
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError>;

    /// Unbatched claims of an insurer whose `preference` date equals `date`
    ///
    /// Ordered by priority_level ascending, total_amount descending, then id.
    async fn unbatched_claims_for_date(
        &self,
        insurer_id: InsurerId,
        preference: DatePreference,
        date: NaiveDate,
    ) -> Result<Vec<Claim>, PortError>;

    /// All unbatched claims of an insurer
    async fn unbatched_claims(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError>;

    /// Every claim of an insurer, batched or not
    async fn claims_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError>;
}

/// Port for batch storage
#[async_trait]
pub trait BatchStore: DomainPort {
    async fn get_batch(&self, id: BatchId) -> Result<Batch, PortError>;

    async fn find_batch(&self, key: BatchKey) -> Result<Option<Batch>, PortError>;

    /// The batch a claim belongs to, if any
    async fn batch_of_claim(&self, claim_id: ClaimId) -> Result<Option<BatchId>, PortError>;

    /// Claims attached across all batches of an insurer on a batch_date
    async fn attached_count(
        &self,
        insurer_id: InsurerId,
        batch_date: NaiveDate,
    ) -> Result<u32, PortError>;

    /// Attaches claims as one serialized unit, see the module docs
    async fn commit_batch(&self, write: BatchWrite) -> Result<BatchCommit, PortError>;

    /// Batches of an insurer, newest batch_date first
    async fn batches_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Batch>, PortError>;
}

/// Port for insurer policy
#[async_trait]
pub trait InsurerStore: DomainPort {
    async fn get_insurer(&self, id: InsurerId) -> Result<Insurer, PortError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Insurer>, PortError>;

    async fn list_insurers(&self) -> Result<Vec<Insurer>, PortError>;

    /// Inserts an insurer or replaces the one with the same id
    ///
    /// Runs [`Insurer::validate`] first; a policy it rejects is a
    /// `PortError::Validation` naming the field. A code taken by another
    /// insurer is a conflict.
    async fn save_insurer(&self, insurer: &Insurer) -> Result<(), PortError>;

    /// Removes an insurer that has no claims and no batches
    ///
    /// An insurer still referenced by claims or batches is a conflict.
    async fn delete_insurer(&self, id: InsurerId) -> Result<(), PortError>;
}

/// Port for providers
#[async_trait]
pub trait ProviderStore: DomainPort {
    async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError>;

    /// Returns the provider with exactly this name, creating it if needed
    async fn find_or_create_by_name(&self, name: &str) -> Result<Provider, PortError>;
}

/// Port for batch-ready notifications
///
/// Delivery is best effort; callers log failures and carry on.
#[async_trait]
pub trait NotificationSender: DomainPort {
    async fn send_batch_ready(
        &self,
        notification: &BatchNotification,
        recipient: &str,
    ) -> Result<(), PortError>;
}

/// The full set of ports the batching services are built from
#[derive(Clone)]
pub struct BatchingPorts {
    pub claims: Arc<dyn ClaimStore>,
    pub batches: Arc<dyn BatchStore>,
    pub insurers: Arc<dyn InsurerStore>,
    pub providers: Arc<dyn ProviderStore>,
    pub notifier: Arc<dyn NotificationSender>,
}

impl BatchingPorts {
    /// Wires every store port to one adapter
    pub fn from_store<S>(store: Arc<S>, notifier: Arc<dyn NotificationSender>) -> Self
    where
        S: ClaimStore + BatchStore + InsurerStore + ProviderStore,
    {
        Self {
            claims: store.clone(),
            batches: store.clone(),
            insurers: store.clone(),
            providers: store,
            notifier,
        }
    }
}

/// In-memory adapters for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use core_kernel::{AdapterHealth, Currency, HealthCheckResult, HealthCheckable};
    use tokio::sync::Mutex;

    #[derive(Debug, Default)]
    struct State {
        insurers: HashMap<InsurerId, Insurer>,
        providers: HashMap<ProviderId, Provider>,
        claims: HashMap<ClaimId, Claim>,
        batches: HashMap<BatchId, Batch>,
        batch_keys: HashMap<BatchKey, BatchId>,
        claim_batch: HashMap<ClaimId, BatchId>,
        failing_providers: HashSet<ProviderId>,
    }

    impl State {
        fn unbatched<'a>(&'a self, insurer_id: InsurerId) -> impl Iterator<Item = &'a Claim> + 'a {
            self.claims.values().filter(move |c| {
                c.insurer_id == insurer_id && !self.claim_batch.contains_key(&c.id)
            })
        }

        fn attached_count(&self, insurer_id: InsurerId, batch_date: NaiveDate) -> usize {
            self.batches
                .values()
                .filter(|b| b.insurer_id == insurer_id && b.batch_date == batch_date)
                .map(|b| b.claim_count())
                .sum()
        }
    }

    fn sort_for_batching(claims: &mut [Claim]) {
        claims.sort_by(|a, b| {
            a.priority_level
                .cmp(&b.priority_level)
                .then_with(|| b.total_amount.amount().cmp(&a.total_amount.amount()))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// One in-memory store implementing every storage port
    ///
    /// A single lock guards all state, so each `commit_batch` is serialized.
    #[derive(Debug, Default)]
    pub struct InMemoryStore {
        state: Mutex<State>,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with insurers for testing
        pub async fn with_insurers(insurers: Vec<Insurer>) -> Self {
            let store = Self::new();
            for insurer in insurers {
                store.add_insurer(insurer).await;
            }
            store
        }

        pub async fn add_insurer(&self, insurer: Insurer) {
            self.state.lock().await.insurers.insert(insurer.id, insurer);
        }

        pub async fn add_provider(&self, provider: Provider) {
            self.state.lock().await.providers.insert(provider.id, provider);
        }

        /// Makes every later batch write for this provider fail
        pub async fn fail_commits_for(&self, provider_id: ProviderId) {
            self.state.lock().await.failing_providers.insert(provider_id);
        }

        pub async fn batch_count(&self) -> usize {
            self.state.lock().await.batches.len()
        }

        /// Number of batches containing the claim
        pub async fn memberships(&self, claim_id: ClaimId) -> usize {
            self.state
                .lock()
                .await
                .batches
                .values()
                .filter(|b| b.contains(&claim_id))
                .count()
        }
    }

    impl DomainPort for InMemoryStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-batching-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ClaimStore for InMemoryStore {
        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.state
                .lock()
                .await
                .claims
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
            let mut state = self.state.lock().await;
            if state.claims.contains_key(&claim.id) {
                return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
            }
            state.claims.insert(claim.id, claim.clone());
            Ok(())
        }

        async fn unbatched_claims_for_date(
            &self,
            insurer_id: InsurerId,
            preference: DatePreference,
            date: NaiveDate,
        ) -> Result<Vec<Claim>, PortError> {
            let state = self.state.lock().await;
            let mut claims: Vec<Claim> = state
                .unbatched(insurer_id)
                .filter(|c| preference.relevant_date(c) == date)
                .cloned()
                .collect();
            sort_for_batching(&mut claims);
            Ok(claims)
        }

        async fn unbatched_claims(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError> {
            let state = self.state.lock().await;
            let mut claims: Vec<Claim> = state.unbatched(insurer_id).cloned().collect();
            claims.sort_by_key(|c| c.id);
            Ok(claims)
        }

        async fn claims_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError> {
            let state = self.state.lock().await;
            let mut claims: Vec<Claim> = state
                .claims
                .values()
                .filter(|c| c.insurer_id == insurer_id)
                .cloned()
                .collect();
            claims.sort_by_key(|c| c.id);
            Ok(claims)
        }
    }

    #[async_trait]
    impl BatchStore for InMemoryStore {
        async fn get_batch(&self, id: BatchId) -> Result<Batch, PortError> {
            self.state
                .lock()
                .await
                .batches
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Batch", id))
        }

        async fn find_batch(&self, key: BatchKey) -> Result<Option<Batch>, PortError> {
            let state = self.state.lock().await;
            Ok(state
                .batch_keys
                .get(&key)
                .and_then(|id| state.batches.get(id))
                .cloned())
        }

        async fn batch_of_claim(&self, claim_id: ClaimId) -> Result<Option<BatchId>, PortError> {
            Ok(self.state.lock().await.claim_batch.get(&claim_id).copied())
        }

        async fn attached_count(
            &self,
            insurer_id: InsurerId,
            batch_date: NaiveDate,
        ) -> Result<u32, PortError> {
            let count = self.state.lock().await.attached_count(insurer_id, batch_date);
            Ok(count as u32)
        }

        async fn commit_batch(&self, write: BatchWrite) -> Result<BatchCommit, PortError> {
            let mut state = self.state.lock().await;
            let key = write.key;

            if state.failing_providers.contains(&key.provider_id) {
                return Err(PortError::connection(format!(
                    "simulated write failure for provider {}",
                    key.provider_id
                )));
            }

            let mut entries: Vec<BatchEntry> = write
                .entries
                .into_iter()
                .filter(|e| !state.claim_batch.contains_key(&e.claim_id))
                .collect();

            if let Some(capacity) = write.limits.daily_capacity {
                let used = state.attached_count(key.insurer_id, key.batch_date);
                entries.truncate((capacity as usize).saturating_sub(used));
            }

            let existing = state.batch_keys.get(&key).copied();
            if entries.is_empty() {
                let batch = existing.and_then(|id| state.batches.get(&id)).cloned();
                return Ok(BatchCommit { batch, attached: Vec::new() });
            }

            let mut batch = match existing.and_then(|id| state.batches.get(&id)) {
                Some(batch) => batch.clone(),
                None => Batch::new(key, Currency::USD),
            };

            if let Some(max) = write.limits.max_batch_size {
                entries.truncate((max as usize).saturating_sub(batch.claim_count()));
            }

            let mut attached = Vec::with_capacity(entries.len());
            for entry in entries {
                if batch
                    .attach(entry.claim_id, entry.amount)
                    .map_err(|e| PortError::internal(e.to_string()))?
                {
                    attached.push(entry.claim_id);
                }
            }

            if attached.is_empty() {
                let batch = existing.and_then(|id| state.batches.get(&id)).cloned();
                return Ok(BatchCommit { batch, attached });
            }

            for claim_id in &attached {
                state.claim_batch.insert(*claim_id, batch.id);
            }
            state.batch_keys.insert(key, batch.id);
            state.batches.insert(batch.id, batch.clone());

            Ok(BatchCommit {
                batch: Some(batch),
                attached,
            })
        }

        async fn batches_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Batch>, PortError> {
            let state = self.state.lock().await;
            let mut batches: Vec<Batch> = state
                .batches
                .values()
                .filter(|b| b.insurer_id == insurer_id)
                .cloned()
                .collect();
            batches.sort_by(|a, b| {
                b.batch_date
                    .cmp(&a.batch_date)
                    .then_with(|| a.id.cmp(&b.id))
            });
            Ok(batches)
        }
    }

    #[async_trait]
    impl InsurerStore for InMemoryStore {
        async fn get_insurer(&self, id: InsurerId) -> Result<Insurer, PortError> {
            self.state
                .lock()
                .await
                .insurers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Insurer", id))
        }

        async fn find_by_code(&self, code: &str) -> Result<Option<Insurer>, PortError> {
            Ok(self
                .state
                .lock()
                .await
                .insurers
                .values()
                .find(|i| i.code == code)
                .cloned())
        }

        async fn list_insurers(&self) -> Result<Vec<Insurer>, PortError> {
            let mut insurers: Vec<Insurer> =
                self.state.lock().await.insurers.values().cloned().collect();
            insurers.sort_by(|a, b| a.code.cmp(&b.code));
            Ok(insurers)
        }

        async fn save_insurer(&self, insurer: &Insurer) -> Result<(), PortError> {
            insurer.validate()?;
            let mut state = self.state.lock().await;
            if state
                .insurers
                .values()
                .any(|i| i.code == insurer.code && i.id != insurer.id)
            {
                return Err(PortError::conflict(format!(
                    "insurer code {} is already taken",
                    insurer.code
                )));
            }
            state.insurers.insert(insurer.id, insurer.clone());
            Ok(())
        }

        async fn delete_insurer(&self, id: InsurerId) -> Result<(), PortError> {
            let mut state = self.state.lock().await;
            if !state.insurers.contains_key(&id) {
                return Err(PortError::not_found("Insurer", id));
            }
            let referenced = state.claims.values().any(|c| c.insurer_id == id)
                || state.batches.values().any(|b| b.insurer_id == id);
            if referenced {
                return Err(PortError::conflict(format!(
                    "insurer {} still has claims or batches",
                    id
                )));
            }
            state.insurers.remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl ProviderStore for InMemoryStore {
        async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError> {
            self.state
                .lock()
                .await
                .providers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Provider", id))
        }

        async fn find_or_create_by_name(&self, name: &str) -> Result<Provider, PortError> {
            let mut state = self.state.lock().await;
            if let Some(provider) = state.providers.values().find(|p| p.name == name) {
                return Ok(provider.clone());
            }
            let provider = Provider::new(name);
            state.providers.insert(provider.id, provider.clone());
            Ok(provider)
        }
    }

    /// Notification sender that records what it was asked to send
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<(String, BatchNotification)>>,
        failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sender whose every delivery fails
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.failing.store(true, Ordering::SeqCst);
            notifier
        }

        /// Recipient and message of every successful send
        pub async fn sent(&self) -> Vec<(String, BatchNotification)> {
            self.sent.lock().await.clone()
        }
    }

    impl DomainPort for RecordingNotifier {}

    #[async_trait]
    impl NotificationSender for RecordingNotifier {
        async fn send_batch_ready(
            &self,
            notification: &BatchNotification,
            recipient: &str,
        ) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "mail".to_string(),
                });
            }
            self.sent
                .lock()
                .await
                .push((recipient.to_string(), notification.clone()));
            Ok(())
        }
    }
}
