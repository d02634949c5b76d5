//! Batching orchestration tests against the in-memory store
//!
//! - `optimizer_scenarios` - grouping, capacity, size ceilings, failures
//! - `assignment` - per-claim entry point, fallback, notifications
//! - `intake` - submissions end to end
//! - `concurrency` - concurrent optimizer runs keep the invariants

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::ProviderId;
use domain_batching::{
    AssignmentOutcome, BatchOptimizer, BatchStore, BatchingError, BatchingPorts, ClaimAssigner,
    ClaimIntake, ClaimStore, InMemoryStore, RecordingNotifier,
};
use domain_claims::{Claim, Insurer};
use test_utils::{
    assert_batch_sizes_within_max, assert_capacity_respected, assert_single_membership,
    assert_unique_batch_keys, random_provider, ClaimBuilder, DateFixtures, InsurerBuilder,
    InsurerFixtures, SubmissionBuilder,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct Harness {
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    ports: BatchingPorts,
}

impl Harness {
    async fn new(insurers: Vec<Insurer>) -> Self {
        Self::with_notifier(insurers, RecordingNotifier::new()).await
    }

    async fn with_notifier(insurers: Vec<Insurer>, notifier: RecordingNotifier) -> Self {
        let store = Arc::new(InMemoryStore::with_insurers(insurers).await);
        let notifier = Arc::new(notifier);
        let ports = BatchingPorts::from_store(store.clone(), notifier.clone());
        Self {
            store,
            notifier,
            ports,
        }
    }

    fn optimizer(&self) -> BatchOptimizer {
        BatchOptimizer::new(self.ports.claims.clone(), self.ports.batches.clone())
    }

    fn assigner(&self) -> ClaimAssigner {
        ClaimAssigner::new(self.ports.clone())
    }

    async fn insert(&self, claims: &[Claim]) {
        for claim in claims {
            self.store.insert_claim(claim).await.unwrap();
        }
    }
}

// ============================================================================
// OPTIMIZER SCENARIOS
// ============================================================================

mod optimizer_scenarios {
    use super::*;

    #[tokio::test]
    async fn test_twenty_claims_fill_one_batch_and_leave_five() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let provider = ProviderId::new_v7();
        let mut claims = ClaimBuilder::new(&insurer)
            .with_provider(provider)
            .with_priority(5)
            .build_many(15);
        claims.extend(
            ClaimBuilder::new(&insurer)
                .with_provider(provider)
                .with_priority(1)
                .build_many(5),
        );
        h.insert(&claims).await;

        let result = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();

        assert_eq!(result.batches.len(), 1);
        let batch = &result.batches[0];
        assert_eq!(batch.claim_count(), 15);
        assert_eq!(batch.batch_date, DateFixtures::mid_month_batch_date());
        assert!(claims
            .iter()
            .filter(|c| c.priority_level == 1)
            .all(|c| batch.contains(&c.id)));

        let left = h.store.unbatched_claims(insurer.id).await.unwrap();
        assert_eq!(left.len(), 5);
        assert!(left.iter().all(|c| c.priority_level == 5));
        assert!(result.optimization_notes[0].starts_with("Created 1 batches with a total of 15 claims, cost: $"));
    }

    #[tokio::test]
    async fn test_single_provider_is_capped_by_batch_size_not_capacity() {
        // one batch per (insurer, provider, batch_date), so 60 claims from one
        // provider fill a single batch of max_batch_size and never reach capacity
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claims = ClaimBuilder::new(&insurer)
            .with_provider(ProviderId::new_v7())
            .build_many(60);
        h.insert(&claims).await;

        let result = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();

        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.claim_count(), 15);
        assert_eq!(h.store.unbatched_claims(insurer.id).await.unwrap().len(), 45);
        let batches = h.store.batches_for_insurer(insurer.id).await.unwrap();
        assert_batch_sizes_within_max(&batches, &insurer);
        assert_unique_batch_keys(&batches);
    }

    // Capacity only binds once several providers share the batch_date
    #[tokio::test]
    async fn test_daily_capacity_caps_sixty_claims_at_fifty() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        for _ in 0..4 {
            let claims = ClaimBuilder::new(&insurer)
                .with_provider(ProviderId::new_v7())
                .build_many(15);
            h.insert(&claims).await;
        }

        let result = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();

        assert_eq!(result.claim_count(), 50);
        assert_eq!(result.batches.len(), 4);
        assert_eq!(
            h.store
                .attached_count(insurer.id, DateFixtures::mid_month_batch_date())
                .await
                .unwrap(),
            50
        );
        assert_eq!(h.store.unbatched_claims(insurer.id).await.unwrap().len(), 10);

        let batches = h.store.batches_for_insurer(insurer.id).await.unwrap();
        assert_capacity_respected(&batches, &insurer);
        assert_batch_sizes_within_max(&batches, &insurer);
        assert_single_membership(&batches);

        let again = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();
        assert!(again.batches.is_empty());
        assert!(again
            .optimization_notes
            .iter()
            .all(|n| n == "Daily capacity exceeded for 2025-06-15"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_other_groups() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let healthy = ProviderId::new_v7();
        let broken = ProviderId::new_v7();
        h.insert(&ClaimBuilder::new(&insurer).with_provider(broken).build_many(5))
            .await;
        h.insert(&ClaimBuilder::new(&insurer).with_provider(healthy).build_many(5))
            .await;
        h.store.fail_commits_for(broken).await;

        let result = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();

        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].provider_id, healthy);
        assert!(result
            .optimization_notes
            .iter()
            .any(|n| n.starts_with("Failed to create batch for 2025-06-15")));

        let left = h.store.unbatched_claims(insurer.id).await.unwrap();
        assert_eq!(left.len(), 5);
        assert!(left.iter().all(|c| c.provider_id == broken));
    }

    #[tokio::test]
    async fn test_batched_claims_leave_the_candidate_set() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        h.insert(&ClaimBuilder::new(&insurer).build_many(4)).await;

        h.optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();

        let candidates = h
            .store
            .unbatched_claims_for_date(insurer.id, insurer.date_preference, DateFixtures::mid_month())
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_submission_date_insurer_groups_by_submission() {
        let insurer = InsurerBuilder::based_on(InsurerFixtures::insurer_b())
            .with_batch_sizes(1, 25)
            .build();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claim = ClaimBuilder::new(&insurer)
            .with_encounter_date(DateFixtures::month_start())
            .with_submission_date(DateFixtures::mid_month())
            .build();
        h.insert(std::slice::from_ref(&claim)).await;

        let by_encounter = h
            .optimizer()
            .optimize(&insurer, DateFixtures::month_start())
            .await
            .unwrap();
        assert_eq!(by_encounter.optimization_notes, vec!["No claims to batch".to_string()]);

        let by_submission = h
            .optimizer()
            .optimize(&insurer, DateFixtures::mid_month())
            .await
            .unwrap();
        assert_eq!(by_submission.batches.len(), 1);
        assert_eq!(by_submission.batches[0].batch_date, DateFixtures::mid_month_batch_date());
    }
}

// ============================================================================
// ASSIGNMENT
// ============================================================================

mod assignment {
    use super::*;

    #[tokio::test]
    async fn test_single_claim_is_batched_alone() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claim = ClaimBuilder::new(&insurer).build();
        h.insert(std::slice::from_ref(&claim)).await;

        let outcome = h.assigner().assign(&claim).await;

        let AssignmentOutcome::Optimized { result } = outcome else {
            panic!("expected an optimized outcome, got {:?}", outcome);
        };
        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].claim_ids, vec![claim.id]);
        assert_eq!(result.batches[0].total_cost.amount(), dec!(1000));
        assert_eq!(result.total_cost, dec!(211.38));
    }

    #[tokio::test]
    async fn test_sequential_claims_grow_the_same_batch() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let provider = ProviderId::new_v7();
        let claims = ClaimBuilder::new(&insurer).with_provider(provider).build_many(4);

        for claim in &claims {
            h.insert(std::slice::from_ref(claim)).await;
            h.assigner().assign(claim).await;
        }

        let batches = h.store.batches_for_insurer(insurer.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].claim_count(), 4);
        assert_eq!(batches[0].total_cost.amount(), dec!(4000));
    }

    #[tokio::test]
    async fn test_assignment_is_idempotent() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claim = ClaimBuilder::new(&insurer).build();
        h.insert(std::slice::from_ref(&claim)).await;

        let first = h.assigner().assign(&claim).await;
        let second = h.assigner().assign(&claim).await;

        let batch_id = first.batches()[0].id;
        assert_eq!(second, AssignmentOutcome::AlreadyBatched { batch_id });
        assert_eq!(h.store.memberships(claim.id).await, 1);
        assert_eq!(h.store.batch_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_insurer_is_reported() {
        let h = Harness::new(Vec::new()).await;
        let claim = ClaimBuilder::new(&InsurerFixtures::fresh_insurer_a()).build();
        h.insert(std::slice::from_ref(&claim)).await;

        assert_eq!(h.assigner().assign(&claim).await, AssignmentOutcome::MissingInsurer);
        assert_eq!(h.store.batch_count().await, 0);
    }

    #[tokio::test]
    async fn test_fallback_when_capacity_is_spent() {
        let insurer = InsurerBuilder::based_on(InsurerFixtures::insurer_a())
            .with_daily_capacity(0)
            .build();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claim = ClaimBuilder::new(&insurer).build();
        h.insert(std::slice::from_ref(&claim)).await;

        let outcome = h.assigner().assign(&claim).await;

        let AssignmentOutcome::Fallback { batch } = outcome else {
            panic!("expected a fallback outcome, got {:?}", outcome);
        };
        assert_eq!(batch.claim_ids, vec![claim.id]);
        assert_eq!(batch.total_cost.amount(), dec!(1000));
        assert_eq!(h.notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_notification_names_provider_and_recipient() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::new(vec![insurer.clone()]).await;
        let provider = random_provider();
        h.store.add_provider(provider.clone()).await;
        let claim = ClaimBuilder::new(&insurer).with_provider(provider.id).build();
        h.insert(std::slice::from_ref(&claim)).await;

        h.assigner().assign(&claim).await;

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        let (recipient, notification) = &sent[0];
        assert_eq!(recipient, "insurer.a@example.com");
        assert_eq!(notification.provider_name, provider.name);
        assert_eq!(notification.claim_count, 1);
        assert!(notification.body.contains("Batch Date: Jun 15, 2025"));
    }

    #[tokio::test]
    async fn test_no_email_means_no_notification() {
        let insurer = InsurerBuilder::based_on(InsurerFixtures::insurer_a())
            .with_email(None)
            .build();
        let h = Harness::new(vec![insurer.clone()]).await;
        let claim = ClaimBuilder::new(&insurer).build();
        h.insert(std::slice::from_ref(&claim)).await;

        let outcome = h.assigner().assign(&claim).await;

        assert_eq!(outcome.batches().len(), 1);
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_the_batch() {
        let insurer = InsurerFixtures::fresh_insurer_a();
        let h = Harness::with_notifier(vec![insurer.clone()], RecordingNotifier::failing()).await;
        let claim = ClaimBuilder::new(&insurer).build();
        h.insert(std::slice::from_ref(&claim)).await;

        let outcome = h.assigner().assign(&claim).await;

        assert!(matches!(outcome, AssignmentOutcome::Optimized { .. }));
        assert_eq!(h.store.batch_of_claim(claim.id).await.unwrap(), Some(outcome.batches()[0].id));
    }
}

// ============================================================================
// INTAKE
// ============================================================================

mod intake {
    use super::*;

    #[tokio::test]
    async fn test_submission_is_stored_priced_and_batched() {
        let h = Harness::new(InsurerFixtures::seeded()).await;
        let intake = ClaimIntake::new(h.ports.clone());

        let receipt = intake
            .submit(SubmissionBuilder::new("INS-A").build())
            .await
            .unwrap();

        assert_eq!(receipt.claim.total_amount.amount(), dec!(300));
        assert_eq!(receipt.claim.items[0].subtotal.amount(), dec!(300));
        assert_eq!(receipt.assignment.batches().len(), 1);
        assert!(h.store.get_claim(receipt.claim.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_provider_is_reused_by_name() {
        let h = Harness::new(InsurerFixtures::seeded()).await;
        let intake = ClaimIntake::new(h.ports.clone());

        let first = intake
            .submit(SubmissionBuilder::new("INS-C").with_provider_name("North Clinic").build())
            .await
            .unwrap();
        let second = intake
            .submit(SubmissionBuilder::new("INS-C").with_provider_name("  North Clinic ").build())
            .await
            .unwrap();

        assert_eq!(first.claim.provider_id, second.claim.provider_id);
        assert_eq!(second.assignment.batches()[0].claim_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_insurer_code_is_rejected() {
        let h = Harness::new(InsurerFixtures::seeded()).await;
        let intake = ClaimIntake::new(h.ports.clone());

        let err = intake
            .submit(SubmissionBuilder::new("INS-Z").build())
            .await
            .unwrap_err();

        assert!(matches!(err, BatchingError::InsurerNotFound(ref code) if code == "INS-Z"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_submission_stores_nothing() {
        let h = Harness::new(InsurerFixtures::seeded()).await;
        let intake = ClaimIntake::new(h.ports.clone());

        let err = intake
            .submit(SubmissionBuilder::new("INS-A").with_priority(0).build())
            .await
            .unwrap_err();

        assert!(matches!(err, BatchingError::Claim(_)));
        let insurer = InsurerFixtures::insurer_a();
        assert!(h.store.claims_for_insurer(insurer.id).await.unwrap().is_empty());
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_respect_capacity_and_membership() {
        let insurer = InsurerBuilder::based_on(InsurerFixtures::insurer_a())
            .with_daily_capacity(20)
            .build();
        let h = Harness::new(vec![insurer.clone()]).await;
        for _ in 0..3 {
            h.insert(
                &ClaimBuilder::new(&insurer)
                    .with_provider(ProviderId::new_v7())
                    .build_many(10),
            )
            .await;
        }

        let runs: Vec<_> = (0..8)
            .map(|_| {
                let optimizer = h.optimizer();
                let insurer = insurer.clone();
                tokio::spawn(async move {
                    optimizer
                        .optimize(&insurer, DateFixtures::mid_month())
                        .await
                })
            })
            .collect();
        for run in runs {
            run.await.unwrap().unwrap();
        }

        let batches = h.store.batches_for_insurer(insurer.id).await.unwrap();
        let attached: usize = batches.iter().map(|b| b.claim_count()).sum();
        assert!(attached > 0 && attached <= 20);
        assert_capacity_respected(&batches, &insurer);
        assert_batch_sizes_within_max(&batches, &insurer);
        assert_single_membership(&batches);
        assert_unique_batch_keys(&batches);
    }
}
