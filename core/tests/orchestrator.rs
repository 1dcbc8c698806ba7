//! Batch orchestrator, end to end against in-memory sinks.

use std::collections::{BTreeMap, BTreeSet};
use txnsynth_core::{
    config::SynthConfig,
    customer::{seeded_directory, CustomerProfile, TierAssignment},
    error::{SynthError, SynthResult},
    event::SynthEvent,
    orchestrator::{BatchOrchestrator, StopHandle},
    record::TransactionRecord,
    sink::{MemorySink, PersistenceSink},
    types::FraudPattern,
};

fn directory(count: usize) -> Vec<CustomerProfile> {
    seeded_directory(23, count, SynthConfig::default_test().reference_time())
}

fn run_memory(config: SynthConfig, customers: Vec<CustomerProfile>) -> BatchOrchestrator<MemorySink> {
    let mut orchestrator =
        BatchOrchestrator::new("orch-test".into(), config, MemorySink::new(customers)).expect("orchestrator");
    orchestrator.run().expect("run");
    orchestrator
}

fn customers_for(batch: &[TransactionRecord], pattern: FraudPattern) -> usize {
    batch
        .iter()
        .filter(|r| r.fraud_type == Some(pattern))
        .map(|r| r.customer_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

// ── Apportionment ──────────────────────────────────────────────

#[test]
fn hundred_record_batches_match_reference_apportionment() {
    let orchestrator = run_memory(SynthConfig::default_test(), directory(1_000));
    let sink = orchestrator.sink();
    let summary = orchestrator.summary();

    assert!(!sink.batches().is_empty());
    assert_eq!(summary.batches as usize, sink.batches().len());
    assert!(summary.total_records >= 500);
    assert_eq!(summary.total_records as usize, sink.record_count());

    for batch in sink.batches() {
        let legitimate = batch.iter().filter(|r| !r.is_fraud).count();
        assert_eq!(legitimate, 90);

        assert_eq!(customers_for(batch, FraudPattern::Structuring), 1);
        assert_eq!(customers_for(batch, FraudPattern::Layering), 1);
        assert_eq!(customers_for(batch, FraudPattern::LargeWireTransfer), 1);
        assert_eq!(customers_for(batch, FraudPattern::FrequentOffshoreTransfers), 2);
        assert_eq!(customers_for(batch, FraudPattern::RapidInOut), 2);
        assert_eq!(customers_for(batch, FraudPattern::InconsistentBusinessActivity), 0);

        // Every fraud instance has at least one leg, most have several.
        assert!(batch.len() > 100, "batch of {}", batch.len());
        assert!(batch.len() >= 90 + 7);
    }
}

#[test]
fn every_record_balances_and_is_labeled_consistently() {
    let orchestrator = run_memory(SynthConfig::default_test(), directory(500));
    for r in orchestrator.sink().records() {
        assert!(r.is_balanced(), "unbalanced {r:?}");
        assert!(r.is_label_consistent(), "inconsistent {r:?}");
        if let Some(pattern) = r.fraud_type {
            assert!(FraudPattern::from_label(pattern.label()).is_some());
        }
    }
}

#[test]
fn summary_counts_match_persisted_records() {
    let orchestrator = run_memory(SynthConfig::default_test(), directory(500));
    let summary = orchestrator.summary();
    let fraud = orchestrator.sink().records().filter(|r| r.is_fraud).count() as u64;

    assert_eq!(summary.fraud_records, fraud);
    assert_eq!(summary.legitimate_records + fraud, summary.total_records);
    assert_eq!(summary.records_by_pattern.values().sum::<u64>(), fraud);
    assert!(!summary.stopped);
    assert_eq!(summary.skipped_candidates, 0);
}

#[test]
fn shuffle_spreads_fraud_across_batch_positions() {
    let mut config = SynthConfig::default_test();
    config.total_records = 3_000;
    let orchestrator = run_memory(config, directory(1_000));

    let mut positions = Vec::new();
    for batch in orchestrator.sink().batches() {
        let last = (batch.len() - 1) as f64;
        positions.extend(
            batch
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_fraud)
                .map(|(i, _)| i as f64 / last),
        );
    }
    // Unshuffled, fraud would sit in the first quarter of every batch.
    let mean = positions.iter().sum::<f64>() / positions.len() as f64;
    assert!(positions.len() > 500);
    assert!((0.42..0.58).contains(&mean), "mean fraud position {mean}");

    // Fraud clustered at both ends would still pass the mean check.
    let mut quartiles = [0usize; 4];
    for p in &positions {
        quartiles[((p * 4.0) as usize).min(3)] += 1;
    }
    for (q, count) in quartiles.iter().enumerate() {
        let share = *count as f64 / positions.len() as f64;
        assert!(share > 0.19 && share < 0.31, "quartile {q} holds {share:.3} of fraud");
    }
}

#[test]
fn carried_balances_chain_in_time_order() {
    let mut config = SynthConfig::default_test();
    config.total_records = 3_000;
    let orchestrator = run_memory(config, directory(200));

    // Legitimate and rapid in-out activity carry the balance forward.
    let mut carried: BTreeMap<&str, Vec<&TransactionRecord>> = BTreeMap::new();
    for r in orchestrator.sink().records() {
        if !r.is_fraud || r.fraud_type == Some(FraudPattern::RapidInOut) {
            carried.entry(r.customer_id.as_str()).or_default().push(r);
        }
    }
    assert!(carried.values().any(|legs| legs.len() > 10));

    for (customer, legs) in carried.iter_mut() {
        legs.sort_by_key(|r| r.timestamp);
        for pair in legs.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp, "{customer}: tied timestamps");
            assert_eq!(
                pair[1].balance_before, pair[0].balance_after,
                "{customer}: {} does not continue {}",
                pair[1].transaction_id, pair[0].transaction_id
            );
        }
    }
}

#[test]
fn fraud_customers_are_reused_across_batches() {
    let mut config = SynthConfig::default_test();
    config.total_records = 2_000;
    let orchestrator = run_memory(config, directory(1_000));

    let mut per_pattern: BTreeMap<FraudPattern, BTreeSet<&str>> = BTreeMap::new();
    for r in orchestrator.sink().records() {
        if let Some(pattern) = r.fraud_type {
            per_pattern.entry(pattern).or_default().insert(r.customer_id.as_str());
        }
    }
    let batches = orchestrator.summary().batches as usize;
    // One structuring candidate per batch, and prior offenders come first.
    assert!(batches > 1);
    assert_eq!(per_pattern[&FraudPattern::Structuring].len(), 1);
    assert_eq!(per_pattern[&FraudPattern::FrequentOffshoreTransfers].len(), 2);
}

// ── Recoverable failures ───────────────────────────────────────

#[test]
fn customers_without_balance_are_skipped_not_fatal() {
    let mut customers = directory(400);
    for c in customers.iter_mut().step_by(2) {
        c.base_balance = None;
    }
    let orchestrator = run_memory(SynthConfig::default_test(), customers);
    let summary = orchestrator.summary();

    assert!(summary.skipped_candidates > 0);
    assert!(summary.total_records >= 500);
    let skipped_events = orchestrator
        .sink()
        .events()
        .iter()
        .filter(|e| matches!(e, SynthEvent::CandidateSkipped { .. }))
        .count() as u64;
    assert_eq!(skipped_events, summary.skipped_candidates);
}

/// Accepts every write but fails to log skipped candidates.
struct FailingEventLog {
    inner: MemorySink,
}

impl PersistenceSink for FailingEventLog {
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        self.inner.load_customers()
    }

    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        self.inner.update_customer_tiers(assignments)
    }

    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        self.inner.write_batch(records)
    }

    fn record_event(&mut self, run_id: &str, batch: u64, event: &SynthEvent) -> SynthResult<()> {
        if matches!(event, SynthEvent::CandidateSkipped { .. }) {
            return Err(SynthError::Other(anyhow::anyhow!("event log unavailable")));
        }
        self.inner.record_event(run_id, batch, event)
    }
}

#[test]
fn event_log_failure_does_not_lose_the_batch() {
    let mut customers = directory(400);
    for c in customers.iter_mut().step_by(2) {
        c.base_balance = None;
    }
    let sink = FailingEventLog {
        inner: MemorySink::new(customers),
    };
    let mut orchestrator =
        BatchOrchestrator::new("event-fail".into(), SynthConfig::default_test(), sink).expect("orchestrator");

    assert!(orchestrator.run().is_err());
    let summary = orchestrator.summary();
    let inner = &orchestrator.sink().inner;

    assert_eq!(inner.batches().len(), 1);
    assert!(inner.record_count() > 0);
    assert_eq!(summary.total_records as usize, inner.record_count());
    assert_eq!(summary.batches, 1);
    assert!(orchestrator.unwritten().is_none());

    // Fraud history from the batch matches what reached the sink.
    for r in inner.records().filter(|r| r.is_fraud) {
        let pattern = r.fraud_type.expect("labeled");
        assert!(orchestrator.risk().fraud_history(&r.customer_id).contains(&pattern));
    }
}

#[test]
fn empty_pools_produce_no_records_for_that_pattern() {
    // Four customers: no high tier at all.
    let mut config = SynthConfig::default_test();
    config.total_records = 20;
    let orchestrator = run_memory(config, directory(4));
    let sink = orchestrator.sink();

    assert!(sink
        .records()
        .all(|r| r.fraud_type != Some(FraudPattern::Structuring)));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        SynthEvent::PatternPoolEmpty { pattern: FraudPattern::Structuring, .. }
    )));
    assert!(orchestrator.summary().total_records >= 20);
}

#[test]
fn empty_directory_stops_without_looping() {
    let orchestrator = run_memory(SynthConfig::default_test(), Vec::new());
    assert_eq!(orchestrator.summary().total_records, 0);
    assert!(orchestrator.sink().batches().is_empty());
}

// ── Storage failures ───────────────────────────────────────────

/// Refuses the next `failures` writes, then delegates.
struct FlakySink {
    inner: MemorySink,
    failures: u32,
    attempts: u32,
}

impl FlakySink {
    fn new(customers: Vec<CustomerProfile>, failures: u32) -> Self {
        Self {
            inner: MemorySink::new(customers),
            failures,
            attempts: 0,
        }
    }
}

impl PersistenceSink for FlakySink {
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        self.inner.load_customers()
    }

    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        self.inner.update_customer_tiers(assignments)
    }

    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        self.attempts += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SynthError::Other(anyhow::anyhow!("disk unavailable")));
        }
        self.inner.write_batch(records)
    }
}

#[test]
fn transient_write_failures_are_retried() {
    let mut config = SynthConfig::default_test();
    config.total_records = 100;
    let mut orchestrator =
        BatchOrchestrator::new("flaky".into(), config, FlakySink::new(directory(300), 2)).expect("orchestrator");

    let summary = orchestrator.run().expect("run");
    assert_eq!(summary.batches, 1);
    assert_eq!(orchestrator.sink().attempts, 3);
    assert_eq!(orchestrator.sink().inner.batches().len(), 1);
}

#[test]
fn exhausted_retries_keep_the_batch_for_replay() {
    let mut config = SynthConfig::default_test();
    config.total_records = 250;
    let mut orchestrator =
        BatchOrchestrator::new("replay".into(), config, FlakySink::new(directory(300), 10)).expect("orchestrator");

    let err = orchestrator.run().expect_err("writes keep failing");
    match err {
        SynthError::BatchUnwritten { batch, attempts, .. } => {
            assert_eq!(batch, 1);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error {other}"),
    }
    let pending = orchestrator.unwritten().expect("pending batch").records.len();
    assert!(pending > 0);
    assert_eq!(orchestrator.sink().inner.record_count(), 0);

    orchestrator.sink_mut().failures = 0;
    assert_eq!(orchestrator.replay_unwritten().expect("replay"), Some(1));
    assert!(orchestrator.unwritten().is_none());
    assert_eq!(orchestrator.sink().inner.record_count(), pending);

    let summary = orchestrator.run().expect("resume");
    assert!(summary.total_records >= 250);
    assert_eq!(summary.total_records as usize, orchestrator.sink().inner.record_count());
}

#[test]
fn running_again_replays_the_unwritten_batch_and_finishes() {
    let mut config = SynthConfig::default_test();
    config.total_records = 250;
    let mut orchestrator =
        BatchOrchestrator::new("resume".into(), config, FlakySink::new(directory(300), 3)).expect("orchestrator");

    assert!(matches!(
        orchestrator.run(),
        Err(SynthError::BatchUnwritten { batch: 1, .. })
    ));
    let pending = orchestrator.unwritten().expect("pending batch").records.len();

    // The sink has recovered; a second run writes batch 1 before batch 2.
    let summary = orchestrator.run().expect("resumed run");
    assert!(orchestrator.unwritten().is_none());
    assert!(summary.total_records >= 250);
    let batches = orchestrator.sink().inner.batches();
    assert_eq!(batches[0].len(), pending);
    assert_eq!(summary.batches as usize, batches.len());
}

// ── Stop ───────────────────────────────────────────────────────

/// Requests a stop once the first batch lands.
struct StopAfterFirst {
    inner: MemorySink,
    stop: Option<StopHandle>,
}

impl PersistenceSink for StopAfterFirst {
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        self.inner.load_customers()
    }

    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        self.inner.update_customer_tiers(assignments)
    }

    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        self.inner.write_batch(records)?;
        if let Some(stop) = &self.stop {
            stop.stop();
        }
        Ok(())
    }

    fn record_event(&mut self, run_id: &str, batch: u64, event: &SynthEvent) -> SynthResult<()> {
        self.inner.record_event(run_id, batch, event)
    }
}

#[test]
fn stop_is_honored_between_batches() {
    let sink = StopAfterFirst {
        inner: MemorySink::new(directory(300)),
        stop: None,
    };
    let mut orchestrator =
        BatchOrchestrator::new("stop".into(), SynthConfig::default_test(), sink).expect("orchestrator");
    let handle = orchestrator.stop_handle();
    orchestrator.sink_mut().stop = Some(handle);

    let summary = orchestrator.run().expect("run");
    assert!(summary.stopped);
    assert_eq!(summary.batches, 1);
    assert!(summary.total_records < 500);
    assert!(orchestrator
        .sink()
        .inner
        .events()
        .iter()
        .any(|e| matches!(e, SynthEvent::RunStopped { batch: 1, .. })));
}

#[test]
fn stop_before_run_writes_nothing() {
    let mut orchestrator = BatchOrchestrator::new(
        "stop-early".into(),
        SynthConfig::default_test(),
        MemorySink::new(directory(100)),
    )
    .expect("orchestrator");
    orchestrator.stop_handle().stop();

    let summary = orchestrator.run().expect("run");
    assert!(summary.stopped);
    assert_eq!(summary.total_records, 0);
    assert!(orchestrator.sink().batches().is_empty());
}

// ── Configuration and determinism ──────────────────────────────

#[test]
fn invalid_config_is_rejected_before_generation() {
    let mut config = SynthConfig::default_test();
    config.fraud_fraction = 1.5;
    let result = BatchOrchestrator::new("bad".into(), config, MemorySink::new(directory(10)));
    assert!(matches!(
        result,
        Err(SynthError::Config { field: "fraud_fraction", .. })
    ));
}

#[test]
fn same_seed_and_directory_reproduce_the_run() {
    let customers = directory(300);
    let a = run_memory(SynthConfig::default_test(), customers.clone());
    let b = run_memory(SynthConfig::default_test(), customers.clone());

    let strip = |o: &BatchOrchestrator<MemorySink>| {
        o.sink()
            .records()
            .map(|r| {
                (
                    r.customer_id.clone(),
                    r.timestamp,
                    r.amount.to_bits(),
                    r.balance_after.to_bits(),
                    r.fraud_type,
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&a), strip(&b));

    let mut other = SynthConfig::default_test();
    other.seed = 43;
    let c = run_memory(other, customers);
    assert_ne!(strip(&a), strip(&c));
}
