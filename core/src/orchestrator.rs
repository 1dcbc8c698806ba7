//! The batch orchestrator. Drives a run to its target record count.
//!
//! PER BATCH (fixed order, never reordered):
//!   1. Plan: split the batch into fraud slots per pattern and
//!      legitimate slots.
//!   2. For each fraud pattern, fetch candidates from the risk manager
//!      and call that pattern's generator once per candidate.
//!   3. Fetch legitimate candidates and call the legitimate generator.
//!   4. Shuffle the whole batch uniformly.
//!   5. Persist it as one unit, retrying with backoff.
//!   6. Advance the running total and emit progress.
//!
//! RULES:
//!   - Single-threaded. Each generator call sees every earlier call's
//!     effect on the risk manager.
//!   - A failing candidate is skipped and logged; it never aborts a batch.
//!   - The stop handle is checked between batches, never within one.
//!   - Events raised while a batch is built are held with the batch and
//!     only reach the sink after its records are written.

use crate::{
    clock::GenerationClock,
    config::{PatternWeights, SynthConfig},
    error::{GeneratorError, SynthError, SynthResult},
    event::SynthEvent,
    generator::{GeneratorSet, PatternGenerator},
    record::TransactionRecord,
    risk_manager::{CustomerRiskManager, InitReport},
    rng::{RngBank, StreamRng, StreamSlot},
    sink::PersistenceSink,
    types::{CustomerId, FraudPattern, RunId},
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// How one batch's slots are split across generators.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    /// (pattern, candidate count). Patterns that floor to zero are omitted.
    pub fraud: Vec<(FraudPattern, usize)>,
    pub legitimate: usize,
}

impl BatchPlan {
    pub fn for_batch(batch_size: usize, fraud_fraction: f64, weights: &PatternWeights) -> Self {
        let fraud_count = (batch_size as f64 * fraud_fraction) as usize;
        let fraud = weights
            .iter()
            .map(|(pattern, w)| (pattern, (fraud_count as f64 * w) as usize))
            .filter(|(_, count)| *count > 0)
            .collect();
        Self {
            fraud,
            legitimate: batch_size - fraud_count.min(batch_size),
        }
    }

    pub fn fraud_slots(&self) -> usize {
        self.fraud.iter().map(|(_, n)| n).sum()
    }

    pub fn slots_for(&self, pattern: FraudPattern) -> usize {
        self.fraud
            .iter()
            .find(|(p, _)| *p == pattern)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Cooperative stop signal. Cloneable; any clone can request a stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A generated batch on its way to the sink. Kept for replay when the
/// sink refuses it.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub batch: u64,
    pub records: Vec<TransactionRecord>,
    /// Skip and empty-pool events for this batch.
    pub events: Vec<SynthEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub batches: u64,
    pub total_records: u64,
    pub fraud_records: u64,
    pub legitimate_records: u64,
    pub skipped_candidates: u64,
    pub records_by_pattern: BTreeMap<FraudPattern, u64>,
    pub stopped: bool,
}

/// A candidate whose generator call failed.
struct Skipped {
    customer_id: CustomerId,
    generator: &'static str,
    error: GeneratorError,
}

pub struct BatchOrchestrator<S: PersistenceSink> {
    pub run_id: RunId,
    config: SynthConfig,
    risk: CustomerRiskManager,
    generators: GeneratorSet,
    shuffle_rng: StreamRng,
    sink: S,
    stop: StopHandle,
    unwritten: Option<PendingBatch>,
    deferred: Vec<SynthEvent>,
    batch_no: u64,
    summary: RunSummary,
}

impl<S: PersistenceSink> BatchOrchestrator<S> {
    /// Validates the configuration before anything else happens.
    pub fn new(run_id: RunId, config: SynthConfig, sink: S) -> SynthResult<Self> {
        config.validate()?;
        let rng_bank = RngBank::new(config.seed);
        let clock = GenerationClock::new(config.reference_time(), config.history_days);
        Ok(Self {
            run_id,
            risk: CustomerRiskManager::new(&config, &rng_bank),
            generators: GeneratorSet::build(&rng_bank, &clock),
            shuffle_rng: rng_bank.for_stream(StreamSlot::Shuffle),
            config,
            sink,
            stop: StopHandle::default(),
            unwritten: None,
            deferred: Vec::new(),
            batch_no: 0,
            summary: RunSummary::default(),
        })
    }

    /// Load and tier the customer directory, and register the run.
    pub fn initialize(&mut self) -> SynthResult<InitReport> {
        let report = self.risk.initialize(&mut self.sink)?;
        self.sink.begin_run(&self.run_id, self.config.seed)?;
        self.emit(SynthEvent::RunStarted {
            run_id: self.run_id.clone(),
            seed: self.config.seed,
            customers: report.customers,
            target_records: self.config.total_records,
        })?;
        Ok(report)
    }

    /// Generate and persist batches until the target is reached or a stop
    /// is requested. An unwritten batch from an earlier failure is
    /// replayed first.
    pub fn run(&mut self) -> SynthResult<RunSummary> {
        if !self.risk.is_initialized() {
            self.initialize()?;
        }
        self.replay_unwritten()?;

        let target = self.config.total_records;
        while self.summary.total_records < target {
            if self.stop.is_stopped() {
                log::info!(
                    "run {}: stop requested after batch {} ({} records)",
                    self.run_id,
                    self.batch_no,
                    self.summary.total_records
                );
                self.summary.stopped = true;
                self.emit(SynthEvent::RunStopped {
                    batch: self.batch_no,
                    total_records: self.summary.total_records,
                })?;
                return Ok(self.summary.clone());
            }

            let batch = self.batch_no + 1;
            let records = self.generate_batch(batch)?;
            let events = std::mem::take(&mut self.deferred);
            if records.is_empty() {
                log::warn!("run {}: batch {batch} produced no records, stopping", self.run_id);
                for event in events {
                    self.emit(event)?;
                }
                break;
            }
            self.persist(PendingBatch {
                batch,
                records,
                events,
            })?;

            if self.summary.total_records < target && self.config.inter_batch_delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.config.inter_batch_delay_ms));
            }
        }

        self.emit(SynthEvent::RunCompleted {
            batches: self.summary.batches,
            total_records: self.summary.total_records,
        })?;
        log::info!(
            "run {}: completed {} batches, {} records ({} fraud)",
            self.run_id,
            self.summary.batches,
            self.summary.total_records,
            self.summary.fraud_records
        );
        Ok(self.summary.clone())
    }

    /// Build one shuffled batch. Storage is not touched; the batch's
    /// events are held until it is persisted.
    pub fn generate_batch(&mut self, batch: u64) -> SynthResult<Vec<TransactionRecord>> {
        self.deferred.clear();
        let plan = BatchPlan::for_batch(
            self.config.batch_size,
            self.config.fraud_fraction,
            &self.config.pattern_weights,
        );
        log::debug!(
            "batch {batch}: plan fraud={:?} legitimate={}",
            plan.fraud,
            plan.legitimate
        );

        let mut records = Vec::with_capacity(self.config.batch_size * 2);
        let mut skipped = Vec::new();
        let mut empty_pools = Vec::new();

        for (pattern, count) in &plan.fraud {
            let candidates = self.risk.get_fraud_candidates(*pattern, *count)?;
            if candidates.is_empty() {
                empty_pools.push((*pattern, *count));
                continue;
            }
            let Some(generator) = self.generators.fraud(*pattern) else {
                continue;
            };
            run_candidates(generator, &candidates, &mut self.risk, &mut records, &mut skipped);
        }

        let legitimate = self.risk.get_legitimate_customers(plan.legitimate)?;
        run_candidates(
            self.generators.legitimate(),
            &legitimate,
            &mut self.risk,
            &mut records,
            &mut skipped,
        );

        for (pattern, requested) in empty_pools {
            log::debug!("batch {batch}: no candidates for {pattern}");
            self.deferred.push(SynthEvent::PatternPoolEmpty {
                batch,
                pattern,
                requested,
            });
        }
        for s in skipped {
            log::warn!(
                "batch {batch}: skipped {} for {}: {}",
                s.customer_id,
                s.generator,
                s.error
            );
            self.summary.skipped_candidates += 1;
            self.deferred.push(SynthEvent::CandidateSkipped {
                batch,
                customer_id: s.customer_id,
                generator: s.generator.to_string(),
                reason: s.error.to_string(),
            });
        }

        self.shuffle_rng.shuffle(&mut records);
        Ok(records)
    }

    /// Write a batch, retrying with backoff. After the last attempt the
    /// batch is kept for replay and the run fails.
    fn persist(&mut self, pending: PendingBatch) -> SynthResult<()> {
        let batch = pending.batch;
        let policy = self.config.retry.clone();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.write_batch(&pending.records) {
                Ok(()) => break,
                Err(e) if attempt < policy.max_attempts => {
                    let wait = policy.backoff_ms(attempt);
                    log::warn!(
                        "batch {batch}: write attempt {attempt}/{} failed: {e}; retrying in {wait}ms",
                        policy.max_attempts
                    );
                    if wait > 0 {
                        thread::sleep(Duration::from_millis(wait));
                    }
                }
                Err(e) => {
                    log::error!(
                        "batch {batch}: giving up after {attempt} attempts, {} records unwritten",
                        pending.records.len()
                    );
                    self.unwritten = Some(pending);
                    return Err(SynthError::BatchUnwritten {
                        batch,
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }

        let PendingBatch {
            records, events, ..
        } = pending;
        let fraud = records.iter().filter(|r| r.is_fraud).count();
        for pattern in records.iter().filter_map(|r| r.fraud_type) {
            *self.summary.records_by_pattern.entry(pattern).or_insert(0) += 1;
        }
        self.summary.batches += 1;
        self.summary.total_records += records.len() as u64;
        self.summary.fraud_records += fraud as u64;
        self.summary.legitimate_records += (records.len() - fraud) as u64;
        self.batch_no = batch;

        log::info!(
            "Batch {batch} completed. {} records ({fraud} fraud). Total records: {}/{}",
            records.len(),
            self.summary.total_records,
            self.config.total_records
        );
        for event in events {
            self.emit(event)?;
        }
        self.emit(SynthEvent::BatchPersisted {
            batch,
            records: records.len(),
            fraud_records: fraud,
            total_records: self.summary.total_records,
        })
    }

    /// Retry the batch left behind by a storage failure, if any.
    /// Returns the batch number that was written.
    pub fn replay_unwritten(&mut self) -> SynthResult<Option<u64>> {
        match self.unwritten.take() {
            Some(pending) => {
                log::info!(
                    "run {}: replaying unwritten batch {} ({} records)",
                    self.run_id,
                    pending.batch,
                    pending.records.len()
                );
                self.persist(pending)?;
                Ok(Some(self.batch_no))
            }
            None => Ok(None),
        }
    }

    fn emit(&mut self, event: SynthEvent) -> SynthResult<()> {
        self.sink.record_event(&self.run_id, self.batch_no, &event)
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn risk(&self) -> &CustomerRiskManager {
        &self.risk
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn unwritten(&self) -> Option<&PendingBatch> {
        self.unwritten.as_ref()
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Call `generator` once per candidate, collecting records and failures.
fn run_candidates(
    generator: &mut dyn PatternGenerator,
    candidates: &[CustomerId],
    risk: &mut CustomerRiskManager,
    records: &mut Vec<TransactionRecord>,
    skipped: &mut Vec<Skipped>,
) {
    for customer_id in candidates {
        match generator.generate(customer_id, risk) {
            Ok(generated) => records.extend(generated),
            Err(error) => skipped.push(Skipped {
                customer_id: customer_id.clone(),
                generator: generator.name(),
                error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_plan_for_a_hundred_records() {
        let plan = BatchPlan::for_batch(100, 0.10, &PatternWeights::default());
        assert_eq!(plan.slots_for(FraudPattern::Structuring), 1);
        assert_eq!(plan.slots_for(FraudPattern::Layering), 1);
        assert_eq!(plan.slots_for(FraudPattern::LargeWireTransfer), 1);
        assert_eq!(plan.slots_for(FraudPattern::FrequentOffshoreTransfers), 2);
        assert_eq!(plan.slots_for(FraudPattern::RapidInOut), 2);
        assert_eq!(plan.slots_for(FraudPattern::InconsistentBusinessActivity), 0);
        assert_eq!(plan.fraud_slots(), 7);
        assert_eq!(plan.legitimate, 90);
    }

    #[test]
    fn reference_plan_for_a_full_batch() {
        let plan = BatchPlan::for_batch(10_000, 0.10, &PatternWeights::default());
        assert_eq!(plan.slots_for(FraudPattern::Structuring), 150);
        assert_eq!(plan.slots_for(FraudPattern::RapidInOut), 200);
        assert_eq!(plan.legitimate, 9_000);
    }

    #[test]
    fn tiny_batches_floor_fraud_to_zero() {
        let plan = BatchPlan::for_batch(5, 0.10, &PatternWeights::default());
        assert!(plan.fraud.is_empty());
        assert_eq!(plan.legitimate, 5);
    }

    #[test]
    fn all_fraud_batch_has_no_legitimate_slots() {
        let plan = BatchPlan::for_batch(100, 1.0, &PatternWeights::default());
        assert_eq!(plan.legitimate, 0);
        assert_eq!(plan.slots_for(FraudPattern::FrequentOffshoreTransfers), 20);
    }

    #[test]
    fn backoff_grows_geometrically() {
        let policy = crate::config::RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.backoff_ms(1), 100);
        assert_eq!(policy.backoff_ms(2), 200);
        assert_eq!(policy.backoff_ms(3), 400);
    }
}
