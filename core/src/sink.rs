//! Persistence contract between the generator and whatever stores its output.
//!
//! RULE: The risk manager and orchestrator only ever talk to storage
//! through this trait. SynthStore (SQLite) is the production sink;
//! MemorySink backs tests and dry runs.

use crate::{
    customer::{CustomerProfile, TierAssignment},
    error::SynthResult,
    event::SynthEvent,
    record::TransactionRecord,
};
use std::collections::HashMap;

pub trait PersistenceSink {
    /// Every customer in the directory, in a stable order.
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>>;

    /// Bulk tier/score update keyed by customer id. Called once per run,
    /// during initialization, and only with customers that had no tier.
    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()>;

    /// Insert one batch as a single committed unit, preserving order.
    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()>;

    /// Register a run before any of its events are recorded.
    fn begin_run(&mut self, _run_id: &str, _seed: u64) -> SynthResult<()> {
        Ok(())
    }

    /// Append a run event. Sinks without an event log drop it.
    fn record_event(&mut self, _run_id: &str, _batch: u64, _event: &SynthEvent) -> SynthResult<()> {
        Ok(())
    }
}

/// Sink that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    customers: Vec<CustomerProfile>,
    batches: Vec<Vec<TransactionRecord>>,
    events: Vec<SynthEvent>,
    tier_updates: usize,
}

impl MemorySink {
    pub fn new(customers: Vec<CustomerProfile>) -> Self {
        Self {
            customers,
            ..Self::default()
        }
    }

    pub fn customers(&self) -> &[CustomerProfile] {
        &self.customers
    }

    pub fn batches(&self) -> &[Vec<TransactionRecord>] {
        &self.batches
    }

    pub fn records(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.batches.iter().flatten()
    }

    pub fn record_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn events(&self) -> &[SynthEvent] {
        &self.events
    }

    /// Number of times update_customer_tiers was called.
    pub fn tier_update_calls(&self) -> usize {
        self.tier_updates
    }
}

impl PersistenceSink for MemorySink {
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        Ok(self.customers.clone())
    }

    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        self.tier_updates += 1;
        let by_id: HashMap<&str, &TierAssignment> = assignments
            .iter()
            .map(|a| (a.customer_id.as_str(), a))
            .collect();
        for c in &mut self.customers {
            if let Some(a) = by_id.get(c.customer_id.as_str()) {
                c.risk_tier = Some(a.tier);
                c.risk_score = a.risk_score;
            }
        }
        Ok(())
    }

    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        self.batches.push(records.to_vec());
        Ok(())
    }

    fn record_event(&mut self, _run_id: &str, _batch: u64, event: &SynthEvent) -> SynthResult<()> {
        self.events.push(event.clone());
        Ok(())
    }
}
