//! Run events. Emitted by the orchestrator and appended to the event log
//! so a run's progress can be audited after the fact.

use crate::types::{FraudPattern, RunId};
use serde::{Deserialize, Serialize};

/// Variants are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthEvent {
    RunStarted {
        run_id: RunId,
        seed: u64,
        customers: usize,
        target_records: u64,
    },
    BatchPersisted {
        batch: u64,
        records: usize,
        fraud_records: usize,
        total_records: u64,
    },
    CandidateSkipped {
        batch: u64,
        customer_id: String,
        generator: String,
        reason: String,
    },
    PatternPoolEmpty {
        batch: u64,
        pattern: FraudPattern,
        requested: usize,
    },
    RunStopped {
        batch: u64,
        total_records: u64,
    },
    RunCompleted {
        batches: u64,
        total_records: u64,
    },
}

impl SynthEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::BatchPersisted { .. } => "batch_persisted",
            Self::CandidateSkipped { .. } => "candidate_skipped",
            Self::PatternPoolEmpty { .. } => "pattern_pool_empty",
            Self::RunStopped { .. } => "run_stopped",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub batch: u64,
    pub event_type: String,
    pub payload: String, // JSON-serialized SynthEvent
}
