//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The risk manager and orchestrator reach it through PersistenceSink;
//! they never execute SQL directly.

use crate::{
    customer::{CustomerProfile, TierAssignment},
    error::SynthResult,
    event::{EventLogEntry, SynthEvent},
    record::TransactionRecord,
    sink::PersistenceSink,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection};

mod customer;
mod transaction;

pub use transaction::FraudShare;

pub struct SynthStore {
    conn: Connection,
}

impl SynthStore {
    pub fn open(path: &str) -> SynthResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SynthResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run twice.
    pub fn migrate(&self) -> SynthResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_customers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_transactions.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SynthResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, batch, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.batch as i64, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> SynthResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, batch, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    batch: row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> SynthResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

impl PersistenceSink for SynthStore {
    fn load_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        self.all_customers()
    }

    fn update_customer_tiers(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        self.apply_tier_assignments(assignments)
    }

    fn write_batch(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        self.insert_transactions(records)
    }

    fn begin_run(&mut self, run_id: &str, seed: u64) -> SynthResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, env!("CARGO_PKG_VERSION"), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn record_event(&mut self, run_id: &str, batch: u64, event: &SynthEvent) -> SynthResult<()> {
        self.append_event(&EventLogEntry {
            id: None,
            run_id: run_id.to_string(),
            batch,
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}

/// Parse an RFC 3339 column, reporting failures as a conversion error on
/// that column.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Conversion failure for a text column holding an unknown enum value.
pub(crate) fn unknown_value(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unrecognized value '{raw}'").into(),
    )
}
