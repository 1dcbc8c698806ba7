use super::{parse_timestamp, unknown_value, SynthStore};
use crate::{
    error::SynthResult,
    record::TransactionRecord,
    types::{FraudPattern, TransactionType},
};
use rusqlite::params;

/// One row of the end-of-run fraud distribution report.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudShare {
    pub pattern: FraudPattern,
    pub records: i64,
    pub unique_customers: i64,
    /// Share of all fraud records, in percent.
    pub percentage: f64,
}

impl SynthStore {
    // ── Transactions ──────────────────────────────────────────────

    /// Insert a batch in order, in one transaction. Either every record
    /// lands or none do.
    pub fn insert_transactions(&mut self, records: &[TransactionRecord]) -> SynthResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transaction_record (
                    transaction_id, customer_id, transaction_date, transaction_amount,
                    transaction_type, account_type, merchant_category, destination_country,
                    transaction_frequency, account_balance_before, account_balance_after,
                    is_fraud, fraud_type
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for r in records {
                stmt.execute(params![
                    &r.transaction_id,
                    &r.customer_id,
                    r.timestamp.to_rfc3339(),
                    r.amount,
                    r.transaction_type.as_str(),
                    &r.account_type,
                    &r.merchant_category,
                    &r.destination_country,
                    r.frequency as i64,
                    r.balance_before,
                    r.balance_after,
                    if r.is_fraud { 1 } else { 0 },
                    r.fraud_type.map(|p| p.label()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn transaction_count(&self) -> SynthResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM transaction_record", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn fraud_transaction_count(&self) -> SynthResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM transaction_record WHERE is_fraud = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Every persisted record in insertion order. Direction is recovered
    /// from the balance delta.
    pub fn all_transactions(&self) -> SynthResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT transaction_id, customer_id, transaction_date, transaction_amount,
                    transaction_type, account_type, merchant_category, destination_country,
                    transaction_frequency, account_balance_before, account_balance_after,
                    is_fraud, fraud_type
             FROM transaction_record ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let date_raw: String = row.get(2)?;
            let type_raw: String = row.get(4)?;
            let transaction_type =
                TransactionType::parse(&type_raw).ok_or_else(|| unknown_value(4, &type_raw))?;
            let fraud_type = match row.get::<_, Option<String>>(12)? {
                Some(raw) => Some(FraudPattern::from_label(&raw).ok_or_else(|| unknown_value(12, &raw))?),
                None => None,
            };
            let balance_before: f64 = row.get(9)?;
            let balance_after: f64 = row.get(10)?;
            Ok(TransactionRecord {
                transaction_id: row.get(0)?,
                customer_id: row.get(1)?,
                timestamp: parse_timestamp(2, &date_raw)?,
                amount: row.get(3)?,
                transaction_type,
                account_type: row.get(5)?,
                merchant_category: row.get(6)?,
                destination_country: row.get(7)?,
                frequency: row.get::<_, i64>(8)? as u32,
                balance_before,
                balance_after,
                is_fraud: row.get::<_, i32>(11)? != 0,
                fraud_type,
                direction: TransactionRecord::direction_from_balances(balance_before, balance_after),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Fraud records per pattern with distinct customers and share of all
    /// fraud, largest first.
    pub fn fraud_distribution(&self) -> SynthResult<Vec<FraudShare>> {
        let total = self.fraud_transaction_count()?;
        let mut stmt = self.conn.prepare(
            "SELECT fraud_type, COUNT(*), COUNT(DISTINCT customer_id)
             FROM transaction_record
             WHERE is_fraud = 1
             GROUP BY fraud_type
             ORDER BY COUNT(*) DESC, fraud_type ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let raw: String = row.get(0)?;
            let pattern = FraudPattern::from_label(&raw).ok_or_else(|| unknown_value(0, &raw))?;
            let records: i64 = row.get(1)?;
            Ok(FraudShare {
                pattern,
                records,
                unique_customers: row.get(2)?,
                percentage: if total > 0 {
                    records as f64 * 100.0 / total as f64
                } else {
                    0.0
                },
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
