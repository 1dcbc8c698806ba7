use super::{parse_timestamp, unknown_value, SynthStore};
use crate::{
    customer::{CustomerProfile, TierAssignment},
    error::SynthResult,
    types::RiskTier,
};
use rusqlite::params;
use std::collections::BTreeSet;

impl SynthStore {
    // ── Customer ──────────────────────────────────────────────────

    /// Insert a directory in one transaction. Tier and score are written
    /// as given; seeded directories leave both NULL.
    pub fn insert_customers(&mut self, customers: &[CustomerProfile]) -> SynthResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO customer (
                    customer_id, account_number, name, address, city, country,
                    account_type, is_business, business_category, created_at,
                    risk_level, risk_score, opening_balance
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for c in customers {
                stmt.execute(params![
                    &c.customer_id,
                    &c.account_number,
                    &c.name,
                    &c.address,
                    &c.city,
                    &c.country,
                    &c.account_type,
                    if c.is_business { 1 } else { 0 },
                    &c.business_category,
                    c.created_at.to_rfc3339(),
                    c.risk_tier.map(|t| t.as_str()),
                    c.risk_tier.map(|_| c.risk_score),
                    c.base_balance,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every customer ordered by id. Fraud history and last-transaction
    /// time are run state and always start empty.
    pub fn all_customers(&self) -> SynthResult<Vec<CustomerProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, account_number, name, address, city, country,
                    account_type, is_business, business_category, created_at,
                    risk_level, risk_score, opening_balance
             FROM customer ORDER BY customer_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let created_raw: String = row.get(9)?;
            let risk_tier = match row.get::<_, Option<String>>(10)? {
                Some(raw) => Some(RiskTier::parse(&raw).ok_or_else(|| unknown_value(10, &raw))?),
                None => None,
            };
            Ok(CustomerProfile {
                customer_id: row.get(0)?,
                account_number: row.get(1)?,
                name: row.get(2)?,
                address: row.get(3)?,
                city: row.get(4)?,
                country: row.get(5)?,
                account_type: row.get(6)?,
                is_business: row.get::<_, i32>(7)? != 0,
                business_category: row.get(8)?,
                created_at: parse_timestamp(9, &created_raw)?,
                risk_tier,
                risk_score: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
                fraud_history: BTreeSet::new(),
                base_balance: row.get(12)?,
                last_transaction_at: None,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Bulk tier/score update in one transaction.
    pub fn apply_tier_assignments(&mut self, assignments: &[TierAssignment]) -> SynthResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE customer SET risk_level = ?1, risk_score = ?2 WHERE customer_id = ?3",
            )?;
            for a in assignments {
                stmt.execute(params![a.tier.as_str(), a.risk_score, &a.customer_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn customer_count(&self) -> SynthResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Customers per persisted tier. Untiered customers are not counted.
    pub fn tier_count(&self, tier: RiskTier) -> SynthResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM customer WHERE risk_level = ?1",
            params![tier.as_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
