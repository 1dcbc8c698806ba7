//! The transaction record as produced by generators and persisted by sinks.

use crate::types::{CustomerId, Direction, FraudPattern, TransactionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BALANCE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub customer_id: CustomerId,
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub account_type: String,
    pub merchant_category: String,
    pub destination_country: String,
    pub frequency: u32,
    pub balance_before: f64,
    pub balance_after: f64,
    pub is_fraud: bool,
    pub fraud_type: Option<FraudPattern>,
    /// Not persisted; recoverable from the sign of the balance delta.
    pub direction: Direction,
}

impl TransactionRecord {
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            Direction::Inflow => self.amount,
            Direction::Outflow => -self.amount,
        }
    }

    /// balance_after == balance_before + signed amount.
    pub fn is_balanced(&self) -> bool {
        (self.balance_before + self.signed_amount() - self.balance_after).abs() <= BALANCE_TOLERANCE
    }

    /// The label is present exactly when the fraud flag is set.
    pub fn is_label_consistent(&self) -> bool {
        self.is_fraud == self.fraud_type.is_some()
    }

    /// Direction implied by persisted balances. Used when reading records back.
    pub fn direction_from_balances(balance_before: f64, balance_after: f64) -> Direction {
        if balance_after >= balance_before {
            Direction::Inflow
        } else {
            Direction::Outflow
        }
    }
}
