//! Pattern generators and the shared machinery they post records through.
//!
//! RULES:
//!   - Every generator implements PatternGenerator.
//!   - A generator reads its customer through the risk manager and writes
//!     its side effects (fraud history, last transaction, closing balance)
//!     back through it before returning. Nothing is deferred.
//!   - Records are only ever built by Ledger::post, which derives
//!     balance_after from balance_before, the amount and the direction.
//!   - Each generator owns its own RNG stream.

mod inconsistent_business;
mod large_wire;
mod layering;
mod legitimate;
mod offshore;
mod rapid_in_out;
mod structuring;

pub use inconsistent_business::InconsistentBusinessGenerator;
pub use large_wire::LargeWireGenerator;
pub use layering::LayeringGenerator;
pub use legitimate::LegitimateGenerator;
pub use offshore::FrequentOffshoreGenerator;
pub use rapid_in_out::RapidInOutGenerator;
pub use structuring::StructuringGenerator;

use crate::{
    clock::GenerationClock,
    customer::CustomerProfile,
    error::{GenResult, GeneratorError},
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng},
    types::{CustomerId, Direction, FraudPattern, TransactionType, MERCHANT_CATEGORIES},
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The contract every generator must fulfill.
pub trait PatternGenerator: Send {
    /// Stable name, used in logs and events.
    fn name(&self) -> &'static str;

    /// The label stamped on every record, or None for legitimate activity.
    fn label(&self) -> Option<FraudPattern>;

    /// Produce this pattern's records for one customer and apply its side
    /// effects to the risk manager.
    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>>;
}

/// One leg of a pattern, before balances are attached.
#[derive(Debug, Clone)]
pub struct Leg {
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub direction: Direction,
    pub merchant_category: String,
    pub destination_country: String,
    pub frequency: u32,
}

/// Running balance for one generator invocation. Each posted leg starts
/// from the previous leg's closing balance.
pub struct Ledger {
    customer_id: CustomerId,
    account_type: String,
    label: Option<FraudPattern>,
    balance: f64,
    records: Vec<TransactionRecord>,
}

impl Ledger {
    pub fn open(
        profile: &CustomerProfile,
        label: Option<FraudPattern>,
        opening_balance: f64,
    ) -> GenResult<Self> {
        if !opening_balance.is_finite() {
            return Err(GeneratorError::InvalidBalance {
                customer_id: profile.customer_id.clone(),
                balance: opening_balance,
            });
        }
        Ok(Self {
            customer_id: profile.customer_id.clone(),
            account_type: profile.account_type.clone(),
            label,
            balance: opening_balance,
            records: Vec::new(),
        })
    }

    pub fn post(&mut self, leg: Leg) -> &TransactionRecord {
        let balance_before = self.balance;
        let balance_after = leg.direction.apply(balance_before, leg.amount);
        self.balance = balance_after;
        self.records.push(TransactionRecord {
            transaction_id: format!("TXN_{}", Uuid::new_v4().simple()),
            customer_id: self.customer_id.clone(),
            timestamp: leg.timestamp,
            amount: leg.amount,
            transaction_type: leg.transaction_type,
            account_type: self.account_type.clone(),
            merchant_category: leg.merchant_category,
            destination_country: leg.destination_country,
            frequency: leg.frequency,
            balance_before,
            balance_after,
            is_fraud: self.label.is_some(),
            fraud_type: self.label,
            direction: leg.direction,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Apply side effects through the risk manager and hand back the records.
    /// `carry_balance` writes the closing balance back as the customer's
    /// base balance.
    pub fn commit(self, risk: &mut CustomerRiskManager, carry_balance: bool) -> Vec<TransactionRecord> {
        if let Some(pattern) = self.label {
            risk.record_fraud_activity(&self.customer_id, pattern);
        }
        if let Some(latest) = self.records.iter().map(|r| r.timestamp).max() {
            risk.update_last_transaction(&self.customer_id, latest);
        }
        if carry_balance {
            risk.record_closing_balance(&self.customer_id, self.balance);
        }
        self.records
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Owned copy of the customer's profile. Generators never hold a borrow
/// of the risk manager across their own mutations of it.
pub(crate) fn load_profile(risk: &CustomerRiskManager, customer_id: &str) -> GenResult<CustomerProfile> {
    risk.profile(customer_id)
        .cloned()
        .ok_or_else(|| GeneratorError::UnknownCustomer(customer_id.to_string()))
}

pub(crate) fn required_base_balance(profile: &CustomerProfile) -> GenResult<f64> {
    match profile.base_balance {
        None => Err(GeneratorError::MissingBaseBalance(profile.customer_id.clone())),
        Some(b) if !b.is_finite() => Err(GeneratorError::InvalidBalance {
            customer_id: profile.customer_id.clone(),
            balance: b,
        }),
        Some(b) => Ok(b),
    }
}

/// Opening balance drawn from the business or personal range.
pub(crate) fn opening_balance(
    profile: &CustomerProfile,
    business: (f64, f64),
    personal: (f64, f64),
    rng: &mut StreamRng,
) -> f64 {
    let (lo, hi) = if profile.is_business { business } else { personal };
    rng.uniform(lo, hi)
}

/// Business customers trade under their registered category; everyone
/// else gets a random merchant.
pub(crate) fn merchant_category(profile: &CustomerProfile, rng: &mut StreamRng) -> String {
    match (&profile.business_category, profile.is_business) {
        (Some(category), true) => category.clone(),
        _ => rng.pick(MERCHANT_CATEGORIES).to_string(),
    }
}

pub(crate) fn frequency(lo: i64, hi: i64, rng: &mut StreamRng) -> u32 {
    rng.int_inclusive(lo, hi) as u32
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// One generator per fraud pattern plus the legitimate generator.
pub struct GeneratorSet {
    fraud: BTreeMap<FraudPattern, Box<dyn PatternGenerator>>,
    legitimate: Box<dyn PatternGenerator>,
}

impl GeneratorSet {
    pub fn build(rng_bank: &RngBank, clock: &GenerationClock) -> Self {
        let generators: Vec<Box<dyn PatternGenerator>> = vec![
            Box::new(StructuringGenerator::new(rng_bank, clock.clone())),
            Box::new(LayeringGenerator::new(rng_bank, clock.clone())),
            Box::new(LargeWireGenerator::new(rng_bank, clock.clone())),
            Box::new(FrequentOffshoreGenerator::new(rng_bank, clock.clone())),
            Box::new(RapidInOutGenerator::new(rng_bank, clock.clone())),
            Box::new(InconsistentBusinessGenerator::new(rng_bank, clock.clone())),
        ];
        let fraud = generators
            .into_iter()
            .filter_map(|g| g.label().map(|p| (p, g)))
            .collect();
        Self {
            fraud,
            legitimate: Box::new(LegitimateGenerator::new(rng_bank, clock.clone())),
        }
    }

    pub fn fraud(&mut self, pattern: FraudPattern) -> Option<&mut (dyn PatternGenerator + 'static)> {
        self.fraud.get_mut(&pattern).map(|g| g.as_mut())
    }

    pub fn legitimate(&mut self) -> &mut (dyn PatternGenerator + 'static) {
        self.legitimate.as_mut()
    }
}
