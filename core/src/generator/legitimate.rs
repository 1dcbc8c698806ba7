//! Legitimate activity: a single benign transaction. One parameterized
//! generator covers every transaction type.

use super::{frequency, load_profile, merchant_category, required_base_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    customer::round_cents,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType},
};

pub struct LegitimateGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl LegitimateGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::Legitimate),
            clock,
        }
    }
}

/// Benign amount for a transaction type, rounded to cents.
pub fn benign_amount(transaction_type: TransactionType, rng: &mut StreamRng) -> f64 {
    let (lo, hi) = transaction_type.benign_range();
    let amount = round_cents(rng.uniform(lo, hi));
    if amount >= hi {
        round_cents(hi - 0.01)
    } else {
        amount
    }
}

impl PatternGenerator for LegitimateGenerator {
    fn name(&self) -> &'static str {
        "legitimate"
    }

    fn label(&self) -> Option<FraudPattern> {
        None
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let base_balance = required_base_balance(&profile)?;
        let rng = &mut self.rng;

        let mut ledger = Ledger::open(&profile, None, base_balance)?;

        let transaction_type = *rng.pick(&TransactionType::ALL);
        ledger.post(Leg {
            timestamp: self.clock.continue_after(profile.last_transaction_at, rng),
            amount: benign_amount(transaction_type, rng),
            transaction_type,
            direction: Direction::Inflow,
            merchant_category: merchant_category(&profile, rng),
            destination_country: profile.country.clone(),
            frequency: frequency(1, 10, rng),
        });

        Ok(ledger.commit(risk, true))
    }
}
