//! Frequent offshore transfers: a steady drip of mid-sized wires to
//! high-risk jurisdictions, a few days apart.

use super::{frequency, load_profile, merchant_category, opening_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType, HIGH_RISK_COUNTRIES},
};

pub const TRANSFER_MIN: f64 = 5_000.0;
pub const TRANSFER_MAX: f64 = 15_000.0;

pub struct FrequentOffshoreGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl FrequentOffshoreGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::Offshore),
            clock,
        }
    }
}

impl PatternGenerator for FrequentOffshoreGenerator {
    fn name(&self) -> &'static str {
        "frequent_offshore"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::FrequentOffshoreTransfers)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let label = self.label();
        let rng = &mut self.rng;

        let opening = opening_balance(&profile, (100_000.0, 300_000.0), (50_000.0, 150_000.0), rng);
        let mut ledger = Ledger::open(&profile, label, opening)?;

        let transfers = rng.int_inclusive(5, 8);
        let mut at = self.clock.anchor(rng);
        for _ in 0..transfers {
            ledger.post(Leg {
                timestamp: at,
                amount: rng.uniform(TRANSFER_MIN, TRANSFER_MAX),
                transaction_type: TransactionType::WireTransfer,
                direction: Direction::Outflow,
                merchant_category: merchant_category(&profile, rng),
                destination_country: rng.pick(HIGH_RISK_COUNTRIES).to_string(),
                frequency: frequency(4, 8, rng),
            });
            at = GenerationClock::days_after(at, 1, 3, rng);
        }

        Ok(ledger.commit(risk, false))
    }
}
