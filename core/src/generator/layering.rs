//! Layering: funds bounced in and out through alternating wire transfers
//! to blur their origin.

use super::{frequency, load_profile, opening_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType, COUNTRIES, HIGH_RISK_COUNTRIES},
};

pub const TRANSFER_MIN: f64 = 20_000.0;
pub const TRANSFER_MAX: f64 = 45_000.0;

pub struct LayeringGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl LayeringGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::Layering),
            clock,
        }
    }
}

impl PatternGenerator for LayeringGenerator {
    fn name(&self) -> &'static str {
        "layering"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::Layering)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let label = self.label();
        let rng = &mut self.rng;

        let opening = opening_balance(&profile, (200_000.0, 500_000.0), (100_000.0, 300_000.0), rng);
        let mut ledger = Ledger::open(&profile, label, opening)?;

        let transfers = rng.int_inclusive(4, 8);
        let mut at = self.clock.anchor(rng);
        for i in 0..transfers {
            // Even legs bring money in, odd legs push it offshore.
            let (direction, countries) = if i % 2 == 0 {
                (Direction::Inflow, COUNTRIES)
            } else {
                (Direction::Outflow, HIGH_RISK_COUNTRIES)
            };
            let merchant = if rng.chance(0.7) { "Crypto Exchange" } else { "Financial Services" };
            ledger.post(Leg {
                timestamp: at,
                amount: rng.uniform(TRANSFER_MIN, TRANSFER_MAX),
                transaction_type: TransactionType::WireTransfer,
                direction,
                merchant_category: merchant.to_string(),
                destination_country: rng.pick(countries).to_string(),
                frequency: frequency(5, 10, rng),
            });
            at = GenerationClock::hours_after(at, 2, 8, rng);
        }

        Ok(ledger.commit(risk, false))
    }
}
