//! Large wire transfer: one outsized transfer to a high-risk jurisdiction.

use super::{frequency, load_profile, merchant_category, opening_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType, HIGH_RISK_COUNTRIES},
};

pub const WIRE_MIN: f64 = 50_000.0;
pub const WIRE_MAX: f64 = 1_000_000.0;

pub struct LargeWireGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl LargeWireGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::LargeWire),
            clock,
        }
    }
}

impl PatternGenerator for LargeWireGenerator {
    fn name(&self) -> &'static str {
        "large_wire"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::LargeWireTransfer)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let label = self.label();
        let rng = &mut self.rng;

        let opening = opening_balance(&profile, (500_000.0, 1_000_000.0), (200_000.0, 500_000.0), rng);
        let mut ledger = Ledger::open(&profile, label, opening)?;

        let at = self.clock.anchor(rng);
        ledger.post(Leg {
            timestamp: at,
            amount: rng.uniform(WIRE_MIN, WIRE_MAX),
            transaction_type: TransactionType::WireTransfer,
            direction: Direction::Outflow,
            merchant_category: merchant_category(&profile, rng),
            destination_country: rng.pick(HIGH_RISK_COUNTRIES).to_string(),
            frequency: frequency(1, 3, rng),
        });

        Ok(ledger.commit(risk, false))
    }
}
