//! Structuring: a run of cash deposits each kept just under the $10,000
//! reporting threshold.

use super::{frequency, load_profile, merchant_category, opening_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType},
};

pub const DEPOSIT_MIN: f64 = 9_000.0;
pub const DEPOSIT_MAX: f64 = 9_999.0;
pub const MIN_DEPOSITS: i64 = 3;
pub const MAX_DEPOSITS: i64 = 5;

pub struct StructuringGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl StructuringGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::Structuring),
            clock,
        }
    }
}

impl PatternGenerator for StructuringGenerator {
    fn name(&self) -> &'static str {
        "structuring"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::Structuring)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let label = self.label();
        let rng = &mut self.rng;

        let opening = opening_balance(&profile, (50_000.0, 200_000.0), (10_000.0, 50_000.0), rng);
        let mut ledger = Ledger::open(&profile, label, opening)?;

        let deposits = rng.int_inclusive(MIN_DEPOSITS, MAX_DEPOSITS);
        let mut at = self.clock.anchor(rng);
        for _ in 0..deposits {
            at = GenerationClock::hours_after(at, 1, 72, rng);
            ledger.post(Leg {
                timestamp: at,
                amount: rng.uniform(DEPOSIT_MIN, DEPOSIT_MAX),
                transaction_type: TransactionType::CashDeposit,
                direction: Direction::Inflow,
                merchant_category: merchant_category(&profile, rng),
                destination_country: profile.country.clone(),
                frequency: frequency(1, 5, rng),
            });
        }

        Ok(ledger.commit(risk, false))
    }
}
