//! Rapid in-out: a large deposit followed within hours by an offshore
//! transfer of nearly all of it.

use super::{frequency, load_profile, required_base_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{Direction, FraudPattern, TransactionType, HIGH_RISK_COUNTRIES, MERCHANT_CATEGORIES},
};

pub const DEPOSIT_MIN: f64 = 10_000.0;
pub const DEPOSIT_MAX: f64 = 50_000.0;
/// Share of the deposit that leaves again.
pub const OUTFLOW_SHARE_MIN: f64 = 0.90;
pub const OUTFLOW_SHARE_MAX: f64 = 0.95;

pub struct RapidInOutGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl RapidInOutGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::RapidInOut),
            clock,
        }
    }
}

impl PatternGenerator for RapidInOutGenerator {
    fn name(&self) -> &'static str {
        "rapid_in_out"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::RapidInOut)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let base_balance = required_base_balance(&profile)?;
        let label = self.label();
        let rng = &mut self.rng;

        let mut ledger = Ledger::open(&profile, label, base_balance)?;

        let deposit_at = self.clock.continue_after(profile.last_transaction_at, rng);
        let deposit = rng.uniform(DEPOSIT_MIN, DEPOSIT_MAX);
        let deposit_type = if rng.chance(0.5) {
            TransactionType::CashDeposit
        } else {
            TransactionType::WireTransfer
        };
        let merchant = rng.pick(MERCHANT_CATEGORIES).to_string();
        let freq = frequency(2, 5, rng);

        ledger.post(Leg {
            timestamp: deposit_at,
            amount: deposit,
            transaction_type: deposit_type,
            direction: Direction::Inflow,
            merchant_category: merchant.clone(),
            destination_country: profile.country.clone(),
            frequency: freq,
        });

        let share = rng.uniform(OUTFLOW_SHARE_MIN, OUTFLOW_SHARE_MAX);
        ledger.post(Leg {
            timestamp: GenerationClock::hours_after(deposit_at, 1, 12, rng),
            amount: deposit * share,
            transaction_type: TransactionType::WireTransfer,
            direction: Direction::Outflow,
            merchant_category: merchant,
            destination_country: rng.pick(HIGH_RISK_COUNTRIES).to_string(),
            frequency: freq,
        });

        Ok(ledger.commit(risk, true))
    }
}
