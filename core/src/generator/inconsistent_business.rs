//! Inconsistent business activity: card spend in lines of trade the
//! customer is not registered for.

use super::{frequency, load_profile, opening_balance, Leg, Ledger, PatternGenerator};
use crate::{
    clock::GenerationClock,
    error::GenResult,
    record::TransactionRecord,
    risk_manager::CustomerRiskManager,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{
        Direction, FraudPattern, TransactionType, BUSINESS_CATEGORIES, HIGH_RISK_COUNTRIES,
        MERCHANT_CATEGORIES,
    },
};

pub const PAYMENT_MIN: f64 = 2_000.0;
pub const PAYMENT_MAX: f64 = 20_000.0;

pub struct InconsistentBusinessGenerator {
    rng: StreamRng,
    clock: GenerationClock,
}

impl InconsistentBusinessGenerator {
    pub fn new(rng_bank: &RngBank, clock: GenerationClock) -> Self {
        Self {
            rng: rng_bank.for_stream(StreamSlot::InconsistentBusiness),
            clock,
        }
    }
}

/// Every category other than the one the customer registered under.
fn foreign_categories(registered: Option<&str>) -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = MERCHANT_CATEGORIES
        .iter()
        .chain(BUSINESS_CATEGORIES)
        .copied()
        .filter(|c| Some(*c) != registered)
        .collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}

impl PatternGenerator for InconsistentBusinessGenerator {
    fn name(&self) -> &'static str {
        "inconsistent_business"
    }

    fn label(&self) -> Option<FraudPattern> {
        Some(FraudPattern::InconsistentBusinessActivity)
    }

    fn generate(
        &mut self,
        customer_id: &str,
        risk: &mut CustomerRiskManager,
    ) -> GenResult<Vec<TransactionRecord>> {
        let profile = load_profile(risk, customer_id)?;
        let label = self.label();
        let rng = &mut self.rng;

        let opening = opening_balance(&profile, (50_000.0, 200_000.0), (20_000.0, 80_000.0), rng);
        let mut ledger = Ledger::open(&profile, label, opening)?;

        let categories = foreign_categories(profile.business_category.as_deref());
        let payments = rng.int_inclusive(3, 6);
        let mut at = self.clock.anchor(rng);
        for _ in 0..payments {
            let destination = if rng.chance(0.3) {
                rng.pick(HIGH_RISK_COUNTRIES).to_string()
            } else {
                profile.country.clone()
            };
            ledger.post(Leg {
                timestamp: at,
                amount: rng.uniform(PAYMENT_MIN, PAYMENT_MAX),
                transaction_type: TransactionType::CardPayment,
                direction: Direction::Outflow,
                merchant_category: rng.pick(&categories).to_string(),
                destination_country: destination,
                frequency: frequency(3, 7, rng),
            });
            at = GenerationClock::hours_after(at, 6, 36, rng);
        }

        Ok(ledger.commit(risk, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_category_is_excluded() {
        let categories = foreign_categories(Some("Casino"));
        assert!(!categories.contains(&"Casino"));
        assert!(categories.contains(&"Retail"));
    }

    #[test]
    fn shared_categories_appear_once() {
        let categories = foreign_categories(None);
        let retail = categories.iter().filter(|c| **c == "Retail").count();
        assert_eq!(retail, 1);
    }
}
