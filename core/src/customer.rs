//! Customer profiles and synthetic directory seeding.

use crate::{
    name_generator::NameGenerator,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{
        CustomerId, FraudPattern, RiskTier, ACCOUNT_TYPES, BUSINESS_CATEGORIES,
        DIRECTORY_HIGH_RISK_COUNTRIES, DIRECTORY_LOW_RISK_COUNTRIES,
    },
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A customer as held by the risk manager for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub account_number: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub account_type: String,
    pub is_business: bool,
    pub business_category: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` until the risk manager tiers the customer.
    pub risk_tier: Option<RiskTier>,
    pub risk_score: f64,
    pub fraud_history: BTreeSet<FraudPattern>,
    /// Opening balance. Balance-dependent generators refuse a profile
    /// without one.
    pub base_balance: Option<f64>,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// A tier/score pair written back to the directory once, at initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct TierAssignment {
    pub customer_id: CustomerId,
    pub tier: RiskTier,
    pub risk_score: f64,
}

/// Builds an untiered synthetic customer directory.
pub struct DirectorySeeder<'a> {
    rng: &'a mut StreamRng,
    now: DateTime<Utc>,
}

impl<'a> DirectorySeeder<'a> {
    pub fn new(rng: &'a mut StreamRng, now: DateTime<Utc>) -> Self {
        Self { rng, now }
    }

    pub fn generate(&mut self, count: usize) -> Vec<CustomerProfile> {
        (0..count).map(|_| self.customer()).collect()
    }

    fn customer(&mut self) -> CustomerProfile {
        let rng = &mut *self.rng;
        let account_type = rng.pick(ACCOUNT_TYPES).to_string();
        let is_business = account_type == "Business";
        let business_category = is_business.then(|| rng.pick(BUSINESS_CATEGORIES).to_string());

        let name = match &business_category {
            Some(category) => NameGenerator::business_name(category, rng),
            None => NameGenerator::full_name(rng),
        };

        let high = DIRECTORY_HIGH_RISK_COUNTRIES.len() as u64;
        let roll = rng.next_u64_below(high + DIRECTORY_LOW_RISK_COUNTRIES.len() as u64);
        let country = if roll < high {
            DIRECTORY_HIGH_RISK_COUNTRIES[roll as usize]
        } else {
            DIRECTORY_LOW_RISK_COUNTRIES[(roll - high) as usize]
        };

        // Accounts opened within the last two years.
        let age_minutes = rng.int_inclusive(0, 2 * 365 * 24 * 60);

        CustomerProfile {
            customer_id: Uuid::new_v4().to_string(),
            account_number: rng.int_inclusive(1_000_000_000, 9_999_999_999).to_string(),
            name,
            address: NameGenerator::street_address(rng),
            city: NameGenerator::city(rng).to_string(),
            country: country.to_string(),
            account_type,
            is_business,
            business_category,
            created_at: self.now - Duration::minutes(age_minutes),
            risk_tier: None,
            risk_score: 0.0,
            fraud_history: BTreeSet::new(),
            base_balance: Some(round_cents(rng.uniform(10_000.0, 200_000.0))),
            last_transaction_at: None,
        }
    }
}

/// A directory of `count` customers drawn from the directory stream of `seed`.
pub fn seeded_directory(seed: u64, count: usize, now: DateTime<Utc>) -> Vec<CustomerProfile> {
    let mut rng = RngBank::new(seed).for_stream(StreamSlot::Directory);
    DirectorySeeder::new(&mut rng, now).generate(count)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_directory_is_untiered_and_consistent() {
        let mut rng = RngBank::new(9).for_stream(StreamSlot::Directory);
        let customers = DirectorySeeder::new(&mut rng, Utc::now()).generate(200);

        assert_eq!(customers.len(), 200);
        for c in &customers {
            assert!(c.risk_tier.is_none());
            assert!(c.fraud_history.is_empty());
            assert_eq!(c.account_number.len(), 10);
            assert_eq!(c.is_business, c.account_type == "Business");
            assert_eq!(c.is_business, c.business_category.is_some());
            let balance = c.base_balance.unwrap_or_default();
            assert!((10_000.0..=200_000.0).contains(&balance), "{balance}");
        }
    }
}
