//! Customer risk manager. The authoritative, in-process view of every
//! customer's risk tier, fraud history and balance for one run.
//!
//! RULES:
//!   - Profiles are owned here. Callers get shared references only;
//!     every mutation goes through one of the methods below.
//!   - Tiers are assigned once. A customer that arrives tiered keeps its tier.
//!   - Fraud history only grows.
//!   - Unknown customer ids never fail: lookups return None or empty,
//!     mutations are no-ops.

use crate::{
    config::{SynthConfig, TierSplit},
    customer::{CustomerProfile, TierAssignment},
    error::{SynthError, SynthResult},
    rng::{RngBank, StreamRng, StreamSlot},
    sink::PersistenceSink,
    types::{CustomerId, FraudPattern, RiskTier},
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Weight of a high-tier customer when sampling the Rapid In-Out pool.
const RAPID_HIGH_WEIGHT: f64 = 0.7;
/// Weight of a medium-tier customer when sampling the Rapid In-Out pool.
const RAPID_MEDIUM_WEIGHT: f64 = 0.3;

/// Outcome of initialize(), for logging and the run summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub customers: usize,
    pub newly_tiered: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub struct CustomerRiskManager {
    tier_split: TierSplit,
    tiering_rng: StreamRng,
    candidate_rng: StreamRng,
    profiles: BTreeMap<CustomerId, CustomerProfile>,
    tiers: BTreeMap<RiskTier, BTreeSet<CustomerId>>,
    /// pattern -> customers that have exhibited it. Mirrors each
    /// profile's fraud_history so candidate lookup avoids a full scan.
    pattern_index: BTreeMap<FraudPattern, BTreeSet<CustomerId>>,
    initialized: bool,
}

impl CustomerRiskManager {
    pub fn new(config: &SynthConfig, rng_bank: &RngBank) -> Self {
        Self {
            tier_split: config.tier_split.clone(),
            tiering_rng: rng_bank.for_stream(StreamSlot::Tiering),
            candidate_rng: rng_bank.for_stream(StreamSlot::Candidates),
            profiles: BTreeMap::new(),
            tiers: RiskTier::ALL.iter().map(|t| (*t, BTreeSet::new())).collect(),
            pattern_index: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Load the directory, tier any untiered customers by
    /// shuffle-then-quota, write those assignments back once, and build
    /// the in-memory profile map.
    pub fn initialize<S: PersistenceSink + ?Sized>(&mut self, sink: &mut S) -> SynthResult<InitReport> {
        let customers = sink.load_customers()?;

        let mut untiered: Vec<CustomerId> = customers
            .iter()
            .filter(|c| c.risk_tier.is_none())
            .map(|c| c.customer_id.clone())
            .collect();
        untiered.sort();
        untiered.dedup();

        let assignments = self.partition(untiered);
        if !assignments.is_empty() {
            sink.update_customer_tiers(&assignments)?;
        }
        let assigned: BTreeMap<&str, &TierAssignment> = assignments
            .iter()
            .map(|a| (a.customer_id.as_str(), a))
            .collect();

        self.profiles.clear();
        self.pattern_index.clear();
        for members in self.tiers.values_mut() {
            members.clear();
        }

        for mut profile in customers {
            if let Some(a) = assigned.get(profile.customer_id.as_str()) {
                profile.risk_tier = Some(a.tier);
                profile.risk_score = a.risk_score;
            }
            let tier = profile.risk_tier.unwrap_or(RiskTier::Low);
            profile.risk_tier = Some(tier);

            // A reloaded directory may already carry history; keep the
            // index in step with it.
            for pattern in &profile.fraud_history {
                self.pattern_index
                    .entry(*pattern)
                    .or_default()
                    .insert(profile.customer_id.clone());
            }

            // Duplicate ids keep the last row; drop the earlier tier entry.
            if let Some(previous) = self.profiles.get(&profile.customer_id) {
                if let Some(old_tier) = previous.risk_tier {
                    self.tier_members_mut(old_tier).remove(&profile.customer_id);
                }
            }
            self.tier_members_mut(tier).insert(profile.customer_id.clone());
            self.profiles.insert(profile.customer_id.clone(), profile);
        }

        self.initialized = true;
        let report = InitReport {
            customers: self.profiles.len(),
            newly_tiered: assignments.len(),
            high: self.tier_size(RiskTier::High),
            medium: self.tier_size(RiskTier::Medium),
            low: self.tier_size(RiskTier::Low),
        };
        log::info!(
            "risk: loaded {} customers ({} newly tiered) high={} medium={} low={}",
            report.customers,
            report.newly_tiered,
            report.high,
            report.medium,
            report.low
        );
        Ok(report)
    }

    /// Shuffle, then cut into high / medium / low by the configured quota.
    fn partition(&mut self, mut ids: Vec<CustomerId>) -> Vec<TierAssignment> {
        self.tiering_rng.shuffle(&mut ids);
        let n = ids.len();
        let high_count = (n as f64 * self.tier_split.high) as usize;
        let medium_count = ((n as f64 * self.tier_split.medium) as usize).min(n - high_count);

        ids.into_iter()
            .enumerate()
            .map(|(i, customer_id)| {
                let tier = if i < high_count {
                    RiskTier::High
                } else if i < high_count + medium_count {
                    RiskTier::Medium
                } else {
                    RiskTier::Low
                };
                TierAssignment {
                    customer_id,
                    tier,
                    risk_score: tier.default_score(),
                }
            })
            .collect()
    }

    fn tier_members_mut(&mut self, tier: RiskTier) -> &mut BTreeSet<CustomerId> {
        self.tiers.entry(tier).or_default()
    }

    fn tier_members(&self, tier: RiskTier) -> impl Iterator<Item = &CustomerId> {
        self.tiers.get(&tier).into_iter().flatten()
    }

    // ── Candidate selection ─────────────────────────────────────────────────

    /// Up to `count` distinct customers for `pattern`. Customers that have
    /// already exhibited the pattern come first; the rest are drawn from
    /// the pattern's eligible pool. A short pool yields a short list.
    pub fn get_fraud_candidates(
        &mut self,
        pattern: FraudPattern,
        count: usize,
    ) -> SynthResult<Vec<CustomerId>> {
        self.ensure_initialized()?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let existing: Vec<CustomerId> = self
            .pattern_index
            .get(&pattern)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();

        if existing.len() >= count {
            return Ok(self.candidate_rng.sample(&existing, count));
        }

        let needed = count - existing.len();
        let already: BTreeSet<&CustomerId> = existing.iter().collect();
        let pool: Vec<CustomerId> = self
            .eligible_pool(pattern)
            .into_iter()
            .filter(|id| !already.contains(&id))
            .collect();

        let fresh = if pattern == FraudPattern::RapidInOut {
            let high = &self.tiers[&RiskTier::High];
            self.candidate_rng.weighted_sample(&pool, needed, |id| {
                if high.contains(id) {
                    RAPID_HIGH_WEIGHT
                } else {
                    RAPID_MEDIUM_WEIGHT
                }
            })
        } else {
            self.candidate_rng.sample(&pool, needed)
        };

        let mut candidates = existing;
        candidates.extend(fresh);
        Ok(candidates)
    }

    /// Tiers a pattern may recruit new customers from.
    fn eligible_pool(&self, pattern: FraudPattern) -> Vec<CustomerId> {
        let tiers: &[RiskTier] = match pattern {
            FraudPattern::Structuring
            | FraudPattern::LargeWireTransfer
            | FraudPattern::Layering => &[RiskTier::High],
            FraudPattern::FrequentOffshoreTransfers
            | FraudPattern::InconsistentBusinessActivity
            | FraudPattern::RapidInOut => &[RiskTier::High, RiskTier::Medium],
        };
        tiers
            .iter()
            .flat_map(|t| self.tier_members(*t))
            .cloned()
            .collect()
    }

    /// Up to `count` customers for legitimate activity, from low and
    /// medium tiers, topped up from high only when those run short.
    pub fn get_legitimate_customers(&mut self, count: usize) -> SynthResult<Vec<CustomerId>> {
        self.ensure_initialized()?;
        let mut pool: Vec<CustomerId> = self
            .tier_members(RiskTier::Low)
            .chain(self.tier_members(RiskTier::Medium))
            .cloned()
            .collect();
        if pool.len() < count {
            pool.extend(self.tier_members(RiskTier::High).cloned());
        }
        Ok(self.candidate_rng.sample(&pool, count))
    }

    // ── Controlled mutation ─────────────────────────────────────────────────

    /// Idempotent. Returns true when the pattern is new for this customer.
    pub fn record_fraud_activity(&mut self, customer_id: &str, pattern: FraudPattern) -> bool {
        let Some(profile) = self.profiles.get_mut(customer_id) else {
            return false;
        };
        let added = profile.fraud_history.insert(pattern);
        if added {
            self.pattern_index
                .entry(pattern)
                .or_default()
                .insert(customer_id.to_string());
        }
        added
    }

    /// Record activity at `timestamp`. The stored time never moves backwards.
    pub fn update_last_transaction(&mut self, customer_id: &str, timestamp: DateTime<Utc>) {
        if let Some(profile) = self.profiles.get_mut(customer_id) {
            profile.last_transaction_at = profile.last_transaction_at.max(Some(timestamp));
        }
    }

    /// Carry a generator's closing balance forward as the customer's base
    /// balance. Non-finite balances are ignored.
    pub fn record_closing_balance(&mut self, customer_id: &str, balance: f64) {
        if !balance.is_finite() {
            return;
        }
        if let Some(profile) = self.profiles.get_mut(customer_id) {
            profile.base_balance = Some(balance);
        }
    }

    // ── Read access ─────────────────────────────────────────────────────────

    pub fn profile(&self, customer_id: &str) -> Option<&CustomerProfile> {
        self.profiles.get(customer_id)
    }

    pub fn tier_of(&self, customer_id: &str) -> Option<RiskTier> {
        self.profiles.get(customer_id).and_then(|p| p.risk_tier)
    }

    pub fn fraud_history(&self, customer_id: &str) -> BTreeSet<FraudPattern> {
        self.profiles
            .get(customer_id)
            .map(|p| p.fraud_history.clone())
            .unwrap_or_default()
    }

    pub fn tier_size(&self, tier: RiskTier) -> usize {
        self.tiers.get(&tier).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn tier_counts(&self) -> BTreeMap<RiskTier, usize> {
        RiskTier::ALL.iter().map(|t| (*t, self.tier_size(*t))).collect()
    }

    pub fn tier_ids(&self, tier: RiskTier) -> Vec<CustomerId> {
        self.tier_members(tier).cloned().collect()
    }

    pub fn customer_count(&self) -> usize {
        self.profiles.len()
    }

    /// Number of customers that have exhibited `pattern` so far.
    pub fn pattern_customers(&self, pattern: FraudPattern) -> usize {
        self.pattern_index.get(&pattern).map(BTreeSet::len).unwrap_or(0)
    }

    fn ensure_initialized(&self) -> SynthResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(SynthError::NotInitialized)
        }
    }
}
