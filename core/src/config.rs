//! Run configuration. Loaded once at process start and passed explicitly
//! into every component. Nothing reads configuration from globals.

use crate::{
    clock::DEFAULT_HISTORY_DAYS,
    error::{SynthError, SynthResult},
    types::FraudPattern,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database path. Required.
    #[serde(default)]
    pub db_path: String,
}

/// Share of each fraud pattern within a batch's fraud slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternWeights {
    pub structuring: f64,
    pub layering: f64,
    pub large_wire: f64,
    pub frequent_offshore: f64,
    pub rapid_in_out: f64,
    #[serde(default)]
    pub inconsistent_business: f64,
}

impl Default for PatternWeights {
    fn default() -> Self {
        Self {
            structuring: 0.15,
            layering: 0.15,
            large_wire: 0.15,
            frequent_offshore: 0.20,
            rapid_in_out: 0.20,
            inconsistent_business: 0.0,
        }
    }
}

impl PatternWeights {
    pub fn weight(&self, pattern: FraudPattern) -> f64 {
        match pattern {
            FraudPattern::Structuring => self.structuring,
            FraudPattern::Layering => self.layering,
            FraudPattern::LargeWireTransfer => self.large_wire,
            FraudPattern::FrequentOffshoreTransfers => self.frequent_offshore,
            FraudPattern::RapidInOut => self.rapid_in_out,
            FraudPattern::InconsistentBusinessActivity => self.inconsistent_business,
        }
    }

    /// (pattern, weight) in fixed apportionment order.
    pub fn iter(&self) -> impl Iterator<Item = (FraudPattern, f64)> + '_ {
        FraudPattern::ALL.iter().map(move |p| (*p, self.weight(*p)))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, w)| w).sum()
    }
}

/// Population split used when tiering customers that arrive untiered.
/// Low takes whatever high and medium leave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierSplit {
    pub high: f64,
    pub medium: f64,
}

impl Default for TierSplit {
    fn default() -> Self {
        Self { high: 0.20, medium: 0.30 }
    }
}

/// Bounded retry with exponential backoff for sink writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based, counting the retry).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        (self.initial_backoff_ms as f64 * factor) as u64
    }
}

fn default_seed() -> u64 { 42 }
fn default_batch_size() -> usize { 10_000 }
fn default_fraud_fraction() -> f64 { 0.10 }
fn default_history_days() -> i64 { DEFAULT_HISTORY_DAYS }
fn default_delay_ms() -> u64 { 1_000 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Target record count. Required, no default.
    #[serde(default)]
    pub total_records: u64,
    #[serde(default = "default_fraud_fraction")]
    pub fraud_fraction: f64,
    #[serde(default)]
    pub pattern_weights: PatternWeights,
    #[serde(default)]
    pub tier_split: TierSplit,
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    #[serde(default = "default_delay_ms")]
    pub inter_batch_delay_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Pins "now" for reproducible timestamps. Wall clock when absent.
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
}

impl SynthConfig {
    /// Load from a JSON file and validate.
    /// In tests, use SynthConfig::default_test().
    pub fn load(path: &str) -> SynthResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> SynthResult<Self> {
        let config = Self::parse_unvalidated(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating, for callers that apply overrides first.
    /// Required fields left out of the JSON stay empty until `validate`
    /// rejects them.
    pub fn parse_unvalidated(json: &str) -> SynthResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject anything that would make the run meaningless before a single
    /// record is generated.
    pub fn validate(&self) -> SynthResult<()> {
        if self.storage.db_path.trim().is_empty() {
            return Err(config_err("storage.db_path", "missing required storage path"));
        }
        if self.total_records == 0 {
            return Err(config_err("total_records", "missing required target record count"));
        }
        if self.batch_size == 0 {
            return Err(config_err("batch_size", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.fraud_fraction) {
            return Err(config_err(
                "fraud_fraction",
                format!("{} is outside [0, 1]", self.fraud_fraction),
            ));
        }
        for (pattern, w) in self.pattern_weights.iter() {
            if !w.is_finite() || w < 0.0 {
                return Err(config_err(
                    "pattern_weights",
                    format!("weight for {pattern} is {w}"),
                ));
            }
        }
        if self.pattern_weights.total() > 1.0 + 1e-9 {
            return Err(config_err(
                "pattern_weights",
                format!("weights sum to {:.3}, must be at most 1", self.pattern_weights.total()),
            ));
        }
        let split = &self.tier_split;
        if split.high < 0.0 || split.medium < 0.0 || split.high + split.medium > 1.0 {
            return Err(config_err(
                "tier_split",
                format!("high={} medium={} do not leave a valid low share", split.high, split.medium),
            ));
        }
        if self.history_days < 1 {
            return Err(config_err("history_days", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(config_err("retry.max_attempts", "must be at least 1"));
        }
        Ok(())
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Small, fast configuration for tests: no delay, no backoff.
    pub fn default_test() -> Self {
        Self {
            storage: StorageConfig {
                db_path: ":memory:".into(),
            },
            seed: 42,
            batch_size: 100,
            total_records: 500,
            fraud_fraction: 0.10,
            pattern_weights: PatternWeights::default(),
            tier_split: TierSplit::default(),
            history_days: DEFAULT_HISTORY_DAYS,
            inter_batch_delay_ms: 0,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff_ms: 0,
                backoff_multiplier: 1.0,
            },
            reference_time: Some(
                DateTime::parse_from_rfc3339("2024-06-30T12:00:00Z")
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            ),
        }
    }
}

fn config_err(field: &'static str, reason: impl Into<String>) -> SynthError {
    SynthError::Config {
        field,
        reason: reason.into(),
    }
}
