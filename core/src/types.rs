//! Shared primitive types used across the generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for a customer in the directory.
pub type CustomerId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Coarse risk classification controlling fraud-pattern eligibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Risk score written alongside a freshly assigned tier.
    pub fn default_score(&self) -> f64 {
        match self {
            Self::High => 75.0,
            Self::Medium => 50.0,
            Self::Low => 25.0,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six recognized fraud patterns. The display names are the labels
/// persisted in `fraud_type` and must never change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FraudPattern {
    #[serde(rename = "Structuring")]
    Structuring,
    #[serde(rename = "Layering")]
    Layering,
    #[serde(rename = "Large Wire Transfer")]
    LargeWireTransfer,
    #[serde(rename = "Frequent Offshore Transfers")]
    FrequentOffshoreTransfers,
    #[serde(rename = "Rapid In-Out")]
    RapidInOut,
    #[serde(rename = "Inconsistent Business Activity")]
    InconsistentBusinessActivity,
}

impl FraudPattern {
    pub const ALL: [FraudPattern; 6] = [
        FraudPattern::Structuring,
        FraudPattern::Layering,
        FraudPattern::LargeWireTransfer,
        FraudPattern::FrequentOffshoreTransfers,
        FraudPattern::RapidInOut,
        FraudPattern::InconsistentBusinessActivity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Structuring => "Structuring",
            Self::Layering => "Layering",
            Self::LargeWireTransfer => "Large Wire Transfer",
            Self::FrequentOffshoreTransfers => "Frequent Offshore Transfers",
            Self::RapidInOut => "Rapid In-Out",
            Self::InconsistentBusinessActivity => "Inconsistent Business Activity",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.label() == label)
    }
}

impl fmt::Display for FraudPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transaction-type category as persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionType {
    #[serde(rename = "Cash Deposit")]
    CashDeposit,
    #[serde(rename = "Wire Transfer")]
    WireTransfer,
    #[serde(rename = "Card Payment")]
    CardPayment,
    #[serde(rename = "Crypto Exchange")]
    CryptoExchange,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::CashDeposit,
        TransactionType::WireTransfer,
        TransactionType::CardPayment,
        TransactionType::CryptoExchange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashDeposit => "Cash Deposit",
            Self::WireTransfer => "Wire Transfer",
            Self::CardPayment => "Card Payment",
            Self::CryptoExchange => "Crypto Exchange",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Benign amount range `[min, max)` for legitimate activity.
    pub fn benign_range(&self) -> (f64, f64) {
        match self {
            Self::CashDeposit => (100.0, 5_000.0),
            Self::WireTransfer => (1_000.0, 25_000.0),
            Self::CardPayment => (10.0, 2_000.0),
            Self::CryptoExchange => (500.0, 10_000.0),
        }
    }
}

/// Which way money moves for a record. Decides the balance sign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    pub fn apply(&self, balance: f64, amount: f64) -> f64 {
        match self {
            Self::Inflow => balance + amount,
            Self::Outflow => balance - amount,
        }
    }
}

// ── Reference lists ──────────────────────────────────────────────────────────

pub const ACCOUNT_TYPES: &[&str] = &["Checking", "Savings", "Business"];

pub const MERCHANT_CATEGORIES: &[&str] = &[
    "Retail", "Travel", "Entertainment", "Groceries", "Electronics",
    "Healthcare", "Automotive", "Restaurant", "Utilities", "Education",
];

pub const BUSINESS_CATEGORIES: &[&str] = &[
    "Retail", "Crypto Exchange", "Luxury Goods", "Casino", "Electronics", "Travel", "Consulting",
];

pub const COUNTRIES: &[&str] = &[
    "USA", "Canada", "UK", "Germany", "France", "Japan", "Australia",
    "Switzerland", "Singapore", "UAE", "Cayman Islands", "Panama",
];

/// Destinations used for every "offshore" leg.
pub const HIGH_RISK_COUNTRIES: &[&str] = &["Cayman Islands", "Panama", "UAE"];

/// Customer home countries drawn when seeding a directory.
pub const DIRECTORY_HIGH_RISK_COUNTRIES: &[&str] =
    &["Cayman Islands", "Panama", "Switzerland", "Russia", "China"];
pub const DIRECTORY_LOW_RISK_COUNTRIES: &[&str] = &["USA", "UK", "Canada", "Germany", "Australia"];
