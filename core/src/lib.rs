//! Labeled transaction synthesis: tiers a customer directory, generates
//! fraud-pattern and legitimate transactions in batches, and persists them.

pub mod clock;
pub mod config;
pub mod customer;
pub mod error;
pub mod event;
pub mod generator;
pub mod name_generator;
pub mod orchestrator;
pub mod record;
pub mod risk_manager;
pub mod rng;
pub mod sink;
pub mod store;
pub mod types;
