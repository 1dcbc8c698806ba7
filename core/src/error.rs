use crate::types::CustomerId;
use thiserror::Error;

/// Fatal errors. Any of these stops the run.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("Risk manager not initialized")]
    NotInitialized,

    #[error("Batch {batch} left unwritten after {attempts} attempts: {source}")]
    BatchUnwritten {
        batch: u64,
        attempts: u32,
        #[source]
        source: Box<SynthError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SynthResult<T> = Result<T, SynthError>;

/// Recoverable, per-candidate failures. The orchestrator logs these and
/// moves on to the next candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Customer {0} not found in risk manager")]
    UnknownCustomer(CustomerId),

    #[error("Customer {0} has no base balance")]
    MissingBaseBalance(CustomerId),

    #[error("Customer {customer_id} has a non-finite balance: {balance}")]
    InvalidBalance { customer_id: CustomerId, balance: f64 },
}

pub type GenResult<T> = Result<T, GeneratorError>;
