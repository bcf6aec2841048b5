use std::time::Duration;
use thiserror::Error;

/// Billing form input that cannot become a ledger entry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please fill in all fields: {0} is required")]
    MissingField(&'static str),

    #[error("Invalid {field}: {value:?} is not a number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid {field}: must not be negative")]
    Negative { field: &'static str },

    #[error("Invalid user selection: {0}")]
    UnknownUser(String),

    #[error("Invalid amount: {hours} hours at {rate} does not give a finite total")]
    TotalOutOfRange { hours: f64, rate: f64 },
}

/// Failure talking to the project/task/membership data provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Failure of a persisted store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No identity is available yet")]
    NoIdentity,
}
