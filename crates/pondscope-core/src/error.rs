use thiserror::Error;

/// Validation and contract errors exposed by `pondscope-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("wallet address cannot be empty")]
    EmptyAddress,
    #[error("'{value}' is neither a Solana nor an Ethereum address")]
    UnrecognizedAddress { value: String },
    #[error("expected a {expected} address, got '{value}'")]
    WrongChain {
        expected: &'static str,
        value: String,
    },

    #[error("invalid chain '{value}', expected one of eth, sol")]
    InvalidChain { value: String },
    #[error("invalid source '{value}', expected one of manifest, health, mining, solana, ethereum")]
    InvalidSource { value: String },

    #[error("invalid RFC3339 timestamp: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid value '{value}' for setting {key}")]
    InvalidSetting { key: &'static str, value: String },
}
