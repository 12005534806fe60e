use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream sources queried for a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Manifest,
    Health,
    Mining,
    Solana,
    Ethereum,
}

impl SourceId {
    pub const ALL: [Self; 5] = [
        Self::Manifest,
        Self::Health,
        Self::Mining,
        Self::Solana,
        Self::Ethereum,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Health => "health",
            Self::Mining => "mining",
            Self::Solana => "solana",
            Self::Ethereum => "ethereum",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manifest" => Ok(Self::Manifest),
            "health" => Ok(Self::Health),
            "mining" => Ok(Self::Mining),
            "solana" => Ok(Self::Solana),
            "ethereum" => Ok(Self::Ethereum),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
