use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Blockchain a wallet address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "sol")]
    Solana,
    #[serde(rename = "eth")]
    Ethereum,
}

impl Chain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solana => "sol",
            Self::Ethereum => "eth",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Solana => "Solana",
            Self::Ethereum => "Ethereum",
        }
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sol" | "solana" => Ok(Self::Solana),
            "eth" | "ethereum" => Ok(Self::Ethereum),
            other => Err(ValidationError::InvalidChain {
                value: other.to_owned(),
            }),
        }
    }
}

/// Wallet address whose chain has been recognized from its format.
///
/// Only the shape is checked: `0x` + 40 hex digits for Ethereum, 32 to 44
/// base58 characters for Solana. No checksum or curve validation is done.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WalletAddress {
    chain: Chain,
    value: String,
}

impl WalletAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = input.trim();
        if value.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }

        let chain = if is_ethereum_address(value) {
            Chain::Ethereum
        } else if is_solana_address(value) {
            Chain::Solana
        } else {
            return Err(ValidationError::UnrecognizedAddress {
                value: value.to_owned(),
            });
        };

        Ok(Self {
            chain,
            value: value.to_owned(),
        })
    }

    /// Parses `input` and requires it to belong to `chain`.
    pub fn for_chain(chain: Chain, input: &str) -> Result<Self, ValidationError> {
        let address = Self::parse(input).map_err(|error| match error {
            ValidationError::UnrecognizedAddress { value } => ValidationError::WrongChain {
                expected: chain.display_name(),
                value,
            },
            other => other,
        })?;

        if address.chain != chain {
            return Err(ValidationError::WrongChain {
                expected: chain.display_name(),
                value: address.value,
            });
        }
        Ok(address)
    }

    pub fn solana(input: &str) -> Result<Self, ValidationError> {
        Self::for_chain(Chain::Solana, input)
    }

    pub fn ethereum(input: &str) -> Result<Self, ValidationError> {
        Self::for_chain(Chain::Ethereum, input)
    }

    pub const fn chain(&self) -> Chain {
        self.chain
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for WalletAddress {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn is_ethereum_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_solana_address(value: &str) -> bool {
    (32..=44).contains(&value.len()) && value.chars().all(|c| BASE58_ALPHABET.contains(c))
}
