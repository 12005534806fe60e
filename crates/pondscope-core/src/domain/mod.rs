//! Canonical wallet and Pond0x domain types.

mod address;
pub mod lenient;
mod models;
mod timestamp;

pub use address::{Chain, WalletAddress};
pub use models::{
    ChainActivity, ChainStats, EventKind, HealthReport, HealthStats, Manifest, MiningStatus,
    WalletEvent,
};
pub use timestamp::UtcDateTime;
