//! Source contracts shared by the adapters and the aggregator.
//!
//! Every upstream call settles into a [`SourceResult`]: a payload tagged with its
//! [`Freshness`], or a structured [`SourceError`]. Never both.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::fetch::{FetchError, Fetched};
use crate::retry::FailureClass;
use crate::{ChainActivity, SourceId, WalletAddress};

/// Whether a payload came from a live response (or fresh cache) or a stale fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    StaleFromCache,
}

impl Freshness {
    pub const fn of(fetched: &Fetched) -> Self {
        if fetched.is_stale {
            Self::StaleFromCache
        } else {
            Self::Fresh
        }
    }

    /// Stale wins: a payload assembled from several fetches is only as fresh as its oldest part.
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Fresh, Self::Fresh) => Self::Fresh,
            _ => Self::StaleFromCache,
        }
    }
}

/// Per-source outcome reported next to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Fresh,
    Stale,
    Failed,
    /// Not queried because no usable address was supplied.
    Skipped,
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The fetch layer gave up with nothing cached.
    Fetch,
    /// The payload did not have the expected shape.
    Decode,
    /// The source needs configuration (an API key) it does not have.
    NotConfigured,
    Unavailable,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    failure: Option<FailureClass>,
}

impl SourceError {
    pub fn fetch(error: FetchError) -> Self {
        Self {
            kind: SourceErrorKind::Fetch,
            failure: Some(error.class),
            message: error.to_string(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Decode,
            message: message.into(),
            failure: None,
        }
    }

    pub fn not_configured(source: SourceId, setting: &str) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: format!("source '{source}' requires {setting}"),
            failure: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            failure: None,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure class of the last upstream attempt, for fetch errors.
    pub const fn failure_class(&self) -> Option<FailureClass> {
        self.failure
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Fetch => "source.fetch",
            SourceErrorKind::Decode => "source.decode",
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::Unavailable => "source.unavailable",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<FetchError> for SourceError {
    fn from(error: FetchError) -> Self {
        Self::fetch(error)
    }
}

/// Tagged outcome of one source call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult<T> {
    Success { payload: T, freshness: Freshness },
    Failure(SourceError),
}

impl<T> SourceResult<T> {
    pub fn success(payload: T, freshness: Freshness) -> Self {
        Self::Success { payload, freshness }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn status(&self) -> SourceStatus {
        match self {
            Self::Success {
                freshness: Freshness::Fresh,
                ..
            } => SourceStatus::Fresh,
            Self::Success {
                freshness: Freshness::StaleFromCache,
                ..
            } => SourceStatus::Stale,
            Self::Failure(_) => SourceStatus::Failed,
        }
    }
}

impl<T> From<Result<(T, Freshness), SourceError>> for SourceResult<T> {
    fn from(outcome: Result<(T, Freshness), SourceError>) -> Self {
        match outcome {
            Ok((payload, freshness)) => Self::Success { payload, freshness },
            Err(error) => Self::Failure(error),
        }
    }
}

/// Blockchain indexer contract.
///
/// Implementations treat the indexer as a black box and return normalized
/// events plus per-chain totals for one address.
pub trait ChainIndexer: Send + Sync {
    fn activity<'a>(
        &'a self,
        address: &'a WalletAddress,
    ) -> Pin<Box<dyn Future<Output = Result<(ChainActivity, Freshness), SourceError>> + Send + 'a>>;
}
