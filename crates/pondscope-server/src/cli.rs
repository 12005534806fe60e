//! Command-line arguments for the `pondscope` server.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--bind` | `POND0X_BIND` | `0.0.0.0:8080` |
//! | `--cache-ttl-secs` | `POND0X_CACHE_TTL_SECS` | `300` |
//! | `--timeout-ms` | `POND0X_TIMEOUT_MS` | `10000` |
//! | `--log-format` | `POND0X_LOG_FORMAT` | `pretty` |
//!
//! Upstream base URLs and indexer API keys are read from the environment only.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

/// Pond0x wallet analytics aggregator.
#[derive(Debug, Parser)]
#[command(name = "pondscope", author, version, about)]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(long, env = "POND0X_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Seconds a successful upstream response stays fresh.
    #[arg(long, env = "POND0X_CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Per-request upstream timeout in milliseconds.
    #[arg(long, env = "POND0X_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Log output format.
    #[arg(long, env = "POND0X_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
