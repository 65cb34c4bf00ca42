//! Command-line tools for the coldwallet transaction core.
//!
//! Two binaries are built from this crate:
//!
//! - `coldwallet` decodes, views, signs, sends and checks the status of
//!   transaction files through a Bitcoin-family daemon
//! - `xmrwallet` creates and syncs Monero wallets from a key-address file and
//!   builds transfer and sweep transactions through `monero-wallet-rpc`
//!
//! Both log to stderr and keep stdout for command output, so results can be
//! piped.

pub mod args;
pub mod commands;
pub mod error;
pub mod logging;
pub mod xmr;

pub use error::{CliError, CliResult, LoggingError};
pub use logging::{LoggingConfig, LoggingGuard, init_logging};

/// Current version of the tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
