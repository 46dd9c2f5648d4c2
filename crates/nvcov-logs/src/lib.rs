// SPDX-License-Identifier: AGPL-3.0

//! Logging setup and warning helpers
//!
//! Everything goes through `tracing`. The binary calls [`init`] once; library
//! crates only emit events.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Warning categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParsingError,
    UnknownContract,
    IdentityMismatch,
    DecodeError,
    DuplicateScript,
    InternalError,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::ParsingError => "parsing-error",
            ErrorCode::UnknownContract => "unknown-contract",
            ErrorCode::IdentityMismatch => "identity-mismatch",
            ErrorCode::DecodeError => "decode-error",
            ErrorCode::DuplicateScript => "duplicate-script",
            ErrorCode::InternalError => "internal-error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Messages already emitted through [`warn_code_unique`]
static UNIQUE_MESSAGES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Returns true the first time a message is seen
fn first_time(message: &str) -> bool {
    let mut messages = UNIQUE_MESSAGES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    messages.insert(message.to_string())
}

/// Map a `-v` count to a default filter directive
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Calling it twice is harmless; the second installation is ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log a warning tagged with an error code
pub fn warn_code(error_code: ErrorCode, msg: &str) {
    tracing::warn!(code = %error_code, "{}", msg);
}

/// Log a warning tagged with an error code, once per distinct message
pub fn warn_code_unique(error_code: ErrorCode, msg: &str) {
    if first_time(msg) {
        warn_code(error_code, msg);
    }
}
