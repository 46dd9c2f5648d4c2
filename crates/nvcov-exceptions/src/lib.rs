// SPDX-License-Identifier: AGPL-3.0

//! Error taxonomy for coverage collection
//!
//! Errors are split by the stage that raises them: decoding a script,
//! parsing an external record (trace line, debug-info field, NEF container),
//! and mutating the per-contract coverage state.

use thiserror::Error;

/// Raised while walking a script buffer.
///
/// A decode error is fatal for the coverage of that one contract only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Address {address} is out of range (script length {length})")]
    OutOfRange { address: usize, length: usize },

    #[error("Truncated operand at {address}: need {needed} bytes, {available} available")]
    TruncatedOperand {
        address: usize,
        needed: usize,
        available: usize,
    },

    #[error("Truncated length prefix at {address}: need {needed} bytes, {available} available")]
    TruncatedPrefix {
        address: usize,
        needed: usize,
        available: usize,
    },

    #[error("Script of {0} bytes exceeds the addressable range")]
    ScriptTooLarge(usize),
}

/// Raised when an external record is inconsistent or malformed.
///
/// Fatal for the single record or file being processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Branch result {result} at {address} matches neither the address nor the offset {offset}")]
    BranchResultMismatch {
        address: u32,
        offset: u32,
        result: u32,
    },

    #[error("Invalid contract hash: {0}")]
    InvalidHash(String),

    #[error("Invalid method range: {0}")]
    InvalidRange(String),

    #[error("Invalid method name: {0}")]
    InvalidMethodName(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid sequence point: {0}")]
    InvalidSequencePoint(String),

    #[error("Sequence point document index {index} out of range ({count} documents)")]
    DocumentIndexOutOfRange { index: usize, count: usize },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid NEF file: {0}")]
    InvalidNef(String),

    #[error("Invalid raw coverage line {line}: {text}")]
    InvalidRawLine { line: usize, text: String },
}

/// Raised by the coverage aggregator and the collector that owns it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageError {
    #[error("Script already registered for contract {0}")]
    ScriptAlreadyRegistered(String),

    #[error("Unknown contract {0}")]
    UnknownContract(String),

    #[error("Contract {0} is registered twice")]
    DuplicateContract(String),

    #[error("Identity mismatch: declared {declared}, debug info has {actual}")]
    IdentityMismatch { declared: String, actual: String },

    #[error("Counter overflow at address {0}")]
    CounterOverflow(u32),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

/// Result type for script decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for record parsing
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for coverage operations
pub type CoverageResult<T> = Result<T, CoverageError>;
