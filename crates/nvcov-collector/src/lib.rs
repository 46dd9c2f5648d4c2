// SPDX-License-Identifier: AGPL-3.0

//! Coverage aggregation
//!
//! [`CoverageCollector`] owns one [`ContractCoverage`] per registered
//! contract. It is single-writer: callers that load traces in parallel
//! must shard by contract or serialize access.

pub mod aggregator;
pub mod collector;
pub mod raw;
pub mod trace;

pub use aggregator::{classify_branch, BranchCount, ContractCoverage, CoverageCounts};
pub use collector::{CoverageCollector, TraceStats};
pub use raw::{parse_raw, RawCoverage};
pub use trace::{parse_line, parse_trace, read_trace_file, TraceRecord, TRACE_EXTENSION};
