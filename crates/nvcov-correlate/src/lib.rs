// SPDX-License-Identifier: AGPL-3.0

//! Correlation of address counters with debug symbols
//!
//! [`build_tree`] is a pure function of one [`nvcov_collector::ContractCoverage`];
//! trees are rebuilt for every report and never written back.

pub mod engine;
pub mod rate;
pub mod tree;

pub use engine::build_tree;
pub use rate::Rate;
pub use tree::{
    branch_rate_of, line_rate_of, AddressCoverage, BranchCoverage, ContractCoverageTree,
    LineCoverage, MethodCoverage,
};
