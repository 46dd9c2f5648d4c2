// SPDX-License-Identifier: AGPL-3.0

//! Run summary printed to the console and written as JSON

use nvcov_correlate::ContractCoverageTree;
use nvcov_session::SessionStats;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-contract totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub name: String,
    pub hash: String,
    pub methods: usize,
    pub lines_covered: u64,
    pub lines_valid: u64,
    pub branches_covered: u64,
    pub branches_valid: u64,
    /// Percentage with two decimals
    pub line_percent: String,
    pub branch_percent: String,
}

impl ContractSummary {
    pub fn from_tree(tree: &ContractCoverageTree) -> Self {
        let lines = tree.line_rate();
        let branches = tree.branch_rate();
        Self {
            name: tree.name.clone(),
            hash: tree.identity.to_string(),
            methods: tree.methods.len(),
            lines_covered: lines.covered,
            lines_valid: lines.total,
            branches_covered: branches.covered,
            branches_valid: branches.total,
            line_percent: lines.percent(),
            branch_percent: branches.percent(),
        }
    }
}

/// Main execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainResult {
    pub exitcode: i32,
    pub contracts: Vec<ContractSummary>,
    pub trace_files: usize,
    pub rejected_files: usize,
    pub artifacts: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl MainResult {
    pub fn new(
        trees: &[ContractCoverageTree],
        stats: &SessionStats,
        artifacts: Vec<String>,
        duration: Duration,
    ) -> Self {
        Self {
            exitcode: 0,
            contracts: trees.iter().map(ContractSummary::from_tree).collect(),
            trace_files: stats.trace_files,
            rejected_files: stats.rejected_files,
            artifacts,
            duration,
        }
    }

    pub fn has_rejections(&self) -> bool {
        self.rejected_files > 0
    }
}
