// SPDX-License-Identifier: AGPL-3.0

//! Read-only coverage tree handed to report formats

use crate::rate::Rate;
use nvcov_collector::BranchCount;
use nvcov_contract::{mnemonic, ContractIdentity};
use nvcov_debuginfo::{AddressRange, Parameter, SequencePoint};
use serde::Serialize;
use std::collections::BTreeMap;

/// One branch instruction inside a line's scan window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchCoverage {
    pub address: u32,
    pub opcode: u8,
    /// Jump or call target, when the operand resolves to an address
    pub target: Option<u32>,
    pub counts: BranchCount,
}

impl BranchCoverage {
    pub fn mnemonic(&self) -> String {
        mnemonic(self.opcode)
    }
}

/// One sequence point with its hit count and branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineCoverage {
    pub sequence_point: SequencePoint,
    pub hit_count: u32,
    pub branches: Vec<BranchCoverage>,
}

impl LineCoverage {
    pub fn line(&self) -> u32 {
        self.sequence_point.start.line
    }

    pub fn is_covered(&self) -> bool {
        self.hit_count > 0
    }

    pub fn has_branches(&self) -> bool {
        !self.branches.is_empty()
    }

    /// Distinct outcomes observed across every branch of the line
    pub fn outcome_paths(&self) -> u32 {
        self.branches.iter().map(|b| b.counts.outcomes()).sum()
    }

    /// More than one outcome path was observed
    pub fn is_branch_covered(&self) -> bool {
        self.outcome_paths() > 1
    }

    /// Observed outcomes over possible outcomes (two per branch)
    pub fn branch_rate(&self) -> Rate {
        Rate::new(
            u64::from(self.outcome_paths()),
            2 * self.branches.len() as u64,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodCoverage {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub range: AddressRange,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub document_index: usize,
    /// Resolved path of the method's source document
    pub document: String,
    pub lines: Vec<LineCoverage>,
}

impl MethodCoverage {
    pub fn line_rate(&self) -> Rate {
        let covered = self.lines.iter().filter(|l| l.is_covered()).count();
        Rate::new(covered as u64, self.lines.len() as u64)
    }

    pub fn branch_rate(&self) -> Rate {
        self.lines.iter().map(LineCoverage::branch_rate).sum()
    }

    /// Method was entered at least once
    pub fn is_hit(&self) -> bool {
        self.lines.first().is_some_and(LineCoverage::is_covered)
    }

    /// `name(type, type)` form used in reports
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.type_name.as_str())
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Counters at one instruction address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressCoverage {
    pub address: u32,
    /// `None` when the address is not an instruction boundary of the script
    pub opcode: Option<u8>,
    pub hit_count: u32,
    /// Present for branch instructions and for addresses with recorded outcomes
    pub branch: Option<BranchCount>,
}

/// Coverage of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractCoverageTree {
    pub identity: ContractIdentity,
    pub name: String,
    pub documents: Vec<String>,
    pub methods: Vec<MethodCoverage>,
    /// Ascending by address
    pub addresses: Vec<AddressCoverage>,
}

impl ContractCoverageTree {
    pub fn line_rate(&self) -> Rate {
        self.methods.iter().map(MethodCoverage::line_rate).sum()
    }

    pub fn branch_rate(&self) -> Rate {
        self.methods.iter().map(MethodCoverage::branch_rate).sum()
    }

    /// Methods grouped by namespace, in name order
    pub fn classes(&self) -> BTreeMap<&str, Vec<&MethodCoverage>> {
        let mut classes: BTreeMap<&str, Vec<&MethodCoverage>> = BTreeMap::new();
        for method in &self.methods {
            classes
                .entry(method.namespace.as_str())
                .or_default()
                .push(method);
        }
        classes
    }

    /// Methods grouped by source document
    pub fn documents(&self) -> BTreeMap<&str, Vec<&MethodCoverage>> {
        let mut documents: BTreeMap<&str, Vec<&MethodCoverage>> = BTreeMap::new();
        for method in &self.methods {
            documents
                .entry(method.document.as_str())
                .or_default()
                .push(method);
        }
        documents
    }
}

/// Rate over a group of methods
pub fn line_rate_of(methods: &[&MethodCoverage]) -> Rate {
    methods.iter().map(|m| m.line_rate()).sum()
}

pub fn branch_rate_of(methods: &[&MethodCoverage]) -> Rate {
    methods.iter().map(|m| m.branch_rate()).sum()
}
