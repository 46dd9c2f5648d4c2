// SPDX-License-Identifier: AGPL-3.0

//! Per-contract hit and branch accumulators

use nvcov_contract::{ContractIdentity, Script};
use nvcov_debuginfo::ContractSymbols;
use nvcov_exceptions::{CoverageError, CoverageResult, FormatError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Observed outcomes of one branch instruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchCount {
    /// Times the jump target was taken
    pub branch_count: u32,
    /// Times execution fell through
    pub continue_count: u32,
}

impl BranchCount {
    pub fn new(branch_count: u32, continue_count: u32) -> Self {
        Self {
            branch_count,
            continue_count,
        }
    }

    /// Number of distinct outcomes seen (0, 1 or 2)
    pub fn outcomes(&self) -> u32 {
        u32::from(self.branch_count > 0) + u32::from(self.continue_count > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.branch_count == 0 && self.continue_count == 0
    }
}

/// Coverage state of a single contract
///
/// Maps only grow. Once the session ends the value is read by the
/// correlation step and never written again.
#[derive(Debug, Clone)]
pub struct ContractCoverage {
    name: String,
    symbols: ContractSymbols,
    script: Option<Script>,
    hits: BTreeMap<u32, u32>,
    branches: BTreeMap<u32, BranchCount>,
}

impl ContractCoverage {
    pub fn new(name: impl Into<String>, symbols: ContractSymbols) -> Self {
        Self {
            name: name.into(),
            symbols,
            script: None,
            hits: BTreeMap::new(),
            branches: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> ContractIdentity {
        self.symbols.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &ContractSymbols {
        &self.symbols
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn hits(&self) -> &BTreeMap<u32, u32> {
        &self.hits
    }

    pub fn branches(&self) -> &BTreeMap<u32, BranchCount> {
        &self.branches
    }

    /// Hit count at `address`, 0 when never hit
    pub fn hit_count(&self, address: u32) -> u32 {
        self.hits.get(&address).copied().unwrap_or(0)
    }

    /// Branch counts at `address`, `(0, 0)` when never reached
    pub fn branch_count(&self, address: u32) -> BranchCount {
        self.branches.get(&address).copied().unwrap_or_default()
    }

    /// Attach the decoded script; a contract's script can only be set once
    pub fn register_script(&mut self, script: Script) -> CoverageResult<()> {
        if self.script.is_some() {
            return Err(CoverageError::ScriptAlreadyRegistered(
                self.identity().to_string(),
            ));
        }
        self.script = Some(script);
        Ok(())
    }

    pub fn record_hit(&mut self, address: u32) -> CoverageResult<()> {
        self.add_hits(address, 1)
    }

    /// Classify one branch outcome and count it
    pub fn record_branch(&mut self, address: u32, offset: u32, result: u32) -> CoverageResult<()> {
        let outcome = classify_branch(address, offset, result)?;
        self.add_branch(address, outcome)
    }

    /// Add `count` hits at `address`
    pub fn add_hits(&mut self, address: u32, count: u32) -> CoverageResult<()> {
        let total = sum_hits(self.hit_count(address), count, address)?;
        self.hits.insert(address, total);
        Ok(())
    }

    /// Add both branch counters at `address`
    pub fn add_branch(&mut self, address: u32, count: BranchCount) -> CoverageResult<()> {
        let total = sum_branch(self.branch_count(address), count, address)?;
        self.branches.insert(address, total);
        Ok(())
    }

    /// Fail with the first counter that `counts` would overflow
    pub fn check_merge(&self, counts: &CoverageCounts) -> CoverageResult<()> {
        self.merged(counts).map(|_| ())
    }

    /// Add every counter of `counts`, or none of them when one would overflow
    pub fn merge(&mut self, counts: &CoverageCounts) -> CoverageResult<()> {
        let (hits, branches) = self.merged(counts)?;
        self.hits.extend(hits);
        self.branches.extend(branches);
        Ok(())
    }

    fn merged(&self, counts: &CoverageCounts) -> CoverageResult<MergedCounters> {
        let hits = counts
            .hits
            .iter()
            .map(|(&address, &count)| {
                Ok((address, sum_hits(self.hit_count(address), count, address)?))
            })
            .collect::<CoverageResult<Vec<_>>>()?;
        let branches = counts
            .branches
            .iter()
            .map(|(&address, &count)| {
                Ok((address, sum_branch(self.branch_count(address), count, address)?))
            })
            .collect::<CoverageResult<Vec<_>>>()?;
        Ok((hits, branches))
    }
}

type MergedCounters = (Vec<(u32, u32)>, Vec<(u32, BranchCount)>);

/// Counters of one trace or raw dump, staged before they reach a contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageCounts {
    pub hits: BTreeMap<u32, u32>,
    pub branches: BTreeMap<u32, BranchCount>,
}

impl CoverageCounts {
    pub fn add_hits(&mut self, address: u32, count: u32) -> CoverageResult<()> {
        let current = self.hits.get(&address).copied().unwrap_or(0);
        let total = sum_hits(current, count, address)?;
        self.hits.insert(address, total);
        Ok(())
    }

    pub fn add_branch(&mut self, address: u32, count: BranchCount) -> CoverageResult<()> {
        let current = self.branches.get(&address).copied().unwrap_or_default();
        let total = sum_branch(current, count, address)?;
        self.branches.insert(address, total);
        Ok(())
    }
}

/// Outcome of one branch execution.
///
/// `result == address` counts as fall-through, `result == offset` as taken.
pub fn classify_branch(address: u32, offset: u32, result: u32) -> CoverageResult<BranchCount> {
    if result == address {
        Ok(BranchCount::new(0, 1))
    } else if result == offset {
        Ok(BranchCount::new(1, 0))
    } else {
        Err(FormatError::BranchResultMismatch {
            address,
            offset,
            result,
        }
        .into())
    }
}

fn sum_hits(current: u32, count: u32, address: u32) -> CoverageResult<u32> {
    current
        .checked_add(count)
        .ok_or(CoverageError::CounterOverflow(address))
}

fn sum_branch(
    current: BranchCount,
    count: BranchCount,
    address: u32,
) -> CoverageResult<BranchCount> {
    Ok(BranchCount::new(
        sum_hits(current.branch_count, count.branch_count, address)?,
        sum_hits(current.continue_count, count.continue_count, address)?,
    ))
}
