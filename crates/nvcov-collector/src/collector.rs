// SPDX-License-Identifier: AGPL-3.0

//! Arena of per-contract aggregators keyed by identity

use crate::aggregator::{classify_branch, ContractCoverage, CoverageCounts};
use crate::raw::RawCoverage;
use crate::trace::TraceRecord;
use nvcov_contract::{ContractIdentity, Script};
use nvcov_debuginfo::ContractSymbols;
use nvcov_exceptions::{CoverageError, CoverageResult};
use nvcov_logs::{warn_code_unique, ErrorCode};
use std::collections::BTreeMap;

/// Counts of what one trace contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub hits: usize,
    pub branches: usize,
    /// Records dropped because their contract is not registered
    pub ignored: usize,
}

/// All contracts of one collection session
#[derive(Debug, Default)]
pub struct CoverageCollector {
    contracts: BTreeMap<ContractIdentity, ContractCoverage>,
}

impl CoverageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract under the identity found in its symbols.
    ///
    /// `declared`, when given, must match that identity.
    pub fn add_contract(
        &mut self,
        name: &str,
        symbols: ContractSymbols,
        declared: Option<ContractIdentity>,
    ) -> CoverageResult<ContractIdentity> {
        let identity = symbols.identity;

        if let Some(declared) = declared {
            if declared != identity {
                return Err(CoverageError::IdentityMismatch {
                    declared: declared.to_string(),
                    actual: identity.to_string(),
                });
            }
        }

        if self.contracts.contains_key(&identity) {
            return Err(CoverageError::DuplicateContract(identity.to_string()));
        }

        tracing::debug!(contract = %identity, name, "Registered contract");
        self.contracts
            .insert(identity, ContractCoverage::new(name, symbols));
        Ok(identity)
    }

    pub fn contains(&self, identity: &ContractIdentity) -> bool {
        self.contracts.contains_key(identity)
    }

    pub fn get(&self, identity: &ContractIdentity) -> Option<&ContractCoverage> {
        self.contracts.get(identity)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Contracts in identity order
    pub fn contracts(&self) -> impl Iterator<Item = &ContractCoverage> {
        self.contracts.values()
    }

    fn get_mut(&mut self, identity: &ContractIdentity) -> CoverageResult<&mut ContractCoverage> {
        self.contracts
            .get_mut(identity)
            .ok_or_else(|| CoverageError::UnknownContract(identity.to_string()))
    }

    pub fn register_script(
        &mut self,
        identity: &ContractIdentity,
        script: Script,
    ) -> CoverageResult<()> {
        self.get_mut(identity)?.register_script(script)
    }

    /// Apply parsed trace records.
    ///
    /// Data lines that follow an unregistered or malformed identity, or that
    /// precede any identity line, are ignored until a registered identity
    /// appears. The records are staged first: when any of them fails, no
    /// contract changes.
    pub fn apply_trace(&mut self, records: &[TraceRecord]) -> CoverageResult<TraceStats> {
        let mut stats = TraceStats::default();
        let mut staged: BTreeMap<ContractIdentity, CoverageCounts> = BTreeMap::new();
        let mut current: Option<ContractIdentity> = None;

        for record in records {
            match *record {
                TraceRecord::Identity(identity) => {
                    if self.contains(&identity) {
                        current = Some(identity);
                    } else {
                        warn_code_unique(
                            ErrorCode::UnknownContract,
                            &format!("Ignoring trace data for unknown contract {}", identity),
                        );
                        current = None;
                    }
                }
                TraceRecord::UnknownIdentity => current = None,
                TraceRecord::Hit(address) => match current {
                    Some(identity) => {
                        staged.entry(identity).or_default().add_hits(address, 1)?;
                        stats.hits += 1;
                    }
                    None => stats.ignored += 1,
                },
                TraceRecord::Branch {
                    address,
                    offset,
                    result,
                } => match current {
                    Some(identity) => {
                        let outcome = classify_branch(address, offset, result)?;
                        staged
                            .entry(identity)
                            .or_default()
                            .add_branch(address, outcome)?;
                        stats.branches += 1;
                    }
                    None => stats.ignored += 1,
                },
            }
        }

        self.commit(&staged)?;
        Ok(stats)
    }

    /// Merge counters read back from a raw dump
    pub fn apply_raw(&mut self, raw: &RawCoverage) -> CoverageResult<()> {
        let counts = CoverageCounts {
            hits: raw.hits.clone(),
            branches: raw.branches.clone(),
        };
        self.commit(&BTreeMap::from([(raw.identity, counts)]))
    }

    /// Check every contract's counts before writing any of them
    fn commit(
        &mut self,
        staged: &BTreeMap<ContractIdentity, CoverageCounts>,
    ) -> CoverageResult<()> {
        for (identity, counts) in staged {
            self.get_mut(identity)?.check_merge(counts)?;
        }
        for (identity, counts) in staged {
            self.get_mut(identity)?.merge(counts)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::{symbols, HASH};
    use crate::aggregator::BranchCount;
    use crate::trace::parse_trace;

    const OTHER: &str = "0x0000000000000000000000000000000000000001";

    fn collector() -> CoverageCollector {
        let mut collector = CoverageCollector::new();
        collector.add_contract("Token", symbols(HASH), None).unwrap();
        collector
    }

    fn identity(hash: &str) -> ContractIdentity {
        ContractIdentity::parse(hash).unwrap()
    }

    #[test]
    fn test_add_contract_declared_mismatch() {
        let mut collector = CoverageCollector::new();
        let err = collector
            .add_contract("Token", symbols(HASH), Some(identity(OTHER)))
            .unwrap_err();
        assert!(matches!(err, CoverageError::IdentityMismatch { .. }));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_add_contract_twice() {
        let mut collector = collector();
        let err = collector
            .add_contract("Again", symbols(HASH), None)
            .unwrap_err();
        assert_eq!(err, CoverageError::DuplicateContract(HASH.to_string()));
    }

    #[test]
    fn test_apply_trace() {
        let mut collector = collector();
        let records = parse_trace(&format!("{}\n0\n0\n5 12 12\n5 12 5\n", HASH), "t").unwrap();
        let stats = collector.apply_trace(&records).unwrap();
        assert_eq!(
            stats,
            TraceStats {
                hits: 2,
                branches: 2,
                ignored: 0
            }
        );

        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hit_count(0), 2);
        assert_eq!(cov.branch_count(5), BranchCount::new(1, 1));
    }

    #[test]
    fn test_unknown_identity_is_ignored_until_known() {
        let mut collector = collector();
        let text = format!("{}\n1\n2 3 3\n{}\n4\n", OTHER, HASH);
        let records = parse_trace(&text, "t").unwrap();
        let stats = collector.apply_trace(&records).unwrap();

        assert_eq!(stats.ignored, 2);
        assert_eq!(stats.hits, 1);
        assert!(!collector.contains(&identity(OTHER)));

        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hits(), &BTreeMap::from([(4, 1)]));
        assert!(cov.branches().is_empty());
    }

    #[test]
    fn test_malformed_identity_ends_current_contract() {
        let mut collector = collector();
        let short = &OTHER[..OTHER.len() - 1];
        let text = format!("{}\n1\n{}\n7\n7 9 9\n", HASH, short);
        let records = parse_trace(&text, "t").unwrap();
        let stats = collector.apply_trace(&records).unwrap();

        assert_eq!(stats.hits, 1);
        assert_eq!(stats.ignored, 2);
        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hits(), &BTreeMap::from([(1, 1)]));
        assert!(cov.branches().is_empty());
    }

    #[test]
    fn test_overflow_rejects_whole_trace() {
        let mut collector = collector();
        collector
            .add_contract("Oracle", symbols(OTHER), None)
            .unwrap();

        let raw = RawCoverage {
            identity: identity(HASH),
            hits: BTreeMap::from([(1, u32::MAX)]),
            branches: BTreeMap::new(),
        };
        collector.apply_raw(&raw).unwrap();

        let text = format!("{}\n2\n{}\n0\n{}\n0\n1\n", OTHER, HASH, HASH);
        let records = parse_trace(&text, "t").unwrap();
        assert_eq!(
            collector.apply_trace(&records),
            Err(CoverageError::CounterOverflow(1))
        );

        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hits(), &BTreeMap::from([(1, u32::MAX)]));
        assert!(collector.get(&identity(OTHER)).unwrap().hits().is_empty());
    }

    #[test]
    fn test_apply_raw_overflow_changes_nothing() {
        let mut collector = collector();
        let mut raw = RawCoverage {
            identity: identity(HASH),
            hits: BTreeMap::from([(1, u32::MAX)]),
            branches: BTreeMap::new(),
        };
        collector.apply_raw(&raw).unwrap();

        raw.hits = BTreeMap::from([(0, 4), (1, 1)]);
        raw.branches = BTreeMap::from([(5, BranchCount::new(1, 1))]);
        assert!(collector.apply_raw(&raw).is_err());

        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hit_count(0), 0);
        assert!(cov.branches().is_empty());
    }

    #[test]
    fn test_data_before_identity_is_ignored() {
        let mut collector = collector();
        let stats = collector.apply_trace(&[TraceRecord::Hit(1)]).unwrap();
        assert_eq!(stats.ignored, 1);
        assert!(collector.get(&identity(HASH)).unwrap().hits().is_empty());
    }

    #[test]
    fn test_register_script_unknown_contract() {
        let mut collector = collector();
        let err = collector
            .register_script(&identity(OTHER), Script::new(vec![0x40]).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoverageError::UnknownContract(_)));
    }

    #[test]
    fn test_apply_raw() {
        let mut collector = collector();
        let raw = RawCoverage {
            identity: identity(HASH),
            hits: BTreeMap::from([(0, 3)]),
            branches: BTreeMap::from([(5, BranchCount::new(2, 0))]),
        };
        collector.apply_raw(&raw).unwrap();
        collector.apply_raw(&raw).unwrap();

        let cov = collector.get(&identity(HASH)).unwrap();
        assert_eq!(cov.hit_count(0), 6);
        assert_eq!(cov.branch_count(5), BranchCount::new(4, 0));
    }
}
