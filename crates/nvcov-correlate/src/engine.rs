// SPDX-License-Identifier: AGPL-3.0

//! Map address-indexed counters onto debug methods and lines

use crate::tree::{
    AddressCoverage, BranchCoverage, ContractCoverageTree, LineCoverage, MethodCoverage,
};
use nvcov_collector::ContractCoverage;
use nvcov_contract::Script;
use nvcov_debuginfo::{ContractSymbols, Method};
use std::collections::BTreeMap;

/// Build the coverage tree of one contract
pub fn build_tree(coverage: &ContractCoverage) -> ContractCoverageTree {
    let symbols = coverage.symbols();
    let script = coverage.script();

    let methods = symbols
        .methods
        .iter()
        .filter_map(|method| build_method(coverage, symbols, script, method))
        .collect();

    let documents = (0..symbols.documents.len())
        .filter_map(|i| symbols.document_path(i))
        .collect();

    ContractCoverageTree {
        identity: coverage.identity(),
        name: coverage.name().to_string(),
        documents,
        methods,
        addresses: build_addresses(coverage, script),
    }
}

/// `None` for methods without sequence points
fn build_method(
    coverage: &ContractCoverage,
    symbols: &ContractSymbols,
    script: Option<&Script>,
    method: &Method,
) -> Option<MethodCoverage> {
    let first = method.sequence_points.first()?;
    let document_index = first.document;
    let document = symbols
        .document_path(document_index)
        .unwrap_or_default();

    let points = &method.sequence_points;
    let lines = points
        .iter()
        .enumerate()
        .map(|(i, sp)| {
            let end = match points.get(i + 1) {
                Some(next) => next
                    .address
                    .checked_sub(1)
                    .map(|before_next| before_next.min(method.range.end)),
                None => Some(method.range.end),
            };

            let branches = match (script, end) {
                (Some(script), Some(end)) => scan_branches(coverage, script, sp.address, end),
                _ => Vec::new(),
            };

            LineCoverage {
                sequence_point: *sp,
                hit_count: coverage.hit_count(sp.address),
                branches,
            }
        })
        .collect();

    Some(MethodCoverage {
        id: method.id.clone(),
        namespace: method.namespace.clone(),
        name: method.name.clone(),
        range: method.range,
        parameters: method.parameters.clone(),
        return_type: method.return_type.clone(),
        document_index,
        document,
        lines,
    })
}

/// Branch instructions whose address lies in `start..=end`
fn scan_branches(
    coverage: &ContractCoverage,
    script: &Script,
    start: u32,
    end: u32,
) -> Vec<BranchCoverage> {
    script
        .instructions_in(start, end)
        .filter(|(_, insn)| insn.is_branch())
        .map(|(address, insn)| BranchCoverage {
            address,
            opcode: insn.opcode,
            target: insn.target_address(address),
            counts: coverage.branch_count(address),
        })
        .collect()
}

/// Every known address: script instruction boundaries plus recorded addresses
fn build_addresses(coverage: &ContractCoverage, script: Option<&Script>) -> Vec<AddressCoverage> {
    let mut addresses: BTreeMap<u32, AddressCoverage> = BTreeMap::new();

    if let Some(script) = script {
        for (address, insn) in script.instructions() {
            let branch = insn
                .is_branch()
                .then(|| coverage.branch_count(address));
            addresses.insert(
                address,
                AddressCoverage {
                    address,
                    opcode: Some(insn.opcode),
                    hit_count: coverage.hit_count(address),
                    branch,
                },
            );
        }
    }

    let recorded = coverage
        .hits()
        .keys()
        .chain(coverage.branches().keys())
        .copied();
    for address in recorded {
        let entry = addresses.entry(address).or_insert(AddressCoverage {
            address,
            opcode: None,
            hit_count: coverage.hit_count(address),
            branch: None,
        });
        if coverage.branches().contains_key(&address) {
            entry.branch = Some(coverage.branch_count(address));
        }
    }

    addresses.into_values().collect()
}
