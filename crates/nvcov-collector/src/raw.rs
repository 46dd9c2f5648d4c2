// SPDX-License-Identifier: AGPL-3.0

//! Reader for the raw per-address dump
//!
//! The dump starts with the contract identity, followed by `address hits`
//! and `address branchCount continueCount` lines. Zero counters are not
//! kept, so reading a dump back yields exactly the maps it was written from.

use crate::aggregator::BranchCount;
use nvcov_contract::ContractIdentity;
use nvcov_exceptions::{FormatError, FormatResult};
use std::collections::BTreeMap;

/// Counters recovered from a raw dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCoverage {
    pub identity: ContractIdentity,
    pub hits: BTreeMap<u32, u32>,
    pub branches: BTreeMap<u32, BranchCount>,
}

pub fn parse_raw(text: &str) -> FormatResult<RawCoverage> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, header) = lines.next().ok_or(FormatError::MissingField("identity"))?;
    let mut raw = RawCoverage {
        identity: ContractIdentity::parse(header)?,
        ..Default::default()
    };

    for (line_no, line) in lines {
        let invalid = || FormatError::InvalidRawLine {
            line: line_no,
            text: line.to_string(),
        };

        let numbers = line
            .split_whitespace()
            .map(|f| f.parse::<u32>().map_err(|_| invalid()))
            .collect::<FormatResult<Vec<_>>>()?;

        match numbers.as_slice() {
            [_, 0] | [_, 0, 0] => {}
            [address, hits] => {
                raw.hits.insert(*address, *hits);
            }
            [address, branch_count, continue_count] => {
                raw.branches
                    .insert(*address, BranchCount::new(*branch_count, *continue_count));
            }
            _ => return Err(invalid()),
        }
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9";

    #[test]
    fn test_parse_raw() {
        let text = format!("{}\n0 1\n1 0\n5 1 1\n5 2\n7 0 0\n", HASH);
        let raw = parse_raw(&text).unwrap();
        assert_eq!(raw.identity.to_string(), HASH);
        assert_eq!(raw.hits, BTreeMap::from([(0, 1), (5, 2)]));
        assert_eq!(raw.branches, BTreeMap::from([(5, BranchCount::new(1, 1))]));
    }

    #[test]
    fn test_parse_raw_requires_identity() {
        assert_eq!(parse_raw(""), Err(FormatError::MissingField("identity")));
        assert!(matches!(parse_raw("0 1\n"), Err(FormatError::InvalidHash(_))));
    }

    #[test]
    fn test_parse_raw_invalid_line() {
        let text = format!("{}\n0 1\nnope\n", HASH);
        assert_eq!(
            parse_raw(&text),
            Err(FormatError::InvalidRawLine {
                line: 3,
                text: "nope".to_string()
            })
        );
        let text = format!("{}\n1 2 3 4\n", HASH);
        assert!(parse_raw(&text).is_err());
    }
}
