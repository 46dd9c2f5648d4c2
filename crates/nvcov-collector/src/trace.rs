// SPDX-License-Identifier: AGPL-3.0

//! Trace file parsing
//!
//! A trace is line oriented. A line starting with `0x` selects the contract
//! that following lines belong to; `<address>` is a plain hit and
//! `<address> <offset> <result>` a branch outcome. A `0x` line that is not a
//! valid hash still ends the current contract, so the lines after it are
//! dropped. Other unparseable lines are skipped with a warning. A branch whose result matches neither the
//! address nor the offset rejects the whole file.

use anyhow::{Context, Result};
use nvcov_contract::ContractIdentity;
use nvcov_exceptions::{FormatError, FormatResult};
use nvcov_logs::{warn_code, ErrorCode};
use std::path::Path;

/// Extension of trace files in the coverage directory
pub const TRACE_EXTENSION: &str = "trace";

/// One parsed trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    Identity(ContractIdentity),
    /// A `0x` line that does not parse as a contract hash
    UnknownIdentity,
    Hit(u32),
    Branch { address: u32, offset: u32, result: u32 },
}

/// Parse a single line. `Ok(None)` means the line is blank or unparseable.
pub fn parse_line(line: &str) -> FormatResult<Option<TraceRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if line.starts_with("0x") || line.starts_with("0X") {
        let record = match ContractIdentity::parse(line) {
            Ok(identity) => TraceRecord::Identity(identity),
            Err(_) => TraceRecord::UnknownIdentity,
        };
        return Ok(Some(record));
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let numbers: Option<Vec<u32>> = fields.iter().map(|f| f.parse::<u32>().ok()).collect();

    let record = match numbers.as_deref() {
        Some([address]) => Some(TraceRecord::Hit(*address)),
        Some([address, offset, result]) => {
            if result != address && result != offset {
                return Err(FormatError::BranchResultMismatch {
                    address: *address,
                    offset: *offset,
                    result: *result,
                });
            }
            Some(TraceRecord::Branch {
                address: *address,
                offset: *offset,
                result: *result,
            })
        }
        _ => None,
    };

    Ok(record)
}

/// Parse a complete trace. `source` only labels warnings.
pub fn parse_trace(text: &str, source: &str) -> Result<Vec<TraceRecord>> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        match parse_line(line).with_context(|| format!("{}:{}", source, line_no))? {
            Some(TraceRecord::UnknownIdentity) => {
                warn_code(
                    ErrorCode::ParsingError,
                    &format!("{}:{}: invalid contract hash {:?}", source, line_no, line),
                );
                records.push(TraceRecord::UnknownIdentity);
            }
            Some(record) => records.push(record),
            None if line.trim().is_empty() => {}
            None => warn_code(
                ErrorCode::ParsingError,
                &format!("{}:{}: ignoring unparseable line {:?}", source, line_no, line),
            ),
        }
    }

    Ok(records)
}

/// Read and parse a trace file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    parse_trace(&text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9";

    #[test]
    fn test_parse_line_kinds() {
        assert_eq!(parse_line("  ").unwrap(), None);
        assert_eq!(parse_line("12").unwrap(), Some(TraceRecord::Hit(12)));
        assert_eq!(
            parse_line("5 12 12").unwrap(),
            Some(TraceRecord::Branch {
                address: 5,
                offset: 12,
                result: 12
            })
        );
        assert!(matches!(
            parse_line(HASH).unwrap(),
            Some(TraceRecord::Identity(_))
        ));
    }

    #[test]
    fn test_parse_line_unparseable() {
        for line in ["abc", "1 2", "1 2 3 4", "-1", "5 x 5"] {
            assert_eq!(parse_line(line).unwrap(), None, "{}", line);
        }
    }

    #[test]
    fn test_parse_line_invalid_hash() {
        let short = &HASH[..HASH.len() - 1];
        for line in ["0xnothex", short, "0x"] {
            assert_eq!(
                parse_line(line).unwrap(),
                Some(TraceRecord::UnknownIdentity),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_parse_line_branch_mismatch() {
        assert_eq!(
            parse_line("5 12 7"),
            Err(FormatError::BranchResultMismatch {
                address: 5,
                offset: 12,
                result: 7
            })
        );
    }

    #[test]
    fn test_parse_trace_skips_garbage() {
        let text = format!("{}\n0\ngarbage\n\n5 12 5\n", HASH);
        let records = parse_trace(&text, "t.trace").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], TraceRecord::Hit(0));
    }

    #[test]
    fn test_parse_trace_rejects_file_on_mismatch() {
        let text = format!("{}\n0\n5 12 9\n", HASH);
        let err = parse_trace(&text, "t.trace").unwrap_err();
        assert!(err.to_string().contains("t.trace:3"));
    }

    #[test]
    fn test_read_trace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.trace");
        std::fs::write(&path, format!("{}\n1\n", HASH)).unwrap();
        assert_eq!(read_trace_file(&path).unwrap().len(), 2);
        assert!(read_trace_file(&dir.path().join("missing.trace")).is_err());
    }
}
