// SPDX-License-Identifier: AGPL-3.0

//! Report formats
//!
//! Every format consumes the same slice of coverage trees and writes named
//! artifacts into an [`AttachmentSink`]. Formats are independent of each
//! other; adding one means implementing [`ReportFormat`] and listing it in
//! [`format_by_name`].

pub mod cobertura;
pub mod lcov;
pub mod raw;
pub mod sink;

use nvcov_correlate::ContractCoverageTree;
use std::io;

pub use cobertura::CoberturaFormat;
pub use lcov::LcovFormat;
pub use raw::RawFormat;
pub use sink::{Artifact, AttachmentSink, DirectorySink, MemorySink, WriteFn};

/// Names accepted by [`format_by_name`]
pub const FORMAT_NAMES: &[&str] = &["raw", "cobertura", "lcov"];

/// Session-wide values shared by every format
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub source_roots: Vec<String>,
}

pub trait ReportFormat: Send + Sync {
    fn name(&self) -> &'static str;

    fn write_report(
        &self,
        trees: &[ContractCoverageTree],
        context: &ReportContext,
        sink: &mut dyn AttachmentSink,
    ) -> io::Result<()>;
}

/// Look up a format by its configuration name
pub fn format_by_name(name: &str) -> Option<Box<dyn ReportFormat>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "raw" => Some(Box::new(RawFormat)),
        "cobertura" => Some(Box::new(CoberturaFormat)),
        "lcov" => Some(Box::new(LcovFormat)),
        _ => None,
    }
}

/// Escape text for XML attribute and element content
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use nvcov_collector::ContractCoverage;
    use nvcov_contract::{opcodes::*, Script};
    use nvcov_correlate::{build_tree, ContractCoverageTree};
    use nvcov_debuginfo::ContractSymbols;
    use serde_json::json;

    pub const HASH: &str = "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9";

    /// One method, lines at 0 and 5, JMPIF at 5 targeting 12
    pub fn coverage() -> ContractCoverage {
        let symbols = ContractSymbols::from_json(&json!({
            "hash": HASH,
            "documents": ["src/Token.cs"],
            "methods": [
                {
                    "id": "m0",
                    "name": "Demo.Token,Transfer",
                    "range": "0-9",
                    "params": ["to,Hash160", "amount,Integer"],
                    "sequence-points": ["0[0]10:5-10:20", "5[0]11:5-11:30"]
                },
                {
                    "id": "m1",
                    "name": "Demo.Token,Unmapped",
                    "range": "10-10"
                }
            ]
        }))
        .unwrap();

        let mut coverage = ContractCoverage::new("Token & Co", symbols);
        coverage
            .register_script(
                Script::new(vec![
                    OP_PUSH1, OP_NOP, OP_NOP, OP_NOP, OP_NOP, OP_JMPIF, 0x07, OP_NOP, OP_NOP,
                    OP_RET, OP_RET,
                ])
                .unwrap(),
            )
            .unwrap();
        coverage
    }

    pub fn tree(f: impl FnOnce(&mut ContractCoverage)) -> ContractCoverageTree {
        let mut coverage = coverage();
        f(&mut coverage);
        build_tree(&coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_by_name() {
        for name in FORMAT_NAMES {
            assert_eq!(format_by_name(name).unwrap().name(), *name);
        }
        assert_eq!(format_by_name(" Cobertura ").unwrap().name(), "cobertura");
        assert!(format_by_name("html").is_none());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}
