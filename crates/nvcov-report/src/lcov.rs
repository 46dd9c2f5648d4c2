// SPDX-License-Identifier: AGPL-3.0

//! LCOV tracefile report

use crate::{AttachmentSink, ReportContext, ReportFormat};
use nvcov_correlate::{ContractCoverageTree, MethodCoverage};
use std::collections::BTreeMap;
use std::io::{self, Write};

pub const LCOV_ARTIFACT: &str = "coverage.lcov";

#[derive(Debug, Clone, Copy, Default)]
pub struct LcovFormat;

impl LcovFormat {
    /// One record per source document of every contract
    pub fn generate(trees: &[ContractCoverageTree]) -> String {
        let mut lines = Vec::new();

        for tree in trees {
            for (document, methods) in tree.documents() {
                lines.push(format!("TN:{}", tree.name));
                lines.push(format!("SF:{}", document));
                Self::functions(&mut lines, &methods);
                Self::branches(&mut lines, &methods);
                Self::line_data(&mut lines, &methods);
                lines.push("end_of_record".to_string());
            }
        }

        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    fn functions(lines: &mut Vec<String>, methods: &[&MethodCoverage]) {
        for method in methods {
            let line = method.lines.first().map(|l| l.line()).unwrap_or(0);
            lines.push(format!("FN:{},{}.{}", line, method.namespace, method.name));
        }
        for method in methods {
            let hits = method.lines.first().map(|l| l.hit_count).unwrap_or(0);
            lines.push(format!("FNDA:{},{}.{}", hits, method.namespace, method.name));
        }
        lines.push(format!("FNF:{}", methods.len()));
        lines.push(format!(
            "FNH:{}",
            methods.iter().filter(|m| m.is_hit()).count()
        ));
    }

    fn branches(lines: &mut Vec<String>, methods: &[&MethodCoverage]) {
        let mut found = 0;
        let mut hit = 0;

        for line in methods.iter().flat_map(|m| &m.lines) {
            for (block, branch) in line.branches.iter().enumerate() {
                // taken, then fall-through
                let outcomes = [branch.counts.branch_count, branch.counts.continue_count];
                for (index, count) in outcomes.into_iter().enumerate() {
                    let taken = if line.hit_count == 0 && branch.counts.is_empty() {
                        "-".to_string()
                    } else {
                        count.to_string()
                    };
                    lines.push(format!("BRDA:{},{},{},{}", line.line(), block, index, taken));
                    found += 1;
                    if count > 0 {
                        hit += 1;
                    }
                }
            }
        }

        lines.push(format!("BRF:{}", found));
        lines.push(format!("BRH:{}", hit));
    }

    /// Sequence points sharing a source line report the largest count
    fn line_data(lines: &mut Vec<String>, methods: &[&MethodCoverage]) {
        let mut data: BTreeMap<u32, u32> = BTreeMap::new();
        for line in methods.iter().flat_map(|m| &m.lines) {
            let entry = data.entry(line.line()).or_insert(0);
            *entry = (*entry).max(line.hit_count);
        }

        for (line_number, count) in &data {
            lines.push(format!("DA:{},{}", line_number, count));
        }
        lines.push(format!("LF:{}", data.len()));
        lines.push(format!(
            "LH:{}",
            data.values().filter(|&&count| count > 0).count()
        ));
    }
}

impl ReportFormat for LcovFormat {
    fn name(&self) -> &'static str {
        "lcov"
    }

    fn write_report(
        &self,
        trees: &[ContractCoverageTree],
        _context: &ReportContext,
        sink: &mut dyn AttachmentSink,
    ) -> io::Result<()> {
        let text = Self::generate(trees);
        sink.attach(LCOV_ARTIFACT, &mut |out| out.write_all(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tree;

    #[test]
    fn test_record_layout() {
        let text = LcovFormat::generate(&[tree(|c| {
            c.record_hit(0).unwrap();
            c.record_branch(5, 12, 12).unwrap();
        })]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "TN:Token & Co",
                "SF:src/Token.cs",
                "FN:10,Demo.Token.Transfer",
                "FNDA:1,Demo.Token.Transfer",
                "FNF:1",
                "FNH:1",
                "BRDA:11,0,0,1",
                "BRDA:11,0,1,0",
                "BRF:2",
                "BRH:1",
                "DA:10,1",
                "DA:11,0",
                "LF:2",
                "LH:1",
                "end_of_record",
            ]
        );
    }

    #[test]
    fn test_unreached_branch_uses_dash() {
        let text = LcovFormat::generate(&[tree(|_| {})]);
        assert!(text.contains("BRDA:11,0,0,-\n"));
        assert!(text.contains("BRDA:11,0,1,-\n"));
        assert!(text.contains("FNH:0\n"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(LcovFormat::generate(&[]), "");
    }
}
