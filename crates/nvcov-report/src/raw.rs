// SPDX-License-Identifier: AGPL-3.0

//! Raw per-address dump, one artifact per contract

use crate::{AttachmentSink, ReportContext, ReportFormat};
use nvcov_correlate::ContractCoverageTree;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormat;

impl RawFormat {
    pub fn artifact_name(tree: &ContractCoverageTree) -> String {
        format!("{}.raw.txt", tree.identity)
    }

    /// Identity line, then every known address in ascending order
    pub fn render(tree: &ContractCoverageTree, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", tree.identity)?;

        for entry in &tree.addresses {
            match entry.branch {
                Some(branch) => {
                    writeln!(
                        out,
                        "{} {} {}",
                        entry.address, branch.branch_count, branch.continue_count
                    )?;
                    if entry.hit_count > 0 {
                        writeln!(out, "{} {}", entry.address, entry.hit_count)?;
                    }
                }
                None => writeln!(out, "{} {}", entry.address, entry.hit_count)?,
            }
        }

        Ok(())
    }
}

impl ReportFormat for RawFormat {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn write_report(
        &self,
        trees: &[ContractCoverageTree],
        _context: &ReportContext,
        sink: &mut dyn AttachmentSink,
    ) -> io::Result<()> {
        for tree in trees {
            sink.attach(&Self::artifact_name(tree), &mut |out| Self::render(tree, out))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{tree, HASH};
    use crate::MemorySink;

    fn render(tree: &ContractCoverageTree) -> String {
        let mut out = Vec::new();
        RawFormat::render(tree, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_untouched_addresses_are_listed() {
        let text = render(&tree(|_| {}));
        let expected = format!(
            "{}\n0 0\n1 0\n2 0\n3 0\n4 0\n5 0 0\n7 0\n8 0\n9 0\n10 0\n",
            HASH
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_counts() {
        let text = render(&tree(|c| {
            c.record_hit(0).unwrap();
            c.record_hit(0).unwrap();
            c.record_hit(5).unwrap();
            c.record_branch(5, 12, 12).unwrap();
        }));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "0 2");
        assert_eq!(lines[6], "5 1 0");
        assert_eq!(lines[7], "5 1");
    }

    #[test]
    fn test_one_artifact_per_contract() {
        let mut sink = MemorySink::new();
        RawFormat
            .write_report(&[tree(|_| {})], &ReportContext::default(), &mut sink)
            .unwrap();
        let artifact = &sink.artifacts()[0];
        assert_eq!(artifact.name, format!("{}.raw.txt", HASH));
        assert!(artifact.text().starts_with(HASH));
    }
}
