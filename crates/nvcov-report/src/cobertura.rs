// SPDX-License-Identifier: AGPL-3.0

//! Cobertura XML report
//!
//! ```xml
//! <coverage line-rate="0.5000" branch-rate="1.0000" version="1.9" timestamp="...">
//!   <sources><source>/repo</source></sources>
//!   <packages>
//!     <package name="Token">              <!-- one per contract -->
//!       <classes>
//!         <class name="Demo.Token">       <!-- one per namespace -->
//!           <methods><method name="Transfer">...</method></methods>
//!           <lines>...</lines>
//!         </class>
//!       </classes>
//!     </package>
//!   </packages>
//! </coverage>
//! ```

use crate::{escape_xml, AttachmentSink, ReportContext, ReportFormat};
use nvcov_correlate::{
    branch_rate_of, line_rate_of, ContractCoverageTree, LineCoverage, MethodCoverage, Rate,
};
use std::fmt::Write as _;
use std::io::{self, Write};

pub const COBERTURA_ARTIFACT: &str = "coverage.cobertura.xml";
const COBERTURA_VERSION: &str = "1.9";

#[derive(Debug, Clone, Copy, Default)]
pub struct CoberturaFormat;

impl CoberturaFormat {
    pub fn generate(trees: &[ContractCoverageTree], context: &ReportContext) -> String {
        let line_rate: Rate = trees.iter().map(ContractCoverageTree::line_rate).sum();
        let branch_rate: Rate = trees.iter().map(ContractCoverageTree::branch_rate).sum();

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">"#,
        );
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<coverage line-rate="{}" branch-rate="{}" lines-covered="{}" lines-valid="{}" branches-covered="{}" branches-valid="{}" complexity="0" version="{}" timestamp="{}">"#,
            line_rate,
            branch_rate,
            line_rate.covered,
            line_rate.total,
            branch_rate.covered,
            branch_rate.total,
            COBERTURA_VERSION,
            context.timestamp,
        );

        xml.push_str("  <sources>\n");
        for root in &context.source_roots {
            let _ = writeln!(xml, "    <source>{}</source>", escape_xml(root));
        }
        xml.push_str("  </sources>\n");

        xml.push_str("  <packages>\n");
        for tree in trees {
            Self::write_package(&mut xml, tree);
        }
        xml.push_str("  </packages>\n");
        xml.push_str("</coverage>\n");

        xml
    }

    fn write_package(xml: &mut String, tree: &ContractCoverageTree) {
        let _ = writeln!(
            xml,
            r#"    <package name="{}" line-rate="{}" branch-rate="{}" complexity="0">"#,
            escape_xml(&tree.name),
            tree.line_rate(),
            tree.branch_rate(),
        );
        xml.push_str("      <classes>\n");

        for (namespace, methods) in tree.classes() {
            let filename = methods
                .first()
                .map(|m| m.document.as_str())
                .unwrap_or_default();

            let _ = writeln!(
                xml,
                r#"        <class name="{}" filename="{}" line-rate="{}" branch-rate="{}" complexity="0">"#,
                escape_xml(namespace),
                escape_xml(filename),
                line_rate_of(&methods),
                branch_rate_of(&methods),
            );

            xml.push_str("          <methods>\n");
            for method in &methods {
                Self::write_method(xml, method);
            }
            xml.push_str("          </methods>\n");

            xml.push_str("          <lines>\n");
            for line in methods.iter().flat_map(|m| &m.lines) {
                Self::write_line(xml, line, "            ");
            }
            xml.push_str("          </lines>\n");
            xml.push_str("        </class>\n");
        }

        xml.push_str("      </classes>\n");
        xml.push_str("    </package>\n");
    }

    fn write_method(xml: &mut String, method: &MethodCoverage) {
        let _ = writeln!(
            xml,
            r#"            <method name="{}" signature="{}" line-rate="{}" branch-rate="{}" complexity="0">"#,
            escape_xml(&method.name),
            escape_xml(&method.signature()),
            method.line_rate(),
            method.branch_rate(),
        );
        xml.push_str("              <lines>\n");
        for line in &method.lines {
            Self::write_line(xml, line, "                ");
        }
        xml.push_str("              </lines>\n");
        xml.push_str("            </method>\n");
    }

    fn write_line(xml: &mut String, line: &LineCoverage, indent: &str) {
        let _ = write!(
            xml,
            r#"{}<line number="{}" hits="{}" branch="{}""#,
            indent,
            line.line(),
            line.hit_count,
            line.is_branch_covered(),
        );

        if line.has_branches() {
            let rate = line.branch_rate();
            let _ = write!(
                xml,
                r#" condition-coverage="{}% ({}/{})""#,
                rate.basis_points() / 100,
                rate.covered,
                rate.total,
            );
        }

        xml.push_str("/>\n");
    }
}

impl ReportFormat for CoberturaFormat {
    fn name(&self) -> &'static str {
        "cobertura"
    }

    fn write_report(
        &self,
        trees: &[ContractCoverageTree],
        context: &ReportContext,
        sink: &mut dyn AttachmentSink,
    ) -> io::Result<()> {
        let xml = Self::generate(trees, context);
        sink.attach(COBERTURA_ARTIFACT, &mut |out| out.write_all(xml.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tree;
    use crate::MemorySink;

    fn context() -> ReportContext {
        ReportContext {
            timestamp: 1_700_000_000,
            source_roots: vec!["/repo".to_string()],
        }
    }

    #[test]
    fn test_header_and_sources() {
        let xml = CoberturaFormat::generate(&[tree(|_| {})], &context());
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"version="1.9" timestamp="1700000000""#));
        assert!(xml.contains("<source>/repo</source>"));
        assert!(xml.ends_with("</coverage>\n"));
    }

    #[test]
    fn test_half_covered_method() {
        let xml = CoberturaFormat::generate(
            &[tree(|c| {
                c.record_hit(0).unwrap();
            })],
            &context(),
        );
        assert!(xml.contains(r#"<coverage line-rate="0.5000""#));
        assert!(xml.contains(r#"<method name="Transfer" signature="Transfer(Hash160, Integer)" line-rate="0.5000""#));
        assert!(xml.contains(r#"<line number="10" hits="1" branch="false"/>"#));
    }

    #[test]
    fn test_branch_flag_with_two_outcomes() {
        let xml = CoberturaFormat::generate(
            &[tree(|c| {
                c.record_branch(5, 12, 12).unwrap();
                c.record_branch(5, 12, 5).unwrap();
            })],
            &context(),
        );
        assert!(xml.contains(
            r#"<line number="11" hits="0" branch="true" condition-coverage="100% (2/2)"/>"#
        ));
    }

    #[test]
    fn test_branch_flag_with_one_outcome() {
        let xml = CoberturaFormat::generate(
            &[tree(|c| {
                c.record_branch(5, 12, 5).unwrap();
            })],
            &context(),
        );
        assert!(xml.contains(
            r#"<line number="11" hits="0" branch="false" condition-coverage="50% (1/2)"/>"#
        ));
    }

    #[test]
    fn test_names_are_escaped() {
        let xml = CoberturaFormat::generate(&[tree(|_| {})], &context());
        assert!(xml.contains(r#"<package name="Token &amp; Co""#));
        assert!(xml.contains(r#"<class name="Demo.Token" filename="src/Token.cs""#));
    }

    #[test]
    fn test_empty_session_is_valid() {
        let xml = CoberturaFormat::generate(&[], &ReportContext::default());
        assert!(xml.contains(r#"line-rate="1.0000""#));
        assert!(xml.contains("<packages>\n  </packages>"));
    }

    #[test]
    fn test_write_report() {
        let mut sink = MemorySink::new();
        CoberturaFormat
            .write_report(&[tree(|_| {})], &context(), &mut sink)
            .unwrap();
        assert_eq!(sink.artifacts().len(), 1);
        assert_eq!(sink.artifacts()[0].name, COBERTURA_ARTIFACT);
    }
}
