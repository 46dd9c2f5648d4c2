// SPDX-License-Identifier: AGPL-3.0

#[cfg(test)]
mod tests {
    use nvcov_collector::{parse_raw, parse_trace, CoverageCollector};
    use nvcov_contract::{opcodes::*, ContractIdentity, Script};
    use nvcov_correlate::build_tree;
    use nvcov_debuginfo::ContractSymbols;
    use nvcov_report::{
        format_by_name, DirectorySink, MemorySink, RawFormat, ReportContext, FORMAT_NAMES,
    };
    use serde_json::json;

    const HASH: &str = "0xd2a4cff31913016155e38e474a2c06d08be276cf";

    fn symbols() -> ContractSymbols {
        ContractSymbols::from_json(&json!({
            "hash": HASH,
            "documents": ["Token.cs"],
            "methods": [{
                "id": "m0",
                "name": "Token,Main",
                "range": "0-9",
                "sequence-points": ["0[0]1:1-1:5", "5[0]2:1-2:5"]
            }]
        }))
        .unwrap()
    }

    fn script() -> Script {
        Script::new(vec![
            OP_PUSH1, OP_NOP, OP_NOP, OP_NOP, OP_NOP, OP_JMPIF, 0x07, OP_NOP, OP_NOP, OP_RET,
        ])
        .unwrap()
    }

    fn collector() -> CoverageCollector {
        let mut collector = CoverageCollector::new();
        let identity = collector.add_contract("Token", symbols(), None).unwrap();
        collector.register_script(&identity, script()).unwrap();
        collector
    }

    #[test]
    fn test_raw_dump_reproduces_counters() {
        let identity = ContractIdentity::parse(HASH).unwrap();

        let mut original = collector();
        let trace = format!("{}\n0\n0\n1\n5\n5 12 12\n5 12 5\n5 12 5\n9\n", HASH);
        original
            .apply_trace(&parse_trace(&trace, "run.trace").unwrap())
            .unwrap();

        let mut dump = Vec::new();
        RawFormat::render(&build_tree(original.get(&identity).unwrap()), &mut dump).unwrap();
        let raw = parse_raw(&String::from_utf8(dump).unwrap()).unwrap();

        let mut restored = collector();
        restored.apply_raw(&raw).unwrap();

        let before = original.get(&identity).unwrap();
        let after = restored.get(&identity).unwrap();
        assert_eq!(before.hits(), after.hits());
        assert_eq!(before.branches(), after.branches());
    }

    #[test]
    fn test_every_format_renders_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let identity = ContractIdentity::parse(HASH).unwrap();
        let collector = collector();
        let trees = vec![build_tree(collector.get(&identity).unwrap())];
        let context = ReportContext {
            timestamp: 0,
            source_roots: vec![dir.path().display().to_string()],
        };

        let mut memory = MemorySink::new();
        for name in FORMAT_NAMES {
            format_by_name(name)
                .unwrap()
                .write_report(&trees, &context, &mut memory)
                .unwrap();
        }

        let mut sink = DirectorySink::new(dir.path().join("reports"));
        for artifact in memory.artifacts() {
            sink.store(artifact).unwrap();
        }

        let reports = dir.path().join("reports");
        assert!(reports.join(format!("{}.raw.txt", HASH)).exists());
        assert!(reports.join("coverage.cobertura.xml").exists());
        assert!(reports.join("coverage.lcov").exists());
    }
}
