// SPDX-License-Identifier: AGPL-3.0

#[cfg(test)]
mod tests {
    use nvcov_collector::{read_trace_file, BranchCount, CoverageCollector};
    use nvcov_contract::ContractIdentity;
    use nvcov_debuginfo::ContractSymbols;
    use serde_json::json;
    use std::collections::BTreeMap;

    const TOKEN: &str = "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9";
    const ORACLE: &str = "0xd2a4cff31913016155e38e474a2c06d08be276cf";
    const UNKNOWN: &str = "0xffffffffffffffffffffffffffffffffffffffff";

    fn symbols(hash: &str) -> ContractSymbols {
        ContractSymbols::from_json(&json!({
            "hash": hash,
            "documents": ["A.cs"],
            "methods": []
        }))
        .unwrap()
    }

    fn collector() -> CoverageCollector {
        let mut collector = CoverageCollector::new();
        collector.add_contract("Token", symbols(TOKEN), None).unwrap();
        collector.add_contract("Oracle", symbols(ORACLE), None).unwrap();
        collector
    }

    #[test]
    fn test_interleaved_contracts_in_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.trace");
        let text = [
            TOKEN, "1", "2", ORACLE, "7", "9 20 9", UNKNOWN, "1", "1", "3 4 4", TOKEN, "1",
        ]
        .join("\n");
        std::fs::write(&path, text).unwrap();

        let mut collector = collector();
        let stats = collector
            .apply_trace(&read_trace_file(&path).unwrap())
            .unwrap();
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.branches, 1);
        assert_eq!(stats.ignored, 3);

        let token = collector
            .get(&ContractIdentity::parse(TOKEN).unwrap())
            .unwrap();
        assert_eq!(token.hits(), &BTreeMap::from([(1, 2), (2, 1)]));
        assert!(token.branches().is_empty());

        let oracle = collector
            .get(&ContractIdentity::parse(ORACLE).unwrap())
            .unwrap();
        assert_eq!(oracle.hits(), &BTreeMap::from([(7, 1)]));
        assert_eq!(oracle.branch_count(9), BranchCount::new(0, 1));
    }

    #[test]
    fn test_contracts_iterate_in_identity_order() {
        let collector = collector();
        let names: Vec<&str> = collector.contracts().map(|c| c.name()).collect();
        // 0x5c... sorts before 0xd2... on the most significant word
        assert_eq!(names, vec!["Token", "Oracle"]);
    }
}
