// SPDX-License-Identifier: AGPL-3.0

//! Read debug info from disk
//!
//! Two encodings are accepted: plain `.debug.json` files and `.nefdbgnfo`
//! zip archives holding a single JSON entry.

use crate::ContractSymbols;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Extension of the compressed debug-info container
pub const ARCHIVE_EXTENSION: &str = "nefdbgnfo";

/// Suffix of the JSON entry inside the archive
const JSON_SUFFIX: &str = ".debug.json";

/// Load and parse the debug info at `path`
pub fn load_debug_info(path: &Path) -> Result<ContractSymbols> {
    let mut bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("Failed to open debug info {}", path.display()))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read debug info {}", path.display()))?;

    let symbols = parse_debug_info(&bytes)
        .with_context(|| format!("Failed to parse debug info {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        contract = %symbols.identity,
        methods = symbols.methods.len(),
        "Loaded debug info"
    );

    Ok(symbols)
}

/// Parse debug info from memory, detecting the zip container by its magic
pub fn parse_debug_info(bytes: &[u8]) -> Result<ContractSymbols> {
    let json = if bytes.starts_with(b"PK\x03\x04") {
        extract_json_entry(bytes)?
    } else {
        bytes.to_vec()
    };

    let value: serde_json::Value = serde_json::from_slice(&json)?;
    Ok(ContractSymbols::from_json(&value)?)
}

/// Pull the `.debug.json` entry out of an archive, falling back to the only entry
fn extract_json_entry(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .map(|entry| entry.name().ends_with(JSON_SUFFIX))
                .unwrap_or(false)
        })
        .or(if archive.len() == 1 { Some(0) } else { None })
        .ok_or_else(|| anyhow!("No {} entry in debug info archive", JSON_SUFFIX))?;

    let mut entry = archive.by_index(index)?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const DEBUG_JSON: &str = r#"{
        "hash": "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9",
        "documents": ["Token.cs"],
        "methods": [
            {
                "id": "m0",
                "name": "Token,Main",
                "range": "0-3",
                "sequence-points": ["0[0]1:1-1:10"]
            }
        ]
    }"#;

    fn zipped(entry_name: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(entry_name, FileOptions::default()).unwrap();
        writer.write_all(DEBUG_JSON.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_plain_json() {
        let symbols = parse_debug_info(DEBUG_JSON.as_bytes()).unwrap();
        assert_eq!(symbols.methods.len(), 1);
    }

    #[test]
    fn test_parse_archive() {
        let symbols = parse_debug_info(&zipped("Token.debug.json")).unwrap();
        assert_eq!(symbols.methods[0].name, "Main");
    }

    #[test]
    fn test_parse_archive_single_entry_any_name() {
        assert!(parse_debug_info(&zipped("contract.json")).is_ok());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_debug_info(b"not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("Token.{}", ARCHIVE_EXTENSION));
        std::fs::write(&path, zipped("Token.debug.json")).unwrap();

        let symbols = load_debug_info(&path).unwrap();
        assert_eq!(symbols.documents, vec!["Token.cs".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_debug_info(Path::new("/nonexistent/Token.nefdbgnfo")).unwrap_err();
        assert!(err.to_string().contains("Failed to open debug info"));
    }
}
