// SPDX-License-Identifier: AGPL-3.0

//! Configuration for coverage sessions
//!
//! Values come from the command line and an optional TOML file. The file
//! has a `[global]` table with the same keys as the command line options
//! and a `[[contract]]` array registering contracts:
//!
//! ```toml
//! [global]
//! coverage-dir = "coverage"
//! format = "raw,cobertura"
//!
//! [[contract]]
//! name = "Token"
//! debug-info = "bin/Token.nefdbgnfo"
//! hash = "0x5c1068339fae89eb1a743909d0213e1d99dc5dc9"
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nvcov_contract::ContractIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the project root
pub const DEFAULT_CONFIG_FILE: &str = "nvcov.toml";

/// A contract to collect coverage for, with its debug-info source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSource {
    pub name: String,
    #[serde(rename = "debug-info", alias = "debug_info")]
    pub debug_info: PathBuf,
    /// Expected identity; checked against the debug info when present
    #[serde(default)]
    pub hash: Option<String>,
}

impl ContractSource {
    /// Parse `NAME=PATH` or `NAME=PATH@0xHASH`
    pub fn parse(arg: &str) -> Result<Self> {
        let (name, rest) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid contract argument {:?}: expected NAME=PATH", arg))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Invalid contract argument {:?}: empty name", arg));
        }

        let (path, hash) = match rest.rsplit_once('@') {
            Some((path, hash)) if hash.starts_with("0x") || hash.starts_with("0X") => {
                (path, Some(hash.trim().to_string()))
            }
            _ => (rest, None),
        };

        let path = path.trim();
        if path.is_empty() {
            return Err(anyhow!("Invalid contract argument {:?}: empty path", arg));
        }

        let source = Self {
            name: name.to_string(),
            debug_info: PathBuf::from(path),
            hash,
        };
        source.identity()?;
        Ok(source)
    }

    /// Declared identity, if any
    pub fn identity(&self) -> Result<Option<ContractIdentity>> {
        self.hash
            .as_deref()
            .map(|hash| {
                ContractIdentity::parse(hash)
                    .with_context(|| format!("Invalid hash for contract {}", self.name))
            })
            .transpose()
    }

    /// Same source with its path resolved against `root`
    pub fn resolved(&self, root: &Path) -> Self {
        Self {
            debug_info: root.join(&self.debug_info),
            ..self.clone()
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[clap(
    name = "nvcov",
    version,
    about = "Code coverage for NeoVM smart contracts"
)]
pub struct Config {
    /// Project root directory
    #[clap(long, default_value = ".")]
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Path to the config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory holding trace files and script dumps
    #[clap(long, default_value = "coverage")]
    #[serde(default = "default_coverage_dir")]
    pub coverage_dir: PathBuf,

    /// Directory the reports are written to
    #[clap(long, short = 'o', default_value = "coverage-report")]
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Register a contract: NAME=PATH[@0xHASH] (repeatable)
    #[clap(long = "contract", value_name = "NAME=PATH[@0xHASH]")]
    #[serde(default)]
    pub contracts: Vec<String>,

    /// Contracts registered in the config file
    #[clap(skip)]
    #[serde(default)]
    pub file_contracts: Vec<ContractSource>,

    /// Report formats, comma separated (raw, cobertura, lcov)
    #[clap(long, default_value = "raw,cobertura")]
    #[serde(default = "default_format")]
    pub format: String,

    /// Source roots listed in the reports (repeatable)
    #[clap(long = "source-root")]
    #[serde(default)]
    pub source_roots: Vec<String>,

    /// Verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    #[serde(default)]
    pub verbose: u8,

    /// Write a JSON summary to this file
    #[clap(long)]
    pub json_output: Option<PathBuf>,
}

// Default value functions
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_coverage_dir() -> PathBuf {
    PathBuf::from("coverage")
}

fn default_output() -> PathBuf {
    PathBuf::from("coverage-report")
}

fn default_format() -> String {
    "raw,cobertura".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            config: None,
            coverage_dir: default_coverage_dir(),
            output: default_output(),
            contracts: Vec::new(),
            file_contracts: Vec::new(),
            format: default_format(),
            source_roots: Vec::new(),
            verbose: 0,
            json_output: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: TomlConfig = toml::from_str(content)?;
        parsed.to_config()
    }

    /// Merge with another configuration (command line overrides file config)
    pub fn merge(&mut self, other: Self) {
        if other.root != default_root() {
            self.root = other.root;
        }
        if other.config.is_some() {
            self.config = other.config;
        }
        if other.coverage_dir != default_coverage_dir() {
            self.coverage_dir = other.coverage_dir;
        }
        if other.output != default_output() {
            self.output = other.output;
        }
        if other.format != default_format() {
            self.format = other.format;
        }
        if other.verbose > 0 {
            self.verbose = other.verbose;
        }
        if other.json_output.is_some() {
            self.json_output = other.json_output;
        }
        self.contracts.extend(other.contracts);
        self.file_contracts.extend(other.file_contracts);
        self.source_roots.extend(other.source_roots);
    }

    /// Resolve config file path: explicit `--config`, else `nvcov.toml` in root
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(config) = &self.config {
            Some(config.clone())
        } else {
            let default_path = self.root.join(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Some(default_path)
            } else {
                None
            }
        }
    }

    pub fn coverage_path(&self) -> PathBuf {
        self.root.join(&self.coverage_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output)
    }

    /// Every registered contract, file entries first, paths resolved against root
    pub fn contract_sources(&self) -> Result<Vec<ContractSource>> {
        let mut sources: Vec<ContractSource> = self.file_contracts.clone();
        for arg in &self.contracts {
            sources.push(ContractSource::parse(arg)?);
        }

        for source in &sources {
            source.identity()?;
        }

        Ok(sources.iter().map(|s| s.resolved(&self.root)).collect())
    }

    /// Requested report formats
    pub fn formats(&self) -> Result<Vec<String>> {
        let formats = parse_csv(&self.format);
        if formats.is_empty() {
            return Err(anyhow!("Format list cannot be empty"));
        }
        Ok(formats)
    }
}

/// TOML configuration structure (for parsing from file)
#[derive(Debug, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    global: HashMap<String, toml::Value>,

    #[serde(default, rename = "contract")]
    contracts: Vec<ContractSource>,
}

impl TomlConfig {
    fn to_config(self) -> Result<Config> {
        let mut config = Config {
            file_contracts: self.contracts,
            ..Config::default()
        };

        for (key, value) in self.global {
            // Convert kebab-case to snake_case
            let key = key.replace('-', "_");

            match key.as_str() {
                "root" => config.root = parse_toml_path(&value)?,
                "coverage_dir" => config.coverage_dir = parse_toml_path(&value)?,
                "output" => config.output = parse_toml_path(&value)?,
                "format" => config.format = parse_toml_string(&value)?,
                "source_root" | "source_roots" => {
                    config.source_roots = parse_toml_string_list(&value)?
                }
                "verbose" => config.verbose = parse_toml_u8(&value)?,
                "json_output" => config.json_output = Some(parse_toml_path(&value)?),
                _ => {
                    tracing::debug!(key, "Ignoring unknown config key");
                }
            }
        }

        Ok(config)
    }
}

// TOML parsing helpers
fn parse_toml_string(value: &toml::Value) -> Result<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Expected string, got {:?}", value))
}

fn parse_toml_u8(value: &toml::Value) -> Result<u8> {
    value
        .as_integer()
        .and_then(|i| u8::try_from(i).ok())
        .ok_or_else(|| anyhow!("Expected u8, got {:?}", value))
}

fn parse_toml_path(value: &toml::Value) -> Result<PathBuf> {
    Ok(PathBuf::from(parse_toml_string(value)?))
}

/// A single string or an array of strings
fn parse_toml_string_list(value: &toml::Value) -> Result<Vec<String>> {
    match value.as_array() {
        Some(items) => items.iter().map(parse_toml_string).collect(),
        None => Ok(vec![parse_toml_string(value)?]),
    }
}

fn parse_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
