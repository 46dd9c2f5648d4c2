// SPDX-License-Identifier: AGPL-3.0

//! Debug symbol model
//!
//! Values here are produced once per contract by [`ContractSymbols::from_json`]
//! (or the file loader in [`loader`]) and only read afterwards.

pub mod loader;

use nvcov_contract::ContractIdentity;
use nvcov_exceptions::{FormatError, FormatResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub use loader::{load_debug_info, parse_debug_info};

/// `address[document]startLine:startColumn-endLine:endColumn`
static SEQUENCE_POINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\[(\d+)\](\d+):(\d+)-(\d+):(\d+)$").expect("sequence point pattern")
});

/// `start-end`
static RANGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("range pattern"));

/// Line and column in a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

/// Mapping from an instruction boundary to a source span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequencePoint {
    pub address: u32,
    pub document: usize,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SequencePoint {
    /// Parse the `address[document]line:col-line:col` encoding
    pub fn parse(text: &str) -> FormatResult<Self> {
        let invalid = || FormatError::InvalidSequencePoint(text.to_string());
        let caps = SEQUENCE_POINT_REGEX.captures(text).ok_or_else(invalid)?;

        let number = |i: usize| -> FormatResult<u32> {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .ok_or_else(invalid)
        };

        Ok(Self {
            address: number(1)?,
            document: number(2)? as usize,
            start: SourcePosition {
                line: number(3)?,
                column: number(4)?,
            },
            end: SourcePosition {
                line: number(5)?,
                column: number(6)?,
            },
        })
    }
}

/// Inclusive address range of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressRange {
    pub start: u32,
    pub end: u32,
}

impl AddressRange {
    /// Parse the `start-end` encoding
    pub fn parse(text: &str) -> FormatResult<Self> {
        let invalid = || FormatError::InvalidRange(text.to_string());
        let caps = RANGE_REGEX.captures(text).ok_or_else(invalid)?;

        let start = caps[1].parse::<u32>().map_err(|_| invalid())?;
        let end = caps[2].parse::<u32>().map_err(|_| invalid())?;
        if start > end {
            return Err(invalid());
        }

        Ok(Self { start, end })
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub index: u32,
}

impl Parameter {
    /// Parse `name,type[,index]`; `position` is used when the index is absent
    pub fn parse(text: &str, position: usize) -> FormatResult<Self> {
        let invalid = || FormatError::InvalidParameter(text.to_string());
        let parts: Vec<&str> = text.split(',').collect();

        let (name, type_name, index) = match parts.as_slice() {
            [name, type_name] => (*name, *type_name, position as u32),
            [name, type_name, index] => {
                let index = index.trim().parse::<u32>().map_err(|_| invalid())?;
                (*name, *type_name, index)
            }
            _ => return Err(invalid()),
        };

        if name.is_empty() || type_name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            index,
        })
    }
}

/// A method with its source mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub range: AddressRange,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Sorted by address ascending
    pub sequence_points: Vec<SequencePoint>,
}

impl Method {
    /// Parse one entry of the `methods` array
    pub fn from_json(value: &Value) -> FormatResult<Self> {
        let id = required_str(value, "id")?.to_string();

        let full_name = required_str(value, "name")?;
        let (namespace, name) = full_name
            .split_once(',')
            .filter(|(_, name)| !name.is_empty() && !name.contains(','))
            .ok_or_else(|| FormatError::InvalidMethodName(full_name.to_string()))?;

        let range = AddressRange::parse(required_str(value, "range")?)?;

        let parameters = optional_str_array(value, "params")?
            .iter()
            .enumerate()
            .map(|(i, p)| Parameter::parse(p, i))
            .collect::<FormatResult<Vec<_>>>()?;

        let return_type = value
            .get("return")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut sequence_points = optional_str_array(value, "sequence-points")?
            .iter()
            .map(|sp| SequencePoint::parse(sp))
            .collect::<FormatResult<Vec<_>>>()?;
        sequence_points.sort_by_key(|sp| sp.address);

        Ok(Self {
            id,
            namespace: namespace.to_string(),
            name: name.to_string(),
            range,
            parameters,
            return_type,
            sequence_points,
        })
    }
}

/// Decoded debug symbol table of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSymbols {
    pub identity: ContractIdentity,
    pub document_root: Option<String>,
    pub documents: Vec<String>,
    pub methods: Vec<Method>,
}

impl ContractSymbols {
    /// Walk a parsed debug-info JSON tree
    pub fn from_json(value: &Value) -> FormatResult<Self> {
        let identity = ContractIdentity::parse(required_str(value, "hash")?)?;

        let documents = required_str_array(value, "documents")?
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let document_root = value
            .get("document-root")
            .and_then(Value::as_str)
            .filter(|root| !root.is_empty())
            .map(str::to_string);

        let methods = value
            .get("methods")
            .and_then(Value::as_array)
            .ok_or(FormatError::MissingField("methods"))?
            .iter()
            .map(Method::from_json)
            .collect::<FormatResult<Vec<_>>>()?;

        for method in &methods {
            for sp in &method.sequence_points {
                if sp.document >= documents.len() {
                    return Err(FormatError::DocumentIndexOutOfRange {
                        index: sp.document,
                        count: documents.len(),
                    });
                }
            }
        }

        Ok(Self {
            identity,
            document_root,
            documents,
            methods,
        })
    }

    /// Document path, joined to the document root when one is declared
    pub fn document_path(&self, index: usize) -> Option<String> {
        let document = self.documents.get(index)?;
        Some(match &self.document_root {
            Some(root) if !is_absolute(document) => {
                format!("{}/{}", root.trim_end_matches(['/', '\\']), document)
            }
            _ => document.clone(),
        })
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || path.get(1..2) == Some(":")
}

fn required_str<'a>(value: &'a Value, key: &'static str) -> FormatResult<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingField(key))
}

fn required_str_array<'a>(value: &'a Value, key: &'static str) -> FormatResult<Vec<&'a str>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingField(key))?
        .iter()
        .map(|v| v.as_str().ok_or(FormatError::MissingField(key)))
        .collect()
}

fn optional_str_array<'a>(value: &'a Value, key: &'static str) -> FormatResult<Vec<&'a str>> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => required_str_array(value, key),
    }
}
