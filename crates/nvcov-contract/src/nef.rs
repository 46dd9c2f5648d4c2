// SPDX-License-Identifier: AGPL-3.0

//! NEF3 executable container
//!
//! Layout: magic, 64-byte compiler name, var-string source, reserved byte,
//! method tokens, reserved u16, var-bytes script, u32 checksum. The checksum
//! is the first four bytes of SHA256(SHA256(preceding bytes)).

use crate::identity::{ContractIdentity, IDENTITY_LENGTH};
use nvcov_exceptions::{FormatError, FormatResult};
use sha2::{Digest, Sha256};

/// "NEF3" read as a little-endian u32
pub const NEF_MAGIC: u32 = 0x3346_454E;

const COMPILER_LENGTH: usize = 64;
const MAX_SOURCE_LENGTH: usize = 256;
const MAX_TOKENS: usize = 128;
const MAX_METHOD_NAME_LENGTH: usize = 32;
const MAX_SCRIPT_LENGTH: usize = 512 * 1024;

/// A static call target declared in the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodToken {
    pub hash: ContractIdentity,
    pub method: String,
    pub parameters_count: u16,
    pub has_return_value: bool,
    pub call_flags: u8,
}

/// Parsed NEF3 container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NefFile {
    pub compiler: String,
    pub source: String,
    pub tokens: Vec<MethodToken>,
    pub script: Vec<u8>,
    pub checksum: u32,
}

impl NefFile {
    /// Parse and verify a container
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        let mut reader = Reader::new(data);

        let magic = reader.read_u32()?;
        if magic != NEF_MAGIC {
            return Err(invalid(format!("bad magic {:#010x}", magic)));
        }

        let compiler_bytes = reader.read_bytes(COMPILER_LENGTH)?;
        let compiler = String::from_utf8_lossy(compiler_bytes)
            .trim_end_matches('\0')
            .to_string();
        let source = reader.read_var_string(MAX_SOURCE_LENGTH)?;

        if reader.read_u8()? != 0 {
            return Err(invalid("reserved byte is not zero"));
        }

        let token_count = reader.read_var_int(MAX_TOKENS as u64)? as usize;
        let mut tokens = Vec::with_capacity(token_count);
        for _ in 0..token_count {
            tokens.push(reader.read_method_token()?);
        }

        if reader.read_u16()? != 0 {
            return Err(invalid("reserved word is not zero"));
        }

        let script_len = reader.read_var_int(MAX_SCRIPT_LENGTH as u64)? as usize;
        if script_len == 0 {
            return Err(invalid("script is empty"));
        }
        let script = reader.read_bytes(script_len)?.to_vec();

        let body_len = reader.position();
        let checksum = reader.read_u32()?;
        if reader.remaining() != 0 {
            return Err(invalid("trailing bytes after checksum"));
        }

        let expected = compute_checksum(&data[..body_len]);
        if checksum != expected {
            return Err(invalid(format!(
                "checksum mismatch: expected {:#010x}, found {:#010x}",
                expected, checksum
            )));
        }

        Ok(Self {
            compiler,
            source,
            tokens,
            script,
            checksum,
        })
    }

    /// Serialize the container, recomputing the checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&NEF_MAGIC.to_le_bytes());

        let mut compiler = [0u8; COMPILER_LENGTH];
        let name = self.compiler.as_bytes();
        let n = name.len().min(COMPILER_LENGTH);
        compiler[..n].copy_from_slice(&name[..n]);
        out.extend_from_slice(&compiler);

        write_var_bytes(&mut out, self.source.as_bytes());
        out.push(0);

        write_var_int(&mut out, self.tokens.len() as u64);
        for token in &self.tokens {
            out.extend_from_slice(&token.hash.to_bytes());
            write_var_bytes(&mut out, token.method.as_bytes());
            out.extend_from_slice(&token.parameters_count.to_le_bytes());
            out.push(u8::from(token.has_return_value));
            out.push(token.call_flags);
        }

        out.extend_from_slice(&0u16.to_le_bytes());
        write_var_bytes(&mut out, &self.script);

        let checksum = compute_checksum(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }
}

/// True when `data` starts with the NEF3 magic
pub fn is_nef(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == NEF_MAGIC.to_le_bytes()
}

/// Extract the script from a NEF container, or take bare script bytes as-is
pub fn load_script_bytes(data: Vec<u8>) -> FormatResult<Vec<u8>> {
    if is_nef(&data) {
        Ok(NefFile::parse(&data)?.script)
    } else {
        Ok(data)
    }
}

/// First four bytes of the double SHA-256 of `data`
pub fn compute_checksum(data: &[u8]) -> u32 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    u32::from_le_bytes([second[0], second[1], second[2], second[3]])
}

fn invalid(msg: impl Into<String>) -> FormatError {
    FormatError::InvalidNef(msg.into())
}

fn write_var_int(out: &mut Vec<u8>, value: u64) {
    if value < 0xFD {
        out.push(value as u8);
    } else if value <= 0xFFFF {
        out.push(0xFD);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xFFFF_FFFF {
        out.push(0xFE);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xFF);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_var_int(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Bounds-checked little-endian cursor
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, n: usize) -> FormatResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(invalid(format!(
                "unexpected end of data at {} (need {} bytes)",
                self.pos, n
            )));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> FormatResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> FormatResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> FormatResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> FormatResult<u64> {
        let b = self.read_bytes(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(b);
        Ok(u64::from_le_bytes(word))
    }

    fn read_var_int(&mut self, max: u64) -> FormatResult<u64> {
        let value = match self.read_u8()? {
            0xFD => u64::from(self.read_u16()?),
            0xFE => u64::from(self.read_u32()?),
            0xFF => self.read_u64()?,
            b => u64::from(b),
        };
        if value > max {
            return Err(invalid(format!("length {} exceeds limit {}", value, max)));
        }
        Ok(value)
    }

    fn read_var_string(&mut self, max: usize) -> FormatResult<String> {
        let len = self.read_var_int(max as u64)? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| invalid("string is not valid UTF-8"))
    }

    fn read_method_token(&mut self) -> FormatResult<MethodToken> {
        let hash = ContractIdentity::from_slice(self.read_bytes(IDENTITY_LENGTH)?)?;
        let method = self.read_var_string(MAX_METHOD_NAME_LENGTH)?;
        if method.starts_with('_') {
            return Err(invalid(format!("method token name {} is reserved", method)));
        }
        let parameters_count = self.read_u16()?;
        let has_return_value = match self.read_u8()? {
            0 => false,
            1 => true,
            b => return Err(invalid(format!("invalid boolean {}", b))),
        };
        let call_flags = self.read_u8()?;

        Ok(MethodToken {
            hash,
            method,
            parameters_count,
            has_return_value,
            call_flags,
        })
    }
}
