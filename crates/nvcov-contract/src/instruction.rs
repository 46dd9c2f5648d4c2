// SPDX-License-Identifier: AGPL-3.0

//! Instruction decoding
//!
//! Decoding is table driven: the size of an instruction depends only on its
//! opcode, except for the PUSHDATA forms whose length prefix is read. Any
//! read past the end of the buffer is an error.

use crate::opcodes::{is_branch, is_long_branch, mnemonic, operand_size, OperandSize};
use nvcov_exceptions::{DecodeError, DecodeResult};
use std::fmt;

/// A decoded instruction borrowing its operand from the script buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    pub operand: &'a [u8],
    pub size: usize,
}

impl<'a> Instruction<'a> {
    /// True for jumps and calls with a relative target
    pub fn is_branch(&self) -> bool {
        is_branch(self.opcode)
    }

    /// Target of a jump or call located at `address`
    pub fn target_address(&self, address: u32) -> Option<u32> {
        if !self.is_branch() {
            return None;
        }

        let offset = if is_long_branch(self.opcode) {
            let bytes: [u8; 4] = self.operand.try_into().ok()?;
            i64::from(i32::from_le_bytes(bytes))
        } else {
            i64::from(*self.operand.first()? as i8)
        };

        u32::try_from(i64::from(address) + offset).ok()
    }

    /// Mnemonic of the opcode
    pub fn mnemonic(&self) -> String {
        mnemonic(self.opcode)
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operand.is_empty() {
            write!(f, "{}", self.mnemonic())
        } else {
            write!(f, "{} 0x{}", self.mnemonic(), hex::encode(self.operand))
        }
    }
}

/// Decode the instruction starting at `address`
pub fn decode_at(buffer: &[u8], address: usize) -> DecodeResult<Instruction<'_>> {
    let length = buffer.len();
    if address >= length {
        return Err(DecodeError::OutOfRange { address, length });
    }

    let opcode = buffer[address];
    let start = address + 1;

    let (operand_start, operand_len) = match operand_size(opcode) {
        OperandSize::Fixed(width) => (start, width),
        OperandSize::Prefix(width) => {
            let available = length - start;
            if available < width {
                return Err(DecodeError::TruncatedPrefix {
                    address,
                    needed: width,
                    available,
                });
            }

            let mut prefix = [0u8; 4];
            prefix[..width].copy_from_slice(&buffer[start..start + width]);
            let payload = u32::from_le_bytes(prefix) as usize;
            (start + width, payload)
        }
    };

    let available = length - operand_start;
    if operand_len > available {
        return Err(DecodeError::TruncatedOperand {
            address,
            needed: operand_len,
            available,
        });
    }

    let operand_end = operand_start + operand_len;
    Ok(Instruction {
        opcode,
        operand: &buffer[operand_start..operand_end],
        size: operand_end - address,
    })
}

/// Decode the whole buffer from address 0
///
/// Each call starts over; the iterator stops after yielding the first error.
pub fn decode_all(buffer: &[u8]) -> Instructions<'_> {
    Instructions {
        buffer,
        address: 0,
        failed: false,
    }
}

/// Lazy iterator over `(address, instruction)` pairs
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    buffer: &'a [u8],
    address: usize,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = DecodeResult<(u32, Instruction<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.address >= self.buffer.len() {
            return None;
        }

        let Ok(address) = u32::try_from(self.address) else {
            self.failed = true;
            return Some(Err(DecodeError::ScriptTooLarge(self.buffer.len())));
        };

        match decode_at(self.buffer, self.address) {
            Ok(insn) => {
                self.address += insn.size;
                Some(Ok((address, insn)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// An owned, fully validated script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    bytes: Vec<u8>,
    addresses: Vec<u32>,
}

impl Script {
    /// Validate `bytes` by decoding every instruction once
    pub fn new(bytes: Vec<u8>) -> DecodeResult<Self> {
        let addresses = decode_all(&bytes)
            .map(|item| item.map(|(address, _)| address))
            .collect::<DecodeResult<Vec<_>>>()?;

        Ok(Self { bytes, addresses })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Start address of every instruction, ascending
    pub fn addresses(&self) -> &[u32] {
        &self.addresses
    }

    /// Every instruction in address order
    pub fn instructions(&self) -> impl Iterator<Item = (u32, Instruction<'_>)> + '_ {
        self.decode_addresses(&self.addresses)
    }

    /// Instructions whose start address lies in `start..=end`
    pub fn instructions_in(
        &self,
        start: u32,
        end: u32,
    ) -> impl Iterator<Item = (u32, Instruction<'_>)> + '_ {
        let lo = self.addresses.partition_point(|&a| a < start);
        let hi = self.addresses.partition_point(|&a| a <= end).max(lo);
        self.decode_addresses(&self.addresses[lo..hi])
    }

    fn decode_addresses<'s>(
        &'s self,
        addresses: &'s [u32],
    ) -> impl Iterator<Item = (u32, Instruction<'s>)> + 's {
        addresses.iter().filter_map(move |&address| {
            decode_at(&self.bytes, address as usize)
                .ok()
                .map(|insn| (address, insn))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_simple() {
        let script = [OP_PUSH1, OP_PUSHINT8, 0x7f, OP_RET];
        let insn = decode_at(&script, 1).unwrap();
        assert_eq!(insn.opcode, OP_PUSHINT8);
        assert_eq!(insn.operand, &[0x7f]);
        assert_eq!(insn.size, 2);
    }

    #[test]
    fn test_decode_out_of_range() {
        let script = [OP_RET];
        assert_eq!(
            decode_at(&script, 1),
            Err(DecodeError::OutOfRange {
                address: 1,
                length: 1
            })
        );
    }

    #[test]
    fn test_decode_truncated_operand() {
        let script = [OP_PUSHINT32, 0x01, 0x02];
        assert!(matches!(
            decode_at(&script, 0),
            Err(DecodeError::TruncatedOperand { needed: 4, available: 2, .. })
        ));
    }

    #[test]
    fn test_decode_truncated_prefix() {
        let script = [OP_PUSHDATA2, 0x01];
        assert!(matches!(
            decode_at(&script, 0),
            Err(DecodeError::TruncatedPrefix { needed: 2, available: 1, .. })
        ));
    }

    #[test]
    fn test_decode_pushdata_payload_past_end() {
        let script = [OP_PUSHDATA1, 0x05, 0xaa, 0xbb];
        assert!(matches!(
            decode_at(&script, 0),
            Err(DecodeError::TruncatedOperand { needed: 5, available: 2, .. })
        ));
    }

    #[test]
    fn test_decode_all_stops_after_error() {
        let script = [OP_NOP, OP_PUSHINT16, 0x01];
        let items: Vec<_> = decode_all(&script).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_target_address() {
        let script = [OP_NOP, OP_JMPIF, 0xff, OP_JMP_L, 0x10, 0x00, 0x00, 0x00];
        let short = decode_at(&script, 1).unwrap();
        assert_eq!(short.target_address(1), Some(0));

        let long = decode_at(&script, 3).unwrap();
        assert_eq!(long.target_address(3), Some(0x13));

        let nop = decode_at(&script, 0).unwrap();
        assert_eq!(nop.target_address(0), None);
    }

    #[test]
    fn test_display() {
        let script = [OP_PUSHINT16, 0x34, 0x12, OP_RET];
        assert_eq!(decode_at(&script, 0).unwrap().to_string(), "PUSHINT16 0x3412");
        assert_eq!(decode_at(&script, 3).unwrap().to_string(), "RET");
    }

    #[test]
    fn test_script_instructions_in_window() {
        // 0: PUSH1, 1: JMPIF +3, 3: PUSH2, 4: RET
        let script = Script::new(vec![OP_PUSH1, OP_JMPIF, 0x03, OP_PUSH2, OP_RET]).unwrap();
        assert_eq!(script.addresses(), &[0, 1, 3, 4]);

        let window: Vec<u32> = script.instructions_in(1, 3).map(|(a, _)| a).collect();
        assert_eq!(window, vec![1, 3]);

        let empty: Vec<u32> = script.instructions_in(4, 2).map(|(a, _)| a).collect();
        assert!(empty.is_empty());

        let (_, jmpif) = script.instructions().nth(1).unwrap();
        assert_eq!(jmpif.opcode, OP_JMPIF);
    }

    #[test]
    fn test_script_rejects_truncated() {
        assert!(Script::new(vec![OP_PUSHINT64, 0, 0]).is_err());
    }

    proptest! {
        #[test]
        fn prop_fixed_width_size(opcode in any::<u8>(), tail in prop::collection::vec(any::<u8>(), 32..64)) {
            prop_assume!(!matches!(opcode, OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4));
            let width = OPERAND_WIDTHS[opcode as usize] as usize;

            let mut buffer = vec![opcode];
            buffer.extend_from_slice(&tail);

            let insn = decode_at(&buffer, 0).unwrap();
            prop_assert_eq!(insn.size, 1 + width);
            prop_assert_eq!(insn.operand, &tail[..width]);
        }

        #[test]
        fn prop_prefixed_size(which in 0usize..3, payload in prop::collection::vec(any::<u8>(), 0..300)) {
            let (opcode, width) = [(OP_PUSHDATA1, 1usize), (OP_PUSHDATA2, 2), (OP_PUSHDATA4, 4)][which];
            prop_assume!(width > 1 || payload.len() < 256);

            let mut buffer = vec![opcode];
            buffer.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..width]);
            buffer.extend_from_slice(&payload);
            buffer.push(OP_RET);

            let insn = decode_at(&buffer, 0).unwrap();
            prop_assert_eq!(insn.size, 1 + width + payload.len());
            prop_assert_eq!(insn.operand, payload.as_slice());
        }

        #[test]
        fn prop_decode_all_is_restartable(buffer in prop::collection::vec(any::<u8>(), 0..200)) {
            let first: Vec<_> = decode_all(&buffer).collect();
            let second: Vec<_> = decode_all(&buffer).collect();
            prop_assert_eq!(first, second);
        }
    }
}
