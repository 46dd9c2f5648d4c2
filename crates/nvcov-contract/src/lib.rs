// SPDX-License-Identifier: AGPL-3.0

//! NeoVM script model: opcodes, instruction decoding, contract identity and
//! the NEF container that carries a script.

pub mod identity;
pub mod instruction;
pub mod nef;
pub mod opcodes;

pub use identity::{ContractIdentity, IDENTITY_LENGTH};
pub use instruction::{decode_all, decode_at, Instruction, Instructions, Script};
pub use nef::{is_nef, load_script_bytes, MethodToken, NefFile};
pub use opcodes::{is_branch, mnemonic, operand_size, OperandSize};
