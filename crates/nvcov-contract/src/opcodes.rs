// SPDX-License-Identifier: AGPL-3.0

//! NeoVM opcode table
//!
//! Operand widths are a pure function of the opcode byte. Only the three
//! PUSHDATA forms carry a length prefix; every other opcode has a fixed width
//! taken from [`OPERAND_WIDTHS`], and opcodes missing from it have width 0.

// Constants
pub const OP_PUSHINT8: u8 = 0x00;
pub const OP_PUSHINT16: u8 = 0x01;
pub const OP_PUSHINT32: u8 = 0x02;
pub const OP_PUSHINT64: u8 = 0x03;
pub const OP_PUSHINT128: u8 = 0x04;
pub const OP_PUSHINT256: u8 = 0x05;
pub const OP_PUSHT: u8 = 0x08;
pub const OP_PUSHF: u8 = 0x09;
pub const OP_PUSHA: u8 = 0x0A;
pub const OP_PUSHNULL: u8 = 0x0B;
pub const OP_PUSHDATA1: u8 = 0x0C;
pub const OP_PUSHDATA2: u8 = 0x0D;
pub const OP_PUSHDATA4: u8 = 0x0E;
pub const OP_PUSHM1: u8 = 0x0F;
pub const OP_PUSH0: u8 = 0x10;
pub const OP_PUSH1: u8 = 0x11;
pub const OP_PUSH2: u8 = 0x12;
pub const OP_PUSH3: u8 = 0x13;
pub const OP_PUSH4: u8 = 0x14;
pub const OP_PUSH5: u8 = 0x15;
pub const OP_PUSH6: u8 = 0x16;
pub const OP_PUSH7: u8 = 0x17;
pub const OP_PUSH8: u8 = 0x18;
pub const OP_PUSH9: u8 = 0x19;
pub const OP_PUSH10: u8 = 0x1A;
pub const OP_PUSH11: u8 = 0x1B;
pub const OP_PUSH12: u8 = 0x1C;
pub const OP_PUSH13: u8 = 0x1D;
pub const OP_PUSH14: u8 = 0x1E;
pub const OP_PUSH15: u8 = 0x1F;
pub const OP_PUSH16: u8 = 0x20;

// Flow control
pub const OP_NOP: u8 = 0x21;
pub const OP_JMP: u8 = 0x22;
pub const OP_JMP_L: u8 = 0x23;
pub const OP_JMPIF: u8 = 0x24;
pub const OP_JMPIF_L: u8 = 0x25;
pub const OP_JMPIFNOT: u8 = 0x26;
pub const OP_JMPIFNOT_L: u8 = 0x27;
pub const OP_JMPEQ: u8 = 0x28;
pub const OP_JMPEQ_L: u8 = 0x29;
pub const OP_JMPNE: u8 = 0x2A;
pub const OP_JMPNE_L: u8 = 0x2B;
pub const OP_JMPGT: u8 = 0x2C;
pub const OP_JMPGT_L: u8 = 0x2D;
pub const OP_JMPGE: u8 = 0x2E;
pub const OP_JMPGE_L: u8 = 0x2F;
pub const OP_JMPLT: u8 = 0x30;
pub const OP_JMPLT_L: u8 = 0x31;
pub const OP_JMPLE: u8 = 0x32;
pub const OP_JMPLE_L: u8 = 0x33;
pub const OP_CALL: u8 = 0x34;
pub const OP_CALL_L: u8 = 0x35;
pub const OP_CALLA: u8 = 0x36;
pub const OP_CALLT: u8 = 0x37;
pub const OP_ABORT: u8 = 0x38;
pub const OP_ASSERT: u8 = 0x39;
pub const OP_THROW: u8 = 0x3A;
pub const OP_TRY: u8 = 0x3B;
pub const OP_TRY_L: u8 = 0x3C;
pub const OP_ENDTRY: u8 = 0x3D;
pub const OP_ENDTRY_L: u8 = 0x3E;
pub const OP_ENDFINALLY: u8 = 0x3F;
pub const OP_RET: u8 = 0x40;
pub const OP_SYSCALL: u8 = 0x41;

// Stack
pub const OP_DEPTH: u8 = 0x43;
pub const OP_DROP: u8 = 0x45;
pub const OP_NIP: u8 = 0x46;
pub const OP_XDROP: u8 = 0x48;
pub const OP_CLEAR: u8 = 0x49;
pub const OP_DUP: u8 = 0x4A;
pub const OP_OVER: u8 = 0x4B;
pub const OP_PICK: u8 = 0x4D;
pub const OP_TUCK: u8 = 0x4E;
pub const OP_SWAP: u8 = 0x50;
pub const OP_ROT: u8 = 0x51;
pub const OP_ROLL: u8 = 0x52;
pub const OP_REVERSE3: u8 = 0x53;
pub const OP_REVERSE4: u8 = 0x54;
pub const OP_REVERSEN: u8 = 0x55;

// Slots
pub const OP_INITSSLOT: u8 = 0x56;
pub const OP_INITSLOT: u8 = 0x57;
pub const OP_LDSFLD0: u8 = 0x58;
pub const OP_LDSFLD: u8 = 0x5F;
pub const OP_STSFLD0: u8 = 0x60;
pub const OP_STSFLD: u8 = 0x67;
pub const OP_LDLOC0: u8 = 0x68;
pub const OP_LDLOC: u8 = 0x6F;
pub const OP_STLOC0: u8 = 0x70;
pub const OP_STLOC: u8 = 0x77;
pub const OP_LDARG0: u8 = 0x78;
pub const OP_LDARG: u8 = 0x7F;
pub const OP_STARG0: u8 = 0x80;
pub const OP_STARG: u8 = 0x87;

// Splice
pub const OP_NEWBUFFER: u8 = 0x88;
pub const OP_MEMCPY: u8 = 0x89;
pub const OP_CAT: u8 = 0x8B;
pub const OP_SUBSTR: u8 = 0x8C;
pub const OP_LEFT: u8 = 0x8D;
pub const OP_RIGHT: u8 = 0x8E;

// Bitwise logic
pub const OP_INVERT: u8 = 0x90;
pub const OP_AND: u8 = 0x91;
pub const OP_OR: u8 = 0x92;
pub const OP_XOR: u8 = 0x93;
pub const OP_EQUAL: u8 = 0x97;
pub const OP_NOTEQUAL: u8 = 0x98;

// Arithmetic
pub const OP_SIGN: u8 = 0x99;
pub const OP_ABS: u8 = 0x9A;
pub const OP_NEGATE: u8 = 0x9B;
pub const OP_INC: u8 = 0x9C;
pub const OP_DEC: u8 = 0x9D;
pub const OP_ADD: u8 = 0x9E;
pub const OP_SUB: u8 = 0x9F;
pub const OP_MUL: u8 = 0xA0;
pub const OP_DIV: u8 = 0xA1;
pub const OP_MOD: u8 = 0xA2;
pub const OP_POW: u8 = 0xA3;
pub const OP_SQRT: u8 = 0xA4;
pub const OP_MODMUL: u8 = 0xA5;
pub const OP_MODPOW: u8 = 0xA6;
pub const OP_SHL: u8 = 0xA8;
pub const OP_SHR: u8 = 0xA9;
pub const OP_NOT: u8 = 0xAA;
pub const OP_BOOLAND: u8 = 0xAB;
pub const OP_BOOLOR: u8 = 0xAC;
pub const OP_NZ: u8 = 0xB1;
pub const OP_NUMEQUAL: u8 = 0xB3;
pub const OP_NUMNOTEQUAL: u8 = 0xB4;
pub const OP_LT: u8 = 0xB5;
pub const OP_LE: u8 = 0xB6;
pub const OP_GT: u8 = 0xB7;
pub const OP_GE: u8 = 0xB8;
pub const OP_MIN: u8 = 0xB9;
pub const OP_MAX: u8 = 0xBA;
pub const OP_WITHIN: u8 = 0xBB;

// Compound types
pub const OP_PACKMAP: u8 = 0xBE;
pub const OP_PACKSTRUCT: u8 = 0xBF;
pub const OP_PACK: u8 = 0xC0;
pub const OP_UNPACK: u8 = 0xC1;
pub const OP_NEWARRAY0: u8 = 0xC2;
pub const OP_NEWARRAY: u8 = 0xC3;
pub const OP_NEWARRAY_T: u8 = 0xC4;
pub const OP_NEWSTRUCT0: u8 = 0xC5;
pub const OP_NEWSTRUCT: u8 = 0xC6;
pub const OP_NEWMAP: u8 = 0xC8;
pub const OP_SIZE: u8 = 0xCA;
pub const OP_HASKEY: u8 = 0xCB;
pub const OP_KEYS: u8 = 0xCC;
pub const OP_VALUES: u8 = 0xCD;
pub const OP_PICKITEM: u8 = 0xCE;
pub const OP_APPEND: u8 = 0xCF;
pub const OP_SETITEM: u8 = 0xD0;
pub const OP_REVERSEITEMS: u8 = 0xD1;
pub const OP_REMOVE: u8 = 0xD2;
pub const OP_CLEARITEMS: u8 = 0xD3;
pub const OP_POPITEM: u8 = 0xD4;

// Types
pub const OP_ISNULL: u8 = 0xD8;
pub const OP_ISTYPE: u8 = 0xD9;
pub const OP_CONVERT: u8 = 0xDB;

// Extensions
pub const OP_ABORTMSG: u8 = 0xE0;
pub const OP_ASSERTMSG: u8 = 0xE1;

/// How the operand of an opcode is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSize {
    /// Operand of exactly this many bytes
    Fixed(usize),
    /// Little-endian length prefix of this many bytes, then the payload
    Prefix(usize),
}

/// Fixed operand widths indexed by opcode
pub static OPERAND_WIDTHS: [u8; 256] = build_operand_widths();

const fn build_operand_widths() -> [u8; 256] {
    let mut table = [0u8; 256];

    table[OP_PUSHINT8 as usize] = 1;
    table[OP_PUSHINT16 as usize] = 2;
    table[OP_PUSHINT32 as usize] = 4;
    table[OP_PUSHINT64 as usize] = 8;
    table[OP_PUSHINT128 as usize] = 16;
    table[OP_PUSHINT256 as usize] = 32;
    table[OP_PUSHA as usize] = 4;

    // short jumps are even, long jumps odd
    let mut op = OP_JMP;
    while op <= OP_JMPLE_L {
        table[op as usize] = if (op - OP_JMP) % 2 == 0 { 1 } else { 4 };
        op += 1;
    }

    table[OP_CALL as usize] = 1;
    table[OP_CALL_L as usize] = 4;
    table[OP_CALLT as usize] = 2;
    table[OP_TRY as usize] = 2;
    table[OP_TRY_L as usize] = 8;
    table[OP_ENDTRY as usize] = 1;
    table[OP_ENDTRY_L as usize] = 4;
    table[OP_SYSCALL as usize] = 4;

    table[OP_INITSSLOT as usize] = 1;
    table[OP_INITSLOT as usize] = 2;
    table[OP_LDSFLD as usize] = 1;
    table[OP_STSFLD as usize] = 1;
    table[OP_LDLOC as usize] = 1;
    table[OP_STLOC as usize] = 1;
    table[OP_LDARG as usize] = 1;
    table[OP_STARG as usize] = 1;

    table[OP_NEWARRAY_T as usize] = 1;
    table[OP_ISTYPE as usize] = 1;
    table[OP_CONVERT as usize] = 1;

    table
}

/// Returns how the operand of `opcode` is sized
pub fn operand_size(opcode: u8) -> OperandSize {
    match opcode {
        OP_PUSHDATA1 => OperandSize::Prefix(1),
        OP_PUSHDATA2 => OperandSize::Prefix(2),
        OP_PUSHDATA4 => OperandSize::Prefix(4),
        _ => OperandSize::Fixed(OPERAND_WIDTHS[opcode as usize] as usize),
    }
}

/// True for every jump and call opcode carrying a relative target, short or long form
pub fn is_branch(opcode: u8) -> bool {
    (OP_JMP..=OP_CALL_L).contains(&opcode)
}

/// True for the 4-byte-offset form of a jump or call
pub fn is_long_branch(opcode: u8) -> bool {
    is_branch(opcode) && (opcode - OP_JMP) % 2 == 1
}

/// Returns a human-readable mnemonic for an opcode
pub fn mnemonic(opcode: u8) -> String {
    let name = match opcode {
        OP_PUSHINT8 => "PUSHINT8",
        OP_PUSHINT16 => "PUSHINT16",
        OP_PUSHINT32 => "PUSHINT32",
        OP_PUSHINT64 => "PUSHINT64",
        OP_PUSHINT128 => "PUSHINT128",
        OP_PUSHINT256 => "PUSHINT256",
        OP_PUSHT => "PUSHT",
        OP_PUSHF => "PUSHF",
        OP_PUSHA => "PUSHA",
        OP_PUSHNULL => "PUSHNULL",
        OP_PUSHDATA1 => "PUSHDATA1",
        OP_PUSHDATA2 => "PUSHDATA2",
        OP_PUSHDATA4 => "PUSHDATA4",
        OP_PUSHM1 => "PUSHM1",
        n @ OP_PUSH0..=OP_PUSH16 => return format!("PUSH{}", n - OP_PUSH0),
        OP_NOP => "NOP",
        OP_JMP => "JMP",
        OP_JMP_L => "JMP_L",
        OP_JMPIF => "JMPIF",
        OP_JMPIF_L => "JMPIF_L",
        OP_JMPIFNOT => "JMPIFNOT",
        OP_JMPIFNOT_L => "JMPIFNOT_L",
        OP_JMPEQ => "JMPEQ",
        OP_JMPEQ_L => "JMPEQ_L",
        OP_JMPNE => "JMPNE",
        OP_JMPNE_L => "JMPNE_L",
        OP_JMPGT => "JMPGT",
        OP_JMPGT_L => "JMPGT_L",
        OP_JMPGE => "JMPGE",
        OP_JMPGE_L => "JMPGE_L",
        OP_JMPLT => "JMPLT",
        OP_JMPLT_L => "JMPLT_L",
        OP_JMPLE => "JMPLE",
        OP_JMPLE_L => "JMPLE_L",
        OP_CALL => "CALL",
        OP_CALL_L => "CALL_L",
        OP_CALLA => "CALLA",
        OP_CALLT => "CALLT",
        OP_ABORT => "ABORT",
        OP_ASSERT => "ASSERT",
        OP_THROW => "THROW",
        OP_TRY => "TRY",
        OP_TRY_L => "TRY_L",
        OP_ENDTRY => "ENDTRY",
        OP_ENDTRY_L => "ENDTRY_L",
        OP_ENDFINALLY => "ENDFINALLY",
        OP_RET => "RET",
        OP_SYSCALL => "SYSCALL",
        OP_DEPTH => "DEPTH",
        OP_DROP => "DROP",
        OP_NIP => "NIP",
        OP_XDROP => "XDROP",
        OP_CLEAR => "CLEAR",
        OP_DUP => "DUP",
        OP_OVER => "OVER",
        OP_PICK => "PICK",
        OP_TUCK => "TUCK",
        OP_SWAP => "SWAP",
        OP_ROT => "ROT",
        OP_ROLL => "ROLL",
        OP_REVERSE3 => "REVERSE3",
        OP_REVERSE4 => "REVERSE4",
        OP_REVERSEN => "REVERSEN",
        OP_INITSSLOT => "INITSSLOT",
        OP_INITSLOT => "INITSLOT",
        n @ OP_LDSFLD0..=0x5E => return format!("LDSFLD{}", n - OP_LDSFLD0),
        OP_LDSFLD => "LDSFLD",
        n @ OP_STSFLD0..=0x66 => return format!("STSFLD{}", n - OP_STSFLD0),
        OP_STSFLD => "STSFLD",
        n @ OP_LDLOC0..=0x6E => return format!("LDLOC{}", n - OP_LDLOC0),
        OP_LDLOC => "LDLOC",
        n @ OP_STLOC0..=0x76 => return format!("STLOC{}", n - OP_STLOC0),
        OP_STLOC => "STLOC",
        n @ OP_LDARG0..=0x7E => return format!("LDARG{}", n - OP_LDARG0),
        OP_LDARG => "LDARG",
        n @ OP_STARG0..=0x86 => return format!("STARG{}", n - OP_STARG0),
        OP_STARG => "STARG",
        OP_NEWBUFFER => "NEWBUFFER",
        OP_MEMCPY => "MEMCPY",
        OP_CAT => "CAT",
        OP_SUBSTR => "SUBSTR",
        OP_LEFT => "LEFT",
        OP_RIGHT => "RIGHT",
        OP_INVERT => "INVERT",
        OP_AND => "AND",
        OP_OR => "OR",
        OP_XOR => "XOR",
        OP_EQUAL => "EQUAL",
        OP_NOTEQUAL => "NOTEQUAL",
        OP_SIGN => "SIGN",
        OP_ABS => "ABS",
        OP_NEGATE => "NEGATE",
        OP_INC => "INC",
        OP_DEC => "DEC",
        OP_ADD => "ADD",
        OP_SUB => "SUB",
        OP_MUL => "MUL",
        OP_DIV => "DIV",
        OP_MOD => "MOD",
        OP_POW => "POW",
        OP_SQRT => "SQRT",
        OP_MODMUL => "MODMUL",
        OP_MODPOW => "MODPOW",
        OP_SHL => "SHL",
        OP_SHR => "SHR",
        OP_NOT => "NOT",
        OP_BOOLAND => "BOOLAND",
        OP_BOOLOR => "BOOLOR",
        OP_NZ => "NZ",
        OP_NUMEQUAL => "NUMEQUAL",
        OP_NUMNOTEQUAL => "NUMNOTEQUAL",
        OP_LT => "LT",
        OP_LE => "LE",
        OP_GT => "GT",
        OP_GE => "GE",
        OP_MIN => "MIN",
        OP_MAX => "MAX",
        OP_WITHIN => "WITHIN",
        OP_PACKMAP => "PACKMAP",
        OP_PACKSTRUCT => "PACKSTRUCT",
        OP_PACK => "PACK",
        OP_UNPACK => "UNPACK",
        OP_NEWARRAY0 => "NEWARRAY0",
        OP_NEWARRAY => "NEWARRAY",
        OP_NEWARRAY_T => "NEWARRAY_T",
        OP_NEWSTRUCT0 => "NEWSTRUCT0",
        OP_NEWSTRUCT => "NEWSTRUCT",
        OP_NEWMAP => "NEWMAP",
        OP_SIZE => "SIZE",
        OP_HASKEY => "HASKEY",
        OP_KEYS => "KEYS",
        OP_VALUES => "VALUES",
        OP_PICKITEM => "PICKITEM",
        OP_APPEND => "APPEND",
        OP_SETITEM => "SETITEM",
        OP_REVERSEITEMS => "REVERSEITEMS",
        OP_REMOVE => "REMOVE",
        OP_CLEARITEMS => "CLEARITEMS",
        OP_POPITEM => "POPITEM",
        OP_ISNULL => "ISNULL",
        OP_ISTYPE => "ISTYPE",
        OP_CONVERT => "CONVERT",
        OP_ABORTMSG => "ABORTMSG",
        OP_ASSERTMSG => "ASSERTMSG",
        _ => return format!("0x{:02x}", opcode),
    };
    name.to_string()
}
