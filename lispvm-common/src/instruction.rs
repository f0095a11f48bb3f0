use num_traits::{FromPrimitive, ToPrimitive};

use crate::isa::Opcode;

/// The number of bytes a single instruction occupies on the wire: one
/// opcode byte followed by an 8-byte little-endian operand.
pub const INSTRUCTION_SIZE: usize = 9;

/// An opcode paired with its (possibly unused) operand. This is the
/// generator's in-memory representation before serialization; `Opcode`
/// carries its own static spec (`operand_kind`, `class`, `pops`, `pushes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operand: u64,
}

impl Instruction {
    pub fn new(op: Opcode, operand: u64) -> Self {
        Self { op, operand }
    }

    pub fn bare(op: Opcode) -> Self {
        Self { op, operand: 0 }
    }

    /// Serialize to the 9-byte wire format: `[opcode][operand:u64 LE]`.
    pub fn to_bytes(&self) -> [u8; INSTRUCTION_SIZE] {
        let mut bytes = [0u8; INSTRUCTION_SIZE];
        bytes[0] = self.op.to_u8().expect("opcode fits in a byte");
        bytes[1..9].copy_from_slice(&self.operand.to_le_bytes());
        bytes
    }

    /// Decode a 9-byte slice back into an `Instruction`. Returns `None` if
    /// the opcode byte is outside the fixed 32-opcode range.
    pub fn from_bytes(bytes: &[u8; INSTRUCTION_SIZE]) -> Option<Self> {
        let op = Opcode::from_u8(bytes[0])?;
        let mut operand_bytes = [0u8; 8];
        operand_bytes.copy_from_slice(&bytes[1..9]);
        Some(Self {
            op,
            operand: u64::from_le_bytes(operand_bytes),
        })
    }
}
