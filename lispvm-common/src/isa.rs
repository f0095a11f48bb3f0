use enum_assoc::Assoc;
use num_derive::{FromPrimitive, ToPrimitive};
use strum_macros::{Display, EnumString};

/// What an opcode's 64-bit operand means, if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    U64,
    Address,
}

/// The four dispatch classes the VM's fetch-execute loop switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Arithmetic,
    Logic,
    Transfer,
    Control,
}

/// Sentinel stack-effect value for the handful of opcodes (`NDUP`, `NROT`,
/// `NTUCK`) whose pop/push counts depend on their operand rather than being
/// fixed per opcode.
pub const VARIABLE_STACK_EFFECT: i8 = -1;

/// The fixed 32-operation instruction set. Indices are part of the wire
/// format (opcode byte 0 of each 9-byte instruction) and must not be
/// reordered.
#[allow(non_camel_case_types)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, FromPrimitive, ToPrimitive, EnumString, Display, Assoc)]
#[strum(serialize_all = "lowercase")]
#[func(pub const fn operand_kind(&self) -> OperandKind)]
#[func(pub const fn class(&self) -> OperationKind)]
#[func(pub const fn pops(&self) -> i8)]
#[func(pub const fn pushes(&self) -> i8)]
#[repr(u8)]
pub enum Opcode {
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    ADD = 0,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    SUB = 1,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    MUL = 2,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    DIV = 3,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    MOD = 4,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 1)]
    #[assoc(pushes = 1)]
    INC = 5,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 1)]
    #[assoc(pushes = 1)]
    DEC = 6,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    MAX = 7,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Arithmetic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    MIN = 8,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Logic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    LT = 9,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Logic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    LE = 10,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Logic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    EQ = 11,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Logic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    GE = 12,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Logic)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 1)]
    GT = 13,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 1)]
    #[assoc(pushes = 0)]
    DROP = 14,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 1)]
    #[assoc(pushes = 2)]
    DUP = 15,
    #[assoc(operand_kind = OperandKind::U64)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = VARIABLE_STACK_EFFECT)]
    #[assoc(pushes = VARIABLE_STACK_EFFECT)]
    NDUP = 16,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 2)]
    SWAP = 17,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 3)]
    #[assoc(pushes = 3)]
    ROT = 18,
    #[assoc(operand_kind = OperandKind::U64)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = VARIABLE_STACK_EFFECT)]
    #[assoc(pushes = VARIABLE_STACK_EFFECT)]
    NROT = 19,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 2)]
    #[assoc(pushes = 3)]
    TUCK = 20,
    #[assoc(operand_kind = OperandKind::U64)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = VARIABLE_STACK_EFFECT)]
    #[assoc(pushes = VARIABLE_STACK_EFFECT)]
    NTUCK = 21,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 1)]
    SIZE = 22,
    #[assoc(operand_kind = OperandKind::U64)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 1)]
    NRND = 23,
    #[assoc(operand_kind = OperandKind::U64)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 1)]
    PUSH = 24,
    #[assoc(operand_kind = OperandKind::Address)]
    #[assoc(class = OperationKind::Transfer)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 1)]
    FETCH = 25,
    #[assoc(operand_kind = OperandKind::Address)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 0)]
    CALL = 26,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 0)]
    RET = 27,
    #[assoc(operand_kind = OperandKind::Address)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 0)]
    JMP = 28,
    #[assoc(operand_kind = OperandKind::Address)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 1)]
    #[assoc(pushes = 0)]
    CJMP = 29,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 0)]
    WAIT = 30,
    #[assoc(operand_kind = OperandKind::None)]
    #[assoc(class = OperationKind::Control)]
    #[assoc(pops = 0)]
    #[assoc(pushes = 0)]
    HALT = 31,
}

pub const OPCODE_COUNT: u8 = 32;

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{FromPrimitive, ToPrimitive};

    #[test]
    fn opcode_byte_round_trips() {
        for byte in 0..OPCODE_COUNT {
            let op = Opcode::from_u8(byte).expect("valid opcode byte");
            assert_eq!(op.to_u8(), Some(byte));
        }
    }

    #[test]
    fn out_of_range_byte_has_no_opcode() {
        assert_eq!(Opcode::from_u8(OPCODE_COUNT), None);
    }

    #[test]
    fn mnemonics_are_lowercase() {
        assert_eq!(Opcode::ADD.to_string(), "add");
        assert_eq!(Opcode::HALT.to_string(), "halt");
    }

    #[test]
    fn classes_match_the_isa_table() {
        assert_eq!(Opcode::ADD.class(), OperationKind::Arithmetic);
        assert_eq!(Opcode::LT.class(), OperationKind::Logic);
        assert_eq!(Opcode::PUSH.class(), OperationKind::Transfer);
        assert_eq!(Opcode::CALL.class(), OperationKind::Control);
    }

    #[test]
    fn fixed_arity_pops_and_pushes_match_the_isa_table() {
        assert_eq!(Opcode::ADD.pops(), 2);
        assert_eq!(Opcode::ADD.pushes(), 1);
        assert_eq!(Opcode::DROP.pops(), 1);
        assert_eq!(Opcode::DROP.pushes(), 0);
        assert_eq!(Opcode::CJMP.pops(), 1);
    }
}
