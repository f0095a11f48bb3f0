use thiserror::Error;

use crate::ast::{BindingId, ScopeId};

/// Errors raised by the scoper's two passes (§4.1).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("ill-formed form: {detail}")]
    IllFormed { detail: String },

    #[error("unresolved name `{name}` in scope {scope_id}")]
    UnresolvedName { name: String, scope_id: ScopeId },
}

/// Errors raised while lowering the scoped AST into Core IR (§4.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    #[error("ill-formed form: {detail}")]
    IllFormed { detail: String },
}

/// Errors raised while generating bytecode from Core IR (§4.3).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("ill-formed form: {detail}")]
    IllFormed { detail: String },

    #[error("binding id {id} was never installed by the scoper")]
    UnboundBindingId { id: BindingId },
}

/// Non-`Okay`, non-`Halt` states the VM's fetch-execute loop can enter.
/// Mirrors `MachineState` one-to-one, minus the two states that are not
/// faults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmFault {
    #[error("data or return stack underflow")]
    StackUnderflow,

    #[error("program counter {pc} is outside addressable memory")]
    InvalidAddress { pc: u64 },

    #[error("opcode byte {opcode} does not name a known instruction")]
    InvalidInstruction { opcode: u8 },

    #[error("invalid operand: {detail}")]
    InvalidOperand { detail: String },
}

/// Top-level error composing every stage-specific error the Scoper ->
/// Lowerer -> Generator pipeline can raise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}
