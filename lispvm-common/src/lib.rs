mod ast;
pub use ast::{BindingId, Keyword, SExp, ScopeId, SymbolValue};

mod binding;
pub use binding::{Binding, BindingKind};

mod symbol_table;
pub use symbol_table::{SymbolScope, SymbolTable};

mod core_ir;
pub use core_ir::{Apply, Cond, Const, Define, Expr, Lambda, Program, Top, Var};

mod isa;
pub use isa::{OperandKind, OperationKind, Opcode, OPCODE_COUNT, VARIABLE_STACK_EFFECT};

mod instruction;
pub use instruction::{Instruction, INSTRUCTION_SIZE};

mod error;
pub use error::{CompileError, GenerateError, LowerError, ScopeError, VmFault};
