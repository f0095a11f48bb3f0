mod scoper;
pub use scoper::Scoper;

mod lowerer;
pub use lowerer::Lowerer;

mod generator;
pub use generator::Generator;

use lispvm_common::{CompileError, Instruction, Program};

/// Runs the whole Scoper -> Lowerer -> Generator pipeline over a single
/// AST, for callers that do not need to inspect the intermediate forms.
pub fn compile(mut ast: Vec<lispvm_common::SExp>) -> Result<(Vec<Instruction>, Vec<u8>), CompileError> {
    Scoper::new().scope(&mut ast)?;
    let program: Program = Lowerer::new().lower(&ast)?;
    let (instructions, data) = Generator::new().generate(&program)?;
    Ok((instructions, data))
}
