mod builder;

use std::collections::HashMap;

use lispvm_common::{Apply, BindingId, Cond, Define, Expr, GenerateError, Instruction, Lambda, Opcode, Program, Top};

use builder::{Builder, LabelId};

/// Produces a flat instruction stream (plus a data segment) from the Core
/// IR. Top-level `Define`s with a `Const` or `Lambda` rhs populate a
/// compile-time global binding table (§4.5 of the design notes); there is
/// no runtime `STORE`, so anything else in `Define` position is rejected.
///
/// Lambda formals are addressed by the activation-record convention: a
/// reference to the immediately enclosing lambda's formal is compiled by
/// rotating the data stack so that formal's value reaches the top, in
/// place, with no frame-pointer register. A `Var` that names neither a
/// global nor a formal of the *immediately* enclosing lambda — e.g. an
/// inner lambda closing over an outer lambda's formal — is outside what
/// this convention can address and is reported as `UnboundBindingId`.
pub struct Generator {
    builder: Builder,
    globals: HashMap<BindingId, LabelId>,
}

impl Generator {
    pub fn new() -> Self {
        Self { builder: Builder::new(), globals: HashMap::new() }
    }

    pub fn default() -> Self {
        Self::new()
    }

    pub fn generate(mut self, program: &Program) -> Result<(Vec<Instruction>, Vec<u8>), GenerateError> {
        for top in program {
            self.generate_top(top)?;
        }
        Ok(self.builder.finalize())
    }

    fn generate_top(&mut self, top: &Top) -> Result<(), GenerateError> {
        match top {
            Top::Define(define) => self.generate_define(define),
            Top::Expr(expr) => {
                let mut frame: Vec<Option<BindingId>> = Vec::new();
                self.generate_expr(expr, &mut frame)
            }
        }
    }

    fn generate_define(&mut self, define: &Define) -> Result<(), GenerateError> {
        match define.rhs.as_ref() {
            Expr::Const(c) => {
                let data_label = self.builder.allocate_data_label();
                self.builder.write_data_immediate(data_label, c.value);
                self.globals.insert(define.name, data_label);
                Ok(())
            }
            Expr::Lambda(lambda) => {
                let entry_label = self.emit_lambda_body(lambda)?;
                let data_label = self.builder.allocate_data_label();
                self.builder.reference_data(entry_label, data_label);
                self.globals.insert(define.name, data_label);
                Ok(())
            }
            other => Err(GenerateError::IllFormed {
                detail: format!("define of binding {} needs a constant or lambda rhs, got {:?}", define.name, other),
            }),
        }
    }

    fn generate_expr(&mut self, expr: &Expr, frame: &mut Vec<Option<BindingId>>) -> Result<(), GenerateError> {
        match expr {
            Expr::Const(c) => {
                self.builder.emit(Instruction::new(Opcode::PUSH, c.value));
                frame.insert(0, None);
                Ok(())
            }
            Expr::Var(v) => self.generate_var(v.id, frame),
            Expr::Apply(apply) => self.generate_apply(apply, frame),
            Expr::Lambda(lambda) => {
                let entry_label = self.emit_lambda_body(lambda)?;
                self.builder.emit_push_reference(entry_label);
                frame.insert(0, None);
                Ok(())
            }
            Expr::Cond(cond) => self.generate_cond(cond, frame),
        }
    }

    /// A formal already at the top of the frame (`depth == 0`) needs no
    /// code at all — its value is already exactly where a reference to it
    /// needs to leave it.
    fn generate_var(&mut self, id: BindingId, frame: &mut Vec<Option<BindingId>>) -> Result<(), GenerateError> {
        if let Some(&data_label) = self.globals.get(&id) {
            self.builder.emit_push_reference(data_label);
            self.builder.emit(Instruction::bare(Opcode::FETCH));
            frame.insert(0, None);
            return Ok(());
        }
        let depth = frame.iter().position(|bound| *bound == Some(id)).ok_or(GenerateError::UnboundBindingId { id })?;
        let window = depth + 1;
        for _ in 0..depth {
            self.builder.emit(Instruction::new(Opcode::NROT, window as u64));
        }
        frame[0..window].rotate_left(depth);
        Ok(())
    }

    fn generate_apply(&mut self, apply: &Apply, frame: &mut Vec<Option<BindingId>>) -> Result<(), GenerateError> {
        for arg in &apply.args {
            self.generate_expr(arg, frame)?;
        }
        self.generate_expr(&apply.callee, frame)?;
        self.builder.emit(Instruction::bare(Opcode::CALL));
        for _ in 0..=apply.args.len() {
            frame.remove(0);
        }
        frame.insert(0, None);
        Ok(())
    }

    fn generate_cond(&mut self, cond: &Cond, frame: &mut Vec<Option<BindingId>>) -> Result<(), GenerateError> {
        let then_label = self.builder.create_label();
        let end_label = self.builder.create_label();

        self.builder.emit_push_reference(then_label);
        frame.insert(0, None);
        self.generate_expr(&cond.condition, frame)?;
        self.builder.emit(Instruction::bare(Opcode::CJMP));
        frame.remove(0);
        frame.remove(0);

        let mut else_frame = frame.clone();
        self.generate_expr(&cond.otherwise, &mut else_frame)?;
        self.builder.emit_push_reference(end_label);
        self.builder.emit(Instruction::bare(Opcode::JMP));

        self.builder.set_label(then_label);
        let mut then_frame = frame.clone();
        self.generate_expr(&cond.then, &mut then_frame)?;

        self.builder.set_label(end_label);
        // Conservative: the Cond's result could have come from either
        // branch, so it is never re-attributed to a specific binding id.
        frame.insert(0, None);
        Ok(())
    }

    /// Emits `[JMP-over][body][RET]` and returns the label bound to the
    /// first body instruction (the lambda's callable entry point). Does
    /// not emit the trailing `PUSH entry_address` a bare `Expr::Lambda`
    /// needs — `Define` skips that push entirely in favor of the global
    /// binding table.
    fn emit_lambda_body(&mut self, lambda: &Lambda) -> Result<LabelId, GenerateError> {
        let skip_label = self.builder.create_label();
        self.builder.emit_push_reference(skip_label);
        self.builder.emit(Instruction::bare(Opcode::JMP));

        let entry_label = self.builder.create_label();
        self.builder.set_label(entry_label);

        let mut frame: Vec<Option<BindingId>> = lambda.formals.iter().rev().map(|id| Some(*id)).collect();
        let (last, init) = lambda.body.split_last().ok_or_else(|| GenerateError::IllFormed {
            detail: "lambda body must have at least one expression".to_string(),
        })?;
        for expr in init {
            self.generate_expr(expr, &mut frame)?;
            self.builder.emit(Instruction::bare(Opcode::DROP));
            frame.remove(0);
        }
        self.generate_expr(last, &mut frame)?;
        self.builder.emit(Instruction::bare(Opcode::RET));

        self.builder.set_label(skip_label);
        Ok(entry_label)
    }
}
