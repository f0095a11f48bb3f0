use lispvm_common::{Apply, Cond, Const, Define, Expr, Keyword, Lambda, LowerError, Program, SExp, SymbolValue, Top, Var};

/// Reshapes a scoped AST (every `Name` already rewritten to `BindingId`)
/// into the Core IR, separating special forms from application and
/// collapsing literal symbol kinds into `Const`.
pub struct Lowerer;

impl Lowerer {
    pub fn new() -> Self {
        Self
    }

    pub fn default() -> Self {
        Self::new()
    }

    pub fn lower(&self, ast: &[SExp]) -> Result<Program, LowerError> {
        ast.iter().map(|top| self.lower_top(top)).collect()
    }

    fn lower_top(&self, sexp: &SExp) -> Result<Top, LowerError> {
        if let SExp::List { children, .. } = sexp {
            if let Some(SExp::Symbol(SymbolValue::Keyword(Keyword::Define))) = children.first() {
                return Ok(Top::Define(self.lower_definition(children)?));
            }
        }
        Ok(Top::Expr(self.lower_expr(sexp)?))
    }

    fn lower_expr(&self, sexp: &SExp) -> Result<Expr, LowerError> {
        match sexp {
            SExp::List { children, .. } => {
                let head = children.first().ok_or_else(|| LowerError::IllFormed {
                    detail: "empty list in expression position".to_string(),
                })?;
                match head {
                    SExp::Symbol(SymbolValue::Keyword(Keyword::If)) => Ok(Expr::Cond(self.lower_cond(children)?)),
                    SExp::Symbol(SymbolValue::Keyword(Keyword::Lambda)) => Ok(Expr::Lambda(self.lower_lambda(children)?)),
                    SExp::Symbol(SymbolValue::Keyword(Keyword::Define)) => Err(LowerError::IllFormed {
                        detail: "nested define is not a valid expression".to_string(),
                    }),
                    SExp::Symbol(SymbolValue::Keyword(Keyword::Let)) => Err(LowerError::IllFormed {
                        detail: "let should have been desugared before lowering".to_string(),
                    }),
                    _ => Ok(Expr::Apply(self.lower_apply(children)?)),
                }
            }
            SExp::Symbol(SymbolValue::Integer(value)) => Ok(Expr::Const(Const { value: *value })),
            SExp::Symbol(SymbolValue::Bool(value)) => Ok(Expr::Const(Const { value: if *value { 1 } else { 0 } })),
            SExp::Symbol(SymbolValue::BindingId(id)) => Ok(Expr::Var(Var { id: *id })),
            SExp::Symbol(SymbolValue::Name(name)) => Err(LowerError::IllFormed {
                detail: format!("unresolved name `{}` reached the lowerer", name),
            }),
            SExp::Symbol(SymbolValue::Keyword(kw)) => Err(LowerError::IllFormed {
                detail: format!("bare keyword `{}` in expression position", kw),
            }),
        }
    }

    fn lower_cond(&self, children: &[SExp]) -> Result<Cond, LowerError> {
        let [_if, condition, then, otherwise] = children else {
            return Err(LowerError::IllFormed {
                detail: format!("if form needs exactly 3 arguments, got {}", children.len().saturating_sub(1)),
            });
        };
        Ok(Cond {
            condition: Box::new(self.lower_expr(condition)?),
            then: Box::new(self.lower_expr(then)?),
            otherwise: Box::new(self.lower_expr(otherwise)?),
        })
    }

    fn lower_lambda(&self, children: &[SExp]) -> Result<Lambda, LowerError> {
        if children.len() < 3 {
            return Err(LowerError::IllFormed {
                detail: "lambda form needs formals and at least one body expression".to_string(),
            });
        }
        let formals = match &children[1] {
            SExp::List { children: formals, .. } => formals
                .iter()
                .map(|f| match f {
                    SExp::Symbol(SymbolValue::BindingId(id)) => Ok(*id),
                    other => Err(LowerError::IllFormed {
                        detail: format!("lambda formal must be a resolved binding id, got {:?}", other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(LowerError::IllFormed {
                    detail: format!("lambda formals must be a list, got {:?}", other),
                })
            }
        };
        let body = children[2..]
            .iter()
            .map(|expr| self.lower_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Lambda { formals, body })
    }

    fn lower_definition(&self, children: &[SExp]) -> Result<Define, LowerError> {
        let [_define, name, rhs] = children else {
            return Err(LowerError::IllFormed {
                detail: format!("define form needs exactly a name and a body, got {} children", children.len()),
            });
        };
        let name = match name {
            SExp::Symbol(SymbolValue::BindingId(id)) => *id,
            other => {
                return Err(LowerError::IllFormed {
                    detail: format!("define name must be a resolved binding id, got {:?}", other),
                })
            }
        };
        Ok(Define { name, rhs: Box::new(self.lower_expr(rhs)?) })
    }

    fn lower_apply(&self, children: &[SExp]) -> Result<Apply, LowerError> {
        let (callee, args) = children.split_first().ok_or_else(|| LowerError::IllFormed {
            detail: "application needs a callee".to_string(),
        })?;
        Ok(Apply {
            callee: Box::new(self.lower_expr(callee)?),
            args: args.iter().map(|arg| self.lower_expr(arg)).collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoper::Scoper;

    fn lambda(formals: Vec<&str>, body: Vec<SExp>) -> SExp {
        let mut children = vec![
            SExp::keyword(Keyword::Lambda),
            SExp::list(formals.into_iter().map(SExp::name).collect()),
        ];
        children.extend(body);
        SExp::list(children)
    }

    fn apply(callee: SExp, args: Vec<SExp>) -> SExp {
        let mut children = vec![callee];
        children.extend(args);
        SExp::list(children)
    }

    fn scoped(mut ast: Vec<SExp>) -> Vec<SExp> {
        Scoper::new().scope(&mut ast).expect("scopes cleanly");
        ast
    }

    #[test]
    fn plus_application_lowers_to_apply_of_const_args() {
        let ast = scoped(vec![apply(SExp::name("+"), vec![SExp::integer(1), SExp::integer(2)])]);
        let program = Lowerer::new().lower(&ast).expect("lowers cleanly");
        assert_eq!(program.len(), 1);
        match &program[0] {
            Top::Expr(Expr::Apply(Apply { callee, args })) => {
                assert!(matches!(**callee, Expr::Var(_)));
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], Expr::Const(Const { value: 1 }));
                assert_eq!(args[1], Expr::Const(Const { value: 2 }));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn identity_lambda_lowers_to_formal_zero() {
        let ast = scoped(vec![lambda(vec!["x"], vec![SExp::name("x")])]);
        let program = Lowerer::new().lower(&ast).expect("lowers cleanly");
        match &program[0] {
            Top::Expr(Expr::Lambda(Lambda { formals, body })) => {
                assert_eq!(formals, &vec![0]);
                assert_eq!(body, &vec![Expr::Var(Var { id: 0 })]);
            }
            other => panic!("expected Lambda, got {:?}", other),
        }
    }

    #[test]
    fn booleans_fold_to_one_and_zero() {
        let ast = vec![SExp::boolean(true), SExp::boolean(false)];
        let program = Lowerer::new().lower(&ast).expect("lowers cleanly");
        assert_eq!(program[0], Top::Expr(Expr::Const(Const { value: 1 })));
        assert_eq!(program[1], Top::Expr(Expr::Const(Const { value: 0 })));
    }

    #[test]
    fn if_form_with_wrong_arity_is_ill_formed() {
        let ast = vec![SExp::list(vec![SExp::keyword(Keyword::If), SExp::integer(1)])];
        let err = Lowerer::new().lower(&ast).unwrap_err();
        assert!(matches!(err, LowerError::IllFormed { .. }));
    }

    #[test]
    fn unresolved_name_reaching_the_lowerer_is_rejected() {
        let ast = vec![SExp::name("oops")];
        let err = Lowerer::new().lower(&ast).unwrap_err();
        assert!(matches!(err, LowerError::IllFormed { .. }));
    }
}
