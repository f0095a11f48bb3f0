use crate::ast::BindingId;

/// A literal 64-bit value. Booleans are folded into this at lowering time
/// (`true` -> 1, `false` -> 0); there is no separate boolean IR node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    pub value: u64,
}

/// A reference to a previously-installed binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub id: BindingId,
}

/// Function application: evaluate `callee`, then each of `args` left to
/// right, then transfer control to the callee's entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apply {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

/// An anonymous function value. `formals` are the binding ids assigned to
/// its parameters by the scoper, in declaration order. `body` is one or
/// more expressions; all but the last are evaluated for effect only, the
/// last supplies the lambda's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub formals: Vec<BindingId>,
    pub body: Vec<Expr>,
}

/// `if condition then otherwise`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cond {
    pub condition: Box<Expr>,
    pub then: Box<Expr>,
    pub otherwise: Box<Expr>,
}

/// A top-level `define`. Each `Expr` node exclusively owns its children;
/// there is no sharing between subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: BindingId,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(Const),
    Var(Var),
    Apply(Apply),
    Lambda(Lambda),
    Cond(Cond),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Top {
    Define(Define),
    Expr(Expr),
}

pub type Program = Vec<Top>;
