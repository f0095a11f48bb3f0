use lispvm_common::{Binding, BindingKind, Keyword, SExp, ScopeError, ScopeId, SymbolTable, SymbolValue};

/// Performs static name resolution over an AST in place: every identifier
/// occurrence is replaced by a globally unique binding id, and a scope tree
/// is built so later stages need no string comparisons.
///
/// Usage is the two-pass protocol from the design: `run` introduces scopes
/// and installs bindings, annotating every `lambda` list with its new
/// scope-id; `resolve` then rewrites every `Name` symbol to `BindingId` by
/// walking the scope chain built during `run`.
pub struct Scoper {
    table: SymbolTable,
}

impl Scoper {
    pub fn new() -> Self {
        Self { table: SymbolTable::new() }
    }

    pub fn default() -> Self {
        Self::new()
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    /// Run both passes over every top-level form in `ast`, in place.
    pub fn scope(&mut self, ast: &mut [SExp]) -> Result<(), ScopeError> {
        for top in ast.iter_mut() {
            self.run(top, 0)?;
        }
        for top in ast.iter_mut() {
            self.resolve(top, 0)?;
        }
        Ok(())
    }

    /// First pass: introduce scopes and install bindings. Root-level
    /// recursion starts at `parent_scope = 0`.
    fn run(&mut self, node: &mut SExp, parent_scope: ScopeId) -> Result<(), ScopeError> {
        let SExp::List { children, scope_id } = node else {
            return Ok(());
        };

        if let Some(SExp::Symbol(SymbolValue::Keyword(Keyword::Lambda))) = children.first() {
            return self.run_lambda(children, scope_id, parent_scope);
        }

        if let Some(SExp::Symbol(SymbolValue::Keyword(Keyword::Define))) = children.first() {
            return self.run_define(children, parent_scope);
        }

        for child in children.iter_mut() {
            self.run(child, parent_scope)?;
        }
        Ok(())
    }

    fn run_lambda(
        &mut self,
        children: &mut [SExp],
        scope_id: &mut Option<ScopeId>,
        parent_scope: ScopeId,
    ) -> Result<(), ScopeError> {
        if children.len() < 3 {
            return Err(ScopeError::IllFormed {
                detail: format!("lambda form needs formals and at least one body expression, got {} children", children.len()),
            });
        }
        let formal_names: Vec<String> = match &children[1] {
            SExp::List { children: formals, .. } => formals
                .iter()
                .map(|f| match f {
                    SExp::Symbol(SymbolValue::Name(name)) => Ok(name.clone()),
                    other => Err(ScopeError::IllFormed {
                        detail: format!("lambda formal must be a name, got {:?}", other),
                    }),
                })
                .collect::<Result<_, _>>()?,
            other => {
                return Err(ScopeError::IllFormed {
                    detail: format!("lambda formals must be a list, got {:?}", other),
                })
            }
        };

        let child_scope = self.table.new_child_scope(parent_scope);
        for name in formal_names {
            let id = self.table.fresh_binding_id();
            self.table.insert(child_scope, name, Binding::new(BindingKind::Value, id));
        }
        *scope_id = Some(child_scope);

        for child in children.iter_mut() {
            self.run(child, child_scope)?;
        }
        Ok(())
    }

    fn run_define(&mut self, children: &mut [SExp], parent_scope: ScopeId) -> Result<(), ScopeError> {
        if children.len() != 3 {
            return Err(ScopeError::IllFormed {
                detail: format!("define form needs exactly a name and a body, got {} children", children.len()),
            });
        }
        let name = match &children[1] {
            SExp::Symbol(SymbolValue::Name(name)) => name.clone(),
            other => {
                return Err(ScopeError::IllFormed {
                    detail: format!("define name must be a name symbol, got {:?}", other),
                })
            }
        };
        let id = self.table.fresh_binding_id();
        self.table.insert(parent_scope, name, Binding::new(BindingKind::Func, id));

        self.run(&mut children[2], parent_scope)
    }

    /// Second pass: rewrite every `Name` symbol to `BindingId` by looking it
    /// up through the scope chain rooted at `current_scope`.
    fn resolve(&mut self, node: &mut SExp, current_scope: ScopeId) -> Result<(), ScopeError> {
        match node {
            SExp::Symbol(SymbolValue::Name(name)) => {
                let name = name.clone();
                let binding = self.table.find_symbol(&name, current_scope).ok_or_else(|| {
                    ScopeError::UnresolvedName { name: name.clone(), scope_id: current_scope }
                })?;
                *node = SExp::binding_id(binding.id);
                Ok(())
            }
            SExp::Symbol(_) => Ok(()),
            SExp::List { children, scope_id } => {
                let next_scope = scope_id.unwrap_or(current_scope);
                for child in children.iter_mut() {
                    self.resolve(child, next_scope)?;
                }
                Ok(())
            }
        }
    }
}
