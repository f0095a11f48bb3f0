use std::collections::HashMap;
use std::fmt;

use crate::ast::ScopeId;
use crate::binding::Binding;

/// One node of the scope tree.
///
/// The parent link is a scope-id, not an owning pointer, so the tree has no
/// cycles at the ownership level even though scope-ids logically form a
/// parent/child graph. The arena (`SymbolTable`) is the sole owner of every
/// `SymbolScope`.
#[derive(Debug, Clone)]
pub struct SymbolScope {
    scope_id: ScopeId,
    parent: Option<ScopeId>,
    bindings: HashMap<String, Binding>,
    children: Vec<ScopeId>,
}

impl SymbolScope {
    fn root() -> Self {
        Self {
            scope_id: 0,
            parent: None,
            bindings: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }
}

/// An arena of `SymbolScope`s indexed by scope-id. The root (scope-id 0) has
/// no parent; every other scope has exactly one.
///
/// Implemented as an arena rather than a tree of `Rc`/`RefCell` nodes so that
/// the parent link is just another index — there is no raw owning
/// back-pointer to reason about.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: HashMap<ScopeId, SymbolScope>,
    next_scope_id: ScopeId,
    next_binding_id: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(0, SymbolScope::root());
        Self {
            scopes,
            next_scope_id: 1,
            next_binding_id: 0,
        }
    }

    /// Allocate a fresh binding id from the single program-wide counter.
    /// Ids are handed out strictly in call order, so callers that rely on
    /// deterministic id assignment (the scoper's first walk) can simply call
    /// this in source order.
    pub fn fresh_binding_id(&mut self) -> u64 {
        let id = self.next_binding_id;
        self.next_binding_id += 1;
        id
    }

    /// Create a fresh child scope under `parent`, returning its scope-id.
    pub fn new_child_scope(&mut self, parent: ScopeId) -> ScopeId {
        let scope_id = self.next_scope_id;
        self.next_scope_id += 1;
        self.scopes.insert(
            scope_id,
            SymbolScope {
                scope_id,
                parent: Some(parent),
                bindings: HashMap::new(),
                children: Vec::new(),
            },
        );
        self.scopes
            .get_mut(&parent)
            .expect("parent scope exists")
            .children
            .push(scope_id);
        scope_id
    }

    /// Install `binding` under `name` in `scope_id`'s bindings.
    pub fn insert(&mut self, scope_id: ScopeId, name: impl Into<String>, binding: Binding) {
        self.scopes
            .get_mut(&scope_id)
            .expect("scope exists")
            .bindings
            .insert(name.into(), binding);
    }

    pub fn scope(&self, scope_id: ScopeId) -> Option<&SymbolScope> {
        self.scopes.get(&scope_id)
    }

    /// Look up `name` starting at `scope_id`, ascending through parent links
    /// until a scope's own bindings contain it, or the root is exhausted.
    pub fn find_symbol(&self, name: &str, scope_id: ScopeId) -> Option<Binding> {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            let scope = self.scopes.get(&id)?;
            if let Some(binding) = scope.bindings.get(name) {
                return Some(*binding);
            }
            current = scope.parent;
        }
        None
    }

    pub fn children_of(&self, scope_id: ScopeId) -> &[ScopeId] {
        self.scopes
            .get(&scope_id)
            .map(|scope| scope.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, scope_id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(&scope_id).and_then(|scope| scope.parent)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.scopes.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let scope = &self.scopes[&id];
            let mut names: Vec<_> = scope.bindings.keys().collect();
            names.sort();
            writeln!(
                f,
                "scope {} (parent={:?}): {:?}",
                id, scope.parent, names
            )?;
        }
        Ok(())
    }
}
