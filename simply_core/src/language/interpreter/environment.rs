use std::collections::HashMap;
use log::trace;
use crate::language::ast::AstNode;
use super::value::Value;

/// Index of a reference cell in the environment arena.
pub type CellId = usize;

/// A named binding: a variable's value or the `DEF` subtree of a function.
#[derive(Debug, Clone)]
pub enum Reference<'a> {
    Variable(Value),
    Function(&'a AstNode),
}

#[derive(Debug)]
struct Scope {
    names: HashMap<String, CellId>,
    parent: Option<usize>,
    /// First arena cell owned by this scope; everything above it is released on pop.
    cell_base: usize,
    return_value: Option<Value>,
    break_flag: bool,
}

impl Scope {
    fn new(parent: Option<usize>, cell_base: usize) -> Self {
        Scope {
            names: HashMap::new(),
            parent,
            cell_base,
            return_value: None,
            break_flag: false,
        }
    }
}

/// Scope chain of a running program. A call scope's parent is the scope that was
/// current at the call site, so name resolution follows the dynamic call chain.
#[derive(Debug)]
pub struct Environment<'a> {
    cells: Vec<Reference<'a>>,
    scopes: Vec<Scope>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            cells: Vec::new(),
            scopes: vec![Scope::new(None, 0)],
        }
    }

    fn current(&self) -> &Scope {
        let last = self.scopes.len() - 1;
        &self.scopes[last]
    }

    fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Number of live scopes, the root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        let parent = self.scopes.len() - 1;
        trace!("Pushing scope {} (parent {})", self.scopes.len(), parent);
        self.scopes.push(Scope::new(Some(parent), self.cells.len()));
    }

    /// Drops the innermost scope and the cells it allocated. The root scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() == 1 {
            return;
        }
        if let Some(scope) = self.scopes.pop() {
            trace!("Popping scope {}", self.scopes.len());
            self.cells.truncate(scope.cell_base);
        }
    }

    /// Binds `name` in the innermost scope, shadowing outer bindings. A name already
    /// bound in this scope keeps its cell and has its contents replaced.
    pub fn declare(&mut self, name: &str, reference: Reference<'a>) -> CellId {
        if let Some(&id) = self.current().names.get(name) {
            self.cells[id] = reference;
            return id;
        }
        let id = self.cells.len();
        self.cells.push(reference);
        self.current_mut().names.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<CellId> {
        let mut index = Some(self.scopes.len() - 1);
        while let Some(i) = index {
            let scope = &self.scopes[i];
            if let Some(id) = scope.names.get(name) {
                return Some(*id);
            }
            index = scope.parent;
        }
        None
    }

    pub fn get(&self, id: CellId) -> &Reference<'a> {
        &self.cells[id]
    }

    pub fn get_mut(&mut self, id: CellId) -> &mut Reference<'a> {
        &mut self.cells[id]
    }

    pub fn set_return(&mut self, value: Value) {
        self.current_mut().return_value = Some(value);
    }

    pub fn return_pending(&self) -> bool {
        self.current().return_value.is_some()
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.current().return_value.as_ref()
    }

    pub fn take_return(&mut self) -> Option<Value> {
        self.current_mut().return_value.take()
    }

    pub fn set_break(&mut self) {
        self.current_mut().break_flag = true;
    }

    pub fn break_pending(&self) -> bool {
        self.current().break_flag
    }

    pub fn clear_break(&mut self) {
        self.current_mut().break_flag = false;
    }
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'a>(env: &Environment<'a>, name: &str) -> Option<String> {
        let id = env.lookup(name)?;
        match env.get(id) {
            Reference::Variable(v) => Some(v.to_string()),
            Reference::Function(_) => None,
        }
    }

    #[test]
    fn inner_scopes_see_outer_bindings_until_popped() {
        let mut env = Environment::new();
        env.declare("x", Reference::Variable(Value::Int(1)));
        env.push_scope();
        env.declare("y", Reference::Variable(Value::Int(2)));
        assert_eq!(value_of(&env, "x").as_deref(), Some("1"));
        assert_eq!(value_of(&env, "y").as_deref(), Some("2"));

        env.pop_scope();
        assert_eq!(value_of(&env, "y"), None);
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn declaration_shadows_outer_and_restores_on_pop() {
        let mut env = Environment::new();
        env.declare("x", Reference::Variable(Value::Int(1)));
        env.push_scope();
        env.declare("x", Reference::Variable(Value::Int(5)));
        assert_eq!(value_of(&env, "x").as_deref(), Some("5"));
        env.pop_scope();
        assert_eq!(value_of(&env, "x").as_deref(), Some("1"));
    }

    #[test]
    fn writes_through_lookup_reach_the_outer_cell() {
        let mut env = Environment::new();
        env.declare("x", Reference::Variable(Value::Int(1)));
        env.push_scope();
        let id = env.lookup("x").unwrap();
        *env.get_mut(id) = Reference::Variable(Value::Int(7));
        env.pop_scope();
        assert_eq!(value_of(&env, "x").as_deref(), Some("7"));
    }

    #[test]
    fn redeclaration_reuses_the_scope_cell() {
        let mut env = Environment::new();
        let first = env.declare("t", Reference::Variable(Value::Int(1)));
        for i in 0..1000 {
            assert_eq!(env.declare("t", Reference::Variable(Value::Int(i))), first);
        }
        assert_eq!(env.cells.len(), 1);
        assert_eq!(value_of(&env, "t").as_deref(), Some("999"));

        env.push_scope();
        let inner = env.declare("t", Reference::Variable(Value::None));
        assert_ne!(inner, first);
        assert_eq!(env.cells.len(), 2);
        env.pop_scope();
        assert_eq!(env.cells.len(), 1);
        assert_eq!(value_of(&env, "t").as_deref(), Some("999"));
    }

    #[test]
    fn control_signals_are_per_scope() {
        let mut env = Environment::new();
        env.set_break();
        env.push_scope();
        assert!(!env.break_pending());
        env.set_return(Value::Int(3));
        assert!(env.return_pending());
        assert!(matches!(env.take_return(), Some(Value::Int(3))));
        env.pop_scope();
        assert!(env.break_pending());
        env.clear_break();
        assert!(!env.break_pending());
        env.pop_scope();
        assert_eq!(env.depth(), 1);
    }
}
