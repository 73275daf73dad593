//! Scope frames for the environment chain. A frame owns its slots;
//! the parent link is shared ownership so closures keep captured
//! frames alive for as long as any holder remains.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::TypeHint;
use crate::interpreter::value::Value;
use crate::symbol::Symbol;

/// One declared binding. The slot index is fixed by the resolver's
/// declaration order for the owning scope.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Symbol,
    pub hint: TypeHint,
    pub value: Value,
    pub mutable: bool,
}

#[derive(Debug, Default)]
pub struct Environment {
    slots: Vec<Variable>,
    parent: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new(parent: Option<Rc<RefCell<Environment>>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            slots: Vec::new(),
            parent,
        }))
    }

    /// Append a binding; returns its slot. Declaration order matches
    /// the resolver's slot assignment for this scope.
    pub fn define(&mut self, variable: Variable) -> usize {
        self.slots.push(variable);
        self.slots.len() - 1
    }

    pub fn parent(&self) -> Option<Rc<RefCell<Environment>>> {
        self.parent.clone()
    }

    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = env.clone();
        for _ in 0..depth {
            let parent = current.borrow().parent()?;
            current = parent;
        }
        Some(current)
    }

    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        slot: usize,
    ) -> Option<Variable> {
        let frame = Self::ancestor(env, depth)?;
        let frame = frame.borrow();
        frame.slots.get(slot).cloned()
    }

    /// Overwrite the value at a resolved coordinate. The caller has
    /// already checked the declared type and mutability.
    pub fn set_at(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        slot: usize,
        value: Value,
    ) -> bool {
        let Some(frame) = Self::ancestor(env, depth) else {
            return false;
        };
        let mut frame = frame.borrow_mut();
        match frame.slots.get_mut(slot) {
            Some(variable) => {
                variable.value = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;

    fn var(name: &str, value: Value) -> Variable {
        Variable {
            name: intern(name),
            hint: TypeHint::Dynamic,
            value,
            mutable: true,
        }
    }

    #[test]
    fn slots_are_assigned_in_declaration_order() {
        let env = Environment::new(None);
        assert_eq!(env.borrow_mut().define(var("a", Value::Int(1))), 0);
        assert_eq!(env.borrow_mut().define(var("b", Value::Int(2))), 1);
    }

    #[test]
    fn parent_chain_lookup_walks_depth() {
        let outer = Environment::new(None);
        outer.borrow_mut().define(var("x", Value::Int(10)));
        let inner = Environment::new(Some(outer.clone()));
        inner.borrow_mut().define(var("y", Value::Int(20)));

        let from_inner = Environment::get_at(&inner, 1, 0).expect("x reachable");
        assert!(matches!(from_inner.value, Value::Int(10)));
        assert!(Environment::set_at(&inner, 1, 0, Value::Int(11)));
        let updated = Environment::get_at(&outer, 0, 0).expect("x present");
        assert!(matches!(updated.value, Value::Int(11)));
    }
}
