//! Lexical scope chain.
//!
//! A scope maps names to values and optionally points at a parent. Lookup
//! walks the chain; binding always writes to the innermost scope, so child
//! bindings shadow without mutating their parents. Scopes are shared via
//! `Rc` because user functions capture the scope active at their
//! declaration site and may outlive the block that created it.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::value::Value;

#[derive(Debug, Default)]
pub(crate) struct Scope {
    vars: RefCell<AHashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(AHashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Walks the parent chain and clones the first match.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Binds in this scope, shadowing any parent binding of the same name.
    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_without_mutating_parent() {
        let root = Scope::root();
        root.bind("x", Value::Number(1.0));
        let child = Scope::child(&root);
        child.bind("x", Value::Number(2.0));
        assert_eq!(child.lookup("x"), Some(Value::Number(2.0)));
        assert_eq!(root.lookup("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn lookup_walks_parents() {
        let root = Scope::root();
        root.bind("y", Value::String("outer".into()));
        let child = Scope::child(&Scope::child(&root));
        assert_eq!(child.lookup("y"), Some(Value::String("outer".into())));
        assert_eq!(child.lookup("z"), None);
    }
}
