// ABOUTME: Lexical environments: a non-empty chain of keyed frames

use crate::hash::KeyedTable;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// An environment: the innermost frame plus an optional parent chain. A
/// frame is the same keyed table that backs hash values. `define` always
/// writes the innermost frame; `lookup` searches innermost-first.
#[derive(Debug)]
pub struct Environment {
    frame: Rc<RefCell<KeyedTable>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// A fresh single-frame environment.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            frame: Rc::new(RefCell::new(KeyedTable::new())),
            parent: None,
        })
    }

    /// A fresh frame layered over `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            frame: Rc::new(RefCell::new(KeyedTable::new())),
            parent: Some(parent),
        })
    }

    /// An environment sharing an existing frame (used for the cached
    /// bootstrap base, whose bindings every session sees).
    pub fn from_frame(frame: Rc<RefCell<KeyedTable>>) -> Rc<Self> {
        Rc::new(Environment {
            frame,
            parent: None,
        })
    }

    /// Bind `name` in the innermost frame. A rebinding in the same frame is
    /// just another define.
    pub fn define(&self, name: &str, value: Value) {
        self.frame.borrow_mut().insert(name, value);
    }

    /// Innermost-first search of the frame chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.frame.borrow().fetch(name) {
            return Some(value);
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => None,
        }
    }

    /// The innermost frame, for introspection and `$N` session bindings.
    pub fn frame(&self) -> Rc<RefCell<KeyedTable>> {
        self.frame.clone()
    }
}
