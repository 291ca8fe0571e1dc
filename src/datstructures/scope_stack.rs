use std::{collections::HashMap, hash::Hash};

/// A stack of name-to-value frames implementing lexical scoping. Lookup
/// walks from the innermost frame outwards; insertion always targets the
/// innermost frame, so inner declarations shadow outer ones.
#[derive(Clone, Debug)]
pub struct ScopeStack<K, V> {
    scopes: Vec<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> ScopeStack<K, V> {
    /// Creates a stack holding a single root frame.
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn lookup(&self, key: &K) -> Option<&V> {
        for scope in self.scopes.iter().rev() {
            if scope.contains_key(key) {
                return scope.get(key);
            }
        }

        None
    }

    /// Checks whether the innermost frame already binds this key.
    pub fn declared_here(&self, key: &K) -> bool {
        match self.scopes.last() {
            Some(scope) => scope.contains_key(key),
            None => false,
        }
    }

    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        self.scopes.last_mut().unwrap().insert(k, v)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl<K: Eq + Hash, V> Default for ScopeStack<K, V> {
    fn default() -> Self {
        ScopeStack::new()
    }
}
