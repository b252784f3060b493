//! HTTP route table.
//!
//! Maps exact request paths (`/<name>`) to function names. Dispatch takes a
//! shared read lock; binding and unbinding take the write lock.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Dynamic `path -> function` mapping for HTTP-bound functions.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<String, String>>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `path` to `function`, returning the function it replaced.
    pub fn insert(&self, path: impl Into<String>, function: impl Into<String>) -> Option<String> {
        self.routes.write().insert(path.into(), function.into())
    }

    /// Remove the route for `path`.
    pub fn remove(&self, path: &str) -> Option<String> {
        self.routes.write().remove(path)
    }

    /// Function served on `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<String> {
        self.routes.read().get(path).cloned()
    }

    /// Returns `true` if `path` is routed.
    pub fn contains(&self, path: &str) -> bool {
        self.routes.read().contains_key(path)
    }

    /// All routes, sorted by path.
    pub fn routes(&self) -> Vec<(String, String)> {
        let mut routes: Vec<_> = self
            .routes
            .read()
            .iter()
            .map(|(path, function)| (path.clone(), function.clone()))
            .collect();
        routes.sort();
        routes
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Returns `true` if no route is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
