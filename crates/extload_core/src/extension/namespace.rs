//! Host-owned binding target for registered extensions.
//!
//! # Invariants
//! - Bindings are add-only. `bind` never replaces an existing entry.
//! - The namespace label is used in diagnostics only.

use std::collections::BTreeMap;

/// Named, add-only mapping from extension name to bound entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace<T> {
    label: String,
    bindings: BTreeMap<String, T>,
}

impl<T> Namespace<T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binds `entity` at `name`.
    ///
    /// Returns the entity back when `name` is already bound; the existing
    /// binding is left untouched.
    pub fn bind(&mut self, name: impl Into<String>, entity: T) -> Result<(), T> {
        let name = name.into();
        if self.bindings.contains_key(name.as_str()) {
            return Err(entity);
        }
        self.bindings.insert(name, entity);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns bound names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.bindings.iter().map(|(name, entity)| (name.as_str(), entity))
    }
}
