//! Attribute namespaces for modules and types

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::PyObject;

/// Name → object mapping backing a module or type dictionary
#[derive(Debug, Default)]
pub struct Namespace {
    entries: DashMap<String, PyObject>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<PyObject> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Bind `name`, returning the previous value
    pub fn set(&self, name: impl Into<String>, value: PyObject) -> Option<PyObject> {
        self.entries.insert(name.into(), value)
    }

    pub fn remove(&self, name: &str) -> Option<PyObject> {
        self.entries.remove(name).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted attribute names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Locked entry for check-then-bind updates
    pub(crate) fn entry(&self, name: &str) -> Entry<'_, String, PyObject> {
        self.entries.entry(name.to_string())
    }
}
