//! Shared worker state
//!
//! One `State` lives inside each worker and is threaded by `&mut` into every
//! hook and test body the worker runs, in sequence. Values are stored by key
//! and typed at the call site, so hooks can hand live resources (handles,
//! pools, temp dirs) to the tests that follow.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

type Value = Box<dyn Any + Send + Sync>;

/// Mutable key/value map shared by the hooks and tests of one worker
#[derive(Default)]
pub struct State {
    values: HashMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one when it had the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        self.values
            .insert(key.into(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Borrow a value; `None` when missing or stored as another type
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Take a value out; entries of another type are left in place
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Drop an entry whatever its type
    pub fn discard(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Add `by` to an `i64` entry and return the new value
    ///
    /// Missing entries and entries of another type start from 0. The sum
    /// saturates at the `i64` bounds.
    pub fn increment(&mut self, key: &str, by: i64) -> i64 {
        if let Some(current) = self.get_mut::<i64>(key) {
            *current = current.saturating_add(by);
            return *current;
        }
        self.values.insert(key.to_string(), Box::new(by));
        by
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("State").field("keys", &keys).finish()
    }
}
