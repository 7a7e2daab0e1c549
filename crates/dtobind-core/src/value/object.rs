//! Shared object and map cells
//!
//! Objects and maps have reference semantics: cloning a handle shares the cell,
//! and equality is pointer identity. This is what lets a cyclic graph bind back
//! to the instance already under construction.

use super::Value;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Type name given to objects built without a registered descriptor
pub const DYNAMIC_TYPE: &str = "object";

struct ObjectCell {
    type_name: String,
    fields: RwLock<BTreeMap<String, Value>>,
}

/// Handle to a shared, mutable object instance
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

impl ObjectRef {
    /// Create an empty instance of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self::with_fields(type_name, BTreeMap::new())
    }

    pub fn with_fields(type_name: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        ObjectRef(Arc::new(ObjectCell {
            type_name: type_name.into(),
            fields: RwLock::new(fields),
        }))
    }

    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// Read a field, `Value::Null` when absent
    pub fn get(&self, name: &str) -> Value {
        self.0.fields.read().get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0.fields.write().insert(name.into(), value);
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.0.fields.read().contains_key(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.0.fields.read().keys().cloned().collect()
    }

    /// Copy of the current field values
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0.fields.read().clone()
    }

    /// New instance of the same type holding the same field values
    pub fn shallow_clone(&self) -> Self {
        Self::with_fields(self.0.type_name.clone(), self.snapshot())
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Field-by-field comparison. Nested objects and maps still compare by identity.
    pub fn same_state(&self, other: &ObjectRef) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.type_name() == other.type_name() && self.snapshot() == other.snapshot()
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields are not printed: graphs may be cyclic.
        write!(f, "{}@{:x}", self.type_name(), self.address())
    }
}

/// Handle to a shared, mutable key-value map
#[derive(Clone, Default)]
pub struct MapRef(Arc<RwLock<BTreeMap<String, Value>>>);

impl MapRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        MapRef(Arc::new(RwLock::new(map)))
    }

    pub fn get(&self, key: &str) -> Value {
        self.0.read().get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.write().insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0.read().clone()
    }

    pub fn shallow_clone(&self) -> Self {
        MapRef(Arc::new(RwLock::new(self.snapshot())))
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for MapRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map@{:x}", self.address())
    }
}
