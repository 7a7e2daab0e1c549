//! Per-call binding state

use crate::value::{IdentityKey, Value};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// A target type bound from a particular source array.
///
/// The key holds the source handles so an object address cannot be freed and
/// reused by another source while the key is cached.
#[derive(Debug, Clone)]
pub struct CacheKey {
    type_name: String,
    identities: Vec<IdentityKey>,
    sources: Vec<Value>,
}

impl CacheKey {
    pub fn new(type_name: &str, sources: &[Value]) -> Self {
        Self {
            type_name: type_name.to_string(),
            identities: sources.iter().map(Value::identity_key).collect(),
            sources: sources.to_vec(),
        }
    }

    pub fn sources(&self) -> &[Value] {
        &self.sources
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.identities == other.identities
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.identities.hash(state);
    }
}

/// State shared by every nested bind of one top-level call.
///
/// The cache makes repeated (type, sources) pairs resolve to the same target
/// instance, which is what keeps cyclic source graphs from recursing forever.
#[derive(Debug, Default)]
pub struct BindingContext {
    cache: HashMap<CacheKey, Value>,
    constructing: HashSet<CacheKey>,
}

impl BindingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, key: &CacheKey) -> Option<Value> {
        self.cache.get(key).cloned()
    }

    pub fn register(&mut self, key: CacheKey, target: Value) {
        self.cache.insert(key, target);
    }

    /// Mark an immutable target as under construction; false when it already is
    pub fn begin_construction(&mut self, key: &CacheKey) -> bool {
        self.constructing.insert(key.clone())
    }

    pub fn end_construction(&mut self, key: &CacheKey) {
        self.constructing.remove(key);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    #[test]
    fn test_keys_use_object_identity() {
        let a = ObjectRef::new("Person");
        let twin = ObjectRef::new("Person");
        let key = CacheKey::new("PersonDto", &[Value::Object(a.clone())]);

        assert_eq!(key, CacheKey::new("PersonDto", &[Value::Object(a.clone())]));
        assert_ne!(key, CacheKey::new("PersonDto", &[Value::Object(twin)]));
        assert_ne!(key, CacheKey::new("OtherDto", &[Value::Object(a)]));
        assert_eq!(
            CacheKey::new("Dto", &[Value::from("x"), Value::Int(1)]),
            CacheKey::new("Dto", &[Value::from("x"), Value::Int(1)])
        );
    }

    #[test]
    fn test_keys_keep_sources_alive() {
        let mut context = BindingContext::new();
        let source = ObjectRef::new("Child");
        let address = source.address();
        let key = CacheKey::new("ChildDto", &[Value::Object(source)]);
        context.register(key, Value::Null);

        // The only remaining handle lives in the cached key.
        let held = context.cache.keys().next().unwrap().sources()[0].clone();
        assert_eq!(held.as_object().unwrap().address(), address);
        assert_eq!(held.as_object().unwrap().type_name(), "Child");
    }

    #[test]
    fn test_construction_guard() {
        let mut context = BindingContext::new();
        let key = CacheKey::new("Point", &[Value::Int(1)]);
        assert!(context.begin_construction(&key));
        assert!(!context.begin_construction(&key));
        context.end_construction(&key);
        assert!(context.begin_construction(&key));
        assert!(context.is_empty());
    }
}
