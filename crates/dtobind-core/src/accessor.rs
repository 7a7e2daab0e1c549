//! Best-effort property reads and writes along dotted paths
//!
//! Each path segment resolves against the current value: a map takes the whole
//! remaining path as a single key, an object resolves the segment to a property
//! of its type (searching the parent chain). Nothing here returns an error:
//! unresolvable reads give `Value::Null`, failed writes are dropped, and both are
//! logged at debug level.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

use crate::types::{PropertyType, TypeRegistry};
use crate::value::{MapRef, ObjectRef, Value};
use dashmap::DashMap;
use std::sync::Arc;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '.';

/// Cached outcome of a (type, property) lookup
#[derive(Debug, Clone)]
struct ResolvedProperty {
    declaring_type: String,
    ty: PropertyType,
    readable: bool,
    writable: bool,
}

/// Reads and writes values at property paths
#[derive(Debug)]
pub struct PropertyAccessor {
    types: Arc<TypeRegistry>,
    make_up_intermediates: bool,
    lookups: DashMap<(String, String), Option<ResolvedProperty>>,
}

impl PropertyAccessor {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            make_up_intermediates: true,
            lookups: DashMap::new(),
        }
    }

    /// Whether a write may create missing intermediate objects along the path
    pub fn with_make_up_intermediates(mut self, enabled: bool) -> Self {
        self.make_up_intermediates = enabled;
        self
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn makes_up_intermediates(&self) -> bool {
        self.make_up_intermediates
    }

    /// Read the value at `path`; `Value::Null` when any segment cannot be resolved
    pub fn read(&self, path: &str, instance: &Value) -> Value {
        let mut current = instance.clone();
        let mut rest = path;
        loop {
            match &current {
                Value::Map(map) => return map.get(rest),
                Value::Null => return Value::Null,
                Value::Object(object) => {
                    let (segment, tail) = split_first(rest);
                    let next = self.read_property(object, segment);
                    match tail {
                        Some(tail) => {
                            current = next;
                            rest = tail;
                        }
                        None => return next,
                    }
                }
                other => {
                    tracing::debug!(
                        path,
                        segment = rest,
                        found = %other.type_label(),
                        "cannot navigate into value"
                    );
                    return Value::Null;
                }
            }
        }
    }

    /// Write `value` at `path`; failures are logged and the write is dropped
    pub fn write(&self, path: &str, value: Value, instance: &Value) {
        let mut current = instance.clone();
        let mut rest = path;
        loop {
            match &current {
                Value::Map(map) => {
                    map.insert(rest, value);
                    return;
                }
                Value::Object(object) => {
                    let (segment, tail) = split_first(rest);
                    let Some(tail) = tail else {
                        self.write_property(object, segment, value);
                        return;
                    };
                    let mut next = self.read_property(object, segment);
                    if next.is_null() {
                        match self.make_up(object, segment) {
                            Some(made) => next = made,
                            None => {
                                tracing::debug!(path, segment, "intermediate value is null, write abandoned");
                                return;
                            }
                        }
                    }
                    current = next;
                    rest = tail;
                }
                other => {
                    tracing::debug!(
                        path,
                        segment = rest,
                        found = %other.type_label(),
                        "cannot write into value"
                    );
                    return;
                }
            }
        }
    }

    fn read_property(&self, object: &ObjectRef, name: &str) -> Value {
        match self.resolve(object.type_name(), name) {
            Some(resolved) if resolved.readable => object.get(name),
            Some(resolved) => {
                tracing::debug!(
                    type_name = %resolved.declaring_type,
                    property = name,
                    "property is not readable"
                );
                Value::Null
            }
            None if !self.types.contains(object.type_name()) => object.get(name),
            None => {
                tracing::debug!(
                    type_name = object.type_name(),
                    property = name,
                    "no such property"
                );
                Value::Null
            }
        }
    }

    fn write_property(&self, object: &ObjectRef, name: &str, value: Value) {
        let resolved = self.resolve(object.type_name(), name);
        match resolved {
            Some(resolved) if resolved.writable => match self.types.adapt(&resolved.ty, value) {
                Some(adapted) => object.set(name, adapted),
                None => tracing::debug!(
                    type_name = object.type_name(),
                    property = name,
                    expected = %resolved.ty.describe(),
                    "value does not fit property, write dropped"
                ),
            },
            Some(_) => tracing::debug!(
                type_name = object.type_name(),
                property = name,
                "property is not writable"
            ),
            None if !self.types.contains(object.type_name()) => object.set(name, value),
            None => tracing::debug!(
                type_name = object.type_name(),
                property = name,
                "no such property"
            ),
        }
    }

    /// Create and assign a fresh value for a null intermediate segment
    fn make_up(&self, object: &ObjectRef, name: &str) -> Option<Value> {
        if !self.make_up_intermediates {
            return None;
        }
        let made = match self.resolve(object.type_name(), name) {
            Some(resolved) if resolved.writable => match &resolved.ty {
                PropertyType::Map => Value::Map(MapRef::new()),
                PropertyType::Object(type_name) => match self.types.instantiate(type_name) {
                    Ok(instance) => Value::Object(instance),
                    Err(err) => {
                        tracing::debug!(property = name, error = %err, "cannot make up intermediate");
                        return None;
                    }
                },
                _ => return None,
            },
            Some(_) => return None,
            None if !self.types.contains(object.type_name()) => {
                Value::Object(ObjectRef::new(crate::value::DYNAMIC_TYPE))
            }
            None => return None,
        };
        object.set(name, made.clone());
        Some(made)
    }

    fn resolve(&self, type_name: &str, property: &str) -> Option<ResolvedProperty> {
        let key = (type_name.to_string(), property.to_string());
        if let Some(cached) = self.lookups.get(&key) {
            return cached.clone();
        }
        let resolved = self
            .types
            .find_property(type_name, property)
            .map(|(declaring, p)| ResolvedProperty {
                declaring_type: declaring.to_string(),
                ty: p.property_type().clone(),
                readable: p.is_readable(),
                writable: p.is_writable(),
            });
        self.lookups.insert(key, resolved.clone());
        resolved
    }
}

fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.split_once(PATH_SEPARATOR) {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    }
}
