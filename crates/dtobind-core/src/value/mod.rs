//! Dynamic value model bound by the engine
//!
//! Business objects and DTOs are graphs of [`Value`]s. Scalars are plain values;
//! objects ([`ObjectRef`]) and maps ([`MapRef`]) are shared cells with identity
//! semantics, so the same instance can be reached from several places of a graph.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

mod json;
mod object;

pub use object::{MapRef, ObjectRef, DYNAMIC_TYPE};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete shape of a collection value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    List,
    LinkedList,
    Set,
    SortedSet,
    Array,
    /// Read-only view; cannot be instantiated as a result container
    UnmodifiableList,
    /// Read-only view; cannot be instantiated as a result container
    UnmodifiableSet,
}

impl CollectionKind {
    /// Whether a fresh, empty container of this kind can be created
    pub fn is_instantiable(self) -> bool {
        !matches!(self, CollectionKind::UnmodifiableList | CollectionKind::UnmodifiableSet)
    }

    pub fn is_set(self) -> bool {
        matches!(
            self,
            CollectionKind::Set | CollectionKind::SortedSet | CollectionKind::UnmodifiableSet
        )
    }

    /// The generic kind used when this one cannot be instantiated
    pub fn generic(self) -> CollectionKind {
        if self.is_set() {
            CollectionKind::Set
        } else if self == CollectionKind::Array {
            CollectionKind::Array
        } else {
            CollectionKind::List
        }
    }

    /// This kind when instantiable, its generic fallback otherwise
    pub fn instantiable_or_generic(self) -> CollectionKind {
        if self.is_instantiable() {
            self
        } else {
            self.generic()
        }
    }

    /// Whether a property declared with this kind can hold a value of `other` kind
    pub fn accepts(self, other: CollectionKind) -> bool {
        match self {
            CollectionKind::Array => other == CollectionKind::Array,
            k if k.is_set() => other.is_set(),
            _ => other != CollectionKind::Array && !other.is_set(),
        }
    }
}

/// A constant of a registered enum type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub constant: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }
}

/// A bindable value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Text(String),
    /// An instant without zone information
    Date(DateTime<Utc>),
    /// An instant carrying its own offset
    Calendar(DateTime<FixedOffset>),
    Enum(EnumValue),
    Collection(CollectionKind, Vec<Value>),
    Map(MapRef),
    Object(ObjectRef),
}

impl Value {
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Collection(CollectionKind::List, items.into_iter().collect())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Collection(CollectionKind::Array, items.into_iter().collect())
    }

    /// A set; later duplicates (by identity key) are dropped
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let items = items
            .into_iter()
            .filter(|v| seen.insert(v.identity_key()))
            .collect();
        Value::Collection(CollectionKind::Set, items)
    }

    pub fn enumeration(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Value::Enum(EnumValue::new(type_name, constant))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by calculation mergers; text is parsed leniently
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of a collection value
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(_, items) => Some(items),
            _ => None,
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Value::Collection(kind, _) => Some(*kind),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in diagnostics
    pub fn type_label(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Text(_) => "text".to_string(),
            Value::Date(_) => "date".to_string(),
            Value::Calendar(_) => "calendar".to_string(),
            Value::Enum(e) => format!("enum {}", e.type_name),
            Value::Collection(kind, _) => format!("{:?}", kind).to_lowercase(),
            Value::Map(_) => "map".to_string(),
            Value::Object(o) => o.type_name().to_string(),
        }
    }

    /// Hashable key with the same equality as `Value`: identity for objects and maps
    pub fn identity_key(&self) -> IdentityKey {
        match self {
            Value::Null => IdentityKey::Null,
            Value::Bool(b) => IdentityKey::Bool(*b),
            Value::Int(i) => IdentityKey::Int(*i),
            Value::Float(f) => IdentityKey::Float(f.to_bits()),
            Value::Char(c) => IdentityKey::Char(*c),
            Value::Text(s) => IdentityKey::Text(s.clone()),
            Value::Date(d) => IdentityKey::Instant(d.timestamp_nanos_opt().unwrap_or_default(), 0),
            Value::Calendar(c) => IdentityKey::Instant(
                c.timestamp_nanos_opt().unwrap_or_default(),
                c.offset().local_minus_utc(),
            ),
            Value::Enum(e) => IdentityKey::Enum(e.type_name.clone(), e.constant.clone()),
            Value::Collection(kind, items) => {
                IdentityKey::Collection(*kind, items.iter().map(Value::identity_key).collect())
            }
            Value::Map(m) => IdentityKey::Reference(m.address()),
            Value::Object(o) => IdentityKey::Reference(o.address()),
        }
    }
}

/// Hashable identity of a [`Value`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Char(char),
    Text(String),
    Instant(i64, i32),
    Enum(String, String),
    Collection(CollectionKind, Vec<IdentityKey>),
    Reference(usize),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Calendar(a), Value::Calendar(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Collection(ka, a), Value::Collection(kb, b)) => ka == kb && a == b,
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Char(c) => write!(f, "{}", c),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Calendar(c) => write!(f, "{}", c.to_rfc3339()),
            Value::Enum(e) => write!(f, "{}", e.constant),
            Value::Collection(_, items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.snapshot().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(o) => write!(f, "{}@{:x}", o.type_name(), o.address()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(c: DateTime<FixedOffset>) -> Self {
        Value::Calendar(c)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<MapRef> for Value {
    fn from(m: MapRef) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
