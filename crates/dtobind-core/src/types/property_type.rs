//! Declared types of properties and constructor parameters

use crate::value::{CollectionKind, Value};
use serde::{Deserialize, Serialize};

/// Primitive slots that can never hold null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl Primitive {
    /// The zero-equivalent a primitive slot receives instead of null
    pub fn default_value(self) -> Value {
        match self {
            Primitive::Bool => Value::Bool(false),
            Primitive::Byte | Primitive::Short | Primitive::Int | Primitive::Long => Value::Int(0),
            Primitive::Float | Primitive::Double => Value::Float(0.0),
            Primitive::Char => Value::Char('\0'),
        }
    }

    fn is_integral(self) -> bool {
        matches!(
            self,
            Primitive::Byte | Primitive::Short | Primitive::Int | Primitive::Long
        )
    }

    /// Fit a non-null value into this slot, widening integers for floating slots
    fn adapt(self, value: Value) -> Option<Value> {
        match (self, value) {
            (Primitive::Bool, v @ Value::Bool(_)) => Some(v),
            (Primitive::Char, v @ Value::Char(_)) => Some(v),
            (p, v @ Value::Int(_)) if p.is_integral() => Some(v),
            (Primitive::Float | Primitive::Double, v @ Value::Float(_)) => Some(v),
            (Primitive::Float | Primitive::Double, Value::Int(i)) => Some(Value::Float(i as f64)),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Char => "char",
        }
    }
}

/// The declared type of a bindable slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Untyped; accepts anything
    Any,
    Primitive(Primitive),
    /// Nullable wrapper of a primitive
    Boxed(Primitive),
    Text,
    Date,
    Calendar,
    Enum(String),
    Object(String),
    Collection(CollectionKind, Box<PropertyType>),
    Map,
}

impl PropertyType {
    pub fn text() -> Self {
        PropertyType::Text
    }

    pub fn int() -> Self {
        PropertyType::Primitive(Primitive::Int)
    }

    pub fn long() -> Self {
        PropertyType::Primitive(Primitive::Long)
    }

    pub fn double() -> Self {
        PropertyType::Primitive(Primitive::Double)
    }

    pub fn boolean() -> Self {
        PropertyType::Primitive(Primitive::Bool)
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        PropertyType::Object(type_name.into())
    }

    pub fn enumeration(type_name: impl Into<String>) -> Self {
        PropertyType::Enum(type_name.into())
    }

    pub fn list_of(element: PropertyType) -> Self {
        PropertyType::Collection(CollectionKind::List, Box::new(element))
    }

    pub fn set_of(element: PropertyType) -> Self {
        PropertyType::Collection(CollectionKind::Set, Box::new(element))
    }

    pub fn array_of(element: PropertyType) -> Self {
        PropertyType::Collection(CollectionKind::Array, Box::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, PropertyType::Primitive(_))
    }

    /// Element type of a collection type
    pub fn element_type(&self) -> Option<&PropertyType> {
        match self {
            PropertyType::Collection(_, element) => Some(element),
            _ => None,
        }
    }

    /// Value a freshly instantiated object holds in a slot of this type
    pub fn initial_value(&self) -> Value {
        match self {
            PropertyType::Primitive(p) => p.default_value(),
            _ => Value::Null,
        }
    }

    /// Fit `value` into this slot without consulting the type hierarchy.
    ///
    /// Object slots accept any object here; callers that know the registry check
    /// assignability on top.
    pub fn adapt(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (PropertyType::Any, v) => Some(v),
            (PropertyType::Primitive(_), Value::Null) => None,
            (_, Value::Null) => Some(Value::Null),
            (PropertyType::Primitive(p) | PropertyType::Boxed(p), v) => p.adapt(v),
            (PropertyType::Text, v @ Value::Text(_)) => Some(v),
            (PropertyType::Date, v @ Value::Date(_)) => Some(v),
            (PropertyType::Calendar, v @ Value::Calendar(_)) => Some(v),
            (PropertyType::Enum(name), Value::Enum(e)) if &e.type_name == name => {
                Some(Value::Enum(e))
            }
            (PropertyType::Object(_), v @ Value::Object(_)) => Some(v),
            (PropertyType::Collection(kind, _), Value::Collection(other, items))
                if kind.accepts(other) =>
            {
                Some(Value::Collection(other, items))
            }
            (PropertyType::Map, v @ Value::Map(_)) => Some(v),
            _ => None,
        }
    }

    /// Parse a type name as written in XML mappings (`int`, `Integer`, `String`, `Foo[]`, `List<Foo>`)
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return PropertyType::array_of(PropertyType::parse(element));
        }
        if let Some((outer, inner)) = name.split_once('<') {
            let inner = inner.trim_end_matches('>');
            let kind = match simple_name(outer) {
                "Set" | "HashSet" => Some(CollectionKind::Set),
                "SortedSet" | "TreeSet" => Some(CollectionKind::SortedSet),
                "LinkedList" => Some(CollectionKind::LinkedList),
                "List" | "ArrayList" | "Collection" => Some(CollectionKind::List),
                _ => None,
            };
            if let Some(kind) = kind {
                return PropertyType::Collection(kind, Box::new(PropertyType::parse(inner)));
            }
            if simple_name(outer) == "Map" || simple_name(outer) == "HashMap" {
                return PropertyType::Map;
            }
        }
        match simple_name(name) {
            "" | "Object" | "any" => PropertyType::Any,
            "boolean" => PropertyType::Primitive(Primitive::Bool),
            "byte" => PropertyType::Primitive(Primitive::Byte),
            "short" => PropertyType::Primitive(Primitive::Short),
            "int" => PropertyType::Primitive(Primitive::Int),
            "long" => PropertyType::Primitive(Primitive::Long),
            "float" => PropertyType::Primitive(Primitive::Float),
            "double" => PropertyType::Primitive(Primitive::Double),
            "char" => PropertyType::Primitive(Primitive::Char),
            "Boolean" => PropertyType::Boxed(Primitive::Bool),
            "Byte" => PropertyType::Boxed(Primitive::Byte),
            "Short" => PropertyType::Boxed(Primitive::Short),
            "Integer" => PropertyType::Boxed(Primitive::Int),
            "Long" => PropertyType::Boxed(Primitive::Long),
            "Float" => PropertyType::Boxed(Primitive::Float),
            "Double" => PropertyType::Boxed(Primitive::Double),
            "Character" => PropertyType::Boxed(Primitive::Char),
            "String" => PropertyType::Text,
            "Date" => PropertyType::Date,
            "Calendar" => PropertyType::Calendar,
            "Map" | "HashMap" => PropertyType::Map,
            "List" | "ArrayList" => PropertyType::list_of(PropertyType::Any),
            "Set" | "HashSet" => PropertyType::set_of(PropertyType::Any),
            _ => PropertyType::Object(name.to_string()),
        }
    }

    /// Human readable name for diagnostics
    pub fn describe(&self) -> String {
        match self {
            PropertyType::Any => "any".to_string(),
            PropertyType::Primitive(p) => p.name().to_string(),
            PropertyType::Boxed(p) => format!("{}?", p.name()),
            PropertyType::Text => "text".to_string(),
            PropertyType::Date => "date".to_string(),
            PropertyType::Calendar => "calendar".to_string(),
            PropertyType::Enum(name) => format!("enum {}", name),
            PropertyType::Object(name) => name.clone(),
            PropertyType::Collection(kind, element) => {
                format!("{:?}<{}>", kind, element.describe())
            }
            PropertyType::Map => "map".to_string(),
        }
    }
}

/// Strip a dotted package prefix: `acme.model.String` -> `String`
fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}
