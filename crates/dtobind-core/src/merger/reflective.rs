//! Mergers that call registered methods or project collections through the accessor

use super::{required_param, AccessorSlot, PropertyAccessorAware, SinglePropertyValueMerger};
use crate::accessor::PropertyAccessor;
use crate::value::Value;
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Calls a named zero-argument method on the value.
///
/// Restoring calls the static factory named by the third parameter on the type named
/// by the second, or that type's one-argument constructor when no factory is named.
#[derive(Debug, Default)]
pub struct MethodCallMerger {
    accessor: AccessorSlot,
}

impl PropertyAccessorAware for MethodCallMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for MethodCallMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let method = required_param(params, "method name")?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        if let Value::Object(object) = value {
            let types = self.accessor.get()?.types();
            if let Some(call) = types.find_method(object.type_name(), method) {
                return call(object);
            }
        }
        builtin_method(value, method).ok_or_else(|| {
            Error::configuration(format!(
                "no method '{}' on {}",
                method,
                value.type_label()
            ))
        })
    }

    fn is_restore_supported(&self, params: &[String]) -> bool {
        params.get(1).is_some_and(|t| !t.is_empty())
    }

    fn restore(&self, merged: &Value, params: &[String]) -> Result<Value> {
        let type_name = params
            .get(1)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::configuration("method call restore needs a target type"))?;
        if merged.is_null() {
            return Ok(Value::Null);
        }
        let types = self.accessor.get()?.types();
        let descriptor = types.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.clone(),
        })?;

        if let Some(factory_name) = params.get(2).filter(|f| !f.is_empty()) {
            let factory = descriptor.factory(factory_name).ok_or_else(|| {
                Error::configuration_for(
                    type_name.as_str(),
                    format!("no static factory '{}'", factory_name),
                )
            })?;
            return factory(merged);
        }

        let constructor = descriptor
            .constructors()
            .iter()
            .find(|c| c.params().len() == 1)
            .ok_or_else(|| {
                Error::configuration_for(type_name.as_str(), "no one-argument constructor")
            })?;
        types
            .construct(type_name, constructor, vec![merged.clone()])
            .map(Value::Object)
    }
}

/// Methods every value of a shape answers to
fn builtin_method(value: &Value, method: &str) -> Option<Value> {
    if method == "toString" {
        return Some(Value::Text(value.to_string()));
    }
    match (value, method) {
        (Value::Text(s), "length") => Some(Value::Int(s.chars().count() as i64)),
        (Value::Text(s), "toUpperCase") => Some(Value::Text(s.to_uppercase())),
        (Value::Text(s), "toLowerCase") => Some(Value::Text(s.to_lowercase())),
        (Value::Text(s), "trim") => Some(Value::Text(s.trim().to_string())),
        (Value::Text(s), "isEmpty") => Some(Value::Bool(s.is_empty())),
        (Value::Text(s), "hashCode") => Some(Value::Int(text_hash(s) as i64)),
        (Value::Collection(_, items), "size") => Some(Value::Int(items.len() as i64)),
        (Value::Collection(_, items), "isEmpty") => Some(Value::Bool(items.is_empty())),
        (Value::Map(map), "size") => Some(Value::Int(map.len() as i64)),
        (Value::Map(map), "isEmpty") => Some(Value::Bool(map.is_empty())),
        _ => None,
    }
}

/// 31-based polynomial hash over UTF-16 units
fn text_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Projects each element of a collection to one of its properties, keeping the collection kind
#[derive(Debug, Default)]
pub struct PropertyCollectionMerger {
    accessor: AccessorSlot,
}

impl PropertyAccessorAware for PropertyCollectionMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for PropertyCollectionMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let property = required_param(params, "property name")?;
        let (kind, items) = match value {
            Value::Null => return Ok(Value::Null),
            Value::Collection(kind, items) => (*kind, items),
            other => return Err(Error::type_mismatch("collection", other.type_label())),
        };
        if !kind.is_instantiable() {
            tracing::warn!(?kind, property, "cannot create a collection of this kind");
            return Ok(Value::Null);
        }
        let accessor = self.accessor.get()?;
        let mut seen = HashSet::new();
        let projected = items
            .iter()
            .map(|item| accessor.read(property, item))
            .filter(|v| !kind.is_set() || seen.insert(v.identity_key()))
            .collect();
        Ok(Value::Collection(kind, projected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ConstructorDescriptor, ParameterDescriptor, PropertyDescriptor, PropertyType,
        TypeDescriptor, TypeRegistry,
    };
    use crate::value::{CollectionKind, ObjectRef};

    fn types() -> TypeRegistry {
        TypeRegistry::new().with_type(
            TypeDescriptor::builder("Money")
                .property(PropertyDescriptor::new("amount", PropertyType::long()))
                .constructor(
                    ConstructorDescriptor::new()
                        .param(ParameterDescriptor::new(PropertyType::long()).field("amount")),
                )
                .default_constructor()
                .method("cents", |o| Ok(Value::Int(o.get("amount").as_i64().unwrap_or(0) * 100)))
                .factory("parse", |v| {
                    let money = ObjectRef::new("Money");
                    let amount = v.as_str().and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
                    money.set("amount", Value::Int(amount));
                    Ok(Value::Object(money))
                })
                .build()
                .unwrap(),
        )
    }

    fn with_accessor<M: PropertyAccessorAware>(merger: M) -> M {
        merger.set_property_accessor(Arc::new(PropertyAccessor::new(Arc::new(types()))));
        merger
    }

    fn params(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_method_call_on_registered_type() {
        let merger = with_accessor(MethodCallMerger::default());
        let money = ObjectRef::new("Money");
        money.set("amount", Value::Int(12));
        let result = merger.merge(&Value::Object(money), &params(&["cents"])).unwrap();
        assert_eq!(result, Value::Int(1200));
    }

    #[test]
    fn test_method_call_builtins() {
        let merger = with_accessor(MethodCallMerger::default());
        let text = Value::from("  Hi ");
        assert_eq!(merger.merge(&text, &params(&["trim"])).unwrap(), Value::from("Hi"));
        assert_eq!(merger.merge(&text, &params(&["length"])).unwrap(), Value::Int(5));
        assert_eq!(
            merger.merge(&Value::from("hello"), &params(&["hashCode"])).unwrap(),
            Value::Int(99162322)
        );
        let list = Value::list([Value::Int(1), Value::Int(2)]);
        assert_eq!(merger.merge(&list, &params(&["size"])).unwrap(), Value::Int(2));
        assert!(merger.merge(&Value::Null, &params(&["size"])).unwrap().is_null());
        assert!(merger
            .merge(&Value::Int(1), &params(&["explode"]))
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_method_call_restore() {
        let merger = with_accessor(MethodCallMerger::default());
        assert!(!merger.is_restore_supported(&params(&["toString"])));
        assert!(merger.is_restore_supported(&params(&["toString", "Money"])));

        let via_constructor = merger
            .restore(&Value::Int(5), &params(&["toString", "Money"]))
            .unwrap();
        assert_eq!(via_constructor.as_object().unwrap().get("amount"), Value::Int(5));

        let via_factory = merger
            .restore(&Value::from("7"), &params(&["toString", "Money", "parse"]))
            .unwrap();
        assert_eq!(via_factory.as_object().unwrap().get("amount"), Value::Int(7));

        assert!(matches!(
            merger.restore(&Value::Int(1), &params(&["toString", "Unknown"])),
            Err(Error::UnknownType { .. })
        ));
        assert!(merger
            .restore(&Value::Int(1), &params(&["toString", "Money", "missing"]))
            .is_err());
    }

    #[test]
    fn test_property_collection_keeps_kind() {
        let merger = with_accessor(PropertyCollectionMerger::default());
        let people = vec![
            Value::from_json(&serde_json::json!({"name": "a"})),
            Value::from_json(&serde_json::json!({"name": "b"})),
            Value::from_json(&serde_json::json!({"name": "a"})),
        ];

        let list = Value::Collection(CollectionKind::LinkedList, people.clone());
        let names = merger.merge(&list, &params(&["name"])).unwrap();
        assert_eq!(names.collection_kind(), Some(CollectionKind::LinkedList));
        assert_eq!(names.items().unwrap().len(), 3);

        let set = Value::Collection(CollectionKind::Set, people.clone());
        let names = merger.merge(&set, &params(&["name"])).unwrap();
        assert_eq!(names, Value::set([Value::from("a"), Value::from("b")]));

        let frozen = Value::Collection(CollectionKind::UnmodifiableList, people);
        assert!(merger.merge(&frozen, &params(&["name"])).unwrap().is_null());
        assert!(merger.merge(&Value::Null, &params(&["name"])).unwrap().is_null());
    }
}
