//! Explicit schema registry
//!
//! The registry holds every [`TypeDescriptor`] and [`EnumDescriptor`] the binder
//! may meet. Property discovery, assignability checks, instantiation and typed
//! JSON decoding all walk the descriptors' parent chains here.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

pub mod attributes;
pub mod descriptor;
pub mod property_type;

pub use attributes::{BindingAttribute, CascadeSpec, CascadeType, CompoundSource, SourceSpec};
pub use descriptor::{
    ConstructorDescriptor, ConstructorFn, EnumDescriptor, FactoryFn, MethodFn,
    ParameterDescriptor, PropertyDescriptor, TypeDescriptor, TypeDescriptorBuilder,
};
pub use property_type::{Primitive, PropertyType};

use crate::value::{MapRef, ObjectRef, Value};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Registry of type and enum descriptors, keyed by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    enums: HashMap<String, EnumDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing any previous descriptor with the same name
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        self
    }

    pub fn register_enum(&mut self, descriptor: EnumDescriptor) -> &mut Self {
        self.enums.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Chaining form of [`Self::register`]
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Chaining form of [`Self::register_enum`]
    pub fn with_enum(mut self, descriptor: EnumDescriptor) -> Self {
        self.register_enum(descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// The type followed by its registered ancestors
    pub fn lineage(&self, name: &str) -> Vec<&TypeDescriptor> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(name);
        while let Some(descriptor) = current {
            if !seen.insert(descriptor.name.as_str()) {
                tracing::warn!(type_name = name, "cyclic parent chain in type registry");
                break;
            }
            chain.push(descriptor);
            current = descriptor.parent.as_deref().and_then(|p| self.get(p));
        }
        chain
    }

    /// Properties of a type and its ancestors; a property redeclared lower in the chain hides the inherited one
    pub fn properties_of(&self, name: &str) -> Vec<&PropertyDescriptor> {
        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for descriptor in self.lineage(name) {
            for property in &descriptor.properties {
                if seen.insert(property.name.as_str()) {
                    properties.push(property);
                }
            }
        }
        properties
    }

    /// Resolve a property, returning it with the name of the type that declares it
    pub fn find_property(&self, type_name: &str, property: &str) -> Option<(&str, &PropertyDescriptor)> {
        self.lineage(type_name).into_iter().find_map(|descriptor| {
            descriptor
                .property(property)
                .map(|p| (descriptor.name.as_str(), p))
        })
    }

    /// Resolve a named zero-argument method through the parent chain
    pub fn find_method(&self, type_name: &str, method: &str) -> Option<&MethodFn> {
        self.lineage(type_name)
            .into_iter()
            .find_map(|descriptor| descriptor.method(method))
    }

    /// Class-level bean names of the type or its nearest ancestor that declares some
    pub fn bean_names_of(&self, type_name: &str) -> Option<&[String]> {
        self.lineage(type_name)
            .into_iter()
            .find_map(|descriptor| descriptor.bean_names())
    }

    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.lineage(sub).iter().any(|d| d.name == sup)
    }

    /// Look up an enum constant by name
    pub fn enum_constant(&self, enum_name: &str, constant: &str) -> Option<Value> {
        self.enums.get(enum_name).and_then(|e| {
            e.constants
                .iter()
                .find(|c| c.as_str() == constant)
                .map(|c| Value::enumeration(enum_name, c.clone()))
        })
    }

    /// Create an instance through the no-argument constructor; every property starts at its initial value
    pub fn instantiate(&self, type_name: &str) -> Result<ObjectRef> {
        let descriptor = self.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.to_string(),
        })?;
        if !descriptor.has_default_constructor {
            return Err(Error::configuration_for(
                type_name,
                "type has no no-argument constructor",
            ));
        }
        Ok(self.blank(type_name))
    }

    /// Invoke an argument constructor of a registered type
    pub fn construct(
        &self,
        type_name: &str,
        constructor: &ConstructorDescriptor,
        args: Vec<Value>,
    ) -> Result<ObjectRef> {
        if args.len() != constructor.params.len() {
            return Err(Error::Binding {
                message: format!(
                    "constructor of {} takes {} arguments, got {}",
                    type_name,
                    constructor.params.len(),
                    args.len()
                ),
            });
        }
        let args = constructor
            .params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(i, (param, arg))| {
                let found = arg.type_label();
                self.adapt(param.property_type(), arg).ok_or_else(|| Error::Binding {
                    message: format!(
                        "argument {} of {} constructor expects {}, got {}",
                        i,
                        type_name,
                        param.property_type().describe(),
                        found
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(body) = &constructor.body {
            return body(args);
        }
        let instance = self.blank(type_name);
        for (i, (param, arg)) in constructor.params.iter().zip(args).enumerate() {
            let field = param
                .field
                .clone()
                .unwrap_or_else(|| format!("arg{}", i));
            instance.set(field, arg);
        }
        Ok(instance)
    }

    /// Check a value against a declared type, including object assignability
    pub fn adapt(&self, ty: &PropertyType, value: Value) -> Option<Value> {
        if let (PropertyType::Object(expected), Value::Object(object)) = (ty, &value) {
            // Dynamic objects are trusted; registered ones must be subtypes.
            if self.contains(object.type_name())
                && !self.is_assignable(object.type_name(), expected)
            {
                return None;
            }
        }
        ty.adapt(value)
    }

    /// Decode JSON into an instance of `type_name`, typing nested values by the declared property types
    pub fn decode(&self, type_name: &str, json: &Json) -> Result<Value> {
        self.decode_as(&PropertyType::Object(type_name.to_string()), json)
    }

    fn decode_as(&self, ty: &PropertyType, json: &Json) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || Error::type_mismatch(ty.describe(), json.to_string());
        match ty {
            PropertyType::Any => Ok(Value::from_json(json)),
            PropertyType::Primitive(p) | PropertyType::Boxed(p) => match p {
                Primitive::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
                Primitive::Float | Primitive::Double => {
                    json.as_f64().map(Value::Float).ok_or_else(mismatch)
                }
                Primitive::Char => json
                    .as_str()
                    .and_then(|s| s.chars().next())
                    .map(Value::Char)
                    .ok_or_else(mismatch),
                _ => json.as_i64().map(Value::Int).ok_or_else(mismatch),
            },
            PropertyType::Text => json
                .as_str()
                .map(|s| Value::Text(s.to_string()))
                .ok_or_else(mismatch),
            PropertyType::Date => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| Value::Date(d.with_timezone(&Utc)))
                .ok_or_else(mismatch),
            PropertyType::Calendar => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(Value::Calendar)
                .ok_or_else(mismatch),
            PropertyType::Enum(name) => json
                .as_str()
                .and_then(|s| self.enum_constant(name, s))
                .ok_or_else(mismatch),
            PropertyType::Collection(kind, element) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                let items = items
                    .iter()
                    .map(|item| self.decode_as(element, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Collection(*kind, items))
            }
            PropertyType::Map => {
                let fields = json.as_object().ok_or_else(mismatch)?;
                Ok(Value::Map(MapRef::from_entries(
                    fields.iter().map(|(k, v)| (k.clone(), Value::from_json(v))),
                )))
            }
            PropertyType::Object(name) => {
                let fields = json.as_object().ok_or_else(mismatch)?;
                let instance = if self.contains(name) {
                    self.blank(name)
                } else {
                    ObjectRef::new(name.clone())
                };
                for (field, value) in fields {
                    let declared = self
                        .find_property(name, field)
                        .map(|(_, p)| p.ty.clone())
                        .unwrap_or(PropertyType::Any);
                    instance.set(field.clone(), self.decode_as(&declared, value)?);
                }
                Ok(Value::Object(instance))
            }
        }
    }

    fn blank(&self, type_name: &str) -> ObjectRef {
        let instance = ObjectRef::new(type_name);
        for property in self.properties_of(type_name) {
            if property.field_attributes.is_some() {
                instance.set(property.name.clone(), property.ty.initial_value());
            }
        }
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDescriptor::builder("Base")
                    .property(PropertyDescriptor::new("id", PropertyType::long()))
                    .property(PropertyDescriptor::new("label", PropertyType::Text))
                    .bean_names(["base"])
                    .method("describe", |o| Ok(Value::from(format!("#{}", o.get("id")))))
                    .build()
                    .unwrap(),
            )
            .with_type(
                TypeDescriptor::builder("Derived")
                    .extends("Base")
                    .property(PropertyDescriptor::new("label", PropertyType::int()))
                    .property(PropertyDescriptor::new("color", PropertyType::enumeration("Color")))
                    .property(PropertyDescriptor::new("when", PropertyType::Date))
                    .build()
                    .unwrap(),
            )
            .with_enum(EnumDescriptor::new("Color", ["RED", "GREEN"]))
    }

    #[test]
    fn test_construct_rejects_ill_typed_arguments() {
        let types = registry();
        let constructor = ConstructorDescriptor::new()
            .param(ParameterDescriptor::new(PropertyType::long()).field("id"))
            .param(ParameterDescriptor::new(PropertyType::double()).field("ratio"));

        let built = types
            .construct("Base", &constructor, vec![Value::Int(4), Value::Int(2)])
            .unwrap();
        assert_eq!(built.get("ratio"), Value::Float(2.0));

        let err = types
            .construct("Base", &constructor, vec![Value::from("four"), Value::Int(2)])
            .unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
    }

    #[test]
    fn test_properties_include_ancestors_and_respect_overrides() {
        let types = registry();
        let names: Vec<_> = types
            .properties_of("Derived")
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["label", "color", "when", "id"]);

        let (declaring, label) = types.find_property("Derived", "label").unwrap();
        assert_eq!(declaring, "Derived");
        assert_eq!(label.property_type(), &PropertyType::int());

        let (declaring, _) = types.find_property("Derived", "id").unwrap();
        assert_eq!(declaring, "Base");
    }

    #[test]
    fn test_inherited_methods_and_bean_names() {
        let types = registry();
        assert!(types.find_method("Derived", "describe").is_some());
        assert_eq!(
            types.bean_names_of("Derived"),
            Some(&["base".to_string()][..])
        );
        assert!(types.is_assignable("Derived", "Base"));
        assert!(!types.is_assignable("Base", "Derived"));
    }

    #[test]
    fn test_instantiate_sets_initial_values() {
        let types = registry();
        let instance = types.instantiate("Derived").unwrap();
        assert_eq!(instance.get("label"), Value::Int(0));
        assert_eq!(instance.get("id"), Value::Int(0));
        assert!(instance.get("color").is_null());
        assert!(matches!(
            types.instantiate("Missing"),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_adapt_checks_object_assignability() {
        let types = registry();
        let derived = Value::Object(types.instantiate("Derived").unwrap());
        assert!(types
            .adapt(&PropertyType::object("Base"), derived.clone())
            .is_some());
        let base = Value::Object(types.instantiate("Base").unwrap());
        assert!(types.adapt(&PropertyType::object("Derived"), base).is_none());
    }

    #[test]
    fn test_decode_types_nested_values() {
        let types = registry();
        let decoded = types
            .decode(
                "Derived",
                &json!({"id": 7, "label": 3, "color": "GREEN", "when": "2020-01-02T03:04:05Z", "extra": [1]}),
            )
            .unwrap();
        let object = decoded.as_object().unwrap();
        assert_eq!(object.get("id"), Value::Int(7));
        assert_eq!(object.get("color"), Value::enumeration("Color", "GREEN"));
        assert!(matches!(object.get("when"), Value::Date(_)));
        assert_eq!(object.get("extra"), Value::list([Value::Int(1)]));

        let bad = types.decode("Derived", &json!({"color": "BLUE"}));
        assert!(matches!(bad, Err(Error::TypeMismatch { .. })));
    }
}
