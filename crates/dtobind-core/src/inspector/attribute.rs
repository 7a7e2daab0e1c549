//! Inspection of binding attributes declared on type descriptors

use super::{
    assemble, binding_constructor, configures_source, constructor_arg, default_bean_names,
    field_metadata, BeanInspector,
};
use crate::metadata::{BeanLayout, BeanMetadata, FieldMetadata};
use crate::types::{BindingAttribute, PropertyDescriptor, TypeDescriptor, TypeRegistry};
use crate::{Error, Result};

/// Reads getter, field and constructor parameter attributes from the registry
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeBeanInspector;

impl AttributeBeanInspector {
    pub fn new() -> Self {
        Self
    }

    fn mutable_fields(&self, type_name: &str, types: &TypeRegistry) -> Result<Vec<FieldMetadata>> {
        types
            .properties_of(type_name)
            .into_iter()
            .filter(|p| p.is_readable())
            .map(property_field)
            .collect()
    }

    fn constructor_fields(&self, descriptor: &TypeDescriptor) -> Result<BeanLayout> {
        let constructor = binding_constructor(descriptor)?;
        let constructor_args = constructor
            .params()
            .iter()
            .enumerate()
            .map(|(i, param)| {
                constructor_arg(
                    descriptor.name(),
                    i,
                    param.field_name(),
                    param.property_type(),
                    param.attributes(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BeanLayout::Immutable {
            constructor_args,
            constructor,
        })
    }
}

impl BeanInspector for AttributeBeanInspector {
    fn inspect(&self, type_name: &str, types: &TypeRegistry) -> Result<BeanMetadata> {
        let descriptor = types.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.to_string(),
        })?;
        let layout = if descriptor.has_default_constructor() {
            BeanLayout::Mutable {
                fields: self.mutable_fields(type_name, types)?,
            }
        } else {
            self.constructor_fields(descriptor)?
        };
        assemble(type_name, default_bean_names(types, type_name), layout)
    }
}

/// Field attributes win when the field configures its source; transient marks from either count
fn property_field(property: &PropertyDescriptor) -> Result<FieldMetadata> {
    let getter = property.getter_attributes();
    let field = property.field_attributes().unwrap_or(&[]);
    let chosen = if configures_source(field) { field } else { getter };
    let ignored = if configures_source(field) { getter } else { field };
    // The unused element is still checked so a conflicting declaration never goes unnoticed.
    field_metadata(property.name(), property.property_type(), ignored)?;

    let mut metadata = field_metadata(property.name(), property.property_type(), chosen)?;
    if getter.contains(&BindingAttribute::Transient) || field.contains(&BindingAttribute::Transient) {
        metadata.field_transient = true;
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::ids;
    use crate::metadata::ROOT_OBJECT;
    use crate::types::{
        CascadeType, CompoundSource, ConstructorDescriptor, ParameterDescriptor, PropertyType,
        SourceSpec,
    };

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDescriptor::builder("BaseDto")
                    .property(PropertyDescriptor::new("id", PropertyType::long()))
                    .bean_names(["order", "customer"])
                    .build()
                    .unwrap(),
            )
            .with_type(
                TypeDescriptor::builder("OrderDto")
                    .extends("BaseDto")
                    .property(
                        PropertyDescriptor::new("customerName", PropertyType::Text)
                            .source_spec(SourceSpec::new("name").bean("customer")),
                    )
                    .property(
                        PropertyDescriptor::new("lines", PropertyType::list_of(PropertyType::object("LineDto")))
                            .field_attribute(BindingAttribute::Source(SourceSpec::new("items")))
                            .cascade(),
                    )
                    .property(
                        PropertyDescriptor::new("label", PropertyType::Text)
                            .sources(
                                CompoundSource::new()
                                    .source(SourceSpec::new("code"))
                                    .source(SourceSpec::new("name").bean("customer"))
                                    .merger(ids::STRING_FORMAT)
                                    .param("%s/%s"),
                            ),
                    )
                    .property(PropertyDescriptor::new("cache", PropertyType::Any).transient())
                    .property(PropertyDescriptor::new("self", PropertyType::Any).source(ROOT_OBJECT))
                    .build()
                    .unwrap(),
            )
            .with_type(
                TypeDescriptor::builder("Point")
                    .constructor(
                        ConstructorDescriptor::new()
                            .param(ParameterDescriptor::new(PropertyType::int()).field("x").source("left"))
                            .param(ParameterDescriptor::new(PropertyType::int()).source("top")),
                    )
                    .build()
                    .unwrap(),
            )
    }

    #[test]
    fn test_mutable_inspection() {
        let types = registry();
        let metadata = AttributeBeanInspector.inspect("OrderDto", &types).unwrap();
        assert!(!metadata.is_immutable());
        assert_eq!(metadata.default_bean_names, vec!["order", "customer"]);

        let names: Vec<_> = metadata.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["customerName", "lines", "label", "cache", "self", "id"]);

        let customer = metadata.field("customerName").unwrap();
        assert_eq!(customer.sources[0].bean.as_deref(), Some("customer"));

        // The field's source wins, the getter's cascade is not consulted.
        let lines = metadata.field("lines").unwrap();
        assert_eq!(lines.sources[0].path, "items");
        assert!(lines.cascade.is_none());

        let label = metadata.field("label").unwrap();
        assert!(label.compound);
        assert_eq!(label.property_value_merger, ids::STRING_FORMAT);

        assert!(metadata.field("cache").unwrap().field_transient);
        assert!(metadata.field("self").unwrap().sources[0].is_root());
    }

    #[test]
    fn test_getter_cascade_is_inferred() {
        let types = TypeRegistry::new().with_type(
            TypeDescriptor::builder("Parent")
                .property(
                    PropertyDescriptor::new("children", PropertyType::array_of(PropertyType::object("Child")))
                        .cascade(),
                )
                .build()
                .unwrap(),
        );
        let metadata = AttributeBeanInspector.inspect("Parent", &types).unwrap();
        let cascade = metadata.field("children").unwrap().cascade.clone().unwrap();
        assert_eq!(cascade.cascade_type, CascadeType::Array);
        assert_eq!(cascade.target_type.as_deref(), Some("Child"));
    }

    #[test]
    fn test_immutable_inspection() {
        let types = registry();
        let metadata = AttributeBeanInspector.inspect("Point", &types).unwrap();
        assert!(metadata.is_immutable());
        let names: Vec<_> = metadata.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["x", "arg1"]);
        assert_eq!(metadata.fields()[1].sources[0].path, "top");
    }

    #[test]
    fn test_immutable_without_sources_is_rejected() {
        let types = TypeRegistry::new().with_type(
            TypeDescriptor::builder("Broken")
                .constructor(ConstructorDescriptor::new().param(ParameterDescriptor::new(PropertyType::Text)))
                .build()
                .unwrap(),
        );
        let err = AttributeBeanInspector.inspect("Broken", &types).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_conflict_on_unused_element_is_reported() {
        let types = TypeRegistry::new().with_type(
            TypeDescriptor::builder("Conflicted")
                .property(
                    PropertyDescriptor::new("v", PropertyType::Text)
                        .source("a")
                        .sources(CompoundSource::new().source(SourceSpec::new("b")))
                        .field_attribute(BindingAttribute::Source(SourceSpec::new("c"))),
                )
                .build()
                .unwrap(),
        );
        assert!(AttributeBeanInspector.inspect("Conflicted", &types).is_err());
    }

    #[test]
    fn test_unknown_type() {
        let err = AttributeBeanInspector
            .inspect("Nope", &TypeRegistry::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }
}
