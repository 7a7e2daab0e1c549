//! Bean inspection: turning configuration into [`BeanMetadata`]
//!
//! Two inspectors read the same conventions from different places:
//! [`AttributeBeanInspector`] reads binding attributes from the type registry and
//! [`XmlBeanInspector`] reads a mapping document. The helpers in this module carry
//! the rules both share: default bean names, binding constructor choice, cascade
//! inference and the shape of a field built from its attributes.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

pub mod attribute;
pub mod xml;

pub use attribute::AttributeBeanInspector;
pub use xml::{MappingDocument, XmlBeanInspector};

use crate::metadata::{
    BeanLayout, BeanMetadata, CascadeMetadata, FieldMetadata, SourceBinding, DEFAULT_BEAN_NAME,
};
use crate::merger::ids;
use crate::types::{
    BindingAttribute, CascadeSpec, CascadeType, ConstructorDescriptor, PropertyType,
    SourceSpec, TypeDescriptor, TypeRegistry,
};
use crate::value::CollectionKind;
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Builds binding metadata for a DTO type
pub trait BeanInspector: Send + Sync + fmt::Debug {
    fn inspect(&self, type_name: &str, types: &TypeRegistry) -> Result<BeanMetadata>;

    /// Types this inspector describes up front, inspected eagerly when the binder is built
    fn mapped_types(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Declared bean names of the type or an ancestor, else the single default name
pub(crate) fn default_bean_names(types: &TypeRegistry, type_name: &str) -> Vec<String> {
    types
        .bean_names_of(type_name)
        .filter(|names| !names.is_empty())
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| vec![DEFAULT_BEAN_NAME.to_string()])
}

/// The designated constructor, or the last declared one
pub(crate) fn binding_constructor(descriptor: &TypeDescriptor) -> Result<Arc<ConstructorDescriptor>> {
    let constructors = descriptor.constructors();
    constructors
        .iter()
        .find(|c| c.is_designated())
        .or_else(|| constructors.last())
        .cloned()
        .ok_or_else(|| {
            Error::configuration_for(descriptor.name(), "no constructor to bind through")
        })
}

/// Cascade shape and target type, inferred from the property type unless given
pub(crate) fn infer_cascade(ty: &PropertyType, spec: &CascadeSpec) -> CascadeMetadata {
    let inferred = match ty {
        PropertyType::Collection(CollectionKind::Array, _) => CascadeType::Array,
        PropertyType::Collection(..) => CascadeType::Collection,
        _ => CascadeType::Single,
    };
    let cascade_type = spec.cascade_type.unwrap_or(inferred);
    let target_type = spec.target_type.clone().or_else(|| {
        let candidate = match cascade_type {
            CascadeType::Single => ty,
            _ => ty.element_type().unwrap_or(ty),
        };
        match candidate {
            PropertyType::Object(name) => Some(name.clone()),
            _ => None,
        }
    });
    CascadeMetadata {
        cascade_type,
        target_type,
    }
}

/// Whether an attribute list says anything about where the value comes from
pub(crate) fn configures_source(attributes: &[BindingAttribute]) -> bool {
    attributes
        .iter()
        .any(|a| a.is_source_configuration() || matches!(a, BindingAttribute::Cascade(_)))
}

/// Metadata of one field from the attributes of a single element
pub(crate) fn field_metadata(
    name: &str,
    ty: &PropertyType,
    attributes: &[BindingAttribute],
) -> Result<FieldMetadata> {
    let mut field = FieldMetadata::new(name, ty.clone());
    let mut single = None;
    let mut compound = None;
    for attribute in attributes {
        match attribute {
            BindingAttribute::Source(spec) => single = Some(spec),
            BindingAttribute::Sources(group) => compound = Some(group),
            BindingAttribute::Cascade(spec) => field.cascade = Some(infer_cascade(ty, spec)),
            BindingAttribute::Transient => field.field_transient = true,
        }
    }
    match (single, compound) {
        (Some(_), Some(_)) => {
            return Err(Error::configuration(format!(
                "'{}' is configured with both a single source and a source list",
                name
            )))
        }
        (Some(spec), None) => field.sources = vec![source_binding(name, spec)],
        (None, Some(group)) => {
            if group.sources.is_empty() {
                return Err(Error::configuration(format!(
                    "'{}' has an empty source list",
                    name
                )));
            }
            field.sources = group.sources.iter().map(|s| source_binding(name, s)).collect();
            field.compound = true;
            field.property_value_merger = group
                .merger
                .clone()
                .unwrap_or_else(|| ids::FIRST_OBJECT.to_string());
            field.merger_params = group.params.clone();
        }
        (None, None) => {}
    }
    Ok(field)
}

fn source_binding(field_name: &str, spec: &SourceSpec) -> SourceBinding {
    let path = if spec.path.trim().is_empty() {
        field_name.to_string()
    } else {
        spec.path.trim().to_string()
    };
    SourceBinding {
        path,
        merger: spec
            .merger
            .clone()
            .unwrap_or_else(|| ids::IDENTITY.to_string()),
        merger_params: spec.params.clone(),
        bean: spec.bean.clone(),
    }
}

/// Metadata of a constructor argument, which must say where its value comes from
pub(crate) fn constructor_arg(
    type_name: &str,
    position: usize,
    field_name: Option<&str>,
    ty: &PropertyType,
    attributes: &[BindingAttribute],
) -> Result<FieldMetadata> {
    if !attributes.iter().any(BindingAttribute::is_source_configuration) {
        return Err(Error::configuration_for(
            type_name,
            format!("constructor argument {} has no source configuration", position),
        ));
    }
    let name = field_name
        .map(str::to_string)
        .unwrap_or_else(|| format!("arg{}", position));
    field_metadata(&name, ty, attributes)
}

/// Assemble metadata, rejecting source bean labels the type does not declare
pub(crate) fn assemble(
    type_name: &str,
    default_bean_names: Vec<String>,
    layout: BeanLayout,
) -> Result<BeanMetadata> {
    let metadata = BeanMetadata {
        type_name: type_name.to_string(),
        default_bean_names,
        layout,
    };
    for field in metadata.fields() {
        for source in &field.sources {
            if let Some(bean) = &source.bean {
                if metadata.bean_position(bean).is_none() {
                    return Err(Error::configuration_for(
                        type_name,
                        format!(
                            "field '{}' reads from unknown source bean '{}' (declared: {})",
                            field.name,
                            bean,
                            metadata.default_bean_names.join(", ")
                        ),
                    ));
                }
            }
        }
    }
    tracing::debug!(
        type_name,
        immutable = metadata.is_immutable(),
        fields = metadata.fields().len(),
        "inspected bean"
    );
    Ok(metadata)
}
