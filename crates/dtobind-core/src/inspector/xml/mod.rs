//! XML mapping documents and the inspector that reads them
//!
//! A mapping document describes DTO types the same way binding attributes do.
//! Types that are mapped but not registered are bound as dynamic objects.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

mod parser;

pub use parser::parse;

use super::{
    assemble, binding_constructor, constructor_arg, default_bean_names, field_metadata,
    BeanInspector,
};
use crate::metadata::{BeanLayout, BeanMetadata};
use crate::types::{
    BindingAttribute, CascadeSpec, CascadeType, CompoundSource, ConstructorDescriptor,
    PropertyType, SourceSpec, TypeDescriptor, TypeRegistry,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Source declaration of a mapped field or constructor argument
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceMapping {
    /// No declaration: read the same-named property
    #[default]
    Default,
    Single(SourceSpec),
    Compound(CompoundSource),
}

/// A `<targetField>` entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub name: String,
    pub transient: bool,
    pub cascade: bool,
    /// Explicit cascade target type
    pub field_type: Option<String>,
    pub cascade_type: Option<CascadeType>,
    pub source: SourceMapping,
}

impl FieldMapping {
    /// The binding attributes this entry stands for
    pub fn attributes(&self) -> Vec<BindingAttribute> {
        let mut attributes = source_attributes(&self.source);
        if self.cascade {
            attributes.push(BindingAttribute::Cascade(CascadeSpec {
                cascade_type: self.cascade_type,
                target_type: self.field_type.clone(),
            }));
        }
        if self.transient {
            attributes.push(BindingAttribute::Transient);
        }
        attributes
    }
}

/// An `<arg>` of an `<immutableConstructor>`
#[derive(Debug, Clone, PartialEq)]
pub struct ArgMapping {
    pub order: usize,
    pub type_name: Option<String>,
    pub source: SourceMapping,
}

fn source_attributes(source: &SourceMapping) -> Vec<BindingAttribute> {
    match source {
        SourceMapping::Default => Vec::new(),
        SourceMapping::Single(spec) => vec![BindingAttribute::Source(spec.clone())],
        SourceMapping::Compound(compound) => vec![BindingAttribute::Sources(compound.clone())],
    }
}

/// A `<dto>` entry
#[derive(Debug, Clone, PartialEq)]
pub struct DtoMapping {
    pub type_name: String,
    pub bean_names: Vec<String>,
    pub fields: Vec<FieldMapping>,
    pub constructor: Option<Vec<ArgMapping>>,
}

impl DtoMapping {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            bean_names: Vec::new(),
            fields: Vec::new(),
            constructor: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A parsed `<dto-mapping>` document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingDocument {
    dtos: BTreeMap<String, DtoMapping>,
}

impl MappingDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        parse(xml)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| Error::Io {
            message: format!("cannot read mapping file {}", path.display()),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading XML mapping");
        parse(&xml)
    }

    pub fn get(&self, type_name: &str) -> Option<&DtoMapping> {
        self.dtos.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.dtos.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dtos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dtos.is_empty()
    }

    /// Add a mapping; a type may be mapped only once
    pub fn insert(&mut self, mapping: DtoMapping) -> Result<()> {
        if self.dtos.contains_key(&mapping.type_name) {
            return Err(Error::xml(format!(
                "type {} is mapped more than once",
                mapping.type_name
            )));
        }
        self.dtos.insert(mapping.type_name.clone(), mapping);
        Ok(())
    }
}

/// Reads binding configuration from a mapping document
#[derive(Debug, Clone)]
pub struct XmlBeanInspector {
    document: Arc<MappingDocument>,
}

impl XmlBeanInspector {
    pub fn new(document: MappingDocument) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        MappingDocument::parse(xml).map(Self::new)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        MappingDocument::from_file(path).map(Self::new)
    }

    pub fn document(&self) -> &MappingDocument {
        &self.document
    }

    fn registered(
        &self,
        descriptor: &TypeDescriptor,
        mapping: Option<&DtoMapping>,
        types: &TypeRegistry,
    ) -> Result<BeanLayout> {
        let type_name = descriptor.name();
        if let Some(args) = mapping.and_then(|m| m.constructor.as_ref()) {
            return constructor_layout(descriptor, args);
        }
        if !descriptor.has_default_constructor() {
            return Err(Error::configuration_for(
                type_name,
                "type has no no-argument constructor and no <immutableConstructor> mapping",
            ));
        }

        let properties: Vec<_> = types
            .properties_of(type_name)
            .into_iter()
            .filter(|p| p.is_readable())
            .collect();
        if let Some(mapping) = mapping {
            if let Some(stray) = mapping
                .fields
                .iter()
                .find(|f| !properties.iter().any(|p| p.name() == f.name))
            {
                return Err(Error::configuration_for(
                    type_name,
                    format!("mapped field '{}' is not a readable property", stray.name),
                ));
            }
        }

        let fields = properties
            .into_iter()
            .map(|property| {
                let attributes = mapping
                    .and_then(|m| m.field(property.name()))
                    .map(FieldMapping::attributes)
                    .unwrap_or_default();
                field_metadata(property.name(), property.property_type(), &attributes)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BeanLayout::Mutable { fields })
    }

    fn dynamic(&self, mapping: &DtoMapping) -> Result<BeanLayout> {
        if mapping.constructor.is_some() {
            return Err(Error::configuration_for(
                mapping.type_name.as_str(),
                "<immutableConstructor> needs a registered type",
            ));
        }
        let fields = mapping
            .fields
            .iter()
            .map(|field| {
                let ty = match (&field.field_type, field.cascade) {
                    (Some(name), false) => PropertyType::parse(name),
                    _ => PropertyType::Any,
                };
                field_metadata(&field.name, &ty, &field.attributes())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BeanLayout::Mutable { fields })
    }
}

impl BeanInspector for XmlBeanInspector {
    fn inspect(&self, type_name: &str, types: &TypeRegistry) -> Result<BeanMetadata> {
        let mapping = self.document.get(type_name);
        let layout = match (types.get(type_name), mapping) {
            (Some(descriptor), mapping) => self.registered(descriptor, mapping, types)?,
            (None, Some(mapping)) => self.dynamic(mapping)?,
            (None, None) => {
                return Err(Error::UnknownType {
                    type_name: type_name.to_string(),
                })
            }
        };
        let bean_names = match mapping {
            Some(m) if !m.bean_names.is_empty() => m.bean_names.clone(),
            _ => default_bean_names(types, type_name),
        };
        assemble(type_name, bean_names, layout)
    }

    fn mapped_types(&self) -> Vec<String> {
        self.document.type_names().map(str::to_string).collect()
    }
}

/// Constructor layout from `<arg>` entries; orders must run 0..n without gaps
fn constructor_layout(descriptor: &TypeDescriptor, args: &[ArgMapping]) -> Result<BeanLayout> {
    let type_name = descriptor.name();
    let mut args: Vec<&ArgMapping> = args.iter().collect();
    args.sort_by_key(|a| a.order);
    if args.iter().enumerate().any(|(i, a)| a.order != i) {
        return Err(Error::xml(format!(
            "constructor args of {} must be numbered 0..{} without gaps",
            type_name,
            args.len()
        )));
    }

    let constructor = matching_constructor(descriptor, args.len())?;
    let constructor_args = args
        .iter()
        .zip(constructor.params())
        .enumerate()
        .map(|(i, (arg, param))| {
            let ty = arg
                .type_name
                .as_deref()
                .map(PropertyType::parse)
                .unwrap_or_else(|| param.property_type().clone());
            constructor_arg(
                type_name,
                i,
                param.field_name(),
                &ty,
                &source_attributes(&arg.source),
            )
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BeanLayout::Immutable {
        constructor_args,
        constructor,
    })
}

/// The binding constructor when its arity fits, else the last constructor that does
fn matching_constructor(descriptor: &TypeDescriptor, arity: usize) -> Result<Arc<ConstructorDescriptor>> {
    if let Ok(preferred) = binding_constructor(descriptor) {
        if preferred.params().len() == arity {
            return Ok(preferred);
        }
    }
    descriptor
        .constructors()
        .iter()
        .rev()
        .find(|c| c.params().len() == arity)
        .cloned()
        .ok_or_else(|| {
            Error::configuration_for(
                descriptor.name(),
                format!("no constructor takes {} arguments", arity),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DEFAULT_BEAN_NAME;
    use crate::types::{ParameterDescriptor, PropertyDescriptor};

    fn types() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDescriptor::builder("PersonDto")
                    .property(PropertyDescriptor::new("name", PropertyType::Text))
                    .property(PropertyDescriptor::new("age", PropertyType::int()))
                    .property(PropertyDescriptor::new(
                        "friends",
                        PropertyType::list_of(PropertyType::object("PersonDto")),
                    ))
                    .build()
                    .unwrap(),
            )
            .with_type(
                TypeDescriptor::builder("Point")
                    .constructor(
                        ConstructorDescriptor::new()
                            .param(ParameterDescriptor::new(PropertyType::int()).field("x"))
                            .param(ParameterDescriptor::new(PropertyType::int()).field("y")),
                    )
                    .build()
                    .unwrap(),
            )
    }

    #[test]
    fn test_registered_type_with_partial_mapping() {
        let inspector = XmlBeanInspector::from_xml(
            r#"<dto-mapping>
                 <dto type="PersonDto">
                   <targetField fieldName="name"><source name="fullName" merger="to_string"/></targetField>
                   <targetField fieldName="friends" cascade="true"/>
                 </dto>
               </dto-mapping>"#,
        )
        .unwrap();
        let metadata = inspector.inspect("PersonDto", &types()).unwrap();
        assert_eq!(metadata.default_bean_names, vec![DEFAULT_BEAN_NAME]);
        assert_eq!(metadata.field("name").unwrap().sources[0].path, "fullName");
        assert_eq!(metadata.field("age").unwrap().sources[0].path, "age");

        let friends = metadata.field("friends").unwrap().cascade.clone().unwrap();
        assert_eq!(friends.cascade_type, CascadeType::Collection);
        assert_eq!(friends.target_type.as_deref(), Some("PersonDto"));
    }

    #[test]
    fn test_unmapped_registered_type_uses_defaults() {
        let inspector = XmlBeanInspector::new(MappingDocument::default());
        let metadata = inspector.inspect("PersonDto", &types()).unwrap();
        assert_eq!(metadata.fields().len(), 3);
        assert!(metadata.fields().iter().all(|f| f.cascade.is_none()));
    }

    #[test]
    fn test_constructor_mapping() {
        let inspector = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="Point"><immutableConstructor>
                 <arg order="1"><source name="top"/></arg>
                 <arg order="0" type="long"><source name="left"/></arg>
               </immutableConstructor></dto></dto-mapping>"#,
        )
        .unwrap();
        let metadata = inspector.inspect("Point", &types()).unwrap();
        assert!(metadata.is_immutable());
        let args = metadata.fields();
        assert_eq!(args[0].name, "x");
        assert_eq!(args[0].sources[0].path, "left");
        assert_eq!(args[0].target_type, PropertyType::long());
        assert_eq!(args[1].sources[0].path, "top");
        assert_eq!(args[1].target_type, PropertyType::int());
    }

    #[test]
    fn test_constructor_mapping_errors() {
        let gap = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="Point"><immutableConstructor>
                 <arg order="0"><source name="a"/></arg>
                 <arg order="2"><source name="b"/></arg>
               </immutableConstructor></dto></dto-mapping>"#,
        )
        .unwrap();
        assert!(gap.inspect("Point", &types()).unwrap_err().is_configuration());

        let arity = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="Point"><immutableConstructor>
                 <arg order="0"><source name="a"/></arg>
               </immutableConstructor></dto></dto-mapping>"#,
        )
        .unwrap();
        assert!(arity.inspect("Point", &types()).is_err());

        let unmapped = XmlBeanInspector::new(MappingDocument::default());
        assert!(unmapped.inspect("Point", &types()).is_err());
    }

    #[test]
    fn test_stray_field_is_rejected() {
        let inspector = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="PersonDto"><targetField fieldName="ghost"/></dto></dto-mapping>"#,
        )
        .unwrap();
        assert!(inspector.inspect("PersonDto", &types()).is_err());
    }

    #[test]
    fn test_dynamic_type_from_mapping_only() {
        let inspector = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="Summary">
                 <beanNames><beanName>order</beanName><beanName>customer</beanName></beanNames>
                 <targetField fieldName="customer"><source name="name" sourceBean="customer"/></targetField>
                 <targetField fieldName="total" fieldType="double"/>
               </dto></dto-mapping>"#,
        )
        .unwrap();
        let metadata = inspector.inspect("Summary", &TypeRegistry::new()).unwrap();
        assert_eq!(metadata.default_bean_names, vec!["order", "customer"]);
        assert_eq!(metadata.field("total").unwrap().target_type, PropertyType::double());
        assert!(matches!(
            inspector.inspect("Other", &TypeRegistry::new()),
            Err(Error::UnknownType { .. })
        ));
    }
}
