//! The binding engine
//!
//! A [`Binder`] owns everything a bind needs: the type registry, the property
//! accessor, the caller's instance registry and a bean inspector. Metadata is
//! inspected on first use and cached for the binder's lifetime; every public
//! call runs with its own [`BindingContext`].
//!
//! # Example
//!
//! ```
//! use dtobind_core::{Binder, PropertyDescriptor, PropertyType, TypeDescriptor, TypeRegistry, Value};
//!
//! # fn example() -> dtobind_core::Result<()> {
//! let types = TypeRegistry::new()
//!     .with_type(
//!         TypeDescriptor::builder("Person")
//!             .property(PropertyDescriptor::new("name", PropertyType::Text))
//!             .build()?,
//!     )
//!     .with_type(
//!         TypeDescriptor::builder("PersonDto")
//!             .property(PropertyDescriptor::new("name", PropertyType::Text))
//!             .build()?,
//!     );
//! let binder = Binder::new(types)?;
//!
//! let person = binder.types().instantiate("Person")?;
//! person.set("name", Value::from("Ada"));
//! let dto = binder.bind("PersonDto", &[Value::Object(person)])?;
//! assert_eq!(binder.accessor().read("name", &dto), Value::from("Ada"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

pub mod context;
mod delegate;
mod extract;

pub use context::{BindingContext, CacheKey};

use crate::accessor::PropertyAccessor;
use crate::config::BinderConfig;
use crate::inspector::BeanInspector;
use crate::metadata::BeanMetadata;
use crate::registry::InstanceRegistry;
use crate::types::TypeRegistry;
use crate::value::Value;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// Binds business objects into DTOs and back
#[derive(Debug)]
pub struct Binder {
    types: Arc<TypeRegistry>,
    accessor: Arc<PropertyAccessor>,
    registry: Arc<InstanceRegistry>,
    inspector: Arc<dyn BeanInspector>,
    metadata: DashMap<String, Arc<BeanMetadata>>,
}

impl Binder {
    /// A binder with default configuration and the built-in mergers
    pub fn new(types: impl Into<Arc<TypeRegistry>>) -> Result<Self> {
        Self::builder(types).build()
    }

    pub fn builder(types: impl Into<Arc<TypeRegistry>>) -> BinderBuilder {
        BinderBuilder::new(types)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn accessor(&self) -> &Arc<PropertyAccessor> {
        &self.accessor
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Bind one or more source beans into a new instance of `dto_type`.
    ///
    /// Sources are positional and matched to the type's bean names. No sources,
    /// or only null ones, bind to `Value::Null`.
    pub fn bind(&self, dto_type: &str, sources: &[Value]) -> Result<Value> {
        let mut context = BindingContext::new();
        self.bind_in(&mut context, dto_type, sources)
    }

    /// Bind parallel source lists element by element.
    ///
    /// The size comes from the first non-null list and every other non-null list
    /// must match it. The result keeps that list's collection kind.
    pub fn bind_list(&self, dto_type: &str, lists: &[Value]) -> Result<Value> {
        let mut context = BindingContext::new();
        self.bind_parallel(&mut context, dto_type, lists, None)
    }

    /// Bind every element of a collection, producing a collection of the same shape
    pub fn bind_collection(&self, dto_type: &str, collection: &Value) -> Result<Value> {
        self.bind_list(dto_type, std::slice::from_ref(collection))
    }

    /// Metadata of a DTO type, inspected on first request
    pub fn metadata(&self, type_name: &str) -> Result<Arc<BeanMetadata>> {
        if let Some(cached) = self.metadata.get(type_name) {
            tracing::trace!(type_name, "metadata cache hit");
            return Ok(cached.value().clone());
        }

        let metadata = self
            .inspector
            .inspect(type_name, &self.types)
            .and_then(|metadata| {
                self.validate_mergers(&metadata)?;
                Ok(metadata)
            })
            .map_err(|source| Error::Inspection {
                type_name: type_name.to_string(),
                source: Box::new(source),
            })?;

        // Concurrent first touches may both inspect; the first insert wins.
        let entry = self
            .metadata
            .entry(type_name.to_string())
            .or_insert(Arc::new(metadata));
        Ok(entry.value().clone())
    }

    fn validate_mergers(&self, metadata: &BeanMetadata) -> Result<()> {
        for field in metadata.fields() {
            for source in &field.sources {
                self.registry.single(&source.merger)?;
            }
            if !field.is_cascade() {
                self.registry.multi(&field.property_value_merger)?;
            }
        }
        Ok(())
    }
}

/// Builder for [`Binder`]
#[derive(Debug)]
pub struct BinderBuilder {
    types: Arc<TypeRegistry>,
    registry: Option<Arc<InstanceRegistry>>,
    inspector: Option<Arc<dyn BeanInspector>>,
    config: BinderConfig,
}

impl BinderBuilder {
    pub fn new(types: impl Into<Arc<TypeRegistry>>) -> Self {
        Self {
            types: types.into(),
            registry: None,
            inspector: None,
            config: BinderConfig::default(),
        }
    }

    /// Use a caller-owned instance registry instead of a fresh one
    pub fn registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use this inspector regardless of the configured mapping source
    pub fn inspector<I>(mut self, inspector: I) -> Self
    where
        I: BeanInspector + 'static,
    {
        self.inspector = Some(Arc::new(inspector));
        self
    }

    pub fn config(mut self, config: BinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the binder, attaching its accessor to the instance registry
    pub fn build(self) -> Result<Binder> {
        let accessor = Arc::new(
            PropertyAccessor::new(self.types.clone())
                .with_make_up_intermediates(self.config.make_up_intermediates),
        );
        let registry = self.registry.unwrap_or_else(InstanceRegistry::new);
        registry.attach_accessor(accessor.clone());

        let inspector = match self.inspector {
            Some(inspector) => inspector,
            None => self.config.inspector()?,
        };

        let binder = Binder {
            types: self.types,
            accessor,
            registry,
            inspector,
            metadata: DashMap::new(),
        };

        if self.config.eager_xml_inspection {
            for type_name in binder.inspector.mapped_types() {
                binder.metadata(&type_name)?;
            }
        }

        tracing::debug!(
            inspector = ?binder.inspector,
            preloaded = binder.metadata.len(),
            "binder ready"
        );
        Ok(binder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingSource;
    use crate::inspector::XmlBeanInspector;
    use crate::types::{PropertyDescriptor, PropertyType, SourceSpec, TypeDescriptor};

    fn types() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDescriptor::builder("Entity")
                    .property(PropertyDescriptor::new("name", PropertyType::Text))
                    .build()
                    .unwrap(),
            )
            .with_type(
                TypeDescriptor::builder("EntityDto")
                    .property(PropertyDescriptor::new("name", PropertyType::Text))
                    .build()
                    .unwrap(),
            )
    }

    fn attribute_config() -> BinderConfig {
        BinderConfig::default().with_mapping(MappingSource::Attributes)
    }

    #[test]
    fn test_metadata_is_cached() {
        let binder = Binder::builder(types()).config(attribute_config()).build().unwrap();
        let first = binder.metadata("EntityDto").unwrap();
        let second = binder.metadata("EntityDto").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_inspection_is_not_cached() {
        let binder = Binder::builder(types()).config(attribute_config()).build().unwrap();
        let err = binder.metadata("Missing").unwrap_err();
        assert!(matches!(err, Error::Inspection { .. }));
        assert!(err.is_configuration());
        assert!(binder.metadata.get("Missing").is_none());
    }

    #[test]
    fn test_unknown_merger_is_reported_at_inspection() {
        let types = TypeRegistry::new().with_type(
            TypeDescriptor::builder("Odd")
                .property(
                    PropertyDescriptor::new("v", PropertyType::Text)
                        .source_spec(SourceSpec::new("v").merger("no_such_merger")),
                )
                .build()
                .unwrap(),
        );
        let binder = Binder::builder(types).config(attribute_config()).build().unwrap();
        let err = binder.metadata("Odd").unwrap_err();
        match err {
            Error::Inspection { source, .. } => {
                assert!(matches!(*source, Error::UnknownMerger { .. }))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_xml_mapping_is_inspected_eagerly() {
        let inspector = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="EntityDto"/><dto type="Loose"/></dto-mapping>"#,
        )
        .unwrap();
        let binder = Binder::builder(types()).inspector(inspector).build().unwrap();
        assert_eq!(binder.metadata.len(), 2);

        let broken = XmlBeanInspector::from_xml(
            r#"<dto-mapping><dto type="EntityDto">
                 <targetField fieldName="name"><source name="x" merger="nope"/></targetField>
               </dto></dto-mapping>"#,
        )
        .unwrap();
        assert!(Binder::builder(types()).inspector(broken).build().is_err());
    }

    #[test]
    fn test_binder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Binder>();
    }
}
