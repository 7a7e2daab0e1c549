//! Dtobind Core - metadata-driven binding of business objects into DTOs
//!
//! This crate reads values from one or more source objects, transforms them
//! through pluggable mergers and writes them into a target DTO, recursing into
//! nested DTOs where configured. It also rebuilds business objects from DTOs
//! for the fields whose transforms can be reversed.
//!
//! # Main Components
//!
//! - **Value model**: dynamic objects, maps and collections with identity semantics
//! - **Type registry**: explicit schemas of the bindable types and their binding attributes
//! - **Property accessor**: best-effort reads and writes along dotted paths
//! - **Mergers**: built-in value transforms registered in a caller-owned instance registry
//! - **Inspectors**: binding metadata from descriptor attributes or an XML mapping document
//! - **Binder**: the forward and reverse binding engine
//!
//! # Example
//!
//! ```no_run
//! use dtobind_core::{Binder, BinderConfig, Result, TypeRegistry, Value};
//!
//! fn example(types: TypeRegistry, order: Value) -> Result<Value> {
//!     let config = BinderConfig::default().merge_with_env()?;
//!     let binder = Binder::builder(types).config(config).build()?;
//!     binder.bind("OrderDto", &[order])
//! }
//! ```

pub mod accessor;
pub mod binder;
pub mod config;
pub mod conversion;
pub mod error;
pub mod inspector;
pub mod merger;
pub mod metadata;
pub mod registry;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use accessor::PropertyAccessor;
pub use binder::{Binder, BinderBuilder, BindingContext};
pub use config::{BinderConfig, MappingSource};
pub use error::{Error, Result};
pub use inspector::{AttributeBeanInspector, BeanInspector, MappingDocument, XmlBeanInspector};
pub use merger::{
    ids as merger_ids, MultiPropertyValueMerger, PropertyAccessorAware, SinglePropertyValueMerger,
};
pub use metadata::{BeanMetadata, FieldMetadata, DEFAULT_BEAN_NAME, ROOT_OBJECT};
pub use registry::InstanceRegistry;
pub use types::{
    BindingAttribute, CascadeSpec, CascadeType, CompoundSource, ConstructorDescriptor,
    EnumDescriptor, ParameterDescriptor, PropertyDescriptor, PropertyType, SourceSpec,
    TypeDescriptor, TypeRegistry,
};
pub use value::{CollectionKind, MapRef, ObjectRef, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
