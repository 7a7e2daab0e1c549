//! Normalized binding metadata
//!
//! Whatever the configuration source, inspection produces one [`BeanMetadata`]
//! per DTO type. It is immutable once built and shared between threads.

use crate::merger::ids;
use crate::types::{CascadeType, ConstructorDescriptor, PropertyType};
use std::sync::Arc;

/// Synthetic source path that yields the source bean itself
pub const ROOT_OBJECT: &str = "@root";

/// Name of the single positional source bean when a type declares none
pub const DEFAULT_BEAN_NAME: &str = "sourceBean";

/// Where one source value comes from and how it is transformed
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBinding {
    pub path: String,
    /// Single-value merger id
    pub merger: String,
    pub merger_params: Vec<String>,
    /// Source bean label; `None` means the first bean
    pub bean: Option<String>,
}

impl SourceBinding {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            merger: ids::IDENTITY.to_string(),
            merger_params: Vec::new(),
            bean: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_OBJECT
    }
}

/// Nested DTO binding of a field
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeMetadata {
    pub cascade_type: CascadeType,
    /// `None` when no type could be inferred; binding such a field fails
    pub target_type: Option<String>,
}

/// How one target property or constructor argument is bound
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    pub name: String,
    pub sources: Vec<SourceBinding>,
    /// Multi-value merger id, ignored when the field cascades
    pub property_value_merger: String,
    pub merger_params: Vec<String>,
    pub target_type: PropertyType,
    pub cascade: Option<CascadeMetadata>,
    /// Configured by a compound source list rather than a single source
    pub compound: bool,
    pub field_transient: bool,
}

impl FieldMetadata {
    /// A field read from the same-named source property, unchanged
    pub fn new(name: impl Into<String>, target_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            sources: vec![SourceBinding::new(name.clone())],
            name,
            property_value_merger: ids::FIRST_OBJECT.to_string(),
            merger_params: Vec::new(),
            target_type,
            cascade: None,
            compound: false,
            field_transient: false,
        }
    }

    pub fn is_cascade(&self) -> bool {
        self.cascade.is_some()
    }

    /// Whether the reverse path can write this field back to a source property
    pub fn is_extractable(&self) -> bool {
        !self.compound
            && !self.field_transient
            && self.cascade.is_none()
            && self.sources.len() == 1
            && !self.sources[0].is_root()
    }
}

/// Field layout of a DTO type, fixed at inspection time
#[derive(Debug, Clone)]
pub enum BeanLayout {
    /// Instantiated empty, then populated property by property
    Mutable { fields: Vec<FieldMetadata> },
    /// Built in one call from the computed constructor arguments
    Immutable {
        constructor_args: Vec<FieldMetadata>,
        constructor: Arc<ConstructorDescriptor>,
    },
}

/// Everything the binder needs to know about a DTO type
#[derive(Debug, Clone)]
pub struct BeanMetadata {
    pub type_name: String,
    pub default_bean_names: Vec<String>,
    pub layout: BeanLayout,
}

impl BeanMetadata {
    pub fn is_immutable(&self) -> bool {
        matches!(self.layout, BeanLayout::Immutable { .. })
    }

    /// Properties of a mutable layout, or constructor arguments of an immutable one
    pub fn fields(&self) -> &[FieldMetadata] {
        match &self.layout {
            BeanLayout::Mutable { fields } => fields,
            BeanLayout::Immutable {
                constructor_args, ..
            } => constructor_args,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Position of a named source bean
    pub fn bean_position(&self, bean: &str) -> Option<usize> {
        self.default_bean_names.iter().position(|b| b == bean)
    }
}
