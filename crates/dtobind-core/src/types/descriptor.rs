//! Type descriptors: the explicit schema the engine reads instead of reflecting
//!
//! A [`TypeDescriptor`] lists a type's properties (with their binding attributes),
//! its constructors, an optional parent type, and the named methods and factory
//! functions that the method-call merger can invoke.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

use super::attributes::{BindingAttribute, CascadeSpec, CompoundSource, SourceSpec};
use super::property_type::PropertyType;
use crate::value::{ObjectRef, Value};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A zero-argument method callable on instances of a type
pub type MethodFn = Arc<dyn Fn(&ObjectRef) -> Result<Value> + Send + Sync>;

/// A static single-argument factory function
pub type FactoryFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A constructor body receiving the arguments in declaration order
pub type ConstructorFn = Arc<dyn Fn(Vec<Value>) -> Result<ObjectRef> + Send + Sync>;

/// A readable (and usually writable) property of a type
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) ty: PropertyType,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
    pub(crate) getter_attributes: Vec<BindingAttribute>,
    /// `None` when the property has no backing field
    pub(crate) field_attributes: Option<Vec<BindingAttribute>>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            readable: true,
            writable: true,
            getter_attributes: Vec::new(),
            field_attributes: Some(Vec::new()),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Computed property: no backing field, so field attributes cannot exist
    pub fn without_field(mut self) -> Self {
        self.field_attributes = None;
        self
    }

    /// Attach an attribute at getter level
    pub fn attribute(mut self, attribute: BindingAttribute) -> Self {
        self.getter_attributes.push(attribute);
        self
    }

    /// Attach an attribute on the backing field
    pub fn field_attribute(mut self, attribute: BindingAttribute) -> Self {
        self.field_attributes
            .get_or_insert_with(Vec::new)
            .push(attribute);
        self
    }

    pub fn source(self, path: impl Into<String>) -> Self {
        self.attribute(BindingAttribute::Source(SourceSpec::new(path)))
    }

    pub fn source_spec(self, spec: SourceSpec) -> Self {
        self.attribute(BindingAttribute::Source(spec))
    }

    pub fn sources(self, compound: CompoundSource) -> Self {
        self.attribute(BindingAttribute::Sources(compound))
    }

    pub fn cascade(self) -> Self {
        self.attribute(BindingAttribute::Cascade(CascadeSpec::default()))
    }

    pub fn cascade_spec(self, spec: CascadeSpec) -> Self {
        self.attribute(BindingAttribute::Cascade(spec))
    }

    pub fn transient(self) -> Self {
        self.attribute(BindingAttribute::Transient)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> &PropertyType {
        &self.ty
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn getter_attributes(&self) -> &[BindingAttribute] {
        &self.getter_attributes
    }

    pub fn field_attributes(&self) -> Option<&[BindingAttribute]> {
        self.field_attributes.as_deref()
    }
}

/// A parameter of a binding constructor
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub(crate) ty: PropertyType,
    /// Field the default constructor body stores this argument in
    pub(crate) field: Option<String>,
    pub(crate) attributes: Vec<BindingAttribute>,
}

impl ParameterDescriptor {
    pub fn new(ty: PropertyType) -> Self {
        Self {
            ty,
            field: None,
            attributes: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.field = Some(name.into());
        self
    }

    pub fn attribute(mut self, attribute: BindingAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn source(self, path: impl Into<String>) -> Self {
        self.attribute(BindingAttribute::Source(SourceSpec::new(path)))
    }

    pub fn source_spec(self, spec: SourceSpec) -> Self {
        self.attribute(BindingAttribute::Source(spec))
    }

    pub fn sources(self, compound: CompoundSource) -> Self {
        self.attribute(BindingAttribute::Sources(compound))
    }

    pub fn cascade(self) -> Self {
        self.attribute(BindingAttribute::Cascade(CascadeSpec::default()))
    }

    pub fn property_type(&self) -> &PropertyType {
        &self.ty
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn attributes(&self) -> &[BindingAttribute] {
        &self.attributes
    }
}

/// A constructor taking one or more arguments
#[derive(Clone, Default)]
pub struct ConstructorDescriptor {
    pub(crate) params: Vec<ParameterDescriptor>,
    pub(crate) designated: bool,
    pub(crate) body: Option<ConstructorFn>,
}

impl ConstructorDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Mark as the constructor used for binding
    pub fn designated(mut self) -> Self {
        self.designated = true;
        self
    }

    /// Custom body; without one each argument is stored in its parameter's field
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<ObjectRef> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    pub fn is_designated(&self) -> bool {
        self.designated
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("designated", &self.designated)
            .field("custom_body", &self.body.is_some())
            .finish()
    }
}

/// Registered constants of an enum type
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub(crate) name: String,
    pub(crate) constants: Vec<String>,
}

impl EnumDescriptor {
    pub fn new<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &[String] {
        &self.constants
    }
}

/// Schema of one bindable type
#[derive(Clone)]
pub struct TypeDescriptor {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) constructors: Vec<Arc<ConstructorDescriptor>>,
    pub(crate) has_default_constructor: bool,
    pub(crate) cloneable: bool,
    pub(crate) bean_names: Option<Vec<String>>,
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) factories: HashMap<String, FactoryFn>,
}

impl TypeDescriptor {
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Properties declared on this type only
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn constructors(&self) -> &[Arc<ConstructorDescriptor>] {
        &self.constructors
    }

    pub fn has_default_constructor(&self) -> bool {
        self.has_default_constructor
    }

    pub fn is_cloneable(&self) -> bool {
        self.cloneable
    }

    /// Class-level default source bean names declared on this type
    pub fn bean_names(&self) -> Option<&[String]> {
        self.bean_names.as_deref()
    }

    pub fn method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    pub fn factory(&self, name: &str) -> Option<&FactoryFn> {
        self.factories.get(name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("constructors", &self.constructors)
            .field("has_default_constructor", &self.has_default_constructor)
            .field("cloneable", &self.cloneable)
            .field("bean_names", &self.bean_names)
            .field("methods", &methods)
            .finish()
    }
}

/// Builder for [`TypeDescriptor`]
pub struct TypeDescriptorBuilder {
    name: String,
    parent: Option<String>,
    properties: Vec<PropertyDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    explicit_default_constructor: bool,
    cloneable: bool,
    bean_names: Option<Vec<String>>,
    methods: HashMap<String, MethodFn>,
    factories: HashMap<String, FactoryFn>,
}

impl TypeDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: Vec::new(),
            constructors: Vec::new(),
            explicit_default_constructor: false,
            cloneable: false,
            bean_names: None,
            methods: HashMap::new(),
            factories: HashMap::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Declare an argument constructor. Declaring one removes the implicit
    /// no-argument constructor unless [`Self::default_constructor`] is also called.
    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Keep a public no-argument constructor next to declared ones
    pub fn default_constructor(mut self) -> Self {
        self.explicit_default_constructor = true;
        self
    }

    pub fn cloneable(mut self) -> Self {
        self.cloneable = true;
        self
    }

    /// Names of the positional source beans, in order
    pub fn bean_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bean_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&ObjectRef) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Validate and build the descriptor
    pub fn build(self) -> Result<TypeDescriptor> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration("type descriptor requires a name"));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(Error::configuration_for(
                    &self.name,
                    format!("property '{}' declared twice", property.name),
                ));
            }
        }

        let designated = self.constructors.iter().filter(|c| c.designated).count();
        if designated > 1 {
            return Err(Error::configuration_for(
                &self.name,
                "more than one constructor is marked as designated",
            ));
        }
        if self.constructors.iter().any(|c| c.params.is_empty()) {
            return Err(Error::configuration_for(
                &self.name,
                "declared constructors need parameters; use default_constructor() for the no-argument one",
            ));
        }

        let has_default_constructor =
            self.constructors.is_empty() || self.explicit_default_constructor;

        Ok(TypeDescriptor {
            name: self.name,
            parent: self.parent,
            properties: self.properties,
            constructors: self.constructors.into_iter().map(Arc::new).collect(),
            has_default_constructor,
            cloneable: self.cloneable,
            bean_names: self.bean_names,
            methods: self.methods,
            factories: self.factories,
        })
    }
}
