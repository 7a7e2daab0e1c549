//! Binding attributes attached to properties and constructor parameters
//!
//! These are the typed configuration markers an inspector reads: where a value
//! comes from, which merger transforms it, whether it cascades into a nested DTO,
//! or whether it is excluded from binding altogether.
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};

/// Shape of a cascaded property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeType {
    /// One nested DTO
    Single,
    /// An array of nested DTOs
    Array,
    /// A list or set of nested DTOs
    Collection,
}

impl CascadeType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "single" => Some(CascadeType::Single),
            "array" => Some(CascadeType::Array),
            "collection" | "list" => Some(CascadeType::Collection),
            _ => None,
        }
    }
}

/// One source of a target value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceSpec {
    /// Dotted source path; empty means "same name as the target"
    pub path: String,
    /// Single-value merger id; `None` means identity
    pub merger: Option<String>,
    pub params: Vec<String>,
    /// Label of the source bean to read from
    pub bean: Option<String>,
}

impl SourceSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn merger(mut self, id: impl Into<String>) -> Self {
        self.merger = Some(id.into());
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn bean(mut self, bean: impl Into<String>) -> Self {
        self.bean = Some(bean.into());
        self
    }
}

/// An ordered group of sources combined by a multi-value merger
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSource {
    pub sources: Vec<SourceSpec>,
    /// Multi-value merger id; `None` means first non-null
    pub merger: Option<String>,
    pub params: Vec<String>,
}

impl CompoundSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: SourceSpec) -> Self {
        self.sources.push(source);
        self
    }

    pub fn merger(mut self, id: impl Into<String>) -> Self {
        self.merger = Some(id.into());
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Recursive binding of a nested DTO
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CascadeSpec {
    /// Explicit shape; inferred from the property type when absent
    pub cascade_type: Option<CascadeType>,
    /// Explicit target DTO type; inferred from the property type when absent
    pub target_type: Option<String>,
}

impl CascadeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cascade_type(mut self, cascade_type: CascadeType) -> Self {
        self.cascade_type = Some(cascade_type);
        self
    }

    pub fn target_type(mut self, target: impl Into<String>) -> Self {
        self.target_type = Some(target.into());
        self
    }
}

/// A configuration marker on a property, field or constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindingAttribute {
    Source(SourceSpec),
    Sources(CompoundSource),
    Cascade(CascadeSpec),
    Transient,
}

impl BindingAttribute {
    /// Whether this attribute says where the value comes from
    pub fn is_source_configuration(&self) -> bool {
        matches!(self, BindingAttribute::Source(_) | BindingAttribute::Sources(_))
    }
}
