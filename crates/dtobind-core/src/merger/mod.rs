//! Value mergers: pluggable transforms applied while binding
//!
//! A [`SinglePropertyValueMerger`] transforms the value read from one source path and
//! may know how to reverse that transform. A [`MultiPropertyValueMerger`] combines the
//! values of all of a field's source paths into one.
//!
//! # Module Organization
//!
//! - [`basic`] - identity, text, clone and enum mergers, plus the default multi merger
//! - [`format`] - date, decimal and printf-style formatting
//! - [`calculation`] - age, sums and the time between two dates
//! - [`reflective`] - method calls and property projection of collections
//! - [`expression`] - the arithmetic evaluator behind `sum_expression`
//!
//! Copyright (c) 2025 Dtobind Team
//! Licensed under the Apache-2.0 license

pub mod basic;
pub mod calculation;
pub mod expression;
pub mod format;
pub mod reflective;

#[cfg(test)]
mod prop_tests;

use crate::accessor::PropertyAccessor;
use crate::value::Value;
use crate::{Error, Result};
use std::sync::{Arc, OnceLock};

/// Ids of the built-in mergers
pub mod ids {
    pub const IDENTITY: &str = "identity";
    pub const TO_STRING: &str = "to_string";
    pub const CLONE: &str = "clone";
    pub const ENUM_NAME: &str = "enum_name";
    pub const DATE_FORMAT: &str = "date_format";
    pub const DECIMAL_FORMAT: &str = "decimal_format";
    pub const AGE: &str = "age";
    pub const METHOD_CALL: &str = "method_call";
    pub const SUM: &str = "sum";
    pub const SUM_PRODUCT: &str = "sum_product";
    pub const SUM_EXPRESSION: &str = "sum_expression";
    pub const STRING_FORMAT: &str = "string_format";
    pub const PROPERTY_COLLECTION: &str = "property_collection";
    pub const FIRST_OBJECT: &str = "first_object";
    pub const TIME_BETWEEN_DATES: &str = "time_between_dates";
}

/// Transform applied to the value read from one source path
pub trait SinglePropertyValueMerger: Send + Sync {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value>;

    /// Whether [`Self::restore`] can reverse [`Self::merge`] for these parameters
    fn is_restore_supported(&self, _params: &[String]) -> bool {
        false
    }

    fn restore(&self, _merged: &Value, _params: &[String]) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// Combines the values read from all of a field's source paths
pub trait MultiPropertyValueMerger: Send + Sync {
    fn merge(&self, values: &[Value], params: &[String]) -> Result<Value>;
}

/// Capability marker for mergers that need the binder's property accessor.
///
/// The instance registry calls [`Self::set_property_accessor`] right after
/// registration, or when the binder attaches its accessor, whichever is later.
pub trait PropertyAccessorAware: Send + Sync {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>);
}

/// Slot for an injected accessor
#[derive(Debug, Default)]
pub struct AccessorSlot(OnceLock<Arc<PropertyAccessor>>);

impl AccessorSlot {
    pub fn set(&self, accessor: Arc<PropertyAccessor>) {
        // A registry attaches one accessor; later attachments keep the first.
        let _ = self.0.set(accessor);
    }

    pub fn get(&self) -> Result<&PropertyAccessor> {
        self.0.get().map(|a| a.as_ref()).ok_or_else(|| {
            Error::configuration("merger used before a property accessor was injected")
        })
    }
}

/// First parameter, or a configuration error naming what it should have been
pub(crate) fn required_param<'a>(params: &'a [String], what: &str) -> Result<&'a str> {
    params
        .first()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::configuration(format!("missing {} parameter", what)))
}
