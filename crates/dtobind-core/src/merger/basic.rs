//! Identity, text, clone and enum mergers, plus the default multi merger

use super::{AccessorSlot, MultiPropertyValueMerger, PropertyAccessorAware, SinglePropertyValueMerger};
use crate::accessor::PropertyAccessor;
use crate::value::Value;
use crate::{Error, Result};
use std::sync::Arc;

/// Passes the value through unchanged
#[derive(Debug, Default)]
pub struct IdentityMerger;

impl SinglePropertyValueMerger for IdentityMerger {
    fn merge(&self, value: &Value, _params: &[String]) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Renders the value as text
#[derive(Debug, Default)]
pub struct ToStringMerger;

impl SinglePropertyValueMerger for ToStringMerger {
    fn merge(&self, value: &Value, _params: &[String]) -> Result<Value> {
        Ok(match value {
            Value::Null => Value::Null,
            Value::Text(_) => value.clone(),
            other => Value::Text(other.to_string()),
        })
    }
}

/// Shallow copy of cloneable values; anything else merges to null
#[derive(Debug, Default)]
pub struct CloneMerger {
    accessor: AccessorSlot,
}

impl PropertyAccessorAware for CloneMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for CloneMerger {
    fn merge(&self, value: &Value, _params: &[String]) -> Result<Value> {
        let cloned = match value {
            Value::Object(object) => {
                let cloneable = self
                    .accessor
                    .get()?
                    .types()
                    .get(object.type_name())
                    .is_some_and(|d| d.is_cloneable());
                if cloneable {
                    Value::Object(object.shallow_clone())
                } else {
                    tracing::debug!(type_name = object.type_name(), "type is not cloneable");
                    Value::Null
                }
            }
            Value::Map(map) => Value::Map(map.shallow_clone()),
            Value::Collection(..) | Value::Date(_) | Value::Calendar(_) => value.clone(),
            _ => Value::Null,
        };
        Ok(cloned)
    }
}

/// Name of an enum constant
#[derive(Debug, Default)]
pub struct EnumNameMerger;

impl SinglePropertyValueMerger for EnumNameMerger {
    fn merge(&self, value: &Value, _params: &[String]) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Enum(e) => Ok(Value::Text(e.constant.clone())),
            other => Err(Error::type_mismatch("enum", other.type_label())),
        }
    }
}

/// First non-null value among the sources
#[derive(Debug, Default)]
pub struct FirstObjectMerger;

impl MultiPropertyValueMerger for FirstObjectMerger {
    fn merge(&self, values: &[Value], _params: &[String]) -> Result<Value> {
        Ok(values
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or_default())
    }
}
