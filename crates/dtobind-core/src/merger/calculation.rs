//! Age, sums over collections and the time between two dates

use super::expression::Expression;
use super::{
    required_param, AccessorSlot, MultiPropertyValueMerger, PropertyAccessorAware,
    SinglePropertyValueMerger,
};
use crate::accessor::PropertyAccessor;
use crate::registry::InstanceRegistry;
use crate::value::Value;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::{Arc, Weak};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MILLIS_PER_YEAR: f64 = 365.25 * MILLIS_PER_DAY;

/// Milliseconds in the unit named by `param`, or `default` when absent
fn unit_millis(param: Option<&str>, default: f64) -> Result<f64> {
    let Some(unit) = param.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(default);
    };
    let millis = match unit.to_ascii_lowercase().as_str() {
        "years" | "year" => MILLIS_PER_YEAR,
        "months" | "month" => MILLIS_PER_YEAR / 12.0,
        "weeks" | "week" => 7.0 * MILLIS_PER_DAY,
        "days" | "day" => MILLIS_PER_DAY,
        "hours" | "hour" => 3_600_000.0,
        "minutes" | "minute" => 60_000.0,
        "seconds" | "second" => 1_000.0,
        "millis" | "milliseconds" => 1.0,
        other => other
            .parse::<f64>()
            .ok()
            .filter(|m| *m > 0.0)
            .ok_or_else(|| Error::configuration(format!("unknown time unit '{}'", unit)))?,
    };
    Ok(millis)
}

fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Date(date) => Some(date.timestamp_millis()),
        Value::Calendar(calendar) => Some(calendar.timestamp_millis()),
        _ => None,
    }
}

/// Time elapsed since a date, in years unless a unit is given
#[derive(Debug, Default)]
pub struct AgeMerger;

impl SinglePropertyValueMerger for AgeMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Float(0.0));
        }
        let since = epoch_millis(value)
            .ok_or_else(|| Error::type_mismatch("date", value.type_label()))?;
        let unit = unit_millis(params.first().map(String::as_str), MILLIS_PER_YEAR)?;
        let elapsed = Utc::now().timestamp_millis() - since;
        Ok(Value::Float(elapsed as f64 / unit))
    }
}

/// Absolute time between the first two source dates
#[derive(Debug, Default)]
pub struct TimeBetweenDatesMerger;

impl MultiPropertyValueMerger for TimeBetweenDatesMerger {
    fn merge(&self, values: &[Value], params: &[String]) -> Result<Value> {
        if values.len() < 2 {
            return Err(Error::configuration(format!(
                "time between dates needs two source values, got {}",
                values.len()
            )));
        }
        let (start, end) = (&values[0], &values[1]);
        if start.is_null() || end.is_null() {
            return Ok(Value::Null);
        }
        let start = epoch_millis(start)
            .ok_or_else(|| Error::type_mismatch("date", start.type_label()))?;
        let end = epoch_millis(end).ok_or_else(|| Error::type_mismatch("date", end.type_label()))?;
        let unit = unit_millis(params.first().map(String::as_str), MILLIS_PER_DAY)?;
        Ok(Value::Float((end - start).abs() as f64 / unit))
    }
}

/// Numbers contributed by a collection value; null is an empty collection
fn elements(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Null => Ok(&[]),
        Value::Collection(_, items) => Ok(items),
        other => Err(Error::type_mismatch("collection", other.type_label())),
    }
}

/// Element value as a double; numeric text counts, null is zero
fn number(value: &Value) -> Result<f64> {
    if value.is_null() {
        return Ok(0.0);
    }
    value
        .as_f64()
        .ok_or_else(|| Error::type_mismatch("number", value.type_label()))
}

/// Sum of a collection's elements, or of one property of each element
#[derive(Debug, Default)]
pub struct SumMerger {
    accessor: AccessorSlot,
}

impl PropertyAccessorAware for SumMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for SumMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let property = params.first().filter(|p| !p.is_empty());
        let mut total = 0.0;
        for element in elements(value)? {
            total += match property {
                Some(path) => number(&self.accessor.get()?.read(path, element))?,
                None => number(element)?,
            };
        }
        Ok(Value::Float(total))
    }
}

/// Per element, the product of the named properties; the products are summed
#[derive(Debug, Default)]
pub struct SumProductMerger {
    accessor: AccessorSlot,
}

impl PropertyAccessorAware for SumProductMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for SumProductMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        if params.is_empty() {
            return Err(Error::configuration(
                "sum product needs at least one property name",
            ));
        }
        let mut total = 0.0;
        for element in elements(value)? {
            let accessor = self.accessor.get()?;
            let mut product = 1.0;
            for path in params {
                product *= number(&accessor.read(path, element))?;
            }
            total += product;
        }
        Ok(Value::Float(total))
    }
}

/// Per element, an arithmetic expression over its properties; the results are summed.
///
/// Parsed expressions are cached as named instances of the owning registry.
#[derive(Debug)]
pub struct SumExpressionMerger {
    accessor: AccessorSlot,
    registry: Weak<InstanceRegistry>,
}

impl SumExpressionMerger {
    pub fn new(registry: Weak<InstanceRegistry>) -> Self {
        Self {
            accessor: AccessorSlot::default(),
            registry,
        }
    }

    fn expression(&self, source: &str) -> Result<Arc<Expression>> {
        let key = format!("sum_expression:{}", source);
        let registry = self.registry.upgrade();
        if let Some(cached) = registry
            .as_ref()
            .and_then(|r| r.get_named::<Expression>(&key))
        {
            tracing::trace!(expression = source, "expression cache hit");
            return Ok(cached);
        }
        let parsed = Arc::new(Expression::parse(source)?);
        if let Some(registry) = registry {
            registry.put_named(key, parsed.clone());
        }
        Ok(parsed)
    }
}

impl PropertyAccessorAware for SumExpressionMerger {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for SumExpressionMerger {
    fn merge(&self, value: &Value, params: &[String]) -> Result<Value> {
        let expression = self.expression(required_param(params, "expression")?)?;
        let mut total = 0.0;
        for element in elements(value)? {
            let accessor = self.accessor.get()?;
            let mut failure = None;
            let result = expression.evaluate(|name| {
                match number(&accessor.read(name, element)) {
                    Ok(n) => n,
                    Err(err) => {
                        failure.get_or_insert(err);
                        0.0
                    }
                }
            })?;
            if let Some(err) = failure {
                return Err(err);
            }
            total += result;
        }
        Ok(Value::Float(total))
    }
}
