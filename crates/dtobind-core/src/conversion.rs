//! Type-compatibility coercion applied to every bound value before it is stored

use crate::types::{Primitive, PropertyType, TypeRegistry};
use crate::value::Value;
use chrono::Utc;

/// Fit a merged value to the declared type of its target slot.
///
/// Only constructor arguments turn null into a primitive default; property writes
/// leave a primitive at its current value instead.
pub fn coerce(value: Value, target: &PropertyType, types: &TypeRegistry, constructor_arg: bool) -> Value {
    match (target, value) {
        (PropertyType::Primitive(p), Value::Null) if constructor_arg => p.default_value(),
        (_, Value::Null) => Value::Null,
        (PropertyType::Text, v @ Value::Text(_)) => v,
        (PropertyType::Text, v) => Value::Text(v.to_string()),
        (PropertyType::Enum(name), Value::Text(text)) => types
            .enum_constant(name, &text)
            .unwrap_or(Value::Text(text)),
        (PropertyType::Date, Value::Calendar(c)) => Value::Date(c.with_timezone(&Utc)),
        (PropertyType::Calendar, Value::Date(d)) => Value::Calendar(d.fixed_offset()),
        (
            PropertyType::Primitive(Primitive::Float | Primitive::Double)
            | PropertyType::Boxed(Primitive::Float | Primitive::Double),
            Value::Int(i),
        ) => Value::Float(i as f64),
        (_, v) => v,
    }
}
