//! Conversions between [`Value`] graphs and `serde_json` documents

use super::{ObjectRef, Value, DYNAMIC_TYPE};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::HashSet;

impl Value {
    /// Build a value from JSON; objects become dynamic objects so dotted paths navigate them
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::list(items.iter().map(Value::from_json)),
            Json::Object(fields) => {
                let object = ObjectRef::new(DYNAMIC_TYPE);
                for (name, field) in fields {
                    object.set(name.clone(), Value::from_json(field));
                }
                Value::Object(object)
            }
        }
    }

    /// Render as JSON; an object or map reached a second time on the same path is written as null
    pub fn to_json(&self) -> Json {
        let mut visiting = HashSet::new();
        to_json_inner(self, &mut visiting)
    }
}

fn to_json_inner(value: &Value, visiting: &mut HashSet<usize>) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Char(c) => Json::String(c.to_string()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Date(d) => Json::String(d.to_rfc3339()),
        Value::Calendar(c) => Json::String(c.to_rfc3339()),
        Value::Enum(e) => Json::String(e.constant.clone()),
        Value::Collection(_, items) => {
            Json::Array(items.iter().map(|v| to_json_inner(v, visiting)).collect())
        }
        Value::Map(map) => {
            if !visiting.insert(map.address()) {
                return Json::Null;
            }
            let mut out = JsonMap::new();
            for (k, v) in map.snapshot() {
                out.insert(k, to_json_inner(&v, visiting));
            }
            visiting.remove(&map.address());
            Json::Object(out)
        }
        Value::Object(object) => {
            if !visiting.insert(object.address()) {
                return Json::Null;
            }
            let mut out = JsonMap::new();
            for (k, v) in object.snapshot() {
                out.insert(k, to_json_inner(&v, visiting));
            }
            visiting.remove(&object.address());
            Json::Object(out)
        }
    }
}
