//! Lenient field extraction for persisted JSON records
//!
//! Records written by older builds or other tabs are read field by field so
//! that one bad value degrades to a default instead of discarding the record.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Parse `raw` as a JSON object, `None` for anything else
pub fn parse_object(raw: &str) -> Option<Object> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Integer field; finite floats are rounded, numeric strings are accepted
pub fn int(obj: &Object, name: &str) -> Option<i64> {
    match obj.get(name)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Finite floating point field
pub fn float(obj: &Object, name: &str) -> Option<f64> {
    obj.get(name)?.as_f64().filter(|f| f.is_finite())
}

pub fn boolean(obj: &Object, name: &str) -> Option<bool> {
    obj.get(name)?.as_bool()
}

pub fn string<'a>(obj: &'a Object, name: &str) -> Option<&'a str> {
    obj.get(name)?.as_str()
}

/// Epoch-millisecond timestamp field
pub fn timestamp(obj: &Object, name: &str) -> Option<DateTime<Utc>> {
    let ms = int(obj, name)?;
    if ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}
