// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generic configuration tree.
//!
//! Every decoder produces a [`Tree`], the merge and expansion stages operate on
//! it, and the aggregator publishes one. Leaves are typed [`Value`]s; the
//! `coerce_*` methods implement the lenient conversions used by the typed
//! accessors.

use crate::domain::duration::{format_duration, parse_duration};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A string-keyed map of values. Key order is irrelevant to the semantics;
/// the `BTreeMap` keeps enumeration deterministic.
pub type Tree = BTreeMap<String, Value>;

/// A single node in a configuration tree.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::Value;
///
/// let port = Value::from(8080);
/// assert_eq!(port.coerce_i64(), Some(8080));
/// assert_eq!(port.coerce_string(), "8080");
///
/// let flag = Value::from("yes");
/// assert_eq!(flag.coerce_bool(), Some(true));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A text leaf.
    String(String),
    /// A signed integer leaf.
    Integer(i64),
    /// A floating point leaf.
    Float(f64),
    /// A boolean leaf.
    Bool(bool),
    /// A duration leaf.
    Duration(Duration),
    /// A nested tree.
    Map(Tree),
    /// An ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns a short name for the variant, used in logs and errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Duration(_) => "duration",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    /// Returns the text of a `String` leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested tree of a `Map` node.
    pub fn as_map(&self) -> Option<&Tree> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements of a `List` node.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns `true` for `Map` nodes.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Renders any value as text. Scalars print plainly, containers as JSON.
    pub fn coerce_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Converts to an integer.
    ///
    /// Floats truncate toward zero and strings must hold a decimal integer
    /// after trimming. Booleans, durations and containers do not convert.
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts to a float. Integers widen and strings are parsed.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts to a boolean.
    ///
    /// Strings accept `true/1/yes/y/on` and `false/0/no/n/off`, case-insensitive.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" | "on" => Some(true),
                "false" | "0" | "no" | "n" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Converts to a duration.
    ///
    /// Strings must be duration literals (`"1.5s"`). Non-negative numbers are
    /// read as nanoseconds; floats round to the nearest nanosecond.
    pub fn coerce_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            Value::String(s) => parse_duration(s.trim()),
            Value::Integer(ns) => u64::try_from(*ns).ok().map(Duration::from_nanos),
            Value::Float(ns) if ns.is_finite() && *ns >= 0.0 && *ns < u64::MAX as f64 => {
                Some(Duration::from_nanos(ns.round() as u64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Duration(d) => f.write_str(&format_duration(*d)),
            Value::Map(_) | Value::List(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            // JSON has no encoding for these
            Value::Float(v) if !v.is_finite() => serializer.collect_str(v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Duration(d) => serializer.serialize_str(&format_duration(*d)),
            Value::Map(m) => m.serialize(serializer),
            Value::List(l) => l.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Value::Map(tree)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
