// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The closed, dynamically-typed value model for context data.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::error::RenderError;

/// Signature of the boxed render callbacks carried by [`Value::Callback`].
///
/// Used by the inheritance tags (`yield`, `extends`/`block`): the callback
/// receives the live context and produces the text that replaces the tag.
pub type RenderCallback = dyn Fn(&mut Context) -> Result<String, RenderError>;

/// A dynamically-typed context value.
///
/// This is a closed set of variants: every projection and conversion the
/// engine performs is an explicit match, never runtime reflection. Absence
/// is expressed by failed resolution (`Option::None`), not by a variant —
/// there is deliberately no null.
#[derive(Clone)]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Keyed mapping with stable iteration order.
    Map(BTreeMap<String, Value>),
    /// Boxed render callback, only ever produced by the inheritance
    /// machinery. Lifetime is bounded by the frame that carries it.
    Callback(Rc<RenderCallback>),
}

impl Value {
    /// Wraps a render closure as a callback value.
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&mut Context) -> Result<String, RenderError> + 'static,
    {
        Value::Callback(Rc::new(callback))
    }

    /// Projects one path segment into this value.
    ///
    /// Maps project by key, lists by integer index. Every other variant
    /// fails to project, which resolution treats as absent.
    pub fn project(&self, segment: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(segment).cloned(),
            Value::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned()),
            Value::String(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Bool(_)
            | Value::Callback(_) => None,
        }
    }

    /// Converts the value to the text used for interpolation and for
    /// `switch` subject matching.
    ///
    /// Floats drop trailing zeros; lists and maps render as compact JSON;
    /// callbacks render as nothing.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(text) => text.clone(),
            Value::Int(number) => number.to_string(),
            Value::Float(number) => {
                let mut text = number.to_string();
                if text.contains('.') {
                    while text.ends_with('0') {
                        text.pop();
                    }
                    if text.ends_with('.') {
                        text.pop();
                    }
                }
                text
            }
            Value::Bool(flag) => flag.to_string(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
            Value::Callback(_) => String::new(),
        }
    }

    /// Converts to a `serde_json::Value`, mapping callbacks to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(text) => serde_json::Value::String(text.clone()),
            Value::Int(number) => serde_json::Value::Number((*number).into()),
            Value::Float(number) => serde_json::Number::from_f64(*number)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Bool(flag) => serde_json::Value::Bool(*flag),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Callback(_) => serde_json::Value::Null,
        }
    }
}

/// Truthiness of a resolution result.
///
/// Sequences are truthy when non-empty; any other present value is truthy
/// regardless of its own emptiness or zero-ness; absent is falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(Value::List(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) => f.debug_tuple("String").field(text).finish(),
            Value::Int(number) => f.debug_tuple("Int").field(number).finish(),
            Value::Float(number) => f.debug_tuple("Float").field(number).finish(),
            Value::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::List(left), Value::List(right)) => left == right,
            (Value::Map(left), Value::Map(right)) => left == right,
            (Value::Callback(left), Value::Callback(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Int(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Int(i64::from(number))
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Float(number)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(key, value)| (key, value.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            // The closed type has no null; a JSON null becomes present but
            // empty, which is distinct from an absent name.
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map_or_else(
                    || Value::Float(number.as_f64().unwrap_or_default()),
                    Value::Int,
                ),
            serde_json::Value::String(text) => Value::String(text),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}
