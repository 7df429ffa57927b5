// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The hierarchical scope stack read and written during rendering.

use std::collections::HashMap;
use std::rc::Rc;

use crate::loader::TemplateLoader;
use crate::value::Value;

/// Hierarchical variable scope threaded through every render call.
///
/// The context is an ordered stack of frames. Lookup searches from the most
/// recently pushed frame down to the base frame; writes always land in the
/// top frame, so bindings introduced inside a construct shadow outer ones
/// and disappear when the frame is popped.
///
/// Every node that pushes a frame must pop it before returning, on every
/// exit path including failure.
pub struct Context {
    frames: Vec<HashMap<String, Value>>,
    loader: Option<Rc<TemplateLoader>>,
}

impl Context {
    /// Creates a context with an empty base frame.
    pub fn new() -> Self {
        Self::with_base(HashMap::new())
    }

    /// Creates a context whose base frame holds the given bindings. The base
    /// frame lives for the whole render.
    pub fn with_base(base: HashMap<String, Value>) -> Self {
        Self {
            frames: vec![base],
            loader: None,
        }
    }

    /// Creates a context from a JSON value. Objects become the base frame;
    /// any other value produces an empty base.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self::with_base(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
            _ => Self::new(),
        }
    }

    /// Creates a context from any serializable value, going through
    /// `serde_json`. Fails if the value does not serialize.
    pub fn from_serialize<S: serde::Serialize>(data: S) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::to_value(data)?))
    }

    /// Attaches the template loader consulted by `include` and `extends`.
    pub fn set_loader(&mut self, loader: Rc<TemplateLoader>) {
        self.loader = Some(loader);
    }

    /// Returns the attached template loader, if any.
    pub fn loader(&self) -> Option<Rc<TemplateLoader>> {
        self.loader.clone()
    }

    /// Looks a name up, searching frames from the top of the stack down.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Writes a binding into the current top frame. Parent frames are never
    /// mutated; an outer binding of the same name is shadowed until the top
    /// frame is popped.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Pushes a new empty frame onto the stack.
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pushes a new frame pre-seeded with the given bindings.
    pub fn push_with<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.frames.push(bindings.into_iter().collect());
    }

    /// Pops the most recently pushed frame. The base frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<serde_json::Value> for Context {
    fn from(value: serde_json::Value) -> Self {
        Self::from_value(value)
    }
}
