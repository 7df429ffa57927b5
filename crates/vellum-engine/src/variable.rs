// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Dotted-path variable resolution.

use crate::context::Context;
use crate::value::Value;

/// A path expression over the context.
///
/// Two resolution modes: a quoted literal (`"text"` or `'text'`) resolves
/// to its unquoted contents regardless of the context, and an unquoted
/// dotted path (`a.b.c`) walks the context from the base lookup of the
/// first segment. Resolution short-circuits to absent the moment any
/// segment fails to project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// The raw path expression.
    pub variable: String,
}

impl Variable {
    /// Wraps a path expression.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    /// Resolves the expression against the context.
    ///
    /// Returns `None` when the name is unbound or a path segment does not
    /// project; absence is distinct from a present-but-empty value.
    pub fn resolve(&self, context: &Context) -> Option<Value> {
        if let Some(literal) = self.quoted_literal() {
            return Some(Value::String(literal.to_string()));
        }

        let mut segments = self.variable.split('.');
        let first = segments.next()?;
        let mut current = context.lookup(first).cloned()?;

        for segment in segments {
            current = current.project(segment)?;
        }

        Some(current)
    }

    /// Returns the unquoted text when the expression is a quoted literal.
    fn quoted_literal(&self) -> Option<&str> {
        for quote in ['"', '\''] {
            if let Some(inner) = self
                .variable
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
            {
                return Some(inner);
            }
        }
        None
    }
}
