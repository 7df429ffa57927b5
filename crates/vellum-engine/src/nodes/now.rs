// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::fmt::Write;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::lexer::Token;
use crate::nodes::Node;
use crate::parser::TokenParser;
use crate::value::Value;
use crate::variable::Variable;

/// strftime pattern used when the tag carries no format argument.
const DEFAULT_FORMAT: &str = "\"%Y-%m-%d at %H:%M\"";

/// Emits the current local time, formatted with a strftime pattern.
///
/// Syntax: `{% now %}` or `{% now format %}` where `format` is a variable
/// or quoted literal resolving to a pattern string.
#[derive(Debug)]
pub struct NowNode {
    /// Expression resolving to the format pattern.
    pub format: Variable,
}

impl NowNode {
    /// Parses a `now` tag with an optional format argument.
    pub fn parse(_parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let components = token.components();
        let format = if components.len() == 2 {
            Some(Variable::new(components[1]))
        } else {
            None
        };
        Ok(Box::new(NowNode::new(format)))
    }

    /// Creates a now node; without a format the default pattern applies.
    pub fn new(format: Option<Variable>) -> Self {
        Self {
            format: format.unwrap_or_else(|| Variable::new(DEFAULT_FORMAT)),
        }
    }
}

impl Node for NowNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let Some(Value::String(pattern)) = self.format.resolve(context) else {
            // Absent or non-string formats degrade to empty output.
            return Ok(String::new());
        };

        let now = chrono::Local::now();
        let mut output = String::new();
        match write!(output, "{}", now.format(&pattern)) {
            Ok(()) => Ok(output),
            // chrono surfaces invalid patterns as formatting failures.
            Err(_) => Ok(String::new()),
        }
    }
}
