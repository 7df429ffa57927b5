// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::collections::HashMap;

use log::trace;
use once_cell::sync::Lazy;

use crate::context::Context;
use crate::error::{ParseError, ParseErrorCause, RenderError};
use crate::lexer::Token;
use crate::nodes::{with_loaded_template, Node};
use crate::parser::TokenParser;

type TransformerFn = fn(&str) -> String;

/// Fixed registry of named output transformers available to `include`.
static TRANSFORMERS: Lazy<HashMap<&'static str, TransformerFn>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, TransformerFn> = HashMap::new();
    map.insert("trim", |input| input.trim().to_string());
    map
});

/// A named transformation applied to an include's rendered output.
#[derive(Clone, Copy, Debug)]
pub struct Transformer {
    apply: TransformerFn,
}

impl Transformer {
    /// Looks a transformer up by its registered name.
    pub fn by_name(name: &str) -> Option<Self> {
        TRANSFORMERS.get(name).map(|apply| Self { apply: *apply })
    }

    /// The `trim` transformer: strips leading and trailing whitespace.
    pub fn trim() -> Self {
        Self {
            apply: |input| input.trim().to_string(),
        }
    }

    /// Applies the transformation.
    pub fn apply(&self, input: &str) -> String {
        (self.apply)(input)
    }
}

/// Renders another template in place, sharing the including context.
///
/// Syntax: `{% include "name" %}`, optionally followed by pipe-separated
/// transformer names (`{% include "name" | trim %}`).
#[derive(Debug)]
pub struct IncludeNode {
    /// Name passed to the template loader.
    pub template_name: String,
    /// Transformers applied to the rendered output, in declaration order.
    pub transformers: Vec<Transformer>,
}

impl IncludeNode {
    /// Parses an `include` tag.
    pub fn parse(_parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        Self::from_token(token).map(|node| Box::new(node) as Box<dyn Node>)
    }

    fn from_token(token: &Token) -> Result<Self, ParseError> {
        let segments: Vec<&str> = token.contents().split('"').collect();
        if segments.len() != 3 {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the template file to be included.",
            ));
        }

        let template_name = segments[1].to_string();

        let mut transformers = Vec::new();
        let tail = segments[2].trim();
        if !tail.is_empty() {
            for name in tail.split('|').map(str::trim).filter(|name| !name.is_empty()) {
                match Transformer::by_name(name) {
                    Some(transformer) => transformers.push(transformer),
                    // Unrecognised transformer names are dropped.
                    None => trace!("ignoring unknown transformer `{name}`"),
                }
            }
        }

        Ok(IncludeNode {
            template_name,
            transformers,
        })
    }
}

impl Node for IncludeNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let rendered = with_loaded_template(context, &self.template_name, |context, template| {
            template.render(context)
        })?;

        Ok(self
            .transformers
            .iter()
            .fold(rendered, |output, transformer| transformer.apply(&output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_quoted_template_name() {
        let token = Token::Block("include \"partial.html\"".to_string());
        let node = IncludeNode::from_token(&token).unwrap();
        assert_eq!(node.template_name, "partial.html");
        assert!(node.transformers.is_empty());
    }

    #[test]
    fn parses_the_transformer_list() {
        let token = Token::Block("include \"partial.html\" | trim".to_string());
        let node = IncludeNode::from_token(&token).unwrap();
        assert_eq!(node.transformers.len(), 1);
    }

    #[test]
    fn rejects_unquoted_arguments() {
        let token = Token::Block("include partial.html".to_string());
        let err = IncludeNode::from_token(&token).unwrap_err();
        assert_eq!(err.cause, ParseErrorCause::InvalidArgumentCount);
    }

    #[test]
    fn rejects_extra_quoted_segments() {
        let token = Token::Block("include \"a\" \"b\"".to_string());
        let err = IncludeNode::from_token(&token).unwrap_err();
        assert_eq!(err.cause, ParseErrorCause::InvalidArgumentCount);
    }

    #[test]
    fn unknown_transformer_names_are_dropped() {
        let token = Token::Block("include \"partial.html\" | sparkle | trim".to_string());
        let node = IncludeNode::from_token(&token).unwrap();
        assert_eq!(node.transformers.len(), 1);
    }

    #[test]
    fn trim_strips_only_outer_whitespace() {
        let transformer = Transformer::trim();
        assert_eq!(transformer.apply("  a  b\n"), "a  b");
    }

    #[test]
    fn include_without_loader_fails() {
        let token = Token::Block("include \"partial.html\"".to_string());
        let node = IncludeNode::from_token(&token).unwrap();
        let err = node.render(&mut Context::new()).unwrap_err();
        assert!(matches!(err, RenderError::LoaderNotInContext));
    }
}
