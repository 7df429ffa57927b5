// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Template inheritance: `yield`, `extends` and `block`.
//!
//! All three ride on the context's callback values. `yield` reads the
//! reserved key bound by [`crate::Template::call`]; `extends` loads a parent
//! template and hands it the child's block bodies as callbacks; `block`
//! prefers such a callback over its own body.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{ParseError, ParseErrorCause, RenderError};
use crate::lexer::Token;
use crate::nodes::{render_nodes, with_loaded_template, Node, NodeList};
use crate::parser::{until, TokenParser};
use crate::value::Value;

/// Reserved context key read by `yield` and bound by [`crate::Template::call`].
pub const YIELD_BLOCK_KEY: &str = "block";

/// Prefix of the reserved keys under which `extends` binds block overrides.
const BLOCK_KEY_PREFIX: &str = "block:";

fn override_key(name: &str) -> String {
    format!("{BLOCK_KEY_PREFIX}{name}")
}

/// Renders the caller-supplied content in a layout template.
///
/// Syntax: `{% yield %}`. Fails when no block callback was bound.
#[derive(Debug)]
pub struct YieldNode;

impl YieldNode {
    /// Parses a `yield` tag; it carries no state.
    pub fn parse(_parser: &mut TokenParser, _token: &Token) -> Result<Box<dyn Node>, ParseError> {
        Ok(Box::new(YieldNode))
    }
}

impl Node for YieldNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let Some(Value::Callback(callback)) = context.lookup(YIELD_BLOCK_KEY).cloned() else {
            return Err(RenderError::NoBlockInContext);
        };
        callback(context)
    }
}

/// A named, overridable region of a template.
///
/// Syntax: `{% block name %} … {% endblock %}`. Standalone blocks render
/// their own body; under `extends`, the child's body wins.
#[derive(Debug)]
pub struct BlockNode {
    /// The block's name.
    pub name: String,
    /// Fallback body, shared so `extends` can hand it around as a callback.
    pub nodes: Arc<NodeList>,
}

impl BlockNode {
    /// Parses a `block` tag and records it for a surrounding `extends`.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let components = token.components();
        let Some(name) = components.get(1) else {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the name of the block.",
            ));
        };
        let name = (*name).to_string();

        let nodes = Arc::new(parser.parse_until(&until(&["endblock"]))?);
        match parser.next_token() {
            Some(end) if end.diagnostic_name() == "endblock" => {}
            _ => {
                return Err(ParseError::new(
                    ParseErrorCause::MissingEnd,
                    token.clone(),
                    "`endblock` was not found.",
                ))
            }
        }

        parser.record_block(name.clone(), Arc::clone(&nodes));
        Ok(Box::new(BlockNode { name, nodes }))
    }
}

impl Node for BlockNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        if let Some(Value::Callback(callback)) = context.lookup(&override_key(&self.name)).cloned()
        {
            return callback(context);
        }
        render_nodes(&self.nodes, context)
    }
}

/// Renders a parent template with this template's blocks as overrides.
///
/// Syntax: `{% extends "name" %}`; the rest of the template is consumed as
/// the child body and only its `block` tags survive.
#[derive(Debug)]
pub struct ExtendsNode {
    /// Name of the parent template passed to the loader.
    pub template_name: String,
    /// Child block bodies keyed by block name.
    pub blocks: HashMap<String, Arc<NodeList>>,
}

impl ExtendsNode {
    /// Parses an `extends` tag and the remainder of the template.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let segments: Vec<&str> = token.contents().split('"').collect();
        if segments.len() != 3 {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the template file to be extended.",
            ));
        }
        let template_name = segments[1].to_string();

        if parser.extends_seen() {
            return Err(ParseError::new(
                ParseErrorCause::ExtendsUsedMoreThanOnce,
                token.clone(),
                "`extends` may only be used once per template.",
            ));
        }
        parser.mark_extends();

        // Blocks recorded before this tag belong to an enclosing body, not
        // to this inheritance relationship.
        parser.drain_named_blocks();
        let _body = parser.parse()?;
        let blocks = parser.drain_named_blocks();

        Ok(Box::new(ExtendsNode {
            template_name,
            blocks,
        }))
    }
}

impl Node for ExtendsNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        with_loaded_template(context, &self.template_name, |context, template| {
            let overrides: Vec<(String, Value)> = self
                .blocks
                .iter()
                .map(|(name, nodes)| {
                    let nodes = Arc::clone(nodes);
                    (
                        override_key(name),
                        Value::callback(move |context: &mut Context| {
                            render_nodes(&nodes, context)
                        }),
                    )
                })
                .collect();

            context.push_with(overrides);
            let result = template.render(context);
            context.pop();
            result
        })
    }
}
