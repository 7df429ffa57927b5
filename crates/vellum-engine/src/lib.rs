#![forbid(unsafe_code)]
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logic-bearing text templates: conditionals, loops, inheritance and
//! variable interpolation rendered against application data.
//!
//! A template source is tokenized, parsed into a tree of renderable nodes
//! by a tag-dispatching recursive-descent parser, and rendered against a
//! hierarchical variable scope (the [`Context`]):
//!
//! ```
//! use vellum_engine::{Context, Template};
//! use serde_json::json;
//!
//! let template = Template::parse_str(
//!     "greeting",
//!     "Hello {{ name }}{% if titles %}, {% for t in titles %}{{ t }} {% endfor %}{% endif %}",
//! )
//! .unwrap();
//!
//! let mut context = Context::from_value(json!({
//!     "name": "Kyle",
//!     "titles": ["author"],
//! }));
//! assert_eq!(template.render(&mut context).unwrap(), "Hello Kyle, author ");
//! ```
//!
//! Structural problems fail the parse; data-shaped problems (missing
//! variables, wrong value kinds) degrade to empty output at render time so
//! templates never crash a render over missing data.

pub mod context;
mod error;
pub mod lexer;
pub mod loader;
pub mod nodes;
pub mod parser;
pub mod value;
pub mod variable;

pub use context::Context;
pub use error::{ParseError, ParseErrorCause, RenderError};
pub use lexer::{tokenize, Token};
pub use loader::TemplateLoader;
pub use nodes::{
    render_nodes, BindNode, BlockNode, ExtendsNode, ForNode, IfNode, IncludeNode, Node, NodeList,
    NowNode, SimpleHandler, SimpleNode, SwitchNode, TextNode, Transformer, VariableNode,
    YieldNode, YIELD_BLOCK_KEY,
};
pub use parser::{until, StopPredicate, TagParser, TokenParser};
pub use value::{is_truthy, RenderCallback, Value};
pub use variable::Variable;

use std::fmt;

/// A parsed template: an ordered node list plus its render entry points.
///
/// The node tree is immutable after parsing and may be rendered any number
/// of times; each render threads its own [`Context`] through the tree.
pub struct Template {
    name: String,
    nodes: NodeList,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Template {
    /// Tokenizes and parses template source with the built-in tags.
    pub fn parse_str(name: &str, source: &str) -> Result<Self, ParseError> {
        let nodes = TokenParser::new(lexer::tokenize(source)).parse()?;
        Ok(Self::from_nodes(name, nodes))
    }

    /// Wraps an already-parsed node list, e.g. from a [`TokenParser`] with
    /// custom tags registered.
    pub fn from_nodes(name: impl Into<String>, nodes: NodeList) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// The template's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed node list.
    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    /// Renders the template against the context.
    pub fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        render_nodes(&self.nodes, context)
    }

    /// Renders with `yield_block` supplying the content for `{% yield %}`.
    ///
    /// The callback is bound under the reserved key for the duration of
    /// this call only: one frame is pushed around the render and popped on
    /// every exit path.
    pub fn call<F>(&self, context: &mut Context, yield_block: F) -> Result<String, RenderError>
    where
        F: Fn(&mut Context) -> Result<String, RenderError> + 'static,
    {
        context.push_with([(YIELD_BLOCK_KEY.to_string(), Value::callback(yield_block))]);
        let result = self.render(context);
        context.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        Context::from_value(json!({
            "name": "Kyle",
            "age": 27,
            "items": [1, 2, 3],
        }))
    }

    #[test]
    fn renders_text_and_variables() {
        let template = Template::parse_str("t", "Hello {{ name }}, {{ age }}").unwrap();
        assert_eq!(template.render(&mut context()).unwrap(), "Hello Kyle, 27");
    }

    #[test]
    fn comments_render_to_nothing() {
        let template = Template::parse_str("t", "a{# invisible #}b").unwrap();
        assert_eq!(template.render(&mut context()).unwrap(), "ab");
    }

    #[test]
    fn missing_variables_render_empty() {
        let template = Template::parse_str("t", "[{{ absent }}]").unwrap();
        assert_eq!(template.render(&mut context()).unwrap(), "[]");
    }

    #[test]
    fn loops_concatenate_in_order() {
        let template =
            Template::parse_str("t", "{% for item in items %}{{ item }}{% endfor %}").unwrap();
        assert_eq!(template.render(&mut context()).unwrap(), "123");
    }

    #[test]
    fn rendering_is_repeatable() {
        let template = Template::parse_str("t", "{{ name }}").unwrap();
        let mut context = context();
        assert_eq!(template.render(&mut context).unwrap(), "Kyle");
        assert_eq!(template.render(&mut context).unwrap(), "Kyle");
    }

    #[test]
    fn call_binds_the_yield_block() {
        let layout = Template::parse_str("layout", "<body>{% yield %}</body>").unwrap();
        let mut context = context();
        let result = layout
            .call(&mut context, |context| {
                Ok(context
                    .lookup("name")
                    .map(Value::to_display_string)
                    .unwrap_or_default())
            })
            .unwrap();
        assert_eq!(result, "<body>Kyle</body>");
    }

    #[test]
    fn call_unbinds_the_block_afterwards() {
        let layout = Template::parse_str("layout", "{% yield %}").unwrap();
        let mut context = context();
        layout.call(&mut context, |_| Ok("x".to_string())).unwrap();
        assert_eq!(context.lookup(YIELD_BLOCK_KEY), None);

        let bare = Template::parse_str("bare", "{% yield %}").unwrap();
        let err = bare.render(&mut context).unwrap_err();
        assert!(matches!(err, RenderError::NoBlockInContext));
    }

    #[test]
    fn parse_errors_surface_the_offending_tag() {
        let err = Template::parse_str("t", "{% for item in items %}x").unwrap_err();
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
        assert_eq!(err.token.diagnostic_name(), "for");
    }

    #[test]
    fn node_trees_are_shareable_across_threads() {
        let template = Template::parse_str("t", "{{ name }}").unwrap();
        let template = std::sync::Arc::new(template);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let template = std::sync::Arc::clone(&template);
                std::thread::spawn(move || {
                    let mut context = Context::from_value(json!({"name": "Kyle"}));
                    template.render(&mut context).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Kyle");
        }
    }
}
