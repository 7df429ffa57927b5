// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The renderable node tree built by the parser.
//!
//! Every template construct implements [`Node`]: render against a context,
//! producing text or failing. Node trees are immutable after parsing and
//! may be rendered any number of times, each render supplying its own
//! context.

use std::sync::Arc;

use crate::context::Context;
use crate::error::RenderError;
use crate::variable::Variable;
use crate::Template;

mod control;
mod include;
mod inherit;
mod now;

pub use control::{BindNode, ForNode, IfNode, SwitchNode};
pub use include::{IncludeNode, Transformer};
pub use inherit::{BlockNode, ExtendsNode, YieldNode, YIELD_BLOCK_KEY};
pub use now::NowNode;

/// A parsed, renderable unit of the template tree.
pub trait Node: Send + Sync + std::fmt::Debug {
    /// Renders the node against the context, producing text or failing.
    fn render(&self, context: &mut Context) -> Result<String, RenderError>;
}

/// An ordered list of nodes, rendered in sequence.
pub type NodeList = Vec<Box<dyn Node>>;

/// Renders a node list by concatenating each node's output in order.
///
/// The first failure aborts the walk; nodes after the failing one
/// contribute nothing.
pub fn render_nodes(nodes: &[Box<dyn Node>], context: &mut Context) -> Result<String, RenderError> {
    let mut output = String::new();
    for node in nodes {
        output.push_str(&node.render(context)?);
    }
    Ok(output)
}

/// Resolves `name` through the context's template loader and hands the
/// loaded template to `render`.
///
/// Shared by `include` and `extends`: both fail when no loader is attached
/// or when the loader cannot resolve the name.
pub(crate) fn with_loaded_template<F>(
    context: &mut Context,
    name: &str,
    render: F,
) -> Result<String, RenderError>
where
    F: FnOnce(&mut Context, &Template) -> Result<String, RenderError>,
{
    let Some(loader) = context.loader() else {
        return Err(RenderError::LoaderNotInContext);
    };
    let Some(template) = loader.load_template(name) else {
        return Err(RenderError::TemplateNotFound {
            name: name.to_string(),
            paths: loader.paths().to_vec(),
        });
    };
    render(context, &template)
}

/// Literal text, emitted verbatim.
#[derive(Debug)]
pub struct TextNode {
    /// The literal text.
    pub text: String,
}

impl TextNode {
    /// Creates a text node.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Node for TextNode {
    fn render(&self, _context: &mut Context) -> Result<String, RenderError> {
        Ok(self.text.clone())
    }
}

/// Interpolates a resolved variable into the output.
#[derive(Debug)]
pub struct VariableNode {
    /// The path expression to resolve.
    pub variable: Variable,
}

impl VariableNode {
    /// Creates a variable node from a path expression.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: Variable::new(variable),
        }
    }
}

impl Node for VariableNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        Ok(self
            .variable
            .resolve(context)
            .map(|value| value.to_display_string())
            .unwrap_or_default())
    }
}

/// Signature of host-supplied handlers for simple custom tags.
pub type SimpleHandler = dyn Fn(&mut Context) -> Result<String, RenderError> + Send + Sync;

/// Wraps an arbitrary render callback registered by tag name.
///
/// The extension point for host tags that need no parsing: no body, no
/// arguments beyond what the handler closure captures.
pub struct SimpleNode {
    handler: Arc<SimpleHandler>,
}

impl SimpleNode {
    /// Creates a simple node over the given handler.
    pub fn new(handler: Arc<SimpleHandler>) -> Self {
        Self { handler }
    }
}

impl Node for SimpleNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        (self.handler)(context)
    }
}

impl std::fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleNode").finish_non_exhaustive()
    }
}
