// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The tag-dispatching recursive-descent parser.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use log::trace;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::lexer::Token;
use crate::nodes::{
    BindNode, BlockNode, ExtendsNode, ForNode, IfNode, IncludeNode, Node, NodeList, NowNode,
    SimpleHandler, SimpleNode, SwitchNode, TextNode, VariableNode, YieldNode,
};

/// Signature of a tag parsing function: consume whatever the tag needs from
/// the parser and produce a node, or fail.
pub type TagParser = dyn Fn(&mut TokenParser, &Token) -> Result<Box<dyn Node>, ParseError>;

/// Signature of a stop predicate: decides whether a block token ends the
/// current sub-parse.
pub type StopPredicate = dyn Fn(&TokenParser, &Token) -> bool;

/// Builds a stop predicate matching any of the given tag names against a
/// token's first component.
///
/// This is how every paired construct hands control back to its enclosing
/// parse call: `parse_until(&until(&["endfor", "empty"]))`.
pub fn until(tags: &'static [&'static str]) -> impl Fn(&TokenParser, &Token) -> bool {
    move |_parser, token| {
        token
            .components()
            .first()
            .is_some_and(|name| tags.contains(name))
    }
}

/// Turns an ordered token sequence into node lists by dispatching block
/// tags through a name-keyed registry of parsing functions.
///
/// The registry is pre-populated with the built-in tags; hosts extend the
/// vocabulary with [`TokenParser::register_tag`] or
/// [`TokenParser::register_simple_tag`] before calling
/// [`TokenParser::parse`].
pub struct TokenParser {
    tokens: VecDeque<Token>,
    tags: HashMap<String, Rc<TagParser>>,
    extends_seen: bool,
    named_blocks: HashMap<String, Arc<NodeList>>,
}

impl TokenParser {
    /// Creates a parser over the given tokens with the built-in tags
    /// registered.
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut parser = Self {
            tokens: tokens.into_iter().collect(),
            tags: HashMap::new(),
            extends_seen: false,
            named_blocks: HashMap::new(),
        };
        parser.register_tag("for", ForNode::parse);
        parser.register_tag("if", IfNode::parse);
        parser.register_tag("ifnot", IfNode::parse_ifnot);
        parser.register_tag("switch", SwitchNode::parse);
        parser.register_tag("bind", BindNode::parse);
        parser.register_tag("now", NowNode::parse);
        parser.register_tag("include", IncludeNode::parse);
        parser.register_tag("extends", ExtendsNode::parse);
        parser.register_tag("block", BlockNode::parse);
        parser.register_tag("yield", YieldNode::parse);
        parser
    }

    /// Registers a parsing function for a tag name, replacing any previous
    /// registration.
    pub fn register_tag<F>(&mut self, name: impl Into<String>, parse: F)
    where
        F: Fn(&mut TokenParser, &Token) -> Result<Box<dyn Node>, ParseError> + 'static,
    {
        self.tags.insert(name.into(), Rc::new(parse));
    }

    /// Registers a bodyless custom tag backed by a render handler.
    pub fn register_simple_tag<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Context) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        let handler: Arc<SimpleHandler> = Arc::new(handler);
        self.register_tag(name, move |_parser, _token| {
            Ok(Box::new(SimpleNode::new(Arc::clone(&handler))) as Box<dyn Node>)
        });
    }

    /// Parses the whole remaining token sequence, as for a top-level
    /// template.
    pub fn parse(&mut self) -> Result<NodeList, ParseError> {
        self.parse_impl(None)
    }

    /// Parses until the stop predicate matches a block token.
    ///
    /// The matching token is pushed back so the caller can consume it; the
    /// nodes accumulated so far are returned.
    pub fn parse_until(&mut self, stop: &StopPredicate) -> Result<NodeList, ParseError> {
        self.parse_impl(Some(stop))
    }

    fn parse_impl(&mut self, stop: Option<&StopPredicate>) -> Result<NodeList, ParseError> {
        let mut nodes = NodeList::new();

        while let Some(token) = self.next_token() {
            match &token {
                Token::Text(text) => nodes.push(Box::new(TextNode::new(text.clone()))),
                Token::Variable(variable) => {
                    nodes.push(Box::new(VariableNode::new(variable.clone())));
                }
                Token::Comment(_) => {}
                Token::Block(_) => {
                    if let Some(stop) = stop {
                        if stop(self, &token) {
                            self.prepend_token(token);
                            return Ok(nodes);
                        }
                    }

                    let Some(tag) = token.components().first().copied() else {
                        continue;
                    };
                    let Some(parse) = self.tags.get(tag).cloned() else {
                        // Unregistered tags are skipped, not errors.
                        trace!("ignoring unregistered tag `{tag}`");
                        continue;
                    };
                    nodes.push(parse(self, &token)?);
                }
            }
        }

        Ok(nodes)
    }

    /// Removes and returns the head token, or `None` when exhausted.
    pub fn next_token(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    /// Reinserts a token at the head of the queue.
    ///
    /// Used for stop-predicate pushback and end-tag lookahead; together
    /// with [`TokenParser::next_token`] this is the parser's only form of
    /// lookahead.
    pub fn prepend_token(&mut self, token: Token) {
        self.tokens.push_front(token);
    }

    /// Whether an `extends` tag was already dispatched in this parse.
    pub(crate) fn extends_seen(&self) -> bool {
        self.extends_seen
    }

    /// Marks the `extends` tag as used.
    pub(crate) fn mark_extends(&mut self) {
        self.extends_seen = true;
    }

    /// Records a parsed `block` body under its name for a surrounding
    /// `extends`.
    pub(crate) fn record_block(&mut self, name: String, nodes: Arc<NodeList>) {
        self.named_blocks.insert(name, nodes);
    }

    /// Takes the blocks recorded since the last drain.
    pub(crate) fn drain_named_blocks(&mut self) -> HashMap<String, Arc<NodeList>> {
        std::mem::take(&mut self.named_blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::nodes::render_nodes;
    use serde_json::json;

    #[test]
    fn text_and_variable_tokens_become_nodes() {
        let mut parser = TokenParser::new(tokenize("Hello {{ name }}"));
        let nodes = parser.parse().unwrap();
        assert_eq!(nodes.len(), 2);

        let mut context = Context::from_value(json!({"name": "Kyle"}));
        assert_eq!(render_nodes(&nodes, &mut context).unwrap(), "Hello Kyle");
    }

    #[test]
    fn comment_tokens_produce_no_nodes() {
        let mut parser = TokenParser::new(tokenize("a{# gone #}b"));
        let nodes = parser.parse().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            render_nodes(&nodes, &mut Context::new()).unwrap(),
            "ab"
        );
    }

    #[test]
    fn unregistered_tags_are_silently_skipped() {
        let mut parser = TokenParser::new(tokenize("a{% mystery %}b"));
        let nodes = parser.parse().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(render_nodes(&nodes, &mut Context::new()).unwrap(), "ab");
    }

    #[test]
    fn empty_block_tags_are_skipped() {
        let mut parser = TokenParser::new(vec![Token::Block(String::new())]);
        let nodes = parser.parse().unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn stop_predicate_pushes_the_boundary_token_back() {
        let mut parser = TokenParser::new(tokenize("body{% endfor %}after"));
        let nodes = parser.parse_until(&until(&["endfor"])).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            parser.next_token(),
            Some(Token::Block("endfor".to_string()))
        );
        assert_eq!(parser.next_token(), Some(Token::Text("after".to_string())));
    }

    #[test]
    fn stop_predicate_matches_on_the_first_component() {
        let predicate = until(&["endfor", "empty"]);
        let parser = TokenParser::new(Vec::new());
        assert!(predicate(&parser, &Token::Block("empty".to_string())));
        assert!(predicate(&parser, &Token::Block("endfor trailing".to_string())));
        assert!(!predicate(&parser, &Token::Block("endif".to_string())));
    }

    #[test]
    fn next_and_prepend_form_a_pushback_buffer() {
        let mut parser = TokenParser::new(tokenize("one"));
        let token = parser.next_token().unwrap();
        parser.prepend_token(token.clone());
        assert_eq!(parser.next_token(), Some(token));
        assert_eq!(parser.next_token(), None);
    }

    #[test]
    fn custom_tags_extend_the_vocabulary() {
        let mut parser = TokenParser::new(tokenize("{% shout %}"));
        parser.register_simple_tag("shout", |context| {
            let name = context
                .lookup("name")
                .map(crate::Value::to_display_string)
                .unwrap_or_default();
            Ok(name.to_uppercase())
        });
        let nodes = parser.parse().unwrap();

        let mut context = Context::from_value(json!({"name": "kyle"}));
        assert_eq!(render_nodes(&nodes, &mut context).unwrap(), "KYLE");
    }

    #[test]
    fn custom_tag_parsers_can_consume_their_own_body() {
        let mut parser = TokenParser::new(tokenize("{% quiet %}loud{% endquiet %}"));
        parser.register_tag("quiet", |parser, _token| {
            let _body = parser.parse_until(&until(&["endquiet"]))?;
            let _ = parser.next_token();
            Ok(Box::new(TextNode::new("")) as Box<dyn Node>)
        });
        let nodes = parser.parse().unwrap();
        assert_eq!(render_nodes(&nodes, &mut Context::new()).unwrap(), "");
    }
}
