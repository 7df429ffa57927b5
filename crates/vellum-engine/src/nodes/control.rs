// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::collections::HashMap;

use crate::context::Context;
use crate::error::{ParseError, ParseErrorCause, RenderError};
use crate::lexer::Token;
use crate::nodes::{render_nodes, Node, NodeList};
use crate::parser::{until, TokenParser};
use crate::value::{is_truthy, Value};
use crate::variable::Variable;

/// Iterates a sequence, binding each element under the loop variable.
///
/// Syntax: `{% for x in items %} … {% empty %} … {% endfor %}`.
#[derive(Debug)]
pub struct ForNode {
    /// Expression that must resolve to a sequence.
    pub variable: Variable,
    /// Name bound to the current element inside the body.
    pub loop_variable: String,
    /// Body rendered once per element.
    pub nodes: NodeList,
    /// Body parsed after `{% empty %}`. Parsed for structural correctness
    /// but not rendered; an absent or empty sequence produces no output.
    pub empty_nodes: NodeList,
}

impl ForNode {
    /// Parses `for <x> in <expr>` and its body.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let components = token.components();
        if components.len() != 4 || components[2] != "in" {
            return Err(ParseError::new(
                ParseErrorCause::InvalidForSyntax,
                token.clone(),
                "Invalid syntax. Expected `for x in y`.",
            ));
        }
        let loop_variable = components[1].to_string();
        let variable = components[3].to_string();

        let nodes = parser.parse_until(&until(&["endfor", "empty"]))?;

        let mut empty_nodes = NodeList::new();
        match parser.next_token() {
            Some(next) if next.diagnostic_name() == "empty" => {
                empty_nodes = parser.parse_until(&until(&["endfor"]))?;
                match parser.next_token() {
                    Some(end) if end.diagnostic_name() == "endfor" => {}
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorCause::MissingEnd,
                            token.clone(),
                            "`endfor` was not found.",
                        ))
                    }
                }
            }
            Some(next) if next.diagnostic_name() == "endfor" => {}
            _ => {
                return Err(ParseError::new(
                    ParseErrorCause::MissingEnd,
                    token.clone(),
                    "`endfor` was not found.",
                ))
            }
        }

        Ok(Box::new(ForNode {
            variable: Variable::new(variable),
            loop_variable,
            nodes,
            empty_nodes,
        }))
    }
}

impl Node for ForNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let Some(Value::List(values)) = self.variable.resolve(context) else {
            // Absent or non-sequence values degrade to empty output.
            return Ok(String::new());
        };

        let mut output = String::new();
        for item in values {
            context.push();
            context.set(self.loop_variable.clone(), item);
            let result = render_nodes(&self.nodes, context);
            context.pop();
            output.push_str(&result?);
        }

        Ok(output)
    }
}

/// Renders one of two branches depending on the condition's truthiness.
///
/// Syntax: `{% if expr %} … {% else %} … {% endif %}`. `ifnot` parses the
/// same construct with the branches swapped.
#[derive(Debug)]
pub struct IfNode {
    /// The condition expression.
    pub variable: Variable,
    /// Branch rendered when the condition is truthy.
    pub true_nodes: NodeList,
    /// Branch rendered otherwise.
    pub false_nodes: NodeList,
}

impl IfNode {
    /// Parses an `if` tag.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let (variable, if_nodes, else_nodes) = Self::parse_branches(parser, token)?;
        Ok(Box::new(IfNode {
            variable: Variable::new(variable),
            true_nodes: if_nodes,
            false_nodes: else_nodes,
        }))
    }

    /// Parses an `ifnot` tag: the same construct with branches swapped.
    pub fn parse_ifnot(
        parser: &mut TokenParser,
        token: &Token,
    ) -> Result<Box<dyn Node>, ParseError> {
        let (variable, if_nodes, else_nodes) = Self::parse_branches(parser, token)?;
        Ok(Box::new(IfNode {
            variable: Variable::new(variable),
            true_nodes: else_nodes,
            false_nodes: if_nodes,
        }))
    }

    fn parse_branches(
        parser: &mut TokenParser,
        token: &Token,
    ) -> Result<(String, NodeList, NodeList), ParseError> {
        let components = token.components();
        let Some(variable) = components.get(1) else {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the condition to evaluate.",
            ));
        };
        let variable = (*variable).to_string();

        let if_nodes = parser.parse_until(&until(&["endif", "else"]))?;

        let mut else_nodes = NodeList::new();
        match parser.next_token() {
            Some(next) if next.diagnostic_name() == "else" => {
                else_nodes = parser.parse_until(&until(&["endif"]))?;
                match parser.next_token() {
                    Some(end) if end.diagnostic_name() == "endif" => {}
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorCause::MissingEnd,
                            token.clone(),
                            "`endif` was not found.",
                        ))
                    }
                }
            }
            Some(next) if next.diagnostic_name() == "endif" => {}
            _ => {
                return Err(ParseError::new(
                    ParseErrorCause::MissingEnd,
                    token.clone(),
                    "`endif` was not found.",
                ))
            }
        }

        Ok((variable, if_nodes, else_nodes))
    }
}

impl Node for IfNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let resolved = self.variable.resolve(context);
        let branch = if is_truthy(resolved.as_ref()) {
            &self.true_nodes
        } else {
            &self.false_nodes
        };

        context.push();
        let result = render_nodes(branch, context);
        context.pop();
        result
    }
}

/// Selects a body by exact string match on the subject's text form.
///
/// Syntax: `{% switch expr %} {% case lit %} … {% default %} … {% endswitch %}`.
#[derive(Debug)]
pub struct SwitchNode {
    /// The subject expression.
    pub variable: Variable,
    /// Bodies keyed by their literal case pattern.
    pub cases: HashMap<String, NodeList>,
    /// Body used when the subject is absent or matches no case.
    pub default_nodes: NodeList,
}

impl SwitchNode {
    /// Parses a `switch` tag and its case sections.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let components = token.components();
        let Some(variable) = components.get(1) else {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the value to switch on.",
            ));
        };
        let variable = (*variable).to_string();

        let (cases, default_nodes) = Self::parse_sections(parser, token)?;
        Ok(Box::new(SwitchNode {
            variable: Variable::new(variable),
            cases,
            default_nodes,
        }))
    }

    /// Consumes `case`/`default` sections up to `endswitch`.
    ///
    /// Comments and whitespace-only text between sections are ignored;
    /// anything else there is a syntax error.
    #[allow(clippy::type_complexity)]
    fn parse_sections(
        parser: &mut TokenParser,
        token: &Token,
    ) -> Result<(HashMap<String, NodeList>, NodeList), ParseError> {
        let mut cases: HashMap<String, NodeList> = HashMap::new();
        let mut default_nodes: Option<NodeList> = None;

        while let Some(next) = parser.next_token() {
            match &next {
                Token::Block(_) => match next.components().first().copied() {
                    Some("case") => {
                        let Some(pattern) = next.components().get(1).copied() else {
                            return Err(ParseError::new(
                                ParseErrorCause::InvalidSwitchSyntax,
                                next.clone(),
                                "`case` takes one argument, the pattern to match.",
                            ));
                        };
                        let pattern = pattern.to_string();
                        let nodes =
                            parser.parse_until(&until(&["case", "default", "endswitch"]))?;
                        cases.insert(pattern, nodes);
                    }
                    Some("default") => {
                        default_nodes =
                            Some(parser.parse_until(&until(&["case", "default", "endswitch"]))?);
                    }
                    Some("endswitch") => {
                        return Ok((cases, default_nodes.unwrap_or_default()));
                    }
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorCause::InvalidSwitchSyntax,
                            next.clone(),
                            "Expected `case`, `default` or `endswitch`.",
                        ))
                    }
                },
                Token::Variable(_) => {
                    return Err(ParseError::new(
                        ParseErrorCause::InvalidSwitchSyntax,
                        next.clone(),
                        "Unexpected variable in switch context.",
                    ))
                }
                Token::Text(contents) => {
                    if !contents.trim().is_empty() {
                        return Err(ParseError::new(
                            ParseErrorCause::InvalidSwitchSyntax,
                            next.clone(),
                            "Unexpected non-whitespace text.",
                        ));
                    }
                }
                Token::Comment(_) => {}
            }
        }

        Err(ParseError::new(
            ParseErrorCause::MissingEnd,
            token.clone(),
            "Expected `endswitch`.",
        ))
    }
}

impl Node for SwitchNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let nodes = match self.variable.resolve(context) {
            Some(value) => self
                .cases
                .get(&value.to_display_string())
                .unwrap_or(&self.default_nodes),
            None => &self.default_nodes,
        };

        context.push();
        let result = render_nodes(nodes, context);
        context.pop();
        result
    }
}

/// Captures its rendered body into a context binding instead of emitting it.
///
/// Syntax: `{% bind name %} … {% endbind %}`. The node itself contributes
/// no output; the binding lands in the current top frame.
#[derive(Debug)]
pub struct BindNode {
    /// Name to bind the captured output under.
    pub name: String,
    /// Body rendered into the binding.
    pub nodes: NodeList,
}

impl BindNode {
    /// Parses a `bind` tag and its body.
    pub fn parse(parser: &mut TokenParser, token: &Token) -> Result<Box<dyn Node>, ParseError> {
        let components = token.components();
        let Some(name) = components.get(1) else {
            return Err(ParseError::new(
                ParseErrorCause::InvalidArgumentCount,
                token.clone(),
                "Tag takes one argument, the name to bind.",
            ));
        };
        let name = (*name).to_string();

        let nodes = parser.parse_until(&until(&["endbind"]))?;
        match parser.next_token() {
            Some(end) if end.diagnostic_name() == "endbind" => {}
            _ => {
                return Err(ParseError::new(
                    ParseErrorCause::MissingEnd,
                    token.clone(),
                    "`endbind` was not found.",
                ))
            }
        }

        Ok(Box::new(BindNode { name, nodes }))
    }
}

impl Node for BindNode {
    fn render(&self, context: &mut Context) -> Result<String, RenderError> {
        let output = render_nodes(&self.nodes, context)?;
        context.set(self.name.clone(), Value::String(output));
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use serde_json::json;

    fn context() -> Context {
        Context::from_value(json!({
            "items": [1, 2, 3],
            "emptied": [],
            "name": "Kyle",
        }))
    }

    fn parse_single(source: &str) -> Box<dyn Node> {
        let mut parser = TokenParser::new(tokenize(source));
        let mut nodes = parser.parse().unwrap();
        assert_eq!(nodes.len(), 1, "expected exactly one top-level node");
        nodes.remove(0)
    }

    fn parse_error(source: &str) -> ParseError {
        TokenParser::new(tokenize(source)).parse().unwrap_err()
    }

    #[test]
    fn for_loop_binds_each_element() {
        let node = parse_single("{% for item in items %}{{ item }}{% endfor %}");
        assert_eq!(node.render(&mut context()).unwrap(), "123");
    }

    #[test]
    fn for_loop_over_absent_value_renders_nothing() {
        let node = parse_single("{% for item in unknown %}{{ item }}{% endfor %}");
        assert_eq!(node.render(&mut context()).unwrap(), "");
    }

    #[test]
    fn for_loop_over_non_sequence_renders_nothing() {
        let node = parse_single("{% for item in name %}{{ item }}{% endfor %}");
        assert_eq!(node.render(&mut context()).unwrap(), "");
    }

    #[test]
    fn for_loop_empty_body_parses_but_never_renders() {
        let node = parse_single("{% for item in emptied %}x{% empty %}nothing{% endfor %}");
        assert_eq!(node.render(&mut context()).unwrap(), "");
    }

    #[test]
    fn for_loop_binding_is_popped_after_the_loop() {
        let node = parse_single("{% for item in items %}{{ item }}{% endfor %}");
        let mut context = context();
        node.render(&mut context).unwrap();
        assert_eq!(context.lookup("item"), None);
    }

    #[test]
    fn for_requires_four_components_with_in() {
        let err = parse_error("{% for item items %}{{ item }}{% endfor %}");
        assert_eq!(err.cause, ParseErrorCause::InvalidForSyntax);
    }

    #[test]
    fn for_without_endfor_is_missing_end() {
        let err = parse_error("{% for item in items %}{{ item }}");
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
        assert_eq!(err.token.diagnostic_name(), "for");
    }

    #[test]
    fn if_renders_true_branch_for_nonempty_sequence() {
        let node = parse_single("{% if items %}yes{% else %}no{% endif %}");
        assert_eq!(node.render(&mut context()).unwrap(), "yes");
    }

    #[test]
    fn if_renders_false_branch_for_absent_name() {
        let node = parse_single("{% if unknown %}yes{% else %}no{% endif %}");
        assert_eq!(node.render(&mut context()).unwrap(), "no");
    }

    #[test]
    fn ifnot_swaps_the_branches() {
        let node = parse_single("{% ifnot unknown %}fallback{% else %}value{% endif %}");
        assert_eq!(node.render(&mut context()).unwrap(), "fallback");
    }

    #[test]
    fn if_without_endif_is_missing_end() {
        let err = parse_error("{% if items %}yes");
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
    }

    #[test]
    fn if_with_else_still_requires_endif() {
        let err = parse_error("{% if items %}yes{% else %}no");
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
    }

    #[test]
    fn if_without_condition_is_invalid_argument_count() {
        let err = parse_error("{% if %}yes{% endif %}");
        assert_eq!(err.cause, ParseErrorCause::InvalidArgumentCount);
    }

    #[test]
    fn switch_matches_cases_exactly() {
        let source = "{% switch name %}\
                      {% case Kyle %}F\
                      {% case Marius %}R\
                      {% default %}?\
                      {% endswitch %}";
        let node = parse_single(source);

        assert_eq!(node.render(&mut context()).unwrap(), "F");

        let mut boris = Context::from_value(json!({"name": "Boris"}));
        assert_eq!(node.render(&mut boris).unwrap(), "?");

        let mut absent = Context::new();
        assert_eq!(node.render(&mut absent).unwrap(), "?");
    }

    #[test]
    fn switch_without_default_falls_back_to_empty() {
        let node = parse_single("{% switch name %}{% case Other %}x{% endswitch %}");
        assert_eq!(node.render(&mut context()).unwrap(), "");
    }

    #[test]
    fn switch_tolerates_whitespace_and_comments_between_sections() {
        let source = "{% switch name %}  \n\t {# spacer #}{% case Kyle %}F{% endswitch %}";
        let node = parse_single(source);
        assert_eq!(node.render(&mut context()).unwrap(), "F");
    }

    #[test]
    fn switch_rejects_text_between_sections() {
        let err = parse_error("{% switch name %}stray{% endswitch %}");
        assert_eq!(err.cause, ParseErrorCause::InvalidSwitchSyntax);
    }

    #[test]
    fn switch_rejects_variables_between_sections() {
        let err = parse_error("{% switch name %}{{ name }}{% endswitch %}");
        assert_eq!(err.cause, ParseErrorCause::InvalidSwitchSyntax);
    }

    #[test]
    fn switch_rejects_unknown_tags_between_sections() {
        let err = parse_error("{% switch name %}{% bogus %}{% endswitch %}");
        assert_eq!(err.cause, ParseErrorCause::InvalidSwitchSyntax);
    }

    #[test]
    fn switch_without_endswitch_is_missing_end() {
        let err = parse_error("{% switch name %}{% case Kyle %}F");
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
        assert_eq!(err.token.diagnostic_name(), "switch");
    }

    #[test]
    fn bind_captures_output_without_emitting() {
        let node = parse_single("{% bind greeting %}Hello {{ name }}{% endbind %}");
        let mut context = context();
        assert_eq!(node.render(&mut context).unwrap(), "");
        assert_eq!(
            context.lookup("greeting"),
            Some(&Value::from("Hello Kyle"))
        );
    }

    #[test]
    fn bind_without_endbind_is_missing_end() {
        let err = parse_error("{% bind name %}content");
        assert_eq!(err.cause, ParseErrorCause::MissingEnd);
    }
}
