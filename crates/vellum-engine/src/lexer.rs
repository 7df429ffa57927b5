// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Token model and the scanner that produces the parser's input stream.

use smallvec::SmallVec;

/// The parser's input unit.
///
/// A token either carries structural markup content (the trimmed text
/// between delimiters) or a run of literal template text. Tokens are
/// immutable once produced and consumed front-to-back by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, emitted verbatim.
    Text(String),
    /// A `{{ … }}` variable expression.
    Variable(String),
    /// A `{% … %}` block tag.
    Block(String),
    /// A `{# … #}` comment, discarded by the parser.
    Comment(String),
}

impl Token {
    /// Returns the raw payload of the token.
    pub fn contents(&self) -> &str {
        match self {
            Token::Text(contents)
            | Token::Variable(contents)
            | Token::Block(contents)
            | Token::Comment(contents) => contents,
        }
    }

    /// Splits the payload on runs of whitespace.
    ///
    /// The first component of a block token is its tag name; the rest are
    /// the tag's arguments.
    pub fn components(&self) -> SmallVec<[&str; 4]> {
        self.contents().split_whitespace().collect()
    }

    /// Name used when reporting this token in diagnostics: the tag name for
    /// block tokens, or a placeholder when the payload is empty.
    pub fn diagnostic_name(&self) -> &str {
        self.components().first().copied().unwrap_or("<empty>")
    }
}

const VARIABLE_OPEN: &str = "{{";
const VARIABLE_CLOSE: &str = "}}";
const BLOCK_OPEN: &str = "{%";
const BLOCK_CLOSE: &str = "%}";
const COMMENT_OPEN: &str = "{#";
const COMMENT_CLOSE: &str = "#}";

/// Splits raw template source into a token stream.
///
/// The scanner never fails: an opening delimiter without a matching close is
/// treated as literal text through the end of the input.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, cursor: 0 }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while self.cursor < self.source.len() {
            match self.find_open() {
                Some((open, open_delim, close_delim, build)) => {
                    if open > self.cursor {
                        tokens.push(Token::Text(self.source[self.cursor..open].to_string()));
                    }

                    let body_start = open + open_delim.len();
                    match self.source[body_start..].find(close_delim) {
                        Some(offset) => {
                            let body = &self.source[body_start..body_start + offset];
                            tokens.push(build(body.trim().to_string()));
                            self.cursor = body_start + offset + close_delim.len();
                        }
                        None => {
                            // Unterminated delimiter: the rest is literal.
                            tokens.push(Token::Text(self.source[open..].to_string()));
                            self.cursor = self.source.len();
                        }
                    }
                }
                None => {
                    tokens.push(Token::Text(self.source[self.cursor..].to_string()));
                    self.cursor = self.source.len();
                }
            }
        }

        tokens
    }

    /// Finds the earliest opening delimiter at or after the cursor.
    #[allow(clippy::type_complexity)]
    fn find_open(&self) -> Option<(usize, &'static str, &'static str, fn(String) -> Token)> {
        let rest = &self.source[self.cursor..];
        let candidates: [(&'static str, &'static str, fn(String) -> Token); 3] = [
            (VARIABLE_OPEN, VARIABLE_CLOSE, Token::Variable),
            (BLOCK_OPEN, BLOCK_CLOSE, Token::Block),
            (COMMENT_OPEN, COMMENT_CLOSE, Token::Comment),
        ];

        candidates
            .iter()
            .filter_map(|(open, close, build)| {
                rest.find(open)
                    .map(|offset| (self.cursor + offset, *open, *close, *build))
            })
            .min_by_key(|(position, _, _, _)| *position)
    }
}
