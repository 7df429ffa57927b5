// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::Token;

/// Reasons a template can fail to parse.
///
/// Parsing is all-or-nothing: the first structural problem aborts the whole
/// parse. Data-shaped problems (missing variables, mismatched value kinds)
/// are never parse errors — they degrade at render time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseErrorCause {
    /// A tag was given the wrong number of arguments.
    InvalidArgumentCount,
    /// The token stream ended before the construct's end tag was found.
    MissingEnd,
    /// A `for` tag that is not of the form `for x in y`.
    InvalidForSyntax,
    /// More than one `extends` tag in a single template.
    ExtendsUsedMoreThanOnce,
    /// Unexpected content between the sections of a `switch` body.
    InvalidSwitchSyntax,
}

/// Error produced while turning a token stream into a node tree.
///
/// Carries the offending [`Token`] so diagnostics can point at the exact
/// construct that failed.
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .token.diagnostic_name())]
pub struct ParseError {
    /// Machine-readable failure category.
    pub cause: ParseErrorCause,
    /// The token that triggered the failure.
    pub token: Token,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    /// Creates a parse error for the given cause and offending token.
    pub fn new(cause: ParseErrorCause, token: Token, message: impl Into<String>) -> Self {
        Self {
            cause,
            token,
            message: message.into(),
        }
    }
}

/// Error produced while rendering a node tree against a context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// `include`/`extends` need a template loader but the context has none.
    #[error("template loader not in context")]
    LoaderNotInContext,
    /// The loader could not resolve the requested template name.
    #[error("template {name:?} not found in {paths:?}")]
    TemplateNotFound {
        /// Name that was requested.
        name: String,
        /// Search paths the loader consulted.
        paths: Vec<PathBuf>,
    },
    /// `yield` was rendered without a block callback in the context.
    #[error("no block in context")]
    NoBlockInContext,
    /// Failure raised by a host-registered tag handler.
    #[error("{0}")]
    Custom(String),
}

impl RenderError {
    /// Creates a custom render error with the given message, for use by
    /// host-registered tag handlers.
    pub fn custom(message: impl Into<String>) -> Self {
        RenderError::Custom(message.into())
    }
}
