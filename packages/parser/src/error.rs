//! Error types for the kv tokenizer and parser

use crate::ast::Position;
use std::ops::Range;
use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Fatal scanner failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenizeError {
    #[error("Inconsistent indentation at {position}: width {width} does not match any enclosing block")]
    InconsistentIndentation {
        position: Position,
        width: usize,
        span: Range<usize>,
    },

    #[error("Unterminated string literal at {position}")]
    UnterminatedString { position: Position, span: Range<usize> },

    #[error("Illegal character {ch:?} at {position}")]
    IllegalCharacter {
        ch: char,
        position: Position,
        span: Range<usize>,
    },
}

impl TokenizeError {
    pub fn position(&self) -> Position {
        match self {
            TokenizeError::InconsistentIndentation { position, .. }
            | TokenizeError::UnterminatedString { position, .. }
            | TokenizeError::IllegalCharacter { position, .. } => *position,
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            TokenizeError::InconsistentIndentation { span, .. }
            | TokenizeError::UnterminatedString { span, .. }
            | TokenizeError::IllegalCharacter { span, .. } => span.clone(),
        }
    }

    /// Description without the location prefix
    pub fn message(&self) -> String {
        match self {
            TokenizeError::InconsistentIndentation { width, .. } => format!(
                "inconsistent indentation: width {} does not match any enclosing block",
                width
            ),
            TokenizeError::UnterminatedString { .. } => "unterminated string literal".to_string(),
            TokenizeError::IllegalCharacter { ch, .. } => format!("illegal character {:?}", ch),
        }
    }
}

/// Parse error with location and context
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected token at {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: Position,
        expected: String,
        found: String,
        span: Range<usize>,
    },

    #[error("Missing ':' after '{after}' at {position}")]
    MissingColon {
        position: Position,
        after: String,
        span: Range<usize>,
    },

    #[error("Invalid syntax at {position}: {message}")]
    InvalidSyntax {
        position: Position,
        message: String,
        span: Range<usize>,
    },

    #[error("Dynamic class '{name}' at {position} was already declared on line {first_line}")]
    DuplicateDynamicClass {
        position: Position,
        name: String,
        first_line: usize,
        span: Range<usize>,
    },

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

impl ParseError {
    pub fn unexpected_token(
        position: Position,
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            position,
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn missing_colon(position: Position, span: Range<usize>, after: impl Into<String>) -> Self {
        Self::MissingColon {
            position,
            after: after.into(),
            span,
        }
    }

    pub fn invalid_syntax(position: Position, span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            position,
            message: message.into(),
            span,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::MissingColon { position, .. }
            | ParseError::InvalidSyntax { position, .. }
            | ParseError::DuplicateDynamicClass { position, .. } => *position,
            ParseError::Tokenize(err) => err.position(),
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::MissingColon { span, .. }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::DuplicateDynamicClass { span, .. } => span.clone(),
            ParseError::Tokenize(err) => err.span(),
        }
    }

    /// Description without the location prefix
    pub fn message(&self) -> String {
        match self {
            ParseError::UnexpectedToken {
                expected, found, ..
            } => format!("expected {}, found {}", expected, found),
            ParseError::MissingColon { after, .. } => format!("missing ':' after '{}'", after),
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            ParseError::DuplicateDynamicClass {
                name, first_line, ..
            } => format!(
                "dynamic class '{}' was already declared on line {}",
                name, first_line
            ),
            ParseError::Tokenize(err) => err.message(),
        }
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &[ParseError]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in errors {
        let mut span = error.span();
        if span.start >= source.len() {
            span = source.len().saturating_sub(1)..source.len();
        }

        let report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_color(Color::Red)
                    .with_message(error.message()),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
