//! Strict and tolerant parse entry points
//!
//! Strict parsing returns the first error and nothing else. Tolerant parsing
//! always returns a module holding every top-level construct that parsed
//! cleanly, plus `(line, column, message)` diagnostics for the rest.

use crate::ast::Module;
use crate::config::{ParseMode, ParseOptions};
use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use crate::tokenizer::{tokenize_tolerant, tokenize_with_tab_size, DEFAULT_TAB_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl From<&ParseError> for ParseDiagnostic {
    fn from(error: &ParseError) -> Self {
        let position = error.position();
        Self {
            line: position.line,
            column: position.column,
            message: error.message(),
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Best-effort module plus everything that went wrong building it
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub filename: String,
    pub module: Module,
    /// Ordered by position
    pub diagnostics: Vec<ParseDiagnostic>,
    pub errors: Vec<ParseError>,
    /// No errors at all were met
    pub clean: bool,
}

impl ParseOutcome {
    fn new(filename: &str, module: Module, mut errors: Vec<ParseError>) -> Self {
        errors.sort_by_key(|error| error.position());
        Self {
            filename: filename.to_string(),
            module,
            diagnostics: errors.iter().map(ParseDiagnostic::from).collect(),
            clean: errors.is_empty(),
            errors,
        }
    }

    /// One `file:line:column: message` line per diagnostic
    pub fn render(&self) -> String {
        self.diagnostics
            .iter()
            .map(|diagnostic| format!("{}:{}\n", self.filename, diagnostic))
            .collect()
    }

    /// Diagnostics rendered against the source text
    #[cfg(feature = "pretty-errors")]
    pub fn render_pretty(&self, source: &str) -> String {
        crate::error::format_errors(source, &self.filename, &self.errors)
    }
}

/// Parse, aborting on the first error. `filename` only labels diagnostics.
#[instrument(skip(source), fields(bytes = source.len()))]
pub fn parse_strict(source: &str, filename: &str) -> ParseResult<Module> {
    strict(source, DEFAULT_TAB_SIZE)
}

/// Parse, skipping each failing top-level construct
#[instrument(skip(source), fields(bytes = source.len()))]
pub fn parse_tolerant(source: &str, filename: &str) -> ParseOutcome {
    tolerant(source, filename, DEFAULT_TAB_SIZE)
}

/// Parse according to `options`. Only strict mode can fail.
#[instrument(skip(source, options), fields(filename = %options.filename, mode = ?options.mode))]
pub fn parse_with_options(source: &str, options: &ParseOptions) -> ParseResult<ParseOutcome> {
    let outcome = match options.mode {
        ParseMode::Strict => {
            let module = strict(source, options.tab_size)?;
            ParseOutcome::new(&options.filename, module, Vec::new())
        }
        ParseMode::Tolerant => tolerant(source, &options.filename, options.tab_size),
    };

    if options.eager_bindings {
        outcome.module.compile_bindings(&options.property_compiler());
    }
    Ok(outcome)
}

fn strict(source: &str, tab_size: usize) -> ParseResult<Module> {
    let tokens = tokenize_with_tab_size(source, tab_size)?;
    Parser::new(source, tokens).with_tab_size(tab_size).parse_module()
}

fn tolerant(source: &str, filename: &str, tab_size: usize) -> ParseOutcome {
    let (tokens, scan_errors) = tokenize_tolerant(source, tab_size);
    let mut parser = Parser::new(source, tokens).with_tab_size(tab_size);
    let (module, mut errors) = parser.parse_module_tolerant();

    // A skipped construct already has its one error
    for scan_error in scan_errors {
        let start = scan_error.span().start;
        if parser.skipped_spans().iter().any(|span| span.contains(&start)) {
            continue;
        }
        let error = ParseError::Tokenize(scan_error);
        if !errors.contains(&error) {
            errors.push(error);
        }
    }

    debug!(
        filename,
        rules = module.rules.len(),
        errors = errors.len(),
        "tolerant parse finished"
    );
    ParseOutcome::new(filename, module, errors)
}
