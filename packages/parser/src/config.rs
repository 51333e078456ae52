use crate::binding::{PropertyCompiler, DEFAULT_BINDING_ROOTS};
use crate::expression::PythonExpressionParser;
use crate::tokenizer::DEFAULT_TAB_SIZE;
use serde::{Deserialize, Serialize};

/// How parse errors are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// The first error aborts the parse
    #[default]
    Strict,
    /// Failing top-level constructs are skipped and reported
    Tolerant,
}

/// Options for a parse, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    pub mode: ParseMode,
    /// Columns a tab advances to (the next multiple of this width)
    pub tab_size: usize,
    /// Names whose attribute chains become watched keys
    pub binding_roots: Vec<String>,
    /// Analyze values with the built-in expression parser before falling back
    /// to the textual scanner
    pub expression_analysis: bool,
    /// Compile every property right after parsing
    pub eager_bindings: bool,
    /// Nominal filename used in diagnostics
    pub filename: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ParseMode::Strict,
            tab_size: DEFAULT_TAB_SIZE,
            binding_roots: DEFAULT_BINDING_ROOTS.iter().map(|root| root.to_string()).collect(),
            expression_analysis: false,
            eager_bindings: false,
            filename: "<string>".to_string(),
        }
    }
}

impl ParseOptions {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn tolerant(mut self) -> Self {
        self.mode = ParseMode::Tolerant;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Compiler configured with these roots and analysis setting
    pub fn property_compiler(&self) -> PropertyCompiler {
        let compiler = PropertyCompiler::with_roots(self.binding_roots.iter().cloned());
        if self.expression_analysis {
            compiler.with_expression_parser(PythonExpressionParser)
        } else {
            compiler
        }
    }
}
