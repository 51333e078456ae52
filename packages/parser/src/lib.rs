pub mod ast;
pub mod binding;
pub mod config;
pub mod error;
pub mod expression;
pub mod parser;
pub mod recovery;
pub mod serializer;
pub mod tokenizer;

pub use ast::{
    Body, Canvas, CanvasInstruction, CanvasLayer, Directive, DynamicClass, Module, Position, Property, Rule,
    Selector, Template, Widget,
};
pub use binding::{
    CompileWarning, CompiledValue, EvalMode, ExpressionParser, ExpressionTree, PropertyCompiler, WatchedKey,
};
pub use config::{ParseMode, ParseOptions};
#[cfg(feature = "pretty-errors")]
pub use error::format_errors;
pub use error::{ParseError, ParseResult, TokenizeError};
pub use expression::PythonExpressionParser;
pub use parser::{parse, Parser};
pub use recovery::{parse_strict, parse_tolerant, parse_with_options, ParseDiagnostic, ParseOutcome};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_basic() {
        let tokens = tokenize("<Button>:").unwrap();
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_parse_and_compile() {
        let module = parse("<Title@Label>:\n    text: app.title\n").unwrap();
        let compiler = PropertyCompiler::new();
        module.compile_bindings(&compiler);

        let compiled = module.rules[0].body.properties[0].compiled().unwrap();
        assert_eq!(compiled.mode, EvalMode::Eval);
        assert_eq!(compiled.watched_keys, vec![vec!["app".to_string(), "title".to_string()]]);
    }
}
