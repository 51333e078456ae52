//! Built-in analyzer for the Python expressions embedded in property values
//!
//! Only the expression grammar is covered. Statements, assignments and
//! anything the lexer rejects make the analyzer decline (`None`), which sends
//! the binding compiler back to its textual scanner.

use crate::binding::{ExpressionParser, ExpressionTree};
use logos::Logos;

#[derive(Debug, Clone, PartialEq)]
struct StringLiteral {
    formatted: bool,
    body: String,
}

/// Scan the rest of a string literal whose prefix and opening quote matched
fn lex_string(lex: &mut logos::Lexer<PyToken>) -> Option<StringLiteral> {
    let opening = lex.slice();
    let quote = *opening.as_bytes().last()?;
    let prefix_len = opening.len() - 1;
    let formatted = opening[..prefix_len].contains(['f', 'F']);

    let rest = lex.remainder().as_bytes();
    let triple = rest.len() >= 2 && rest[0] == quote && rest[1] == quote;

    let mut i = if triple { 2 } else { 0 };
    let body_start = i;
    let body_end;
    loop {
        let b = *rest.get(i)?;
        if b == b'\\' {
            i += 2;
            continue;
        }
        if triple {
            if rest[i..].starts_with(&[quote; 3]) {
                body_end = i;
                i += 3;
                break;
            }
        } else if b == quote {
            body_end = i;
            i += 1;
            break;
        } else if b == b'\n' {
            return None;
        }
        i += 1;
    }

    let body = lex.remainder()[body_start..body_end].to_string();
    lex.bump(i);
    Some(StringLiteral { formatted, body })
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"\\\r?\n")]
#[logos(skip r"#[^\n]*")]
enum PyToken {
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("lambda")]
    Lambda,
    #[token("for")]
    For,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("None")]
    #[token("True")]
    #[token("False")]
    Constant,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?[jJ]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?[jJ]?")]
    #[regex(r"0[xXoObB][0-9a-fA-F_]+")]
    Number,

    #[regex(r#"[rRbBuUfF]{0,2}["']"#, lex_string)]
    Str(StringLiteral),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("=")]
    Assign,
    #[token(":=")]
    Walrus,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,
    #[token("~")]
    Tilde,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,

    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
}

/// Number of binary operator levels below comparisons
const BINARY_LEVELS: usize = 6;

/// Binding level of a binary operator, loosest first
fn binary_level(token: &PyToken) -> Option<usize> {
    match token {
        PyToken::Pipe => Some(0),
        PyToken::Caret => Some(1),
        PyToken::Amp => Some(2),
        PyToken::LShift | PyToken::RShift => Some(3),
        PyToken::Plus | PyToken::Minus => Some(4),
        PyToken::Star | PyToken::Slash | PyToken::DoubleSlash | PyToken::Percent | PyToken::At => Some(5),
        _ => None,
    }
}

fn is_comparison(token: &PyToken) -> bool {
    matches!(
        token,
        PyToken::Lt
            | PyToken::Gt
            | PyToken::Le
            | PyToken::Ge
            | PyToken::EqEq
            | PyToken::NotEq
            | PyToken::In
            | PyToken::Is
    )
}

/// Analyzer for Python expressions, usable as the binding compiler's
/// expression collaborator
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonExpressionParser;

impl ExpressionParser for PythonExpressionParser {
    fn parse_expression(&self, text: &str) -> Option<ExpressionTree> {
        parse_python_expression(text)
    }
}

/// Parse `text` as a single expression (a bare tuple counts as one)
pub fn parse_python_expression(text: &str) -> Option<ExpressionTree> {
    let tokens = PyToken::lexer(text).collect::<Result<Vec<_>, _>>().ok()?;
    if tokens.is_empty() || tokens.len() > MAX_TOKENS {
        return None;
    }
    ExpressionReader {
        tokens,
        pos: 0,
        depth: 0,
    }
    .parse_all()
}

/// Longer values are left to the textual scanner; operator chains nest one
/// tree level per operand
const MAX_TOKENS: usize = 1024;

/// Deepest nesting of groups, conditionals and unary operators read before
/// declining
const MAX_NESTING: usize = 100;

struct ExpressionReader {
    tokens: Vec<PyToken>,
    pos: usize,
    depth: usize,
}

impl ExpressionReader {
    fn parse_all(mut self) -> Option<ExpressionTree> {
        let tree = self.parse_expression_list()?;
        if self.pos == self.tokens.len() {
            Some(tree)
        } else {
            None
        }
    }

    fn parse_expression_list(&mut self) -> Option<ExpressionTree> {
        let first = self.parse_element()?;
        if !self.check(&PyToken::Comma) {
            return Some(first);
        }
        let mut items = vec![first];
        while self.match_token(&PyToken::Comma) {
            if self.at_group_end() {
                break;
            }
            items.push(self.parse_element()?);
        }
        Some(ExpressionTree::Sequence(items))
    }

    /// A test expression, optionally starred
    fn parse_element(&mut self) -> Option<ExpressionTree> {
        if self.match_token(&PyToken::Star) || self.match_token(&PyToken::DoubleStar) {
            return self.nested(|reader| reader.parse_binary(0));
        }
        self.parse_test()
    }

    /// Run `parse` one nesting level deeper, declining past `MAX_NESTING`
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_test(&mut self) -> Option<ExpressionTree> {
        self.nested(Self::parse_test_expression)
    }

    fn parse_test_expression(&mut self) -> Option<ExpressionTree> {
        if self.match_token(&PyToken::Lambda) {
            return self.parse_lambda();
        }
        if matches!(self.peek(), Some(PyToken::Name(_))) && self.peek_ahead(1) == Some(&PyToken::Walrus) {
            self.pos += 2;
            return self.parse_test();
        }

        let body = self.parse_or()?;
        if !self.match_token(&PyToken::If) {
            return Some(body);
        }
        let test = self.parse_or()?;
        self.expect(&PyToken::Else)?;
        let orelse = self.parse_test()?;
        Some(ExpressionTree::Conditional {
            body: Box::new(body),
            test: Box::new(test),
            orelse: Box::new(orelse),
        })
    }

    fn parse_lambda(&mut self) -> Option<ExpressionTree> {
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        while !self.check(&PyToken::Colon) {
            let _ = self.match_token(&PyToken::Star) || self.match_token(&PyToken::DoubleStar);
            params.push(self.expect_name()?);
            if self.match_token(&PyToken::Assign) {
                defaults.push(self.parse_test()?);
            }
            if !self.match_token(&PyToken::Comma) {
                break;
            }
        }
        self.expect(&PyToken::Colon)?;
        let body = self.parse_test()?;

        let body = if defaults.is_empty() {
            body
        } else {
            defaults.push(body);
            ExpressionTree::Sequence(defaults)
        };
        Some(ExpressionTree::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_or(&mut self) -> Option<ExpressionTree> {
        let mut left = self.parse_and()?;
        while self.match_token(&PyToken::Or) {
            let right = self.parse_and()?;
            left = binary(left, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<ExpressionTree> {
        let mut left = self.parse_not()?;
        while self.match_token(&PyToken::And) {
            let right = self.parse_not()?;
            left = binary(left, right);
        }
        Some(left)
    }

    fn parse_not(&mut self) -> Option<ExpressionTree> {
        if self.match_token(&PyToken::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Some(ExpressionTree::Unary(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Option<ExpressionTree> {
        let mut left = self.parse_binary(0)?;
        loop {
            if self.check(&PyToken::Not) && self.peek_ahead(1) == Some(&PyToken::In) {
                self.pos += 2;
            } else if self.peek().map_or(false, is_comparison) {
                let is = self.check(&PyToken::Is);
                self.pos += 1;
                if is {
                    self.match_token(&PyToken::Not);
                }
            } else {
                break;
            }
            let right = self.parse_binary(0)?;
            left = binary(left, right);
        }
        Some(left)
    }

    fn parse_binary(&mut self, level: usize) -> Option<ExpressionTree> {
        if level == BINARY_LEVELS {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        while self.peek().and_then(binary_level) == Some(level) {
            self.pos += 1;
            let right = self.parse_binary(level + 1)?;
            left = binary(left, right);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<ExpressionTree> {
        if self.match_token(&PyToken::Plus)
            || self.match_token(&PyToken::Minus)
            || self.match_token(&PyToken::Tilde)
        {
            let operand = self.nested(Self::parse_unary)?;
            return Some(ExpressionTree::Unary(Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Option<ExpressionTree> {
        self.match_token(&PyToken::Await);
        let base = self.parse_primary()?;
        if self.match_token(&PyToken::DoubleStar) {
            let exponent = self.nested(Self::parse_unary)?;
            return Some(binary(base, exponent));
        }
        Some(base)
    }

    fn parse_primary(&mut self) -> Option<ExpressionTree> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.match_token(&PyToken::Dot) {
                let attr = self.expect_name()?;
                expr = ExpressionTree::Attribute {
                    value: Box::new(expr),
                    attr,
                };
            } else if self.match_token(&PyToken::LParen) {
                let args = self.parse_call_args()?;
                expr = ExpressionTree::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.match_token(&PyToken::LBracket) {
                let index = self.parse_subscript()?;
                expr = ExpressionTree::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Some(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> Option<Vec<ExpressionTree>> {
        let mut args = Vec::new();
        while !self.match_token(&PyToken::RParen) {
            if matches!(self.peek(), Some(PyToken::Name(_))) && self.peek_ahead(1) == Some(&PyToken::Assign) {
                self.pos += 2;
            }
            let arg = self.parse_element()?;
            let arg = if self.check(&PyToken::For) || self.check(&PyToken::Async) {
                self.parse_comprehension(vec![arg])?
            } else {
                arg
            };
            args.push(arg);

            if !self.match_token(&PyToken::Comma) {
                self.expect(&PyToken::RParen)?;
                break;
            }
        }
        Some(args)
    }

    /// Index or slice list up to the closing `]`
    fn parse_subscript(&mut self) -> Option<ExpressionTree> {
        let mut parts = Vec::new();
        loop {
            if !self.check(&PyToken::Colon) && !self.check(&PyToken::RBracket) {
                parts.push(self.parse_element()?);
            }
            if self.match_token(&PyToken::Colon) || self.match_token(&PyToken::Comma) {
                continue;
            }
            self.expect(&PyToken::RBracket)?;
            break;
        }
        Some(match parts.len() {
            1 => parts.remove(0),
            _ => ExpressionTree::Sequence(parts),
        })
    }

    /// `for ... in ... if ...` clauses following an element; loop targets
    /// are locals and are left out of the tree
    fn parse_comprehension(&mut self, mut items: Vec<ExpressionTree>) -> Option<ExpressionTree> {
        while self.check(&PyToken::For) || self.check(&PyToken::Async) {
            self.match_token(&PyToken::Async);
            self.expect(&PyToken::For)?;
            loop {
                self.parse_binary(0)?;
                if !self.match_token(&PyToken::Comma) {
                    break;
                }
            }
            self.expect(&PyToken::In)?;
            items.push(self.parse_or()?);
            while self.match_token(&PyToken::If) {
                items.push(self.parse_or()?);
            }
        }
        Some(ExpressionTree::Sequence(items))
    }

    fn parse_atom(&mut self) -> Option<ExpressionTree> {
        match self.advance()? {
            PyToken::Name(name) => Some(ExpressionTree::Name(name)),
            PyToken::Number | PyToken::Constant | PyToken::Ellipsis => Some(ExpressionTree::Literal),
            PyToken::Str(literal) => self.parse_strings(literal),
            PyToken::LParen => self.parse_group(PyToken::RParen),
            PyToken::LBracket => self.parse_group(PyToken::RBracket),
            PyToken::LBrace => self.parse_braces(),
            _ => None,
        }
    }

    /// Adjacent literals concatenate; interpolations of any f-string among
    /// them are parsed as expressions
    fn parse_strings(&mut self, first: StringLiteral) -> Option<ExpressionTree> {
        let mut literals = vec![first];
        while let Some(PyToken::Str(_)) = self.peek() {
            if let Some(PyToken::Str(literal)) = self.advance() {
                literals.push(literal);
            }
        }

        if !literals.iter().any(|literal| literal.formatted) {
            return Some(ExpressionTree::Literal);
        }

        let mut parts = Vec::new();
        for literal in literals.iter().filter(|literal| literal.formatted) {
            for source in interpolations(&literal.body)? {
                parts.push(parse_python_expression(source)?);
            }
        }
        Some(ExpressionTree::Interpolated(parts))
    }

    /// Parenthesized expression, tuple, list or generator
    fn parse_group(&mut self, close: PyToken) -> Option<ExpressionTree> {
        if self.match_token(&close) {
            return Some(ExpressionTree::Sequence(Vec::new()));
        }
        let first = self.parse_element()?;
        let tree = if self.check(&PyToken::For) || self.check(&PyToken::Async) {
            self.parse_comprehension(vec![first])?
        } else if self.check(&PyToken::Comma) {
            let mut items = vec![first];
            while self.match_token(&PyToken::Comma) {
                if self.check(&close) {
                    break;
                }
                items.push(self.parse_element()?);
            }
            ExpressionTree::Sequence(items)
        } else if close == PyToken::RBracket {
            ExpressionTree::Sequence(vec![first])
        } else {
            first
        };
        self.expect(&close)?;
        Some(tree)
    }

    /// Dict, set or their comprehensions
    fn parse_braces(&mut self) -> Option<ExpressionTree> {
        let mut items = Vec::new();
        while !self.match_token(&PyToken::RBrace) {
            items.push(self.parse_element()?);
            if self.match_token(&PyToken::Colon) {
                items.push(self.parse_test()?);
            }
            if self.check(&PyToken::For) || self.check(&PyToken::Async) {
                let comprehension = self.parse_comprehension(std::mem::take(&mut items))?;
                items.push(comprehension);
            }
            if !self.match_token(&PyToken::Comma) {
                self.expect(&PyToken::RBrace)?;
                break;
            }
        }
        Some(ExpressionTree::Sequence(items))
    }

    // Helper methods

    fn peek(&self) -> Option<&PyToken> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&PyToken> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<PyToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn check(&self, token: &PyToken) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &PyToken) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &PyToken) -> Option<()> {
        self.match_token(token).then_some(())
    }

    fn expect_name(&mut self) -> Option<String> {
        match self.advance()? {
            PyToken::Name(name) => Some(name),
            _ => None,
        }
    }

    fn at_group_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(PyToken::RParen) | Some(PyToken::RBracket) | Some(PyToken::RBrace)
        )
    }
}

fn binary(left: ExpressionTree, right: ExpressionTree) -> ExpressionTree {
    ExpressionTree::Binary {
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Source text of each `{...}` field in an f-string body, without its
/// conversion or format spec
fn interpolations(body: &str) -> Option<Vec<&str>> {
    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => i += 2,
            b'{' => {
                let start = i + 1;
                let mut depth = 0usize;
                let mut expr_end = None;
                let mut j = start;
                let end = loop {
                    let b = *bytes.get(j)?;
                    match b {
                        b'\'' | b'"' => {
                            j += 1;
                            while *bytes.get(j)? != b {
                                j += 1;
                            }
                        }
                        b'(' | b'[' | b'{' => depth += 1,
                        b')' | b']' => depth = depth.saturating_sub(1),
                        b'}' if depth == 0 => break j,
                        b'}' => depth -= 1,
                        b'!' if depth == 0 && bytes.get(j + 1) != Some(&b'=') => {
                            expr_end.get_or_insert(j);
                        }
                        b':' if depth == 0 => {
                            expr_end.get_or_insert(j);
                        }
                        b'=' if depth == 0
                            && matches!(bytes.get(j + 1), Some(b'}' | b'!' | b':'))
                            && !matches!(bytes.get(j.wrapping_sub(1)), Some(b'=' | b'!' | b'<' | b'>')) =>
                        {
                            expr_end.get_or_insert(j);
                        }
                        _ => {}
                    }
                    j += 1;
                };
                fields.push(&body[start..expr_end.unwrap_or(end)]);
                i = end + 1;
            }
            _ => i += 1,
        }
    }

    Some(fields)
}
