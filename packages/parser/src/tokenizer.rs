//! Indentation-aware tokenizer for .kv sources
//!
//! Lines are scanned one at a time. Leading whitespace is measured against a
//! stack of open block widths to produce `Indent`/`Dedent` markers, then the
//! rest of the line is lexed with logos. A line whose prefix is a plain head
//! (`name`, `canvas.before`, `<Foo@Bar>`, ...) followed by `:` yields head
//! tokens, a `Colon`, and the trailing text as a single `Value`. Anything else
//! is kept whole as `Text`. Blank lines and `#` comment lines produce no
//! tokens at all; `#:` pragma lines produce a single `Directive` token and
//! never touch the indentation stack.

use crate::ast::Position;
use crate::error::TokenizeError;
use logos::Logos;
use std::fmt;
use std::ops::Range;
use tracing::trace;

pub const DEFAULT_TAB_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Indent,
    Dedent,
    Newline,
    Ident(String),
    Number(String),
    LAngle,
    RAngle,
    LBracket,
    RBracket,
    Minus,
    Plus,
    At,
    Comma,
    Dot,
    Colon,
    /// Text after the colon of a `head: value` line, trimmed
    Value(String),
    /// A line with no `head:` structure
    Text(String),
    /// Body of a `#:` pragma line
    Directive(String),
    /// Scanner failure kept in the stream by the tolerant tokenizer
    Error(TokenizeError),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Indent => write!(f, "indentation"),
            TokenKind::Dedent => write!(f, "end of block"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::LAngle => write!(f, "'<'"),
            TokenKind::RAngle => write!(f, "'>'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::At => write!(f, "'@'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Value(v) => write!(f, "value '{}'", v),
            TokenKind::Text(t) => write!(f, "statement '{}'", t),
            TokenKind::Directive(d) => write!(f, "directive '#:{}'", d),
            TokenKind::Error(err) => write!(f, "{}", err.message()),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    pub span: Range<usize>,
}

impl Token {
    fn new(kind: TokenKind, position: Position, span: Range<usize>) -> Self {
        Self {
            kind,
            position,
            span,
        }
    }
}

/// Lexemes inside a single line
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t]+")]
enum Lexeme {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\]|\\.)*""#)]
    #[regex(r#"[rRbBuUfF]{0,2}'([^'\\]|\\.)*'"#)]
    Str,

    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\]|\\.)*"#)]
    #[regex(r#"[rRbBuUfF]{0,2}'([^'\\]|\\.)*"#)]
    UnterminatedStr,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("-")]
    Minus,

    #[token("+")]
    Plus,

    #[token("@")]
    At,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    #[token("#")]
    Hash,
}

/// Token kind for a lexeme that may appear in a line head
fn head_kind(lexeme: Lexeme, slice: &str) -> Option<TokenKind> {
    match lexeme {
        Lexeme::Ident => Some(TokenKind::Ident(slice.to_string())),
        Lexeme::Number => Some(TokenKind::Number(slice.to_string())),
        Lexeme::LAngle => Some(TokenKind::LAngle),
        Lexeme::RAngle => Some(TokenKind::RAngle),
        Lexeme::LBracket => Some(TokenKind::LBracket),
        Lexeme::RBracket => Some(TokenKind::RBracket),
        Lexeme::Minus => Some(TokenKind::Minus),
        Lexeme::Plus => Some(TokenKind::Plus),
        Lexeme::At => Some(TokenKind::At),
        Lexeme::Comma => Some(TokenKind::Comma),
        Lexeme::Dot => Some(TokenKind::Dot),
        Lexeme::Colon => Some(TokenKind::Colon),
        Lexeme::Str | Lexeme::UnterminatedStr | Lexeme::Hash => None,
    }
}

/// Indentation of `line` in columns, tabs advancing to the next multiple of
/// `tab_size`, and the bytes it takes
pub(crate) fn indent_width(line: &str, tab_size: usize) -> (usize, usize) {
    let tab_size = tab_size.max(1);
    let mut width = 0;
    let mut bytes = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / tab_size + 1) * tab_size,
            _ => break,
        }
        bytes += 1;
    }
    (width, bytes)
}

/// Column of `byte` within `content`, given the column of its first char
fn column_at(content: &str, base_column: usize, byte: usize) -> usize {
    base_column + content[..byte].chars().count()
}

struct Tokenizer<'src> {
    source: &'src str,
    tab_size: usize,
    tolerant: bool,
    indents: Vec<usize>,
    tokens: Vec<Token>,
    errors: Vec<TokenizeError>,
    /// Skipping lines until the next unindented one after an indentation failure
    resync: bool,
}

impl<'src> Tokenizer<'src> {
    fn new(source: &'src str, tab_size: usize, tolerant: bool) -> Self {
        Self {
            source,
            tab_size: tab_size.max(1),
            tolerant,
            indents: vec![0],
            tokens: Vec::new(),
            errors: Vec::new(),
            resync: false,
        }
    }

    fn run(mut self) -> Result<(Vec<Token>, Vec<TokenizeError>), TokenizeError> {
        let source = self.source;
        let mut offset = if source.starts_with('\u{feff}') { 3 } else { 0 };
        let mut last_line = 1;

        for (index, raw_line) in source[offset..].split('\n').enumerate() {
            let line_no = index + 1;
            let line_start = offset;
            offset += raw_line.len() + 1;
            last_line = line_no;

            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if let Err(err) = self.process_line(line, line_no, line_start) {
                if !self.tolerant {
                    return Err(err);
                }
                self.recover(err, line_no, line_start);
            }
        }

        let end = source.len();
        let eof = Position::new(last_line, 1);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, eof, end..end));
        }
        self.tokens.push(Token::new(TokenKind::Eof, eof, end..end));

        trace!(tokens = self.tokens.len(), errors = self.errors.len(), "tokenized");
        Ok((self.tokens, self.errors))
    }

    fn process_line(&mut self, line: &str, line_no: usize, line_start: usize) -> Result<(), TokenizeError> {
        let (width, indent_bytes) = indent_width(line, self.tab_size);

        let content = line[indent_bytes..].trim_end();
        if content.is_empty() {
            return Ok(());
        }

        let column = indent_bytes + 1;
        let offset = line_start + indent_bytes;
        let position = Position::new(line_no, column);

        if let Some(pragma) = content.strip_prefix("#:") {
            self.tokens.push(Token::new(
                TokenKind::Directive(pragma.trim().to_string()),
                position,
                offset..offset + content.len(),
            ));
            return Ok(());
        }
        if content.starts_with('#') {
            return Ok(());
        }

        if self.resync {
            if width > 0 {
                return Ok(());
            }
            self.resync = false;
        }

        // Blocks open and close before any error on the line is reported, so
        // an error token lands inside the construct it belongs to
        self.apply_indentation(width, position, offset)?;

        if let Some((byte, ch)) = content
            .char_indices()
            .find(|(_, ch)| ch.is_control() && *ch != '\t')
        {
            return Err(TokenizeError::IllegalCharacter {
                ch,
                position: Position::new(line_no, column_at(content, column, byte)),
                span: offset + byte..offset + byte + ch.len_utf8(),
            });
        }

        self.scan_line(content, line_no, column, offset)
    }

    fn apply_indentation(&mut self, width: usize, position: Position, offset: usize) -> Result<(), TokenizeError> {
        let top = self.current_width();
        if width > top {
            trace!(line = position.line, width, "indent");
            self.indents.push(width);
            self.tokens.push(Token::new(TokenKind::Indent, position, offset..offset));
        } else if width < top {
            if !self.indents.contains(&width) {
                return Err(TokenizeError::InconsistentIndentation {
                    position,
                    width,
                    span: offset.saturating_sub(position.column - 1)..offset,
                });
            }
            while self.current_width() > width {
                self.indents.pop();
                self.tokens.push(Token::new(TokenKind::Dedent, position, offset..offset));
            }
            trace!(line = position.line, width, "dedent");
        }
        Ok(())
    }

    fn current_width(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    fn scan_line(&mut self, content: &str, line_no: usize, column: usize, offset: usize) -> Result<(), TokenizeError> {
        let mut lexer = Lexeme::lexer(content);
        let mut head = Vec::new();
        let mut head_valid = true;
        let mut colon: Option<Range<usize>> = None;

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(Lexeme::UnterminatedStr) => {
                    return Err(TokenizeError::UnterminatedString {
                        position: Position::new(line_no, column_at(content, column, span.start)),
                        span: offset + span.start..offset + content.len(),
                    });
                }
                // The rest of the line is a comment
                Ok(Lexeme::Hash) => break,
                Ok(lexeme) if colon.is_none() && head_valid => match head_kind(lexeme, lexer.slice()) {
                    Some(TokenKind::Colon) => colon = Some(span),
                    Some(kind) => head.push(Token::new(
                        kind,
                        Position::new(line_no, column_at(content, column, span.start)),
                        offset + span.start..offset + span.end,
                    )),
                    None => head_valid = false,
                },
                Ok(_) => {}
                Err(()) => {
                    if colon.is_none() {
                        head_valid = false;
                    }
                }
            }
        }

        let line_position = Position::new(line_no, column);
        let line_end = offset + content.len();

        match colon {
            Some(colon_span) if head_valid => {
                self.tokens.append(&mut head);
                self.tokens.push(Token::new(
                    TokenKind::Colon,
                    Position::new(line_no, column_at(content, column, colon_span.start)),
                    offset + colon_span.start..offset + colon_span.end,
                ));

                let rest = &content[colon_span.end..];
                let value = rest.trim();
                if !value.is_empty() && !value.starts_with('#') {
                    let value_start = colon_span.end + (rest.len() - rest.trim_start().len());
                    self.tokens.push(Token::new(
                        TokenKind::Value(value.to_string()),
                        Position::new(line_no, column_at(content, column, value_start)),
                        offset + value_start..line_end,
                    ));
                }
            }
            None if head_valid && !head.is_empty() => {
                self.tokens.append(&mut head);
            }
            _ => {
                self.tokens.push(Token::new(
                    TokenKind::Text(content.to_string()),
                    line_position,
                    offset..line_end,
                ));
            }
        }

        self.tokens.push(Token::new(
            TokenKind::Newline,
            Position::new(line_no, column_at(content, column, content.len())),
            line_end..line_end,
        ));
        Ok(())
    }

    fn recover(&mut self, err: TokenizeError, line_no: usize, line_start: usize) {
        let position = err.position();
        let span = err.span();

        trace!(line = line_no, error = %err, "recovering from scanner failure");
        self.tokens
            .push(Token::new(TokenKind::Error(err.clone()), position, span.clone()));
        self.tokens
            .push(Token::new(TokenKind::Newline, position, span.end..span.end));

        // The error token stays inside the block it broke, then every block closes
        if let TokenizeError::InconsistentIndentation { .. } = err {
            while self.indents.len() > 1 {
                self.indents.pop();
                self.tokens
                    .push(Token::new(TokenKind::Dedent, position, line_start..line_start));
            }
            self.resync = true;
        }
        self.errors.push(err);
    }
}

/// Tokenize a source string, failing on the first scanner error
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    tokenize_with_tab_size(source, DEFAULT_TAB_SIZE)
}

pub fn tokenize_with_tab_size(source: &str, tab_size: usize) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(source, tab_size, false)
        .run()
        .map(|(tokens, _)| tokens)
}

/// Tokenize without stopping: each failing line becomes an `Error` token, and
/// after an indentation failure lines are skipped up to the next unindented one
pub fn tokenize_tolerant(source: &str, tab_size: usize) -> (Vec<Token>, Vec<TokenizeError>) {
    match Tokenizer::new(source, tab_size, true).run() {
        Ok(result) => result,
        // Tolerant runs record errors instead of returning them
        Err(err) => (Vec::new(), vec![err]),
    }
}

/// Decode the contents of a quoted literal such as `"a\tb"`
pub fn unescape(literal: &str) -> String {
    let trimmed = literal.trim();
    let inner = match trimmed.chars().next() {
        Some(quote @ ('"' | '\'')) if trimmed.len() >= 2 && trimmed.ends_with(quote) => {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => return trimmed.to_string(),
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
