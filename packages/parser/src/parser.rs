use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{indent_width, tokenize_with_tab_size, unescape, Token, TokenKind, DEFAULT_TAB_SIZE};
use std::ops::Range;
use tracing::{debug, warn};

/// Names a widget id may not take
const RESERVED_IDS: [&str; 2] = ["self", "root"];

/// What the body being parsed belongs to; `id:` is only special on widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Rule,
    Widget,
}

/// Parser for .kv token streams
pub struct Parser<'src> {
    lines: Vec<&'src str>,
    tokens: Vec<Token>,
    pos: usize,
    /// `#:` lines, pulled out of the stream and applied in line order
    pragmas: Vec<Token>,
    next_pragma: usize,
    /// Byte ranges thrown away by tolerant recovery
    skipped: Vec<Range<usize>>,
    tab_size: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let lines: Vec<&str> = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let (pragmas, mut tokens): (Vec<Token>, Vec<Token>) = tokens
            .into_iter()
            .partition(|token| matches!(token.kind, TokenKind::Directive(_)));

        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let end = source.len();
            tokens.push(Token {
                kind: TokenKind::Eof,
                position: Position::new(lines.len(), 1),
                span: end..end,
            });
        }

        Self {
            lines,
            tokens,
            pos: 0,
            pragmas,
            next_pragma: 0,
            skipped: Vec::new(),
            tab_size: DEFAULT_TAB_SIZE,
        }
    }

    /// Tab width the tokens were scanned with, used to dedent multi-line values
    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    /// Parse a complete module, stopping at the first error
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut module = Module::new();

        while !self.at_eof() {
            let line = self.peek().position.line;
            for pragma in self.take_pragmas(Some(line)) {
                if let Some(directive) = parse_directive(&pragma)? {
                    module.directives.push(directive);
                }
            }
            self.parse_top_level(&mut module)?;
        }
        for pragma in self.take_pragmas(None) {
            if let Some(directive) = parse_directive(&pragma)? {
                module.directives.push(directive);
            }
        }

        debug!(
            rules = module.rules.len(),
            templates = module.templates.len(),
            directives = module.directives.len(),
            "parsed module"
        );
        Ok(module)
    }

    /// Parse a complete module, skipping each failing top-level construct
    /// and returning every error met along the way
    pub fn parse_module_tolerant(&mut self) -> (Module, Vec<ParseError>) {
        let mut module = Module::new();
        let mut errors = Vec::new();

        while !self.at_eof() {
            let line = self.peek().position.line;
            self.collect_pragmas(Some(line), &mut module, &mut errors);

            let start = self.pos;
            if let Err(err) = self.parse_top_level(&mut module) {
                debug!(error = %err, "skipping to the next top-level construct");
                errors.push(err);
                self.synchronize(start);
            }
        }
        self.collect_pragmas(None, &mut module, &mut errors);

        debug!(
            rules = module.rules.len(),
            errors = errors.len(),
            "parsed module tolerantly"
        );
        (module, errors)
    }

    /// Source spans discarded by `parse_module_tolerant`, one per recorded error
    pub fn skipped_spans(&self) -> &[Range<usize>] {
        &self.skipped
    }

    fn collect_pragmas(&mut self, before_line: Option<usize>, module: &mut Module, errors: &mut Vec<ParseError>) {
        for pragma in self.take_pragmas(before_line) {
            match parse_directive(&pragma) {
                Ok(Some(directive)) => module.directives.push(directive),
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }
    }

    fn take_pragmas(&mut self, before_line: Option<usize>) -> Vec<Token> {
        let start = self.next_pragma;
        while let Some(pragma) = self.pragmas.get(self.next_pragma) {
            if before_line.map_or(false, |line| pragma.position.line >= line) {
                break;
            }
            self.next_pragma += 1;
        }
        self.pragmas[start..self.next_pragma].to_vec()
    }

    fn parse_top_level(&mut self, module: &mut Module) -> ParseResult<()> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::LAngle => {
                let (rule, dynamic_class) = self.parse_rule(module)?;
                if let Some(class) = dynamic_class {
                    module.dynamic_classes.insert(class.name.clone(), class);
                }
                module.rules.push(rule);
            }
            TokenKind::LBracket => {
                let template = self.parse_template()?;
                module.templates.push(template);
            }
            TokenKind::Ident(_) => {
                if let Some(root) = &module.root {
                    return Err(ParseError::invalid_syntax(
                        token.position,
                        token.span.clone(),
                        format!(
                            "only one root widget is allowed, '{}' was declared at {}",
                            root.type_name, root.position
                        ),
                    ));
                }
                let (name, head) = self.parse_head("widget class name")?;
                module.root = Some(self.parse_widget(name, head)?);
            }
            TokenKind::Newline | TokenKind::Dedent => {
                self.advance();
            }
            _ => return Err(self.unexpected("a rule, template or root widget")),
        }
        Ok(())
    }

    /// Parse a rule: `<Selector>:` followed by an optional body
    fn parse_rule(&mut self, module: &Module) -> ParseResult<(Rule, Option<DynamicClass>)> {
        let start = self.expect(TokenKind::LAngle)?;
        let line = start.position.line;
        let (selector, avoid_previous) = self.parse_selector()?;
        let end = self.expect(TokenKind::RAngle)?;

        let dynamic_class = match &selector {
            Selector::DynamicClass { name, bases } => {
                if let Some(existing) = module.dynamic_classes.get(name) {
                    return Err(ParseError::DuplicateDynamicClass {
                        position: start.position,
                        name: name.clone(),
                        first_line: existing.line,
                        span: start.span.start..end.span.end,
                    });
                }
                Some(DynamicClass {
                    name: name.clone(),
                    bases: bases.clone(),
                    line,
                })
            }
            _ => None,
        };

        self.expect_header_colon(&selector.to_string())?;
        let (body, _) = self.parse_block(Scope::Rule)?;

        Ok((
            Rule {
                selector,
                avoid_previous,
                body,
                line,
            },
            dynamic_class,
        ))
    }

    fn parse_selector(&mut self) -> ParseResult<(Selector, bool)> {
        if self.match_token(TokenKind::Dot) {
            let name = self.expect_ident("class name")?;
            return Ok((Selector::Class { name }, false));
        }

        let avoid_previous = self.match_token(TokenKind::Minus);
        let name = self.expect_ident("widget class name")?;

        if self.match_token(TokenKind::At) {
            let bases = self.parse_bases()?;
            return Ok((Selector::DynamicClass { name, bases }, avoid_previous));
        }

        if self.check(&TokenKind::Comma) {
            let mut names = vec![name];
            while self.match_token(TokenKind::Comma) {
                names.push(self.expect_ident("widget class name")?);
            }
            return Ok((Selector::Multiple { names }, avoid_previous));
        }

        let selector = if avoid_previous {
            Selector::Avoidance { name }
        } else {
            Selector::Name { name }
        };
        Ok((selector, avoid_previous))
    }

    /// Base classes after `@`, separated by `,` or `+`
    fn parse_bases(&mut self) -> ParseResult<Vec<String>> {
        let mut bases = vec![self.expect_ident("base class name")?];
        while self.match_token(TokenKind::Comma) || self.match_token(TokenKind::Plus) {
            bases.push(self.expect_ident("base class name")?);
        }
        Ok(bases)
    }

    fn parse_template(&mut self) -> ParseResult<Template> {
        let start = self.expect(TokenKind::LBracket)?;
        let name = self.expect_ident("template name")?;

        if !self.match_token(TokenKind::At) {
            let token = self.peek();
            return Err(ParseError::invalid_syntax(
                token.position,
                token.span.clone(),
                format!("template '{}' must name its base classes after '@'", name),
            ));
        }
        let bases = self.parse_bases()?;
        self.expect(TokenKind::RBracket)?;
        self.expect_header_colon(&format!("[{}@{}]", name, bases.join(",")))?;

        warn!(
            template = %name,
            line = start.position.line,
            "template blocks are deprecated, use a dynamic class rule instead"
        );

        let (body, _) = self.parse_block(Scope::Rule)?;
        Ok(Template {
            name,
            bases,
            body,
            line: start.position.line,
        })
    }

    /// Parse a widget whose head name was already consumed
    fn parse_widget(&mut self, type_name: String, head: Token) -> ParseResult<Widget> {
        if type_name.contains('.') || !starts_uppercase(&type_name) {
            return Err(ParseError::invalid_syntax(
                head.position,
                head.span,
                format!("'{}' is not a widget class name", type_name),
            ));
        }
        self.expect_header_colon(&type_name)?;
        let (body, id) = self.parse_block(Scope::Widget)?;
        Ok(Widget {
            type_name,
            id,
            body,
            position: head.position,
        })
    }

    /// Parse an optional indented block of body lines
    fn parse_block(&mut self, scope: Scope) -> ParseResult<(Body, Option<String>)> {
        let mut body = Body::default();
        let mut id = None;

        if !self.match_token(TokenKind::Indent) {
            return Ok((body, id));
        }
        while !self.check(&TokenKind::Dedent) && !self.at_eof() {
            self.parse_body_line(scope, &mut body, &mut id)?;
        }
        self.expect(TokenKind::Dedent)?;

        Ok((body, id))
    }

    fn parse_body_line(&mut self, scope: Scope, body: &mut Body, id: &mut Option<String>) -> ParseResult<()> {
        if !matches!(self.peek().kind, TokenKind::Ident(_)) {
            return Err(self.unexpected("a property, handler, canvas block or child widget"));
        }
        let (name, head) = self.parse_head("property name")?;

        if starts_uppercase(&name) {
            if matches!(self.peek_ahead(1).kind, TokenKind::Value(_)) {
                return Err(ParseError::invalid_syntax(
                    head.position,
                    head.span,
                    format!("widget '{}' cannot take an inline value", name),
                ));
            }
            let child = self.parse_widget(name, head)?;
            body.children.push(child);
            return Ok(());
        }

        self.expect_colon_after(&name)?;

        if let Some(value) = self.take_inline_value()? {
            let property = Property::new(name, value, head.position);
            return add_property(scope, body, id, property, &head);
        }

        if let Some(layer) = CanvasLayer::from_name(&name) {
            let canvas = self.parse_canvas(layer, head.position)?;
            body.canvas.push(canvas);
            return Ok(());
        }

        if self.check(&TokenKind::Indent) {
            let value = self.parse_raw_block()?;
            let property = Property::new(name, value, head.position);
            return add_property(scope, body, id, property, &head);
        }

        Err(ParseError::invalid_syntax(
            head.position,
            head.span,
            format!("property '{}' has no value", name),
        ))
    }

    fn parse_canvas(&mut self, layer: CanvasLayer, position: Position) -> ParseResult<Canvas> {
        let mut instructions = Vec::new();

        if self.match_token(TokenKind::Indent) {
            while !self.check(&TokenKind::Dedent) && !self.at_eof() {
                instructions.push(self.parse_canvas_instruction()?);
            }
            self.expect(TokenKind::Dedent)?;
        }

        Ok(Canvas {
            layer,
            instructions,
            position,
        })
    }

    /// `TypeName` or `TypeName:` with an indented property block
    fn parse_canvas_instruction(&mut self) -> ParseResult<CanvasInstruction> {
        let head = self.peek().clone();
        let type_name = match &head.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(self.unexpected("a canvas instruction")),
        };
        self.advance();

        if !starts_uppercase(&type_name) {
            return Err(ParseError::invalid_syntax(
                head.position,
                head.span,
                format!(
                    "'{}' is not a canvas instruction, properties cannot be set on a canvas directly",
                    type_name
                ),
            ));
        }

        let mut properties = Vec::new();
        if self.match_token(TokenKind::Colon) {
            if let TokenKind::Value(_) = self.peek().kind {
                let token = self.peek();
                return Err(ParseError::invalid_syntax(
                    token.position,
                    token.span.clone(),
                    format!("canvas instruction '{}' cannot take an inline value", type_name),
                ));
            }
            self.expect_line_end()?;
            if self.match_token(TokenKind::Indent) {
                while !self.check(&TokenKind::Dedent) && !self.at_eof() {
                    properties.push(self.parse_instruction_property()?);
                }
                self.expect(TokenKind::Dedent)?;
            }
        } else {
            self.expect_line_end()?;
        }

        Ok(CanvasInstruction {
            type_name,
            properties,
            position: head.position,
        })
    }

    fn parse_instruction_property(&mut self) -> ParseResult<Property> {
        if !matches!(self.peek().kind, TokenKind::Ident(_)) {
            return Err(self.unexpected("a canvas instruction property"));
        }
        let (name, head) = self.parse_head("property name")?;
        if starts_uppercase(&name) {
            return Err(ParseError::invalid_syntax(
                head.position,
                head.span,
                format!("canvas instructions cannot contain '{}'", name),
            ));
        }
        self.expect_colon_after(&name)?;

        let value = match self.take_inline_value()? {
            Some(value) => value,
            None if self.check(&TokenKind::Indent) => self.parse_raw_block()?,
            None => {
                return Err(ParseError::invalid_syntax(
                    head.position,
                    head.span,
                    format!("property '{}' has no value", name),
                ))
            }
        };
        Ok(Property::new(name, value, head.position))
    }

    /// Consume a `Value` and its line end; no nested block may follow it
    fn take_inline_value(&mut self) -> ParseResult<Option<String>> {
        let value = match &self.peek().kind {
            TokenKind::Value(value) => value.clone(),
            _ => {
                self.expect_line_end()?;
                return Ok(None);
            }
        };
        self.advance();
        self.expect_line_end()?;

        if self.check(&TokenKind::Indent) {
            let token = self.peek();
            return Err(ParseError::invalid_syntax(
                token.position,
                token.span.clone(),
                "unexpected indentation after a value",
            ));
        }
        Ok(Some(value))
    }

    /// Capture an indented block verbatim as a multi-line value
    fn parse_raw_block(&mut self) -> ParseResult<String> {
        let indent = self.expect(TokenKind::Indent)?;
        let first = indent.position.line;
        let mut last = first;
        let mut depth = 1usize;

        while depth > 0 {
            let token = self.advance();
            match token.kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => depth -= 1,
                TokenKind::Error(err) => return Err(ParseError::Tokenize(err)),
                TokenKind::Eof => {
                    return Err(ParseError::unexpected_token(
                        token.position,
                        token.span,
                        "end of block",
                        "end of file",
                    ))
                }
                _ => last = last.max(token.position.line),
            }
        }

        Ok(self.block_text(first, last))
    }

    fn block_text(&self, first: usize, last: usize) -> String {
        let lines: Vec<&str> = self
            .lines
            .iter()
            .take(last)
            .skip(first.saturating_sub(1))
            .copied()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .collect();

        let indents: Vec<(usize, usize)> = lines
            .iter()
            .map(|line| indent_width(line, self.tab_size))
            .collect();
        let common = indents.iter().map(|(width, _)| *width).min().unwrap_or(0);

        lines
            .iter()
            .zip(&indents)
            .map(|(line, (width, bytes))| {
                format!("{}{}", " ".repeat(width - common), line[*bytes..].trim_end())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Skip tokens up to the next line that starts at indentation 0
    fn synchronize(&mut self, start: usize) {
        let mut depth: isize = 0;
        let mut at_line_start = false;
        let mut index = start;

        while let Some(token) = self.tokens.get(index) {
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => depth -= 1,
                TokenKind::Newline => at_line_start = true,
                _ => {
                    if index > start && at_line_start && depth <= 0 {
                        break;
                    }
                    at_line_start = false;
                }
            }
            index += 1;
        }

        self.pos = index.min(self.tokens.len() - 1);
        if let (Some(first), Some(stop)) = (self.tokens.get(start), self.tokens.get(self.pos)) {
            self.skipped.push(first.span.start..stop.span.start.max(first.span.end));
        }
    }

    // Helper methods

    /// A head name, possibly dotted (`canvas.before`)
    fn parse_head(&mut self, expected: &str) -> ParseResult<(String, Token)> {
        let head = self.peek().clone();
        let mut name = self.expect_ident(expected)?;
        while self.check(&TokenKind::Dot) && matches!(self.peek_ahead(1).kind, TokenKind::Ident(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident(expected)?);
        }
        Ok((name, head))
    }

    fn expect_colon_after(&mut self, after: &str) -> ParseResult<()> {
        if self.match_token(TokenKind::Colon) {
            return Ok(());
        }
        let token = self.peek();
        match token.kind {
            TokenKind::Newline | TokenKind::Eof => Err(ParseError::missing_colon(
                token.position,
                token.span.clone(),
                after,
            )),
            _ => Err(self.unexpected("':'")),
        }
    }

    /// `:` then the end of the line; a header never carries a value
    fn expect_header_colon(&mut self, header: &str) -> ParseResult<()> {
        self.expect_colon_after(header)?;
        if let TokenKind::Value(value) = &self.peek().kind {
            let token = self.peek();
            return Err(ParseError::invalid_syntax(
                token.position,
                token.span.clone(),
                format!("unexpected '{}' after '{}:'", value, header),
            ));
        }
        self.expect_line_end()
    }

    fn expect_line_end(&mut self) -> ParseResult<()> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.kind {
            TokenKind::Error(err) => ParseError::Tokenize(err.clone()),
            TokenKind::Indent => {
                ParseError::invalid_syntax(token.position, token.span.clone(), "unexpected indentation")
            }
            kind => ParseError::unexpected_token(token.position, token.span.clone(), expected, kind.to_string()),
        }
    }

    fn peek(&self) -> &Token {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map_or(false, char::is_uppercase)
}

fn add_property(
    scope: Scope,
    body: &mut Body,
    id: &mut Option<String>,
    property: Property,
    head: &Token,
) -> ParseResult<()> {
    if scope == Scope::Widget && property.name == "id" {
        let value = property.value.trim();
        if value.is_empty() || RESERVED_IDS.contains(&value) {
            return Err(ParseError::invalid_syntax(
                head.position,
                head.span.clone(),
                format!("'{}' cannot be used as an id", value),
            ));
        }
        if let Some(existing) = id {
            return Err(ParseError::invalid_syntax(
                head.position,
                head.span.clone(),
                format!("widget already has the id '{}'", existing),
            ));
        }
        *id = Some(value.to_string());
        return Ok(());
    }

    if property.is_handler() {
        body.handlers.push(property);
    } else {
        body.properties.push(property);
    }
    Ok(())
}

/// Interpret one `#:` pragma; unknown pragmas yield `None`
fn parse_directive(token: &Token) -> ParseResult<Option<Directive>> {
    let text = match &token.kind {
        TokenKind::Directive(text) => text.as_str(),
        _ => return Ok(None),
    };
    let position = token.position;
    let invalid = |message: &str| ParseError::invalid_syntax(position, token.span.clone(), message);

    let (command, rest) = match text.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (text, ""),
    };

    let directive = match command {
        "kivy" => {
            if rest.is_empty() {
                return Err(invalid("'#:kivy' requires a version"));
            }
            Directive::Version {
                version: rest.to_string(),
                position,
            }
        }
        "import" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            [alias, module] => Directive::Import {
                alias: alias.to_string(),
                module: module.to_string(),
                position,
            },
            _ => return Err(invalid("expected '#:import <alias> <module>'")),
        },
        "set" => match rest.split_once(char::is_whitespace) {
            Some((name, expr)) if !expr.trim().is_empty() => Directive::Set {
                name: name.to_string(),
                expr: expr.trim().to_string(),
                position,
            },
            _ => return Err(invalid("expected '#:set <name> <value>'")),
        },
        "include" => {
            let (force, path) = match rest.split_once(char::is_whitespace) {
                Some(("force", path)) => (true, path.trim()),
                _ => (false, rest),
            };
            if path.is_empty() {
                return Err(invalid("'#:include' requires a path"));
            }
            Directive::Include {
                path: unescape(path),
                force,
                position,
            }
        }
        other => {
            debug!(pragma = other, line = position.line, "ignoring unknown pragma");
            return Ok(None);
        }
    };
    Ok(Some(directive))
}

/// Parse a source string, failing on the first error
pub fn parse(source: &str) -> ParseResult<Module> {
    parse_with_tab_size(source, DEFAULT_TAB_SIZE)
}

pub fn parse_with_tab_size(source: &str, tab_size: usize) -> ParseResult<Module> {
    let tokens = tokenize_with_tab_size(source, tab_size)?;
    Parser::new(source, tokens).with_tab_size(tab_size).parse_module()
}
