//! Static reactive-binding analysis of property values
//!
//! A value is scanned in two passes. The masking pass produces a copy of the
//! text of equal byte length in which string literals and comments are blanked
//! out, except for the `{...}` interpolation spans of f-strings. The matcher
//! pass then walks the masked copy looking for attribute chains
//! `root(.segment)+` and reads the segment names from the original text at the
//! same offsets.
//!
//! When an [`ExpressionParser`] is configured its tree is preferred; the
//! matcher is the fallback whenever the parser declines a value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

pub const DEFAULT_BINDING_ROOTS: [&str; 3] = ["self", "root", "app"];

/// Single-argument calls analyzed as if the argument stood alone
const TRANSPARENT_CALLS: &[&str] = &["str", "_", "int", "float", "bool", "repr", "abs", "round"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    Eval,
    Exec,
}

/// Attribute path read by a value, e.g. `["app", "title"]`
pub type WatchedKey = Vec<String>;

/// Informational note produced while compiling a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileWarning {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledValue {
    pub mode: EvalMode,
    /// Ordered by first occurrence, without duplicates
    pub watched_keys: Vec<WatchedKey>,
    pub warnings: Vec<CompileWarning>,
}

impl CompiledValue {
    fn new(mode: EvalMode) -> Self {
        Self {
            mode,
            watched_keys: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when nothing in the value needs re-evaluation on change
    pub fn is_static(&self) -> bool {
        self.watched_keys.is_empty()
    }
}

/// Syntax tree of an embedded expression, as far as binding analysis needs
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionTree {
    Name(String),
    Literal,
    Attribute {
        value: Box<ExpressionTree>,
        attr: String,
    },
    Call {
        func: Box<ExpressionTree>,
        args: Vec<ExpressionTree>,
    },
    Subscript {
        value: Box<ExpressionTree>,
        index: Box<ExpressionTree>,
    },
    Conditional {
        body: Box<ExpressionTree>,
        test: Box<ExpressionTree>,
        orelse: Box<ExpressionTree>,
    },
    Binary {
        left: Box<ExpressionTree>,
        right: Box<ExpressionTree>,
    },
    Unary(Box<ExpressionTree>),
    /// Tuple, list, set, dict or comprehension members in source order
    Sequence(Vec<ExpressionTree>),
    Lambda {
        params: Vec<String>,
        body: Box<ExpressionTree>,
    },
    /// Interpolated parts of an f-string
    Interpolated(Vec<ExpressionTree>),
}

impl ExpressionTree {
    /// `a.b.c` as `["a", "b", "c"]` when the tree is a pure name chain
    pub fn attribute_chain(&self) -> Option<Vec<String>> {
        match self {
            ExpressionTree::Name(name) => Some(vec![name.clone()]),
            ExpressionTree::Attribute { value, attr } => {
                let mut chain = value.attribute_chain()?;
                chain.push(attr.clone());
                Some(chain)
            }
            _ => None,
        }
    }
}

/// Optional collaborator that parses embedded expressions
pub trait ExpressionParser: Send + Sync {
    /// `None` when the text is outside what the parser understands
    fn parse_expression(&self, text: &str) -> Option<ExpressionTree>;
}

/// Computes evaluation mode and watched keys for property values
#[derive(Clone)]
pub struct PropertyCompiler {
    roots: Vec<String>,
    expression_parser: Option<Arc<dyn ExpressionParser>>,
}

impl fmt::Debug for PropertyCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCompiler")
            .field("roots", &self.roots)
            .field("expression_parser", &self.expression_parser.is_some())
            .finish()
    }
}

impl Default for PropertyCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyCompiler {
    /// Compiler rooted at `self`, `root` and `app`
    pub fn new() -> Self {
        Self::with_roots(DEFAULT_BINDING_ROOTS)
    }

    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut compiler = Self {
            roots: Vec::new(),
            expression_parser: None,
        };
        compiler.extend_roots(roots);
        compiler
    }

    pub fn with_expression_parser(mut self, parser: impl ExpressionParser + 'static) -> Self {
        self.expression_parser = Some(Arc::new(parser));
        self
    }

    /// A copy that also treats the given widget ids as binding sources
    pub fn with_ids<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut compiler = self.clone();
        compiler.extend_roots(ids);
        compiler
    }

    fn extend_roots<I, S>(&mut self, roots: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for root in roots {
            let root = root.into();
            if !self.roots.contains(&root) {
                self.roots.push(root);
            }
        }
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    fn is_root(&self, name: &str) -> bool {
        self.roots.iter().any(|root| root == name)
    }

    /// Compile one property value. Never fails: anything that cannot be
    /// scanned is reported as static with a warning.
    pub fn compile(&self, name: &str, value: &str) -> CompiledValue {
        if name.starts_with("on_") {
            return CompiledValue::new(EvalMode::Exec);
        }

        let mut compiled = CompiledValue::new(EvalMode::Eval);

        let masked = match mask_literals(value) {
            Ok(masked) => masked,
            Err(offset) => {
                trace!(property = name, offset, "value could not be scanned");
                compiled.warnings.push(CompileWarning {
                    message: format!(
                        "could not scan the value of '{}' past offset {}; treated as static",
                        name, offset
                    ),
                });
                return compiled;
            }
        };

        let from_tree = self.expression_parser.as_ref().and_then(|parser| {
            let tree = parser.parse_expression(value)?;
            let mut keys = Vec::new();
            self.collect_tree(&tree, &mut keys);
            Some(keys)
        });
        let keys = match from_tree {
            Some(keys) => keys,
            None => self.scan_chains(value, &masked),
        };

        for key in keys {
            if !compiled.watched_keys.contains(&key) {
                compiled.watched_keys.push(key);
            }
        }

        if compiled.watched_keys.is_empty() {
            if let Some(chain) = scan_raw_chains(value, &masked)
                .into_iter()
                .find(|chain| chain.len() >= 2 && !self.is_root(&chain[0]))
            {
                compiled.warnings.push(CompileWarning {
                    message: format!(
                        "'{}' reads '{}' but '{}' is not a binding source; treated as static",
                        name,
                        chain.join("."),
                        chain[0]
                    ),
                });
            }
        }

        compiled
    }

    fn collect_tree(&self, tree: &ExpressionTree, out: &mut Vec<WatchedKey>) {
        match tree {
            ExpressionTree::Name(_) | ExpressionTree::Literal => {}
            ExpressionTree::Attribute { value, .. } => match tree.attribute_chain() {
                Some(chain) if self.is_root(&chain[0]) => out.push(chain),
                Some(_) => {}
                None => self.collect_tree(value, out),
            },
            ExpressionTree::Call { func, args } => {
                if let (ExpressionTree::Name(name), [arg]) = (func.as_ref(), args.as_slice()) {
                    if TRANSPARENT_CALLS.contains(&name.as_str()) {
                        self.collect_tree(arg, out);
                        return;
                    }
                }
                // The final segment of a called chain is a method, not a property
                match func.as_ref() {
                    ExpressionTree::Attribute { value, .. } => self.collect_tree(value, out),
                    other => self.collect_tree(other, out),
                }
                for arg in args {
                    self.collect_tree(arg, out);
                }
            }
            ExpressionTree::Subscript { value, index } => {
                self.collect_tree(value, out);
                self.collect_tree(index, out);
            }
            ExpressionTree::Conditional { body, test, orelse } => {
                self.collect_tree(body, out);
                self.collect_tree(test, out);
                self.collect_tree(orelse, out);
            }
            ExpressionTree::Binary { left, right } => {
                self.collect_tree(left, out);
                self.collect_tree(right, out);
            }
            ExpressionTree::Unary(operand) => self.collect_tree(operand, out),
            ExpressionTree::Sequence(items) | ExpressionTree::Interpolated(items) => {
                for item in items {
                    self.collect_tree(item, out);
                }
            }
            ExpressionTree::Lambda { body, .. } => self.collect_tree(body, out),
        }
    }

    fn scan_chains(&self, original: &str, masked: &str) -> Vec<WatchedKey> {
        scan_raw_chains(original, masked)
            .into_iter()
            .filter(|chain| chain.len() >= 2 && self.is_root(&chain[0]))
            .collect()
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Every free-standing attribute chain in the masked text, with a trailing
/// method-call segment removed
fn scan_raw_chains(original: &str, masked: &str) -> Vec<Vec<String>> {
    let bytes = masked.as_bytes();
    let mut chains = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b.is_ascii_digit() {
            while i < bytes.len() && (is_ident_continue(bytes[i]) || bytes[i] == b'.') {
                i += 1;
            }
            continue;
        }

        if !is_ident_start(b) {
            i += 1;
            continue;
        }

        let attribute_of_something = i > 0 && bytes[i - 1] == b'.';
        let mut segments = Vec::new();
        let mut start = i;
        loop {
            let mut end = start;
            while end < bytes.len() && is_ident_continue(bytes[end]) {
                end += 1;
            }
            segments.push(original[start..end].to_string());
            i = end;
            if end + 1 < bytes.len() && bytes[end] == b'.' && is_ident_start(bytes[end + 1]) {
                start = end + 1;
            } else {
                break;
            }
        }

        if attribute_of_something {
            continue;
        }

        let next = bytes[i..].iter().find(|b| !b.is_ascii_whitespace());
        if next == Some(&b'(') {
            segments.pop();
        }
        if !segments.is_empty() {
            chains.push(segments);
        }
    }

    chains
}

/// Blank out string literals and comments, keeping byte offsets. Interpolated
/// `{...}` spans inside f-strings stay visible. Returns the offset of an
/// unterminated literal on failure.
pub fn mask_literals(text: &str) -> Result<String, usize> {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'#' {
            out[i..].fill(b' ');
            break;
        }

        if b != b'"' && b != b'\'' {
            i += 1;
            continue;
        }

        let mut prefix_start = i;
        while prefix_start > 0 && bytes[prefix_start - 1].is_ascii_alphabetic() {
            prefix_start -= 1;
        }
        let prefix = &text[prefix_start..i];
        let valid_prefix = prefix.len() <= 2
            && prefix.chars().all(|c| "rRbBuUfF".contains(c))
            && (prefix_start == 0 || !is_ident_continue(bytes[prefix_start - 1]));
        if !valid_prefix {
            prefix_start = i;
        }
        let interpolated = valid_prefix && prefix.contains(['f', 'F']);

        let quote_len = if bytes[i..].starts_with(&[b, b, b]) { 3 } else { 1 };
        out[prefix_start..i + quote_len].fill(b' ');

        let mut j = i + quote_len;
        let mut depth = 0usize;
        let mut closed = false;

        while j < bytes.len() {
            let c = bytes[j];
            if depth > 0 {
                match c {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            out[j] = b' ';
                        }
                    }
                    b'"' | b'\'' if c != b => {
                        // Nested literal inside an interpolation
                        let nested = j;
                        j += 1;
                        while j < bytes.len() && bytes[j] != c {
                            j += 1;
                        }
                        if j >= bytes.len() {
                            return Err(nested);
                        }
                        out[nested..=j].fill(b' ');
                    }
                    _ if c == b => break,
                    _ => {}
                }
                j += 1;
                continue;
            }

            if c == b'\\' {
                let end = (j + 2).min(bytes.len());
                out[j..end].fill(b' ');
                j = end;
                continue;
            }
            if bytes[j..].starts_with(&[b; 3][..quote_len]) {
                out[j..j + quote_len].fill(b' ');
                j += quote_len;
                closed = true;
                break;
            }
            if interpolated && c == b'{' {
                if bytes.get(j + 1) == Some(&b'{') {
                    out[j..j + 2].fill(b' ');
                    j += 2;
                } else {
                    out[j] = b' ';
                    depth = 1;
                    j += 1;
                }
                continue;
            }
            out[j] = b' ';
            j += 1;
        }

        if !closed {
            return Err(i);
        }
        i = j;
    }

    String::from_utf8(out).map_err(|_| 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(value: &str) -> Vec<Vec<String>> {
        PropertyCompiler::new().compile("text", value).watched_keys
    }

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_app_binding() {
        let compiled = PropertyCompiler::new().compile("text", "app.title");
        assert_eq!(compiled.mode, EvalMode::Eval);
        assert_eq!(compiled.watched_keys, vec![key(&["app", "title"])]);
        assert!(compiled.warnings.is_empty());
    }

    #[test]
    fn test_order_is_first_seen() {
        assert_eq!(
            keys("self.center_x - 20, self.center_y - 20"),
            vec![key(&["self", "center_x"]), key(&["self", "center_y"])]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        assert_eq!(
            keys("self.width * 0.5 + self.width / root.scale"),
            vec![key(&["self", "width"]), key(&["root", "scale"])]
        );
    }

    #[test]
    fn test_string_contents_are_ignored() {
        assert_eq!(
            keys("'self.text is ' + str(self.value)"),
            vec![key(&["self", "value"])]
        );
        assert!(keys(r#""app.title""#).is_empty());
    }

    #[test]
    fn test_fstring_interpolation_is_visible() {
        assert_eq!(
            keys("f'{app.title}: {self.text!r}'"),
            vec![key(&["app", "title"]), key(&["self", "text"])]
        );
        assert!(keys("f'{{self.escaped}}'").is_empty());
        assert_eq!(
            keys(r#"f"{root.names['first']}""#),
            vec![key(&["root", "names"])]
        );
    }

    #[test]
    fn test_method_calls_are_not_watched() {
        assert!(keys("root.get_label()").is_empty());
        assert_eq!(
            keys("self.parent.child_at(0).height"),
            vec![key(&["self", "parent"])]
        );
        assert_eq!(
            keys("root.manager.current_screen.name"),
            vec![key(&["root", "manager", "current_screen", "name"])]
        );
    }

    #[test]
    fn test_subscript_and_numbers() {
        assert_eq!(
            keys("self.texture_size[1] + 1.5"),
            vec![key(&["self", "texture_size"])]
        );
    }

    #[test]
    fn test_conditional_slots_are_all_scanned() {
        assert_eq!(
            keys("'on' if self.active else app.fallback_text"),
            vec![key(&["self", "active"]), key(&["app", "fallback_text"])]
        );
    }

    #[test]
    fn test_comment_is_masked() {
        assert_eq!(keys("self.x  # self.y"), vec![key(&["self", "x"])]);
    }

    #[test]
    fn test_widget_ids_extend_roots() {
        let compiler = PropertyCompiler::new();
        let without = compiler.compile("text", "name_input.text");
        assert!(without.is_static());
        assert_eq!(without.warnings.len(), 1);

        let scoped = compiler.with_ids(vec!["name_input".to_string()]);
        assert_eq!(
            scoped.compile("text", "name_input.text").watched_keys,
            vec![key(&["name_input", "text"])]
        );
    }

    #[test]
    fn test_handlers_are_exec_and_unwatched() {
        let compiled = PropertyCompiler::new().compile("on_press", "self.do_it(app.value)");
        assert_eq!(compiled.mode, EvalMode::Exec);
        assert!(compiled.watched_keys.is_empty());
    }

    #[test]
    fn test_lexical_failure_degrades_to_static() {
        let compiled = PropertyCompiler::new().compile("text", "'unterminated + self.x");
        assert_eq!(compiled.mode, EvalMode::Eval);
        assert!(compiled.is_static());
        assert_eq!(compiled.warnings.len(), 1);
    }

    #[test]
    fn test_attribute_of_expression_is_not_rooted() {
        assert!(keys("other.self.value").is_empty());
    }

    #[test]
    fn test_mask_preserves_length() {
        let text = "f'{self.x}' + \"é\" # tail";
        let masked = mask_literals(text).unwrap();
        assert_eq!(masked.len(), text.len());
        assert!(masked.contains("self.x"));
        assert!(!masked.contains("tail"));
    }

    struct Declining;

    impl ExpressionParser for Declining {
        fn parse_expression(&self, _text: &str) -> Option<ExpressionTree> {
            None
        }
    }

    #[test]
    fn test_declining_parser_falls_back_to_scanner() {
        let compiler = PropertyCompiler::new().with_expression_parser(Declining);
        assert_eq!(
            compiler.compile("text", "app.title").watched_keys,
            vec![key(&["app", "title"])]
        );
    }
}
