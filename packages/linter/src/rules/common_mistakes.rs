use super::{BodyOwner, LintContext, LintRule};
use crate::diagnostic::Diagnostic;
use indexmap::IndexMap;
use kvlang_parser::ast::{Body, CanvasInstruction, Position, Property, Widget};
use kvlang_parser::binding::mask_literals;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME: &str = "common-mistakes";

static LOWERCASE_CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(true|false|none)\b").expect("valid regex"));
static THIS_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\.").expect("valid regex"));
static DOTTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*(\.[A-Za-z_]\w*)+$").expect("valid regex"));

/// Textual slips that parse fine but misbehave at runtime
pub struct CommonMistakesRule;

impl LintRule for CommonMistakesRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Catch Python slips in values, handlers and ids"
    }

    fn check_body(&self, _ctx: &LintContext<'_>, _owner: &BodyOwner, body: &Body) -> Vec<Diagnostic> {
        let mut diagnostics = duplicates(&body.properties);
        for property in &body.properties {
            diagnostics.extend(check_value(property));
        }
        for handler in &body.handlers {
            diagnostics.extend(check_value(handler));
            diagnostics.extend(check_handler(handler));
        }
        diagnostics
    }

    fn check_widget(&self, _ctx: &LintContext<'_>, widget: &Widget) -> Vec<Diagnostic> {
        match &widget.id {
            Some(id) if is_quoted(id) => {
                let bare = id.trim_matches(|c| c == '"' || c == '\'');
                vec![Diagnostic::warning(
                    NAME,
                    format!("id {} is a string literal, ids are bare names", id),
                    widget.position,
                )
                .with_suggestion(format!("id: {}", bare))]
            }
            _ => Vec::new(),
        }
    }

    fn check_canvas_instruction(
        &self,
        _ctx: &LintContext<'_>,
        instruction: &CanvasInstruction,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = duplicates(&instruction.properties);
        for property in &instruction.properties {
            diagnostics.extend(check_value(property));
        }
        diagnostics
    }
}

fn is_quoted(id: &str) -> bool {
    id.len() >= 2
        && ((id.starts_with('\'') && id.ends_with('\'')) || (id.starts_with('"') && id.ends_with('"')))
}

/// Later assignments of a name already set in the same body
fn duplicates(properties: &[Property]) -> Vec<Diagnostic> {
    let mut first_seen: IndexMap<&str, Position> = IndexMap::new();
    let mut diagnostics = Vec::new();
    for property in properties {
        match first_seen.get(property.name.as_str()) {
            Some(first) => diagnostics.push(Diagnostic::warning(
                NAME,
                format!("'{}' is already set on line {}", property.name, first.line),
                property.position,
            )),
            None => {
                first_seen.insert(&property.name, property.position);
            }
        }
    }
    diagnostics
}

fn check_value(property: &Property) -> Vec<Diagnostic> {
    // Unterminated literals are the compiler's concern
    let Ok(code) = mask_literals(&property.value) else {
        return Vec::new();
    };
    let mut diagnostics = Vec::new();

    for found in LOWERCASE_CONSTANT.find_iter(&code) {
        if is_attribute(&code, found.start()) {
            continue;
        }
        let word = found.as_str();
        let fixed = format!("{}{}", word[..1].to_uppercase(), &word[1..]);
        diagnostics.push(
            Diagnostic::warning(
                NAME,
                format!("'{}' in '{}' is not a Python constant", word, property.name),
                property.position,
            )
            .with_suggestion(format!("use '{}'", fixed)),
        );
    }

    if THIS_REFERENCE
        .find_iter(&code)
        .any(|found| !is_attribute(&code, found.start()))
    {
        diagnostics.push(
            Diagnostic::warning(
                NAME,
                format!("'{}' refers to 'this', KV uses 'self'", property.name),
                property.position,
            )
            .with_suggestion("replace 'this.' with 'self.'"),
        );
    }

    if code.trim_end().ends_with(';') {
        diagnostics.push(
            Diagnostic::warning(
                NAME,
                format!("'{}' ends with ';'", property.name),
                property.position,
            )
            .with_suggestion("remove the trailing ';'"),
        );
    }

    diagnostics
}

/// A handler that only names a method never calls it
fn check_handler(handler: &Property) -> Vec<Diagnostic> {
    let value = handler.value.trim();
    if !DOTTED_NAME.is_match(value) {
        return Vec::new();
    }
    vec![Diagnostic::warning(
        NAME,
        format!("'{}' names '{}' without calling it", handler.name, value),
        handler.position,
    )
    .with_suggestion(format!("{}()", value))]
}

/// The match at `start` follows a `.`, so it is an attribute name
fn is_attribute(code: &str, start: usize) -> bool {
    code[..start].trim_end().ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use kvlang_parser::parse;

    fn check_rule_body(source: &str) -> Vec<Diagnostic> {
        let module = parse(source).unwrap();
        let registry = StaticRegistry::kivy();
        let ctx = LintContext::new(&module, &registry);
        let owner = BodyOwner {
            classes: Vec::new(),
            declares: false,
            position: Position::new(1, 1),
        };
        CommonMistakesRule.check_body(&ctx, &owner, &module.rules[0].body)
    }

    fn suggestions(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter_map(|diagnostic| diagnostic.suggestion.as_deref())
            .collect()
    }

    #[test]
    fn test_lowercase_constants() {
        let diagnostics = check_rule_body("<A>:\n    disabled: true\n    opacity: 1 if self.none else 0\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(suggestions(&diagnostics), vec!["use 'True'"]);
    }

    #[test]
    fn test_strings_are_ignored() {
        assert!(check_rule_body("<A>:\n    text: 'none of this.x; true'\n").is_empty());
    }

    #[test]
    fn test_this_and_semicolon() {
        let diagnostics = check_rule_body("<A>:\n    width: this.height;\n");
        assert_eq!(
            suggestions(&diagnostics),
            vec!["replace 'this.' with 'self.'", "remove the trailing ';'"]
        );
    }

    #[test]
    fn test_handler_without_call() {
        let diagnostics = check_rule_body("<A>:\n    on_press: root.do_login\n    on_release: root.reset()\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'on_press' names 'root.do_login' without calling it");
        assert_eq!(diagnostics[0].suggestion.as_deref(), Some("root.do_login()"));
    }

    #[test]
    fn test_duplicate_property() {
        let diagnostics = check_rule_body("<A>:\n    text: 'a'\n    color: 1, 1, 1, 1\n    text: 'b'\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'text' is already set on line 2");
        assert_eq!(diagnostics[0].position.line, 4);
    }

    #[test]
    fn test_quoted_id() {
        let module = parse("<A>:\n    Label:\n        id: 'title'\n").unwrap();
        let registry = StaticRegistry::kivy();
        let ctx = LintContext::new(&module, &registry);

        let diagnostics = CommonMistakesRule.check_widget(&ctx, &module.rules[0].body.children[0]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].suggestion.as_deref(), Some("id: title"));
    }
}
