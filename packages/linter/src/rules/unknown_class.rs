use super::{closest_match, LintContext, LintRule};
use crate::diagnostic::Diagnostic;
use kvlang_parser::ast::{Position, Rule, Selector, Template, Widget};

const NAME: &str = "unknown-widget-class";

/// Widget instances and class bases must name a known class
pub struct UnknownClassRule;

impl LintRule for UnknownClassRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Widget classes must exist in the registry or be declared in the file"
    }

    fn check_rule(&self, ctx: &LintContext<'_>, rule: &Rule) -> Vec<Diagnostic> {
        match &rule.selector {
            Selector::DynamicClass { name, bases } => {
                check_bases(ctx, name, bases, Position::new(rule.line, 1))
            }
            _ => Vec::new(),
        }
    }

    fn check_template(&self, ctx: &LintContext<'_>, template: &Template) -> Vec<Diagnostic> {
        check_bases(ctx, &template.name, &template.bases, Position::new(template.line, 1))
    }

    fn check_widget(&self, ctx: &LintContext<'_>, widget: &Widget) -> Vec<Diagnostic> {
        if ctx.class_known(&widget.type_name) {
            return Vec::new();
        }
        vec![unknown(ctx, &widget.type_name, format!("unknown widget class '{}'", widget.type_name), widget.position)]
    }
}

fn check_bases(ctx: &LintContext<'_>, name: &str, bases: &[String], position: Position) -> Vec<Diagnostic> {
    bases
        .iter()
        .filter(|base| base.as_str() != name && !ctx.class_known(base))
        .map(|base| unknown(ctx, base, format!("unknown base class '{}' for '{}'", base, name), position))
        .collect()
}

fn unknown(ctx: &LintContext<'_>, class_name: &str, message: String, position: Position) -> Diagnostic {
    let diagnostic = Diagnostic::warning(NAME, message, position);
    let known = ctx.known_classes();
    match closest_match(class_name, &known, 2) {
        Some(candidate) => diagnostic.with_suggestion(format!("did you mean '{}'?", candidate)),
        None => diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use kvlang_parser::parse;

    fn check(source: &str) -> Vec<Diagnostic> {
        let module = parse(source).unwrap();
        let registry = StaticRegistry::kivy();
        let ctx = LintContext::new(&module, &registry);

        let mut diagnostics = Vec::new();
        for rule in &module.rules {
            diagnostics.extend(UnknownClassRule.check_rule(&ctx, rule));
            for child in &rule.body.children {
                diagnostics.extend(UnknownClassRule.check_widget(&ctx, child));
            }
        }
        diagnostics
    }

    #[test]
    fn test_unknown_child_with_suggestion() {
        let diagnostics = check("<Screen>:\n    Buton:\n        text: 'x'\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "unknown widget class 'Buton'");
        assert_eq!(diagnostics[0].position, Position::new(2, 5));
        assert_eq!(diagnostics[0].suggestion.as_deref(), Some("did you mean 'Button'?"));
    }

    #[test]
    fn test_declared_classes_are_known() {
        let source = "<Row@BoxLayout>:\n    label: ''\n<Screen>:\n    Row:\n    Screen:\n    Label:\n";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_unknown_base() {
        let diagnostics = check("<Card@BoxLayot>:\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "unknown base class 'BoxLayot' for 'Card'");
        assert_eq!(diagnostics[0].suggestion.as_deref(), Some("did you mean 'BoxLayout'?"));
    }
}
