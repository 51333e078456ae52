use super::{closest_match, BodyOwner, LintContext, LintRule};
use crate::diagnostic::Diagnostic;
use kvlang_parser::ast::Body;

const NAME: &str = "property-typo";

/// Edits allowed between a misspelled property and its suggestion
const MAX_DISTANCE: usize = 2;

/// Flags property names that are one or two edits away from a real property
///
/// Unknown names with no close match are left alone, since KV creates
/// properties it does not find on the class.
pub struct PropertyTypoRule;

impl LintRule for PropertyTypoRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Property names should match a property of the target class"
    }

    fn check_body(&self, ctx: &LintContext<'_>, owner: &BodyOwner, body: &Body) -> Vec<Diagnostic> {
        if owner.declares {
            return Vec::new();
        }

        let mut diagnostics = Vec::new();
        for class_name in &owner.classes {
            let Some(known) = ctx.property_names(class_name) else {
                continue;
            };

            for property in &body.properties {
                if property.name == "id" || known.contains(&property.name) {
                    continue;
                }
                if let Some(candidate) = closest_match(&property.name, &known, MAX_DISTANCE) {
                    diagnostics.push(
                        Diagnostic::warning(
                            NAME,
                            format!("'{}' is not a property of {}", property.name, class_name),
                            property.position,
                        )
                        .with_suggestion(format!("did you mean '{}'?", candidate)),
                    );
                }
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use kvlang_parser::ast::Position;
    use kvlang_parser::parse;

    fn check_widget(source: &str) -> Vec<Diagnostic> {
        let module = parse(source).unwrap();
        let registry = StaticRegistry::kivy();
        let ctx = LintContext::new(&module, &registry);
        let widget = &module.rules[0].body.children[0];
        let owner = BodyOwner {
            classes: vec![widget.type_name.clone()],
            declares: false,
            position: widget.position,
        };
        PropertyTypoRule.check_body(&ctx, &owner, &widget.body)
    }

    #[test]
    fn test_suggests_close_property() {
        let diagnostics = check_widget("<A>:\n    Label:\n        txt: 'hello'\n        font_size: 14\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'txt' is not a property of Label");
        assert_eq!(diagnostics[0].position, Position::new(3, 9));
        assert_eq!(diagnostics[0].suggestion.as_deref(), Some("did you mean 'text'?"));
    }

    #[test]
    fn test_inherited_and_distant_names_pass() {
        let source = "<A>:\n    Button:\n        size_hint_y: None\n        completely_custom: 1\n";
        assert!(check_widget(source).is_empty());
    }

    #[test]
    fn test_dynamic_class_properties_count() {
        let source = "<A>:\n    Row:\n        labl: 'x'\n        lable: 'y'\n<Row@BoxLayout>:\n    lable: ''\n";
        let diagnostics = check_widget(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'labl' is not a property of Row");
        assert!(diagnostics[0].suggestion.as_deref().unwrap().contains("lable"));
    }

    #[test]
    fn test_unresolvable_class_is_skipped() {
        assert!(check_widget("<A>:\n    MyWidget:\n        txt: 1\n").is_empty());
    }
}
