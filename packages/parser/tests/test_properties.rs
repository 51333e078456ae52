//! Property-based tests over generated rule trees

use kvlang_parser::tokenizer::TokenKind;
use kvlang_parser::{parse, serialize, tokenize, Body, Module};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct WidgetSpec {
    type_name: String,
    properties: Vec<(String, String)>,
    children: Vec<WidgetSpec>,
}

fn property() -> impl Strategy<Value = (String, String)> {
    let name = "[a-z][a-z_]{0,8}".prop_filter("reserved name", |name| name != "id" && name != "canvas");
    let value = prop::sample::select(vec![
        "self.width",
        "'label'",
        "app.title",
        "1, 0, 0, 1",
        "root.x + 10",
        "[1, 2]",
        "f'{self.text}'",
    ]);
    (name, value).prop_map(|(name, value)| (name, value.to_string()))
}

fn widget() -> impl Strategy<Value = WidgetSpec> {
    let leaf = ("[A-Z][a-zA-Z]{0,8}", prop::collection::vec(property(), 0..4)).prop_map(
        |(type_name, properties)| WidgetSpec {
            type_name,
            properties,
            children: Vec::new(),
        },
    );
    leaf.prop_recursive(3, 24, 3, |inner| {
        (
            "[A-Z][a-zA-Z]{0,8}",
            prop::collection::vec(property(), 0..4),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(type_name, properties, children)| WidgetSpec {
                type_name,
                properties,
                children,
            })
    })
}

fn render_body(spec: &WidgetSpec, depth: usize, step: usize, out: &mut Vec<String>) {
    let pad = " ".repeat(depth * step);
    for (name, value) in &spec.properties {
        out.push(format!("{}{}: {}", pad, name, value));
    }
    for child in &spec.children {
        out.push(format!("{}{}:", pad, child.type_name));
        render_body(child, depth + 1, step, out);
    }
}

fn render(rules: &[WidgetSpec], step: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for rule in rules {
        lines.push(format!("<{}>:", rule.type_name));
        render_body(rule, 1, step, &mut lines);
    }
    lines
}

/// Shape of a body with positions left out
fn body_shape(body: &Body) -> String {
    let mut shape = String::new();
    for property in body.properties.iter().chain(&body.handlers) {
        shape.push_str(&format!("{}={};", property.name, property.value));
    }
    for child in &body.children {
        shape.push_str(&format!("{}[{}]", child.type_name, body_shape(&child.body)));
    }
    shape
}

fn module_shape(module: &Module) -> Vec<String> {
    module
        .rules
        .iter()
        .map(|rule| format!("{} {} {}", rule.selector.kind(), rule.selector, body_shape(&rule.body)))
        .collect()
}

proptest! {
    #[test]
    fn prop_indents_balance(rules in prop::collection::vec(widget(), 1..5), step in 1usize..6) {
        let source = render(&rules, step).join("\n");
        let tokens = tokenize(&source).unwrap();

        let mut depth: i64 = 0;
        for token in &tokens {
            match token.kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => depth -= 1,
                _ => {}
            }
            prop_assert!(depth >= 0);
        }
        prop_assert_eq!(depth, 0);

        let indents = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        prop_assert_eq!(indents, dedents);
    }

    #[test]
    fn prop_comments_and_blank_lines_are_transparent(
        rules in prop::collection::vec(widget(), 1..4),
        noise in prop::collection::vec((0usize..3, 0usize..12), 0..8),
    ) {
        let lines = render(&rules, 4);
        let mut noisy = lines.clone();
        for (kind, at) in noise.iter().rev() {
            let at = (*at).min(noisy.len());
            let filler = match kind {
                0 => String::new(),
                1 => format!("{}# comment", " ".repeat(at % 7)),
                _ => "   ".to_string(),
            };
            noisy.insert(at, filler);
        }

        let clean_kinds: Vec<TokenKind> = tokenize(&lines.join("\n")).unwrap().into_iter().map(|t| t.kind).collect();
        let noisy_kinds: Vec<TokenKind> = tokenize(&noisy.join("\n")).unwrap().into_iter().map(|t| t.kind).collect();
        prop_assert_eq!(clean_kinds, noisy_kinds);
    }

    #[test]
    fn prop_serializer_round_trip(rules in prop::collection::vec(widget(), 1..5), step in 1usize..6) {
        let source = render(&rules, step).join("\n");
        let module = parse(&source).unwrap();
        prop_assert_eq!(module.rules.len(), rules.len());

        let reparsed = parse(&serialize(&module)).unwrap();
        prop_assert_eq!(module_shape(&module), module_shape(&reparsed));
    }
}
