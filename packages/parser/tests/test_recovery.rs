use kvlang_parser::{parse_strict, parse_tolerant, parse_with_options, ParseMode, ParseOptions};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[test]
fn test_malformed_rule_is_skipped_entirely() {
    init_tracing();
    let source = r#"<Broken>:
    text: 'fine'
    Label
        text: 'never merged'
<Working>:
    text: 'ok'
"#;
    let outcome = parse_tolerant(source, "broken.kv");

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.module.rules.len(), 1);
    assert_eq!(outcome.module.rules[0].selector.names(), vec!["Working"]);
    assert!(!outcome.clean);
}

#[test]
fn test_rules_before_and_after_the_error_survive() {
    init_tracing();
    let source = "<First>:\n    a: 1\n<Second>:\n    b:\n<Third>:\n    c: 3\n";
    let outcome = parse_tolerant(source, "three.kv");

    let names: Vec<&str> = outcome
        .module
        .rules
        .iter()
        .flat_map(|rule| rule.selector.names())
        .collect();
    assert_eq!(names, vec!["First", "Third"]);
    assert_eq!(outcome.diagnostics[0].line, 4);
}

fn rule_names(outcome: &kvlang_parser::ParseOutcome) -> Vec<&str> {
    outcome
        .module
        .rules
        .iter()
        .flat_map(|rule| rule.selector.names())
        .collect()
}

#[test]
fn test_control_character_in_body_discards_the_rule() {
    init_tracing();
    let source = "<A>:\n    x: 1\u{7}\n    y: 2\n<B>:\n    z: 1\n";
    let outcome = parse_tolerant(source, "bell.kv");

    assert_eq!(rule_names(&outcome), vec!["B"]);
    assert_eq!(outcome.module.rules[0].body.properties.len(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].line, 2);
}

#[test]
fn test_control_character_in_header_keeps_the_previous_rule() {
    init_tracing();
    let source = "<A>:\n    x: 1\n<B\u{7}>:\n    y: 1\n<C>:\n    z: 1\n";
    let outcome = parse_tolerant(source, "bell.kv");

    assert_eq!(rule_names(&outcome), vec!["A", "C"]);
    assert_eq!(outcome.module.rules[0].body.properties[0].name, "x");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].line, 3);
}

#[test]
fn test_strict_mode_aborts() {
    let source = "<First>:\n    a: 1\n<Second>:\n    b:\n<Third>:\n    c: 3\n";
    let err = parse_strict(source, "three.kv").unwrap_err();
    assert_eq!(err.position().line, 4);
}

#[test]
fn test_failed_dynamic_class_is_not_registered() {
    let source = "<Card@BoxLayout>:\n    bad line here\n<Card@BoxLayout>:\n    x: 1\n";
    let outcome = parse_tolerant(source, "cards.kv");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.module.dynamic_classes["Card"].line, 3);
}

#[test]
fn test_diagnostics_are_ordered() {
    let source = "<A>:\n    x 1\n<B>:\n    y: 'open\n<C>:\n      z: 1\n    w: 2\n<D>:\n";
    let outcome = parse_tolerant(source, "many.kv");
    let lines: Vec<usize> = outcome.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 4, 7]);
    assert_eq!(outcome.module.rules.len(), 1);
}

#[test]
fn test_options_from_json() {
    let options = ParseOptions::from_json_str(r#"{"mode":"tolerant","filename":"app.kv","expressionAnalysis":true,"eagerBindings":true}"#)
        .unwrap();
    assert_eq!(options.mode, ParseMode::Tolerant);

    let outcome = parse_with_options("<A>:\n    text: str(app.count)\n<B>\n", &options).unwrap();
    assert_eq!(outcome.render(), "app.kv:3:4: missing ':' after '<B>'\n");

    let compiled = outcome.module.rules[0].body.properties[0].compiled().unwrap();
    assert_eq!(compiled.watched_keys, vec![vec!["app".to_string(), "count".to_string()]]);
}

#[cfg(feature = "pretty-errors")]
#[test]
fn test_pretty_rendering() {
    let source = "<A>:\n    text 'x'\n";
    let outcome = parse_tolerant(source, "pretty.kv");
    let rendered = outcome.render_pretty(source);
    assert!(rendered.contains("pretty.kv"));
}
