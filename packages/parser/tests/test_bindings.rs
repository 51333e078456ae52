use kvlang_parser::{parse, EvalMode, PropertyCompiler, PythonExpressionParser};

fn key(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_app_title_binding() {
    let module = parse("<Header@Label>:\n    text: app.title\n").unwrap();
    let property = &module.rules[0].body.properties[0];
    let compiled = property.binding(&PropertyCompiler::new());

    assert_eq!(compiled.mode, EvalMode::Eval);
    assert_eq!(compiled.watched_keys, vec![key(&["app", "title"])]);
}

#[test]
fn test_position_tuple_binding() {
    let module = parse("<Dot@Widget>:\n    pos: self.center_x - 20, self.center_y - 20\n").unwrap();
    let compiled = module.rules[0].body.properties[0].binding(&PropertyCompiler::new());

    assert_eq!(
        compiled.watched_keys,
        vec![key(&["self", "center_x"]), key(&["self", "center_y"])]
    );
}

#[test]
fn test_handlers_are_exec_only() {
    let module = parse("<A>:\n    on_press: self.select(app.current)\n").unwrap();
    let compiled = module.rules[0].body.handlers[0].binding(&PropertyCompiler::new());

    assert_eq!(compiled.mode, EvalMode::Exec);
    assert!(compiled.watched_keys.is_empty());
}

#[test]
fn test_compile_is_cached() {
    let module = parse("<A>:\n    text: self.label\n").unwrap();
    let property = &module.rules[0].body.properties[0];

    let first = property.binding(&PropertyCompiler::new()) as *const _;
    let custom = PropertyCompiler::with_roots(["other"]);
    let second = property.binding(&custom) as *const _;
    assert_eq!(first, second);
    assert_eq!(property.compiled().unwrap().watched_keys, vec![key(&["self", "label"])]);
}

#[test]
fn test_declared_ids_become_roots() {
    let source = r#"<Form>:
    TextInput:
        id: name_input
    Label:
        text: 'Hello ' + name_input.text
        color: status.color
"#;
    let module = parse(source).unwrap();
    module.compile_bindings(&PropertyCompiler::new());

    let label = &module.rules[0].body.children[1];
    let text = label.body.properties[0].compiled().unwrap();
    assert_eq!(text.watched_keys, vec![key(&["name_input", "text"])]);

    // `status` is not declared anywhere in the rule
    let color = label.body.properties[1].compiled().unwrap();
    assert!(color.is_static());
    assert_eq!(color.warnings.len(), 1);
}

#[test]
fn test_ids_do_not_leak_between_rules() {
    let source = "<A>:\n    Label:\n        id: shared\n<B>:\n    text: shared.text\n";
    let module = parse(source).unwrap();
    module.compile_bindings(&PropertyCompiler::new());

    let compiled = module.rules[1].body.properties[0].compiled().unwrap();
    assert!(compiled.is_static());
}

#[test]
fn test_canvas_properties_are_compiled() {
    let module = parse("<A>:\n    canvas:\n        Rectangle:\n            size: self.size\n").unwrap();
    module.compile_bindings(&PropertyCompiler::new());

    let property = &module.rules[0].body.canvas[0].instructions[0].properties[0];
    assert_eq!(property.compiled().unwrap().watched_keys, vec![key(&["self", "size"])]);
}

#[test]
fn test_analyzer_and_scanner_agree_on_common_values() {
    let plain = PropertyCompiler::new();
    let analyzed = PropertyCompiler::new().with_expression_parser(PythonExpressionParser);

    for value in [
        "app.title",
        "self.center_x - 20, self.center_y - 20",
        "str(root.count)",
        "'{} items'.format(len(root.items))",
        "f'{app.user.name}!'",
        "self.texture_size[0] * 1.2",
        "root.width if root.width < dp(300) else dp(300)",
        "self.parent.do_layout()",
    ] {
        assert_eq!(
            plain.compile("text", value).watched_keys,
            analyzed.compile("text", value).watched_keys,
            "disagreement on {:?}",
            value
        );
    }
}
