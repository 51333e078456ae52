use kvlang_parser::{parse, CanvasLayer, Directive, ParseError, Position, Selector};

const LOGIN_SCREEN: &str = r#"#:kivy 2.1.0
#:import Factory kivy.factory.Factory

<RoundedButton@Button>:
    background_color: 0, 0, 0, 0
    canvas.before:
        Color:
            rgba: (0.2, 0.5, 0.9, 1) if self.state == 'normal' else (0.1, 0.3, 0.7, 1)
        RoundedRectangle:
            pos: self.pos
            size: self.size
            radius: [10]

<LoginScreen>:
    orientation: 'vertical'
    padding: 20
    spacing: 10
    Label:
        id: title_label
        text: app.title
        font_size: '24sp'
    TextInput:
        id: username
        hint_text: 'Username'
        multiline: False
    RoundedButton:
        text: 'Log in'
        disabled: not username.text
        on_release: root.login(username.text)

<Label,Button>:
    font_name: 'Roboto'

<-Slider>:
    canvas:
        Color:
            rgb: 1, 1, 1
"#;

#[test]
fn test_login_screen() {
    let module = parse(LOGIN_SCREEN).unwrap();

    assert_eq!(module.directives.len(), 2);
    assert!(matches!(module.directives[1], Directive::Import { ref alias, .. } if alias == "Factory"));

    assert_eq!(module.rules.len(), 4);
    let kinds: Vec<&str> = module.rules.iter().map(|r| r.selector.kind()).collect();
    assert_eq!(kinds, vec!["dynamic-class", "name", "multiple", "avoidance"]);

    let login = module.find_rule("LoginScreen").unwrap();
    assert_eq!(login.line, 14);
    let children: Vec<(&str, Option<&str>)> = login
        .body
        .children
        .iter()
        .map(|w| (w.type_name.as_str(), w.id.as_deref()))
        .collect();
    assert_eq!(
        children,
        vec![
            ("Label", Some("title_label")),
            ("TextInput", Some("username")),
            ("RoundedButton", None),
        ]
    );
    let button = &login.body.children[2];
    assert_eq!(button.body.handlers[0].name, "on_release");
    assert_eq!(button.body.handlers[0].value, "root.login(username.text)");
    assert_eq!(button.position, Position::new(26, 5));

    let rounded = &module.rules[0];
    let canvas = &rounded.body.canvas[0];
    assert_eq!(canvas.layer, CanvasLayer::Before);
    assert_eq!(canvas.instructions[1].type_name, "RoundedRectangle");
    assert_eq!(canvas.instructions[1].properties.len(), 3);
}

#[test]
fn test_multiple_selector() {
    let module = parse("<Button,Label>:\n    color: 1, 0, 0, 1\n").unwrap();
    assert_eq!(
        module.rules[0].selector,
        Selector::Multiple {
            names: vec!["Button".to_string(), "Label".to_string()]
        }
    );
}

#[test]
fn test_avoidance_selector() {
    let module = parse("<-Button>:\n    text: 'plain'\n").unwrap();
    let rule = &module.rules[0];
    assert!(rule.avoid_previous);
    assert_eq!(rule.selector.names(), vec!["Button"]);
}

#[test]
fn test_dynamic_class_registration() {
    let module = parse("<CustomButton@Button>:\n    text: 'custom'\n<Other>:\n").unwrap();
    assert_eq!(module.dynamic_classes.len(), 1);
    let class = &module.dynamic_classes["CustomButton"];
    assert_eq!(class.bases, vec!["Button"]);

    let duplicate = "<CustomButton@Button>:\n    text: 'a'\n<CustomButton@Button>:\n    text: 'b'\n";
    let err = parse(duplicate).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateDynamicClass { ref name, .. } if name == "CustomButton"));
}

#[test]
fn test_comment_inside_canvas_does_not_reclassify_siblings() {
    let source = r#"<Card>:
    canvas.before:
        # draw the background first
        Color:
            rgba: 1, 1, 1, 1
        # then the frame
        Rectangle:
            pos: self.pos
            size: self.size
        Line:
            width: 1.5
    Label:
        text: 'body'
"#;
    let module = parse(source).unwrap();
    let body = &module.rules[0].body;

    let instructions: Vec<&str> = body.canvas[0]
        .instructions
        .iter()
        .map(|i| i.type_name.as_str())
        .collect();
    assert_eq!(instructions, vec!["Color", "Rectangle", "Line"]);
    assert_eq!(body.children.len(), 1);
    assert_eq!(body.children[0].type_name, "Label");
}

#[test]
fn test_root_widget() {
    let source = "#:import utils kivy.utils\nFloatLayout:\n    Button:\n        text: 'Quit'\n        on_press: app.stop()\n";
    let module = parse(source).unwrap();
    assert!(module.rules.is_empty());
    let root = module.root.unwrap();
    assert_eq!(root.type_name, "FloatLayout");
    assert_eq!(root.body.children[0].body.handlers.len(), 1);
}

#[test]
fn test_property_order_is_preserved() {
    let module = parse("<A>:\n    z: 1\n    a: 2\n    m: 3\n    on_b: pass\n    on_a: pass\n").unwrap();
    let body = &module.rules[0].body;
    let properties: Vec<&str> = body.properties.iter().map(|p| p.name.as_str()).collect();
    let handlers: Vec<&str> = body.handlers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(properties, vec!["z", "a", "m"]);
    assert_eq!(handlers, vec!["on_b", "on_a"]);
}

#[test]
fn test_crlf_and_bom() {
    let module = parse("\u{feff}<A>:\r\n    text: 'x'\r\n").unwrap();
    assert_eq!(module.rules[0].body.properties[0].value, "'x'");
}

#[test]
fn test_unexpected_top_level_indentation() {
    let err = parse("    <A>:\n").unwrap_err();
    assert_eq!(err.message(), "unexpected indentation");
}

#[test]
fn test_error_messages_carry_positions() {
    let err = parse("<A>:\n    Label:\n        text 'x'\n").unwrap_err();
    assert_eq!(err.position(), Position::new(3, 9));
    assert!(err.to_string().contains("3:9"));
}
