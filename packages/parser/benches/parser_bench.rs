use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kvlang_parser::{parse, parse_tolerant, tokenize, PropertyCompiler, PythonExpressionParser};

const SCREEN: &str = r#"#:kivy 2.1.0
#:import dp kivy.metrics.dp

<IconButton@ButtonBehavior+Image>:
    size_hint: None, None
    size: dp(48), dp(48)
    canvas.before:
        Color:
            rgba: (1, 1, 1, 0.2) if self.state == 'down' else (0, 0, 0, 0)
        Ellipse:
            pos: self.pos
            size: self.size

<SettingsScreen>:
    BoxLayout:
        orientation: 'vertical'
        padding: dp(16)
        Label:
            id: heading
            text: app.title + ' settings'
            font_size: '20sp'
            size_hint_y: None
            height: self.texture_size[1]
        Slider:
            id: volume
            min: 0
            max: 100
            value: app.config.getint('audio', 'volume')
            on_value: app.set_volume(self.value)
        Label:
            text: f'Volume: {int(volume.value)}%'
        BoxLayout:
            size_hint_y: None
            height: dp(48)
            IconButton:
                source: 'icons/back.png'
                on_release: root.manager.current = 'main'
            IconButton:
                source: 'icons/save.png'
                on_release:
                    app.save_settings()
                    root.manager.current = 'main'
"#;

fn tokenize_screen(c: &mut Criterion) {
    c.bench_function("tokenize_screen", |b| b.iter(|| tokenize(black_box(SCREEN))));
}

fn parse_screen(c: &mut Criterion) {
    c.bench_function("parse_screen", |b| b.iter(|| parse(black_box(SCREEN))));
}

fn parse_screen_tolerant(c: &mut Criterion) {
    c.bench_function("parse_screen_tolerant", |b| {
        b.iter(|| parse_tolerant(black_box(SCREEN), "settings.kv"))
    });
}

fn compile_bindings(c: &mut Criterion) {
    let scanner = PropertyCompiler::new();
    let analyzer = PropertyCompiler::new().with_expression_parser(PythonExpressionParser);

    c.bench_function("compile_bindings_scanner", |b| {
        b.iter(|| {
            let module = parse(SCREEN).unwrap();
            module.compile_bindings(black_box(&scanner));
            module
        })
    });

    c.bench_function("compile_bindings_analyzer", |b| {
        b.iter(|| {
            let module = parse(SCREEN).unwrap();
            module.compile_bindings(black_box(&analyzer));
            module
        })
    });
}

criterion_group!(
    benches,
    tokenize_screen,
    parse_screen,
    parse_screen_tolerant,
    compile_bindings
);
criterion_main!(benches);
