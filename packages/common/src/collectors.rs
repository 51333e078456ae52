//! Ready-made visitors that gather facts about a module

use crate::visitor::*;
use indexmap::IndexSet;
use kvlang_parser::ast::*;
use kvlang_parser::binding::{PropertyCompiler, WatchedKey};
use serde::Serialize;

/// Distinct property and handler names in first-seen order
#[derive(Debug, Default)]
pub struct PropertyNameCollector {
    pub properties: IndexSet<String>,
    pub handlers: IndexSet<String>,
}

impl PropertyNameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(module: &Module) -> Self {
        let mut collector = Self::new();
        collector.visit_module(module);
        collector
    }
}

impl Visitor for PropertyNameCollector {
    fn visit_property(&mut self, property: &Property) {
        self.properties.insert(property.name.clone());
    }

    fn visit_handler(&mut self, handler: &Property) {
        self.handlers.insert(handler.name.clone());
    }
}

/// Class names introduced or targeted by rules and templates
///
/// Class selectors are recorded with their leading dot (`.primary`) so they
/// never collide with widget class names.
#[derive(Debug, Default)]
pub struct SelectorNameCollector {
    pub names: IndexSet<String>,
    pub dynamic_classes: IndexSet<String>,
    pub templates: IndexSet<String>,
}

impl SelectorNameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(module: &Module) -> Self {
        let mut collector = Self::new();
        collector.visit_module(module);
        collector
    }
}

impl Visitor for SelectorNameCollector {
    fn visit_rule(&mut self, rule: &Rule) {
        self.visit_selector(&rule.selector);
    }

    fn visit_selector(&mut self, selector: &Selector) {
        match selector {
            Selector::Class { name } => {
                self.names.insert(format!(".{}", name));
            }
            _ => {
                for name in selector.names() {
                    self.names.insert(name.to_string());
                }
            }
        }
    }

    fn visit_dynamic_class(&mut self, class: &DynamicClass) {
        self.dynamic_classes.insert(class.name.clone());
    }

    fn visit_template(&mut self, template: &Template) {
        self.templates.insert(template.name.clone());
    }

    fn visit_widget(&mut self, _widget: &Widget) {
        // Widget instances introduce no class names
    }
}

/// One bound property and the keys it watches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingEdge {
    /// Top-level construct owning the property: a selector, `[Name@Base]` or
    /// the root widget's type
    pub owner: String,
    /// Class the property is set on, `Color` for canvas instruction properties
    pub target: String,
    pub property: String,
    pub position: Position,
    pub dependencies: Vec<WatchedKey>,
}

/// Builds the dependency edges between properties and the keys they watch
///
/// Properties are compiled through their cache, scoped with the ids declared
/// in the enclosing top-level construct. Static values and handlers produce no
/// edge.
pub struct WatchedPropertyCollector<'c> {
    base: &'c PropertyCompiler,
    scoped: Option<PropertyCompiler>,
    owner: String,
    targets: Vec<String>,
    pub edges: Vec<BindingEdge>,
}

impl<'c> WatchedPropertyCollector<'c> {
    pub fn new(compiler: &'c PropertyCompiler) -> Self {
        Self {
            base: compiler,
            scoped: None,
            owner: String::new(),
            targets: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn collect(module: &Module, compiler: &'c PropertyCompiler) -> Vec<BindingEdge> {
        let mut collector = Self::new(compiler);
        collector.visit_module(module);
        collector.edges
    }

    fn enter(&mut self, owner: String, target: String, ids: Vec<String>) {
        self.scoped = Some(self.base.with_ids(ids));
        self.owner = owner;
        self.targets = vec![target];
    }

    fn record(&mut self, property: &Property) {
        let compiler = self.scoped.as_ref().unwrap_or(self.base);
        let compiled = property.binding(compiler);
        if compiled.watched_keys.is_empty() {
            return;
        }

        let edge = BindingEdge {
            owner: self.owner.clone(),
            target: self.targets.last().cloned().unwrap_or_default(),
            property: property.name.clone(),
            position: property.position,
            dependencies: compiled.watched_keys.clone(),
        };
        self.edges.push(edge);
    }
}

impl Visitor for WatchedPropertyCollector<'_> {
    fn visit_rule(&mut self, rule: &Rule) {
        let target = rule.selector.names().join(",");
        self.enter(rule.selector.to_string(), target, rule.body.declared_ids());
        walk_rule(self, rule);
        self.targets.clear();
    }

    fn visit_template(&mut self, template: &Template) {
        let owner = format!("[{}@{}]", template.name, template.bases.join(","));
        self.enter(owner, template.name.clone(), template.body.declared_ids());
        walk_template(self, template);
        self.targets.clear();
    }

    fn visit_widget(&mut self, widget: &Widget) {
        if self.targets.is_empty() {
            // Module root
            let mut ids = widget.body.declared_ids();
            if let Some(id) = &widget.id {
                ids.insert(0, id.clone());
            }
            self.enter(widget.type_name.clone(), widget.type_name.clone(), ids);
            walk_widget(self, widget);
            self.targets.clear();
            return;
        }

        self.targets.push(widget.type_name.clone());
        walk_widget(self, widget);
        self.targets.pop();
    }

    fn visit_property(&mut self, property: &Property) {
        self.record(property);
    }

    fn visit_canvas_instruction(&mut self, instruction: &CanvasInstruction) {
        self.targets.push(instruction.type_name.clone());
        walk_canvas_instruction(self, instruction);
        self.targets.pop();
    }
}

/// Node counts for a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AstStatistics {
    pub rules: usize,
    pub templates: usize,
    pub dynamic_classes: usize,
    pub directives: usize,
    pub widgets: usize,
    pub properties: usize,
    pub handlers: usize,
    pub canvas_blocks: usize,
    pub canvas_instructions: usize,
    /// Properties whose cached compilation watches at least one key
    pub bound_properties: usize,
    /// Deepest widget nesting; the root and a rule's direct children are 1
    pub max_depth: usize,
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    depth: usize,
    pub stats: AstStatistics,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for `module`. `bound_properties` only counts properties that
    /// were already compiled, see `Module::compile_bindings`.
    pub fn collect(module: &Module) -> AstStatistics {
        let mut collector = Self::new();
        collector.visit_module(module);
        collector.stats
    }
}

impl Visitor for StatsCollector {
    fn visit_directive(&mut self, _directive: &Directive) {
        self.stats.directives += 1;
    }

    fn visit_dynamic_class(&mut self, _class: &DynamicClass) {
        self.stats.dynamic_classes += 1;
    }

    fn visit_rule(&mut self, rule: &Rule) {
        self.stats.rules += 1;
        walk_rule(self, rule);
    }

    fn visit_template(&mut self, template: &Template) {
        self.stats.templates += 1;
        walk_template(self, template);
    }

    fn visit_widget(&mut self, widget: &Widget) {
        self.stats.widgets += 1;
        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);
        walk_widget(self, widget);
        self.depth -= 1;
    }

    fn visit_property(&mut self, property: &Property) {
        self.stats.properties += 1;
        if property
            .compiled()
            .is_some_and(|compiled| !compiled.watched_keys.is_empty())
        {
            self.stats.bound_properties += 1;
        }
    }

    fn visit_handler(&mut self, _handler: &Property) {
        self.stats.handlers += 1;
    }

    fn visit_canvas(&mut self, canvas: &Canvas) {
        self.stats.canvas_blocks += 1;
        walk_canvas(self, canvas);
    }

    fn visit_canvas_instruction(&mut self, instruction: &CanvasInstruction) {
        self.stats.canvas_instructions += 1;
        walk_canvas_instruction(self, instruction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvlang_parser::parse;

    const SOURCE: &str = "\
#:kivy 2.0
<Row@BoxLayout>:
    label: ''
<.primary>:
    color: 1, 0, 0, 1
<Screen>:
    title: app.title
    on_enter: self.refresh()
    BoxLayout:
        Label:
            id: heading
            text: root.title
        Button:
            text: heading.text.upper()
    canvas.before:
        Color:
            rgba: self.tint
        Rectangle:
            pos: self.pos
";

    #[test]
    fn test_property_names() {
        let module = parse(SOURCE).unwrap();
        let collector = PropertyNameCollector::collect(&module);

        let properties: Vec<&str> = collector.properties.iter().map(String::as_str).collect();
        assert_eq!(properties, vec!["label", "color", "title", "rgba", "pos", "text"]);
        assert!(collector.handlers.contains("on_enter"));
    }

    #[test]
    fn test_selector_names() {
        let module = parse(SOURCE).unwrap();
        let collector = SelectorNameCollector::collect(&module);

        let names: Vec<&str> = collector.names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Row", ".primary", "Screen"]);
        assert!(collector.dynamic_classes.contains("Row"));
        assert!(collector.templates.is_empty());
    }

    #[test]
    fn test_binding_edges() {
        let module = parse(SOURCE).unwrap();
        let compiler = PropertyCompiler::new();
        let edges = WatchedPropertyCollector::collect(&module, &compiler);

        let summary: Vec<(String, String, String)> = edges
            .iter()
            .map(|edge| (edge.owner.clone(), edge.target.clone(), edge.property.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("<Screen>".into(), "Screen".into(), "title".into()),
                ("<Screen>".into(), "Color".into(), "rgba".into()),
                ("<Screen>".into(), "Rectangle".into(), "pos".into()),
                ("<Screen>".into(), "Label".into(), "text".into()),
                ("<Screen>".into(), "Button".into(), "text".into()),
            ]
        );

        // `heading` is declared inside the rule, the method call is not watched
        let button = &edges[4];
        assert_eq!(button.dependencies, vec![vec!["heading".to_string(), "text".to_string()]]);
    }

    #[test]
    fn test_root_widget_edges_use_root_ids() {
        let module = parse("FloatLayout:\n    id: main\n    Label:\n        text: main.title\n").unwrap();
        let compiler = PropertyCompiler::new();
        let edges = WatchedPropertyCollector::collect(&module, &compiler);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].owner, "FloatLayout");
        assert_eq!(edges[0].target, "Label");
        assert_eq!(edges[0].dependencies, vec![vec!["main".to_string(), "title".to_string()]]);
    }

    #[test]
    fn test_statistics() {
        let module = parse(SOURCE).unwrap();
        let stats = StatsCollector::collect(&module);
        assert_eq!(stats.bound_properties, 0);

        module.compile_bindings(&PropertyCompiler::new());
        let stats = StatsCollector::collect(&module);
        assert_eq!(
            stats,
            AstStatistics {
                rules: 3,
                templates: 0,
                dynamic_classes: 1,
                directives: 1,
                widgets: 3,
                properties: 7,
                handlers: 1,
                canvas_blocks: 1,
                canvas_instructions: 2,
                bound_properties: 5,
                max_depth: 2,
            }
        );
    }
}
