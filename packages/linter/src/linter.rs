use crate::diagnostic::Diagnostic;
use crate::registry::WidgetRegistry;
use crate::rules::{BodyOwner, LintContext, RuleRegistry};
use kvlang_common::{walk_body, walk_rule, walk_template, walk_widget, Visitor};
use kvlang_parser::ast::{Body, CanvasInstruction, Module, Position, Rule, Selector, Template, Widget};
use tracing::debug;

/// Options for configuring the linter
#[derive(Debug, Default)]
pub struct LintOptions {
    /// Custom rule registry (uses default if None)
    pub registry: Option<RuleRegistry>,
}

/// Runs every registered rule over a module
pub struct SemanticValidator<'a> {
    context: LintContext<'a>,
    rules: &'a RuleRegistry,
    owners: Vec<BodyOwner>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SemanticValidator<'a> {
    pub fn new(module: &'a Module, registry: &'a dyn WidgetRegistry, rules: &'a RuleRegistry) -> Self {
        Self {
            context: LintContext::new(module, registry),
            rules,
            owners: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Validate the module this validator was built for, in source order
    pub fn run(mut self) -> Vec<Diagnostic> {
        let module = self.context.module;
        self.visit_module(module);
        self.diagnostics.sort_by_key(|diagnostic| diagnostic.position);
        self.diagnostics
    }
}

fn selector_owner(selector: &Selector, line: usize) -> BodyOwner {
    let (classes, declares) = match selector {
        Selector::Name { name } | Selector::Avoidance { name } => (vec![name.clone()], false),
        Selector::Multiple { names } => (names.clone(), false),
        Selector::DynamicClass { name, .. } => (vec![name.clone()], true),
        Selector::Class { .. } => (Vec::new(), false),
    };
    BodyOwner {
        classes,
        declares,
        position: Position::new(line, 1),
    }
}

impl Visitor for SemanticValidator<'_> {
    fn visit_rule(&mut self, rule: &Rule) {
        for lint in self.rules.rules() {
            self.diagnostics.extend(lint.check_rule(&self.context, rule));
        }
        self.owners.push(selector_owner(&rule.selector, rule.line));
        walk_rule(self, rule);
        self.owners.pop();
    }

    fn visit_template(&mut self, template: &Template) {
        for lint in self.rules.rules() {
            self.diagnostics.extend(lint.check_template(&self.context, template));
        }
        self.owners.push(BodyOwner {
            classes: vec![template.name.clone()],
            declares: true,
            position: Position::new(template.line, 1),
        });
        walk_template(self, template);
        self.owners.pop();
    }

    fn visit_widget(&mut self, widget: &Widget) {
        for lint in self.rules.rules() {
            self.diagnostics.extend(lint.check_widget(&self.context, widget));
        }
        self.owners.push(BodyOwner {
            classes: vec![widget.type_name.clone()],
            declares: false,
            position: widget.position,
        });
        walk_widget(self, widget);
        self.owners.pop();
    }

    fn visit_body(&mut self, body: &Body) {
        if let Some(owner) = self.owners.last() {
            for lint in self.rules.rules() {
                self.diagnostics.extend(lint.check_body(&self.context, owner, body));
            }
        }
        walk_body(self, body);
    }

    fn visit_canvas_instruction(&mut self, instruction: &CanvasInstruction) {
        for lint in self.rules.rules() {
            self.diagnostics
                .extend(lint.check_canvas_instruction(&self.context, instruction));
        }
    }
}

/// Lint a parsed module against a widget registry and return diagnostics
/// ordered by position
pub fn lint_module(module: &Module, registry: &dyn WidgetRegistry, options: LintOptions) -> Vec<Diagnostic> {
    let rules = options.registry.unwrap_or_default();
    let diagnostics = SemanticValidator::new(module, registry, &rules).run();
    debug!(
        rules = rules.rules().len(),
        diagnostics = diagnostics.len(),
        "lint finished"
    );
    diagnostics
}
