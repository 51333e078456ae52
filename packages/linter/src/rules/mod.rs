mod canvas_instruction;
mod common_mistakes;
mod property_typo;
mod unknown_class;

pub use canvas_instruction::CanvasInstructionRule;
pub use common_mistakes::CommonMistakesRule;
pub use property_typo::PropertyTypoRule;
pub use unknown_class::UnknownClassRule;

use crate::diagnostic::Diagnostic;
use crate::registry::WidgetRegistry;
use indexmap::IndexSet;
use kvlang_common::SelectorNameCollector;
use kvlang_parser::ast::{Body, CanvasInstruction, Directive, Module, Position, Rule, Template, Widget};

/// Inheritance chains deeper than this are treated as unresolvable
const MAX_CLASS_DEPTH: usize = 16;

/// Module-wide facts shared by every rule
pub struct LintContext<'a> {
    pub registry: &'a dyn WidgetRegistry,
    pub module: &'a Module,
    /// Classes the module itself names: rule targets, dynamic classes,
    /// templates and `#:import` aliases
    declared: IndexSet<String>,
}

impl<'a> LintContext<'a> {
    pub fn new(module: &'a Module, registry: &'a dyn WidgetRegistry) -> Self {
        let selectors = SelectorNameCollector::collect(module);
        let mut declared: IndexSet<String> = selectors
            .names
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .collect();
        declared.extend(selectors.dynamic_classes);
        declared.extend(selectors.templates);
        for directive in &module.directives {
            if let Directive::Import { alias, .. } = directive {
                declared.insert(alias.clone());
            }
        }

        Self {
            registry,
            module,
            declared,
        }
    }

    pub fn class_known(&self, class_name: &str) -> bool {
        self.registry.class_exists(class_name) || self.declared.contains(class_name)
    }

    /// Registry classes followed by the module's own
    pub fn known_classes(&self) -> Vec<String> {
        let mut classes = self.registry.class_names();
        classes.extend(self.declared.iter().cloned());
        classes
    }

    /// Every property `class_name` is known to have, or `None` when part of its
    /// ancestry is outside both the registry and the module
    pub fn property_names(&self, class_name: &str) -> Option<Vec<String>> {
        let mut names = Vec::new();
        if self.resolve_properties(class_name, 0, &mut names) {
            Some(names)
        } else {
            None
        }
    }

    fn resolve_properties(&self, class_name: &str, depth: usize, names: &mut Vec<String>) -> bool {
        if depth > MAX_CLASS_DEPTH {
            return false;
        }

        if self.registry.class_exists(class_name) {
            names.extend(self.registry.property_names(class_name));
            return true;
        }

        // Properties set in a rule for a class of the module's own exist on
        // its instances
        for rule in &self.module.rules {
            if rule.selector.names().contains(&class_name) {
                names.extend(rule.body.properties.iter().map(|property| property.name.clone()));
            }
        }

        let bases = if let Some(class) = self.module.dynamic_classes.get(class_name) {
            &class.bases
        } else if let Some(template) = self
            .module
            .templates
            .iter()
            .find(|template| template.name == class_name)
        {
            names.extend(template.body.properties.iter().map(|property| property.name.clone()));
            &template.bases
        } else {
            return false;
        };

        bases
            .iter()
            .all(|base| self.resolve_properties(base, depth + 1, names))
    }
}

/// The class (or classes) a body's properties are set on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyOwner {
    pub classes: Vec<String>,
    /// The body may declare new properties, as a dynamic class or template does
    pub declares: bool,
    pub position: Position,
}

/// Trait for implementing lint rules
pub trait LintRule {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    fn check_rule(&self, _ctx: &LintContext<'_>, _rule: &Rule) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn check_template(&self, _ctx: &LintContext<'_>, _template: &Template) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Check a rule, template or widget body
    fn check_body(&self, _ctx: &LintContext<'_>, _owner: &BodyOwner, _body: &Body) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn check_widget(&self, _ctx: &LintContext<'_>, _widget: &Widget) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn check_canvas_instruction(
        &self,
        _ctx: &LintContext<'_>,
        _instruction: &CanvasInstruction,
    ) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Registry of all available lint rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(UnknownClassRule),
                Box::new(PropertyTypoRule),
                Box::new(CanvasInstructionRule),
                Box::new(CommonMistakesRule),
            ],
        }
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn LintRule>] {
        &self.rules
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom rule to the registry
    pub fn add_rule(&mut self, rule: Box<dyn LintRule>) {
        self.rules.push(rule);
    }

    /// Drop the rule called `name`, if registered
    pub fn disable(&mut self, name: &str) {
        self.rules.retain(|rule| rule.name() != name);
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}

/// Closest candidate within `max_distance` edits, ties going to the earliest.
/// `name` itself never matches, nor does anything needing as many edits as
/// `name` has characters.
pub(crate) fn closest_match<'c>(
    name: &str,
    candidates: impl IntoIterator<Item = &'c String>,
    max_distance: usize,
) -> Option<&'c str> {
    let mut best: Option<(usize, &'c str)> = None;
    for candidate in candidates {
        let distance = strsim::levenshtein(name, candidate);
        if distance == 0 || distance > max_distance || distance >= name.chars().count() {
            continue;
        }
        if best.map_or(true, |(best_distance, _)| distance < best_distance) {
            best = Some((distance, candidate.as_str()));
        }
    }
    best.map(|(_, candidate)| candidate)
}
