mod diagnostic;
mod kivy;
mod linter;
mod registry;
mod rules;

pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use kivy::{CANVAS_INSTRUCTIONS, KIVY_WIDGETS};
pub use linter::{lint_module, LintOptions, SemanticValidator};
pub use registry::{PropertyKind, StaticRegistry, WidgetInfo, WidgetRegistry};
pub use rules::{
    BodyOwner, CanvasInstructionRule, CommonMistakesRule, LintContext, LintRule, PropertyTypoRule, RuleRegistry,
    UnknownClassRule,
};
