use super::{closest_match, LintContext, LintRule};
use crate::diagnostic::Diagnostic;
use kvlang_parser::ast::CanvasInstruction;

const NAME: &str = "canvas-instruction";

/// Canvas blocks may only hold graphics instructions
pub struct CanvasInstructionRule;

impl LintRule for CanvasInstructionRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Canvas entries must be known graphics instructions"
    }

    fn check_canvas_instruction(
        &self,
        ctx: &LintContext<'_>,
        instruction: &CanvasInstruction,
    ) -> Vec<Diagnostic> {
        if ctx.registry.is_canvas_instruction(&instruction.type_name) {
            return Vec::new();
        }

        let message = if ctx.registry.class_exists(&instruction.type_name) {
            format!("'{}' is a widget, not a canvas instruction", instruction.type_name)
        } else {
            format!("unknown canvas instruction '{}'", instruction.type_name)
        };
        let diagnostic = Diagnostic::error(NAME, message, instruction.position);

        let instructions = ctx.registry.canvas_instructions();
        match closest_match(&instruction.type_name, &instructions, 2) {
            Some(candidate) => vec![diagnostic.with_suggestion(format!("did you mean '{}'?", candidate))],
            None => vec![diagnostic],
        }
    }
}
