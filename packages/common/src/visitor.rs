use kvlang_parser::ast::*;

/// Visitor pattern for traversing a parsed module immutably
///
/// Every method has a default that walks into the node's children, so an
/// implementation only overrides the node kinds it cares about. To keep the
/// default descent from an overridden method, call the matching `walk_*`
/// function.
pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_directive(&mut self, _directive: &Directive) {
        // Leaf node, no children to walk
    }

    fn visit_dynamic_class(&mut self, _class: &DynamicClass) {
        // Leaf node, no children to walk
    }

    fn visit_rule(&mut self, rule: &Rule) {
        walk_rule(self, rule);
    }

    fn visit_selector(&mut self, _selector: &Selector) {
        // Leaf node, no children to walk
    }

    fn visit_template(&mut self, template: &Template) {
        walk_template(self, template);
    }

    /// The module root and every nested child widget
    fn visit_widget(&mut self, widget: &Widget) {
        walk_widget(self, widget);
    }

    fn visit_body(&mut self, body: &Body) {
        walk_body(self, body);
    }

    fn visit_property(&mut self, _property: &Property) {
        // Leaf node, no children to walk
    }

    fn visit_handler(&mut self, _handler: &Property) {
        // Leaf node, no children to walk
    }

    fn visit_canvas(&mut self, canvas: &Canvas) {
        walk_canvas(self, canvas);
    }

    fn visit_canvas_instruction(&mut self, instruction: &CanvasInstruction) {
        walk_canvas_instruction(self, instruction);
    }
}

// Default walk implementations

pub fn walk_module<V: Visitor>(visitor: &mut V, module: &Module) {
    for directive in &module.directives {
        visitor.visit_directive(directive);
    }
    for class in module.dynamic_classes.values() {
        visitor.visit_dynamic_class(class);
    }
    for rule in &module.rules {
        visitor.visit_rule(rule);
    }
    for template in &module.templates {
        visitor.visit_template(template);
    }
    if let Some(root) = &module.root {
        visitor.visit_widget(root);
    }
}

pub fn walk_rule<V: Visitor>(visitor: &mut V, rule: &Rule) {
    visitor.visit_selector(&rule.selector);
    visitor.visit_body(&rule.body);
}

pub fn walk_template<V: Visitor>(visitor: &mut V, template: &Template) {
    visitor.visit_body(&template.body);
}

pub fn walk_widget<V: Visitor>(visitor: &mut V, widget: &Widget) {
    visitor.visit_body(&widget.body);
}

pub fn walk_body<V: Visitor>(visitor: &mut V, body: &Body) {
    for property in &body.properties {
        visitor.visit_property(property);
    }
    for handler in &body.handlers {
        visitor.visit_handler(handler);
    }
    for canvas in &body.canvas {
        visitor.visit_canvas(canvas);
    }
    for child in &body.children {
        visitor.visit_widget(child);
    }
}

pub fn walk_canvas<V: Visitor>(visitor: &mut V, canvas: &Canvas) {
    for instruction in &canvas.instructions {
        visitor.visit_canvas_instruction(instruction);
    }
}

pub fn walk_canvas_instruction<V: Visitor>(visitor: &mut V, instruction: &CanvasInstruction) {
    for property in &instruction.properties {
        visitor.visit_property(property);
    }
}
