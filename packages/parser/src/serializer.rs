use crate::ast::*;

/// Serializer converts a Module back to .kv source
///
/// Within a body, entries are written grouped: id, properties, handlers,
/// canvas blocks, then children. Multi-line values are re-indented under
/// their property name. Comments and blank lines are not preserved.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "    ".to_string(), // 4 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a Module to source code
    pub fn serialize(&mut self, module: &Module) -> String {
        let mut output = String::new();

        for directive in &module.directives {
            self.serialize_directive(directive, &mut output);
            output.push('\n');
        }

        let mut blocks = Vec::new();
        for rule in &module.rules {
            let mut block = String::new();
            self.serialize_rule(rule, &mut block);
            blocks.push(block);
        }
        for template in &module.templates {
            let mut block = String::new();
            self.serialize_template(template, &mut block);
            blocks.push(block);
        }
        if let Some(root) = &module.root {
            let mut block = String::new();
            self.serialize_widget(root, &mut block);
            blocks.push(block);
        }

        if !module.directives.is_empty() && !blocks.is_empty() {
            output.push('\n');
        }
        output.push_str(&blocks.join("\n"));
        output
    }

    fn serialize_directive(&self, directive: &Directive, output: &mut String) {
        match directive {
            Directive::Version { version, .. } => {
                output.push_str("#:kivy ");
                output.push_str(version);
            }
            Directive::Import { alias, module, .. } => {
                output.push_str("#:import ");
                output.push_str(alias);
                output.push(' ');
                output.push_str(module);
            }
            Directive::Set { name, expr, .. } => {
                output.push_str("#:set ");
                output.push_str(name);
                output.push(' ');
                output.push_str(expr);
            }
            Directive::Include { path, force, .. } => {
                output.push_str("#:include ");
                if *force {
                    output.push_str("force ");
                }
                if path.contains(char::is_whitespace) || path.contains(['"', '\'']) {
                    output.push_str(&format!("{:?}", path));
                } else {
                    output.push_str(path);
                }
            }
        }
    }

    fn serialize_rule(&mut self, rule: &Rule, output: &mut String) {
        let header = rule.selector.to_string();
        if rule.avoid_previous && !matches!(rule.selector, Selector::Avoidance { .. }) {
            output.push_str("<-");
            output.push_str(&header[1..]);
        } else {
            output.push_str(&header);
        }
        output.push_str(":\n");
        self.serialize_body(&rule.body, None, output);
    }

    fn serialize_template(&mut self, template: &Template, output: &mut String) {
        output.push('[');
        output.push_str(&template.name);
        output.push('@');
        output.push_str(&template.bases.join(","));
        output.push_str("]:\n");
        self.serialize_body(&template.body, None, output);
    }

    fn serialize_widget(&mut self, widget: &Widget, output: &mut String) {
        self.write_indent(output);
        output.push_str(&widget.type_name);
        output.push_str(":\n");
        self.serialize_body(&widget.body, widget.id.as_deref(), output);
    }

    fn serialize_body(&mut self, body: &Body, id: Option<&str>, output: &mut String) {
        self.indent_level += 1;

        if let Some(id) = id {
            self.write_indent(output);
            output.push_str("id: ");
            output.push_str(id);
            output.push('\n');
        }
        for property in body.properties.iter().chain(&body.handlers) {
            self.serialize_property(property, output);
        }
        for canvas in &body.canvas {
            self.serialize_canvas(canvas, output);
        }
        for child in &body.children {
            self.serialize_widget(child, output);
        }

        self.indent_level -= 1;
    }

    fn serialize_property(&mut self, property: &Property, output: &mut String) {
        self.write_indent(output);
        output.push_str(&property.name);
        output.push(':');

        if !property.value.contains('\n') {
            output.push(' ');
            output.push_str(&property.value);
            output.push('\n');
            return;
        }

        output.push('\n');
        self.indent_level += 1;
        for line in property.value.lines() {
            self.write_indent(output);
            output.push_str(line);
            output.push('\n');
        }
        self.indent_level -= 1;
    }

    fn serialize_canvas(&mut self, canvas: &Canvas, output: &mut String) {
        self.write_indent(output);
        output.push_str(canvas.layer.keyword());
        output.push_str(":\n");
        self.indent_level += 1;

        for instruction in &canvas.instructions {
            self.write_indent(output);
            output.push_str(&instruction.type_name);
            if instruction.properties.is_empty() {
                output.push('\n');
                continue;
            }
            output.push_str(":\n");
            self.indent_level += 1;
            for property in &instruction.properties {
                self.serialize_property(property, output);
            }
            self.indent_level -= 1;
        }

        self.indent_level -= 1;
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

/// Serialize with the default four-space indentation
pub fn serialize(module: &Module) -> String {
    Serializer::new().serialize(module)
}
