use crate::binding::{CompiledValue, PropertyCompiler};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based source location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Root node of a parsed .kv file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub directives: Vec<Directive>,
    pub rules: Vec<Rule>,
    pub templates: Vec<Template>,
    /// Classes declared with `<Name@Base>:`, in declaration order
    pub dynamic_classes: IndexMap<String, DynamicClass>,
    pub root: Option<Widget>,
}

/// `#:` pragma line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Directive {
    Version {
        version: String,
        position: Position,
    },
    Import {
        alias: String,
        module: String,
        position: Position,
    },
    Set {
        name: String,
        expr: String,
        position: Position,
    },
    Include {
        path: String,
        force: bool,
        position: Position,
    },
}

impl Directive {
    pub fn position(&self) -> Position {
        match self {
            Directive::Version { position, .. }
            | Directive::Import { position, .. }
            | Directive::Set { position, .. }
            | Directive::Include { position, .. } => *position,
        }
    }
}

/// A dynamic class registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicClass {
    pub name: String,
    pub bases: Vec<String>,
    pub line: usize,
}

/// Rule header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    /// `<Button>`
    Name { name: String },
    /// `<.primary>`
    Class { name: String },
    /// `<MyButton@Button,Behavior>`
    DynamicClass { name: String, bases: Vec<String> },
    /// `<Button,Label>`, the body applies to each name independently
    Multiple { names: Vec<String> },
    /// `<-Button>`
    Avoidance { name: String },
}

impl Selector {
    /// Every class name this selector targets
    pub fn names(&self) -> Vec<&str> {
        match self {
            Selector::Name { name }
            | Selector::Class { name }
            | Selector::DynamicClass { name, .. }
            | Selector::Avoidance { name } => vec![name.as_str()],
            Selector::Multiple { names } => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Selector::Name { .. } => "name",
            Selector::Class { .. } => "class",
            Selector::DynamicClass { .. } => "dynamic-class",
            Selector::Multiple { .. } => "multiple",
            Selector::Avoidance { .. } => "avoidance",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name { name } => write!(f, "<{}>", name),
            Selector::Class { name } => write!(f, "<.{}>", name),
            Selector::DynamicClass { name, bases } => write!(f, "<{}@{}>", name, bases.join(",")),
            Selector::Multiple { names } => write!(f, "<{}>", names.join(",")),
            Selector::Avoidance { name } => write!(f, "<-{}>", name),
        }
    }
}

/// Contents shared by rules, templates and widgets
///
/// Each list keeps source order, but order across lists is not recorded:
/// a property written after a handler cannot be told apart from one written
/// before it, and the serializer emits properties, handlers, canvas blocks
/// and children in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub properties: Vec<Property>,
    pub handlers: Vec<Property>,
    pub children: Vec<Widget>,
    pub canvas: Vec<Canvas>,
}

impl Body {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.handlers.is_empty()
            && self.children.is_empty()
            && self.canvas.is_empty()
    }

    /// Ids declared anywhere below this body
    pub fn declared_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        collect_ids(&self.children, &mut ids);
        ids
    }

    fn compile_bindings(&self, compiler: &PropertyCompiler) {
        for property in self.properties.iter().chain(&self.handlers) {
            property.binding(compiler);
        }
        for canvas in &self.canvas {
            for instruction in &canvas.instructions {
                for property in &instruction.properties {
                    property.binding(compiler);
                }
            }
        }
        for child in &self.children {
            child.body.compile_bindings(compiler);
        }
    }
}

fn collect_ids(widgets: &[Widget], ids: &mut Vec<String>) {
    for widget in widgets {
        if let Some(id) = &widget.id {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        collect_ids(&widget.body.children, ids);
    }
}

/// `<Selector>:` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub selector: Selector,
    pub avoid_previous: bool,
    pub body: Body,
    pub line: usize,
}

/// Deprecated `[Name@Base]:` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub bases: Vec<String>,
    pub body: Body,
    pub line: usize,
}

/// Widget instance: a child in a body, or the module root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub type_name: String,
    pub id: Option<String>,
    pub body: Body,
    pub position: Position,
}

/// `name: value`, also used for `on_*` handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    /// Value text exactly as written after the colon
    pub value: String,
    pub position: Position,
    #[serde(skip)]
    compiled: OnceCell<CompiledValue>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            position,
            compiled: OnceCell::new(),
        }
    }

    pub fn is_handler(&self) -> bool {
        self.name.starts_with("on_")
    }

    /// Compile the value on first use; later calls return the cached result
    pub fn binding(&self, compiler: &PropertyCompiler) -> &CompiledValue {
        self.compiled
            .get_or_init(|| compiler.compile(&self.name, &self.value))
    }

    /// The cached result, if the property has been compiled
    pub fn compiled(&self) -> Option<&CompiledValue> {
        self.compiled.get()
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.position == other.position
    }
}

/// Drawing layer of a canvas block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasLayer {
    Before,
    Main,
    After,
}

impl CanvasLayer {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "canvas.before" => Some(CanvasLayer::Before),
            "canvas" => Some(CanvasLayer::Main),
            "canvas.after" => Some(CanvasLayer::After),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            CanvasLayer::Before => "canvas.before",
            CanvasLayer::Main => "canvas",
            CanvasLayer::After => "canvas.after",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub layer: CanvasLayer,
    pub instructions: Vec<CanvasInstruction>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasInstruction {
    pub type_name: String,
    pub properties: Vec<Property>,
    pub position: Position,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every property up front, scoping each top-level construct with
    /// the ids declared inside it
    pub fn compile_bindings(&self, compiler: &PropertyCompiler) {
        for rule in &self.rules {
            rule.body
                .compile_bindings(&compiler.with_ids(rule.body.declared_ids()));
        }
        for template in &self.templates {
            template
                .body
                .compile_bindings(&compiler.with_ids(template.body.declared_ids()));
        }
        if let Some(root) = &self.root {
            let mut ids = root.body.declared_ids();
            if let Some(id) = &root.id {
                ids.insert(0, id.clone());
            }
            root.body.compile_bindings(&compiler.with_ids(ids));
        }
    }

    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule.selector.names().contains(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(type_name: &str, id: Option<&str>, children: Vec<Widget>) -> Widget {
        Widget {
            type_name: type_name.to_string(),
            id: id.map(str::to_string),
            body: Body {
                children,
                ..Body::default()
            },
            position: Position::new(1, 1),
        }
    }

    #[test]
    fn test_declared_ids_are_collected_depth_first() {
        let body = Body {
            children: vec![
                widget("Label", Some("title"), vec![]),
                widget(
                    "BoxLayout",
                    None,
                    vec![widget("TextInput", Some("name_input"), vec![])],
                ),
            ],
            ..Body::default()
        };

        assert_eq!(body.declared_ids(), vec!["title", "name_input"]);
    }

    #[test]
    fn test_selector_names() {
        let selector = Selector::Multiple {
            names: vec!["Button".to_string(), "Label".to_string()],
        };
        assert_eq!(selector.names(), vec!["Button", "Label"]);
        assert_eq!(selector.to_string(), "<Button,Label>");
    }

    #[test]
    fn test_property_equality_ignores_cache() {
        let a = Property::new("text", "app.title", Position::new(2, 5));
        let b = Property::new("text", "app.title", Position::new(2, 5));
        a.binding(&PropertyCompiler::new());

        assert!(a.compiled().is_some());
        assert!(b.compiled().is_none());
        assert_eq!(a, b);
    }
}
