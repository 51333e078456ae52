//! Widget and property lookup consumed by the validator

use crate::kivy::{CANVAS_INSTRUCTIONS, KIVY_WIDGETS};
use indexmap::IndexMap;
use serde::Serialize;

/// Declared type of a widget property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyKind {
    Numeric,
    String,
    Object,
    Boolean,
    List,
    Dict,
    Alias,
    ReferenceList,
    Option,
    Color,
    BoundedNumeric,
    VariableList,
}

/// What the validator needs to know about widget classes
pub trait WidgetRegistry {
    fn class_exists(&self, class_name: &str) -> bool;

    /// The kind of `property_name` on `class_name` or any of its ancestors
    fn resolve_property_kind(&self, property_name: &str, class_name: &str) -> Option<PropertyKind>;

    fn property_exists_on(&self, property_name: &str, class_name: &str) -> bool {
        self.resolve_property_kind(property_name, class_name).is_some()
    }

    /// Every property reachable on `class_name`, own properties first
    fn property_names(&self, class_name: &str) -> Vec<String>;

    fn class_names(&self) -> Vec<String>;

    fn is_canvas_instruction(&self, name: &str) -> bool;

    fn canvas_instructions(&self) -> Vec<String>;
}

/// One row of a widget table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetInfo<'t> {
    pub name: &'t str,
    pub parent: Option<&'t str>,
    pub properties: &'t [(&'t str, PropertyKind)],
}

/// Registry over read-only tables, resolving inheritance through `parent`
#[derive(Debug, Clone)]
pub struct StaticRegistry<'t> {
    widgets: IndexMap<&'t str, &'t WidgetInfo<'t>>,
    instructions: &'t [&'t str],
}

impl<'t> StaticRegistry<'t> {
    pub fn new(widgets: &'t [WidgetInfo<'t>], instructions: &'t [&'t str]) -> Self {
        Self {
            widgets: widgets.iter().map(|info| (info.name, info)).collect(),
            instructions,
        }
    }

    /// `class_name` followed by its ancestors that are in the table
    fn lineage(&self, class_name: &str) -> Vec<&'t WidgetInfo<'t>> {
        let mut chain: Vec<&'t WidgetInfo<'t>> = Vec::new();
        let mut current = self.widgets.get(class_name).copied();
        while let Some(info) = current {
            if chain.iter().any(|seen| seen.name == info.name) {
                break;
            }
            chain.push(info);
            current = info.parent.and_then(|parent| self.widgets.get(parent).copied());
        }
        chain
    }
}

impl StaticRegistry<'static> {
    /// Registry over the bundled Kivy widget and instruction tables
    pub fn kivy() -> Self {
        Self::new(KIVY_WIDGETS, CANVAS_INSTRUCTIONS)
    }
}

impl WidgetRegistry for StaticRegistry<'_> {
    fn class_exists(&self, class_name: &str) -> bool {
        self.widgets.contains_key(class_name)
    }

    fn resolve_property_kind(&self, property_name: &str, class_name: &str) -> Option<PropertyKind> {
        self.lineage(class_name).into_iter().find_map(|info| {
            info.properties
                .iter()
                .find(|(name, _)| *name == property_name)
                .map(|(_, kind)| *kind)
        })
    }

    fn property_names(&self, class_name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for info in self.lineage(class_name) {
            for (name, _) in info.properties {
                if !names.iter().any(|seen| seen == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    fn class_names(&self) -> Vec<String> {
        self.widgets.keys().map(|name| name.to_string()).collect()
    }

    fn is_canvas_instruction(&self, name: &str) -> bool {
        self.instructions.iter().any(|instruction| *instruction == name)
    }

    fn canvas_instructions(&self) -> Vec<String> {
        self.instructions.iter().map(|name| name.to_string()).collect()
    }
}
