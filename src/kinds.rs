//! Ordered kind registries mapping item classes to display sections.
//!
//! The same type serves both scopes: the module map groups items
//! (discriminant `section`), the project map groups modules (`type`).

use crate::error::{DocError, Result};
use serde::Serialize;
use std::path::Path;

pub const FUNCTION: &str = "function";
pub const LOCAL_FUNCTION: &str = "local-function";
pub const TABLE: &str = "table";
pub const FIELD: &str = "field";
pub const MODULE: &str = "module";
pub const SCRIPT: &str = "script";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kind {
    pub id: String,
    pub title: String,
    /// Title for parameter-like children ("Parameters", "Fields").
    pub child_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KindRegistry {
    discriminant: &'static str,
    kinds: Vec<Kind>,
}

impl KindRegistry {
    pub fn new(discriminant: &'static str) -> Self {
        Self {
            discriminant,
            kinds: Vec::new(),
        }
    }

    /// Registry for items inside a module.
    pub fn module_map() -> Self {
        let mut map = Self::new("section");
        map.register(FUNCTION, "Functions", Some("Parameters"));
        map.register(TABLE, "Tables", Some("Fields"));
        map.register(FIELD, "Fields", None);
        map.register(LOCAL_FUNCTION, "Local Functions", Some("Parameters"));
        map
    }

    /// Registry for project-level groupings.
    pub fn project_map() -> Self {
        let mut map = Self::new("type");
        map.register(MODULE, "Modules", None);
        map.register(SCRIPT, "Scripts", None);
        map
    }

    /// Register a kind. An existing id keeps its position and takes the new
    /// titles.
    pub fn register(&mut self, id: &str, title: &str, child_title: Option<&str>) {
        let kind = Kind {
            id: id.to_string(),
            title: title.to_string(),
            child_title: child_title.map(str::to_string),
        };
        match self.kinds.iter_mut().find(|k| k.id == id) {
            Some(existing) => *existing = kind,
            None => self.kinds.push(kind),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Kind> {
        self.kinds.iter().find(|k| k.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Kind for an item class. A miss means the kind set is misconfigured.
    pub fn classify(&self, class: &str, file: &Path, line: usize) -> Result<&Kind> {
        self.get(class).ok_or_else(|| DocError::UnknownKind {
            discriminant: self.discriminant,
            class: class.to_string(),
            file: file.to_path_buf(),
            line,
        })
    }

    /// Position of a kind in registration order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.kinds.iter().position(|k| k.id == id)
    }

    pub fn discriminant(&self) -> &'static str {
        self.discriminant
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kind> {
        self.kinds.iter()
    }
}
