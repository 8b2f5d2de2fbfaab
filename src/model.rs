//! Document model — files, items, modules and the assembled project.

use crate::kinds;
use crate::parser::{DeclKind, Declaration};
use crate::tags::{Extracted, Tags};
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// A named child of an item: a function parameter or a table field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Return {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub description: String,
}

/// A `@see` reference, linked once resolution finds its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub text: String,
    pub target: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// `module.html#anchor` style target for renderers.
    pub href: String,
}

/// One documented entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
    pub class: String,
    pub summary: String,
    pub description: String,
    pub params: Vec<Param>,
    pub returns: Vec<Return>,
    pub fields: Vec<Param>,
    pub see: Vec<Reference>,
    pub usage: Vec<String>,
    pub raise: Vec<String>,
    pub tags: Tags,
    pub line: usize,
    /// Class or name came from the following declaration, not from tags.
    pub inferred: bool,
    pub file: PathBuf,
}

impl Item {
    /// Build an item from an extracted block and the declaration that
    /// follows it. Returns `None` when no class or name can be derived.
    pub fn build(
        block: Extracted,
        decl: Option<&Declaration>,
        file: PathBuf,
        line: usize,
    ) -> Option<Item> {
        let Extracted {
            summary,
            description,
            mut tags,
            ..
        } = block;
        let mut inferred = false;

        let class = match tags.remove("class") {
            Some(class) => class.first().to_string(),
            None => {
                inferred = true;
                match decl.map(|d| &d.kind) {
                    Some(DeclKind::Function { .. }) => kinds::FUNCTION.to_string(),
                    Some(DeclKind::Table) => kinds::TABLE.to_string(),
                    Some(DeclKind::Variable) => kinds::FIELD.to_string(),
                    None => return None,
                }
            }
        };

        let name = match tags.remove("name").filter(|n| !n.first().is_empty()) {
            Some(name) => name.first().to_string(),
            None => match decl {
                Some(d) if !d.name.is_empty() => {
                    inferred = true;
                    d.name.clone()
                }
                _ => {
                    warn!(
                        file = %file.display(),
                        line,
                        class = %class,
                        "doc block has no name; dropped"
                    );
                    return None;
                }
            },
        };

        let local = tags.contains("local") || decl.is_some_and(|d| d.local);
        let class = if class == kinds::FUNCTION && local {
            kinds::LOCAL_FUNCTION.to_string()
        } else {
            class
        };

        let documented: Vec<Param> = tags
            .values("param")
            .into_iter()
            .filter_map(|v| parse_named(v, false))
            .chain(tags.values("tparam").into_iter().filter_map(|v| parse_named(v, true)))
            .collect();
        let params = match decl.map(|d| &d.kind) {
            Some(DeclKind::Function { params }) => {
                order_params(params, documented, &name, &file, line)
            }
            _ => documented,
        };

        let returns = tags
            .values("return")
            .into_iter()
            .map(|v| Return {
                ty: None,
                description: v.to_string(),
            })
            .chain(tags.values("treturn").into_iter().map(|v| {
                let (ty, rest) = split_word(v);
                Return {
                    ty: Some(ty.to_string()),
                    description: rest.to_string(),
                }
            }))
            .collect();

        let fields = tags
            .values("field")
            .into_iter()
            .filter_map(|v| parse_named(v, false))
            .chain(tags.values("tfield").into_iter().filter_map(|v| parse_named(v, true)))
            .collect();

        let see = tags
            .values("see")
            .into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|text| Reference {
                text: text.to_string(),
                target: None,
            })
            .collect();

        let usage = owned(tags.values("usage"));
        let raise = owned(tags.values("raise"));

        Some(Item {
            name,
            class,
            summary,
            description,
            params,
            returns,
            fields,
            see,
            usage,
            raise,
            tags,
            line,
            inferred,
            file,
        })
    }

    /// A module seed: the doc block of a module or script. The name may be
    /// empty until the resolver infers it.
    pub fn seed(block: Extracted, class: &str, file: PathBuf, line: usize, inferred: bool) -> Item {
        let Extracted {
            summary,
            description,
            mut tags,
            ..
        } = block;
        tags.remove("class");
        let name = tags
            .remove("name")
            .map(|n| n.first().to_string())
            .unwrap_or_default();
        Item {
            name,
            class: class.to_string(),
            summary,
            description,
            params: Vec::new(),
            returns: Vec::new(),
            fields: Vec::new(),
            see: Vec::new(),
            usage: owned(tags.values("usage")),
            raise: Vec::new(),
            tags,
            line,
            inferred,
            file,
        }
    }

    pub fn is_local(&self) -> bool {
        self.class == kinds::LOCAL_FUNCTION
    }
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim()),
        None => (text, ""),
    }
}

/// Parse `name description` (or `type name description` when typed).
fn parse_named(value: &str, typed: bool) -> Option<Param> {
    let (ty, rest) = if typed {
        let (ty, rest) = split_word(value);
        (Some(ty.to_string()), rest)
    } else {
        (None, value)
    };
    let (name, description) = split_word(rest);
    if name.is_empty() {
        return None;
    }
    Some(Param {
        name: name.to_string(),
        ty,
        description: description.to_string(),
    })
}

/// Order documented params by the declared parameter list. Documented
/// params missing from the declaration are appended in tag order.
fn order_params(
    declared: &[String],
    mut documented: Vec<Param>,
    item: &str,
    file: &std::path::Path,
    line: usize,
) -> Vec<Param> {
    let mut ordered = Vec::with_capacity(declared.len().max(documented.len()));
    for name in declared {
        match documented.iter().position(|p| &p.name == name) {
            Some(pos) => ordered.push(documented.remove(pos)),
            None => ordered.push(Param {
                name: name.clone(),
                ty: None,
                description: String::new(),
            }),
        }
    }
    for extra in &documented {
        warn!(
            file = %file.display(),
            line,
            item,
            param = %extra.name,
            "documented parameter is not declared"
        );
    }
    ordered.extend(documented);
    ordered
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub language: &'static str,
    /// Items in discovery order. Items with a project-level class are
    /// module seeds.
    pub items: Vec<Item>,
    /// Module name found from a module-defining call, if any.
    pub module_call: Option<crate::parser::ModuleCall>,
}

impl File {
    pub fn new(path: PathBuf, language: &'static str) -> Self {
        Self {
            path,
            language,
            items: Vec::new(),
            module_call: None,
        }
    }
}

/// Items of one kind inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_title: Option<String>,
    pub items: Vec<Item>,
}

/// A named documentation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub kind: String,
    pub summary: String,
    pub description: String,
    pub tags: Tags,
    pub files: Vec<PathBuf>,
    pub sections: Vec<Section>,
}

impl Module {
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items().find(|i| i.name == name)
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

/// Modules grouped by project-level kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSection {
    pub kind: String,
    pub title: String,
    pub modules: Vec<String>,
}

/// The fully resolved documentation set.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub title: Option<String>,
    pub modules: Vec<Module>,
    pub index: Vec<ProjectSection>,
}

impl Project {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Modules in order, keyed by name.
struct ModuleMap<'a>(&'a [Module]);

impl Serialize for ModuleMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for module in self.0 {
            map.serialize_entry(&module.name, module)?;
        }
        map.end()
    }
}

impl Serialize for Project {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Project", 3)?;
        s.serialize_field("project", &self.title)?;
        s.serialize_field("modules", &ModuleMap(&self.modules))?;
        s.serialize_field("index", &self.index)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{extract, TagRegistry};

    fn build(text: &str, decl: Option<Declaration>) -> Option<Item> {
        let block = extract(text, &TagRegistry::default());
        Item::build(block, decl.as_ref(), PathBuf::from("m.lua"), 1)
    }

    fn func(name: &str, params: &[&str], local: bool) -> Declaration {
        Declaration {
            name: name.into(),
            kind: DeclKind::Function {
                params: params.iter().map(|p| p.to_string()).collect(),
            },
            local,
        }
    }

    #[test]
    fn infers_function_from_declaration() {
        let decl = func("add", &["a", "b"], false);
        let item = build("Add.\n@param a x\n@param b y", Some(decl)).unwrap();
        assert_eq!(item.class, "function");
        assert_eq!(item.name, "add");
        assert!(item.inferred);
        let names: Vec<_> = item.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        let descriptions: Vec<_> = item.params.iter().map(|p| p.description.as_str()).collect();
        assert_eq!(descriptions, ["x", "y"]);
    }

    #[test]
    fn params_follow_declaration_order() {
        let decl = func("f", &["a", "b", "c"], false);
        let text = "F.\n@param b second\n@param a first\n@param z extra";
        let item = build(text, Some(decl)).unwrap();
        let names: Vec<_> = item.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "z"]);
        assert_eq!(item.params[2].description, "");
    }

    #[test]
    fn local_functions_are_reclassified() {
        let item = build("Helper.", Some(func("helper", &[], true))).unwrap();
        assert_eq!(item.class, "local-function");
        let item = build("Helper.\n@local", Some(func("helper", &[], false))).unwrap();
        assert!(item.is_local());
    }

    #[test]
    fn explicit_tags_are_not_inferred() {
        let text = "Config.\n@table config\n@field debug enable logging\n\
                    @tfield number level verbosity";
        let item = build(text, None).unwrap();
        assert_eq!(item.class, "table");
        assert_eq!(item.name, "config");
        assert!(!item.inferred);
        assert_eq!(item.fields.len(), 2);
        assert_eq!(item.fields[1].ty.as_deref(), Some("number"));
        assert_eq!(item.fields[1].name, "level");
    }

    #[test]
    fn typed_returns_and_references() {
        let text = "F.\n@function f\n@treturn string the result\n@see g, other.h";
        let item = build(text, None).unwrap();
        assert_eq!(item.returns[0].ty.as_deref(), Some("string"));
        assert_eq!(item.returns[0].description, "the result");
        let refs: Vec<_> = item.see.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(refs, ["g", "other.h"]);
    }

    #[test]
    fn blocks_without_class_or_name_are_dropped() {
        assert!(build("Just commentary.", None).is_none());
        assert!(build("@class function", None).is_none());
    }
}
