//! Module resolution: per-file module discovery, cross-file merging of
//! same-named modules, `@see` resolution and grouping into sections.

use crate::error::Result;
use crate::kinds::{self, KindRegistry};
use crate::links;
use crate::model::*;
use crate::parser::ModuleCall;
use crate::tags::Tags;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Caller-controlled resolution settings.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Keep local functions.
    pub all: bool,
    /// Package root for path-derived module names.
    pub package: Option<PathBuf>,
    pub title: Option<String>,
}

/// Module discovery state for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discovery {
    Searching,
    FoundExplicit,
    FoundInferred,
    Closed,
}

/// A module while items are still being collected.
#[derive(Debug)]
struct ModuleBuilder {
    name: String,
    kind: String,
    summary: String,
    description: String,
    tags: Tags,
    files: Vec<PathBuf>,
    items: Vec<Item>,
}

impl ModuleBuilder {
    fn new(name: String, kind: &str, file: &Path) -> Self {
        Self {
            name,
            kind: kind.to_string(),
            summary: String::new(),
            description: String::new(),
            tags: Tags::default(),
            files: vec![file.to_path_buf()],
            items: Vec::new(),
        }
    }

    /// Take the seed's doc text, keeping what is already set.
    fn absorb_doc(&mut self, seed: &Item) {
        if self.summary.is_empty() {
            self.summary = seed.summary.clone();
        }
        if self.description.is_empty() {
            self.description = seed.description.clone();
        }
        self.tags.fill_missing(&seed.tags);
    }

    /// Extend with a later module of the same name.
    fn merge(&mut self, other: ModuleBuilder) {
        if other.kind != self.kind {
            warn!(
                module = %self.name,
                kept = %self.kind,
                dropped = %other.kind,
                "module redeclared with a different kind"
            );
        }
        if self.summary.is_empty() {
            self.summary = other.summary;
        }
        if self.description.is_empty() {
            self.description = other.description;
        }
        self.tags.fill_missing(&other.tags);
        for file in other.files {
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
        self.items.extend(other.items);
    }
}

/// Build the project from scanned files, in file order.
pub fn resolve(
    files: &[File],
    module_kinds: &KindRegistry,
    project_kinds: &KindRegistry,
    options: &ResolveOptions,
) -> Result<Project> {
    let mut builders: Vec<ModuleBuilder> = Vec::new();
    for file in files {
        builders.extend(discover(file, project_kinds, options));
    }
    let mut builders = merge(builders);

    if !options.all {
        for module in &mut builders {
            module.items.retain(|item| !item.is_local());
        }
    }

    resolve_references(&mut builders);

    let mut modules = Vec::with_capacity(builders.len());
    for builder in builders {
        modules.push(classify(builder, module_kinds)?);
    }
    let index = project_index(&modules, project_kinds)?;

    Ok(Project {
        title: options.title.clone(),
        modules,
        index,
    })
}

/// Split one file's items into modules.
fn discover(
    file: &File,
    project_kinds: &KindRegistry,
    options: &ResolveOptions,
) -> Vec<ModuleBuilder> {
    let mut modules: Vec<ModuleBuilder> = Vec::new();
    let mut state = Discovery::Searching;

    for item in &file.items {
        if project_kinds.contains(&item.class) {
            let explicit = !item.inferred;
            let name = if item.name.is_empty() {
                inferred_name(file, options)
            } else {
                item.name.clone()
            };
            // A module tag after an inferred module doc names that module.
            let rename = explicit && state == Discovery::FoundInferred;
            match modules.last_mut() {
                Some(current) if rename => {
                    current.name = name;
                    current.kind = item.class.clone();
                    current.absorb_doc(item);
                }
                _ => {
                    let mut module = ModuleBuilder::new(name, &item.class, &file.path);
                    module.absorb_doc(item);
                    modules.push(module);
                }
            }
            state = if explicit {
                Discovery::FoundExplicit
            } else {
                Discovery::FoundInferred
            };
            continue;
        }

        if state == Discovery::Searching || modules.is_empty() {
            let name = inferred_name(file, options);
            debug!(file = %file.path.display(), module = %name, "no module declaration; inferred");
            modules.push(ModuleBuilder::new(name, kinds::MODULE, &file.path));
        }
        if let Some(current) = modules.last_mut() {
            let mut item = item.clone();
            item.name = local_name(&item.name, &current.name);
            current.items.push(item);
        }
        state = Discovery::Closed;
    }

    modules
}

/// Module name from a `module(...)` call, else from the file path.
fn inferred_name(file: &File, options: &ResolveOptions) -> String {
    match &file.module_call {
        Some(ModuleCall::Named(name)) => name.clone(),
        Some(ModuleCall::FromPath) | None => {
            path_module_name(&file.path, options.package.as_deref())
        }
    }
}

/// Dotted module name for a path relative to the package root:
/// `pkg/sub/mod.lua` → `pkg.sub.mod`, `pkg/sub/init.lua` → `pkg.sub`.
/// Without a package root only the file stem is used.
pub fn path_module_name(path: &Path, package: Option<&Path>) -> String {
    let relative = match package {
        Some(root) => {
            let (path, root) = (without_cur_dir(path), without_cur_dir(root));
            match path.strip_prefix(&root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => {
                    warn!(
                        file = %path.display(),
                        package = %root.display(),
                        "file is outside the package root"
                    );
                    path
                }
            }
        }
        None => PathBuf::from(path.file_name().unwrap_or(path.as_os_str())),
    };
    let mut parts: Vec<String> = relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| p == "init") {
        parts.pop();
    }
    if parts.is_empty() {
        return path.to_string_lossy().to_string();
    }
    parts.join(".")
}

/// `./lib/x.lua` and `lib/x.lua` compare equal once `.` components are gone.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Strip a module-table prefix (`M.add` → `add` in module `util`) when the
/// prefix is the module's last name segment or a conventional `M`/`_M`.
fn local_name(name: &str, module: &str) -> String {
    let Some(pos) = name.find(['.', ':']) else {
        return name.to_string();
    };
    let (prefix, rest) = (&name[..pos], &name[pos + 1..]);
    let last = module.rsplit('.').next().unwrap_or(module);
    let module_table = prefix == last || prefix == "M" || prefix == "_M";
    if !rest.is_empty() && module_table && !rest.contains(':') {
        rest.to_string()
    } else {
        name.to_string()
    }
}

/// Merge same-named modules. The first one seen is the base.
fn merge(builders: Vec<ModuleBuilder>) -> Vec<ModuleBuilder> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, ModuleBuilder> = HashMap::new();

    for builder in builders {
        match by_name.get_mut(&builder.name) {
            Some(existing) => {
                debug!(module = %builder.name, "merging module declared in several places");
                existing.merge(builder);
            }
            None => {
                order.push(builder.name.clone());
                by_name.insert(builder.name.clone(), builder);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}

/// Link every `@see` reference that names a known item or module.
fn resolve_references(modules: &mut [ModuleBuilder]) {
    // item name → modules defining it, in module order
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for module in modules.iter() {
        for item in &module.items {
            index
                .entry(item.name.clone())
                .or_default()
                .push(module.name.clone());
        }
    }
    let module_names: Vec<String> = modules.iter().map(|m| m.name.clone()).collect();

    for module in modules.iter_mut() {
        for item in &mut module.items {
            for reference in &mut item.see {
                reference.target =
                    resolve_one(&reference.text, &module.name, &index, &module_names);
                if reference.target.is_none() && !links::is_external(&reference.text) {
                    warn!(
                        file = %item.file.display(),
                        line = item.line,
                        reference = %reference.text,
                        "unresolved reference"
                    );
                }
            }
        }
    }
}

fn resolve_one(
    text: &str,
    current: &str,
    index: &HashMap<String, Vec<String>>,
    module_names: &[String],
) -> Option<Link> {
    let defines = |module: &str, item: &str| {
        index.get(item).is_some_and(|mods| mods.iter().any(|m| m == module))
    };
    if links::is_external(text) {
        return None;
    }
    let item_link = |module: &str, item: &str| Link {
        module: module.to_string(),
        item: Some(item.to_string()),
        href: links::href(module, Some(item)),
    };

    if defines(current, text) {
        return Some(item_link(current, text));
    }
    if let Some(module) = index.get(text).and_then(|mods| mods.first()) {
        return Some(item_link(module, text));
    }
    if module_names.iter().any(|m| m == text) {
        return Some(Link {
            module: text.to_string(),
            item: None,
            href: links::href(text, None),
        });
    }
    let pos = text.rfind(['.', ':'])?;
    let (module, item) = (&text[..pos], &text[pos + 1..]);
    defines(module, item).then(|| item_link(module, item))
}

/// Group a module's items into sections in kind registration order.
fn classify(builder: ModuleBuilder, module_kinds: &KindRegistry) -> Result<Module> {
    let mut sections: Vec<(usize, Section)> = Vec::new();
    for item in builder.items {
        let kind = module_kinds.classify(&item.class, &item.file, item.line)?;
        let position = module_kinds.position(&kind.id).unwrap_or(usize::MAX);
        match sections.iter_mut().find(|(_, s)| s.kind == kind.id) {
            Some((_, section)) => section.items.push(item),
            None => sections.push((
                position,
                Section {
                    kind: kind.id.clone(),
                    title: kind.title.clone(),
                    child_title: kind.child_title.clone(),
                    items: vec![item],
                },
            )),
        }
    }
    sections.sort_by_key(|(position, _)| *position);

    Ok(Module {
        name: builder.name,
        kind: builder.kind,
        summary: builder.summary,
        description: builder.description,
        tags: builder.tags,
        files: builder.files,
        sections: sections.into_iter().map(|(_, s)| s).collect(),
    })
}

/// Group modules by project-level kind.
fn project_index(modules: &[Module], project_kinds: &KindRegistry) -> Result<Vec<ProjectSection>> {
    let mut index: Vec<ProjectSection> = project_kinds
        .iter()
        .map(|kind| ProjectSection {
            kind: kind.id.clone(),
            title: kind.title.clone(),
            modules: Vec::new(),
        })
        .collect();
    for module in modules {
        let file = module.files.first().map(PathBuf::as_path).unwrap_or(Path::new(""));
        let kind = project_kinds.classify(&module.kind, file, 0)?;
        if let Some(section) = index.iter_mut().find(|s| s.kind == kind.id) {
            section.modules.push(module.name.clone());
        }
    }
    index.retain(|s| !s.modules.is_empty());
    Ok(index)
}
