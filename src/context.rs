//! Run context: the registries, options and scanned files for one run.

use crate::config::Config;
use crate::error::{DocError, Result};
use crate::kinds::{self, KindRegistry};
use crate::model::{File, Item, Project};
use crate::parser::LanguageRegistry;
use crate::resolver::{self, ResolveOptions};
use crate::scanner::Scanner;
use crate::tags::{extract, TagRegistry, TagSpec};
use std::path::Path;
use tracing::debug;

pub struct Context {
    pub languages: LanguageRegistry,
    pub tags: TagRegistry,
    pub module_kinds: KindRegistry,
    pub project_kinds: KindRegistry,
    pub options: ResolveOptions,
    files: Vec<File>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            languages: LanguageRegistry::default(),
            tags: TagRegistry::default(),
            module_kinds: KindRegistry::module_map(),
            project_kinds: KindRegistry::project_map(),
            options: ResolveOptions::default(),
            files: Vec::new(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the hooks and options a config file declares.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut ctx = Self::default();
        ctx.apply(config)?;
        Ok(ctx)
    }

    pub fn apply(&mut self, config: &Config) -> Result<()> {
        for (from, to) in &config.aliases {
            self.alias(from, to);
        }
        for tag in &config.tags {
            self.add_tag(&tag.name, tag.project);
        }
        for ty in &config.types {
            self.new_type(&ty.id, &ty.title, ty.project, ty.child_title.as_deref());
        }
        for section in &config.sections {
            self.add_section(&section.id, &section.title, section.child_title.as_deref());
        }
        for (ext, language) in &config.extensions {
            self.add_language(ext, language)?;
        }
        if config.project.is_some() {
            self.options.title = config.project.clone();
        }
        if config.package.is_some() {
            self.options.package = config.package.clone();
        }
        self.options.all |= config.all;
        Ok(())
    }

    pub fn alias(&mut self, from: &str, to: &str) {
        self.tags.alias(from, to);
    }

    /// Register a tag. A project-level tag opens a module of its own kind,
    /// titled after the tag unless a type already registered it.
    pub fn add_tag(&mut self, name: &str, project_level: bool) {
        if project_level && !self.project_kinds.contains(name) {
            self.project_kinds.register(name, &title_case(name), None);
        }
        self.tags.add(
            name,
            TagSpec {
                project_level,
                shorthand: false,
            },
        );
    }

    /// Register a kind and its `@ID NAME` shorthand tag.
    pub fn new_type(
        &mut self,
        id: &str,
        title: &str,
        project_level: bool,
        child_title: Option<&str>,
    ) {
        let registry = if project_level {
            &mut self.project_kinds
        } else {
            &mut self.module_kinds
        };
        registry.register(id, title, child_title);
        self.tags.add(
            id,
            TagSpec {
                project_level,
                shorthand: true,
            },
        );
    }

    /// Register a module section reached through `@class ID`.
    pub fn add_section(&mut self, id: &str, title: &str, child_title: Option<&str>) {
        self.module_kinds.register(id, title, child_title);
    }

    /// Map a file extension to a registered language.
    pub fn add_language(&mut self, extension: &str, language: &str) -> Result<()> {
        self.languages.add_extension(extension, language)
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Whether `path` has an extension some language handles.
    pub fn supports(&self, path: &Path) -> bool {
        self.languages.for_path(path).is_some()
    }

    /// Scan one source file into items. Files are resolved in the order
    /// they are scanned.
    pub fn scan_file(&mut self, path: &Path, src: &str) -> Result<()> {
        let lang = self
            .languages
            .for_path(path)
            .ok_or_else(|| DocError::UnsupportedFile(path.to_path_buf()))?;
        let mut file = File::new(path.to_path_buf(), lang.name());

        for block in Scanner::new(lang, src, path) {
            let block = block?;
            let extracted = extract(&block.text, &self.tags);
            let class = extracted.tags.get_str("class").map(str::to_string);
            let project_class = extracted
                .project_tag()
                .or(class.as_deref())
                .filter(|c| self.project_kinds.contains(c))
                .map(str::to_string);

            if block.first && project_class.is_none() {
                let mut rest = lang.tokens(src).filter(|t| t.line > block.end_line);
                file.module_call = lang.module_call(&mut rest);
            }

            let item = match project_class {
                Some(class) => Some(Item::seed(
                    extracted,
                    &class,
                    path.to_path_buf(),
                    block.line,
                    false,
                )),
                None if block.first && class.is_none() && block.declaration.is_none() => {
                    Some(Item::seed(
                        extracted,
                        kinds::MODULE,
                        path.to_path_buf(),
                        block.line,
                        true,
                    ))
                }
                None => Item::build(
                    extracted,
                    block.declaration.as_ref(),
                    path.to_path_buf(),
                    block.line,
                ),
            };
            file.items.extend(item);
        }

        debug!(file = %path.display(), items = file.items.len(), "scanned");
        self.files.push(file);
        Ok(())
    }

    /// Build the project from every scanned file.
    pub fn resolve(&self) -> Result<Project> {
        resolver::resolve(&self.files, &self.module_kinds, &self.project_kinds, &self.options)
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(sources: &[(&str, &str)]) -> Project {
        let mut ctx = Context::new();
        for (path, src) in sources {
            ctx.scan_file(Path::new(path), src).unwrap();
        }
        ctx.resolve().unwrap()
    }

    #[test]
    fn scans_module_with_functions() {
        let src = "\
--- String helpers.
-- Small utilities.
-- @module strings

--- Trim whitespace.
-- @param s the string
-- @treturn string trimmed copy
function M.trim(s) end

--- Internal.
local function pad(s, n) end
";
        let project = project(&[("strings.lua", src)]);
        let module = project.module("strings").unwrap();
        assert_eq!(module.summary, "String helpers.");
        assert_eq!(module.description, "Small utilities.");
        let trim = module.item("trim").unwrap();
        assert_eq!(trim.params[0].name, "s");
        assert_eq!(trim.returns[0].ty.as_deref(), Some("string"));
        assert!(module.item("pad").is_none());
    }

    #[test]
    fn first_block_without_tags_documents_the_module() {
        let src = "--- Path handling.\n\n--- Join paths.\nfunction join(a, b) end\n";
        let project = project(&[("path.lua", src)]);
        let module = project.module("path").unwrap();
        assert_eq!(module.summary, "Path handling.");
        assert!(module.item("join").is_some());
    }

    #[test]
    fn module_call_names_the_module() {
        let src = "--- Legacy module.\nmodule(\"old.style\", package.seeall)\n\n\
                   --- F.\nfunction f() end\n";
        let project = project(&[("x.lua", src)]);
        assert_eq!(project.modules[0].name, "old.style");
        assert_eq!(project.modules[0].summary, "Legacy module.");
    }

    #[test]
    fn broken_module_call_falls_back_to_file_name() {
        let sources = [
            "--- Doc.\nmodule \"café\n",
            "--- Doc.\nmodule 'abc\n",
            "--- Doc.\nmodule(\"\")\n",
        ];
        for src in sources {
            let project = project(&[("x.lua", src)]);
            let names: Vec<_> = project.modules.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, ["x"], "{src}");
        }
    }

    #[test]
    fn project_level_tag_opens_a_module() {
        let mut ctx = Context::new();
        ctx.add_tag("topic", true);
        let src = "--- Intro.\n-- @topic intro\n\n--- F.\nfunction f() end\n";
        ctx.scan_file(Path::new("t.lua"), src).unwrap();
        let project = ctx.resolve().unwrap();
        let modules: Vec<_> = project
            .modules
            .iter()
            .map(|m| (m.name.as_str(), m.kind.as_str()))
            .collect();
        assert_eq!(modules, [("intro", "topic")]);
        assert!(project.modules[0].item("f").is_some());
        assert_eq!(project.index[0].title, "Topic");
    }

    #[test]
    fn shorthand_prose_stays_out_of_names() {
        let src = "\
--- Utilities.
-- @module util

-- private helpers below
local x = 1

-- @function add
-- Adds two numbers together.
";
        let project = project(&[("u.lua", src)]);
        let module = project.module("util").unwrap();
        let names: Vec<_> = module.items().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["add"]);
        assert_eq!(module.item("add").unwrap().description, "Adds two numbers together.");
    }

    #[test]
    fn tagless_blocks_after_the_first_are_dropped() {
        let src = "\
--- Core.
-- @module core

--- Just a remark about what follows.

--- Start the engine.
function start() end
";
        let mut ctx = Context::new();
        ctx.scan_file(Path::new("core.lua"), src).unwrap();
        let items: Vec<_> = ctx.files()[0]
            .items
            .iter()
            .map(|i| (i.name.as_str(), i.class.as_str()))
            .collect();
        assert_eq!(items, [("core", "module"), ("start", "function")]);
    }

    #[test]
    fn structural_error_carries_location() {
        let mut ctx = Context::new();
        let err = ctx.scan_file(Path::new("bad.lua"), "local x\n-- nope\n").unwrap_err();
        assert_eq!(err.to_string(), "bad.lua:2: first comment is not a doc comment");
    }

    #[test]
    fn unsupported_extension() {
        let mut ctx = Context::new();
        assert!(matches!(
            ctx.scan_file(Path::new("x.py"), "# hi"),
            Err(DocError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn new_type_adds_section_and_shorthand() {
        let mut ctx = Context::new();
        ctx.new_type("event", "Events", false, Some("Payload"));
        let src = "--- Events.\n-- @module ev\n\n--- Fired on close.\n-- @event closed\n";
        ctx.scan_file(Path::new("ev.lua"), src).unwrap();
        let project = ctx.resolve().unwrap();
        let section = project.module("ev").unwrap().section("Events").unwrap();
        assert_eq!(section.items[0].name, "closed");
        assert_eq!(section.child_title.as_deref(), Some("Payload"));
    }

    #[test]
    fn aliases_and_config_hooks() {
        let config = Config::parse(
            "project = \"demo\"\n[aliases]\narg = \"param\"\n[extensions]\nrockspec = \"lua\"\n",
        )
        .unwrap();
        let mut ctx = Context::from_config(&config).unwrap();
        assert!(ctx.supports(Path::new("a.rockspec")));
        let src = "--- M.\n-- @module m\n\n--- F.\n-- @arg x the x\nfunction f(x) end\n";
        ctx.scan_file(Path::new("m.lua"), src).unwrap();
        let project = ctx.resolve().unwrap();
        assert_eq!(project.title.as_deref(), Some("demo"));
        assert_eq!(project.module("m").unwrap().item("f").unwrap().params[0].description, "the x");
    }

    #[test]
    fn unknown_language_in_config_fails() {
        let config = Config::parse("[extensions]\nmoon = \"moonscript\"\n").unwrap();
        assert!(matches!(Context::from_config(&config), Err(DocError::Config(_))));
    }

    #[test]
    fn c_sources_document_functions() {
        let src = "\
/** Core API.
 * @module core
 */

/** Open a handle.
 * @param path file path
 */
int core_open(const char *path);
";
        let project = project(&[("core.c", src)]);
        let open = project.module("core").unwrap().item("core_open").unwrap();
        assert_eq!(open.class, "function");
        assert_eq!(open.params[0].description, "file path");
    }
}
