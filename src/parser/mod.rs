//! Source languages — tokenizers, doc markers and declaration grammars,
//! dispatched by file extension.

pub mod c;
pub mod lua;

use crate::error::{DocError, Result};
use std::collections::BTreeMap;
use std::path::Path;

// -- Tokens -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    Space,
    Word,
    Str,
    Other,
}

/// A lexical token. `line` is the 1-based line the token starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Line on which the token ends.
    pub fn end_line(&self) -> usize {
        self.line + self.text.matches('\n').count()
    }
}

/// Position tracking shared by the tokenizers.
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn at_start(&self) -> bool {
        self.pos == 0
    }

    /// Consume `len` bytes as one token.
    pub(crate) fn emit(&mut self, kind: TokenKind, len: usize) -> Token {
        let text = &self.src[self.pos..self.pos + len];
        let token = Token {
            kind,
            text: text.to_string(),
            line: self.line,
        };
        self.line += text.matches('\n').count();
        self.pos += len;
        token
    }
}

/// Length of the current line of `rest`, excluding the newline.
pub(crate) fn line_len(rest: &str) -> usize {
    rest.find('\n').unwrap_or(rest.len())
}

// -- Declarations -------------------------------------------------------------

/// A declaration found immediately after a doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Function { params: Vec<String> },
    Table,
    Variable,
}

/// State of the declaration grammar. The scanner feeds significant tokens
/// until the state reaches `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclState {
    AwaitingDecl { local: bool },
    InDecl(PartialDecl),
    Done(Option<Declaration>),
}

impl DeclState {
    pub fn start() -> Self {
        DeclState::AwaitingDecl { local: false }
    }

    /// Finish the state at end of input. Only pending local variables
    /// count as declarations.
    pub fn finish(self) -> Option<Declaration> {
        match self {
            DeclState::Done(decl) => decl,
            DeclState::InDecl(p) if p.phase == Phase::AfterName && p.local => {
                Some(p.into_decl(DeclKind::Variable))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting a dotted name after a `function` keyword.
    Name,
    /// A name was read; waiting for `=`, `(` or the end of the declaration.
    AfterName,
    /// After `=`.
    AfterAssign,
    /// After `= function`, waiting for `(`.
    FuncKeyword,
    /// Inside the parameter list.
    Params,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDecl {
    pub local: bool,
    pub phase: Phase,
    pub name: String,
    /// Words seen before the name (C types and qualifiers).
    pub leading: Vec<String>,
    pub params: Vec<String>,
    /// Words of the parameter currently being read.
    pub segment: Vec<String>,
    pub depth: usize,
}

impl PartialDecl {
    pub fn new(local: bool, phase: Phase, name: &str) -> Self {
        Self {
            local,
            phase,
            name: name.to_string(),
            leading: Vec::new(),
            params: Vec::new(),
            segment: Vec::new(),
            depth: 0,
        }
    }

    pub fn into_decl(self, kind: DeclKind) -> Declaration {
        Declaration {
            name: self.name,
            kind,
            local: self.local,
        }
    }
}

// -- Languages ----------------------------------------------------------------

/// Result of searching a file for a module-defining call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleCall {
    /// `module("name", ...)`
    Named(String),
    /// `module(...)` — the name comes from the file path.
    FromPath,
}

/// Everything the pipeline needs to know about one source language.
pub trait Language: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lazy token stream over `src`.
    fn tokens<'a>(&self, src: &'a str) -> Box<dyn Iterator<Item = Token> + 'a>;

    /// Whether the comment token opens a doc comment.
    fn is_doc_comment(&self, comment: &str) -> bool;

    /// Whether a doc comment ends the block before it and opens a new one.
    fn starts_new_block(&self, comment: &str) -> bool {
        self.is_doc_comment(comment)
    }

    /// Comment text with the comment markers removed.
    fn comment_body(&self, comment: &str) -> String;

    /// One step of the declaration grammar.
    fn advance(&self, state: DeclState, token: &Token) -> DeclState;

    /// Search a token stream for a module-defining call.
    fn module_call(&self, _tokens: &mut dyn Iterator<Item = Token>) -> Option<ModuleCall> {
        None
    }
}

/// Languages by name and the extensions mapped to them.
pub struct LanguageRegistry {
    languages: BTreeMap<&'static str, Box<dyn Language>>,
    extensions: BTreeMap<String, &'static str>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        let mut registry = Self {
            languages: BTreeMap::new(),
            extensions: BTreeMap::new(),
        };
        registry.register(Box::new(lua::Lua));
        registry.register(Box::new(c::CFamily));
        for ext in ["lua", "luadoc"] {
            registry.extensions.insert(ext.to_string(), "lua");
        }
        for ext in ["c", "h", "cc", "cpp", "cxx", "hpp"] {
            registry.extensions.insert(ext.to_string(), "c");
        }
        registry
    }
}

impl LanguageRegistry {
    /// Add a language, replacing one with the same name. Extensions are
    /// mapped separately with [`add_extension`](Self::add_extension).
    pub fn register(&mut self, lang: Box<dyn Language>) {
        self.languages.insert(lang.name(), lang);
    }

    /// Map a file extension to a registered language.
    pub fn add_extension(&mut self, ext: &str, language: &str) -> Result<()> {
        let (&name, _) = self
            .languages
            .get_key_value(language)
            .ok_or_else(|| {
                DocError::Config(format!("unknown language '{}' for .{}", language, ext))
            })?;
        self.extensions
            .insert(ext.trim_start_matches('.').to_string(), name);
        Ok(())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn Language> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        let name = self.extensions.get(ext)?;
        self.languages.get(name).map(|l| l.as_ref())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(|k| k.as_str())
    }
}

/// Contents of a closed string literal token, `None` when it is unterminated.
pub(crate) fn unquote(text: &str) -> Option<&str> {
    let t = text.trim();
    let quote = t.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    t.strip_prefix(quote).and_then(|s| s.strip_suffix(quote))
}
