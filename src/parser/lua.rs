//! Lua tokenizer and declaration grammar.
//!
//! Doc comments start with three or more dashes (`--- Summary.`) or
//! with `--[[--` for long comments. Following `--` lines continue the block.

use super::*;
use regex::Regex;
use std::sync::LazyLock;

static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+").unwrap());

static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9][0-9A-Za-z_.]*").unwrap());

static RE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?)"#).unwrap()
});

static RE_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\.\.\.|\.\.|==|~=|<=|>=|::|(?s).)").unwrap());

static RE_DOC_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^---").unwrap());

static RE_DOC_LONG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--\[=*\[--").unwrap());

static RE_LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-+ ?").unwrap());

static RE_LONG_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--\[=*\[-* ?").unwrap());

static RE_LONG_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]=*\]\s*$").unwrap());

pub struct Lua;

impl Language for Lua {
    fn name(&self) -> &'static str {
        "lua"
    }

    fn tokens<'a>(&self, src: &'a str) -> Box<dyn Iterator<Item = Token> + 'a> {
        Box::new(LuaLexer {
            cur: Cursor::new(src),
        })
    }

    fn is_doc_comment(&self, comment: &str) -> bool {
        RE_DOC_LINE.is_match(comment) || RE_DOC_LONG.is_match(comment)
    }

    fn comment_body(&self, comment: &str) -> String {
        if RE_LONG_OPEN.is_match(comment) && long_bracket_level(&comment[2..]).is_some() {
            let body = RE_LONG_OPEN.replace(comment, "");
            return RE_LONG_CLOSE.replace(&body, "").into_owned();
        }
        RE_LINE_MARKER.replace(comment, "").into_owned()
    }

    fn advance(&self, state: DeclState, token: &Token) -> DeclState {
        match state {
            DeclState::AwaitingDecl { local } => match token.kind {
                TokenKind::Word if token.text == "local" => DeclState::AwaitingDecl { local: true },
                TokenKind::Word if token.text == "function" => {
                    DeclState::InDecl(PartialDecl::new(local, Phase::Name, ""))
                }
                TokenKind::Word if !is_keyword(&token.text) => {
                    DeclState::InDecl(PartialDecl::new(local, Phase::AfterName, &token.text))
                }
                _ => DeclState::Done(None),
            },
            DeclState::InDecl(decl) => advance_decl(decl, token),
            done => done,
        }
    }

    fn module_call(&self, tokens: &mut dyn Iterator<Item = Token>) -> Option<ModuleCall> {
        let mut significant =
            tokens.filter(|t| !matches!(t.kind, TokenKind::Space | TokenKind::Comment));
        let mut previous: Option<Token> = None;
        while let Some(token) = significant.next() {
            let member = previous
                .as_ref()
                .is_some_and(|p| p.is(TokenKind::Other, ".") || p.is(TokenKind::Other, ":"));
            if token.is(TokenKind::Word, "module") && !member {
                let mut next = significant.next()?;
                if next.is(TokenKind::Other, "(") {
                    next = significant.next()?;
                }
                match next.kind {
                    TokenKind::Str => {
                        // unterminated or empty names fall back to the file path
                        let call = match unquote(&next.text) {
                            Some(name) if !name.is_empty() => ModuleCall::Named(name.to_string()),
                            _ => ModuleCall::FromPath,
                        };
                        return Some(call);
                    }
                    TokenKind::Other if next.text == "..." => return Some(ModuleCall::FromPath),
                    _ => {}
                }
                previous = Some(next);
                continue;
            }
            previous = Some(token);
        }
        None
    }
}

fn advance_decl(mut decl: PartialDecl, token: &Token) -> DeclState {
    let text = token.text.as_str();
    match decl.phase {
        Phase::Name => match token.kind {
            TokenKind::Word => {
                decl.name.push_str(text);
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "." || text == ":" => {
                decl.name.push_str(text);
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "(" && !decl.name.is_empty() => {
                decl.phase = Phase::Params;
                DeclState::InDecl(decl)
            }
            _ => DeclState::Done(None),
        },
        Phase::AfterName => {
            let dotted = decl.name.ends_with('.') || decl.name.ends_with(':');
            match token.kind {
                TokenKind::Word if dotted => {
                    decl.name.push_str(text);
                    DeclState::InDecl(decl)
                }
                TokenKind::Other if (text == "." || text == ":") && !dotted => {
                    decl.name.push_str(text);
                    DeclState::InDecl(decl)
                }
                TokenKind::Other if text == "=" => {
                    decl.phase = Phase::AfterAssign;
                    DeclState::InDecl(decl)
                }
                TokenKind::Other if text == "," => {
                    DeclState::Done(Some(decl.into_decl(DeclKind::Variable)))
                }
                // `local x` followed by anything else still declares x
                _ if decl.local && !dotted => {
                    DeclState::Done(Some(decl.into_decl(DeclKind::Variable)))
                }
                _ => DeclState::Done(None),
            }
        }
        Phase::AfterAssign => match token.kind {
            TokenKind::Word if text == "function" => {
                decl.phase = Phase::FuncKeyword;
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "{" => {
                DeclState::Done(Some(decl.into_decl(DeclKind::Table)))
            }
            _ => DeclState::Done(Some(decl.into_decl(DeclKind::Variable))),
        },
        Phase::FuncKeyword => {
            if token.is(TokenKind::Other, "(") {
                decl.phase = Phase::Params;
                DeclState::InDecl(decl)
            } else {
                DeclState::Done(None)
            }
        }
        Phase::Params => match token.kind {
            TokenKind::Word => {
                decl.params.push(text.to_string());
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "..." => {
                decl.params.push(text.to_string());
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == ")" => {
                let params = std::mem::take(&mut decl.params);
                DeclState::Done(Some(decl.into_decl(DeclKind::Function { params })))
            }
            _ => DeclState::InDecl(decl),
        },
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "and" | "break" | "do" | "else" | "elseif" | "end" | "false" | "for" | "goto" | "if"
            | "in" | "nil" | "not" | "or" | "repeat" | "return" | "then" | "true" | "until"
            | "while"
    )
}

/// Level of a long bracket opener (`[[` → 0, `[==[` → 2).
fn long_bracket_level(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('[')?;
    let level = rest.chars().take_while(|&c| c == '=').count();
    rest[level..].starts_with('[').then_some(level)
}

/// Byte length of a long bracket construct starting at `s[offset..]`.
fn long_bracket_len(s: &str, offset: usize, level: usize) -> usize {
    let body = offset + level + 2;
    let close = format!("]{}]", "=".repeat(level));
    s[body..]
        .find(&close)
        .map(|i| body + i + close.len())
        .unwrap_or(s.len())
}

struct LuaLexer<'a> {
    cur: Cursor<'a>,
}

impl Iterator for LuaLexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = self.cur.rest();
        if rest.is_empty() {
            return None;
        }
        if self.cur.at_start() && rest.starts_with("#!") {
            return Some(self.cur.emit(TokenKind::Other, line_len(rest)));
        }
        if let Some(m) = RE_SPACE.find(rest) {
            return Some(self.cur.emit(TokenKind::Space, m.end()));
        }
        if let Some(after) = rest.strip_prefix("--") {
            let len = match long_bracket_level(after) {
                Some(level) => long_bracket_len(rest, 2, level),
                None => line_len(rest),
            };
            return Some(self.cur.emit(TokenKind::Comment, len));
        }
        if let Some(level) = long_bracket_level(rest) {
            return Some(self.cur.emit(TokenKind::Str, long_bracket_len(rest, 0, level)));
        }
        if let Some(m) = RE_QUOTED.find(rest) {
            return Some(self.cur.emit(TokenKind::Str, m.end()));
        }
        if let Some(m) = RE_WORD.find(rest).or_else(|| RE_NUMBER.find(rest)) {
            return Some(self.cur.emit(TokenKind::Word, m.end()));
        }
        let len = RE_OPERATOR.find(rest).map(|m| m.end()).unwrap_or(rest.len());
        Some(self.cur.emit(TokenKind::Other, len))
    }
}
