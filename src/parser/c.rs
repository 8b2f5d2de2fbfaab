//! C-family tokenizer and declaration grammar.
//!
//! Doc comments are `/** ... */` blocks or runs of `///` lines.

use super::*;
use regex::Regex;
use std::sync::LazyLock;

static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+").unwrap());

static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*|[0-9][0-9A-Za-z_.]*)").unwrap());

static RE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?)"#).unwrap()
});

static RE_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:->|::|\.\.\.|(?s).)").unwrap());

static RE_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*define\s+([A-Za-z_]\w*)(\(([^)]*)\))?").unwrap()
});

static RE_BLOCK_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/\*+ ?").unwrap());

static RE_BLOCK_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\*+/$").unwrap());

static RE_BLOCK_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\* ?").unwrap());

static RE_LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^//+ ?").unwrap());

pub struct CFamily;

impl Language for CFamily {
    fn name(&self) -> &'static str {
        "c"
    }

    fn tokens<'a>(&self, src: &'a str) -> Box<dyn Iterator<Item = Token> + 'a> {
        Box::new(CLexer {
            cur: Cursor::new(src),
        })
    }

    fn is_doc_comment(&self, comment: &str) -> bool {
        (comment.starts_with("/**") && comment != "/**/") || comment.starts_with("///")
    }

    // Runs of `///` lines form one block.
    fn starts_new_block(&self, comment: &str) -> bool {
        comment.starts_with("/**")
    }

    fn comment_body(&self, comment: &str) -> String {
        if comment.starts_with("/*") {
            let inner = RE_BLOCK_OPEN.replace(comment, "");
            let inner = RE_BLOCK_CLOSE.replace(&inner, "");
            return inner
                .lines()
                .map(|line| RE_BLOCK_STAR.replace(line, "").into_owned())
                .collect::<Vec<_>>()
                .join("\n");
        }
        RE_LINE_MARKER.replace(comment, "").into_owned()
    }

    fn advance(&self, state: DeclState, token: &Token) -> DeclState {
        match state {
            DeclState::AwaitingDecl { local } => match token.kind {
                TokenKind::Word if token.text == "static" => {
                    DeclState::AwaitingDecl { local: true }
                }
                TokenKind::Word if is_qualifier(&token.text) => DeclState::AwaitingDecl { local },
                TokenKind::Word if is_statement(&token.text) => DeclState::Done(None),
                TokenKind::Word => {
                    DeclState::InDecl(PartialDecl::new(local, Phase::AfterName, &token.text))
                }
                TokenKind::Other if token.text.starts_with('#') => {
                    DeclState::Done(define(&token.text))
                }
                _ => DeclState::Done(None),
            },
            DeclState::InDecl(decl) => advance_decl(decl, token),
            done => done,
        }
    }
}

fn advance_decl(mut decl: PartialDecl, token: &Token) -> DeclState {
    let text = token.text.as_str();
    match decl.phase {
        Phase::Params => match token.kind {
            TokenKind::Word => {
                decl.segment.push(text.to_string());
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "(" => {
                decl.depth += 1;
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == ")" && decl.depth > 0 => {
                decl.depth -= 1;
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == ")" => {
                flush_param(&mut decl);
                let params = std::mem::take(&mut decl.params);
                DeclState::Done(Some(decl.into_decl(DeclKind::Function { params })))
            }
            TokenKind::Other if text == "," && decl.depth == 0 => {
                flush_param(&mut decl);
                DeclState::InDecl(decl)
            }
            TokenKind::Other if text == "..." && decl.depth == 0 => {
                decl.segment = vec![text.to_string()];
                DeclState::InDecl(decl)
            }
            _ => DeclState::InDecl(decl),
        },
        _ => match token.kind {
            TokenKind::Word => {
                if !decl.name.is_empty() {
                    let previous = std::mem::take(&mut decl.name);
                    decl.leading.push(previous);
                }
                decl.name = text.to_string();
                DeclState::InDecl(decl)
            }
            TokenKind::Other if matches!(text, "*" | "&" | "::" | "<" | ">") => {
                DeclState::InDecl(decl)
            }
            TokenKind::Other if decl.name.is_empty() || is_aggregate(&decl.name) => {
                DeclState::Done(None)
            }
            TokenKind::Other if text == "(" => {
                decl.phase = Phase::Params;
                DeclState::InDecl(decl)
            }
            TokenKind::Other if matches!(text, "=" | ";" | "[" | ",") => {
                DeclState::Done(Some(decl.into_decl(DeclKind::Variable)))
            }
            TokenKind::Other if text == "{" && decl.leading.iter().any(|w| is_aggregate(w)) => {
                DeclState::Done(Some(decl.into_decl(DeclKind::Table)))
            }
            _ => DeclState::Done(None),
        },
    }
}

fn flush_param(decl: &mut PartialDecl) {
    let segment = std::mem::take(&mut decl.segment);
    match segment.as_slice() {
        [] => {}
        [only] if only == "void" => {}
        [.., last] => decl.params.push(last.clone()),
    }
}

/// `#define NAME` / `#define NAME(a, b)` as a declaration.
fn define(line: &str) -> Option<Declaration> {
    let caps = RE_DEFINE.captures(line)?;
    let kind = match caps.get(3) {
        Some(params) => DeclKind::Function {
            params: params
                .as_str()
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        },
        None => DeclKind::Variable,
    };
    Some(Declaration {
        name: caps[1].to_string(),
        kind,
        local: false,
    })
}

fn is_qualifier(word: &str) -> bool {
    matches!(
        word,
        "extern" | "inline" | "const" | "volatile" | "typedef" | "LUALIB_API" | "LUA_API"
    )
}

fn is_statement(word: &str) -> bool {
    matches!(
        word,
        "return" | "if" | "else" | "for" | "while" | "do" | "switch" | "case" | "break" | "goto"
    )
}

fn is_aggregate(word: &str) -> bool {
    matches!(word, "struct" | "union" | "enum" | "class")
}

struct CLexer<'a> {
    cur: Cursor<'a>,
}

impl Iterator for CLexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = self.cur.rest();
        if rest.is_empty() {
            return None;
        }
        if let Some(m) = RE_SPACE.find(rest) {
            return Some(self.cur.emit(TokenKind::Space, m.end()));
        }
        if rest.starts_with("//") {
            return Some(self.cur.emit(TokenKind::Comment, line_len(rest)));
        }
        if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            return Some(self.cur.emit(TokenKind::Comment, len));
        }
        if rest.starts_with('#') {
            return Some(self.cur.emit(TokenKind::Other, line_len(rest)));
        }
        if let Some(m) = RE_QUOTED.find(rest) {
            return Some(self.cur.emit(TokenKind::Str, m.end()));
        }
        if let Some(m) = RE_WORD.find(rest) {
            return Some(self.cur.emit(TokenKind::Word, m.end()));
        }
        let len = RE_OPERATOR.find(rest).map(|m| m.end()).unwrap_or(rest.len());
        Some(self.cur.emit(TokenKind::Other, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(src: &str) -> Option<Declaration> {
        let mut state = DeclState::start();
        for token in CFamily.tokens(src).filter(|t| t.kind != TokenKind::Space) {
            state = CFamily.advance(state, &token);
            if let DeclState::Done(decl) = state {
                return decl;
            }
        }
        state.finish()
    }

    #[test]
    fn tokenizes_block_and_line_comments() {
        let tokens: Vec<_> = CFamily
            .tokens("/** Doc.\n * @param x y\n */\nint f(int x); // tail")
            .filter(|t| t.kind == TokenKind::Comment)
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].end_line(), 3);
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn doc_markers_and_bodies() {
        assert!(CFamily.is_doc_comment("/** doc */"));
        assert!(CFamily.is_doc_comment("/// doc"));
        assert!(!CFamily.is_doc_comment("/* plain */"));
        assert!(!CFamily.is_doc_comment("/**/"));
        assert_eq!(
            CFamily.comment_body("/** Summary.\n * @param x the x\n */"),
            "Summary.\n@param x the x"
        );
        assert_eq!(CFamily.comment_body("/// Line doc"), "Line doc");
    }

    #[test]
    fn function_declarations() {
        let decl = declaration("static int str_len (lua_State *L, size_t n) {").unwrap();
        assert_eq!(decl.name, "str_len");
        assert!(decl.local);
        assert_eq!(decl.kind, DeclKind::Function { params: vec!["L".into(), "n".into()] });

        let decl = declaration("void reset(void);").unwrap();
        assert_eq!(decl.kind, DeclKind::Function { params: vec![] });
    }

    #[test]
    fn variables_structs_and_macros() {
        let decl = declaration("const char *VERSION = \"1.0\";").unwrap();
        assert_eq!(decl.name, "VERSION");
        assert_eq!(decl.kind, DeclKind::Variable);

        let decl = declaration("struct point {").unwrap();
        assert_eq!(decl.name, "point");
        assert_eq!(decl.kind, DeclKind::Table);

        let decl = declaration("#define MAX(a, b) ((a) > (b) ? (a) : (b))").unwrap();
        assert_eq!(decl.name, "MAX");
        assert_eq!(decl.kind, DeclKind::Function { params: vec!["a".into(), "b".into()] });

        assert!(declaration("return 0;").is_none());
    }
}
