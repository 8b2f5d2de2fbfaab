//! Comment block scanner — groups comment tokens into doc blocks and
//! detects the declaration that follows each block.

use crate::error::{DocError, Result};
use crate::parser::{DeclState, Declaration, Language, Token, TokenKind};
use crate::tags::has_tag_line;
use std::iter::Peekable;
use std::path::Path;

/// Upper bound on tokens fed to the declaration grammar after a block.
const MAX_DECL_TOKENS: usize = 256;

/// One doc comment with the declaration found after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    /// Comment text with markers stripped, one line per source line.
    pub text: String,
    pub line: usize,
    pub end_line: usize,
    pub declaration: Option<Declaration>,
    /// This is the first comment of the file.
    pub first: bool,
}

impl CommentBlock {
    pub fn follows_declaration(&self) -> bool {
        self.declaration.is_some()
    }

    pub fn is_local(&self) -> bool {
        self.declaration.as_ref().is_some_and(|d| d.local)
    }
}

/// Iterator over the doc blocks of one file. Yields an error and stops
/// when the file's first comment is not a doc comment.
pub struct Scanner<'a> {
    lang: &'a dyn Language,
    tokens: Peekable<Box<dyn Iterator<Item = Token> + 'a>>,
    file: &'a Path,
    seen_comment: bool,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(lang: &'a dyn Language, src: &'a str, file: &'a Path) -> Self {
        Self {
            lang,
            tokens: lang.tokens(src).peekable(),
            file,
            seen_comment: false,
            failed: false,
        }
    }

    /// Absorb the comments that continue the block opened by `open`.
    fn accumulate(&mut self, open: Token) -> (String, usize) {
        let mut lines = vec![self.lang.comment_body(&open.text)];
        let mut end_line = open.end_line();
        while let Some(peek) = self.tokens.peek() {
            match peek.kind {
                TokenKind::Space => {
                    self.tokens.next();
                }
                TokenKind::Comment if !self.lang.starts_new_block(&peek.text) => {
                    let Some(token) = self.tokens.next() else { break };
                    end_line = token.end_line();
                    lines.push(self.lang.comment_body(&token.text));
                }
                _ => break,
            }
        }
        (lines.join("\n"), end_line)
    }

    /// Run the declaration grammar over the tokens after a block. Comment
    /// tokens are left in the stream unless they sit inside a declaration.
    fn declaration(&mut self) -> Option<Declaration> {
        let mut state = DeclState::start();
        let mut fed = 0;
        while let Some(peek) = self.tokens.peek() {
            let kind = peek.kind;
            let awaiting = matches!(state, DeclState::AwaitingDecl { .. });
            match kind {
                TokenKind::Space => {
                    self.tokens.next();
                }
                TokenKind::Comment if awaiting => break,
                TokenKind::Comment => {
                    self.tokens.next();
                }
                _ => {
                    let Some(token) = self.tokens.next() else { break };
                    state = self.lang.advance(state, &token);
                    fed += 1;
                    if matches!(state, DeclState::Done(_)) || fed >= MAX_DECL_TOKENS {
                        break;
                    }
                }
            }
        }
        state.finish()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<CommentBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let token = self.tokens.next()?;
            if token.kind != TokenKind::Comment {
                continue;
            }
            let first = !self.seen_comment;
            self.seen_comment = true;
            let line = token.line;
            let marked = self.lang.is_doc_comment(&token.text);
            let (text, end_line) = self.accumulate(token);
            if !marked && !has_tag_line(&text) {
                if first {
                    self.failed = true;
                    return Some(Err(DocError::Structural {
                        file: self.file.to_path_buf(),
                        line,
                        message: "first comment is not a doc comment".to_string(),
                    }));
                }
                continue;
            }

            let declaration = self.declaration();
            return Some(Ok(CommentBlock {
                text,
                line,
                end_line,
                declaration,
                first,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::c::CFamily;
    use crate::parser::lua::Lua;
    use crate::parser::DeclKind;

    fn scan(lang: &dyn Language, src: &str) -> Result<Vec<CommentBlock>> {
        Scanner::new(lang, src, Path::new("test")).collect()
    }

    #[test]
    fn groups_adjacent_comments() {
        let src = "--- Summary.\n-- More text.\n\n-- @param x value\nfunction f(x) end\n";
        let blocks = scan(&Lua, src).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Summary.\nMore text.\n@param x value");
        assert_eq!(blocks[0].line, 1);
        assert_eq!(blocks[0].end_line, 4);
        assert!(blocks[0].first);
        let decl = blocks[0].declaration.as_ref().unwrap();
        assert_eq!(decl.name, "f");
        assert_eq!(decl.kind, DeclKind::Function { params: vec!["x".into()] });
    }

    #[test]
    fn new_doc_marker_opens_new_block() {
        let src = "--- Module doc.\n--- Function doc.\nlocal function g() end\n";
        let blocks = scan(&Lua, src).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].declaration.is_none());
        assert!(!blocks[1].first);
        assert!(blocks[1].is_local());
    }

    #[test]
    fn ordinary_comments_after_the_first_are_skipped() {
        let src = "--- Doc.\nlocal x = 1\n-- plain comment\nprint(x)\n\
                   --- Next.\nfunction h() end\n";
        let blocks = scan(&Lua, src).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].declaration.as_ref().unwrap().name, "x");
        assert_eq!(blocks[1].text, "Next.");
    }

    #[test]
    fn non_doc_first_comment_is_structural_error() {
        let err = scan(&Lua, "local x = 1\n-- just a comment\n").unwrap_err();
        match err {
            DocError::Structural { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tagged_plain_comment_counts_as_doc() {
        let blocks = scan(&Lua, "-- Utilities.\n-- @module util\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Utilities.\n@module util");
    }

    #[test]
    fn tagless_doc_first_comment_is_accepted() {
        let blocks = scan(&Lua, "--- Just a description.\nreturn {}\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].follows_declaration());
    }

    #[test]
    fn declaration_lookahead_does_not_swallow_next_block() {
        let src = "--- A.\n--- B.\nfunction b() end";
        let blocks = scan(&Lua, src).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].declaration.as_ref().unwrap().name, "b");
    }

    #[test]
    fn c_line_doc_runs_merge() {
        let src = "/// Adds.\n/// @param a left\nint add(int a, int b);\n";
        let blocks = scan(&CFamily, src).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Adds.\n@param a left");
        assert_eq!(blocks[0].declaration.as_ref().unwrap().name, "add");
    }
}
