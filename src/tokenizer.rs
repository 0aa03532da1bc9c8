// This file is part of z80as, a Z80 assembler.
// Copyright (C) 2019 Jeffrey Sharp
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

//! Tokenizer: single-character lookahead over a [`SourceReader`], producing
//! [`Token`]s.

use crate::mem::StringTable;
use crate::pos::SourcePosition;
use crate::source::{SourceReader, EOF};
use crate::token::{Token, TokenKind};

/// Two-character operator pairs recognized before falling back to a single
/// character. Empty for the Z80 front end: per the design notes, no Z80
/// two-character operator is actually wired up, but the lookahead/pushback
/// mechanism below stays in place so another instruction set can populate
/// this table without touching the scanning loop.
static TWO_CHAR_OPS: &[(char, char, u32)] = &[];

/// A tokenizer error: malformed input that the tokenizer itself cannot
/// recover from without guidance. [`TokenReader`](crate::token_reader::TokenReader)
/// converts this into a deduplicated syntax-error diagnostic.
#[derive(Clone, Debug)]
pub struct TokenizeError {
    pub position: SourcePosition,
    pub message: String,
}

pub struct Tokenizer<'o> {
    source: SourceReader<'o>,
    cur: char,
    pushback: Vec<char>,
}

impl<'o> Tokenizer<'o> {
    pub fn new(mut source: SourceReader<'o>) -> Self {
        let cur = source.get_char();
        Self { source, cur, pushback: Vec::new() }
    }

    pub fn source_mut(&mut self) -> &mut SourceReader<'o> {
        &mut self.source
    }

    fn raw_advance(&mut self) -> char {
        self.pushback.pop().unwrap_or_else(|| self.source.get_char())
    }

    fn push_back(&mut self, c: char) {
        self.pushback.push(c);
    }

    fn advance(&mut self) -> char {
        let c = self.cur;
        self.cur = self.raw_advance();
        c
    }

    fn position(&self) -> SourcePosition {
        let (file, line) = self.source.position();
        SourcePosition::new(file, line)
    }

    fn is_whitespace_not_eol(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r')
    }

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '.' | '?' | '@')
    }

    fn is_ident_cont(c: char) -> bool {
        Self::is_ident_start(c) || c.is_ascii_digit() || c == '\''
    }

    /// Produces the next token, interning identifiers and string literals
    /// into `strings` as needed.
    pub fn get_token(&mut self, strings: &mut StringTable) -> Result<Token, TokenizeError> {
        loop {
            // Skip inter-token whitespace, excluding the newline sentinel.
            while Self::is_whitespace_not_eol(self.cur) {
                self.advance();
            }

            // Skip a `;` line comment; the newline itself is left intact.
            if self.cur == ';' {
                while self.cur != '\n' && self.cur != EOF {
                    self.advance();
                }
                continue;
            }

            break;
        }

        let position = self.position();

        match self.cur {
            EOF => {
                self.advance();
                Ok(Token::new(position, TokenKind::ReservedWord, 0))
            }

            '\'' | '"' => self.scan_string(strings, position),

            c if c.is_ascii_digit() => self.scan_number(position),

            c if Self::is_ident_start(c) => Ok(self.scan_identifier(strings, position)),

            _ => self.scan_operator(position),
        }
    }

    fn scan_string(
        &mut self,
        strings: &mut StringTable,
        position: SourcePosition,
    ) -> Result<Token, TokenizeError> {
        let quote = self.advance();
        let mut text = String::new();

        loop {
            match self.cur {
                EOF | '\n' => {
                    return Err(TokenizeError {
                        position,
                        message: "unterminated string literal".into(),
                    });
                }
                c if c == quote => {
                    self.advance();
                    break;
                }
                c => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        let id = strings.intern_string(&text);
        Ok(Token::new(position, TokenKind::StringValue, id.0 as i64))
    }

    fn scan_number(&mut self, position: SourcePosition) -> Result<Token, TokenizeError> {
        let mut text = String::new();

        while self.cur.is_ascii_hexdigit() {
            text.push(self.cur);
            self.advance();
        }

        let value = if matches!(self.cur, 'H' | 'h') {
            self.advance();
            i64::from_str_radix(&text, 16).map_err(|_| TokenizeError {
                position: position.clone(),
                message: format!("invalid hexadecimal literal '{text}H'"),
            })?
        } else {
            if text.bytes().any(|b| !b.is_ascii_digit()) {
                return Err(TokenizeError {
                    position,
                    message: format!("invalid numeric literal '{text}'"),
                });
            }
            text.parse::<i64>().map_err(|_| TokenizeError {
                position: position.clone(),
                message: format!("invalid decimal literal '{text}'"),
            })?
        };

        Ok(Token::new(position, TokenKind::NumericValue, value))
    }

    fn scan_identifier(&mut self, strings: &mut StringTable, position: SourcePosition) -> Token {
        let mut text = String::new();
        while Self::is_ident_cont(self.cur) {
            text.push(self.cur);
            self.advance();
        }
        let text = text.to_uppercase();

        if let Some(id) = strings.keyword_id(&text) {
            Token::new(position, TokenKind::ReservedWord, id.0 as i64)
        } else {
            let id = strings.intern_ident(&text);
            Token::new(position, TokenKind::Identifier, id.0 as i64)
        }
    }

    fn scan_operator(&mut self, position: SourcePosition) -> Result<Token, TokenizeError> {
        let first = self.advance();
        let extra = self.raw_advance();

        if let Some(&(_, _, id)) = TWO_CHAR_OPS.iter().find(|&&(a, b, _)| a == first && b == extra) {
            self.cur = self.raw_advance();
            Ok(Token::new(position, TokenKind::ReservedWord, id as i64))
        } else {
            self.push_back(extra);
            self.cur = self.raw_advance();
            Ok(Token::new(position, TokenKind::ReservedWord, first as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceOpener;
    use std::io;
    use std::path::Path;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn tokenize(src: &'static str) -> (Vec<Token>, StringTable) {
        let opener = MemOpener(src);
        let reader = SourceReader::open(&opener, Path::new("t.asm")).unwrap();
        let mut tok = Tokenizer::new(reader);
        let mut strings = StringTable::new();
        strings.register_keyword("LD");
        strings.register_keyword("IF");

        let mut tokens = Vec::new();
        loop {
            let t = tok.get_token(&mut strings).unwrap();
            let is_eof = t.is_eof();
            tokens.push(t);
            if is_eof { break; }
        }
        (tokens, strings)
    }

    #[test]
    fn recognizes_decimal_and_hex_numbers() {
        let (tokens, _) = tokenize("5 1FH 0FFH\n");
        assert_eq!(tokens[0].kind, TokenKind::NumericValue);
        assert_eq!(tokens[0].value, 5);
        assert_eq!(tokens[1].value, 0x1F);
        assert_eq!(tokens[2].value, 0xFF);
    }

    #[test]
    fn recognizes_newline_sentinel() {
        let (tokens, _) = tokenize("5\n6");
        assert!(tokens[1].is_eol());
    }

    #[test]
    fn recognizes_keyword_case_insensitively() {
        let (tokens, strings) = tokenize("ld\n");
        assert_eq!(tokens[0].kind, TokenKind::ReservedWord);
        assert_eq!(tokens[0].value as u32, strings.keyword_id("LD").unwrap().0);
    }

    #[test]
    fn interns_identifier() {
        let (tokens, strings) = tokenize("foo_bar\n");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(strings.get(crate::mem::string_table::StringId(tokens[0].value as u32)), "FOO_BAR");
    }

    #[test]
    fn skips_line_comment() {
        let (tokens, _) = tokenize("5 ; a comment\n6");
        assert_eq!(tokens[0].value, 5);
        assert!(tokens[1].is_eol());
        assert_eq!(tokens[2].value, 6);
    }

    #[test]
    fn reads_quoted_string() {
        let (tokens, strings) = tokenize("'hi'\n");
        assert_eq!(tokens[0].kind, TokenKind::StringValue);
        assert_eq!(strings.get(crate::mem::string_table::StringId(tokens[0].value as u32)), "hi");
    }

    #[test]
    fn single_char_operator() {
        let (tokens, _) = tokenize("+\n");
        assert!(tokens[0].is_char('+'));
    }
}
