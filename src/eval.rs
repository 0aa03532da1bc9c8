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

//! Recursive-descent expression evaluator over the six-level precedence
//! ladder of spec §4.3, yielding a typed [`Address`].
//!
//! The level -> operator-table mapping is kept as data (per the design
//! notes): each level function consults a `static` table of `(token, op)`
//! pairs and otherwise defers to the next level down.

use crate::addr::Address;
use crate::diag::{report_error, Diagnostics};
use crate::keyword::Keyword;
use crate::symbol::SymbolTable;
use crate::token::TokenKind;
use crate::token_reader::TokenReader;

/// A binary operator recognized at levels 0-4.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BinOp { Or, Xor, And, Shl, Shr, Add, Sub, Mul, Div, Mod }

/// What a level's operator table matches against the current token.
#[derive(Clone, Copy)]
enum Tok { Kw(Keyword), Ch(char) }

fn matches(reader: &TokenReader, tok: Tok) -> bool {
    match tok {
        Tok::Kw(kw) => reader.at_keyword(kw),
        Tok::Ch(ch) => reader.at_char(ch),
    }
}

static LEVEL0: &[(Tok, BinOp)] = &[(Tok::Kw(Keyword::Or), BinOp::Or), (Tok::Kw(Keyword::Xor), BinOp::Xor)];
static LEVEL1: &[(Tok, BinOp)] = &[(Tok::Kw(Keyword::And), BinOp::And)];
static LEVEL2: &[(Tok, BinOp)] = &[(Tok::Kw(Keyword::Shl), BinOp::Shl), (Tok::Kw(Keyword::Shr), BinOp::Shr)];
static LEVEL3: &[(Tok, BinOp)] = &[(Tok::Ch('+'), BinOp::Add), (Tok::Ch('-'), BinOp::Sub)];
static LEVEL4: &[(Tok, BinOp)] = &[(Tok::Ch('*'), BinOp::Mul), (Tok::Ch('/'), BinOp::Div), (Tok::Kw(Keyword::Mod), BinOp::Mod)];

/// Evaluates a full expression, starting at level 0 (lowest precedence).
pub fn evaluate(
    reader:  &mut TokenReader,
    symbols: &SymbolTable,
    diag:    &mut Diagnostics,
    pass:    u32,
) -> Result<Address, ()> {
    level(reader, symbols, diag, pass, LEVEL0, level1)
}

type LevelFn = fn(&mut TokenReader, &SymbolTable, &mut Diagnostics, u32) -> Result<Address, ()>;

fn level(
    reader:  &mut TokenReader,
    symbols: &SymbolTable,
    diag:    &mut Diagnostics,
    pass:    u32,
    table:   &[(Tok, BinOp)],
    next:    LevelFn,
) -> Result<Address, ()> {
    let mut left = next(reader, symbols, diag, pass)?;

    loop {
        let found = table.iter().find(|&&(tok, _)| matches(reader, tok));
        let Some(&(_, op)) = found else { return Ok(left) };

        let pos = reader.current().position.clone();
        reader.advance();
        let right = next(reader, symbols, diag, pass)?;
        left = apply(reader, diag, pass, left, op, right, pos)?;
    }
}

fn level1(r: &mut TokenReader, s: &SymbolTable, d: &mut Diagnostics, p: u32) -> Result<Address, ()> { level(r, s, d, p, LEVEL1, level2) }
fn level2(r: &mut TokenReader, s: &SymbolTable, d: &mut Diagnostics, p: u32) -> Result<Address, ()> { level(r, s, d, p, LEVEL2, level3) }
fn level3(r: &mut TokenReader, s: &SymbolTable, d: &mut Diagnostics, p: u32) -> Result<Address, ()> { level(r, s, d, p, LEVEL3, level4) }
fn level4(r: &mut TokenReader, s: &SymbolTable, d: &mut Diagnostics, p: u32) -> Result<Address, ()> { level(r, s, d, p, LEVEL4, level5) }

/// Level 5: prefix `+ - NOT LOW HIGH`, applied right-to-left over a
/// recursive call to this same level.
fn level5(reader: &mut TokenReader, symbols: &SymbolTable, diag: &mut Diagnostics, pass: u32) -> Result<Address, ()> {
    if reader.accept_char('+') {
        return level5(reader, symbols, diag, pass);
    }
    if reader.accept_char('-') {
        let pos = reader.current().position.clone();
        let v = level5(reader, symbols, diag, pass)?;
        return negate(reader, diag, pass, v, pos);
    }
    if reader.accept_keyword(Keyword::Not) {
        let pos = reader.current().position.clone();
        let v = level5(reader, symbols, diag, pass)?;
        return bitwise_not(reader, diag, pass, v, pos);
    }
    if reader.accept_keyword(Keyword::Low) {
        let v = level5(reader, symbols, diag, pass)?;
        return Ok(v.low());
    }
    if reader.accept_keyword(Keyword::High) {
        let v = level5(reader, symbols, diag, pass)?;
        return Ok(v.high());
    }
    level6(reader, symbols, diag, pass)
}

/// Level 6 (the factor): numeric literal, identifier, char constant, or a
/// parenthesized sub-expression.
fn level6(reader: &mut TokenReader, symbols: &SymbolTable, diag: &mut Diagnostics, pass: u32) -> Result<Address, ()> {
    let token = reader.current().clone();

    match token.kind {
        TokenKind::NumericValue => {
            reader.advance();
            Ok(Address::constant(token.value as i32))
        }

        TokenKind::Identifier => {
            reader.advance();
            let id = token.value as u32;
            let addr = symbols.address_of(id);
            if addr.is_undefined() && pass >= 2 {
                report_error(reader, diag, token.position.clone(),
                    format!("undefined identifier '{}'", reader.text_of(&token)));
            }
            Ok(addr)
        }

        TokenKind::StringValue => {
            reader.advance();
            let text = reader.text_of(&token);
            match text.chars().next() {
                Some(c) => Ok(Address::constant(c as i32)),
                None => {
                    report_error(reader, diag, token.position, "empty character constant".into());
                    Err(())
                }
            }
        }

        TokenKind::ReservedWord if token.is_char('(') => {
            reader.advance();
            let inner = level(reader, symbols, diag, pass, LEVEL0, level1)?;
            if !reader.accept_char(')') {
                report_error(reader, diag, reader.current().position.clone(), "expected ')'".into());
                return Err(());
            }
            Ok(inner.parenthesized())
        }

        _ => {
            report_error(reader, diag, token.position, "syntax error: expected an expression".into());
            Err(())
        }
    }
}

fn negate(reader: &mut TokenReader, diag: &mut Diagnostics, pass: u32, v: Address, pos: crate::pos::SourcePosition) -> Result<Address, ()> {
    if v.is_const() {
        Ok(Address::constant(-v.value))
    } else if pass >= 2 {
        report_error(reader, diag, pos, "address usage error: cannot negate a relocatable value".into());
        Err(())
    } else {
        Ok(Address::undefined())
    }
}

fn bitwise_not(reader: &mut TokenReader, diag: &mut Diagnostics, pass: u32, v: Address, pos: crate::pos::SourcePosition) -> Result<Address, ()> {
    if v.is_const() {
        Ok(Address::constant(!v.value & 0xFFFF))
    } else if pass >= 2 {
        report_error(reader, diag, pos, "address usage error: NOT requires a constant operand".into());
        Err(())
    } else {
        Ok(Address::undefined())
    }
}

/// Applies a binary operator per spec §4.3: the right operand must be
/// `Const` for every operator; for `+`/`-` the left operand may also be a
/// relocatable value, which carries its type and id through.
fn apply(
    reader: &mut TokenReader,
    diag:   &mut Diagnostics,
    pass:   u32,
    left:   Address,
    op:     BinOp,
    right:  Address,
    pos:    crate::pos::SourcePosition,
) -> Result<Address, ()> {
    let addr_usage_error = |reader: &mut TokenReader, diag: &mut Diagnostics| -> Result<Address, ()> {
        if pass >= 2 {
            report_error(reader, diag, pos.clone(), "address usage error: relocatable value used where a constant is required".into());
            Err(())
        } else {
            Ok(Address::undefined())
        }
    };

    match op {
        BinOp::Add | BinOp::Sub => {
            if left.is_const() && right.is_const() {
                let v = if op == BinOp::Add { left.value + right.value } else { left.value - right.value };
                return Ok(Address::constant(v));
            }
            if !right.is_const() {
                return addr_usage_error(reader, diag);
            }
            // left is relocatable (or undefined), right is Const: reloc ± const.
            let delta = if op == BinOp::Add { right.value } else { -right.value };
            let mut result = left;
            result.value += delta;
            Ok(result)
        }

        _ if left.is_const() && right.is_const() => {
            let l = left.value;
            let r = right.value;
            let v = match op {
                BinOp::Or  => l | r,
                BinOp::Xor => l ^ r,
                BinOp::And => l & r,
                BinOp::Shl => l << (r & 0xF),
                BinOp::Shr => ((l as u32) >> (r & 0xF)) as i32,
                BinOp::Mul => l * r,
                BinOp::Div => if r == 0 { 0 } else { l / r },
                BinOp::Mod => if r == 0 { 0 } else { l % r },
                BinOp::Add | BinOp::Sub => unreachable!(),
            };
            Ok(Address::constant(v & 0xFFFF))
        }

        _ => addr_usage_error(reader, diag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::AssembleOptions;
    use crate::source::SourceOpener;
    use std::path::Path;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> std::io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn eval(src: &'static str, pass: u32) -> Result<Address, ()> {
        let opener = MemOpener(src);
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        evaluate(&mut reader, &symbols, &mut diag, pass)
    }

    #[test]
    fn simple_addition() {
        assert_eq!(eval("1 + 2\n", 2).unwrap(), Address::constant(3));
    }

    #[test]
    fn precedence_mul_over_add() {
        assert_eq!(eval("2 + 3 * 4\n", 2).unwrap(), Address::constant(14));
    }

    #[test]
    fn parenthesized_changes_precedence() {
        assert_eq!(eval("(2 + 3) * 4\n", 2).unwrap(), Address::constant(20));
    }

    #[test]
    fn parenthesized_flag_is_recorded() {
        let v = eval("(5)\n", 2).unwrap();
        assert!(v.parenthesized);
        let v = eval("5\n", 2).unwrap();
        assert!(!v.parenthesized);
    }

    #[test]
    fn unary_not_and_low_high() {
        assert_eq!(eval("NOT 0\n", 2).unwrap(), Address::constant(0xFFFF));
        assert_eq!(eval("LOW 1234H\n", 2).unwrap(), Address::constant(0x34));
        assert_eq!(eval("HIGH 1234H\n", 2).unwrap(), Address::constant(0x12));
    }

    #[test]
    fn char_constant_takes_first_char() {
        assert_eq!(eval("'hi'\n", 2).unwrap(), Address::constant('h' as i32));
    }

    #[test]
    fn undefined_identifier_errors_only_on_pass_two() {
        let mut diag_count_pass1 = {
            let opener = MemOpener("FOO\n");
            let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
            let symbols = SymbolTable::new();
            let mut diag = Diagnostics::new(AssembleOptions::default());
            let _ = evaluate(&mut reader, &symbols, &mut diag, 1);
            diag.error_count
        };
        assert_eq!(diag_count_pass1, 0);

        let opener = MemOpener("FOO\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        let _ = evaluate(&mut reader, &symbols, &mut diag, 2);
        assert_eq!(diag.error_count, 1);
        diag_count_pass1 = diag.error_count; // silence unused warning in some builds
        let _ = diag_count_pass1;
    }

    #[test]
    fn reloc_plus_const_carries_type() {
        let mut symbols = SymbolTable::new();
        symbols.define(0x100, Address::code(10), 1);
        let opener = MemOpener("X + 5\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        // `X` tokenizes to identifier id 0x100 only if it is the first
        // identifier interned by this reader; rely on that determinism.
        let mut diag = Diagnostics::new(AssembleOptions::default());
        let v = evaluate(&mut reader, &symbols, &mut diag, 2).unwrap();
        assert!(v.is_relocatable());
        assert_eq!(v.value, 15);
    }
}
