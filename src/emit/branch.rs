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

//! `JP`, `JR`, `DJNZ`, `CALL`, `RET`, `RST`, `IM`, `IN`, `OUT`, `EX`,
//! `PUSH`, `POP` (spec §4.4, §4.5).

use crate::diag::{report_error, Diagnostics};
use crate::eval;
use crate::jump;
use crate::keyword::Keyword;
use crate::reg::{at_cond, try_cond, try_index_reg, try_reg16, try_stack_pair, Cond};
use crate::segment::Segments;
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

use super::operand::expect_comma;

pub fn push_pop(
    kw: Keyword,
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
    segs: &mut Segments,
) -> Result<(), ()> {
    if let Some(rp) = try_stack_pair(reader) {
        let opcode = if kw == Keyword::Push { 0xC5 } else { 0xC1 };
        segs.emit_byte(opcode | (rp.code() << 4));
        return Ok(());
    }
    if let Some(ix) = try_index_reg(reader) {
        segs.emit_byte(ix.prefix());
        segs.emit_byte(if kw == Keyword::Push { 0xE5 } else { 0xE1 });
        return Ok(());
    }
    invalid_register(reader, diag)
}

/// `EX DE,HL`, `EX AF,AF'`, `EX (SP),HL|IX|IY`.
pub fn ex(reader: &mut TokenReader, diag: &mut Diagnostics, segs: &mut Segments) -> Result<(), ()> {
    if reader.accept_keyword(Keyword::De) {
        expect_comma(reader, diag)?;
        if reader.accept_keyword(Keyword::Hl) {
            segs.emit_byte(0xEB);
            return Ok(());
        }
        return invalid_register(reader, diag);
    }
    if reader.accept_keyword(Keyword::Af) {
        expect_comma(reader, diag)?;
        if reader.accept_keyword(Keyword::AfPrime) {
            segs.emit_byte(0x08);
            return Ok(());
        }
        return invalid_register(reader, diag);
    }
    if reader.at_char('(') {
        reader.advance();
        if reader.accept_keyword(Keyword::Sp) {
            if !reader.accept_char(')') {
                return expect_close_err(reader, diag);
            }
            expect_comma(reader, diag)?;
            if reader.accept_keyword(Keyword::Hl) {
                segs.emit_byte(0xE3);
                return Ok(());
            }
            if let Some(ix) = try_index_reg(reader) {
                segs.emit_byte(ix.prefix());
                segs.emit_byte(0xE3);
                return Ok(());
            }
            return invalid_register(reader, diag);
        }
    }
    invalid_register(reader, diag)
}

/// `JP [cc,] nn` and `JP (HL)`/`JP (IX)`/`JP (IY)`.
pub fn jp(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    if reader.at_char('(') {
        reader.advance();
        if reader.accept_keyword(Keyword::Hl) {
            super::operand::expect_close(reader, diag)?;
            segs.emit_byte(0xE9);
            return Ok(());
        }
        if let Some(ix) = try_index_reg(reader) {
            super::operand::expect_close(reader, diag)?;
            segs.emit_byte(ix.prefix());
            segs.emit_byte(0xE9);
            return Ok(());
        }
        return invalid_register(reader, diag);
    }

    if at_cond(reader) {
        let cc = try_cond(reader).unwrap();
        expect_comma(reader, diag)?;
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        segs.emit_byte(0xC2 | (cc.code() << 3));
        segs.emit_address_word(addr);
        return Ok(());
    }

    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    segs.emit_byte(0xC3);
    segs.emit_address_word(addr);
    Ok(())
}

/// `JR [cc,] e`, falling back to `JP` when the target is out of short-jump
/// range (spec §4.5's fixpoint: pass 1 always assumes the long form for an
/// undefined forward reference).
pub fn jr(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    let short_cc = crate::reg::try_short_cond(reader);
    if short_cc.is_none() && at_cond(reader) {
        report_error(reader, diag, pos, "invalid condition for JR".into());
        return Err(());
    }
    if short_cc.is_some() {
        expect_comma(reader, diag)?;
    }
    let target = eval::evaluate(reader, symbols, diag, pass)?;
    let start = segs.here();

    if let Some(offset) = jump::short_offset(start, target) {
        let opcode = match short_cc {
            None => 0x18,
            Some(cc) => 0x20 | (cc.code() << 3),
        };
        segs.emit_byte(opcode);
        segs.emit_byte(offset as u8);
    } else {
        let opcode = match short_cc {
            None => 0xC3,
            Some(cc) => 0xC2 | (cc.code() << 3),
        };
        segs.emit_byte(opcode);
        segs.emit_address_word(target);
    }
    Ok(())
}

/// `DJNZ e`, falling back to `DEC B; JP NZ,e` when out of short-jump range.
pub fn djnz(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let target = eval::evaluate(reader, symbols, diag, pass)?;
    let start = segs.here();

    if let Some(offset) = jump::short_offset(start, target) {
        segs.emit_byte(0x10);
        segs.emit_byte(offset as u8);
    } else {
        segs.emit_byte(0x05); // DEC B
        segs.emit_byte(0xC2 | (Cond::Nz.code() << 3)); // JP NZ, e
        segs.emit_address_word(target);
    }
    Ok(())
}

/// `CALL [cc,] nn`.
pub fn call(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    if at_cond(reader) {
        let cc = try_cond(reader).unwrap();
        expect_comma(reader, diag)?;
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        segs.emit_byte(0xC4 | (cc.code() << 3));
        segs.emit_address_word(addr);
        return Ok(());
    }
    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    segs.emit_byte(0xCD);
    segs.emit_address_word(addr);
    Ok(())
}

/// `RET [cc]`.
pub fn ret(reader: &mut TokenReader, segs: &mut Segments) {
    if at_cond(reader) {
        let cc = try_cond(reader).unwrap();
        segs.emit_byte(0xC0 | (cc.code() << 3));
    } else {
        segs.emit_byte(0xC9);
    }
}

/// `RST n`, `n` one of `0,8,16,...,56`.
pub fn rst(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    let n = addr.value;
    if !(0..=0x38).contains(&n) || n & 0xC7 != 0 {
        report_error(reader, diag, pos, format!("out of range: {n}"));
        return Err(());
    }
    segs.emit_byte(0xC7 | (n as u8));
    Ok(())
}

/// `IM 0|1|2`.
pub fn im(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    let opcode = match addr.value {
        0 => 0x46,
        1 => 0x56,
        2 => 0x5E,
        n => {
            report_error(reader, diag, pos, format!("out of range: {n}"));
            return Err(());
        }
    };
    segs.emit_byte(0xED);
    segs.emit_byte(opcode);
    Ok(())
}

/// `IN A,(n)` and `IN r,(C)`.
pub fn in_(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let dst = crate::reg::try_reg8(reader);
    let Some(dst) = dst else {
        return invalid_register(reader, diag);
    };
    expect_comma(reader, diag)?;
    if !reader.accept_char('(') {
        return expect_close_err(reader, diag);
    }
    if dst == crate::reg::Reg8::A && !reader.at_keyword(Keyword::C) {
        let pos = reader.current().position.clone();
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        let n = super::operand::as_instruction_byte(reader, diag, pos, addr.value)?;
        super::operand::expect_close(reader, diag)?;
        segs.emit_byte(0xDB);
        segs.emit_byte(n);
        return Ok(());
    }
    if reader.accept_keyword(Keyword::C) {
        super::operand::expect_close(reader, diag)?;
        segs.emit_byte(0xED);
        segs.emit_byte(0x40 | (dst.code() << 3));
        return Ok(());
    }
    invalid_register(reader, diag)
}

/// `OUT (n),A` and `OUT (C),r`.
pub fn out(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    if !reader.accept_char('(') {
        return expect_close_err(reader, diag);
    }
    if reader.accept_keyword(Keyword::C) {
        super::operand::expect_close(reader, diag)?;
        expect_comma(reader, diag)?;
        let Some(src) = crate::reg::try_reg8(reader) else {
            return invalid_register(reader, diag);
        };
        segs.emit_byte(0xED);
        segs.emit_byte(0x41 | (src.code() << 3));
        return Ok(());
    }
    let pos = reader.current().position.clone();
    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    let n = super::operand::as_instruction_byte(reader, diag, pos, addr.value)?;
    super::operand::expect_close(reader, diag)?;
    expect_comma(reader, diag)?;
    if !reader.accept_keyword(Keyword::A) {
        return invalid_register(reader, diag);
    }
    segs.emit_byte(0xD3);
    segs.emit_byte(n);
    Ok(())
}

fn expect_close_err(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "syntax error: expected '('".into());
    Err(())
}

fn invalid_register(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "invalid register".into());
    Err(())
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

    #[test]
    fn jp_unconditional() {
        let opener = MemOpener("1234H\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        jp(&mut reader, &symbols, &mut segs, &mut diag, 2).unwrap();
        assert_eq!(segs.code.bytes, vec![0xC3, 0x34, 0x12]);
    }

    #[test]
    fn jp_conditional() {
        let opener = MemOpener("Z, 1234H\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        jp(&mut reader, &symbols, &mut segs, &mut diag, 2).unwrap();
        assert_eq!(segs.code.bytes, vec![0xCA, 0x34, 0x12]);
    }

    #[test]
    fn rst_valid_multiple_of_8() {
        let opener = MemOpener("16\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        rst(&mut reader, &symbols, &mut segs, &mut diag, 2).unwrap();
        assert_eq!(segs.code.bytes, vec![0xD7]);
    }

    #[test]
    fn rst_rejects_non_multiple_of_8() {
        let opener = MemOpener("3\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        assert!(rst(&mut reader, &symbols, &mut segs, &mut diag, 2).is_err());
    }

    #[test]
    fn push_bc() {
        let opener = MemOpener("BC\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        push_pop(Keyword::Push, &mut reader, &mut diag, &mut segs).unwrap();
        assert_eq!(segs.code.bytes, vec![0xC5]);
    }

    #[test]
    fn pop_af() {
        let opener = MemOpener("AF\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        push_pop(Keyword::Pop, &mut reader, &mut diag, &mut segs).unwrap();
        assert_eq!(segs.code.bytes, vec![0xF1]);
    }
}
