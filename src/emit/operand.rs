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

//! Memory-operand parsing and the prefix/displacement emission shared by
//! every instruction family that can address `(HL)`, `(IX+d)`, `(IY+d)`,
//! `(BC)`, `(DE)`, or `(nn)`.

use crate::addr::Address;
use crate::diag::{report_error, Diagnostics};
use crate::eval;
use crate::keyword::Keyword;
use crate::reg::{try_index_reg, try_reg8, IndexReg, Reg8};
use crate::segment::Segments;
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

/// The shape of a parenthesized memory operand, spanning every form the Z80
/// grammar allows: `(HL)`, `(BC)`, `(DE)`, `(IX+d)`/`(IY+d)`, and `(nn)`.
#[derive(Clone, Copy, Debug)]
pub enum Mem {
    Hl,
    Bc,
    De,
    Indexed(IndexReg, i32),
    Direct(Address),
}

/// The narrower set of memory operands valid wherever an 8-bit ALU,
/// rotate/shift, `INC`/`DEC`, or `BIT`/`SET`/`RES` operand is accepted:
/// `(HL)`, `(IX+d)`, `(IY+d)` only -- never `(BC)`, `(DE)`, or `(nn)`.
#[derive(Clone, Copy, Debug)]
pub enum RegOrMem8 {
    Reg(Reg8),
    Hl,
    Indexed(IndexReg, i32),
}

impl RegOrMem8 {
    /// The 3-bit `ddd`/`sss` field value; `(HL)`/indexed share slot 6.
    pub fn code(self) -> u8 {
        match self {
            RegOrMem8::Reg(r) => r.code(),
            RegOrMem8::Hl | RegOrMem8::Indexed(..) => 6,
        }
    }
}

/// Parses the full `(...)` memory-operand grammar. Call only when the
/// reader is positioned at `(`.
pub fn parse_mem(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<Mem, ()> {
    reader.advance(); // consume '('

    if reader.accept_keyword(Keyword::Hl) {
        expect_close(reader, diag)?;
        return Ok(Mem::Hl);
    }
    if reader.accept_keyword(Keyword::Bc) {
        expect_close(reader, diag)?;
        return Ok(Mem::Bc);
    }
    if reader.accept_keyword(Keyword::De) {
        expect_close(reader, diag)?;
        return Ok(Mem::De);
    }
    if let Some(ix) = try_index_reg(reader) {
        let mut disp = 0i32;
        if reader.at_char('+') || reader.at_char('-') {
            let neg = reader.at_char('-');
            reader.advance();
            let pos = reader.current().position.clone();
            let v = eval::evaluate(reader, symbols, diag, pass)?;
            if !v.is_const() {
                report_error(reader, diag, pos,
                    "address usage error: displacement must be a constant".into());
                return Err(());
            }
            disp = if neg { -v.value } else { v.value };
        }
        expect_close(reader, diag)?;
        return Ok(Mem::Indexed(ix, disp));
    }

    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    expect_close(reader, diag)?;
    Ok(Mem::Direct(addr.parenthesized()))
}

/// Parses `(` ... `)` and accepts only `(HL)`/`(IX+d)`/`(IY+d)`, rejecting
/// `(BC)`/`(DE)`/`(nn)` with an "invalid register" diagnostic.
pub fn parse_regmem8(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<RegOrMem8, ()> {
    let pos = reader.current().position.clone();
    match parse_mem(reader, symbols, diag, pass)? {
        Mem::Hl => Ok(RegOrMem8::Hl),
        Mem::Indexed(ix, d) => Ok(RegOrMem8::Indexed(ix, d)),
        Mem::Bc | Mem::De | Mem::Direct(_) => {
            report_error(reader, diag, pos, "invalid register".into());
            Err(())
        }
    }
}

/// Consumes a register or `(HL)`/`(IX+d)`/`(IY+d)` operand, if the current
/// token starts one; returns `None` if neither is present so the caller can
/// try an immediate operand instead.
pub fn try_regmem8(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    diag: &mut Diagnostics,
    pass: u32,
) -> Option<Result<RegOrMem8, ()>> {
    if let Some(r) = try_reg8(reader) {
        return Some(Ok(RegOrMem8::Reg(r)));
    }
    if reader.at_char('(') {
        return Some(parse_regmem8(reader, symbols, diag, pass));
    }
    None
}

pub fn expect_close(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<(), ()> {
    if reader.accept_char(')') {
        Ok(())
    } else {
        let pos = reader.current().position.clone();
        report_error(reader, diag, pos, "syntax error: expected ')'".into());
        Err(())
    }
}

pub fn expect_comma(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<(), ()> {
    if reader.accept_char(',') {
        Ok(())
    } else {
        let pos = reader.current().position.clone();
        report_error(reader, diag, pos, "syntax error: expected ','".into());
        Err(())
    }
}

/// Range-checks an instruction's 8-bit immediate or displacement operand
/// against the spec's stated bound of `[-128, 127]` (spec §7's "out of
/// range" entry; preserved as specified even though it excludes `0FFH`).
pub fn as_instruction_byte(
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
    pos: crate::pos::SourcePosition,
    v: i32,
) -> Result<u8, ()> {
    if (-128..=127).contains(&v) {
        Ok((v & 0xFF) as u8)
    } else {
        report_error(reader, diag, pos, format!("out of range: {v}"));
        Err(())
    }
}

/// Masks a `DEFB`/`DEFW`-style data byte; data storage is not subject to
/// the instruction-immediate range check.
pub fn data_byte(v: i32) -> u8 {
    (v & 0xFF) as u8
}

/// Emits `prefix?; opcode; displacement?` for a non-`CB` instruction whose
/// base `opcode` already has its register field set to the memory slot 6.
pub fn emit_plain_op(segs: &mut Segments, op: RegOrMem8, opcode: u8) {
    if let RegOrMem8::Indexed(ix, d) = op {
        segs.emit_byte(ix.prefix());
        segs.emit_byte(opcode);
        segs.emit_byte(d as u8);
    } else {
        segs.emit_byte(opcode);
    }
}

/// Emits `prefix?; CB; displacement?; opcode` for a `CB`-prefixed
/// rotate/shift/`BIT`/`SET`/`RES` instruction. The displacement precedes
/// the opcode byte in the indexed form, unlike [`emit_plain_op`].
pub fn emit_cb_op(segs: &mut Segments, op: RegOrMem8, opcode: u8) {
    if let RegOrMem8::Indexed(ix, d) = op {
        segs.emit_byte(ix.prefix());
        segs.emit_byte(0xCB);
        segs.emit_byte(d as u8);
        segs.emit_byte(opcode);
    } else {
        segs.emit_byte(0xCB);
        segs.emit_byte(opcode);
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

    fn parse(src: &'static str) -> Result<Mem, ()> {
        let opener = MemOpener(src);
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        parse_mem(&mut reader, &symbols, &mut diag, 2)
    }

    #[test]
    fn parses_hl() {
        assert!(matches!(parse("(HL)\n").unwrap(), Mem::Hl));
    }

    #[test]
    fn parses_indexed_with_positive_displacement() {
        match parse("(IX+2)\n").unwrap() {
            Mem::Indexed(IndexReg::Ix, 2) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_indexed_with_negative_displacement() {
        match parse("(IY-5)\n").unwrap() {
            Mem::Indexed(IndexReg::Iy, -5) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_direct_address() {
        match parse("(1234H)\n").unwrap() {
            Mem::Direct(addr) => assert_eq!(addr.value, 0x1234),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
