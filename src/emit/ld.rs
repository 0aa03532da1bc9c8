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

//! `LD`: the largest instruction family, decomposed by destination form
//! (spec §4.4).

use crate::diag::{report_error, Diagnostics};
use crate::eval;
use crate::keyword::Keyword;
use crate::reg::{try_index_reg, try_reg16, try_reg8, Reg16, Reg8};
use crate::segment::Segments;
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

use super::operand::{as_instruction_byte, expect_comma, parse_mem, Mem};

pub fn emit(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    // LD (mem), src
    if reader.at_char('(') {
        let mem = parse_mem(reader, symbols, diag, pass)?;
        expect_comma(reader, diag)?;
        return to_mem(reader, symbols, segs, diag, pass, mem);
    }

    // LD I, A / LD R, A
    if reader.accept_keyword(Keyword::I) {
        expect_comma(reader, diag)?;
        return expect_a_then_ed(reader, diag, segs, 0x47);
    }
    if reader.accept_keyword(Keyword::R) {
        expect_comma(reader, diag)?;
        return expect_a_then_ed(reader, diag, segs, 0x4F);
    }

    // LD SP, HL | IX | IY
    if reader.accept_keyword(Keyword::Sp) {
        expect_comma(reader, diag)?;
        if reader.accept_keyword(Keyword::Hl) {
            segs.emit_byte(0xF9);
            return Ok(());
        }
        if let Some(ix) = try_index_reg(reader) {
            segs.emit_byte(ix.prefix());
            segs.emit_byte(0xF9);
            return Ok(());
        }
        return invalid_register(reader, diag);
    }

    // LD IX|IY, nn | (nn)
    if let Some(ix) = try_index_reg(reader) {
        expect_comma(reader, diag)?;
        if reader.at_char('(') {
            match parse_mem(reader, symbols, diag, pass)? {
                Mem::Direct(addr) => {
                    segs.emit_byte(ix.prefix());
                    segs.emit_byte(0x2A);
                    segs.emit_address_word(addr);
                    return Ok(());
                }
                _ => return invalid_register(reader, diag),
            }
        }
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        segs.emit_byte(ix.prefix());
        segs.emit_byte(0x21);
        segs.emit_address_word(addr);
        return Ok(());
    }

    // LD rp, nn | (nn) where rp in {BC, DE, HL, SP}
    if let Some(rp) = try_reg16(reader) {
        expect_comma(reader, diag)?;
        if reader.at_char('(') {
            match parse_mem(reader, symbols, diag, pass)? {
                Mem::Direct(addr) => {
                    if rp == Reg16::Hl {
                        segs.emit_byte(0x2A);
                    } else {
                        segs.emit_byte(0xED);
                        segs.emit_byte(0x4B | (rp.code() << 4));
                    }
                    segs.emit_address_word(addr);
                    return Ok(());
                }
                _ => return invalid_register(reader, diag),
            }
        }
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        segs.emit_byte(0x01 | (rp.code() << 4));
        segs.emit_address_word(addr);
        return Ok(());
    }

    // LD r, ...
    if let Some(dst) = try_reg8(reader) {
        expect_comma(reader, diag)?;

        if dst == Reg8::A && reader.accept_keyword(Keyword::I) {
            segs.emit_byte(0xED);
            segs.emit_byte(0x57);
            return Ok(());
        }
        if dst == Reg8::A && reader.accept_keyword(Keyword::R) {
            segs.emit_byte(0xED);
            segs.emit_byte(0x5F);
            return Ok(());
        }

        if reader.at_char('(') {
            let pos = reader.current().position.clone();
            let mem = parse_mem(reader, symbols, diag, pass)?;
            return from_mem(reader, diag, segs, pos, dst, mem);
        }

        if let Some(src) = try_reg8(reader) {
            segs.emit_byte(0x40 | (dst.code() << 3) | src.code());
            return Ok(());
        }

        let pos = reader.current().position.clone();
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        let n = as_instruction_byte(reader, diag, pos, addr.value)?;
        segs.emit_byte(0x06 | (dst.code() << 3));
        segs.emit_byte(n);
        return Ok(());
    }

    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "syntax error: expected LD destination".into());
    Err(())
}

fn to_mem(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    mem: Mem,
) -> Result<(), ()> {
    match mem {
        Mem::Hl | Mem::Indexed(..) => {
            if let Some(src) = try_reg8(reader) {
                emit_mem_opcode(segs, mem, 0x70 | src.code());
                return Ok(());
            }
            let pos = reader.current().position.clone();
            let addr = eval::evaluate(reader, symbols, diag, pass)?;
            let n = as_instruction_byte(reader, diag, pos, addr.value)?;
            match mem {
                Mem::Hl => {
                    segs.emit_byte(0x36);
                    segs.emit_byte(n);
                }
                Mem::Indexed(ix, d) => {
                    segs.emit_byte(ix.prefix());
                    segs.emit_byte(0x36);
                    segs.emit_byte(d as u8);
                    segs.emit_byte(n);
                }
                _ => unreachable!(),
            }
            Ok(())
        }
        Mem::Bc => expect_a_then(reader, diag, segs, 0x02),
        Mem::De => expect_a_then(reader, diag, segs, 0x12),
        Mem::Direct(addr) => {
            if reader.accept_keyword(Keyword::A) {
                segs.emit_byte(0x32);
                segs.emit_address_word(addr);
                return Ok(());
            }
            if let Some(rp) = try_reg16(reader) {
                if rp == Reg16::Hl {
                    segs.emit_byte(0x22);
                } else {
                    segs.emit_byte(0xED);
                    segs.emit_byte(0x43 | (rp.code() << 4));
                }
                segs.emit_address_word(addr);
                return Ok(());
            }
            if let Some(ix) = try_index_reg(reader) {
                segs.emit_byte(ix.prefix());
                segs.emit_byte(0x22);
                segs.emit_address_word(addr);
                return Ok(());
            }
            invalid_register(reader, diag)
        }
    }
}

fn from_mem(
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
    segs: &mut Segments,
    pos: crate::pos::SourcePosition,
    dst: Reg8,
    mem: Mem,
) -> Result<(), ()> {
    match mem {
        Mem::Hl | Mem::Indexed(..) => {
            emit_mem_opcode(segs, mem, 0x40 | (dst.code() << 3) | 6);
            Ok(())
        }
        Mem::Bc if dst == Reg8::A => {
            segs.emit_byte(0x0A);
            Ok(())
        }
        Mem::De if dst == Reg8::A => {
            segs.emit_byte(0x1A);
            Ok(())
        }
        Mem::Direct(addr) if dst == Reg8::A => {
            segs.emit_byte(0x3A);
            segs.emit_address_word(addr);
            Ok(())
        }
        _ => {
            report_error(reader, diag, pos, "invalid register".into());
            Err(())
        }
    }
}

fn emit_mem_opcode(segs: &mut Segments, mem: Mem, opcode: u8) {
    match mem {
        Mem::Hl => segs.emit_byte(opcode),
        Mem::Indexed(ix, d) => {
            segs.emit_byte(ix.prefix());
            segs.emit_byte(opcode);
            segs.emit_byte(d as u8);
        }
        _ => unreachable!(),
    }
}

fn expect_a_then(
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
    segs: &mut Segments,
    opcode: u8,
) -> Result<(), ()> {
    if reader.accept_keyword(Keyword::A) {
        segs.emit_byte(opcode);
        Ok(())
    } else {
        invalid_register(reader, diag)
    }
}

/// Like [`expect_a_then`], but for the `0xED`-prefixed `LD A,I`/`LD A,R`/
/// `LD I,A`/`LD R,A` forms.
fn expect_a_then_ed(
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
    segs: &mut Segments,
    opcode: u8,
) -> Result<(), ()> {
    if reader.accept_keyword(Keyword::A) {
        segs.emit_byte(0xED);
        segs.emit_byte(opcode);
        Ok(())
    } else {
        invalid_register(reader, diag)
    }
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

    fn emit_bytes(src: &'static str) -> Vec<u8> {
        let opener = MemOpener(src);
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        emit(&mut reader, &symbols, &mut segs, &mut diag, 2).unwrap();
        assert_eq!(diag.error_count, 0);
        segs.code.bytes.clone()
    }

    #[test]
    fn ld_a_immediate() {
        assert_eq!(emit_bytes("A, 5\n"), vec![0x3E, 0x05]);
    }

    #[test]
    fn ld_hl_immediate() {
        assert_eq!(emit_bytes("HL, 1234H\n"), vec![0x21, 0x34, 0x12]);
    }

    #[test]
    fn ld_hl_memory() {
        assert_eq!(emit_bytes("HL, (1234H)\n"), vec![0x2A, 0x34, 0x12]);
    }

    #[test]
    fn ld_indexed_immediate() {
        assert_eq!(emit_bytes("(IX+2), 7\n"), vec![0xDD, 0x36, 0x02, 0x07]);
    }

    #[test]
    fn ld_reg_to_reg() {
        assert_eq!(emit_bytes("B, C\n"), vec![0x41]);
    }

    #[test]
    fn ld_bc_zero() {
        assert_eq!(emit_bytes("BC, 0\n"), vec![0x01, 0x00, 0x00]);
    }

    #[test]
    fn ld_a_i_and_r() {
        assert_eq!(emit_bytes("A, I\n"), vec![0xED, 0x57]);
        assert_eq!(emit_bytes("A, R\n"), vec![0xED, 0x5F]);
    }

    #[test]
    fn ld_sp_hl() {
        assert_eq!(emit_bytes("SP, HL\n"), vec![0xF9]);
    }
}
