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

//! Rotate/shift, 8-bit ALU, 16-bit `ADD`/`ADC`/`SBC`, `INC`/`DEC`, and
//! `BIT`/`SET`/`RES` (spec §4.4).

use crate::diag::{report_error, Diagnostics};
use crate::eval;
use crate::keyword::Keyword;
use crate::reg::{try_index_reg, try_reg16, IndexReg, Reg16};
use crate::segment::Segments;
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

use super::operand::{
    as_instruction_byte, emit_cb_op, emit_plain_op, expect_comma, try_regmem8, RegOrMem8,
};

/// `RLC, RL, RRC, RR, SLA, SRA, SRL` -- single-operand, `CB`-prefixed.
pub fn rotate_shift(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let base = match kw {
        Keyword::Rlc => 0x00,
        Keyword::Rl  => 0x10,
        Keyword::Rrc => 0x08,
        Keyword::Rr  => 0x18,
        Keyword::Sla => 0x20,
        Keyword::Sra => 0x28,
        Keyword::Srl => 0x38,
        _ => unreachable!(),
    };
    let op = expect_regmem8(reader, symbols, diag, pass)?;
    emit_cb_op(segs, op, base | op.code());
    Ok(())
}

/// `BIT`/`SET`/`RES b, operand` -- `b` must be a constant bit index in
/// `[0, 8)`.
pub fn bit_op(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let base = match kw {
        Keyword::Bit => 0x40,
        Keyword::Set => 0xC0,
        Keyword::Res => 0x80,
        _ => unreachable!(),
    };
    let pos = reader.current().position.clone();
    let bit_addr = eval::evaluate(reader, symbols, diag, pass)?;
    if !(0..8).contains(&bit_addr.value) {
        report_error(reader, diag, pos, format!("out of range: {}", bit_addr.value));
        return Err(());
    }
    let bit = bit_addr.value as u8;
    expect_comma(reader, diag)?;
    let op = expect_regmem8(reader, symbols, diag, pass)?;
    emit_cb_op(segs, op, base | (bit << 3) | op.code());
    Ok(())
}

/// `SUB, AND, OR, XOR, CP` and `ADD A,`/`ADC A,`/`SBC A,`.
pub fn alu8(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let (reg_base, imm_opcode) = match kw {
        Keyword::Add => (0x80, 0xC6),
        Keyword::Adc => (0x88, 0xCE),
        Keyword::Sub => (0x90, 0xD6),
        Keyword::Sbc => (0x98, 0xDE),
        Keyword::And => (0xA0, 0xE6),
        Keyword::Xor => (0xA8, 0xEE),
        Keyword::Or  => (0xB0, 0xF6),
        Keyword::Cp  => (0xB8, 0xFE),
        _ => unreachable!(),
    };

    // `ADD`/`ADC`/`SBC` must name `A` explicitly; the others operate on `A`
    // implicitly. Either way, once past that point the right-hand operand
    // grammar is identical.
    if matches!(kw, Keyword::Add | Keyword::Adc | Keyword::Sbc) {
        if !reader.accept_keyword(Keyword::A) {
            return alu16_or_add_ix(kw, reader, symbols, segs, diag, pass);
        }
        expect_comma(reader, diag)?;
    }

    if let Some(op) = try_regmem8(reader, symbols, diag, pass) {
        let op = op?;
        emit_plain_op(segs, op, reg_base | op.code());
        return Ok(());
    }

    let pos = reader.current().position.clone();
    let addr = eval::evaluate(reader, symbols, diag, pass)?;
    let n = as_instruction_byte(reader, diag, pos, addr.value)?;
    segs.emit_byte(imm_opcode);
    segs.emit_byte(n);
    Ok(())
}

/// `ADD HL,rp` / `ADC HL,rp` / `SBC HL,rp` / `ADD IX|IY,rp`. Reached when
/// `alu8` finds the mnemonic is not followed by `A,`.
fn alu16_or_add_ix(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    _pass: u32,
) -> Result<(), ()> {
    if reader.accept_keyword(Keyword::Hl) {
        expect_comma(reader, diag)?;
        let rp = require_reg16(reader, diag)?;
        match kw {
            Keyword::Add => segs.emit_byte(0x09 | (rp.code() << 4)),
            Keyword::Adc => {
                segs.emit_byte(0xED);
                segs.emit_byte(0x4A | (rp.code() << 4));
            }
            Keyword::Sbc => {
                segs.emit_byte(0xED);
                segs.emit_byte(0x42 | (rp.code() << 4));
            }
            _ => unreachable!(),
        }
        return Ok(());
    }

    if kw == Keyword::Add {
        if let Some(ix) = try_index_reg(reader) {
            expect_comma(reader, diag)?;
            let code = require_indexed_rp(ix, reader, diag)?;
            segs.emit_byte(ix.prefix());
            segs.emit_byte(0x09 | (code << 4));
            return Ok(());
        }
    }

    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "invalid register".into());
    Err(())
}

fn require_reg16(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<Reg16, ()> {
    match try_reg16(reader) {
        Some(rp) => Ok(rp),
        None => {
            let pos = reader.current().position.clone();
            report_error(reader, diag, pos, "invalid register".into());
            Err(())
        }
    }
}

/// The register-pair field for `ADD IX|IY,rp`: `BC`, `DE`, `SP`, or the
/// index register itself occupying the `HL` slot (code 2).
fn require_indexed_rp(
    ix: IndexReg,
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
) -> Result<u8, ()> {
    if let Some(rp) = try_reg16(reader) {
        if rp != Reg16::Hl {
            return Ok(rp.code());
        }
    } else if let Some(other) = try_index_reg(reader) {
        if other == ix {
            return Ok(2);
        }
    }
    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "invalid register".into());
    Err(())
}

/// `INC`/`DEC`, 8-bit or 16-bit depending on the operand.
pub fn inc_dec(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let is_inc = kw == Keyword::Inc;

    if let Some(op) = try_regmem8(reader, symbols, diag, pass) {
        let op = op?;
        let base = if is_inc { 0x04 } else { 0x05 };
        emit_plain_op(segs, op, base | (op.code() << 3));
        return Ok(());
    }

    if let Some(rp) = try_reg16(reader) {
        let base = if is_inc { 0x03 } else { 0x0B };
        segs.emit_byte(base | (rp.code() << 4));
        return Ok(());
    }

    if let Some(ix) = try_index_reg(reader) {
        let base = if is_inc { 0x23 } else { 0x2B };
        segs.emit_byte(ix.prefix());
        segs.emit_byte(base);
        return Ok(());
    }

    let pos = reader.current().position.clone();
    report_error(reader, diag, pos, "invalid register".into());
    Err(())
}

fn expect_regmem8(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<RegOrMem8, ()> {
    match try_regmem8(reader, symbols, diag, pass) {
        Some(r) => r,
        None => {
            let pos = reader.current().position.clone();
            report_error(reader, diag, pos, "invalid register".into());
            Err(())
        }
    }
}
