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

//! The Z80 instruction emitter: one mnemonic keyword in, zero or more
//! encoded bytes (plus fix-ups) out. Organized by destination/operand
//! shape rather than one file per mnemonic, since most of the shape
//! (register tables, memory-operand parsing, range checks) is shared
//! (spec §4.4).

mod arith;
mod branch;
mod ld;
mod operand;
mod plain;

use crate::diag::{report_error, Diagnostics};
use crate::keyword::Keyword;
use crate::segment::Segments;
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

/// Dispatches on the mnemonic keyword already consumed by the statement
/// parser and emits the instruction it introduces.
pub fn emit(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    if plain::is_plain(kw) {
        plain::emit(kw, segs);
        return Ok(());
    }

    match kw {
        Keyword::Ld => ld::emit(reader, symbols, segs, diag, pass),

        Keyword::Rlc | Keyword::Rl | Keyword::Rrc | Keyword::Rr |
        Keyword::Sla | Keyword::Sra | Keyword::Srl =>
            arith::rotate_shift(kw, reader, symbols, segs, diag, pass),

        Keyword::Bit | Keyword::Set | Keyword::Res =>
            arith::bit_op(kw, reader, symbols, segs, diag, pass),

        Keyword::Add | Keyword::Adc | Keyword::Sbc |
        Keyword::Sub | Keyword::And | Keyword::Xor | Keyword::Or | Keyword::Cp =>
            arith::alu8(kw, reader, symbols, segs, diag, pass),

        Keyword::Inc | Keyword::Dec =>
            arith::inc_dec(kw, reader, symbols, segs, diag, pass),

        Keyword::Push | Keyword::Pop => branch::push_pop(kw, reader, diag, segs),
        Keyword::Ex => branch::ex(reader, diag, segs),

        Keyword::Jp => branch::jp(reader, symbols, segs, diag, pass),
        Keyword::Jr => branch::jr(reader, symbols, segs, diag, pass),
        Keyword::Djnz => branch::djnz(reader, symbols, segs, diag, pass),
        Keyword::Call => branch::call(reader, symbols, segs, diag, pass),
        Keyword::Ret => { branch::ret(reader, segs); Ok(()) }
        Keyword::Rst => branch::rst(reader, symbols, segs, diag, pass),
        Keyword::Im => branch::im(reader, symbols, segs, diag, pass),
        Keyword::In => branch::in_(reader, symbols, segs, diag, pass),
        Keyword::Out => branch::out(reader, symbols, segs, diag, pass),

        _ => {
            let pos = reader.current().position.clone();
            report_error(reader, diag, pos, "syntax error: not an instruction".into());
            Err(())
        }
    }
}

/// True for every keyword [`emit`] recognizes as an instruction mnemonic,
/// letting the statement parser tell an instruction line from a directive
/// or a bare label before committing to a parse path.
pub fn is_mnemonic(kw: Keyword) -> bool {
    plain::is_plain(kw) || matches!(
        kw,
        Keyword::Ld |
        Keyword::Rlc | Keyword::Rl | Keyword::Rrc | Keyword::Rr |
        Keyword::Sla | Keyword::Sra | Keyword::Srl |
        Keyword::Bit | Keyword::Set | Keyword::Res |
        Keyword::Add | Keyword::Adc | Keyword::Sbc |
        Keyword::Sub | Keyword::And | Keyword::Xor | Keyword::Or | Keyword::Cp |
        Keyword::Inc | Keyword::Dec |
        Keyword::Push | Keyword::Pop | Keyword::Ex |
        Keyword::Jp | Keyword::Jr | Keyword::Djnz | Keyword::Call | Keyword::Ret |
        Keyword::Rst | Keyword::Im | Keyword::In | Keyword::Out
    )
}
