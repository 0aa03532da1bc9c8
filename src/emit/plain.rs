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

//! The no-operand instruction table: `LDI/LDIR/LDD/LDDR`, `EXX`, the
//! accumulator-rotate and flag-control group, the block compare/IO groups,
//! `RETI/RETN/NOP/HALT/DI/EI`, and `DAA/RLD/RRD` (spec §4.4).

use crate::keyword::Keyword;
use crate::segment::Segments;

/// Bytes for every instruction that takes no operand at all. Most are a
/// single `0xED`-prefixed opcode; the accumulator group and `NOP/HALT/DI/EI`
/// are unprefixed.
pub fn emit(kw: Keyword, segs: &mut Segments) {
    match kw {
        Keyword::Nop  => segs.emit_byte(0x00),
        Keyword::Rlca => segs.emit_byte(0x07),
        Keyword::Rrca => segs.emit_byte(0x0F),
        Keyword::Rla  => segs.emit_byte(0x17),
        Keyword::Rra  => segs.emit_byte(0x1F),
        Keyword::Daa  => segs.emit_byte(0x27),
        Keyword::Cpl  => segs.emit_byte(0x2F),
        Keyword::Scf  => segs.emit_byte(0x37),
        Keyword::Ccf  => segs.emit_byte(0x3F),
        Keyword::Halt => segs.emit_byte(0x76),
        Keyword::Exx  => segs.emit_byte(0xD9),
        Keyword::Di   => segs.emit_byte(0xF3),
        Keyword::Ei   => segs.emit_byte(0xFB),

        Keyword::Neg  => emit_ed(segs, 0x44),
        Keyword::Retn => emit_ed(segs, 0x45),
        Keyword::Reti => emit_ed(segs, 0x4D),
        Keyword::Rrd  => emit_ed(segs, 0x67),
        Keyword::Rld  => emit_ed(segs, 0x6F),
        Keyword::Ldi  => emit_ed(segs, 0xA0),
        Keyword::Cpi  => emit_ed(segs, 0xA1),
        Keyword::Ini  => emit_ed(segs, 0xA2),
        Keyword::Outi => emit_ed(segs, 0xA3),
        Keyword::Ldd  => emit_ed(segs, 0xA8),
        Keyword::Cpd  => emit_ed(segs, 0xA9),
        Keyword::Ind  => emit_ed(segs, 0xAA),
        Keyword::Outd => emit_ed(segs, 0xAB),
        Keyword::Ldir => emit_ed(segs, 0xB0),
        Keyword::Cpir => emit_ed(segs, 0xB1),
        Keyword::Inir => emit_ed(segs, 0xB2),
        Keyword::Outir => emit_ed(segs, 0xB3),
        Keyword::Lddr => emit_ed(segs, 0xB8),
        Keyword::Cpdr => emit_ed(segs, 0xB9),
        Keyword::Indr => emit_ed(segs, 0xBA),
        Keyword::Outdr => emit_ed(segs, 0xBB),

        _ => unreachable!("emit::plain::emit called with non-no-operand keyword"),
    }
}

fn emit_ed(segs: &mut Segments, opcode: u8) {
    segs.emit_byte(0xED);
    segs.emit_byte(opcode);
}

/// True for every keyword handled by [`emit`], so the dispatcher can route
/// without duplicating this list.
pub fn is_plain(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::Nop | Keyword::Rlca | Keyword::Rrca | Keyword::Rla | Keyword::Rra |
        Keyword::Daa | Keyword::Cpl  | Keyword::Scf  | Keyword::Ccf | Keyword::Halt |
        Keyword::Exx | Keyword::Di   | Keyword::Ei   |
        Keyword::Neg | Keyword::Retn | Keyword::Reti | Keyword::Rrd | Keyword::Rld |
        Keyword::Ldi | Keyword::Cpi  | Keyword::Ini  | Keyword::Outi |
        Keyword::Ldd | Keyword::Cpd  | Keyword::Ind  | Keyword::Outd |
        Keyword::Ldir | Keyword::Cpir | Keyword::Inir | Keyword::Outir |
        Keyword::Lddr | Keyword::Cpdr | Keyword::Indr | Keyword::Outdr
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_is_single_byte() {
        let mut segs = Segments::new();
        emit(Keyword::Nop, &mut segs);
        assert_eq!(segs.code.bytes, vec![0x00]);
    }

    #[test]
    fn ldir_is_ed_prefixed() {
        let mut segs = Segments::new();
        emit(Keyword::Ldir, &mut segs);
        assert_eq!(segs.code.bytes, vec![0xED, 0xB0]);
    }

    #[test]
    fn halt_is_unprefixed() {
        let mut segs = Segments::new();
        emit(Keyword::Halt, &mut segs);
        assert_eq!(segs.code.bytes, vec![0x76]);
    }
}
