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

//! Reserved words.
//!
//! This table is the engine's one Z80-specific substitution point: swapping
//! another 8/16-bit instruction set onto the same tokenizer/parser/driver
//! means swapping the instruction mnemonics and register names registered
//! here (the operator, directive, and structured-flow keywords above them
//! are architecture-neutral and would stay).

use std::collections::HashMap;

use crate::mem::StringTable;

/// Every reserved word the tokenizer can produce, spanning operators
/// written as words, assembler directives, structured-flow keywords, and
/// every Z80 mnemonic, register, register pair, and condition code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Keyword {
    // --- operators ---
    Or, Xor, And, Shl, Shr, Mod, Not, Low, High,

    // --- directives ---
    Include, Cseg, Dseg, Public, Extrn, Ext,
    Defb, Db, Defw, Dw, Defs, Ds, Equ,

    // --- structured flow ---
    If, Else, ElseIf, EndIf, Do, While, Wend, Dwnz,

    // --- no-operand instructions ---
    Ldi, Ldir, Ldd, Lddr, Exx, Rlca, Rla, Rrca, Rra, Cpl, Neg, Ccf, Scf,
    Cpi, Cpir, Cpd, Cpdr, Reti, Retn, Nop, Halt, Di, Ei,
    Ini, Inir, Ind, Indr, Outi, Outir, Outd, Outdr, Daa, Rld, Rrd,

    // --- instruction mnemonics with operands ---
    Ld, Ex, Push, Pop,
    Rlc, Rl, Rrc, Rr, Sla, Sra, Srl,
    Sub, Cp, Add, Adc, Sbc,
    Inc, Dec,
    Bit, Set, Res,
    Jp, Jr, Djnz, Call, Ret, Rst,
    Im, In, Out,

    // --- registers & register pairs ---
    A, B, C, D, E, H, L,
    Bc, De, Hl, Sp, Af, AfPrime, Ix, Iy,
    I, R,

    // --- conditions not already covered by a register name ---
    Nz, Z, Nc, Po, Pe, P, M,
}

/// `(uppercased spelling, keyword)` pairs, in the stable order they are
/// registered into a [`StringTable`].
pub static KEYWORDS: &[(&str, Keyword)] = &[
    ("OR", Keyword::Or), ("XOR", Keyword::Xor), ("AND", Keyword::And),
    ("SHL", Keyword::Shl), ("SHR", Keyword::Shr), ("MOD", Keyword::Mod),
    ("NOT", Keyword::Not), ("LOW", Keyword::Low), ("HIGH", Keyword::High),

    ("INCLUDE", Keyword::Include), ("CSEG", Keyword::Cseg), ("DSEG", Keyword::Dseg),
    ("PUBLIC", Keyword::Public), ("EXTRN", Keyword::Extrn), ("EXT", Keyword::Ext),
    ("DEFB", Keyword::Defb), ("DB", Keyword::Db),
    ("DEFW", Keyword::Defw), ("DW", Keyword::Dw),
    ("DEFS", Keyword::Defs), ("DS", Keyword::Ds),
    ("EQU", Keyword::Equ),

    ("IF", Keyword::If), ("ELSE", Keyword::Else), ("ELSEIF", Keyword::ElseIf),
    ("ENDIF", Keyword::EndIf), ("DO", Keyword::Do), ("WHILE", Keyword::While),
    ("WEND", Keyword::Wend), ("DWNZ", Keyword::Dwnz),

    ("LDI", Keyword::Ldi), ("LDIR", Keyword::Ldir), ("LDD", Keyword::Ldd), ("LDDR", Keyword::Lddr),
    ("EXX", Keyword::Exx), ("RLCA", Keyword::Rlca), ("RLA", Keyword::Rla),
    ("RRCA", Keyword::Rrca), ("RRA", Keyword::Rra), ("CPL", Keyword::Cpl),
    ("NEG", Keyword::Neg), ("CCF", Keyword::Ccf), ("SCF", Keyword::Scf),
    ("CPI", Keyword::Cpi), ("CPIR", Keyword::Cpir), ("CPD", Keyword::Cpd), ("CPDR", Keyword::Cpdr),
    ("RETI", Keyword::Reti), ("RETN", Keyword::Retn), ("NOP", Keyword::Nop),
    ("HALT", Keyword::Halt), ("DI", Keyword::Di), ("EI", Keyword::Ei),
    ("INI", Keyword::Ini), ("INIR", Keyword::Inir), ("IND", Keyword::Ind), ("INDR", Keyword::Indr),
    ("OUTI", Keyword::Outi), ("OUTIR", Keyword::Outir), ("OUTD", Keyword::Outd), ("OUTDR", Keyword::Outdr),
    ("DAA", Keyword::Daa), ("RLD", Keyword::Rld), ("RRD", Keyword::Rrd),

    ("LD", Keyword::Ld), ("EX", Keyword::Ex), ("PUSH", Keyword::Push), ("POP", Keyword::Pop),
    ("RLC", Keyword::Rlc), ("RL", Keyword::Rl), ("RRC", Keyword::Rrc), ("RR", Keyword::Rr),
    ("SLA", Keyword::Sla), ("SRA", Keyword::Sra), ("SRL", Keyword::Srl),
    ("SUB", Keyword::Sub), ("CP", Keyword::Cp), ("ADD", Keyword::Add),
    ("ADC", Keyword::Adc), ("SBC", Keyword::Sbc),
    ("INC", Keyword::Inc), ("DEC", Keyword::Dec),
    ("BIT", Keyword::Bit), ("SET", Keyword::Set), ("RES", Keyword::Res),
    ("JP", Keyword::Jp), ("JR", Keyword::Jr), ("DJNZ", Keyword::Djnz),
    ("CALL", Keyword::Call), ("RET", Keyword::Ret), ("RST", Keyword::Rst),
    ("IM", Keyword::Im), ("IN", Keyword::In), ("OUT", Keyword::Out),

    ("A", Keyword::A), ("B", Keyword::B), ("C", Keyword::C), ("D", Keyword::D),
    ("E", Keyword::E), ("H", Keyword::H), ("L", Keyword::L),
    ("BC", Keyword::Bc), ("DE", Keyword::De), ("HL", Keyword::Hl), ("SP", Keyword::Sp),
    ("AF", Keyword::Af), ("AF'", Keyword::AfPrime), ("IX", Keyword::Ix), ("IY", Keyword::Iy),
    ("I", Keyword::I), ("R", Keyword::R),

    ("NZ", Keyword::Nz), ("Z", Keyword::Z), ("NC", Keyword::Nc),
    ("PO", Keyword::Po), ("PE", Keyword::Pe), ("P", Keyword::P), ("M", Keyword::M),
];

/// Maps keyword ids (as interned into a [`StringTable`]) to and from
/// [`Keyword`] variants, so the parser can match on the enum instead of
/// re-comparing strings at every decision point.
pub struct KeywordTable {
    by_id: HashMap<u32, Keyword>,
    id_of: HashMap<Keyword, u32>,
}

impl KeywordTable {
    /// Registers every entry of [`KEYWORDS`] into `strings`.
    pub fn install(strings: &mut StringTable) -> Self {
        let mut by_id = HashMap::with_capacity(KEYWORDS.len());
        let mut id_of = HashMap::with_capacity(KEYWORDS.len());

        for &(text, kw) in KEYWORDS {
            let id = strings.register_keyword(text).0;
            by_id.insert(id, kw);
            id_of.insert(kw, id);
        }

        Self { by_id, id_of }
    }

    #[inline]
    pub fn keyword_of(&self, id: u32) -> Option<Keyword> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    pub fn id_of(&self, kw: Keyword) -> u32 {
        self.id_of[&kw]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_round_trips() {
        let mut strings = StringTable::new();
        let table = KeywordTable::install(&mut strings);

        for &(_text, kw) in KEYWORDS {
            let id = table.id_of(kw);
            assert_eq!(table.keyword_of(id), Some(kw));
        }
    }

    #[test]
    fn spellings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for &(text, _) in KEYWORDS {
            assert!(seen.insert(text), "duplicate keyword spelling: {text}");
        }
    }
}
