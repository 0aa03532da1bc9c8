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

//! Z80 register, register-pair, index-register, and condition-code tables
//! (spec §4.4 "Register tables"), plus the token-level recognizers the
//! instruction emitter uses to consume them.

use crate::keyword::Keyword;
use crate::token_reader::TokenReader;

/// `SingleRegisters[8]`: `B,C,D,E,H,L,_,A`. Slot 6 is reserved for `(HL)`
/// and is never produced by [`try_reg8`]; the emitter handles `(HL)` through
/// the memory-operand path instead.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reg8 { B, C, D, E, H, L, A }

impl Reg8 {
    /// The 3-bit encoding used in `ddd`/`sss` opcode fields.
    pub fn code(self) -> u8 {
        match self {
            Reg8::B => 0, Reg8::C => 1, Reg8::D => 2, Reg8::E => 3,
            Reg8::H => 4, Reg8::L => 5, Reg8::A => 7,
        }
    }
}

/// `RegisterPairs[4]`: `BC,DE,HL,SP`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reg16 { Bc, De, Hl, Sp }

impl Reg16 {
    pub fn code(self) -> u8 {
        match self {
            Reg16::Bc => 0, Reg16::De => 1, Reg16::Hl => 2, Reg16::Sp => 3,
        }
    }
}

/// `StackRegisterPairs[4]`: `BC,DE,HL,AF`, the distinct pair table `PUSH`
/// and `POP` use in place of [`Reg16`] -- `AF` takes the slot `SP` holds
/// everywhere else.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StackPair { Bc, De, Hl, Af }

impl StackPair {
    pub fn code(self) -> u8 {
        match self {
            StackPair::Bc => 0, StackPair::De => 1, StackPair::Hl => 2, StackPair::Af => 3,
        }
    }
}

/// Consumes a `PUSH`/`POP` register-pair name (`BC,DE,HL,AF`) if present.
pub fn try_stack_pair(reader: &mut TokenReader) -> Option<StackPair> {
    let r = match keyword_of(reader)? {
        Keyword::Bc => StackPair::Bc, Keyword::De => StackPair::De,
        Keyword::Hl => StackPair::Hl, Keyword::Af => StackPair::Af,
        _ => return None,
    };
    reader.advance();
    Some(r)
}

/// `IndexRegisterPrefixes = { IX -> 0xDD, IY -> 0xFD }`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IndexReg { Ix, Iy }

impl IndexReg {
    pub fn prefix(self) -> u8 {
        match self { IndexReg::Ix => 0xDD, IndexReg::Iy => 0xFD }
    }
}

/// `Conditions[8]`: `NZ,Z,NC,C,PO,PE,P,M`. The first four double as
/// [`ShortJumpConditions`] for `JR`/`DJNZ`/structured-flow lowering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond { Nz, Z, Nc, C, Po, Pe, P, M }

impl Cond {
    pub fn code(self) -> u8 {
        match self {
            Cond::Nz => 0, Cond::Z => 1, Cond::Nc => 2, Cond::C => 3,
            Cond::Po => 4, Cond::Pe => 5, Cond::P  => 6, Cond::M => 7,
        }
    }

    /// True if this condition is one of `ShortJumpConditions = {NZ,Z,NC,C}`,
    /// the only four usable with `JR`, `WHILE`, and `IF`.
    pub fn is_short_jump(self) -> bool {
        self.code() < 4
    }

    /// The logical negation, used by the structured-flow compiler to invert
    /// a trailing condition into a skip-the-block test.
    pub fn negate(self) -> Cond {
        match self {
            Cond::Nz => Cond::Z,  Cond::Z  => Cond::Nz,
            Cond::Nc => Cond::C,  Cond::C  => Cond::Nc,
            Cond::Po => Cond::Pe, Cond::Pe => Cond::Po,
            Cond::P  => Cond::M,  Cond::M  => Cond::P,
        }
    }
}

fn keyword_of(reader: &TokenReader) -> Option<Keyword> {
    reader.keyword_of(reader.current())
}

/// Consumes an 8-bit register name (`A,B,C,D,E,H,L`) if present.
pub fn try_reg8(reader: &mut TokenReader) -> Option<Reg8> {
    let r = match keyword_of(reader)? {
        Keyword::A => Reg8::A, Keyword::B => Reg8::B, Keyword::C => Reg8::C,
        Keyword::D => Reg8::D, Keyword::E => Reg8::E, Keyword::H => Reg8::H,
        Keyword::L => Reg8::L,
        _ => return None,
    };
    reader.advance();
    Some(r)
}

/// Consumes a 16-bit register-pair name (`BC,DE,HL,SP`) if present.
pub fn try_reg16(reader: &mut TokenReader) -> Option<Reg16> {
    let r = match keyword_of(reader)? {
        Keyword::Bc => Reg16::Bc, Keyword::De => Reg16::De,
        Keyword::Hl => Reg16::Hl, Keyword::Sp => Reg16::Sp,
        _ => return None,
    };
    reader.advance();
    Some(r)
}

/// Consumes `IX` or `IY` if present.
pub fn try_index_reg(reader: &mut TokenReader) -> Option<IndexReg> {
    let r = match keyword_of(reader)? {
        Keyword::Ix => IndexReg::Ix,
        Keyword::Iy => IndexReg::Iy,
        _ => return None,
    };
    reader.advance();
    Some(r)
}

/// Consumes any of the eight condition codes if present.
pub fn try_cond(reader: &mut TokenReader) -> Option<Cond> {
    let c = match keyword_of(reader)? {
        Keyword::Nz => Cond::Nz, Keyword::Z  => Cond::Z,
        Keyword::Nc => Cond::Nc, Keyword::C  => Cond::C,
        Keyword::Po => Cond::Po, Keyword::Pe => Cond::Pe,
        Keyword::P  => Cond::P,  Keyword::M  => Cond::M,
        _ => return None,
    };
    reader.advance();
    Some(c)
}

/// Consumes one of the four `ShortJumpConditions` if present, for contexts
/// (`JR`, `DJNZ` fallback, `IF`, `WHILE`) that never accept the other four.
/// Leaves the token unconsumed if a condition keyword is present but not
/// one of the short-jump four, so the caller can report it as written.
pub fn try_short_cond(reader: &mut TokenReader) -> Option<Cond> {
    if at_short_cond(reader) {
        try_cond(reader)
    } else {
        None
    }
}

/// Non-consuming check for a short-jump condition, used where the caller
/// must decide between a `JR cc, e` and a bare `JR e` before committing to
/// consume anything.
pub fn at_short_cond(reader: &TokenReader) -> bool {
    matches!(
        keyword_of(reader),
        Some(Keyword::Nz) | Some(Keyword::Z) | Some(Keyword::Nc) | Some(Keyword::C)
    )
}

pub fn at_cond(reader: &TokenReader) -> bool {
    matches!(
        keyword_of(reader),
        Some(Keyword::Nz) | Some(Keyword::Z)  | Some(Keyword::Nc) | Some(Keyword::C) |
        Some(Keyword::Po) | Some(Keyword::Pe) | Some(Keyword::P)  | Some(Keyword::M)
    )
}
