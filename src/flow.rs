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

//! Structured-flow lowering: `IF/ELSE/ELSEIF/ENDIF` and `DO/WHILE/WEND/DWNZ`
//! (spec §4.6). Each keyword handler consumes its trailing condition (if
//! any), synthesizes the matching conditional/unconditional jump, and
//! updates the block stack.

use crate::addr::Address;
use crate::diag::{report_error, Diagnostics};
use crate::jump;
use crate::reg::{try_short_cond, Cond};
use crate::segment::Segments;
use crate::symbol::{SymbolTable, AUTO_LABEL_BASE};
use crate::token_reader::TokenReader;

/// One open `IF` or `DO` structure.
enum Block {
    If {
        /// `ELSE`'s target; `None` once an `ELSE` has consumed it.
        else_id: Option<u32>,
        end_id: u32,
    },
    While {
        begin_id: u32,
        repeat_id: u32,
        end_id: u32,
        /// Set once the `WHILE` optimization (spec §4.6) has elided the
        /// `WEND` back-jump and exit label.
        end_erased: bool,
        used_while: bool,
        used_dwnz: bool,
    },
}

/// The open-block stack plus the auto-label counter, both reset at the
/// start of every pass (spec §3 "Lifecycles").
pub struct FlowStack {
    next_label: u32,
    stack: Vec<Block>,
}

impl FlowStack {
    pub fn new() -> Self {
        Self { next_label: AUTO_LABEL_BASE, stack: Vec::new() }
    }

    fn alloc_label(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    /// True once every opened block has been closed; the driver checks
    /// this at end-of-file.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Number of currently open blocks, for the listing writer's indent.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for FlowStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits `JR cc?, target` or, when out of short-jump range, the
/// `JP cc?, nn` fallback (spec §4.5's fallback policy, shared by every
/// synthesized structured-flow jump).
fn emit_jump(segs: &mut Segments, cc: Option<Cond>, target: Address) {
    let start = segs.here();
    if let Some(offset) = jump::short_offset(start, target) {
        let opcode = match cc {
            None => 0x18,
            Some(c) => 0x20 | (c.code() << 3),
        };
        segs.emit_byte(opcode);
        segs.emit_byte(offset as u8);
    } else {
        let opcode = match cc {
            None => 0xC3,
            Some(c) => 0xC2 | (c.code() << 3),
        };
        segs.emit_byte(opcode);
        segs.emit_address_word(target);
    }
}

fn expect_short_cond(
    reader: &mut TokenReader,
    diag: &mut Diagnostics,
) -> Result<Cond, ()> {
    let pos = reader.current().position.clone();
    match try_short_cond(reader) {
        Some(cc) => Ok(cc),
        None => {
            report_error(reader, diag, pos, "syntax error: expected condition".into());
            Err(())
        }
    }
}

pub fn if_stmt(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let cc = expect_short_cond(reader, diag)?;
    let else_id = flow.alloc_label();
    let end_id = flow.alloc_label();
    emit_jump(segs, Some(cc.negate()), symbols.address_of(else_id));
    flow.stack.push(Block::If { else_id: Some(else_id), end_id });
    Ok(())
}

pub fn else_stmt(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    match flow.stack.last_mut() {
        Some(Block::If { else_id, end_id }) => match *else_id {
            None => {
                report_error(reader, diag, pos, "multiple ELSE in IF block".into());
                Err(())
            }
            Some(eid) => {
                let end_target = symbols.address_of(*end_id);
                emit_jump(segs, None, end_target);
                let here = segs.here();
                symbols.define(eid, here, pass);
                *else_id = None;
                Ok(())
            }
        },
        _ => {
            report_error(reader, diag, pos, "no IF statement".into());
            Err(())
        }
    }
}

pub fn elseif_stmt(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    let end_id = match flow.stack.last() {
        Some(Block::If { else_id: Some(_), end_id }) => *end_id,
        Some(Block::If { else_id: None, .. }) => {
            report_error(reader, diag, pos, "multiple ELSE in IF block".into());
            return Err(());
        }
        _ => {
            report_error(reader, diag, pos, "no IF statement".into());
            return Err(());
        }
    };

    let eid = match flow.stack.last() {
        Some(Block::If { else_id: Some(id), .. }) => *id,
        _ => unreachable!(),
    };
    emit_jump(segs, None, symbols.address_of(end_id));
    let here = segs.here();
    symbols.define(eid, here, pass);

    let cc = expect_short_cond(reader, diag)?;
    let new_else = flow.alloc_label();
    emit_jump(segs, Some(cc.negate()), symbols.address_of(new_else));

    if let Some(Block::If { else_id, .. }) = flow.stack.last_mut() {
        *else_id = Some(new_else);
    }
    Ok(())
}

pub fn endif_stmt(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    match flow.stack.pop() {
        Some(Block::If { else_id, end_id }) => {
            let id = else_id.unwrap_or(end_id);
            let here = segs.here();
            symbols.define(id, here, pass);
            Ok(())
        }
        other => {
            if let Some(b) = other {
                flow.stack.push(b);
            }
            report_error(reader, diag, pos, "no IF statement".into());
            Err(())
        }
    }
}

pub fn do_stmt(symbols: &mut SymbolTable, segs: &mut Segments, pass: u32, flow: &mut FlowStack) {
    let begin_id = flow.alloc_label();
    let here = segs.here();
    symbols.define(begin_id, here, pass);
    let repeat_id = flow.alloc_label();
    let end_id = flow.alloc_label();
    flow.stack.push(Block::While {
        begin_id, repeat_id, end_id,
        end_erased: false, used_while: false, used_dwnz: false,
    });
}

pub fn while_stmt(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let cc = expect_short_cond(reader, diag)?;
    let pos = reader.current().position.clone();

    let (begin_id, repeat_id, end_id, used_dwnz) = match flow.stack.last() {
        Some(Block::While { begin_id, repeat_id, end_id, used_dwnz, .. }) =>
            (*begin_id, *repeat_id, *end_id, *used_dwnz),
        _ => {
            report_error(reader, diag, pos, "no DO statement".into());
            return Err(());
        }
    };
    if used_dwnz {
        report_error(reader, diag, pos, "WHILE and WNZ cannot be used in the same syntax".into());
        return Err(());
    }

    let repeat_addr = symbols.address_of(repeat_id);
    let here = segs.here();
    let trivial = !repeat_addr.is_undefined()
        && repeat_addr.ty == here.ty
        && repeat_addr.value - here.value <= 1;

    if trivial {
        emit_jump(segs, Some(cc), symbols.address_of(begin_id));
    } else {
        emit_jump(segs, Some(cc.negate()), symbols.address_of(end_id));
    }

    if let Some(Block::While { end_erased, used_while, .. }) = flow.stack.last_mut() {
        *used_while = true;
        if trivial {
            *end_erased = true;
        }
    }
    Ok(())
}

pub fn wend_stmt(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    match flow.stack.pop() {
        Some(Block::While { begin_id, repeat_id, end_id, end_erased, .. }) => {
            if !end_erased {
                let here = segs.here();
                symbols.define(repeat_id, here, pass);
                emit_jump(segs, None, symbols.address_of(begin_id));
                let here = segs.here();
                symbols.define(end_id, here, pass);
            }
            Ok(())
        }
        other => {
            if let Some(b) = other {
                flow.stack.push(b);
            }
            report_error(reader, diag, pos, "no DO statement".into());
            Err(())
        }
    }
}

pub fn dwnz_stmt(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
    flow: &mut FlowStack,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    match flow.stack.pop() {
        Some(Block::While { begin_id, repeat_id, used_while, .. }) => {
            if used_while {
                report_error(reader, diag, pos,
                    "WHILE and WNZ cannot be used in the same syntax".into());
                return Err(());
            }
            let here = segs.here();
            symbols.define(repeat_id, here, pass);
            let begin_addr = symbols.address_of(begin_id);
            if let Some(offset) = jump::short_offset(here, begin_addr) {
                segs.emit_byte(0x10);
                segs.emit_byte(offset as u8);
            } else {
                segs.emit_byte(0x05);
                segs.emit_byte(0xC2 | (Cond::Nz.code() << 3));
                segs.emit_address_word(begin_addr);
            }
            Ok(())
        }
        other => {
            if let Some(b) = other {
                flow.stack.push(b);
            }
            report_error(reader, diag, pos, "no DO statement".into());
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::Assembler;
    use crate::source::SourceOpener;
    use std::path::Path;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> std::io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// `IF NZ | INC A | ELSE | DEC A | ENDIF` -> `28 03 3C 18 01 3D` (spec
    /// scenario 7).
    ///
    /// The short forms here only exist once the `ELSE`/`ENDIF` auto-labels
    /// have been defined by a prior pass; pass 1 sees them undefined and
    /// emits the long conditional form instead (§4.5's pass-1-assumes-long
    /// policy). So this has to run the full two-pass `Assembler`, not call
    /// `if_stmt`/`else_stmt`/`endif_stmt` once each over a fresh table.
    #[test]
    fn if_else_endif_matches_spec_scenario() {
        let opener = MemOpener("IF NZ\nINC A\nELSE\nDEC A\nENDIF\n");
        let result = Assembler::default()
            .assemble(&opener, Path::new("t.asm"))
            .unwrap();

        assert!(result.succeeded());
        let code_len = u16::from_le_bytes([result.object[2], result.object[3]]) as usize;
        assert_eq!(&result.object[4..4 + code_len], &[0x28, 0x03, 0x3C, 0x18, 0x01, 0x3D]);
    }

    #[test]
    fn do_dwnz_emits_short_djnz() {
        let mut symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        let mut flow = FlowStack::new();

        do_stmt(&mut symbols, &mut segs, 2, &mut flow);
        segs.emit_byte(0x00); // one-byte body (e.g. NOP)

        let opener = MemOpener("\n");
        let mut r = reader(&opener);
        dwnz_stmt(&mut r, &mut symbols, &mut segs, &mut diag, 2, &mut flow).unwrap();

        assert_eq!(diag.error_count, 0);
        assert!(flow.is_empty());
        assert_eq!(segs.code.bytes, vec![0x00, 0x10, 0xFD]); // DJNZ -3
    }

    #[test]
    fn else_without_if_is_an_error() {
        let mut symbols = SymbolTable::new();
        let mut segs = Segments::new();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        let mut flow = FlowStack::new();

        let opener = MemOpener("\n");
        let mut r = reader(&opener);
        assert!(else_stmt(&mut r, &mut symbols, &mut segs, &mut diag, 2, &mut flow).is_err());
    }
}
