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

//! The two-pass assembler driver: statement framing, directive dispatch,
//! and the fixpoint loop (spec §2 item 9, §4.7, §5).
//!
//! A pass runs to completion, re-reading the source from scratch through a
//! fresh [`TokenReader`], while the symbol table carries over between
//! passes. The driver keeps passing until two consecutive passes agree on
//! every symbol address and on both segment sizes, then replays one more
//! pass to collect the listing and the final segment bytes -- by that
//! point the output is guaranteed stable, so listing bookkeeping never has
//! to run during the unstable intermediate passes.

use std::io;
use std::path::Path;

use crate::addr::Address;
use crate::diag::{report_error, AssembleOptions, Diagnostics};
use crate::emit;
use crate::eval;
use crate::flow::{self, FlowStack};
use crate::keyword::Keyword;
use crate::listing::Listing;
use crate::object;
use crate::segment::{SegmentKind, Segments};
use crate::source::{FsOpener, SourceOpener};
use crate::symbol::{Define, SymbolTable};
use crate::token::TokenKind;
use crate::token_reader::TokenReader;

/// Guards against a source that never reaches a fixpoint; ordinary programs
/// converge in two or three passes.
const MAX_PASSES: u32 = 50;

/// The engine's public entry point, usable from the `z80as` binary and from
/// integration tests alike.
pub struct Assembler {
    options: AssembleOptions,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(AssembleOptions::default())
    }
}

/// Everything a run produces.
pub struct AssembleResult {
    /// Empty when `error_count > 0`: no object is written for a failed run.
    pub object: Vec<u8>,
    /// Empty when `error_count > 0`.
    pub listing: String,
    pub warning_count: u32,
    pub error_count: u32,
}

impl AssembleResult {
    pub fn succeeded(&self) -> bool {
        self.error_count == 0
    }
}

impl Assembler {
    pub fn new(options: AssembleOptions) -> Self {
        Self { options }
    }

    /// Assembles the file at `path` from the real filesystem.
    pub fn assemble_file(&self, path: &Path) -> io::Result<AssembleResult> {
        self.assemble(&FsOpener, path)
    }

    /// Assembles `path` as resolved by `opener`, so tests can supply
    /// in-memory sources instead of touching the filesystem.
    pub fn assemble(&self, opener: &dyn SourceOpener, path: &Path) -> io::Result<AssembleResult> {
        let mut symbols = SymbolTable::new();
        let mut diag = Diagnostics::new(self.options);
        let mut segs = Segments::new();
        let mut prev_sizes: Option<(usize, usize)> = None;
        let mut pass = 1u32;

        loop {
            let before = snapshot(&symbols);
            segs = Segments::new();
            let mut flow = FlowStack::new();
            let mut reader = TokenReader::open(opener, path)?;
            run_pass(&mut reader, &mut symbols, &mut segs, &mut diag, &mut flow, pass, None);

            let sizes = (segs.code.bytes.len(), segs.data.bytes.len());
            let symbols_changed = before != snapshot(&symbols);
            let aborted = diag.error_cap_reached() || pass >= MAX_PASSES;
            let converged = pass >= 2 && !symbols_changed && prev_sizes == Some(sizes);

            if aborted || converged || (diag.has_errors() && pass >= 2) {
                break;
            }

            prev_sizes = Some(sizes);
            pass += 1;
        }

        if diag.has_errors() {
            return Ok(AssembleResult {
                object: Vec::new(),
                listing: String::new(),
                warning_count: diag.warning_count,
                error_count: diag.error_count,
            });
        }

        // Replay once more, under a fresh pass number so that redefining
        // every label at its now-stable address reads as "unchanged"
        // rather than "same pass, multiple definition". Symbol addresses
        // are already stable, so this reproduces byte-identical segments
        // while also collecting the listing.
        pass += 1;
        segs = Segments::new();
        let mut flow = FlowStack::new();
        let mut reader = TokenReader::open(opener, path)?;
        let mut listing = Listing::new();
        run_pass(&mut reader, &mut symbols, &mut segs, &mut diag, &mut flow, pass, Some(&mut listing));

        let object = if diag.has_errors() {
            Vec::new()
        } else {
            object::write(&segs, &symbols, &reader)
        };

        Ok(AssembleResult {
            object,
            listing: listing.render(),
            warning_count: diag.warning_count,
            error_count: diag.error_count,
        })
    }
}

/// `(id, address)` for every known symbol, sorted for stable comparison.
/// Used to detect whether a pass changed any symbol's address -- user
/// labels/`EQU`s and structured-flow auto-labels alike, since both go
/// through [`SymbolTable::define`].
fn snapshot(symbols: &SymbolTable) -> Vec<(u32, Address)> {
    let mut v: Vec<_> = symbols.iter().map(|s| (s.id, s.address)).collect();
    v.sort_by_key(|&(id, _)| id);
    v
}

/// Runs one full pass over the source: repeatedly frames a statement
/// (label definitions, a directive, a structured-flow keyword, or an
/// instruction), recovering to the next statement boundary on error.
fn run_pass(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    flow: &mut FlowStack,
    pass: u32,
    mut listing: Option<&mut Listing>,
) {
    let mut line_start = checkpoint(segs);
    let mut line_addr = segs.here();

    loop {
        if diag.error_cap_reached() {
            break;
        }

        if reader.current().is_eof() {
            if !flow.is_empty() {
                let pos = reader.current().position.clone();
                report_error(reader, diag, pos, "syntax error: unexpected end of file".into());
            }
            flush_line(reader, segs, &mut listing, line_start, line_addr, flow.depth());
            break;
        }

        if reader.current().is_eol() {
            reader.advance();
            flush_line(reader, segs, &mut listing, line_start, line_addr, flow.depth());
            line_start = checkpoint(segs);
            line_addr = segs.here();
            continue;
        }

        if reader.at_char('|') {
            reader.advance();
            continue;
        }

        if statement(reader, symbols, segs, diag, flow, pass).is_err() {
            skip_to_statement_boundary(reader);
        }
    }
}

fn checkpoint(segs: &Segments) -> (i32, i32) {
    (segs.code.tail(), segs.data.tail())
}

/// Drains the source lines completed since `start`, attaching the bytes
/// emitted in that span to the listing (if a listing is being collected for
/// this pass).
fn flush_line(
    reader: &mut TokenReader,
    segs: &Segments,
    listing: &mut Option<&mut Listing>,
    start: (i32, i32),
    addr: Address,
    depth: usize,
) {
    let lines = reader.take_pending_lines();
    let Some(listing) = listing.as_deref_mut() else { return };
    if lines.is_empty() {
        return;
    }
    let mut bytes = segs.code.bytes[start.0 as usize..].to_vec();
    bytes.extend_from_slice(&segs.data.bytes[start.1 as usize..]);
    listing.push(Some(addr), bytes, lines, depth);
}

/// Skips tokens until the next statement separator (`'\n'`, `'|'`, or EOF),
/// so a syntax error in one statement does not swallow the rest of the pass.
fn skip_to_statement_boundary(reader: &mut TokenReader) {
    while !reader.current().is_eol() && !reader.current().is_eof() && !reader.at_char('|') {
        reader.advance();
    }
}

/// Frames one statement: zero or more leading `label:` definitions, then
/// either an `identifier EQU expr`, a directive, a structured-flow keyword,
/// or an instruction.
fn statement(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    flow: &mut FlowStack,
    pass: u32,
) -> Result<(), ()> {
    loop {
        if reader.current().kind == TokenKind::Identifier {
            let token = reader.current().clone();
            reader.advance();

            if reader.accept_char(':') {
                define_symbol(reader, symbols, token.value as u32, segs.here(), pass, diag);
                continue; // another label, or the instruction it decorates, may follow
            }

            if reader.at_keyword(Keyword::Equ) {
                reader.advance();
                let addr = eval::evaluate(reader, symbols, diag, pass)?;
                define_symbol(reader, symbols, token.value as u32, addr, pass, diag);
                return Ok(());
            }

            report_error(reader, diag, token.position.clone(),
                format!("syntax error: unexpected identifier '{}'", reader.text_of(&token)));
            return Err(());
        }

        if let Some(kw) = reader.keyword_of(reader.current()) {
            return dispatch_keyword(kw, reader, symbols, segs, diag, flow, pass);
        }

        let pos = reader.current().position.clone();
        report_error(reader, diag, pos, "syntax error: expected a label, directive, or instruction".into());
        return Err(());
    }
}

fn define_symbol(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    id: u32,
    addr: Address,
    pass: u32,
    diag: &mut Diagnostics,
) {
    if let Define::MultipleDefinition = symbols.define(id, addr, pass) {
        let pos = reader.current().position.clone();
        report_error(reader, diag, pos, "multiple definition of symbol".into());
    }
}

fn dispatch_keyword(
    kw: Keyword,
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    flow: &mut FlowStack,
    pass: u32,
) -> Result<(), ()> {
    reader.advance(); // consume the directive/keyword/mnemonic itself

    match kw {
        Keyword::Include => directive_include(reader, diag),
        Keyword::Cseg => { segs.select(SegmentKind::Code); Ok(()) }
        Keyword::Dseg => { segs.select(SegmentKind::Data); Ok(()) }
        Keyword::Public => directive_public(reader, symbols, diag),
        Keyword::Extrn | Keyword::Ext => directive_extrn(reader, symbols, diag, pass),
        Keyword::Defb | Keyword::Db => directive_defb(reader, symbols, segs, diag, pass),
        Keyword::Defw | Keyword::Dw => directive_defw(reader, symbols, segs, diag, pass),
        Keyword::Defs | Keyword::Ds => directive_defs(reader, symbols, segs, diag, pass),

        Keyword::If => flow::if_stmt(reader, symbols, segs, diag, flow),
        Keyword::Else => flow::else_stmt(reader, symbols, segs, diag, pass, flow),
        Keyword::ElseIf => flow::elseif_stmt(reader, symbols, segs, diag, pass, flow),
        Keyword::EndIf => flow::endif_stmt(reader, symbols, segs, diag, pass, flow),
        Keyword::Do => { flow::do_stmt(symbols, segs, pass, flow); Ok(()) }
        Keyword::While => flow::while_stmt(reader, symbols, segs, diag, flow),
        Keyword::Wend => flow::wend_stmt(reader, symbols, segs, diag, pass, flow),
        Keyword::Dwnz => flow::dwnz_stmt(reader, symbols, segs, diag, pass, flow),

        _ if emit::is_mnemonic(kw) => emit::emit(kw, reader, symbols, segs, diag, pass),

        _ => {
            let pos = reader.current().position.clone();
            report_error(reader, diag, pos, "syntax error: not a valid statement".into());
            Err(())
        }
    }
}

fn directive_include(reader: &mut TokenReader, diag: &mut Diagnostics) -> Result<(), ()> {
    let token = reader.current().clone();
    if token.kind != TokenKind::StringValue {
        report_error(reader, diag, token.position, "syntax error: expected a file name string".into());
        return Err(());
    }
    let path = reader.text_of(&token).to_string();
    reader.advance();

    reader.include(&path).map_err(|e| {
        report_error(reader, diag, token.position.clone(), format!("I/O error: cannot open '{path}': {e}"));
    })
}

fn directive_public(reader: &mut TokenReader, symbols: &mut SymbolTable, diag: &mut Diagnostics) -> Result<(), ()> {
    loop {
        let token = reader.current().clone();
        if token.kind != TokenKind::Identifier {
            report_error(reader, diag, token.position, "missing identifier".into());
            return Err(());
        }
        reader.advance();
        symbols.mark_public(token.value as u32);
        if !reader.accept_char(',') {
            return Ok(());
        }
    }
}

fn directive_extrn(
    reader: &mut TokenReader,
    symbols: &mut SymbolTable,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    loop {
        let token = reader.current().clone();
        if token.kind != TokenKind::Identifier {
            report_error(reader, diag, token.position, "missing identifier".into());
            return Err(());
        }
        reader.advance();
        symbols.declare_external(token.value as u32, pass);
        if !reader.accept_char(',') {
            return Ok(());
        }
    }
}

/// `DEFB`/`DB`: comma-separated bytes, each either a string literal (emitted
/// character by character) or a byte-valued expression.
fn directive_defb(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    loop {
        if reader.current().kind == TokenKind::StringValue {
            let token = reader.current().clone();
            let text = reader.text_of(&token).to_string();
            reader.advance();
            for b in text.bytes() {
                segs.emit_byte(b);
            }
        } else {
            let addr = eval::evaluate(reader, symbols, diag, pass)?;
            segs.emit_byte((addr.value & 0xFF) as u8);
        }
        if !reader.accept_char(',') {
            return Ok(());
        }
    }
}

/// `DEFW`/`DW`: comma-separated 16-bit values, relocatable or constant.
fn directive_defw(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    loop {
        let addr = eval::evaluate(reader, symbols, diag, pass)?;
        segs.emit_address_word(addr);
        if !reader.accept_char(',') {
            return Ok(());
        }
    }
}

/// `DEFS`/`DS count[, fill]`: reserves `count` bytes, each set to `fill`
/// (defaulting to zero).
fn directive_defs(
    reader: &mut TokenReader,
    symbols: &SymbolTable,
    segs: &mut Segments,
    diag: &mut Diagnostics,
    pass: u32,
) -> Result<(), ()> {
    let pos = reader.current().position.clone();
    let count = eval::evaluate(reader, symbols, diag, pass)?;
    if !count.is_const() || count.value < 0 {
        report_error(reader, diag, pos, "address usage error: DEFS count must be a non-negative constant".into());
        return Err(());
    }

    let fill = if reader.accept_char(',') {
        let fill_addr = eval::evaluate(reader, symbols, diag, pass)?;
        (fill_addr.value & 0xFF) as u8
    } else {
        0
    };

    for _ in 0..count.value {
        segs.emit_byte(fill);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn assemble(src: &'static str) -> AssembleResult {
        let opener = MemOpener(src);
        Assembler::default().assemble(&opener, Path::new("t.asm")).unwrap()
    }

    #[test]
    fn simple_instruction_assembles() {
        let r = assemble("LD A, 5\n");
        assert!(r.succeeded());
        assert_eq!(r.object[0..2], [0x00, 0x01]); // ObjVersion
        let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
        assert_eq!(code_len, 2);
        assert_eq!(&r.object[4..6], &[0x3E, 0x05]);
    }

    #[test]
    fn forward_reference_resolves_by_pass_two() {
        let r = assemble("JP FOO\nFOO: RET\n");
        assert!(r.succeeded());
        let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
        assert_eq!(code_len, 4); // C3 nn nn, C9
        assert_eq!(r.object[4], 0xC3);
        assert_eq!(u16::from_le_bytes([r.object[5], r.object[6]]), 3);
        assert_eq!(r.object[7], 0xC9);
    }

    #[test]
    fn undefined_symbol_fails_the_run() {
        let r = assemble("JP NOWHERE\n");
        assert!(!r.succeeded());
        assert!(r.object.is_empty());
    }

    /// `LOOP: DJNZ LOOP` at address 0 -> `10 FE` (spec scenario 6).
    #[test]
    fn self_referencing_djnz_uses_short_form() {
        let r = assemble("LOOP: DJNZ LOOP\n");
        assert!(r.succeeded());
        assert_eq!(&r.object[4..6], &[0x10, 0xFE]);
    }

    #[test]
    fn if_else_endif_matches_spec_scenario() {
        let r = assemble("IF NZ\nINC A\nELSE\nDEC A\nENDIF\n");
        assert!(r.succeeded());
        let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
        assert_eq!(&r.object[4..4 + code_len], &[0x28, 0x03, 0x3C, 0x18, 0x01, 0x3D]);
    }

    #[test]
    fn public_and_extrn_round_trip_through_object_file() {
        let r = assemble("PUBLIC FOO\nFOO: RET\n");
        assert!(r.succeeded());
        let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
        let mut pos = 4 + code_len;
        let data_len = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]) as usize;
        pos += 2 + data_len;
        let id_count = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]);
        assert_eq!(id_count, 1);
    }

    #[test]
    fn defb_emits_string_bytes_and_expression_bytes() {
        let r = assemble("DEFB 'AB', 3\n");
        assert!(r.succeeded());
        assert_eq!(&r.object[4..7], b"AB\x03");
    }

    #[test]
    fn defs_reserves_zero_filled_space() {
        let r = assemble("DEFS 3\n");
        assert!(r.succeeded());
        assert_eq!(&r.object[4..7], &[0, 0, 0]);
    }

    #[test]
    fn multiple_definition_is_an_error() {
        let r = assemble("FOO: RET\nFOO: RET\n");
        assert!(!r.succeeded());
    }

    #[test]
    fn listing_contains_source_text() {
        let r = assemble("LD A, 5\n");
        assert!(r.listing.contains("LD A, 5"));
    }
}
