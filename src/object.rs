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

//! Relocatable object file writer (spec §4.8): little-endian words,
//! length-prefixed strings, segments, an id table, public symbols, and a
//! fix-up table, in that fixed order.

use crate::addr::{Address, AddressType, Part};
use crate::segment::{SegmentKind, Segments};
use crate::symbol::SymbolTable;
use crate::token_reader::TokenReader;

const OBJ_VERSION: u16 = 0x0100;

/// Serializes the final pass's segments and symbol table into the on-disk
/// object format. `reader` supplies the last pass's string table, so that
/// the id table can carry each symbol's name.
pub fn write(segs: &Segments, symbols: &SymbolTable, reader: &TokenReader) -> Vec<u8> {
    let mut buf = Vec::new();

    write_u16(&mut buf, OBJ_VERSION);

    write_u16(&mut buf, segs.code.bytes.len() as u16);
    buf.extend_from_slice(&segs.code.bytes);
    write_u16(&mut buf, segs.data.bytes.len() as u16);
    buf.extend_from_slice(&segs.data.bytes);

    let publics: Vec<_> = symbols.publics().collect();

    let mut ids: Vec<u32> = publics.iter().map(|s| s.id).collect();
    for fixup in segs.fixups() {
        if fixup.target.ty == AddressType::External {
            if let Some(id) = fixup.target.id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    write_u16(&mut buf, ids.len() as u16);
    for id in &ids {
        write_u16(&mut buf, *id as u16);
        write_string(&mut buf, reader.text_of_id(*id));
    }

    write_u16(&mut buf, publics.len() as u16);
    for sym in &publics {
        write_u16(&mut buf, sym.id as u16);
        write_address(&mut buf, &sym.address);
    }

    write_u16(&mut buf, segs.fixups().len() as u16);
    for fixup in segs.fixups() {
        let location = match fixup.segment {
            SegmentKind::Code => Address::code(fixup.offset),
            SegmentKind::Data => Address::data(fixup.offset),
        };
        write_address(&mut buf, &location);
        write_address(&mut buf, &fixup.target);
    }

    buf
}

fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.push((v & 0xFF) as u8);
    buf.push((v >> 8) as u8);
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_u16(buf, s.len() as u16);
    buf.extend_from_slice(s.as_bytes());
}

/// `type byte; part byte; id word (0 when absent); value word`, per spec
/// §4.8. Field order is a linker-compatibility contract, not a style choice.
fn write_address(buf: &mut Vec<u8>, addr: &Address) {
    buf.push(type_byte(addr.ty));
    buf.push(part_byte(addr.part));
    write_u16(buf, addr.id.unwrap_or(0) as u16);
    write_u16(buf, addr.as_u16());
}

fn type_byte(ty: AddressType) -> u8 {
    match ty {
        AddressType::Undefined => 0,
        AddressType::Const => 1,
        AddressType::Code => 2,
        AddressType::Data => 3,
        AddressType::External => 4,
    }
}

fn part_byte(part: Option<Part>) -> u8 {
    match part {
        None => 0,
        Some(Part::Low) => 1,
        Some(Part::High) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceOpener;
    use std::path::Path;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> std::io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn reader_with_ident(name: &'static str) -> TokenReader<'static> {
        // Leaks the opener so the returned reader's lifetime is 'static,
        // which is fine for a short-lived test helper.
        let opener: &'static MemOpener = Box::leak(Box::new(MemOpener(name)));
        TokenReader::open(opener, Path::new("t.asm")).unwrap()
    }

    /// `PUBLIC FOO | FOO: RET` -> one public symbol, one id-table entry
    /// named `FOO`, no fix-ups (spec scenario 9).
    #[test]
    fn public_symbol_has_id_table_entry_and_no_fixups() {
        let mut reader = reader_with_ident("FOO\n");
        let id = reader.current().value as u32; // "FOO" is the first identifier interned
        reader.advance();

        let mut symbols = SymbolTable::new();
        symbols.mark_public(id);
        symbols.define(id, Address::code(0), 1);

        let mut segs = Segments::new();
        segs.emit_byte(0xC9); // RET

        let bytes = write(&segs, &symbols, &reader);

        // ObjVersion, code size, code byte, data size(=0), idCount=1
        assert_eq!(&bytes[0..2], &[0x00, 0x01]);
        assert_eq!(&bytes[2..4], &[0x01, 0x00]); // code size = 1
        assert_eq!(bytes[4], 0xC9);
        assert_eq!(&bytes[5..7], &[0x00, 0x00]); // data size = 0
        let id_count_offset = 7;
        assert_eq!(&bytes[id_count_offset..id_count_offset + 2], &[0x01, 0x00]);
        let name_len_offset = id_count_offset + 2 + 2; // past id word
        assert_eq!(&bytes[name_len_offset..name_len_offset + 2], &[0x03, 0x00]);
        assert_eq!(&bytes[name_len_offset + 2..name_len_offset + 5], b"FOO");
    }

    /// `EXTRN BAR | CALL BAR` -> one external id, no publics, one fix-up
    /// (spec scenario 10).
    #[test]
    fn external_reference_has_id_table_entry_and_one_fixup() {
        let mut reader = reader_with_ident("BAR\n");
        let id = reader.current().value as u32;
        reader.advance();

        let mut symbols = SymbolTable::new();
        symbols.declare_external(id, 1);

        let mut segs = Segments::new();
        segs.emit_byte(0xCD); // CALL
        segs.emit_fixup_word(Address::external(id));

        let bytes = write(&segs, &symbols, &reader);
        assert_eq!(segs.fixups().len(), 1);
        assert_eq!(symbols.publics().count(), 0);

        // Walk the structure to find idCount without hardcoding every offset.
        let code_len = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        let mut pos = 4 + code_len;
        let data_len = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        pos += 2 + data_len;
        let id_count = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        assert_eq!(id_count, 1);
    }
}
