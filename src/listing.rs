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

//! Human-readable listing writer (spec §4.11/§6): interleaves each source
//! line with a hex dump of the bytes it generated, prefixed by the emission
//! address and indented to the open structured-flow block depth. A UX
//! contract only -- no tool parses this output.

use crate::addr::Address;
use crate::source::SourceLine;

struct ListingLine {
    addr: Option<Address>,
    bytes: Vec<u8>,
    text: String,
    depth: usize,
}

#[derive(Default)]
pub struct Listing {
    lines: Vec<ListingLine>,
}

impl Listing {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Records one completed source line together with the bytes it emitted
    /// and the block-nesting depth at the time it was read. `source` holds
    /// every [`SourceLine`] that crossed a line boundary since the last
    /// flush -- ordinarily one, but `INCLUDE` or blank-line lookahead can
    /// hand back more than one at once; only the last gets the byte dump,
    /// since the bytes belong to whichever statement just finished.
    pub fn push(&mut self, addr: Option<Address>, bytes: Vec<u8>, source: Vec<SourceLine>, depth: usize) {
        let last = source.len().saturating_sub(1);
        for (i, line) in source.into_iter().enumerate() {
            self.lines.push(ListingLine {
                addr: if i == last { addr } else { None },
                bytes: if i == last { bytes.clone() } else { Vec::new() },
                text: line.text,
                depth,
            });
        }
    }

    /// Renders the listing as a single string, one source line per output
    /// line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let addr = match line.addr {
                Some(a) => format!("{:04X}", a.as_u16()),
                None => "    ".to_string(),
            };
            let mut hex = String::new();
            for b in &line.bytes {
                hex.push_str(&format!("{b:02X} "));
            }
            let indent = "  ".repeat(line.depth);
            out.push_str(&format!("{addr}  {hex:<12}{indent}{}\n", line.text));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn line(text: &str) -> SourceLine {
        SourceLine { file: Rc::from("t.asm"), line: 1, text: text.into() }
    }

    #[test]
    fn renders_address_and_bytes_before_text() {
        let mut listing = Listing::new();
        listing.push(Some(Address::code(0)), vec![0x3E, 0x05], vec![line("LD A, 5")], 0);
        let out = listing.render();
        assert!(out.starts_with("0000"));
        assert!(out.contains("3E 05"));
        assert!(out.contains("LD A, 5"));
    }

    #[test]
    fn indents_by_block_depth() {
        let mut listing = Listing::new();
        listing.push(Some(Address::code(0)), vec![], vec![line("INC A")], 1);
        let out = listing.render();
        assert!(out.contains("  INC A"));
    }

    #[test]
    fn multiple_pending_lines_attach_bytes_only_to_the_last() {
        let mut listing = Listing::new();
        listing.push(Some(Address::code(2)), vec![0x00], vec![line(""), line("NOP")], 0);
        assert_eq!(listing.lines.len(), 2);
        assert!(listing.lines[0].bytes.is_empty());
        assert_eq!(listing.lines[1].bytes, vec![0x00]);
    }
}
