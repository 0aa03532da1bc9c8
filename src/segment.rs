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

//! Segments and the address-usage (fix-up) table.

use crate::addr::{Address, AddressType};

/// Which of the two relocatable segments a byte belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SegmentKind {
    Code,
    Data,
}

impl SegmentKind {
    fn address_of(self, offset: i32) -> Address {
        match self {
            SegmentKind::Code => Address::code(offset),
            SegmentKind::Data => Address::data(offset),
        }
    }
}

/// An ordered byte buffer with a monotonically growing tail offset, which
/// is also the current emission address.
#[derive(Default, Debug)]
pub struct Segment {
    pub bytes: Vec<u8>,
}

impl Segment {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    #[inline]
    pub fn tail(&self) -> i32 {
        self.bytes.len() as i32
    }

    #[inline]
    pub fn emit_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    #[inline]
    pub fn emit_word_le(&mut self, w: u16) {
        self.bytes.push((w & 0xFF) as u8);
        self.bytes.push((w >> 8) as u8);
    }
}

/// A fix-up: a byte range in a segment that holds the not-yet-resolved
/// value of `target`, to be patched by the linker.
#[derive(Clone, Debug)]
pub struct Fixup {
    pub segment: SegmentKind,
    pub offset:  i32,
    pub target:  Address,
}

/// Holds the two relocatable segments, the segment currently selected for
/// emission, and the per-pass address-usage (fix-up) table.
pub struct Segments {
    pub code: Segment,
    pub data: Segment,
    current: SegmentKind,
    fixups:  Vec<Fixup>,
}

impl Segments {
    pub fn new() -> Self {
        Self {
            code:    Segment::new(),
            data:    Segment::new(),
            current: SegmentKind::Code,
            fixups:  Vec::new(),
        }
    }

    #[inline]
    pub fn current_kind(&self) -> SegmentKind {
        self.current
    }

    pub fn select(&mut self, kind: SegmentKind) {
        self.current = kind;
    }

    fn current_mut(&mut self) -> &mut Segment {
        match self.current {
            SegmentKind::Code => &mut self.code,
            SegmentKind::Data => &mut self.data,
        }
    }

    pub fn current(&self) -> &Segment {
        match self.current {
            SegmentKind::Code => &self.code,
            SegmentKind::Data => &self.data,
        }
    }

    /// The address at which the next emitted byte will land.
    pub fn here(&self) -> Address {
        self.current.address_of(self.current().tail())
    }

    pub fn emit_byte(&mut self, b: u8) {
        self.current_mut().emit_byte(b);
    }

    pub fn emit_word_le(&mut self, w: u16) {
        self.current_mut().emit_word_le(w);
    }

    /// Emits a placeholder word for a relocatable or external `target` and
    /// records a fix-up at the offset it occupies.
    pub fn emit_fixup_word(&mut self, target: Address) {
        let kind   = self.current;
        let offset = self.current().tail();
        self.emit_word_le(target.as_u16());
        debug_assert!(matches!(target.ty, AddressType::Code | AddressType::Data | AddressType::External));
        self.fixups.push(Fixup { segment: kind, offset, target });
    }

    /// Emits a 16-bit address: a plain word for a `Const` value, a
    /// zero placeholder (no fix-up recorded) for a pass-1 forward reference
    /// that hasn't resolved yet, or a fix-up-tracked placeholder for
    /// anything relocatable/external.
    pub fn emit_address_word(&mut self, addr: Address) {
        if addr.is_const() {
            self.emit_word_le(addr.as_u16());
        } else if addr.is_undefined() {
            self.emit_word_le(0);
        } else {
            self.emit_fixup_word(addr);
        }
    }

    /// Clears the per-pass fix-up table. Segment contents themselves are
    /// reset by re-emitting a fresh pass's bytes into fresh segments; see
    /// the driver.
    pub fn take_fixups(&mut self) -> Vec<Fixup> {
        std::mem::take(&mut self.fixups)
    }

    pub fn fixups(&self) -> &[Fixup] {
        &self.fixups
    }
}

impl Default for Segments {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_grows_monotonically() {
        let mut s = Segment::new();
        assert_eq!(s.tail(), 0);
        s.emit_byte(1);
        assert_eq!(s.tail(), 1);
        s.emit_word_le(0x1234);
        assert_eq!(s.tail(), 3);
        assert_eq!(s.bytes, vec![1, 0x34, 0x12]);
    }

    #[test]
    fn fixup_records_offset_and_target() {
        let mut segs = Segments::new();
        segs.emit_byte(0xCD);
        let target = Address::external(7);
        segs.emit_fixup_word(target);
        let fixups = segs.fixups();
        assert_eq!(fixups.len(), 1);
        assert_eq!(fixups[0].offset, 1);
        assert_eq!(fixups[0].target, target);
    }

    #[test]
    fn address_word_for_undefined_target_is_a_placeholder_not_a_fixup() {
        // Pass 1's estimate of a forward reference that has not yet been
        // defined: must not panic and must not record a fix-up, since the
        // value is meaningless until a later pass resolves it.
        let mut segs = Segments::new();
        segs.emit_address_word(Address::undefined());
        assert_eq!(segs.code.bytes, vec![0, 0]);
        assert!(segs.fixups().is_empty());
    }

    #[test]
    fn switching_segment_keeps_independent_tails() {
        let mut segs = Segments::new();
        segs.emit_byte(1);
        segs.select(SegmentKind::Data);
        segs.emit_byte(2);
        segs.emit_byte(3);
        assert_eq!(segs.code.tail(), 1);
        assert_eq!(segs.data.tail(), 2);
    }
}
