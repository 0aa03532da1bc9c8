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

//! [`Address`]: the central semantic value produced by the expression
//! evaluator and consumed by the instruction emitter and object writer.
//!
//! Modeled as a tagged union rather than a subclass hierarchy, per the
//! design notes: `ty` is the sole discriminator and every operation
//! (`is_const`, `low`, `high`, ...) is a total function over it.

/// Discriminates the kind of value an [`Address`] carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddressType {
    /// No value yet; can appear only during pass 1, while a forward
    /// reference has not yet been defined.
    Undefined,

    /// A plain numeric constant; never carries an `id`.
    Const,

    /// An offset into the code segment, patched by the linker.
    Code,

    /// An offset into the data segment, patched by the linker.
    Data,

    /// A reference to a symbol defined in another object file. Always
    /// carries a non-`None` `id`.
    External,
}

/// The low/high byte selector applied by the `LOW`/`HIGH` prefix operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Part {
    Low,
    High,
}

/// A Z80 address or constant value, with enough type information for the
/// relocation model described in the spec.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Address {
    pub ty: AddressType,

    /// 16-bit value (or less, for a byte-wide result); may go negative as
    /// an intermediate offset before being masked down for emission.
    pub value: i32,

    /// External symbol id; `Some` iff `ty == External`.
    pub id: Option<u32>,

    /// Present iff a `LOW`/`HIGH` prefix has selected one byte of a wider
    /// relocatable value; `None` means "both bytes" (the ordinary case).
    pub part: Option<Part>,

    /// Records whether this value's surface syntax was wrapped in `(...)`.
    /// Consumed by exactly one call site: choosing between the
    /// immediate-load and memory-load forms of `LD rp, ...`.
    pub parenthesized: bool,
}

impl Address {
    pub const fn undefined() -> Self {
        Self { ty: AddressType::Undefined, value: 0, id: None, part: None, parenthesized: false }
    }

    pub const fn constant(value: i32) -> Self {
        Self { ty: AddressType::Const, value, id: None, part: None, parenthesized: false }
    }

    pub const fn code(offset: i32) -> Self {
        Self { ty: AddressType::Code, value: offset, id: None, part: None, parenthesized: false }
    }

    pub const fn data(offset: i32) -> Self {
        Self { ty: AddressType::Data, value: offset, id: None, part: None, parenthesized: false }
    }

    pub const fn external(id: u32) -> Self {
        Self { ty: AddressType::External, value: 0, id: Some(id), part: None, parenthesized: false }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.ty == AddressType::Undefined
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.ty == AddressType::Const
    }

    /// True for any value the linker must patch: `Code`, `Data`, or
    /// `External`.
    #[inline]
    pub fn is_relocatable(&self) -> bool {
        matches!(self.ty, AddressType::Code | AddressType::Data | AddressType::External)
    }

    /// Marks this value as having appeared inside `(...)` in the source.
    #[inline]
    pub fn parenthesized(mut self) -> Self {
        self.parenthesized = true;
        self
    }

    /// The `LOW` monomial: selects the low byte. Relocatable operands keep
    /// their type and id, carrying the selector through to the fix-up;
    /// constants are masked immediately.
    pub fn low(mut self) -> Self {
        if self.is_const() {
            self.value &= 0xFF;
        } else {
            self.part = Some(Part::Low);
        }
        self.parenthesized = false;
        self
    }

    /// The `HIGH` monomial: selects the high byte.
    pub fn high(mut self) -> Self {
        if self.is_const() {
            self.value = (self.value >> 8) & 0xFF;
        } else {
            self.part = Some(Part::High);
        }
        self.parenthesized = false;
        self
    }

    /// Returns the 16-bit value truncated to `u16`, ignoring relocation.
    #[inline]
    pub fn as_u16(&self) -> u16 {
        self.value as u16
    }

    /// Returns the value truncated to a single byte, honoring a selected
    /// `part` for a constant that was never itself split by `LOW`/`HIGH`
    /// (used when an 8-bit immediate slot receives a 16-bit constant, which
    /// the emitter rejects via range-checking rather than silent masking).
    #[inline]
    pub fn as_i32(&self) -> i32 {
        self.value
    }
}
