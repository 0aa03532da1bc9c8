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

//! Relative-offset computation shared by the instruction emitter's `JR`/
//! `DJNZ` short-jump forms and the structured-flow compiler's back-edge
//! optimization (spec §4.5).

use crate::addr::{Address, AddressType};

/// Inclusive bounds on a `JR`/`DJNZ` displacement byte. The upper bound is
/// `+128`, one past the true signed-byte maximum; this is a preserved
/// quirk of the source being modeled, not a bug to fix (spec §9).
pub const REL_MIN: i32 = -128;
pub const REL_MAX: i32 = 128;

/// Computes the relative displacement from an instruction starting at
/// `start` (2 bytes long: opcode + displacement) to `target`, if the short
/// form is usable.
///
/// Returns `None` -- forcing the long `JP`/`DEC B; JP NZ` form -- when:
/// - `target` is still `Undefined` (a pass-1 forward reference; pass 1
///   always assumes the long form so segment sizes never shrink between
///   passes),
/// - `target` is `External` or lands in a different segment than `start`,
/// - the computed offset falls outside `[REL_MIN, REL_MAX]`.
pub fn short_offset(start: Address, target: Address) -> Option<i32> {
    if target.is_undefined() {
        return None;
    }
    if start.ty != target.ty || target.ty == AddressType::External {
        return None;
    }
    let offset = target.value - (start.value + 2);
    (REL_MIN..=REL_MAX).contains(&offset).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_offset_is_short() {
        let start = Address::code(0);
        let target = Address::code(0); // DJNZ LOOP at address 0, target is itself
        assert_eq!(short_offset(start, target), Some(-2));
    }

    #[test]
    fn boundary_plus_128_is_accepted() {
        let start = Address::code(0);
        let target = Address::code(130); // offset = 130 - 2 = 128
        assert_eq!(short_offset(start, target), Some(128));
    }

    #[test]
    fn boundary_plus_129_forces_long_form() {
        let start = Address::code(0);
        let target = Address::code(131); // offset = 129
        assert_eq!(short_offset(start, target), None);
    }

    #[test]
    fn boundary_minus_128_is_accepted() {
        let start = Address::code(100);
        let target = Address::code(100 - 126); // offset = -128
        assert_eq!(short_offset(start, target), Some(-128));
    }

    #[test]
    fn undefined_target_forces_long_form() {
        let start = Address::code(0);
        assert_eq!(short_offset(start, Address::undefined()), None);
    }

    #[test]
    fn external_target_forces_long_form() {
        let start = Address::code(0);
        assert_eq!(short_offset(start, Address::external(1)), None);
    }

    #[test]
    fn cross_segment_target_forces_long_form() {
        let start = Address::code(0);
        assert_eq!(short_offset(start, Address::data(2)), None);
    }
}
