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

//! The symbol table and the two-pass fixpoint bookkeeping it carries.
//!
//! Persists across passes (unlike the listing buffer, auto-label counter,
//! and fix-up table, which the driver clears at the start of each pass).

use std::collections::HashMap;

use crate::addr::Address;

/// First id handed out to an auto-generated structured-flow label, reset at
/// the start of every pass. Chosen so that it never collides with a user
/// identifier id, which the string table keeps below `0x4000`.
pub const AUTO_LABEL_BASE: u32 = 0x8000;

/// A named location: either a user `EQU`/label definition or an
/// auto-generated structured-flow label.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub pass:    u32,
    pub id:      u32,
    pub address: Address,
    pub public:  bool,
}

/// Outcome of [`SymbolTable::define`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Define {
    /// First definition, or a later-pass redefinition at the same address.
    Unchanged,

    /// A later-pass redefinition at a different address; forces another
    /// pass (see the fixpoint loop in the driver).
    AddressChanged,

    /// Same-pass redefinition: a "multiple definition" error.
    MultipleDefinition,
}

/// Maps identifier (or auto-label) ids to their [`Symbol`].
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<u32, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { symbols: HashMap::new() }
    }

    /// Defines `id` at `address` during `pass`. See [`Define`] for the
    /// three possible outcomes; a same-pass redefinition never overwrites
    /// the stored symbol.
    pub fn define(&mut self, id: u32, address: Address, pass: u32) -> Define {
        match self.symbols.get_mut(&id) {
            None => {
                self.symbols.insert(id, Symbol { pass, id, address, public: false });
                Define::Unchanged
            }
            Some(sym) if sym.pass == pass => Define::MultipleDefinition,
            Some(sym) => {
                let changed = sym.address != address;
                sym.pass = pass;
                sym.address = address;
                if changed { Define::AddressChanged } else { Define::Unchanged }
            }
        }
    }

    /// Declares `id` as an external reference (an `EXTRN`/`EXT` directive),
    /// without going through the redefinition-tracking of `define`: an
    /// external's "address" is simply its own id and never changes.
    pub fn declare_external(&mut self, id: u32, pass: u32) {
        self.symbols.entry(id).or_insert_with(|| Symbol {
            pass, id, address: Address::external(id), public: false,
        });
    }

    pub fn mark_public(&mut self, id: u32) {
        self.symbols.entry(id).or_insert_with(|| Symbol {
            pass: 0, id, address: Address::undefined(), public: true,
        }).public = true;
    }

    pub fn get(&self, id: u32) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// Returns the symbol's address, or `Address::undefined()` if `id` has
    /// not yet been defined (a forward reference still pending in pass 1).
    pub fn address_of(&self, id: u32) -> Address {
        self.symbols.get(&id).map(|s| s.address).unwrap_or_else(Address::undefined)
    }

    pub fn is_public(&self, id: u32) -> bool {
        self.symbols.get(&id).map(|s| s.public).unwrap_or(false)
    }

    pub fn publics(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values().filter(|s| s.public)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_definition_is_unchanged() {
        let mut t = SymbolTable::new();
        assert_eq!(t.define(1, Address::constant(5), 1), Define::Unchanged);
        assert_eq!(t.address_of(1), Address::constant(5));
    }

    #[test]
    fn same_pass_redefinition_is_multiple_definition() {
        let mut t = SymbolTable::new();
        t.define(1, Address::constant(5), 1);
        assert_eq!(t.define(1, Address::constant(6), 1), Define::MultipleDefinition);
        // Original value is retained.
        assert_eq!(t.address_of(1), Address::constant(5));
    }

    #[test]
    fn later_pass_same_address_is_unchanged() {
        let mut t = SymbolTable::new();
        t.define(1, Address::constant(5), 1);
        assert_eq!(t.define(1, Address::constant(5), 2), Define::Unchanged);
    }

    #[test]
    fn later_pass_different_address_changed() {
        let mut t = SymbolTable::new();
        t.define(1, Address::code(5), 1);
        assert_eq!(t.define(1, Address::code(7), 2), Define::AddressChanged);
        assert_eq!(t.address_of(1), Address::code(7));
    }

    #[test]
    fn undefined_symbol_reports_undefined_address() {
        let t = SymbolTable::new();
        assert!(t.address_of(99).is_undefined());
    }
}
