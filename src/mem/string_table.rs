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

//! Interned strings, with ids drawn from disjoint numeric ranges so that a
//! keyword id, an identifier id, and a string-literal id are never confused
//! with one another even though all three ride in the same [`Token`] value
//! field.

use std::collections::HashMap;
use std::mem::transmute;

/// First id assigned to a reserved word. Ids below this value are raw ASCII
/// codes of single-character operators, per the tokenizer's token encoding.
pub const KEYWORD_BASE: u32 = 0x80;

/// First id assigned to a user identifier. Chosen so that the whole
/// identifier range sits below the auto-label range, which begins at
/// `0x8000`.
pub const IDENT_BASE: u32 = 0x100;

/// First id assigned to a string or character literal.
pub const STRING_BASE: u32 = 0x4000;

/// Ceiling of the identifier range; kept separate from [`STRING_BASE`] so
/// that a mistaken identifier/string mixup is structurally impossible.
const IDENT_LIMIT: u32 = STRING_BASE;

/// An id into a [`StringTable`]. Which sub-range the id falls in determines
/// whether it names a keyword, an identifier, or a string/char literal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StringId(pub u32);

impl StringId {
    #[inline]
    pub fn is_keyword(self) -> bool {
        (KEYWORD_BASE..IDENT_BASE).contains(&self.0)
    }

    #[inline]
    pub fn is_ident(self) -> bool {
        (IDENT_BASE..IDENT_LIMIT).contains(&self.0)
    }

    #[inline]
    pub fn is_string(self) -> bool {
        self.0 >= STRING_BASE
    }
}

/// An arena that interns strings and hands out ids starting at a fixed base.
/// Strings are copied into a growable buffer; once stored, a string's bytes
/// never move, so references into the arena are stable for its lifetime.
struct Arena {
    base:  u32,
    map:   HashMap<&'static str, u32>,
    table: Vec<(usize, usize)>,
    chars: String,
}

impl Arena {
    const INITIAL_CAPACITY: usize = 256;
    const INITIAL_CHAR_CAPACITY: usize = 4096;

    fn new(base: u32) -> Self {
        Self {
            base,
            map:   HashMap::with_capacity(Self::INITIAL_CAPACITY),
            table: Vec::with_capacity(Self::INITIAL_CAPACITY),
            chars: String::with_capacity(Self::INITIAL_CHAR_CAPACITY),
        }
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.map.get(s) {
            return StringId(id);
        }

        let start = self.chars.len();
        self.chars.push_str(s);
        let end = self.chars.len();

        // SAFETY: `chars` only grows and its previously-written bytes are
        // never moved or mutated, so a reference into it remains valid for
        // as long as the arena itself. This 'static reference never escapes
        // the module; `get` re-derives a reference with a lifetime tied to
        // `&self`.
        let stored: &'static str = unsafe { transmute(&self.chars[start..end]) };

        let id = self.base + self.table.len() as u32;
        self.table.push((start, end));
        self.map.insert(stored, id);
        StringId(id)
    }

    fn get(&self, id: StringId) -> Option<&str> {
        let index = id.0.checked_sub(self.base)? as usize;
        let (start, end) = *self.table.get(index)?;
        Some(&self.chars[start..end])
    }
}

/// Table of interned keywords, identifiers, and string/char literals.
///
/// Keywords are registered once at startup by the instruction-set front end
/// (e.g. the Z80 emitter's reserved-word table); identifiers and string
/// literals are interned lazily as the tokenizer encounters them.
pub struct StringTable {
    keywords: Arena,
    idents:   Arena,
    strings:  Arena,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            keywords: Arena::new(KEYWORD_BASE),
            idents:   Arena::new(IDENT_BASE),
            strings:  Arena::new(STRING_BASE),
        }
    }

    /// Registers a reserved word, assigning it the next keyword id. Callers
    /// must register the full keyword set before tokenizing, in a stable
    /// order, so that ids are reproducible across runs.
    pub fn register_keyword(&mut self, text: &str) -> StringId {
        let id = self.keywords.intern(text);
        assert!(
            id.0 < IDENT_BASE,
            "too many keywords registered (exceeded reserved id range)"
        );
        id
    }

    /// Looks up a keyword by its (already upper-cased) text.
    pub fn keyword_id(&self, text: &str) -> Option<StringId> {
        self.keywords.map.get(text).copied().map(StringId)
    }

    /// Interns an identifier, returning a stable id for it.
    pub fn intern_ident(&mut self, text: &str) -> StringId {
        let id = self.idents.intern(text);
        assert!(id.0 < IDENT_LIMIT, "identifier table overflowed into string range");
        id
    }

    /// Interns a string or character literal, returning a stable id for it.
    pub fn intern_string(&mut self, text: &str) -> StringId {
        self.strings.intern(text)
    }

    /// Resolves any id produced by this table back to its text.
    pub fn get(&self, id: StringId) -> &str {
        if id.is_string() {
            self.strings.get(id)
        } else if id.is_ident() {
            self.idents.get(id)
        } else {
            self.keywords.get(id)
        }
        .unwrap_or_default()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_ids_are_disjoint_from_idents() {
        let mut t = StringTable::new();
        let kw = t.register_keyword("LD");
        let id = t.intern_ident("LD"); // same text, different namespace
        assert!(kw.is_keyword());
        assert!(id.is_ident());
        assert_ne!(kw.0, id.0);
    }

    #[test]
    fn intern_is_idempotent() {
        let mut t = StringTable::new();
        let a = t.intern_ident("foo");
        let b = t.intern_ident("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn reverse_lookup_roundtrips() {
        let mut t = StringTable::new();
        let id = t.intern_ident("counter");
        assert_eq!(t.get(id), "counter");

        let sid = t.intern_string("hello");
        assert_eq!(t.get(sid), "hello");
    }

    #[test]
    fn keyword_lookup_by_text() {
        let mut t = StringTable::new();
        let id = t.register_keyword("IF");
        assert_eq!(t.keyword_id("IF"), Some(id));
        assert_eq!(t.keyword_id("NOPE"), None);
    }
}
