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

//! The driver's diagnostic sink: tallies warnings/errors and enforces the
//! `MaxErrorCount` pass-abort rule, layered on top of [`crate::message`]'s
//! `Log`/`Severity` scaffolding.

use crate::message::{render, AtPosition, Log, Message, Severity};
use crate::pos::SourcePosition;
use crate::token_reader::TokenReader;

/// Default `MaxErrorCount` from spec §5: the current pass aborts once this
/// many errors have accumulated.
pub const DEFAULT_MAX_ERRORS: u32 = 100;

/// Options that tests can use to shrink `MaxErrorCount` instead of hard
/// depending on the spec's constant.
#[derive(Clone, Copy, Debug)]
pub struct AssembleOptions {
    pub max_errors: u32,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { max_errors: DEFAULT_MAX_ERRORS }
    }
}

/// Tallies warnings and errors for the run and writes rendered diagnostics
/// to stderr.
#[derive(Default)]
pub struct Diagnostics {
    pub warning_count: u32,
    pub error_count:   u32,
    max_errors:         u32,
}

impl Diagnostics {
    pub fn new(options: AssembleOptions) -> Self {
        Self { warning_count: 0, error_count: 0, max_errors: options.max_errors }
    }

    /// True once the current pass has logged `max_errors` errors and must
    /// stop statement processing.
    pub fn error_cap_reached(&self) -> bool {
        self.error_count >= self.max_errors
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

impl Log for Diagnostics {
    fn log<M: Message>(&mut self, msg: M) {
        match msg.severity() {
            Severity::Warning => self.warning_count += 1,
            Severity::Error | Severity::Fatal => self.error_count += 1,
            Severity::Normal => {}
        }
        eprintln!("{}", render(&msg));
    }
}

/// Reports an error at `pos`, deduplicated against every other error
/// already reported at that exact position (spec §7: "the TokenReader maps
/// each source position to its first error message for that position").
pub fn report_error(reader: &mut TokenReader, diag: &mut Diagnostics, pos: SourcePosition, text: String) {
    if reader.report_once(pos.clone()) {
        diag.log_error(AtPosition::new(text, pos));
    }
}

/// Reports a warning at `pos`, subject to the same deduplication as
/// [`report_error`].
pub fn report_warning(reader: &mut TokenReader, diag: &mut Diagnostics, pos: SourcePosition, text: String) {
    if reader.report_once(pos.clone()) {
        diag.log_warning(AtPosition::new(text, pos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::source::SourceOpener;

    struct MemOpener(&'static str);
    impl SourceOpener for MemOpener {
        fn read(&self, _path: &Path) -> std::io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn error_cap_reached_after_max() {
        let mut diag = Diagnostics::new(AssembleOptions { max_errors: 2 });
        assert!(!diag.error_cap_reached());
        diag.log_error("a");
        diag.log_error("b");
        assert!(diag.error_cap_reached());
    }

    #[test]
    fn report_error_dedupes_by_position() {
        let opener = MemOpener("X\n");
        let mut reader = TokenReader::open(&opener, Path::new("t.asm")).unwrap();
        let mut diag = Diagnostics::new(AssembleOptions::default());
        let pos = reader.current().position.clone();

        report_error(&mut reader, &mut diag, pos.clone(), "first".into());
        report_error(&mut reader, &mut diag, pos, "second".into());

        assert_eq!(diag.error_count, 1);
    }
}
