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

//! Character stream over one or more nested source files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// End-of-innermost-file sentinel returned by [`SourceReader::get_char`].
pub const EOF: char = '\0';

/// A source-file opener, abstracted so tests can supply in-memory sources
/// instead of touching the filesystem. The top-level entry point and every
/// `INCLUDE` go through this trait.
pub trait SourceOpener {
    /// Reads the complete contents of `path`, returning an I/O error that
    /// the caller renders as a fatal `file not found`/`unreadable` diagnostic.
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Opens files from the real filesystem.
#[derive(Default)]
pub struct FsOpener;

impl SourceOpener for FsOpener {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// One open file on the [`SourceReader`]'s include stack.
struct OpenFile {
    /// Display name used in diagnostics and in the object/listing output;
    /// this is the path as written at the top level or on `INCLUDE`, not
    /// necessarily resolved to an absolute path.
    name: Rc<str>,

    /// Directory `INCLUDE` paths within this file resolve against.
    dir: PathBuf,

    /// Full source text of the file.
    content: Vec<char>,

    /// Cursor into `content`.
    pos: usize,

    /// 1-based current line number.
    line: u32,

    /// Offset in `content` where the current line began.
    line_start: usize,
}

impl OpenFile {
    fn new(name: Rc<str>, dir: PathBuf, text: String) -> Self {
        Self {
            name,
            dir,
            content: text.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.content.len()
    }
}

/// A line of source text together with the file and line number it came
/// from, as broadcast to a listing sink right before the reader crosses the
/// line boundary.
#[derive(Clone, Debug)]
pub struct SourceLine {
    pub file: Rc<str>,
    pub line: u32,
    pub text: String,
}

/// Character stream with `INCLUDE` nesting and `(file, line)` tracking.
///
/// `get_char` yields the next logical character: an ordinary source
/// character, the sentinel `'\n'` at a line boundary, or [`EOF`] once the
/// innermost file is exhausted and the include stack is empty.
pub struct SourceReader<'o> {
    opener: &'o dyn SourceOpener,
    stack:  Vec<OpenFile>,

    /// Completed lines, in the order they crossed a `'\n'` boundary, ready
    /// for the listing writer to drain.
    pending_lines: Vec<SourceLine>,
}

impl<'o> SourceReader<'o> {
    /// Opens `path` as the top-level source file.
    pub fn open(opener: &'o dyn SourceOpener, path: &Path) -> io::Result<Self> {
        let text = opener.read(path)?;
        let dir  = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name: Rc<str> = Rc::from(path.to_string_lossy().as_ref());

        Ok(Self {
            opener,
            stack: vec![OpenFile::new(name, dir, text)],
            pending_lines: Vec::new(),
        })
    }

    /// Opens `path` as a nested `INCLUDE`d file, resolved relative to the
    /// directory of the file currently being read.
    pub fn include(&mut self, path: &str) -> io::Result<()> {
        let current_dir = self.stack.last().map(|f| f.dir.clone()).unwrap_or_default();
        let resolved = current_dir.join(path);
        let text = self.opener.read(&resolved)?;
        let dir  = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        let name: Rc<str> = Rc::from(path);

        self.stack.push(OpenFile::new(name, dir, text));
        Ok(())
    }

    /// Returns the `(file, line)` of the character that the next
    /// [`get_char`](Self::get_char) call will return.
    pub fn position(&self) -> (Rc<str>, u32) {
        match self.stack.last() {
            Some(f) => (Rc::clone(&f.name), f.line),
            None    => (Rc::from(""), 0),
        }
    }

    /// Drains the lines that have completed since the last call.
    pub fn take_pending_lines(&mut self) -> Vec<SourceLine> {
        std::mem::take(&mut self.pending_lines)
    }

    /// Returns the next logical character. See the type-level docs.
    pub fn get_char(&mut self) -> char {
        loop {
            let file = match self.stack.last_mut() {
                Some(f) => f,
                None    => return EOF,
            };

            if file.at_eof() {
                self.finish_line_if_any();
                self.stack.pop();
                continue;
            }

            let c = file.content[file.pos];
            file.pos += 1;

            if c == '\n' {
                self.finish_line_if_any();
                if let Some(f) = self.stack.last_mut() {
                    f.line += 1;
                }
            }

            return c;
        }
    }

    /// Hands the text since the last line boundary to the listing sink and
    /// advances `line_start` past it. Called both on an ordinary `'\n'` and
    /// on EOF-without-a-trailing-newline, so every byte of source ends up
    /// in exactly one reported line.
    fn finish_line_if_any(&mut self) {
        let Some(file) = self.stack.last_mut() else { return };

        let end = file.pos.min(file.content.len());
        if file.line_start >= end && file.line_start != 0 {
            return;
        }

        let mut text: String = file.content[file.line_start..end].iter().collect();
        if text.ends_with('\n') {
            text.pop();
        }
        if text.is_empty() && file.line_start == end && end == file.content.len() && file.line_start > 0 {
            // Nothing left after the final newline; no phantom empty line.
            return;
        }

        self.pending_lines.push(SourceLine {
            file: Rc::clone(&file.name),
            line: file.line,
            text,
        });
        file.line_start = file.pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemOpener(Vec<(&'static str, &'static str)>);

    impl SourceOpener for MemOpener {
        fn read(&self, path: &Path) -> io::Result<String> {
            let name = path.to_string_lossy();
            self.0.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, s)| s.to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
        }
    }

    #[test]
    fn reads_chars_and_newline_sentinel() {
        let opener = MemOpener(vec![("a.asm", "AB\nC")]);
        let mut r = SourceReader::open(&opener, Path::new("a.asm")).unwrap();
        let mut out = String::new();
        loop {
            let c = r.get_char();
            if c == EOF { break; }
            out.push(c);
        }
        assert_eq!(out, "AB\nC");
    }

    #[test]
    fn tracks_line_number() {
        let opener = MemOpener(vec![("a.asm", "X\nY\nZ")]);
        let mut r = SourceReader::open(&opener, Path::new("a.asm")).unwrap();
        assert_eq!(r.position().1, 1);
        r.get_char(); // X
        r.get_char(); // \n
        assert_eq!(r.position().1, 2);
        r.get_char(); // Y
        r.get_char(); // \n
        assert_eq!(r.position().1, 3);
    }

    #[test]
    fn broadcasts_completed_lines_in_order() {
        let opener = MemOpener(vec![("a.asm", "one\ntwo\nthree")]);
        let mut r = SourceReader::open(&opener, Path::new("a.asm")).unwrap();
        while r.get_char() != EOF {}
        let lines = r.take_pending_lines();
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn include_resolves_relative_to_current_dir() {
        let opener = MemOpener(vec![
            ("dir/main.asm", "INCLUDE \"sub.asm\"\n"),
            ("dir/sub.asm",  "X"),
        ]);
        let mut r = SourceReader::open(&opener, Path::new("dir/main.asm")).unwrap();
        // Simulate the driver recognizing INCLUDE and calling include().
        r.include("sub.asm").unwrap();
        let mut out = String::new();
        loop {
            let c = r.get_char();
            if c == EOF { break; }
            out.push(c);
        }
        assert!(out.contains('X'));
    }
}
