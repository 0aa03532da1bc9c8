// This file is part of z80as, a Z80 assembler.
// Copyright (C) 2020 Jeffrey Sharp
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

//! Assembler messages.

use std::fmt::{self, Arguments, Display, Formatter};
use colored::Colorize;

use crate::pos::SourcePosition;

// -----------------------------------------------------------------------------

/// Trait for assembler message types.
pub trait Message: Display {
    /// Returns the origin (e.g. file and line) of the message.
    #[inline]
    fn origin(&self) -> Origin { Origin::General }

    /// Returns the severity level of the message.
    #[inline]
    fn severity(&self) -> Severity { Severity::Normal }
}

impl Message for str           {}
impl Message for String        {}
impl Message for Arguments<'_> {}

impl<T> Message for &T where T: Message + ?Sized {
    #[inline]
    fn origin(&self) -> Origin { (*self).origin() }

    #[inline]
    fn severity(&self) -> Severity { (*self).severity() }
}

// -----------------------------------------------------------------------------

/// Assembler message origins.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Origin {
    /// The message originates from the assembler itself.
    General,

    /// The message originates from a source code position.
    At(SourcePosition),
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Origin::General => write!(f, "{}", crate::PROGRAM_NAME),
            Origin::At(pos) => write!(f, "{}", pos),
        }
    }
}

// -----------------------------------------------------------------------------

/// Wrapper type that adds a source position to an assembler message.
#[derive(Clone, Debug)]
pub struct AtPosition<M: Message> {
    msg: M,
    pos: SourcePosition,
}

impl<M: Message> AtPosition<M> {
    pub fn new(msg: M, pos: SourcePosition) -> Self {
        Self { msg, pos }
    }
}

impl<M: Message> Message for AtPosition<M> {
    #[inline]
    fn origin(&self) -> Origin {
        Origin::At(self.pos.clone())
    }

    #[inline]
    fn severity(&self) -> Severity {
        self.msg.severity()
    }
}

impl<M: Message> Display for AtPosition<M> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.msg.fmt(f)
    }
}

// -----------------------------------------------------------------------------

/// Message severity levels.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    /// For informational messages.
    Normal,

    /// For potential problems that do not prevent complete assembly.
    /// Assembly continues, and the assembler will produce output.
    Warning,

    /// For problems that prevent object output.
    /// Assembly continues (to find further problems), but the run fails.
    Error,

    /// For severe, unrecoverable problems.
    /// The assembler stops immediately and produces no output.
    Fatal,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Normal  => "",
            Severity::Warning => "warning: ",
            Severity::Error   => "error: ",
            Severity::Fatal   => "fatal: ",
        }
    }

    fn colorize(self, text: &str) -> String {
        match self {
            Severity::Normal  => text.normal().to_string(),
            Severity::Warning => text.yellow().to_string(),
            Severity::Error   => text.red().to_string(),
            Severity::Fatal   => text.red().bold().to_string(),
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

// -----------------------------------------------------------------------------

/// Wrapper type that gives warning severity to an assembler message.
#[derive(Clone, Debug)]
pub struct Warning<T: Message>(pub T);

impl<T: Message> Message for Warning<T> {
    #[inline]
    fn origin(&self) -> Origin { self.0.origin() }

    #[inline]
    fn severity(&self) -> Severity { Severity::Warning }
}

impl<T: Message> Display for Warning<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result { self.0.fmt(f) }
}

/// Wrapper type that gives error severity to an assembler message.
#[derive(Clone, Debug)]
pub struct Error<T: Message>(pub T);

impl<T: Message> Message for Error<T> {
    #[inline]
    fn origin(&self) -> Origin { self.0.origin() }

    #[inline]
    fn severity(&self) -> Severity { Severity::Error }
}

impl<T: Message> Display for Error<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result { self.0.fmt(f) }
}

/// Wrapper type that gives fatal severity to an assembler message.
#[derive(Clone, Debug)]
pub struct Fatal<T: Message>(pub T);

impl<T: Message> Message for Fatal<T> {
    #[inline]
    fn origin(&self) -> Origin { self.0.origin() }

    #[inline]
    fn severity(&self) -> Severity { Severity::Fatal }
}

impl<T: Message> Display for Fatal<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result { self.0.fmt(f) }
}

// -----------------------------------------------------------------------------

/// Trait for sinks that can record assembler messages and tally severities.
pub trait Log {
    /// Records a message verbatim.
    fn log<M: Message>(&mut self, msg: M);

    /// Records a message, tallying it as a warning.
    #[inline]
    fn log_warning<M: Message>(&mut self, msg: M) {
        self.log(Warning(msg))
    }

    /// Records a message, tallying it as an error.
    #[inline]
    fn log_error<M: Message>(&mut self, msg: M) {
        self.log(Error(msg))
    }
}

/// Renders a message the way it appears on the assembler's diagnostic
/// stream: `<file>(<line>): <severity><text>`, matching the object-writer's
/// companion linker convention for locating a problem.
pub fn render<M: Message>(msg: &M) -> String {
    let origin = msg.origin();
    let sev    = msg.severity();
    let body   = format!("{}{}", sev.label(), msg);
    match origin {
        Origin::General => sev.colorize(&body),
        Origin::At(_)   => format!("{}: {}", origin, sev.colorize(&body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Normal < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn render_general() {
        let msg = Error("boom");
        assert_eq!(strip_colors(&render(&msg)), "error: boom");
    }

    #[test]
    fn render_at_position() {
        let pos = SourcePosition::new(Rc::from("foo.asm"), 3);
        let msg = AtPosition::new(Error("oops"), pos);
        assert_eq!(strip_colors(&render(&msg)), "foo.asm(3): error: oops");
    }

    fn strip_colors(s: &str) -> String {
        // Tests run with colored output disabled via `colored::control`
        // in practice, but strip ANSI defensively so assertions are stable
        // regardless of environment.
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                for c in chars.by_ref() {
                    if c == 'm' { break }
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}
