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

//! CLI front-end: one positional source path in, `<stem>.o80` and
//! `<stem>.lst` out, exit code `0`/`1` (spec §6).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use z80as::asm::Assembler;
use z80as::diag::AssembleOptions;
use z80as::PROGRAM_NAME;

fn main() -> ExitCode {
    let mut args = env::args_os();
    args.next(); // argv[0]

    let path = match args.next() {
        Some(p) if args.next().is_none() => PathBuf::from(p),
        _ => {
            eprintln!("{PROGRAM_NAME}: usage: {PROGRAM_NAME} <source-file>");
            return ExitCode::FAILURE;
        }
    };

    let result = match Assembler::new(AssembleOptions::default()).assemble_file(&path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{PROGRAM_NAME}: cannot read '{}': {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    if !result.succeeded() {
        return ExitCode::FAILURE;
    }

    if let Err(e) = fs::write(sibling(&path, "o80"), &result.object) {
        eprintln!("{PROGRAM_NAME}: cannot write object file: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = fs::write(sibling(&path, "lst"), &result.listing) {
        eprintln!("{PROGRAM_NAME}: cannot write listing file: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// `path` with its extension replaced by `ext`.
fn sibling(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}
