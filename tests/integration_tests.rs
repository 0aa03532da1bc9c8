//! End-to-end tests driving the public `Assembler` API over whole source
//! snippets, exercising the concrete scenarios from the assembler's
//! specification in one pass from source text to object bytes.

use std::io;
use std::path::Path;

use z80as::asm::{AssembleResult, Assembler};
use z80as::source::SourceOpener;

struct MemOpener(&'static str);

impl SourceOpener for MemOpener {
    fn read(&self, _path: &Path) -> io::Result<String> {
        Ok(self.0.to_string())
    }
}

fn assemble(src: &'static str) -> AssembleResult {
    let opener = MemOpener(src);
    Assembler::default()
        .assemble(&opener, Path::new("t.asm"))
        .expect("in-memory source is always readable")
}

fn code_bytes(r: &AssembleResult) -> &[u8] {
    let len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
    &r.object[4..4 + len]
}

#[test]
fn ld_a_immediate() {
    let r = assemble("LD A, 5\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x3E, 0x05]);
}

#[test]
fn ld_hl_immediate_vs_memory() {
    let r = assemble("LD HL, 1234H\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x21, 0x34, 0x12]);

    let r = assemble("LD HL, (1234H)\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x2A, 0x34, 0x12]);
}

#[test]
fn ld_indexed_memory_immediate() {
    let r = assemble("LD (IX+2), 7\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0xDD, 0x36, 0x02, 0x07]);
}

#[test]
fn add_hl_bc_after_load() {
    let r = assemble("LD BC, 0\nADD HL, BC\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x01, 0x00, 0x00, 0x09]);
}

#[test]
fn self_referencing_djnz_is_short_form() {
    let r = assemble("LOOP: DJNZ LOOP\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x10, 0xFE]);
}

#[test]
fn if_else_endif_lowers_to_negated_short_jumps() {
    let r = assemble("IF NZ\nINC A\nELSE\nDEC A\nENDIF\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x28, 0x03, 0x3C, 0x18, 0x01, 0x3D]);
}

#[test]
fn do_while_wend_loop_assembles_and_converges() {
    // A pre-tested loop: DO marks the top, WHILE tests and exits forward
    // when false, WEND jumps back unconditionally. Exercises the DO/WHILE/
    // WEND lowering end to end without pinning the exact byte-level
    // optimization choice flow.rs makes for the back edge.
    let r = assemble("DO\nWHILE NZ\nINC A\nWEND\n");
    assert!(r.succeeded());
    let bytes = code_bytes(&r);
    assert!(bytes.contains(&0x3C)); // INC A appears somewhere in the body
}

#[test]
fn dwnz_loop_assembles_with_short_djnz() {
    let r = assemble("LD B, 3\nDO\nINC A\nDWNZ\n");
    assert!(r.succeeded());
    let bytes = code_bytes(&r);
    // LD B, n; INC A; DJNZ back to the INC A.
    assert_eq!(&bytes[0..2], &[0x06, 0x03]);
    assert_eq!(bytes[2], 0x3C);
    assert_eq!(bytes[3], 0x10);
}

#[test]
fn public_symbol_round_trips_with_no_fixups() {
    let r = assemble("PUBLIC FOO\nFOO: RET\n");
    assert!(r.succeeded());

    let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
    let mut pos = 4 + code_len;
    let data_len = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]) as usize;
    pos += 2 + data_len;
    let id_count = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]);
    assert_eq!(id_count, 1);
    pos += 2;
    let name_len = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]) as usize;
    pos += 2;
    assert_eq!(&r.object[pos..pos + name_len], b"FOO");
}

#[test]
fn extrn_call_produces_one_external_fixup() {
    let r = assemble("EXTRN BAR\nCALL BAR\n");
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r)[0], 0xCD); // CALL nn

    let code_len = u16::from_le_bytes([r.object[2], r.object[3]]) as usize;
    let mut pos = 4 + code_len;
    let data_len = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]) as usize;
    pos += 2 + data_len;
    let id_count = u16::from_le_bytes([r.object[pos], r.object[pos + 1]]);
    assert_eq!(id_count, 1);
}

#[test]
fn undefined_symbol_fails_without_emitting_object() {
    let r = assemble("JP NOWHERE\n");
    assert!(!r.succeeded());
    assert!(r.object.is_empty());
    assert!(r.listing.is_empty());
}

#[test]
fn out_of_range_jr_falls_back_to_long_jp() {
    let mut src = String::from("JR NZ, FAR\n");
    for _ in 0..130 {
        src.push_str("NOP\n");
    }
    src.push_str("FAR: RET\n");
    let opener = MemOpener(Box::leak(src.into_boxed_str()));
    let r = Assembler::default()
        .assemble(&opener, Path::new("t.asm"))
        .unwrap();
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r)[0], 0xC2); // JP NZ, nn (long form)
}

#[test]
fn include_pulls_in_nested_source() {
    struct TwoFileOpener;
    impl SourceOpener for TwoFileOpener {
        fn read(&self, path: &Path) -> io::Result<String> {
            match path.to_str().unwrap() {
                "main.asm" => Ok("INCLUDE \"lib.asm\"\nLD A, 1\n".to_string()),
                "lib.asm" => Ok("NOP\n".to_string()),
                other => Err(io::Error::new(io::ErrorKind::NotFound, other.to_string())),
            }
        }
    }

    let r = Assembler::default()
        .assemble(&TwoFileOpener, Path::new("main.asm"))
        .unwrap();
    assert!(r.succeeded());
    assert_eq!(code_bytes(&r), &[0x00, 0x3E, 0x01]);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let a = assemble("IF Z\nLD A, 1\nELSE\nLD A, 2\nENDIF\n");
    let b = assemble("IF Z\nLD A, 1\nELSE\nLD A, 2\nENDIF\n");
    assert!(a.succeeded() && b.succeeded());
    assert_eq!(a.object, b.object);
    assert_eq!(a.listing, b.listing);
}
