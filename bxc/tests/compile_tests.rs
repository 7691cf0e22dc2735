//! End-to-end compilation tests driving the `bxc` binary directly.
//!
//! These stick to `-S` (assembly only) so they don't depend on a host `as`/`ld`
//! toolchain or the `libb` archive being built; a couple of tests additionally
//! shell out to `as` to catch assembly that the emitter thinks is fine but a
//! real assembler rejects.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn bxc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bxc"))
}

fn compile_to_asm(fixture: &str, out_name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join(out_name);
    let input = fixtures_dir().join(fixture);

    Command::new(bxc_bin())
        .arg(&input)
        .arg("-S")
        .arg("-o")
        .arg(&out)
        .current_dir(dir.path())
        .assert()
        .success();

    (dir, out)
}

#[test]
fn hello_world_emits_two_putchar_calls() {
    let (_dir, out) = compile_to_asm("hello.b", "hello.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    assert_eq!(asm.matches("call putchar").count(), 2);
    assert!(asm.contains(".globl main"));
}

#[test]
fn compound_assign_reuses_the_lhs_address() {
    let (_dir, out) = compile_to_asm("compound_assign.b", "out.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    assert!(asm.contains("add %rdi, %rax") || asm.contains("add %rax, %rdi"));
}

#[test]
fn ternary_emits_cond_labels() {
    let (_dir, out) = compile_to_asm("ternary.b", "out.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    assert!(asm.contains(".L.cond.else.0"));
    assert!(asm.contains(".L.cond.end.0"));
}

#[test]
fn global_vector_with_mixed_ivals_lays_out_self_pointer_and_elements() {
    let (_dir, out) = compile_to_asm("global_vector.b", "out.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    assert!(asm.contains(".globl table"));
    assert!(asm.contains(".quad .+8"));
    assert!(asm.contains(".quad 1"));
    assert!(asm.contains(".quad 2"));
    assert!(asm.contains(".string.0")); // the pooled "str" literal
}

#[test]
fn precedence_multiplies_before_adding() {
    let (_dir, out) = compile_to_asm("precedence.b", "out.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    // 3 + 4 * 2: the multiplication's imul must appear before the addition's add.
    let mul_at = asm.find("imul").expect("a multiply was emitted");
    let add_at = asm.find("add %rdi, %rax").or_else(|| asm.find("add %rax, %rdi")).expect("an add was emitted");
    assert!(mul_at < add_at);
}

#[test]
fn octal_literal_is_decoded_base_eight() {
    let (_dir, out) = compile_to_asm("octal.b", "out.s");
    let asm = std::fs::read_to_string(&out).expect("assembly written");
    // 017 octal == 15 decimal
    assert!(asm.contains("mov $15, %rax"));
}

#[test]
fn undeclared_identifier_is_a_compile_error() {
    let dir = TempDir::new().expect("tempdir");
    let input = fixtures_dir().join("undeclared.b");
    Command::new(bxc_bin())
        .arg(&input)
        .arg("-S")
        .arg("-o")
        .arg(dir.path().join("out.s"))
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined identifier"));
}

#[test]
fn missing_input_file_is_reported() {
    let mut cmd = Command::new(bxc_bin());
    cmd.arg("/no/such/file.b").arg("-S");
    cmd.assert().failure().stderr(predicate::str::contains("bxc:"));
}

#[test]
fn help_flag_lists_source_file_argument() {
    let mut cmd = Command::new(bxc_bin());
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("FILE"));
}

#[test]
fn save_temps_keeps_the_intermediate_assembly() {
    let dir = TempDir::new().expect("tempdir");
    let input = fixtures_dir().join("hello.b");
    Command::new(bxc_bin())
        .arg(&input)
        .arg("-S")
        .arg("--save-temps")
        .arg("-o")
        .arg(dir.path().join("hello.s"))
        .current_dir(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("hello.s").exists());
}
