//! Top-level declaration compiler: function definitions, global vectors, and
//! global scalars. Shares the ival scanner between vector and scalar
//! initializers since both use the same literal/identifier grammar.

use crate::error::CompileError;
use crate::stmt::compile_statement;
use crate::unit::{Unit, WORD};

const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

fn skip_ws(u: &mut Unit) -> Result<(), CompileError> {
    crate::lexer::skip_whitespace(&mut u.reader)
}

fn expect_byte(u: &mut Unit, expected: u8) -> Result<(), CompileError> {
    match u.reader.next() {
        Some(b) if b == expected => Ok(()),
        Some(b) => Err(CompileError::syntax(
            u.pos(),
            format!("expected '{}', found '{}'", expected as char, b as char),
        )),
        None => Err(CompileError::syntax(
            u.pos(),
            format!("expected '{}', found end of input", expected as char),
        )),
    }
}

/// Compiles one top-level declaration: reads the name, then dispatches on
/// the following character.
pub fn compile_declaration(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    let pos = u.pos();
    let name = crate::lexer::read_identifier(&mut u.reader)
        .ok_or_else(|| CompileError::syntax(pos.clone(), "expected a top-level name"))?;
    skip_ws(u)?;
    match u.reader.peek() {
        Some(b'(') => compile_function(u, &name),
        Some(b'[') => compile_vector(u, &name),
        _ => compile_scalar(u, &name),
    }
}

fn compile_function(u: &mut Unit, name: &str) -> Result<(), CompileError> {
    u.reader.next(); // '('
    u.enter_function(name);
    let mut params = Vec::new();
    skip_ws(u)?;
    if u.reader.peek() != Some(b')') {
        loop {
            skip_ws(u)?;
            let ppos = u.pos();
            let pname = crate::lexer::read_identifier(&mut u.reader)
                .ok_or_else(|| CompileError::syntax(u.pos(), "expected parameter name"))?;
            params.push((pname, ppos));
            skip_ws(u)?;
            match u.reader.peek() {
                Some(b',') => {
                    u.reader.next();
                }
                _ => break,
            }
        }
    }
    skip_ws(u)?;
    expect_byte(u, b')')?;
    if params.len() > ARG_REGS.len() {
        return Err(CompileError::semantic(
            u.pos(),
            format!("function '{name}' has more than {} parameters", ARG_REGS.len()),
        ));
    }

    u.out.push_str(".text\n");
    u.out.push_str(&format!(".globl {name}\n"));
    u.out.push_str(&format!(".type {name}, @function\n"));
    u.out.push_str(&format!("{name}:\n"));
    u.out.push_str("  push %rbp\n");
    u.out.push_str("  mov %rsp, %rbp\n");
    // The exact frame size is only known once the body has been compiled
    // (locals are reserved while parsing statements), so the `sub` operand
    // is a placeholder patched in afterward.
    let frame_marker = format!("@@FRAME.{name}@@");
    u.out.push_str(&format!("  sub ${frame_marker}, %rsp\n"));

    for (i, (pname, ppos)) in params.iter().enumerate() {
        let slot = u.reserve_slots(1);
        u.locals.insert(pname.clone(), slot, ppos)?;
        u.out
            .push_str(&format!("  mov {}, {}\n", ARG_REGS[i], crate::unit::slot_addr(slot)));
    }

    compile_statement(u)?;

    u.out.push_str("  xor %rax, %rax\n");
    u.out.push_str(&format!(".L.return.{name}:\n"));
    u.out.push_str("  mov %rbp, %rsp\n");
    u.out.push_str("  pop %rbp\n");
    u.out.push_str("  ret\n");

    let frame_bytes = u.max_offset * WORD;
    u.out = u.out.replace(&format!("${frame_marker}"), &format!("${frame_bytes}"));
    Ok(())
}

/// `name[n] ival, ival, ...;` or `name[n];` or `name[];`
fn compile_vector(u: &mut Unit, name: &str) -> Result<(), CompileError> {
    u.reader.next(); // '['
    skip_ws(u)?;
    let declared_size = crate::lexer::read_number(&mut u.reader)?;
    skip_ws(u)?;
    expect_byte(u, b']')?;

    let mut ivals: Vec<String> = Vec::new();
    skip_ws(u)?;
    if u.reader.peek() != Some(b';') {
        loop {
            ivals.push(compile_ival(u)?);
            skip_ws(u)?;
            match u.reader.peek() {
                Some(b',') => {
                    u.reader.next();
                    skip_ws(u)?;
                }
                _ => break,
            }
        }
    }
    skip_ws(u)?;
    expect_byte(u, b';')?;

    // With no explicit size, the initializer count determines it; a vector
    // with neither a size nor initializers has exactly zero elements.
    let size = declared_size.map(|n| n as usize).unwrap_or(ivals.len());
    if ivals.len() > size {
        return Err(CompileError::semantic(
            u.pos(),
            format!("vector '{name}' has more initializers than its declared size"),
        ));
    }

    u.out.push_str(".data\n");
    u.out.push_str(&format!(".globl {name}\n"));
    u.out.push_str(&format!(".type {name}, @object\n"));
    u.out.push_str(".align 8\n");
    u.out.push_str(&format!("{name}:\n"));
    u.out.push_str("  .quad .+8\n"); // self-relative pointer to the first element
    for ival in &ivals {
        u.out.push_str(&format!("  .quad {ival}\n"));
    }
    let padding = size - ivals.len();
    if padding > 0 {
        u.out.push_str(&format!("  .zero {}\n", padding * WORD));
    }
    Ok(())
}

/// `name ival;` or `name;`
fn compile_scalar(u: &mut Unit, name: &str) -> Result<(), CompileError> {
    skip_ws(u)?;
    let ival = if u.reader.peek() == Some(b';') {
        None
    } else {
        Some(compile_ival(u)?)
    };
    skip_ws(u)?;
    expect_byte(u, b';')?;

    u.out.push_str(".data\n");
    u.out.push_str(&format!(".globl {name}\n"));
    u.out.push_str(&format!(".type {name}, @object\n"));
    u.out.push_str(".align 8\n");
    u.out.push_str(&format!("{name}:\n"));
    match ival {
        Some(ival) => u.out.push_str(&format!("  .quad {ival}\n")),
        None => u.out.push_str(&format!("  .zero {WORD}\n")),
    }
    Ok(())
}

/// An ival is an identifier, a character literal, a string literal, or a
/// (possibly negative, possibly octal) integer constant. Returns the
/// assembly operand text to follow a `.quad`.
fn compile_ival(u: &mut Unit) -> Result<String, CompileError> {
    skip_ws(u)?;
    match u.reader.peek() {
        Some(b'-') => {
            u.reader.next();
            skip_ws(u)?;
            let value = crate::lexer::read_number(&mut u.reader)?
                .ok_or_else(|| CompileError::syntax(u.pos(), "expected a number after '-'"))?;
            Ok(format!("{}", -value))
        }
        Some(b) if b.is_ascii_digit() => {
            let value = crate::lexer::read_number(&mut u.reader)?.expect("digit already peeked");
            Ok(format!("{value}"))
        }
        Some(b'\'') => {
            u.reader.next();
            let value = crate::lexer::read_character(&mut u.reader)?;
            Ok(format!("{value}"))
        }
        Some(b'"') => {
            u.reader.next();
            let idx = crate::lexer::read_string(&mut u.reader, &mut u.strings)?;
            Ok(crate::strings::StringPool::label(idx))
        }
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
            let name = crate::lexer::read_identifier(&mut u.reader).expect("identifier already peeked");
            Ok(name)
        }
        Some(other) => Err(CompileError::syntax(
            u.pos(),
            format!("invalid initializer starting with '{}'", other as char),
        )),
        None => Err(CompileError::syntax(u.pos(), "unexpected end of input in initializer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SourceReader;

    fn unit_for(src: &str) -> Unit {
        let mut u = Unit::new();
        u.set_reader(SourceReader::new("<test>", src.as_bytes().to_vec()));
        u
    }

    #[test]
    fn global_vector_emits_self_pointer_before_ivals() {
        let mut u = unit_for("v[3] 10, 20;");
        compile_declaration(&mut u).unwrap();
        let ptr_at = u.out.find(".quad .+8").unwrap();
        let ival_at = u.out.find(".quad 10").unwrap();
        assert!(ptr_at < ival_at);
        assert!(u.out.contains(".zero 8")); // one element left unpadded (3 - 2)
    }

    #[test]
    fn unsized_vector_takes_its_size_from_initializers() {
        let mut u = unit_for("v[] 1, 2, 3;");
        compile_declaration(&mut u).unwrap();
        assert!(!u.out.contains(".zero"));
        assert_eq!(u.out.matches(".quad ").count(), 4); // self-pointer + 3 ivals
    }

    #[test]
    fn scalar_without_initializer_is_zeroed() {
        let mut u = unit_for("x;");
        compile_declaration(&mut u).unwrap();
        assert!(u.out.contains(".zero 8"));
    }

    #[test]
    fn scalar_with_string_ival_references_pool() {
        let mut u = unit_for("greeting \"hi\";");
        compile_declaration(&mut u).unwrap();
        assert!(u.out.contains(".quad .string.0"));
    }

    #[test]
    fn function_backpatches_frame_size() {
        let mut u = unit_for("f(a, b) { auto x; return (x); }");
        compile_declaration(&mut u).unwrap();
        assert!(!u.out.contains("@@FRAME"));
        assert!(u.out.contains("mov %rdi, -16(%rbp)")); // param a
        assert!(u.out.contains("mov %rsi, -24(%rbp)")); // param b
        assert!(u.out.contains("sub $"));
    }

    #[test]
    fn too_many_parameters_is_rejected() {
        let mut u = unit_for("f(a, b, c, d, e, g, h) { ; }");
        assert!(compile_declaration(&mut u).is_err());
    }
}
