//! Statement compiler: dispatches on the first significant token and emits
//! the corresponding x86-64 sequence, recursing into itself for nested
//! statements (blocks, `if`/`else` arms, loop bodies, `switch` bodies).

use crate::error::CompileError;
use crate::expr::{compile_expr_rvalue, compile_expr};
use crate::unit::{slot_addr, SwitchFrame, Unit};

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

/// Reads an identifier at the current position, skipping leading whitespace.
/// Returns `None` (without consuming anything) if no identifier starts here.
fn try_read_identifier(u: &mut Unit) -> Result<Option<String>, CompileError> {
    skip_ws(u)?;
    Ok(crate::lexer::read_identifier(&mut u.reader))
}

/// Looks ahead for a keyword match at the current position. On success the
/// keyword's bytes are consumed; on failure every byte read is pushed back.
fn try_keyword(u: &mut Unit, kw: &str) -> Result<bool, CompileError> {
    skip_ws(u)?;
    let mut read = Vec::new();
    for expected in kw.bytes() {
        match u.reader.peek() {
            Some(b) if b == expected => {
                u.reader.next();
                read.push(b);
            }
            _ => {
                for b in read.into_iter().rev() {
                    u.reader.pushback(b);
                }
                return Ok(false);
            }
        }
    }
    // A keyword must not be a prefix of a longer identifier (e.g. "ifx").
    if let Some(b) = u.reader.peek() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            for b in read.into_iter().rev() {
                u.reader.pushback(b);
            }
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn compile_statement(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    match u.reader.peek() {
        None => Err(CompileError::syntax(u.pos(), "unexpected end of input in statement")),
        Some(b'{') => compile_block(u),
        Some(b';') => {
            u.reader.next();
            Ok(())
        }
        _ => {
            if try_keyword(u, "auto")? {
                compile_auto(u)
            } else if try_keyword(u, "extrn")? {
                compile_extrn(u)
            } else if try_keyword(u, "if")? {
                compile_if(u)
            } else if try_keyword(u, "while")? {
                compile_while(u)
            } else if try_keyword(u, "switch")? {
                compile_switch(u)
            } else if try_keyword(u, "goto")? {
                compile_goto(u)
            } else if try_keyword(u, "case")? {
                compile_case(u)
            } else if try_keyword(u, "return")? {
                compile_return(u)
            } else {
                compile_label_or_expr_statement(u)
            }
        }
    }
}

fn compile_block(u: &mut Unit) -> Result<(), CompileError> {
    u.reader.next(); // '{'
    let saved_offset = u.stack_offset;
    loop {
        skip_ws(u)?;
        match u.reader.peek() {
            Some(b'}') => {
                u.reader.next();
                break;
            }
            None => return Err(CompileError::syntax(u.pos(), "unclosed block")),
            _ => compile_statement(u)?,
        }
    }
    if u.stack_offset > saved_offset {
        let words = u.stack_offset - saved_offset;
        u.out.push_str(&format!("  add ${}, %rsp\n", words * crate::unit::WORD));
    }
    u.stack_offset = saved_offset;
    Ok(())
}

/// `auto name [ival | [n]], ...;`
fn compile_auto(u: &mut Unit) -> Result<(), CompileError> {
    loop {
        skip_ws(u)?;
        let pos = u.pos();
        let name = try_read_identifier(u)?
            .ok_or_else(|| CompileError::syntax(u.pos(), "expected identifier after 'auto'"))?;
        skip_ws(u)?;
        if u.reader.peek() == Some(b'[') {
            u.reader.next();
            skip_ws(u)?;
            let size = crate::lexer::read_number(&mut u.reader)?.unwrap_or(0) as usize;
            skip_ws(u)?;
            expect_byte(u, b']')?;
            // Reserve the self-pointer slot, then `size` element slots.
            let ptr_slot = u.reserve_slots(1 + size);
            u.locals.insert(name, ptr_slot, &pos)?;
            let elem0 = ptr_slot + 1;
            u.out.push_str(&format!("  lea {}, %rax\n", slot_addr(elem0)));
            u.out.push_str(&format!("  mov %rax, {}\n", slot_addr(ptr_slot)));
        } else {
            let slot = u.reserve_slots(1);
            u.locals.insert(name, slot, &pos)?;
        }
        skip_ws(u)?;
        match u.reader.peek() {
            Some(b',') => {
                u.reader.next();
            }
            Some(b';') => {
                u.reader.next();
                break;
            }
            _ => return Err(CompileError::syntax(u.pos(), "expected ',' or ';' in 'auto'")),
        }
    }
    if u.stack_offset % 2 != 0 {
        u.reserve_slots(1);
    }
    Ok(())
}

/// `extrn name, ...;`
fn compile_extrn(u: &mut Unit) -> Result<(), CompileError> {
    loop {
        skip_ws(u)?;
        let pos = u.pos();
        let name = try_read_identifier(u)?
            .ok_or_else(|| CompileError::syntax(u.pos(), "expected identifier after 'extrn'"))?;
        u.externs.insert(name, &pos)?;
        skip_ws(u)?;
        match u.reader.peek() {
            Some(b',') => {
                u.reader.next();
            }
            Some(b';') => {
                u.reader.next();
                break;
            }
            _ => return Err(CompileError::syntax(u.pos(), "expected ',' or ';' in 'extrn'")),
        }
    }
    Ok(())
}

fn compile_if(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    expect_byte(u, b'(')?;
    compile_expr_rvalue(u)?;
    skip_ws(u)?;
    expect_byte(u, b')')?;
    let id = u.next_stmt_id();
    u.out.push_str("  cmp $0, %rax\n");
    u.out.push_str(&format!("  je .L.else.{id}\n"));
    compile_statement(u)?;
    u.out.push_str(&format!("  jmp .L.end.{id}\n"));
    u.out.push_str(&format!(".L.else.{id}:\n"));
    if try_keyword(u, "else")? {
        compile_statement(u)?;
    }
    u.out.push_str(&format!(".L.end.{id}:\n"));
    Ok(())
}

fn compile_while(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    expect_byte(u, b'(')?;
    let id = u.next_stmt_id();
    u.out.push_str(&format!(".L.start.{id}:\n"));
    compile_expr_rvalue(u)?;
    skip_ws(u)?;
    expect_byte(u, b')')?;
    u.out.push_str("  cmp $0, %rax\n");
    u.out.push_str(&format!("  je .L.end.{id}\n"));
    compile_statement(u)?;
    u.out.push_str(&format!("  jmp .L.start.{id}\n"));
    u.out.push_str(&format!(".L.end.{id}:\n"));
    Ok(())
}

fn compile_switch(u: &mut Unit) -> Result<(), CompileError> {
    compile_expr_rvalue(u)?;
    let id = u.next_stmt_id();
    // The body runs unconditionally first (case labels are just ordinary
    // labels reachable only via the dispatch table's jumps, or by falling
    // out of a preceding case), so control must skip straight to the
    // dispatch table before ever reaching the body's instructions.
    u.out.push_str(&format!("  jmp .L.cmp.{id}\n"));
    u.out.push_str(&format!(".L.stmts.{id}:\n"));
    u.switch_stack.push(SwitchFrame { id, cases: Vec::new() });
    compile_statement(u)?;
    let frame = u.switch_stack.pop().expect("switch frame pushed above");
    u.out.push_str(&format!("  jmp .L.end.{id}\n"));
    u.out.push_str(&format!(".L.cmp.{id}:\n"));
    for value in &frame.cases {
        u.out.push_str(&format!("  cmp ${value}, %rax\n"));
        u.out.push_str(&format!("  je .L.case.{id}.{value}\n"));
    }
    u.out.push_str(&format!(".L.end.{id}:\n"));
    Ok(())
}

/// `case C:` — only legal nested inside a `switch` body.
fn compile_case(u: &mut Unit) -> Result<(), CompileError> {
    let frame = u
        .switch_stack
        .last_mut()
        .ok_or_else(|| CompileError::semantic(u.pos(), "'case' outside of a 'switch'"))?;
    let id = frame.id;
    skip_ws(u)?;
    let value = crate::lexer::read_number(&mut u.reader)?
        .ok_or_else(|| CompileError::syntax(u.pos(), "expected constant after 'case'"))?;
    frame.cases.push(value);
    skip_ws(u)?;
    expect_byte(u, b':')?;
    u.out.push_str(&format!(".L.case.{id}.{value}:\n"));
    Ok(())
}

fn compile_goto(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    let label = try_read_identifier(u)?
        .ok_or_else(|| CompileError::syntax(u.pos(), "expected label after 'goto'"))?;
    skip_ws(u)?;
    expect_byte(u, b';')?;
    u.out
        .push_str(&format!("  jmp .L.label.{label}.{}\n", u.current_fn));
    Ok(())
}

fn compile_return(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    if u.reader.peek() == Some(b'(') {
        u.reader.next();
        compile_expr_rvalue(u)?;
        skip_ws(u)?;
        expect_byte(u, b')')?;
    } else {
        u.out.push_str("  xor %rax, %rax\n");
    }
    skip_ws(u)?;
    expect_byte(u, b';')?;
    u.out.push_str(&format!("  jmp .L.return.{}\n", u.current_fn));
    Ok(())
}

/// Either `label: stmt` or a bare expression statement. Disambiguated by
/// speculatively reading an identifier and peeking for a trailing `:` that is
/// not `::`/part of any operator (B labels never collide with expression
/// syntax since a lone identifier followed by `:` is otherwise meaningless).
fn compile_label_or_expr_statement(u: &mut Unit) -> Result<(), CompileError> {
    skip_ws(u)?;
    if let Some(b) = u.reader.peek() {
        if b.is_ascii_alphabetic() || b == b'_' {
            let name = crate::lexer::read_identifier(&mut u.reader).expect("identifier already peeked");
            skip_ws(u)?;
            if u.reader.peek() == Some(b':') {
                u.reader.next();
                u.out
                    .push_str(&format!(".L.label.{name}.{}:\n", u.current_fn));
                return compile_statement(u);
            }
            // Not a label: push the identifier bytes back, byte by byte, and
            // fall through to ordinary expression-statement parsing.
            for b in name.bytes().rev() {
                u.reader.pushback(b);
            }
        }
    }
    let _ = compile_expr(u)?;
    skip_ws(u)?;
    expect_byte(u, b';')?;
    Ok(())
}
