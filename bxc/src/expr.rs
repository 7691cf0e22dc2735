//! Precedence-climbing recursive-descent expression compiler.
//!
//! Each precedence level is one function that parses its operand from the
//! next-higher level and then loops over same-level operators. There is no
//! AST: every function emits x86-64 directly into `u.out` and returns whether
//! the value now sitting in `%rax` is an lvalue (address) or rvalue (value).
//!
//! The `===` vs `==` vs `=` split is the one place two levels must cooperate:
//! the equality level (6) tries `==` first and, on seeing a third `=`, undoes
//! its own lookahead and lets the assignment level (10) claim the whole
//! token. See `try_consume_eq` and `parse_assign`.

use crate::error::CompileError;
use crate::unit::Unit;

#[derive(Clone, Copy)]
pub struct ExprVal {
    pub is_lvalue: bool,
}

impl ExprVal {
    fn lvalue() -> Self {
        Self { is_lvalue: true }
    }

    fn rvalue() -> Self {
        Self { is_lvalue: false }
    }
}

#[derive(Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

fn skip_ws(u: &mut Unit) -> Result<(), CompileError> {
    crate::lexer::skip_whitespace(&mut u.reader)
}

fn to_rvalue(u: &mut Unit, v: &mut ExprVal) {
    if v.is_lvalue {
        u.convert_to_rvalue();
        v.is_lvalue = false;
    }
}

fn push_rax(u: &mut Unit) {
    u.out.push_str("  push %rax\n");
}

fn pop_rdi(u: &mut Unit) {
    u.out.push_str("  pop %rdi\n");
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

/// Applies `op` to `%rdi` (left) and `%rax` (right), leaving the result in
/// `%rax`. Every caller — the left-associative binary levels and the `=op`
/// family — sets up registers this way first.
fn emit_binop(u: &mut Unit, op: BinOp) {
    use BinOp::*;
    match op {
        Add => u.out.push_str("  add %rdi, %rax\n"),
        Sub => {
            u.out.push_str("  sub %rax, %rdi\n");
            u.out.push_str("  mov %rdi, %rax\n");
        }
        Mul => u.out.push_str("  imul %rdi, %rax\n"),
        Div => {
            u.out.push_str("  mov %rax, %rcx\n");
            u.out.push_str("  mov %rdi, %rax\n");
            u.out.push_str("  cqo\n");
            u.out.push_str("  idiv %rcx\n");
        }
        Mod => {
            u.out.push_str("  mov %rax, %rcx\n");
            u.out.push_str("  mov %rdi, %rax\n");
            u.out.push_str("  cqo\n");
            u.out.push_str("  idiv %rcx\n");
            u.out.push_str("  mov %rdx, %rax\n");
        }
        Shl => {
            u.out.push_str("  mov %rax, %rcx\n");
            u.out.push_str("  mov %rdi, %rax\n");
            u.out.push_str("  shl %cl, %rax\n");
        }
        Shr => {
            u.out.push_str("  mov %rax, %rcx\n");
            u.out.push_str("  mov %rdi, %rax\n");
            u.out.push_str("  sar %cl, %rax\n");
        }
        Lt | Le | Gt | Ge | Eq | Ne => {
            let setcc = match op {
                Lt => "setl",
                Le => "setle",
                Gt => "setg",
                Ge => "setge",
                Eq => "sete",
                Ne => "setne",
                _ => unreachable!(),
            };
            u.out.push_str("  cmp %rax, %rdi\n");
            u.out.push_str(&format!("  {setcc} %al\n"));
            u.out.push_str("  movzbq %al, %rax\n");
        }
        And => u.out.push_str("  and %rdi, %rax\n"),
        Or => u.out.push_str("  or %rdi, %rax\n"),
    }
}

fn emit_prefix_step(u: &mut Unit, is_inc: bool) {
    u.out.push_str("  mov (%rax), %rdi\n");
    u.out.push_str(&format!("  {} $1, %rdi\n", if is_inc { "add" } else { "sub" }));
    u.out.push_str("  mov %rdi, (%rax)\n");
}

fn emit_postfix_step(u: &mut Unit, is_inc: bool) {
    u.out.push_str("  mov (%rax), %rcx\n");
    u.out.push_str("  mov %rcx, %rdx\n");
    u.out.push_str(&format!("  {} $1, %rdx\n", if is_inc { "add" } else { "sub" }));
    u.out.push_str("  mov %rdx, (%rax)\n");
    u.out.push_str("  mov %rcx, %rax\n");
}

/// Entry point: compiles a full expression, returning whether the final
/// value in `%rax` is an lvalue.
pub fn compile_expr(u: &mut Unit) -> Result<bool, CompileError> {
    let v = parse_assign(u)?;
    Ok(v.is_lvalue)
}

/// Like `compile_expr`, but guarantees `%rax` ends up holding the value
/// itself rather than its address.
pub fn compile_expr_rvalue(u: &mut Unit) -> Result<(), CompileError> {
    let mut v = parse_assign(u)?;
    to_rvalue(u, &mut v);
    Ok(())
}

/// Level 10: `=` and the `=op` family, right-associative.
fn parse_assign(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let lhs = parse_ternary(u)?;
    skip_ws(u)?;
    if u.reader.peek() != Some(b'=') {
        return Ok(lhs);
    }
    u.reader.next();
    let op = parse_assign_suffix(u)?;
    if !lhs.is_lvalue {
        return Err(CompileError::semantic(
            u.pos(),
            "left side of assignment is not an lvalue",
        ));
    }
    push_rax(u); // save the lhs address across evaluation of the rhs
    let mut rhs = parse_assign(u)?;
    to_rvalue(u, &mut rhs); // rhs value now in %rax
    u.out.push_str("  pop %rcx\n"); // lhs address
    if let Some(op) = op {
        u.out.push_str("  mov (%rcx), %rdi\n"); // lhs value
        emit_binop(u, op);
    }
    u.out.push_str("  mov %rax, (%rcx)\n");
    Ok(ExprVal::rvalue())
}

/// Determines which member of the `=op` family follows an already-consumed
/// leading `=`. `None` means plain assignment.
fn parse_assign_suffix(u: &mut Unit) -> Result<Option<BinOp>, CompileError> {
    match u.reader.peek() {
        None => Ok(None),
        Some(b'=') => {
            u.reader.next();
            match u.reader.peek() {
                Some(b'=') => {
                    u.reader.next();
                    Ok(Some(BinOp::Eq))
                }
                _ => Err(CompileError::syntax(u.pos(), "unexpected '==' in assignment")),
            }
        }
        Some(b'+') => {
            u.reader.next();
            Ok(Some(BinOp::Add))
        }
        Some(b'-') => {
            u.reader.next();
            Ok(Some(BinOp::Sub))
        }
        Some(b'*') => {
            u.reader.next();
            Ok(Some(BinOp::Mul))
        }
        Some(b'/') => {
            u.reader.next();
            Ok(Some(BinOp::Div))
        }
        Some(b'%') => {
            u.reader.next();
            Ok(Some(BinOp::Mod))
        }
        Some(b'&') => {
            u.reader.next();
            Ok(Some(BinOp::And))
        }
        Some(b'|') => {
            u.reader.next();
            Ok(Some(BinOp::Or))
        }
        Some(b'<') => {
            u.reader.next();
            match u.reader.peek() {
                Some(b'<') => {
                    u.reader.next();
                    Ok(Some(BinOp::Shl))
                }
                Some(b'=') => {
                    u.reader.next();
                    Ok(Some(BinOp::Le))
                }
                _ => Ok(Some(BinOp::Lt)),
            }
        }
        Some(b'>') => {
            u.reader.next();
            match u.reader.peek() {
                Some(b'>') => {
                    u.reader.next();
                    Ok(Some(BinOp::Shr))
                }
                Some(b'=') => {
                    u.reader.next();
                    Ok(Some(BinOp::Ge))
                }
                _ => Ok(Some(BinOp::Gt)),
            }
        }
        Some(b'!') => {
            u.reader.next();
            if u.reader.peek() == Some(b'=') {
                u.reader.next();
                Ok(Some(BinOp::Ne))
            } else {
                u.reader.pushback(b'!');
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

/// Level 9: `c ? a : b`, right-associative.
fn parse_ternary(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut cond = parse_bitor(u)?;
    skip_ws(u)?;
    if u.reader.peek() != Some(b'?') {
        return Ok(cond);
    }
    u.reader.next();
    to_rvalue(u, &mut cond);
    let id = u.next_cond_id();
    u.out.push_str("  cmp $0, %rax\n");
    u.out.push_str(&format!("  je .L.cond.else.{id}\n"));
    let mut then_val = parse_assign(u)?;
    to_rvalue(u, &mut then_val);
    u.out.push_str(&format!("  jmp .L.cond.end.{id}\n"));
    u.out.push_str(&format!(".L.cond.else.{id}:\n"));
    skip_ws(u)?;
    expect_byte(u, b':')?;
    let mut else_val = parse_ternary(u)?;
    to_rvalue(u, &mut else_val);
    u.out.push_str(&format!(".L.cond.end.{id}:\n"));
    Ok(ExprVal::rvalue())
}

/// Level 8: bitwise `|`.
fn parse_bitor(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_bitand(u)?;
    loop {
        skip_ws(u)?;
        if u.reader.peek() != Some(b'|') {
            break;
        }
        u.reader.next();
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_bitand(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, BinOp::Or);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Level 7: bitwise `&`.
fn parse_bitand(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_equality(u)?;
    loop {
        skip_ws(u)?;
        if u.reader.peek() != Some(b'&') {
            break;
        }
        u.reader.next();
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_equality(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, BinOp::And);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Tries to consume a genuine `==` starting at the current `=`. Returns
/// `false` (and restores every byte it read) if this is actually a lone `=`
/// or the start of `===`, leaving the token for the assignment level.
fn try_consume_eq(u: &mut Unit) -> Result<bool, CompileError> {
    u.reader.next(); // first '='
    match u.reader.peek() {
        Some(b'=') => {
            u.reader.next(); // second '='
            if u.reader.peek() == Some(b'=') {
                u.reader.pushback(b'=');
                u.reader.pushback(b'=');
                Ok(false)
            } else {
                Ok(true)
            }
        }
        _ => {
            u.reader.pushback(b'=');
            Ok(false)
        }
    }
}

/// Level 6: `==` and `!=`.
fn parse_equality(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_relational(u)?;
    loop {
        skip_ws(u)?;
        match u.reader.peek() {
            Some(b'=') => {
                if try_consume_eq(u)? {
                    to_rvalue(u, &mut lhs);
                    push_rax(u);
                    let mut rhs = parse_relational(u)?;
                    to_rvalue(u, &mut rhs);
                    pop_rdi(u);
                    emit_binop(u, BinOp::Eq);
                    lhs = ExprVal::rvalue();
                } else {
                    break;
                }
            }
            Some(b'!') => {
                u.reader.next();
                if u.reader.peek() == Some(b'=') {
                    u.reader.next();
                    to_rvalue(u, &mut lhs);
                    push_rax(u);
                    let mut rhs = parse_relational(u)?;
                    to_rvalue(u, &mut rhs);
                    pop_rdi(u);
                    emit_binop(u, BinOp::Ne);
                    lhs = ExprVal::rvalue();
                } else {
                    u.reader.pushback(b'!');
                    break;
                }
            }
            _ => break,
        }
    }
    Ok(lhs)
}

/// Level 5: `<` `<=` `>` `>=`.
fn parse_relational(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_shift(u)?;
    loop {
        skip_ws(u)?;
        let op = match u.reader.peek() {
            Some(b'<') => {
                u.reader.next();
                if u.reader.peek() == Some(b'=') {
                    u.reader.next();
                    BinOp::Le
                } else {
                    BinOp::Lt
                }
            }
            Some(b'>') => {
                u.reader.next();
                if u.reader.peek() == Some(b'=') {
                    u.reader.next();
                    BinOp::Ge
                } else {
                    BinOp::Gt
                }
            }
            _ => break,
        };
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_shift(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, op);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Level 4: `<<` `>>`. A lone `<` or `>` is not ours; push it back for the
/// relational level above.
fn parse_shift(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_additive(u)?;
    loop {
        skip_ws(u)?;
        let op = match u.reader.peek() {
            Some(b'<') => {
                u.reader.next();
                if u.reader.peek() == Some(b'<') {
                    u.reader.next();
                    BinOp::Shl
                } else {
                    u.reader.pushback(b'<');
                    break;
                }
            }
            Some(b'>') => {
                u.reader.next();
                if u.reader.peek() == Some(b'>') {
                    u.reader.next();
                    BinOp::Shr
                } else {
                    u.reader.pushback(b'>');
                    break;
                }
            }
            _ => break,
        };
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_additive(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, op);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Level 3: binary `+` `-`.
fn parse_additive(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_mul(u)?;
    loop {
        skip_ws(u)?;
        let op = match u.reader.peek() {
            Some(b'+') => BinOp::Add,
            Some(b'-') => BinOp::Sub,
            _ => break,
        };
        u.reader.next();
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_mul(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, op);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Level 2: `*` `/` `%`.
fn parse_mul(u: &mut Unit) -> Result<ExprVal, CompileError> {
    let mut lhs = parse_term(u)?;
    loop {
        skip_ws(u)?;
        let op = match u.reader.peek() {
            Some(b'*') => BinOp::Mul,
            Some(b'/') => BinOp::Div,
            Some(b'%') => BinOp::Mod,
            _ => break,
        };
        u.reader.next();
        to_rvalue(u, &mut lhs);
        push_rax(u);
        let mut rhs = parse_term(u)?;
        to_rvalue(u, &mut rhs);
        pop_rdi(u);
        emit_binop(u, op);
        lhs = ExprVal::rvalue();
    }
    Ok(lhs)
}

/// Level 1: literals, identifiers, parens, every prefix operator, and the
/// postfix chain (`[...]`, `(...)`, `++`/`--`) applied immediately after.
fn parse_term(u: &mut Unit) -> Result<ExprVal, CompileError> {
    skip_ws(u)?;
    let pos = u.pos();
    let atom = match u.reader.peek() {
        None => return Err(CompileError::syntax(pos, "unexpected end of input")),
        Some(b'(') => {
            u.reader.next();
            let mut inner = parse_assign(u)?;
            to_rvalue(u, &mut inner);
            skip_ws(u)?;
            expect_byte(u, b')')?;
            ExprVal::rvalue()
        }
        Some(b'!') => {
            u.reader.next();
            let mut v = parse_term(u)?;
            to_rvalue(u, &mut v);
            u.out.push_str("  cmp $0, %rax\n");
            u.out.push_str("  sete %al\n");
            u.out.push_str("  movzbq %al, %rax\n");
            ExprVal::rvalue()
        }
        Some(b'*') => {
            u.reader.next();
            let mut v = parse_term(u)?;
            to_rvalue(u, &mut v); // the pointer value itself becomes the new address
            ExprVal::lvalue()
        }
        Some(b'&') => {
            u.reader.next();
            let v = parse_term(u)?;
            if !v.is_lvalue {
                return Err(CompileError::semantic(u.pos(), "cannot take the address of an rvalue"));
            }
            ExprVal::rvalue() // %rax already holds the address
        }
        Some(b'-') => {
            u.reader.next();
            if u.reader.peek() == Some(b'-') {
                u.reader.next();
                let v = parse_term(u)?;
                if !v.is_lvalue {
                    return Err(CompileError::semantic(u.pos(), "prefix '--' requires an lvalue"));
                }
                emit_prefix_step(u, false);
                v
            } else {
                let mut v = parse_term(u)?;
                to_rvalue(u, &mut v);
                u.out.push_str("  neg %rax\n");
                ExprVal::rvalue()
            }
        }
        Some(b'+') => {
            u.reader.next();
            if u.reader.peek() == Some(b'+') {
                u.reader.next();
                let v = parse_term(u)?;
                if !v.is_lvalue {
                    return Err(CompileError::semantic(u.pos(), "prefix '++' requires an lvalue"));
                }
                emit_prefix_step(u, true);
                v
            } else {
                return Err(CompileError::syntax(u.pos(), "unexpected '+'"));
            }
        }
        Some(b'\'') => {
            u.reader.next();
            let value = crate::lexer::read_character(&mut u.reader)?;
            u.emit_int_literal(value);
            ExprVal::rvalue()
        }
        Some(b'"') => {
            u.reader.next();
            let idx = crate::lexer::read_string(&mut u.reader, &mut u.strings)?;
            u.out
                .push_str(&format!("  lea {}(%rip), %rax\n", crate::strings::StringPool::label(idx)));
            ExprVal::rvalue()
        }
        Some(b) if b.is_ascii_digit() => {
            let value = crate::lexer::read_number(&mut u.reader)?.expect("digit already peeked");
            u.emit_int_literal(value);
            ExprVal::rvalue()
        }
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
            let name = crate::lexer::read_identifier(&mut u.reader).expect("identifier already peeked");
            skip_ws(u)?;
            let is_call_site = u.reader.peek() == Some(b'(');
            let is_lvalue = u.emit_identifier(&name, is_call_site)?;
            ExprVal { is_lvalue }
        }
        Some(other) => {
            return Err(CompileError::syntax(pos, format!("unexpected character '{}'", other as char)));
        }
    };
    parse_postfix(u, atom)
}

const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

fn parse_postfix(u: &mut Unit, mut val: ExprVal) -> Result<ExprVal, CompileError> {
    loop {
        skip_ws(u)?;
        match u.reader.peek() {
            Some(b'[') => {
                u.reader.next();
                to_rvalue(u, &mut val); // base pointer value
                push_rax(u);
                let mut idx = parse_assign(u)?;
                to_rvalue(u, &mut idx);
                skip_ws(u)?;
                expect_byte(u, b']')?;
                u.out.push_str("  shl $3, %rax\n");
                pop_rdi(u);
                u.out.push_str("  add %rdi, %rax\n");
                val = ExprVal::lvalue();
            }
            Some(b'(') => {
                u.reader.next();
                // The callee's address is used exactly as resolved, with no
                // lvalue-to-rvalue conversion: a bare identifier's `lea` already
                // gives the function's entry address (for a local function
                // pointer, write `(*fp)()` — the `*` performs the needed load).
                u.out.push_str("  mov %rax, %r10\n");
                skip_ws(u)?;
                let mut argc = 0usize;
                if u.reader.peek() != Some(b')') {
                    loop {
                        let mut arg = parse_assign(u)?;
                        to_rvalue(u, &mut arg);
                        push_rax(u);
                        argc += 1;
                        if argc > 6 {
                            return Err(CompileError::semantic(u.pos(), "too many arguments (max 6)"));
                        }
                        skip_ws(u)?;
                        if u.reader.peek() == Some(b',') {
                            u.reader.next();
                            skip_ws(u)?;
                        } else {
                            break;
                        }
                    }
                }
                skip_ws(u)?;
                expect_byte(u, b')')?;
                for reg in ARG_REGS.iter().take(argc).rev() {
                    u.out.push_str(&format!("  pop {reg}\n"));
                }
                u.out.push_str("  call *%r10\n");
                val = ExprVal::rvalue();
            }
            Some(b'+') => {
                u.reader.next();
                if u.reader.peek() == Some(b'+') {
                    u.reader.next();
                    if !val.is_lvalue {
                        return Err(CompileError::semantic(u.pos(), "postfix '++' requires an lvalue"));
                    }
                    emit_postfix_step(u, true);
                    val = ExprVal::rvalue();
                } else {
                    u.reader.pushback(b'+');
                    break;
                }
            }
            Some(b'-') => {
                u.reader.next();
                if u.reader.peek() == Some(b'-') {
                    u.reader.next();
                    if !val.is_lvalue {
                        return Err(CompileError::semantic(u.pos(), "postfix '--' requires an lvalue"));
                    }
                    emit_postfix_step(u, false);
                    val = ExprVal::rvalue();
                } else {
                    u.reader.pushback(b'-');
                    break;
                }
            }
            _ => break,
        }
    }
    Ok(val)
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
    fn plain_assignment_emits_store() {
        let mut u = unit_for("a = b");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        u.locals.insert("b".into(), 1, &u.pos()).unwrap();
        let v = parse_assign(&mut u).unwrap();
        assert!(!v.is_lvalue);
        assert!(u.out.contains("mov %rax, (%rcx)"));
    }

    #[test]
    fn equals_assign_is_equality_assignment_not_double_equality() {
        let mut u = unit_for("a === b");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        u.locals.insert("b".into(), 1, &u.pos()).unwrap();
        parse_assign(&mut u).unwrap();
        assert!(u.out.contains("sete %al"));
        assert!(u.out.contains("mov %rax, (%rcx)"));
    }

    #[test]
    fn plain_equality_is_not_consumed_as_assignment() {
        let mut u = unit_for("a == b");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        u.locals.insert("b".into(), 1, &u.pos()).unwrap();
        let v = parse_assign(&mut u).unwrap();
        assert!(!v.is_lvalue);
        assert!(!u.out.contains("mov %rax, (%rcx)"));
        assert!(u.out.contains("sete %al"));
    }

    #[test]
    fn compound_minus_assign_preserves_operand_order() {
        let mut u = unit_for("a =- b");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        u.locals.insert("b".into(), 1, &u.pos()).unwrap();
        parse_assign(&mut u).unwrap();
        // left (a) - right (b): sub %rax,%rdi ; mov %rdi,%rax — never a bare
        // `sub %rdi,%rax`, which would silently compute b - a instead.
        assert!(u.out.contains("sub %rax, %rdi"));
        assert!(!u.out.contains("sub %rdi, %rax"));
    }

    #[test]
    fn subtraction_is_left_minus_right() {
        let mut u = unit_for("a - b");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        u.locals.insert("b".into(), 1, &u.pos()).unwrap();
        parse_assign(&mut u).unwrap();
        assert!(u.out.contains("sub %rax, %rdi"));
        assert!(u.out.contains("mov %rdi, %rax"));
    }

    #[test]
    fn ternary_uses_cond_labels() {
        let mut u = unit_for("a ? 1 : 2");
        u.locals.insert("a".into(), 0, &u.pos()).unwrap();
        parse_assign(&mut u).unwrap();
        assert!(u.out.contains(".L.cond.else.0"));
        assert!(u.out.contains(".L.cond.end.0"));
    }

    #[test]
    fn call_with_too_many_arguments_is_rejected() {
        let mut u = unit_for("f(1,2,3,4,5,6,7)");
        let result = parse_assign(&mut u);
        assert!(result.is_err());
    }

    #[test]
    fn address_of_rvalue_is_rejected() {
        let mut u = unit_for("&1");
        assert!(parse_assign(&mut u).is_err());
    }

    #[test]
    fn indexing_scales_by_word_size() {
        let mut u = unit_for("p[0]");
        u.locals.insert("p".into(), 0, &u.pos()).unwrap();
        let v = parse_assign(&mut u).unwrap();
        assert!(v.is_lvalue);
        assert!(u.out.contains("shl $3, %rax"));
    }

    #[test]
    fn extern_scalar_is_assignable() {
        let mut u = unit_for("x = 5");
        let pos = u.pos();
        u.externs.insert("x".into(), &pos).unwrap();
        let v = parse_assign(&mut u).unwrap();
        assert!(!v.is_lvalue);
        assert!(u.out.contains("lea x(%rip), %rax"));
        assert!(u.out.contains("mov %rax, (%rcx)"));
    }

    #[test]
    fn extern_vector_indexing_dereferences_the_self_pointer_once() {
        let mut u = unit_for("c[0]");
        let pos = u.pos();
        u.externs.insert("c".into(), &pos).unwrap();
        parse_assign(&mut u).unwrap();
        let lea_at = u.out.find("lea c(%rip), %rax").unwrap();
        let deref_at = u.out.find("mov (%rax), %rax").unwrap();
        let shl_at = u.out.find("shl $3, %rax").unwrap();
        assert!(lea_at < deref_at && deref_at < shl_at);
    }

    #[test]
    fn calling_an_extern_function_does_not_redereference_its_address() {
        let mut u = unit_for("putchar(1)");
        let pos = u.pos();
        u.externs.insert("putchar".into(), &pos).unwrap();
        parse_assign(&mut u).unwrap();
        assert!(u.out.contains("lea putchar(%rip), %rax"));
        assert!(!u.out.contains("mov (%rax), %rax"));
        assert!(u.out.contains("call *%r10"));
    }
}
