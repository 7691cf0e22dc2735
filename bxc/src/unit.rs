//! The translation-unit-wide compilation context.
//!
//! One `Unit` is created per invocation and threaded through every compilation
//! routine (expression, statement, and declaration compilers alike). It owns the
//! in-memory output buffer, the string pool, the label-id counters, the current
//! function's locals/externs, and the reader for whichever file is presently
//! being compiled.

use crate::error::CompileError;
use crate::pos::SourcePos;
use crate::reader::SourceReader;
use crate::strings::StringPool;
use crate::symtab::{Externs, Locals};

pub const WORD: usize = 8;

/// Address of local stack slot `slot`, biased by `+2` (the saved `%rbp` plus the
/// reserved first prologue word) — see the design notes on why this bias must
/// stay in lock-step between reservation and lookup.
pub fn slot_addr(slot: usize) -> String {
    format!("-{}(%rbp)", (slot + 2) * WORD)
}

pub struct SwitchFrame {
    pub id: u64,
    pub cases: Vec<i64>,
}

pub struct Unit {
    pub out: String,
    pub strings: StringPool,
    pub locals: Locals,
    pub externs: Externs,
    pub stack_offset: usize,
    /// High-water mark of `stack_offset` over the current function. Blocks
    /// rewind `stack_offset` on exit, so this is the only record of how much
    /// space the prologue must actually reserve.
    pub max_offset: usize,
    pub current_fn: String,
    pub switch_stack: Vec<SwitchFrame>,
    pub reader: SourceReader,
    stmt_id: u64,
    cond_id: u64,
}

impl Unit {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            strings: StringPool::new(),
            locals: Locals::new(),
            externs: Externs::new(),
            stack_offset: 0,
            max_offset: 0,
            current_fn: String::new(),
            switch_stack: Vec::new(),
            reader: SourceReader::new("<init>", Vec::new()),
            stmt_id: 0,
            cond_id: 0,
        }
    }

    pub fn set_reader(&mut self, reader: SourceReader) {
        self.reader = reader;
    }

    pub fn pos(&self) -> SourcePos {
        self.reader.pos()
    }

    pub fn next_stmt_id(&mut self) -> u64 {
        let id = self.stmt_id;
        self.stmt_id += 1;
        id
    }

    pub fn next_cond_id(&mut self) -> u64 {
        let id = self.cond_id;
        self.cond_id += 1;
        id
    }

    pub fn enter_function(&mut self, name: &str) {
        self.locals.clear();
        self.externs.clear();
        self.stack_offset = 0;
        self.max_offset = 0;
        self.current_fn = name.to_string();
        // A function implicitly sees its own name, so recursive calls resolve.
        self.externs.insert_implicit(name.to_string());
    }

    /// Reserves `count` consecutive local slots and records the high-water
    /// mark. Returns the first reserved slot.
    pub fn reserve_slots(&mut self, count: usize) -> usize {
        let first = self.stack_offset;
        self.stack_offset += count;
        if self.stack_offset > self.max_offset {
            self.max_offset = self.stack_offset;
        }
        first
    }

    /// Resolves an identifier to its storage, emitting the address-producing
    /// instruction (`lea ...,%rax`). `is_call_site` marks whether the
    /// identifier is immediately followed by `(`, which lets an otherwise
    /// undefined name be treated as an implicit extern.
    ///
    /// Always an lvalue, local or extern alike: the `lea` produces the
    /// address of the identifier's storage, never the value itself, so both
    /// cases need the usual lvalue-to-rvalue `mov (%rax), %rax` before use.
    /// A function call is the one exception to that rule (see
    /// `parse_postfix`'s `(` handling), since the raw address is already the
    /// callable entry point.
    pub fn emit_identifier(&mut self, name: &str, is_call_site: bool) -> Result<bool, CompileError> {
        if let Some(slot) = self.locals.get(name) {
            self.out.push_str(&format!("  lea {}, %rax\n", slot_addr(slot)));
            return Ok(true);
        }
        if self.externs.contains(name) {
            self.out.push_str(&format!("  lea {name}(%rip), %rax\n"));
            return Ok(true);
        }
        if is_call_site {
            self.externs.insert_implicit(name.to_string());
            self.out.push_str(&format!("  lea {name}(%rip), %rax\n"));
            return Ok(true);
        }
        Err(CompileError::semantic(
            self.pos(),
            format!("undefined identifier '{name}'"),
        ))
    }

    pub fn convert_to_rvalue(&mut self) {
        self.out.push_str("  mov (%rax), %rax\n");
    }

    pub fn emit_int_literal(&mut self, value: i64) {
        if value == 0 {
            self.out.push_str("  xor %rax, %rax\n");
        } else {
            self.out.push_str(&format!("  mov ${value}, %rax\n"));
        }
    }
}
