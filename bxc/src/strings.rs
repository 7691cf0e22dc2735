//! The per-translation-unit string pool. Entries are indexed from 0 and the
//! index is stable for the lifetime of the compilation; it is used both as the
//! symbolic reference inside compiled code (`.string.N(%rip)`) and as the ival
//! form for a string initializer (`.quad .string.N`).

pub struct StringPool {
    entries: Vec<Vec<u8>>,
}

impl StringPool {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, bytes: Vec<u8>) -> usize {
        self.entries.push(bytes);
        self.entries.len() - 1
    }

    pub fn label(index: usize) -> String {
        format!(".string.{index}")
    }

    /// Emits every pooled string into `.rodata` as `label: .byte ... .byte 0`.
    pub fn emit(&self, out: &mut String) {
        if self.entries.is_empty() {
            return;
        }
        out.push_str(".section .rodata\n");
        for (i, bytes) in self.entries.iter().enumerate() {
            out.push_str(&format!("{}:\n", Self::label(i)));
            for b in bytes {
                out.push_str(&format!("  .byte {b}\n"));
            }
            out.push_str("  .byte 0\n");
        }
    }
}
