//! Source positions used for diagnostics.

use std::rc::Rc;

/// A `{file, line}` pair. Cheap to clone: the file name is reference-counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: Rc<str>,
    pub line: u32,
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
