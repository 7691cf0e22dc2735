//! Per-function local- and extern-name tables.
//!
//! Both tables are cleared at the start of every function (see `Unit::enter_function`);
//! neither is scoped further than that — B has one flat per-function namespace, so a
//! name declared in a nested block still collides with one declared in a sibling block.

use crate::error::CompileError;
use crate::pos::SourcePos;

pub struct Locals {
    entries: Vec<(String, usize)>,
}

impl Locals {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, name: String, slot: usize, pos: &SourcePos) -> Result<(), CompileError> {
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(CompileError::semantic(
                pos.clone(),
                format!("duplicate local '{name}'"),
            ));
        }
        self.entries.push((name, slot));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct Externs {
    names: Vec<String>,
}

impl Externs {
    pub fn new() -> Self {
        Self { names: Vec::new() }
    }

    pub fn insert(&mut self, name: String, pos: &SourcePos) -> Result<(), CompileError> {
        if self.names.iter().any(|n| *n == name) {
            return Err(CompileError::semantic(
                pos.clone(),
                format!("duplicate extern '{name}'"),
            ));
        }
        self.names.push(name);
        Ok(())
    }

    /// Records an implicit extern (an undefined call-site identifier) without
    /// erroring if it is already present — repeated calls to the same
    /// undeclared function are legal.
    pub fn insert_implicit(&mut self, name: String) {
        if !self.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn pos() -> SourcePos {
        SourcePos { file: Rc::from("<test>"), line: 1 }
    }

    #[test]
    fn locals_resolve_and_reject_duplicates() {
        let mut locals = Locals::new();
        locals.insert("x".into(), 0, &pos()).unwrap();
        locals.insert("y".into(), 1, &pos()).unwrap();
        assert_eq!(locals.get("x"), Some(0));
        assert_eq!(locals.get("y"), Some(1));
        assert_eq!(locals.get("z"), None);
        assert!(locals.insert("x".into(), 2, &pos()).is_err());
    }

    #[test]
    fn locals_clear_forgets_everything() {
        let mut locals = Locals::new();
        locals.insert("x".into(), 0, &pos()).unwrap();
        locals.clear();
        assert_eq!(locals.get("x"), None);
    }

    #[test]
    fn externs_reject_explicit_duplicates_but_not_implicit_repeats() {
        let mut externs = Externs::new();
        externs.insert("f".into(), &pos()).unwrap();
        assert!(externs.insert("f".into(), &pos()).is_err());
        externs.insert_implicit("g".into());
        externs.insert_implicit("g".into()); // must not panic or error
        assert!(externs.contains("f"));
        assert!(externs.contains("g"));
    }
}
