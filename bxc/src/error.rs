//! Diagnostics.
//!
//! Every diagnostic is fatal: the compiler reports the first one it hits and stops.
//! There is no recovery and no multi-error reporting (see the taxonomy in the design
//! notes — lexical, syntactic, semantic, I/O).

use crate::pos::SourcePos;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{pos}: error: {message}")]
    Lexical { pos: SourcePos, message: String },

    #[error("{pos}: error: {message}")]
    Syntax { pos: SourcePos, message: String },

    #[error("{pos}: error: {message}")]
    Semantic { pos: SourcePos, message: String },

    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Subprocess {
        program: &'static str,
        status: ExitStatus,
    },

    #[error("no input files")]
    NoInputFiles,
}

impl CompileError {
    pub fn lexical(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Lexical { pos, message: message.into() }
    }

    pub fn syntax(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Syntax { pos, message: message.into() }
    }

    pub fn semantic(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Semantic { pos, message: message.into() }
    }
}
