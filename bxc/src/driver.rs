//! Drives a whole compilation: reads every input file into one shared `Unit`
//! (so declarations in different files still share a string pool and symbol
//! space, and can reference each other's globals), writes the assembly, and
//! shells out to `as`/`ld` for the later stages.

use crate::error::CompileError;
use crate::reader::SourceReader;
use crate::unit::Unit;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStage {
    Assembly,
    Object,
    Executable,
}

pub struct Options {
    pub output: Option<PathBuf>,
    pub emit: EmitStage,
    pub save_temps: bool,
    pub lib_dirs: Vec<PathBuf>,
}

pub fn compile_and_link(inputs: &[PathBuf], opts: &Options) -> Result<(), CompileError> {
    if inputs.is_empty() {
        return Err(CompileError::NoInputFiles);
    }

    let mut unit = Unit::new();
    for path in inputs {
        tracing::debug!(file = %path.display(), "compiling");
        let bytes = std::fs::read(path).map_err(|source| CompileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        unit.set_reader(SourceReader::new(path.display().to_string(), bytes));
        loop {
            crate::lexer::skip_whitespace(&mut unit.reader)?;
            if unit.reader.eof() {
                break;
            }
            crate::decl::compile_declaration(&mut unit)?;
        }
    }

    let mut assembly = String::new();
    assembly.push_str(&unit.out);
    unit.strings.emit(&mut assembly);

    let asm_path = PathBuf::from("a.s");
    write_file(&asm_path, &assembly)?;
    tracing::info!(path = %asm_path.display(), "wrote assembly");

    if opts.emit == EmitStage::Assembly {
        return finalize(&asm_path, opts.output.as_deref());
    }

    let obj_path = PathBuf::from("a.o");
    run_as(&asm_path, &obj_path)?;
    if !opts.save_temps {
        let _ = std::fs::remove_file(&asm_path);
    }

    if opts.emit == EmitStage::Object {
        return finalize(&obj_path, opts.output.as_deref());
    }

    let exe_path = opts.output.clone().unwrap_or_else(|| PathBuf::from("a.out"));
    run_ld(&obj_path, &exe_path, &opts.lib_dirs)?;
    if !opts.save_temps {
        let _ = std::fs::remove_file(&obj_path);
    }
    tracing::info!(path = %exe_path.display(), "wrote executable");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    std::fs::write(path, contents).map_err(|source| CompileError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Moves the produced intermediate to the user-requested `-o` path, if one
/// was given and differs from the default.
fn finalize(produced: &Path, requested: Option<&Path>) -> Result<(), CompileError> {
    if let Some(target) = requested {
        if target != produced {
            std::fs::rename(produced, target).map_err(|source| CompileError::Write {
                path: target.display().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

fn run_as(asm: &Path, obj: &Path) -> Result<(), CompileError> {
    tracing::debug!(?asm, ?obj, "invoking as");
    let status = Command::new("as")
        .arg(asm)
        .arg("-o")
        .arg(obj)
        .status()
        .map_err(|source| CompileError::Spawn { program: "as", source })?;
    if !status.success() {
        return Err(CompileError::Subprocess { program: "as", status });
    }
    Ok(())
}

fn run_ld(obj: &Path, exe: &Path, lib_dirs: &[PathBuf]) -> Result<(), CompileError> {
    tracing::debug!(?obj, ?exe, "invoking ld");
    let mut cmd = Command::new("ld");
    cmd.arg(obj).arg("-o").arg(exe);
    for dir in lib_dirs {
        cmd.arg("-L").arg(dir);
    }
    cmd.arg("-lb");
    let status = cmd.status().map_err(|source| CompileError::Spawn { program: "ld", source })?;
    if !status.success() {
        return Err(CompileError::Subprocess { program: "ld", status });
    }
    Ok(())
}
