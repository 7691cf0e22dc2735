//! `bxc` — command-line entry point.
//!
//! Thin wrapper: parse arguments, build a [`bxc::Options`], and hand off to
//! [`bxc::compile_and_link`]. All of the actual work lives in the library.

use bxc::{compile_and_link, EmitStage, Options};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();

    let matches = Command::new("bxc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiler for the B programming language, targeting x86-64 GNU assembly")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .required(true)
                .num_args(1..)
                .help("B source files to compile"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .value_name("FILE")
                .help("Write output to FILE"),
        )
        .arg(
            Arg::new("assembly")
                .short('S')
                .action(ArgAction::SetTrue)
                .help("Stop after emitting assembly"),
        )
        .arg(
            Arg::new("compile")
                .short('c')
                .action(ArgAction::SetTrue)
                .help("Stop after emitting an object file"),
        )
        .arg(
            Arg::new("save-temps")
                .long("save-temps")
                .action(ArgAction::SetTrue)
                .help("Keep intermediate assembly/object files"),
        )
        .arg(
            Arg::new("lib-dir")
                .short('L')
                .value_name("DIR")
                .action(ArgAction::Append)
                .help("Add DIR to the library search path"),
        )
        .get_matches();

    let files: Vec<PathBuf> = matches
        .get_many::<String>("files")
        .unwrap_or_default()
        .map(PathBuf::from)
        .collect();

    let emit = if matches.get_flag("assembly") {
        EmitStage::Assembly
    } else if matches.get_flag("compile") {
        EmitStage::Object
    } else {
        EmitStage::Executable
    };

    let opts = Options {
        output: matches.get_one::<String>("output").map(PathBuf::from),
        emit,
        save_temps: matches.get_flag("save-temps"),
        lib_dirs: matches
            .get_many::<String>("lib-dir")
            .unwrap_or_default()
            .map(PathBuf::from)
            .collect(),
    };

    if let Err(e) = compile_and_link(&files, &opts) {
        eprintln!("bxc: {e}");
        process::exit(1);
    }
}
