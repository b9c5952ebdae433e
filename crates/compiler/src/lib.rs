//! The BPL compiler: lexer, parser, resolver, type checker, offset
//! assigner, and code emitter, wired together with an external-toolchain
//! invocation that turns emitted assembly into an executable.
//!
//! spec.md §1 draws the line at "assembly text written to path.s"; this
//! crate's own pipeline stops there, and [`compile_file`] is the thin
//! driver around it that also shells out to `cc`.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod lexer;
pub mod offsets;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod typechecker;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

pub use config::CompilerConfig;
pub use error::CompileError;

/// Runs the full front end (lex → parse → resolve → typecheck → assign
/// offsets) and returns the emitted assembly text, without touching the
/// filesystem beyond reading `source_path`.
pub fn compile_to_assembly(source_path: &Path) -> Result<String, CompileError> {
    let source = fs::read_to_string(source_path)?;

    debug!(file = %source_path.display(), "lexing");
    let tokens = lexer::Lexer::lex(&source, source_path)?;

    debug!(file = %source_path.display(), tokens = tokens.len(), "parsing");
    let mut program = parser::Parser::new(tokens, source_path).parse()?;

    debug!(file = %source_path.display(), "resolving names");
    resolver::resolve(&mut program, source_path)?;

    debug!(file = %source_path.display(), "type checking");
    typechecker::check(&mut program, source_path)?;

    debug!(file = %source_path.display(), "assigning stack frame offsets");
    offsets::assign(&mut program);

    debug!(file = %source_path.display(), "emitting assembly");
    codegen::emit(&program, source_path)
}

/// Compiles `source_path` to an executable, per spec.md §6: write
/// `<base>.s`, then `cc -g <base>.s -o <base>`. Returns the executable path.
pub fn compile_file(source_path: &Path, config: &CompilerConfig) -> Result<PathBuf, CompileError> {
    let assembly = compile_to_assembly(source_path)?;

    let asm_path = source_path.with_extension("s");
    fs::write(&asm_path, assembly)?;
    info!(path = %asm_path.display(), "wrote assembly");

    let output_path = source_path.with_extension("");
    let result = run_toolchain(&asm_path, &output_path, config);

    if !config.keep_assembly {
        let _ = fs::remove_file(&asm_path);
    }

    result?;
    Ok(output_path)
}

fn run_toolchain(
    asm_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let mut cc = Command::new(&config.cc);
    cc.arg("-g").arg(asm_path).arg("-o").arg(output_path);
    for flag in &config.extra_flags {
        cc.arg(flag);
    }
    for path in &config.library_paths {
        cc.arg("-L").arg(path);
    }
    for lib in &config.libraries {
        cc.arg(format!("-l{lib}"));
    }

    info!(cc = %config.cc, output = %output_path.display(), "invoking toolchain");
    let status = cc
        .status()
        .map_err(|e| CompileError::Toolchain(format!("failed to run '{}': {}", config.cc, e)))?;

    if !status.success() {
        return Err(CompileError::Toolchain(format!(
            "'{}' exited with {}",
            config.cc, status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn compile_to_assembly_succeeds_on_a_trivial_program() {
        let mut file = tempfile::Builder::new().suffix(".bpl").tempfile().unwrap();
        write!(file, "int main(void) {{ return 0; }}").unwrap();
        let asm = compile_to_assembly(file.path()).unwrap();
        assert!(asm.contains(".globl main"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn compile_to_assembly_surfaces_type_errors() {
        let mut file = tempfile::Builder::new().suffix(".bpl").tempfile().unwrap();
        write!(file, "int main(void) {{ int x; string s; x = s; return 0; }}").unwrap();
        let err = compile_to_assembly(file.path()).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn compile_to_assembly_surfaces_parse_errors() {
        let mut file = tempfile::Builder::new().suffix(".bpl").tempfile().unwrap();
        write!(file, "int main(void) {{ return 0 }}").unwrap();
        let err = compile_to_assembly(file.path()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn run_toolchain_reports_a_missing_cc_as_a_toolchain_error() {
        let dir = tempfile::tempdir().unwrap();
        let asm_path = dir.path().join("t.s");
        fs::write(&asm_path, ".text\n").unwrap();
        let output_path = dir.path().join("t");
        let config = CompilerConfig::new().with_cc("definitely-not-a-real-compiler");
        let err = run_toolchain(&asm_path, &output_path, &config).unwrap_err();
        assert!(matches!(err, CompileError::Toolchain(_)));
    }
}
