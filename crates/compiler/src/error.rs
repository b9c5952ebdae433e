//! Compiler diagnostics
//!
//! A single tagged error type threaded through every phase of the pipeline,
//! in place of the ad-hoc strings the phase names in the original BPL
//! implementation raised. Each variant carries enough context to reproduce
//! the original `file:line: message` diagnostics.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{}:{line}:{col}: {message}", .file.display())]
    Lex {
        file: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },

    #[error("{}:{line}: {message}", .file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}:{line}: {message}", .file.display())]
    Resolve {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}:{line}: {message}", .file.display())]
    Type {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{0}")]
    Io(String),

    #[error("toolchain invocation failed: {0}")]
    Toolchain(String),
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_renders_file_line_col() {
        let err = CompileError::Lex {
            file: PathBuf::from("a.bpl"),
            line: 3,
            col: 5,
            message: "unknown character '@'".to_string(),
        };
        assert_eq!(err.to_string(), "a.bpl:3:5: unknown character '@'");
    }

    #[test]
    fn type_error_renders_file_line() {
        let err = CompileError::Type {
            file: PathBuf::from("a.bpl"),
            line: 10,
            message: "type mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "a.bpl:10: type mismatch");
    }
}
