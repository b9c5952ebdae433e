//! Compiler configuration for the external assembler/linker step.
//!
//! BPL's own four analysis phases need no configuration — this module
//! exists entirely for the boundary spec.md §6 calls "out of scope": driving
//! the C toolchain that turns the emitted `.s` file into an executable.

use std::path::PathBuf;

/// Configuration for invoking the external C toolchain.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// The `cc`-compatible driver to invoke (e.g. `"cc"`, `"gcc"`, `"clang"`).
    pub cc: String,

    /// Extra flags passed to `cc` before the assembly file, e.g. `-O2` or
    /// `-static`. spec.md §6 only specifies `-g`, which is always passed
    /// regardless of this list.
    pub extra_flags: Vec<String>,

    /// Additional library search paths (`-L`).
    pub library_paths: Vec<PathBuf>,

    /// Additional libraries to link (`-l`).
    pub libraries: Vec<String>,

    /// Keep the emitted `.s` file after a successful build. Defaults to
    /// `true`, since spec.md §6 describes it as written "alongside the
    /// source", not as a temporary.
    pub keep_assembly: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            cc: "cc".to_string(),
            extra_flags: Vec::new(),
            library_paths: Vec::new(),
            libraries: Vec::new(),
            keep_assembly: true,
        }
    }
}

impl CompilerConfig {
    /// Create a new configuration with the defaults: `cc`, no extra flags,
    /// no extra libraries, and the `.s` file kept.
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    /// Override the `cc`-compatible driver binary (builder pattern).
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = cc.into();
        self
    }

    /// Add an extra flag passed through to the toolchain invocation.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.push(flag.into());
        self
    }

    /// Add a library search path.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    /// Add a library to link.
    pub fn with_library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    /// Don't keep the `.s` file once the toolchain has consumed it.
    pub fn without_assembly(mut self) -> Self {
        self.keep_assembly = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_cc_and_keeps_assembly() {
        let config = CompilerConfig::new();
        assert_eq!(config.cc, "cc");
        assert!(config.keep_assembly);
        assert!(config.extra_flags.is_empty());
    }

    #[test]
    fn builder_accumulates_flags_and_libraries() {
        let config = CompilerConfig::new()
            .with_cc("gcc")
            .with_flag("-O2")
            .with_library_path("/opt/lib")
            .with_library("m")
            .without_assembly();

        assert_eq!(config.cc, "gcc");
        assert_eq!(config.extra_flags, vec!["-O2"]);
        assert_eq!(config.library_paths, vec![PathBuf::from("/opt/lib")]);
        assert_eq!(config.libraries, vec!["m"]);
        assert!(!config.keep_assembly);
    }
}
