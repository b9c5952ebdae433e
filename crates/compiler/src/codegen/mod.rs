//! AT&T-syntax x86-64 code emission.
//!
//! Every expression leaves its value in `%rax`. `%rbx` is the scratch
//! register for the non-accumulator operand of binary arithmetic and
//! comparisons, `%rdx` additionally gets clobbered by `idiv`, and `%r12`
//! holds an l-value's target address during assignment. The calling
//! convention is deliberately not full System V: the caller pushes the old
//! `%rbp` itself (see [`emit_call`](expressions) and the doc comment on
//! [`emit_function`]); only `printf`/`scanf` calls follow the real C ABI.

mod expressions;
mod statements;

use std::path::{Path, PathBuf};

use crate::ast::{Decl, DeclId, FunDecl, Program};
use crate::error::CompileError;

/// Per-function context threaded through statement/expression emission:
/// just the label `return`/`Ret` jumps to, since nothing else about the
/// enclosing function is needed below the top of `emit_function`.
struct FunCtx {
    return_label: String,
}

pub struct CodeGen {
    text: String,
    label_counter: usize,
    string_literals: Vec<(String, String)>,
    string_labels: std::collections::HashMap<String, String>,
    fmt_int: String,
    fmt_nl: String,
    fmt_str: String,
    fmt_read: String,
    #[allow(dead_code)] // declared per the file-layout contract; never jumped to
    fmt_oob: String,
}

impl CodeGen {
    fn new() -> Self {
        let mut cg = CodeGen {
            text: String::new(),
            label_counter: 0,
            string_literals: Vec::new(),
            string_labels: std::collections::HashMap::new(),
            fmt_int: String::new(),
            fmt_nl: String::new(),
            fmt_str: String::new(),
            fmt_read: String::new(),
            fmt_oob: String::new(),
        };
        cg.fmt_int = cg.intern("%lld ");
        cg.fmt_nl = cg.intern("\n");
        cg.fmt_str = cg.intern("%s ");
        cg.fmt_oob = cg.intern("You fell off the end of an array.\n");
        cg.fmt_read = cg.intern("%d");
        cg
    }

    /// Registers a string literal (deduping identical content) and returns
    /// its `.rodata` label.
    fn intern(&mut self, content: &str) -> String {
        if let Some(label) = self.string_labels.get(content) {
            return label.clone();
        }
        let label = format!(".S{}", self.string_literals.len());
        self.string_literals.push((label.clone(), content.to_string()));
        self.string_labels.insert(content.to_string(), label.clone());
        label
    }

    fn fresh_label(&mut self) -> String {
        let label = format!(".L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn ins0(&mut self, instr: &str) {
        self.text.push('\t');
        self.text.push_str(instr);
        self.text.push('\n');
    }

    fn ins(&mut self, mnemonic: &str, operands: &str) {
        self.text.push('\t');
        self.text.push_str(mnemonic);
        self.text.push(' ');
        self.text.push_str(operands);
        self.text.push('\n');
    }

    fn label(&mut self, name: &str) {
        self.text.push_str(name);
        self.text.push_str(":\n");
    }

    /// Prologue/epilogue per the stack-only calling convention: the caller
    /// (see `emit_call` in `expressions.rs`) pushes `%rbp` itself before
    /// `call`, so the callee's own prologue is just frame-pointer setup and
    /// a stack reservation, with no `push %rbp` of its own.
    fn emit_function(&mut self, program: &Program, fun: &FunDecl) {
        self.label(&fun.name);
        self.ins("mov", "%rsp, %rbp");
        self.ins("sub", &format!("${}, %rsp", fun.locals_size));

        let ctx = FunCtx {
            return_label: fun.return_label.clone(),
        };
        self.emit_comp_stmt(program, &fun.body, &ctx);

        self.label(&fun.return_label);
        self.ins("add", &format!("${}, %rsp", fun.locals_size));
        self.ins0("ret");
    }
}

/// Emits a full assembly file for `program`: globals, then `.rodata`
/// string literals, then one labeled block per function.
pub fn emit(program: &Program, file: impl AsRef<Path>) -> Result<String, CompileError> {
    let _file: PathBuf = file.as_ref().to_path_buf();
    let mut cg = CodeGen::new();

    for &id in &program.top_level {
        if let Decl::Fun(f) = &program.decls[id] {
            cg.emit_function(program, f);
        }
    }

    let mut out = String::new();
    for &id in &program.top_level {
        emit_global(&mut out, &program.decls[id], id);
    }
    out.push_str(".section .rodata\n");
    for (label, content) in &cg.string_literals {
        out.push_str(label);
        out.push_str(":\n\t.string \"");
        out.push_str(&escape_for_asm(content));
        out.push_str("\"\n");
    }
    out.push_str(".text\n.globl main\n");
    out.push_str(&cg.text);
    Ok(out)
}

fn emit_global(out: &mut String, decl: &Decl, _id: DeclId) {
    match decl {
        Decl::Var(v) if v.is_global => {
            out.push_str(&format!(".comm {}, 8, 64\n", v.name));
        }
        Decl::Arr(a) if a.is_global => {
            let bytes = 8 * a.size.unwrap_or(1);
            out.push_str(&format!(".comm {}, {}, 64\n", a.name, bytes));
        }
        _ => {}
    }
}

fn escape_for_asm(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
