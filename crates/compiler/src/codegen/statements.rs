//! Statement emission: control flow scaffolding and the four non-expression
//! statement forms (`if`, `while`, `return`, `write`/`writeln`).
//!
//! Every statement gets a `# bpl:<line>` comment ahead of its first
//! instruction, the ambient stand-in for the line-number comments spec.md
//! §6 expects (we emit them as a leading standalone line rather than
//! column-32-aligned trailing comments, which is simpler and just as
//! readable for the C toolchain's purposes).

use crate::ast::{BplType, CompStmt, Program, Stmt, StmtKind};

use super::{CodeGen, FunCtx};

impl CodeGen {
    pub(super) fn emit_comp_stmt(&mut self, program: &Program, comp: &CompStmt, ctx: &FunCtx) {
        for stmt in &comp.stmts {
            self.emit_stmt(program, stmt, ctx);
        }
    }

    fn line_comment(&mut self, line: usize) {
        self.text.push_str(&format!("\t# bpl:{}\n", line));
    }

    fn emit_stmt(&mut self, program: &Program, stmt: &Stmt, ctx: &FunCtx) {
        self.line_comment(stmt.line);
        match &stmt.kind {
            StmtKind::Comp(comp) => self.emit_comp_stmt(program, comp, ctx),
            StmtKind::Expr(e) => {
                self.emit_expr(program, e);
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => self.emit_if(program, cond, then_body, else_body.as_deref(), ctx),
            StmtKind::While { cond, body } => self.emit_while(program, cond, body, ctx),
            StmtKind::Ret(value) => {
                if let Some(v) = value {
                    self.emit_expr(program, v);
                }
                self.ins("jmp", &ctx.return_label);
            }
            StmtKind::Write(e) => self.emit_write(program, e),
            StmtKind::Writeln => self.emit_writeln(),
        }
    }

    /// `if (c) T else F`: evaluate `c`, jump to the then-branch when
    /// nonzero, otherwise fall through into the (possibly absent)
    /// else-branch.
    fn emit_if(
        &mut self,
        program: &Program,
        cond: &crate::ast::Expr,
        then_body: &Stmt,
        else_body: Option<&Stmt>,
        ctx: &FunCtx,
    ) {
        self.emit_expr(program, cond);
        self.ins("cmp", "$0, %rax");
        let ltrue = self.fresh_label();
        let lend = self.fresh_label();
        self.ins("jne", &ltrue);
        if let Some(else_body) = else_body {
            self.emit_stmt(program, else_body, ctx);
        }
        self.ins("jmp", &lend);
        self.label(&ltrue);
        self.emit_stmt(program, then_body, ctx);
        self.label(&lend);
    }

    /// `while (c) B`: re-evaluate `c` each iteration, exiting as soon as it
    /// is zero.
    fn emit_while(&mut self, program: &Program, cond: &crate::ast::Expr, body: &Stmt, ctx: &FunCtx) {
        let lcond = self.fresh_label();
        let lend = self.fresh_label();
        self.label(&lcond);
        self.emit_expr(program, cond);
        self.ins("cmp", "$0, %rax");
        self.ins("je", &lend);
        self.emit_stmt(program, body, ctx);
        self.ins("jmp", &lcond);
        self.label(&lend);
    }

    fn emit_write(&mut self, program: &Program, e: &crate::ast::Expr) {
        let ty = e.ty.expect("type checker must annotate every expression before codegen");
        self.emit_expr(program, e);
        let fmt_label = match ty {
            BplType::Int => self.fmt_int.clone(),
            BplType::Str => self.fmt_str.clone(),
            other => unreachable!("write() of non-writeable type {other} should have been rejected by the type checker"),
        };
        self.ins("mov", "%rax, %rsi");
        self.ins("lea", &format!("{fmt_label}(%rip), %rdi"));
        self.ins("mov", "$0, %al");
        self.ins("call", "printf");
    }

    fn emit_writeln(&mut self) {
        let fmt_label = self.fmt_nl.clone();
        self.ins("lea", &format!("{fmt_label}(%rip), %rdi"));
        self.ins("mov", "$0, %al");
        self.ins("call", "printf");
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::offsets;
    use crate::parser::Parser;
    use crate::resolver;
    use crate::typechecker;

    fn compile(src: &str) -> String {
        let tokens = Lexer::lex(src, "t.bpl").unwrap();
        let mut program = Parser::new(tokens, "t.bpl").parse().unwrap();
        resolver::resolve(&mut program, "t.bpl").unwrap();
        typechecker::check(&mut program, "t.bpl").unwrap();
        offsets::assign(&mut program);
        super::super::emit(&program, "t.bpl").unwrap()
    }

    #[test]
    fn if_else_emits_two_branch_labels_and_a_join() {
        let asm = compile("int main(void) { if (1) { write(1); } else { write(2); } writeln(); return 0; }");
        assert!(asm.contains("jne .L"));
        assert!(asm.contains("jmp .L"));
    }

    #[test]
    fn while_loop_rechecks_condition_each_iteration() {
        let asm = compile("int main(void) { int i; i = 0; while (i < 3) { i = i + 1; } return 0; }");
        assert!(asm.contains("je .L"));
        assert!(asm.contains("jmp .L"));
    }

    #[test]
    fn return_jumps_to_the_function_return_label() {
        let asm = compile("int main(void) { return 0; }");
        assert!(asm.contains("jmp .main_ret"));
    }

    #[test]
    fn write_int_uses_lld_format_and_write_string_uses_s_format() {
        let asm = compile("int main(void) { write(1); write(\"hi\"); writeln(); return 0; }");
        assert!(asm.matches("call printf").count() >= 3);
    }

    #[test]
    fn every_statement_gets_a_line_comment() {
        let asm = compile("int main(void) { return 0; }");
        assert!(asm.contains("# bpl:"));
    }
}
