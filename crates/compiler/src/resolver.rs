//! Name resolution: binds every identifying expression to its declaration.
//!
//! Scoping model is a stack of frames, one `HashMap<name, DeclId>` each.
//! A function call pushes exactly one frame shared by its parameters and
//! its own top-level body — the function body's own compound statement
//! does not get a second frame — while every other nested compound
//! statement pushes its own. Function names resolve only against the
//! bottom (global) frame; variables search the whole stack top-down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{CompStmt, Decl, DeclArena, DeclId, Expr, ExprKind, Program, Stmt, StmtKind};
use crate::error::CompileError;

pub struct Resolver<'a> {
    decls: &'a mut DeclArena,
    scopes: Vec<HashMap<String, DeclId>>,
    file: PathBuf,
}

pub fn resolve(program: &mut Program, file: impl AsRef<Path>) -> Result<(), CompileError> {
    let mut resolver = Resolver {
        decls: &mut program.decls,
        scopes: Vec::new(),
        file: file.as_ref().to_path_buf(),
    };
    resolver.run(&program.top_level)
}

impl<'a> Resolver<'a> {
    fn err(&self, line: usize, message: impl Into<String>) -> CompileError {
        CompileError::Resolve {
            file: self.file.clone(),
            line,
            message: message.into(),
        }
    }

    fn run(&mut self, top_level: &[DeclId]) -> Result<(), CompileError> {
        self.scopes.push(HashMap::new());
        for &id in top_level {
            self.declare_global(id)?;
        }
        for &id in top_level {
            if matches!(self.decls[id], Decl::Fun(_)) {
                self.resolve_function(id)?;
            }
        }
        self.scopes.pop();
        Ok(())
    }

    fn declare_global(&mut self, id: DeclId) -> Result<(), CompileError> {
        self.check_array_size(id)?;
        self.decls[id].set_is_global(true);
        self.insert_into_current_frame(id)
    }

    fn resolve_function(&mut self, id: DeclId) -> Result<(), CompileError> {
        let params = match &self.decls[id] {
            Decl::Fun(f) => f.params.clone(),
            _ => unreachable!("resolve_function called on a non-function declaration"),
        };
        // Body doesn't borrow the arena (its local_decs are plain DeclId
        // copies), so it can be swapped out while we still need &mut
        // self.decls for the params below and the recursive walk.
        let empty = CompStmt {
            local_decs: Vec::new(),
            stmts: Vec::new(),
        };
        let mut body = match &mut self.decls[id] {
            Decl::Fun(f) => std::mem::replace(&mut f.body, empty),
            _ => unreachable!(),
        };

        self.scopes.push(HashMap::new());
        for &param in &params {
            self.decls[param].set_is_global(false);
            self.check_array_size(param)?;
            self.insert_into_current_frame(param)?;
        }
        // The function's own compound statement shares this frame rather
        // than pushing a new one.
        let result = (|| {
            self.resolve_comp_stmt_locals(&mut body)?;
            self.resolve_stmts(&mut body.stmts)
        })();
        self.scopes.pop();

        if let Decl::Fun(f) = &mut self.decls[id] {
            f.body = body;
        }
        result
    }

    fn insert_into_current_frame(&mut self, id: DeclId) -> Result<(), CompileError> {
        let name = self.decls[id].name().to_string();
        let line = self.decls[id].line();
        let frame = self.scopes.last_mut().expect("at least one scope active");
        if frame.contains_key(&name) {
            return Err(self.err(line, format!("'{}' is already declared in this scope", name)));
        }
        frame.insert(name, id);
        Ok(())
    }

    fn check_array_size(&self, id: DeclId) -> Result<(), CompileError> {
        if let Decl::Arr(a) = &self.decls[id] {
            if let Some(size) = a.size {
                if size < 1 {
                    return Err(self.err(
                        a.line,
                        format!("array '{}' must have size at least 1", a.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Declares the locals of a compound statement into the current frame
    /// without pushing a new one (used for the function-body special case).
    fn resolve_comp_stmt_locals(&mut self, comp: &mut CompStmt) -> Result<(), CompileError> {
        for &id in &comp.local_decs {
            self.decls[id].set_is_global(false);
            self.check_array_size(id)?;
            self.insert_into_current_frame(id)?;
        }
        Ok(())
    }

    fn resolve_comp_stmt(&mut self, comp: &mut CompStmt) -> Result<(), CompileError> {
        self.scopes.push(HashMap::new());
        let result = (|| {
            self.resolve_comp_stmt_locals(comp)?;
            self.resolve_stmts(&mut comp.stmts)
        })();
        self.scopes.pop();
        result
    }

    fn resolve_stmts(&mut self, stmts: &mut [Stmt]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        match &mut stmt.kind {
            StmtKind::Comp(comp) => self.resolve_comp_stmt(comp)?,
            StmtKind::Expr(e) => self.resolve_expr(e)?,
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(then_body)?;
                if let Some(else_body) = else_body {
                    self.resolve_stmt(else_body)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(body)?;
            }
            StmtKind::Ret(Some(e)) => self.resolve_expr(e)?,
            StmtKind::Ret(None) => {}
            StmtKind::Write(e) => self.resolve_expr(e)?,
            StmtKind::Writeln => {}
        }
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<(), CompileError> {
        match &mut expr.kind {
            ExprKind::IntLit(_) | ExprKind::StrLit(_) | ExprKind::Read => {}
            ExprKind::Var { name, dec } => {
                *dec = Some(self.lookup_var(name, expr.line)?);
            }
            ExprKind::Arr { name, index, dec } => {
                self.resolve_expr(index)?;
                *dec = Some(self.lookup_var(name, expr.line)?);
            }
            ExprKind::Addr(inner) | ExprKind::Deref(inner) | ExprKind::Neg(inner) => {
                self.resolve_expr(inner)?;
            }
            ExprKind::Call { name, args, dec } => {
                for arg in args.iter_mut() {
                    self.resolve_expr(arg)?;
                }
                *dec = Some(self.lookup_fun(name, expr.line)?);
            }
            ExprKind::Assign { lhs, rhs } => {
                self.resolve_expr(lhs)?;
                self.resolve_expr(rhs)?;
            }
            ExprKind::Arith { lhs, rhs, .. } | ExprKind::Comp { lhs, rhs, .. } => {
                self.resolve_expr(lhs)?;
                self.resolve_expr(rhs)?;
            }
        }
        Ok(())
    }

    fn lookup_var(&self, name: &str, line: usize) -> Result<DeclId, CompileError> {
        for frame in self.scopes.iter().rev() {
            if let Some(&id) = frame.get(name) {
                return Ok(id);
            }
        }
        Err(self.err(line, format!("'{}' is undefined", name)))
    }

    fn lookup_fun(&self, name: &str, line: usize) -> Result<DeclId, CompileError> {
        let global = &self.scopes[0];
        match global.get(name) {
            Some(&id) if matches!(self.decls[id], Decl::Fun(_)) => Ok(id),
            Some(_) => Err(self.err(line, format!("'{}' is not a function", name))),
            None => Err(self.err(line, format!("'{}' is undefined", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve_src(src: &str) -> Result<Program, CompileError> {
        let tokens = Lexer::lex(src, "t.bpl").unwrap();
        let mut program = Parser::new(tokens, "t.bpl").parse().unwrap();
        resolve(&mut program, "t.bpl")?;
        Ok(program)
    }

    #[test]
    fn resolves_global_variable_reference() {
        let program = resolve_src("int x; int main(void) { x = 1; return 0; }").unwrap();
        let main_id = program.top_level[1];
        let fun = program.decls[main_id].as_fun().unwrap();
        match &fun.body.stmts[0].kind {
            StmtKind::Expr(e) => match &e.kind {
                ExprKind::Assign { lhs, .. } => match &lhs.kind {
                    ExprKind::Var { dec, .. } => assert!(dec.is_some()),
                    _ => panic!(),
                },
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = resolve_src("int main(void) { y = 1; return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn function_names_resolve_only_against_global_scope() {
        let program = resolve_src(
            "int f(void) { return 1; } int main(void) { return f(); }",
        )
        .unwrap();
        let main_id = program.top_level[1];
        let fun = program.decls[main_id].as_fun().unwrap();
        match &fun.body.stmts[0].kind {
            StmtKind::Ret(Some(e)) => match &e.kind {
                ExprKind::Call { dec, .. } => assert!(dec.is_some()),
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn parameter_and_local_share_one_frame_so_collision_is_an_error() {
        let err = resolve_src("int main(int x) { int x; return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn nested_compound_statement_may_shadow_an_outer_local() {
        // allowed: shadowing across frames, only same-frame redeclaration is rejected
        let program =
            resolve_src("int main(void) { int x; { int x; x = 1; } return 0; }").unwrap();
        assert_eq!(program.top_level.len(), 1);
    }

    #[test]
    fn array_size_zero_is_an_error() {
        let err = resolve_src("int a[0]; int main(void) { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn forward_reference_between_functions_resolves() {
        let program = resolve_src(
            "int main(void) { return g(); } int g(void) { return 1; }",
        )
        .unwrap();
        assert_eq!(program.top_level.len(), 2);
    }
}
