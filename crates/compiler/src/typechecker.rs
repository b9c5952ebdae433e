//! Bottom-up type checker: assigns a resolved `BplType` to every expression.
//!
//! Runs after [`crate::resolver`] has attached a `dec` to every identifying
//! expression, so lookups here never fail for want of a binding — only for
//! type mismatches.

use std::path::{Path, PathBuf};

use crate::ast::{BplType, CompStmt, Decl, DeclArena, Expr, ExprKind, Program, Stmt, StmtKind};
use crate::error::CompileError;

pub fn check(program: &mut Program, file: impl AsRef<Path>) -> Result<(), CompileError> {
    let file = file.as_ref().to_path_buf();
    for (_, decl) in program.decls.iter() {
        if let Decl::Var(v) = decl {
            if v.ty == BplType::Void {
                return Err(CompileError::Type {
                    file,
                    line: v.line,
                    message: format!("variable '{}' cannot have type void", v.name),
                });
            }
        }
        if let Decl::Arr(a) = decl {
            if a.elem_ty == BplType::Void {
                return Err(CompileError::Type {
                    file,
                    line: a.line,
                    message: format!("array '{}' cannot have element type void", a.name),
                });
            }
        }
    }

    let top_level = program.top_level.clone();
    let mut checker = TypeChecker {
        decls: &mut program.decls,
        file,
        return_ty: BplType::Void,
        fun_name: String::new(),
    };
    for id in top_level {
        let (return_ty, name, mut body) = match &mut checker.decls[id] {
            Decl::Fun(f) => (
                f.return_ty,
                f.name.clone(),
                std::mem::replace(
                    &mut f.body,
                    CompStmt {
                        local_decs: Vec::new(),
                        stmts: Vec::new(),
                    },
                ),
            ),
            _ => continue,
        };
        checker.return_ty = return_ty;
        checker.fun_name = name;
        let result = checker.check_comp_stmt(&mut body);
        if let Decl::Fun(f) = &mut checker.decls[id] {
            f.body = body;
        }
        result?;
    }
    Ok(())
}

struct TypeChecker<'a> {
    decls: &'a mut DeclArena,
    file: PathBuf,
    return_ty: BplType,
    fun_name: String,
}

impl<'a> TypeChecker<'a> {
    fn err(&self, line: usize, message: impl Into<String>) -> CompileError {
        CompileError::Type {
            file: self.file.clone(),
            line,
            message: message.into(),
        }
    }

    fn check_comp_stmt(&mut self, comp: &mut CompStmt) -> Result<(), CompileError> {
        for stmt in &mut comp.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        match &mut stmt.kind {
            StmtKind::Comp(comp) => self.check_comp_stmt(comp),
            StmtKind::Expr(e) => self.check_expr(e).map(|_| ()),
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond_ty = self.check_expr(cond)?;
                if cond_ty != BplType::Int {
                    return Err(self.err(cond.line, "if condition must be int"));
                }
                self.check_stmt(then_body)?;
                if let Some(else_body) = else_body {
                    self.check_stmt(else_body)?;
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let cond_ty = self.check_expr(cond)?;
                if cond_ty != BplType::Int {
                    return Err(self.err(cond.line, "while condition must be int"));
                }
                self.check_stmt(body)
            }
            StmtKind::Ret(value) => self.check_return(value, stmt.line),
            StmtKind::Write(e) => {
                let ty = self.check_expr(e)?;
                if ty != BplType::Int && ty != BplType::Str {
                    return Err(self.err(e.line, format!("cannot write a value of type {}", ty)));
                }
                Ok(())
            }
            StmtKind::Writeln => Ok(()),
        }
    }

    fn check_return(&mut self, value: &mut Option<Expr>, line: usize) -> Result<(), CompileError> {
        match (self.return_ty, value.as_mut()) {
            (BplType::Void, Some(v)) => Err(self.err(
                v.line,
                format!(
                    "function '{}' returns void but this statement returns a value",
                    self.fun_name
                ),
            )),
            (BplType::Void, None) => Ok(()),
            (ret_ty, None) => Err(self.err(
                line,
                format!(
                    "function '{}' must return a value of type {}",
                    self.fun_name, ret_ty
                ),
            )),
            (ret_ty, Some(v)) => {
                let ty = self.check_expr(v)?;
                if ty != ret_ty {
                    return Err(self.err(
                        v.line,
                        format!(
                            "function '{}' returns {} but this statement returns {}",
                            self.fun_name, ret_ty, ty
                        ),
                    ));
                }
                Ok(())
            }
        }
    }

    fn check_expr(&mut self, expr: &mut Expr) -> Result<BplType, CompileError> {
        let ty = self.infer(expr)?;
        expr.ty = Some(ty);
        Ok(ty)
    }

    fn infer(&mut self, expr: &mut Expr) -> Result<BplType, CompileError> {
        let line = expr.line;
        match &mut expr.kind {
            ExprKind::IntLit(_) => Ok(BplType::Int),
            ExprKind::StrLit(_) => Ok(BplType::Str),
            ExprKind::Read => Ok(BplType::Int),

            ExprKind::Var { dec, .. } => {
                let id = dec.expect("resolver must run before the type checker");
                Ok(self.decls[id].value_ty())
            }

            ExprKind::Arr { index, dec, .. } => {
                let index_ty = self.check_expr(index)?;
                if index_ty != BplType::Int {
                    return Err(self.err(index.line, "array index must be int"));
                }
                let id = dec.expect("resolver must run before the type checker");
                match &self.decls[id] {
                    Decl::Arr(a) => Ok(a.elem_ty),
                    _ => Err(self.err(line, "indexed name does not refer to an array")),
                }
            }

            ExprKind::Addr(inner) => {
                if !inner.is_lvalue() || matches!(inner.kind, ExprKind::Deref(_)) {
                    return Err(self.err(
                        inner.line,
                        "the operand of '&' must be a variable or array element",
                    ));
                }
                let inner_ty = self.check_expr(inner)?;
                inner_ty
                    .address_of()
                    .ok_or_else(|| self.err(inner.line, format!("cannot take the address of a {}", inner_ty)))
            }

            ExprKind::Deref(inner) => {
                let inner_ty = self.check_expr(inner)?;
                inner_ty
                    .deref()
                    .ok_or_else(|| self.err(inner.line, format!("cannot dereference a {}", inner_ty)))
            }

            ExprKind::Neg(inner) => {
                let inner_ty = self.check_expr(inner)?;
                if inner_ty != BplType::Int {
                    return Err(self.err(inner.line, "unary '-' requires an int operand"));
                }
                Ok(BplType::Int)
            }

            ExprKind::Call { name, args, dec } => {
                let id = dec.expect("resolver must run before the type checker");
                let (param_tys, return_ty) = match &self.decls[id] {
                    Decl::Fun(f) => (
                        f.params
                            .iter()
                            .map(|&p| self.decls[p].value_ty())
                            .collect::<Vec<_>>(),
                        f.return_ty,
                    ),
                    _ => return Err(self.err(line, format!("'{}' is not callable", name))),
                };
                if args.len() != param_tys.len() {
                    return Err(self.err(
                        line,
                        format!(
                            "'{}' expects {} argument(s) but {} were given",
                            name,
                            param_tys.len(),
                            args.len()
                        ),
                    ));
                }
                for (arg, expected) in args.iter_mut().zip(param_tys.iter()) {
                    let arg_ty = self.check_expr(arg)?;
                    if arg_ty != *expected {
                        return Err(self.err(
                            arg.line,
                            format!("expected argument of type {} but found {}", expected, arg_ty),
                        ));
                    }
                }
                Ok(return_ty)
            }

            ExprKind::Assign { lhs, rhs } => {
                if !lhs.is_lvalue() {
                    return Err(self.err(lhs.line, "invalid l-value in assignment"));
                }
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty != rhs_ty {
                    return Err(self.err(
                        expr.line,
                        format!(
                            "cannot assign a value of type {} to a variable of type {}",
                            rhs_ty, lhs_ty
                        ),
                    ));
                }
                Ok(lhs_ty)
            }

            ExprKind::Arith { lhs, rhs, .. } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty != BplType::Int || rhs_ty != BplType::Int {
                    return Err(self.err(expr.line, "arithmetic operands must be int"));
                }
                Ok(BplType::Int)
            }

            ExprKind::Comp { lhs, rhs, .. } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty != BplType::Int || rhs_ty != BplType::Int {
                    return Err(self.err(expr.line, "comparison operands must be int"));
                }
                Ok(BplType::Int)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver;

    fn check_src(src: &str) -> Result<Program, CompileError> {
        let tokens = Lexer::lex(src, "t.bpl").unwrap();
        let mut program = Parser::new(tokens, "t.bpl").parse().unwrap();
        resolver::resolve(&mut program, "t.bpl").unwrap();
        check(&mut program, "t.bpl")?;
        Ok(program)
    }

    #[test]
    fn string_assigned_to_int_is_rejected() {
        let err = check_src("int main(void) { int x; string s; x = s; return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn matching_assignment_is_accepted() {
        check_src("int main(void) { int x; x = 1; return 0; }").unwrap();
    }

    #[test]
    fn void_typed_variable_is_rejected() {
        let err = check_src("void v; int main(void) { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let err =
            check_src("int f(int x) { return x; } int main(void) { return f(); }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn return_value_in_void_function_is_rejected() {
        let err = check_src("void f(void) { return 1; } int main(void) { return 0; }")
            .unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn missing_return_value_in_non_void_function_is_rejected() {
        let err = check_src("int f(void) { return; } int main(void) { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn address_of_and_deref_round_trip_through_checker() {
        check_src("int main(void) { int x; int *p; x = 7; p = &x; *p = 9; return 0; }").unwrap();
    }

    #[test]
    fn array_element_access_requires_int_index() {
        let err = check_src("int a[3]; int main(void) { string s; a[s] = 1; return 0; }")
            .unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }
}
