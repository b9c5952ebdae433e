//! Hand-written recursive-descent parser: tokens to AST.
//!
//! One token of lookahead (`current()`), advanced with `consume()`/`expect()`.
//! Binary `+ - * / %` are parsed iteratively for left-associativity; `=` and
//! the relational operators are parsed by recursive descent into the right
//! operand, giving right-associativity, though at most one such operator
//! ever appears per `expr` production since neither folds back into itself.

use crate::ast::{
    ArithOp, ArrDecl, BplType, CompOp, CompStmt, Decl, DeclArena, DeclId, Expr, ExprKind, FunDecl,
    Program, Stmt, StmtKind, VarDecl,
};
use crate::error::CompileError;
use crate::token::{Token, TokenKind};
use std::path::{Path, PathBuf};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: PathBuf,
    decls: DeclArena,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: impl AsRef<Path>) -> Self {
        Parser {
            tokens,
            pos: 0,
            file: file.as_ref().to_path_buf(),
            decls: DeclArena::new(),
        }
    }

    pub fn parse(mut self) -> Result<Program, CompileError> {
        let mut top_level = Vec::new();
        while !self.current().is(TokenKind::Eof) {
            top_level.push(self.parse_top_decl()?);
        }
        self.expect(TokenKind::Eof, "expected end of file")?;
        Ok(Program {
            decls: self.decls,
            top_level,
        })
    }

    // ---- token stream helpers ----

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().is(kind)
    }

    fn err(&self, message: impl Into<String>) -> CompileError {
        CompileError::Parse {
            file: self.file.clone(),
            line: self.current().line,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.err(format!(
                "expected {} but found {} ('{}'); {}",
                kind,
                self.current().kind,
                self.current().lexeme,
                context
            )))
        }
    }

    // ---- declarations ----

    fn parse_type_spec(&mut self) -> Result<BplType, CompileError> {
        let ty = match self.current().kind {
            TokenKind::Int => BplType::Int,
            TokenKind::String => BplType::Str,
            TokenKind::Void => BplType::Void,
            _ => {
                return Err(self.err(format!(
                    "expected a type specifier but found {} ('{}')",
                    self.current().kind,
                    self.current().lexeme
                )))
            }
        };
        self.advance();
        Ok(ty)
    }

    /// Parses one top-level declaration: a variable, a sized array, or a
    /// function definition.
    fn parse_top_decl(&mut self) -> Result<DeclId, CompileError> {
        let line = self.current().line;
        let ty = self.parse_type_spec()?;
        let is_pointer = self.eat(TokenKind::Star);
        let name_tok = self.expect(TokenKind::Ident, "expected a declaration name")?;
        let name = name_tok.lexeme;

        if self.eat(TokenKind::Semi) {
            return Ok(self.decls.push(Decl::Var(VarDecl {
                name,
                ty,
                is_pointer,
                line,
                is_global: false,
                offset: 0,
            })));
        }

        if self.eat(TokenKind::LSquare) {
            if is_pointer {
                return Err(self.err("array declarations cannot also be pointers"));
            }
            let size_tok = self.expect(TokenKind::Number, "array size must be a number literal")?;
            let size: i64 = size_tok.lexeme.parse().map_err(|_| {
                self.err(format!("invalid array size literal '{}'", size_tok.lexeme))
            })?;
            self.expect(TokenKind::RSquare, "expected ']' after array size")?;
            self.expect(TokenKind::Semi, "expected ';' after array declaration")?;
            return Ok(self.decls.push(Decl::Arr(ArrDecl {
                name,
                elem_ty: ty,
                size: Some(size),
                line,
                is_global: false,
                offset: 0,
            })));
        }

        if self.eat(TokenKind::LParen) {
            let params = self.parse_params()?;
            self.expect(TokenKind::RParen, "expected ')' after parameter list")?;
            let body = self.parse_comp_stmt()?;
            return Ok(self.decls.push(Decl::Fun(FunDecl {
                name,
                return_ty: ty,
                params,
                body,
                line,
                locals_size: 0,
                return_label: String::new(),
            })));
        }

        Err(self.err("expected ';', '[', or '(' after declaration name"))
    }

    fn parse_params(&mut self) -> Result<Vec<DeclId>, CompileError> {
        if self.check(TokenKind::Void) && !self.peek_is_star_or_ident_after_void() {
            self.advance();
            return Ok(Vec::new());
        }
        let mut params = vec![self.parse_param()?];
        while self.eat(TokenKind::Comma) {
            params.push(self.parse_param()?);
        }
        Ok(params)
    }

    /// `void` alone means "no parameters"; a parameter can also legitimately
    /// be declared with base type `void` only as a pointer (e.g. future
    /// extension), so we peek one token further before treating `void` as
    /// the empty-parameter-list marker.
    fn peek_is_star_or_ident_after_void(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| t.kind),
            Some(TokenKind::Star) | Some(TokenKind::Ident)
        )
    }

    fn parse_param(&mut self) -> Result<DeclId, CompileError> {
        let line = self.current().line;
        let ty = self.parse_type_spec()?;
        let is_pointer = self.eat(TokenKind::Star);
        let name = self.expect(TokenKind::Ident, "expected a parameter name")?.lexeme;
        if self.eat(TokenKind::LSquare) {
            if is_pointer {
                return Err(self.err("array parameters cannot also be pointers"));
            }
            self.expect(TokenKind::RSquare, "expected ']' in array parameter")?;
            Ok(self.decls.push(Decl::Arr(ArrDecl {
                name,
                elem_ty: ty,
                size: None,
                line,
                is_global: false,
                offset: 0,
            })))
        } else {
            Ok(self.decls.push(Decl::Var(VarDecl {
                name,
                ty,
                is_pointer,
                line,
                is_global: false,
                offset: 0,
            })))
        }
    }

    fn parse_comp_stmt(&mut self) -> Result<CompStmt, CompileError> {
        self.expect(TokenKind::LCurly, "expected '{' to start a block")?;
        let mut local_decs = Vec::new();
        while self.starts_local_decl() {
            local_decs.push(self.parse_local_decl()?);
        }
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RCurly) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RCurly, "expected '}' to close a block")?;
        Ok(CompStmt { local_decs, stmts })
    }

    fn starts_local_decl(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Int | TokenKind::String | TokenKind::Void
        )
    }

    fn parse_local_decl(&mut self) -> Result<DeclId, CompileError> {
        let line = self.current().line;
        let ty = self.parse_type_spec()?;
        let is_pointer = self.eat(TokenKind::Star);
        let name = self.expect(TokenKind::Ident, "expected a declaration name")?.lexeme;

        if self.eat(TokenKind::Semi) {
            return Ok(self.decls.push(Decl::Var(VarDecl {
                name,
                ty,
                is_pointer,
                line,
                is_global: false,
                offset: 0,
            })));
        }
        if self.eat(TokenKind::LSquare) {
            if is_pointer {
                return Err(self.err("array declarations cannot also be pointers"));
            }
            let size_tok = self.expect(TokenKind::Number, "array size must be a number literal")?;
            let size: i64 = size_tok.lexeme.parse().map_err(|_| {
                self.err(format!("invalid array size literal '{}'", size_tok.lexeme))
            })?;
            self.expect(TokenKind::RSquare, "expected ']' after array size")?;
            self.expect(TokenKind::Semi, "expected ';' after array declaration")?;
            return Ok(self.decls.push(Decl::Arr(ArrDecl {
                name,
                elem_ty: ty,
                size: Some(size),
                line,
                is_global: false,
                offset: 0,
            })));
        }
        // A '(' here would start a function; local declarations must be
        // variable or array.
        Err(self.err(
            "local declarations must be a variable or array, not a function",
        ))
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        let line = self.current().line;
        if self.check(TokenKind::LCurly) {
            let comp = self.parse_comp_stmt()?;
            return Ok(Stmt::new(StmtKind::Comp(comp), line));
        }
        if self.eat(TokenKind::If) {
            self.expect(TokenKind::LParen, "expected '(' after 'if'")?;
            let cond = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')' after if condition")?;
            let then_body = Box::new(self.parse_stmt()?);
            let else_body = if self.eat(TokenKind::Else) {
                Some(Box::new(self.parse_stmt()?))
            } else {
                None
            };
            return Ok(Stmt::new(
                StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                },
                line,
            ));
        }
        if self.eat(TokenKind::While) {
            self.expect(TokenKind::LParen, "expected '(' after 'while'")?;
            let cond = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')' after while condition")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::new(StmtKind::While { cond, body }, line));
        }
        if self.eat(TokenKind::Return) {
            let value = if self.check(TokenKind::Semi) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(TokenKind::Semi, "expected ';' after return statement")?;
            return Ok(Stmt::new(StmtKind::Ret(value), line));
        }
        if self.eat(TokenKind::Write) {
            self.expect(TokenKind::LParen, "expected '(' after 'write'")?;
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')' after write argument")?;
            self.expect(TokenKind::Semi, "expected ';' after write statement")?;
            return Ok(Stmt::new(StmtKind::Write(expr), line));
        }
        if self.eat(TokenKind::Writeln) {
            self.expect(TokenKind::LParen, "expected '(' after 'writeln'")?;
            self.expect(TokenKind::RParen, "expected ')'; writeln takes no arguments")?;
            self.expect(TokenKind::Semi, "expected ';' after writeln statement")?;
            return Ok(Stmt::new(StmtKind::Writeln, line));
        }
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semi, "expected ';' after expression statement")?;
        Ok(Stmt::new(StmtKind::Expr(expr), line))
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let line = self.current().line;
        let lhs = self.parse_e()?;

        if self.eat(TokenKind::Equal) {
            if !lhs.is_lvalue() {
                return Err(self.err("invalid l-value in assignment"));
            }
            let rhs = self.parse_expr()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            ));
        }

        if let Some(op) = self.relop() {
            self.advance();
            let rhs = self.parse_expr()?;
            return Ok(Expr::new(
                ExprKind::Comp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            ));
        }

        Ok(lhs)
    }

    fn relop(&self) -> Option<CompOp> {
        Some(match self.current().kind {
            TokenKind::Less => CompOp::Lt,
            TokenKind::LessEqual => CompOp::Le,
            TokenKind::EqualEqual => CompOp::Eq,
            TokenKind::NotEqual => CompOp::Ne,
            TokenKind::GreaterEqual => CompOp::Ge,
            TokenKind::Greater => CompOp::Gt,
            _ => return None,
        })
    }

    /// `E := T (('+'|'-') T)*`, left-associative.
    fn parse_e(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_t()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            let line = self.current().line;
            self.advance();
            let rhs = self.parse_t()?;
            lhs = Expr::new(
                ExprKind::Arith {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            );
        }
        Ok(lhs)
    }

    /// `T := F (('*'|'/'|'%') F)*`, left-associative.
    fn parse_t(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                TokenKind::Percent => ArithOp::Mod,
                _ => break,
            };
            let line = self.current().line;
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::new(
                ExprKind::Arith {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            );
        }
        Ok(lhs)
    }

    /// `F := '-' factor | '&' factor | '*' factor | factor`. The `'*'
    /// factor` alternative here and the one inside `factor` itself are the
    /// same production reachable two ways; recursing uniformly handles
    /// both and lets `**p` chain arbitrarily.
    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let line = self.current().line;
        if self.eat(TokenKind::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Neg(Box::new(inner)), line));
        }
        if self.eat(TokenKind::Amp) {
            let inner = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Addr(Box::new(inner)), line));
        }
        if self.eat(TokenKind::Star) {
            let inner = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Deref(Box::new(inner)), line));
        }
        self.parse_factor()
    }

    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        let line = self.current().line;

        if self.check(TokenKind::Ident) {
            let name = self.advance().lexeme;
            if self.eat(TokenKind::LSquare) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RSquare, "expected ']' after array index")?;
                return Ok(Expr::new(
                    ExprKind::Arr {
                        name,
                        index: Box::new(index),
                        dec: None,
                    },
                    line,
                ));
            }
            if self.eat(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    while self.eat(TokenKind::Comma) {
                        args.push(self.parse_expr()?);
                    }
                }
                self.expect(TokenKind::RParen, "expected ')' after call arguments")?;
                return Ok(Expr::new(
                    ExprKind::Call {
                        name,
                        args,
                        dec: None,
                    },
                    line,
                ));
            }
            return Ok(Expr::new(ExprKind::Var { name, dec: None }, line));
        }

        if self.eat(TokenKind::Read) {
            self.expect(TokenKind::LParen, "expected '(' after 'read'")?;
            self.expect(TokenKind::RParen, "expected ')'; read takes no arguments")?;
            return Ok(Expr::new(ExprKind::Read, line));
        }

        if self.eat(TokenKind::Star) {
            let inner = self.parse_factor()?;
            return Ok(Expr::new(ExprKind::Deref(Box::new(inner)), line));
        }

        if self.check(TokenKind::Number) {
            let lexeme = self.advance().lexeme;
            let value: i64 = lexeme
                .parse()
                .map_err(|_| self.err(format!("invalid integer literal '{}'", lexeme)))?;
            return Ok(Expr::new(ExprKind::IntLit(value), line));
        }

        if self.check(TokenKind::StringLit) {
            let value = self.advance().lexeme;
            return Ok(Expr::new(ExprKind::StrLit(value), line));
        }

        if self.eat(TokenKind::LParen) {
            let inner = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')' to close a parenthesized expression")?;
            return Ok(inner);
        }

        Err(self.err(format!(
            "unexpected token {} ('{}') in expression",
            self.current().kind,
            self.current().lexeme
        )))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Result<Program, CompileError> {
        let tokens = Lexer::lex(src, "t.bpl").unwrap();
        Parser::new(tokens, "t.bpl").parse()
    }

    #[test]
    fn parses_global_var_and_function() {
        let prog = parse("int x; int main(void) { return 0; }").unwrap();
        assert_eq!(prog.top_level.len(), 2);
    }

    #[test]
    fn rejects_function_as_local_declaration() {
        let err = parse("int main(void) { int f(void) { return 0; } return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn rejects_non_lvalue_assignment_target() {
        let err = parse("int main(void) { 1 = 2; return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn left_associativity_of_additive_chain() {
        let prog = parse("int main(void) { return a - b - c; }").unwrap();
        let fun = prog.decls[prog.top_level[0]].as_fun().unwrap();
        let ret = &fun.body.stmts[0];
        match &ret.kind {
            StmtKind::Ret(Some(expr)) => match &expr.kind {
                ExprKind::Arith {
                    op: ArithOp::Sub,
                    lhs,
                    ..
                } => {
                    // outer node is (a - b) - c: its lhs must itself be a subtraction
                    assert!(matches!(
                        lhs.kind,
                        ExprKind::Arith {
                            op: ArithOp::Sub,
                            ..
                        }
                    ));
                }
                _ => panic!("expected Arith Sub"),
            },
            _ => panic!("expected Ret"),
        }
    }

    #[test]
    fn array_declaration_requires_number_literal_size() {
        let err = parse("int a[n]; int main(void) { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn relational_operator_parses_as_single_comparison() {
        let prog = parse("int main(void) { return a <= b; }").unwrap();
        let fun = prog.decls[prog.top_level[0]].as_fun().unwrap();
        match &fun.body.stmts[0].kind {
            StmtKind::Ret(Some(expr)) => {
                assert!(matches!(
                    expr.kind,
                    ExprKind::Comp {
                        op: CompOp::Le,
                        ..
                    }
                ));
            }
            _ => panic!("expected Ret"),
        }
    }
}
