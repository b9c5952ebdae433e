//! Stack-frame offset assignment.
//!
//! Parameters ascend from `+16` in steps of 8 bytes in declaration order.
//! Locals descend from `-8`; a scalar consumes one word, an array of size
//! *n* consumes *n* words and its recorded offset is its first element's
//! (highest) address. Nested `if`/`while` bodies continue the same
//! descending cursor, and — preserved deliberately, not a bug we fixed —
//! an `if`'s `else` branch continues from the cursor the `then` branch left
//! behind rather than reusing the `then` branch's starting point, so the
//! two branches' locals never share stack space even though they can never
//! be live at the same time.

use crate::ast::{CompStmt, Decl, DeclArena, Program, Stmt, StmtKind};

const WORD_SIZE: i64 = 8;
const FIRST_PARAM_OFFSET: i64 = 2 * WORD_SIZE;
const FIRST_LOCAL_OFFSET: i64 = -WORD_SIZE;

pub fn assign(program: &mut Program) {
    let top_level = program.top_level.clone();
    for id in top_level {
        if matches!(program.decls[id], Decl::Fun(_)) {
            assign_function(&mut program.decls, id);
        }
    }
}

fn assign_function(decls: &mut DeclArena, id: crate::ast::DeclId) {
    let (params, mut body) = match &mut decls[id] {
        Decl::Fun(f) => (
            f.params.clone(),
            std::mem::replace(
                &mut f.body,
                CompStmt {
                    local_decs: Vec::new(),
                    stmts: Vec::new(),
                },
            ),
        ),
        _ => unreachable!(),
    };

    let mut param_offset = FIRST_PARAM_OFFSET;
    for &param in &params {
        set_offset(decls, param, param_offset);
        param_offset += WORD_SIZE;
    }

    let final_cursor = assign_comp_stmt(decls, &mut body, FIRST_LOCAL_OFFSET);
    let locals_size = (FIRST_LOCAL_OFFSET - final_cursor) as u64;

    if let Decl::Fun(f) = &mut decls[id] {
        f.body = body;
        f.locals_size = locals_size;
        f.return_label = format!(".{}_ret", f.name);
    }
}

fn set_offset(decls: &mut DeclArena, id: crate::ast::DeclId, offset: i64) {
    match &mut decls[id] {
        Decl::Var(v) => v.offset = offset,
        Decl::Arr(a) => a.offset = offset,
        Decl::Fun(_) => unreachable!("a function cannot appear as a param/local"),
    }
}

fn assign_comp_stmt(decls: &mut DeclArena, comp: &mut CompStmt, start_offset: i64) -> i64 {
    let mut cursor = start_offset;
    for &id in &comp.local_decs {
        match &mut decls[id] {
            Decl::Var(v) => {
                v.offset = cursor;
                cursor -= WORD_SIZE;
            }
            Decl::Arr(a) => {
                a.offset = cursor;
                let n = a.size.unwrap_or(1);
                cursor -= WORD_SIZE * n;
            }
            Decl::Fun(_) => unreachable!("a function cannot appear as a local"),
        }
    }
    for stmt in &mut comp.stmts {
        cursor = assign_stmt(decls, stmt, cursor);
    }
    cursor
}

fn assign_stmt(decls: &mut DeclArena, stmt: &mut Stmt, cursor: i64) -> i64 {
    match &mut stmt.kind {
        StmtKind::Comp(comp) => assign_comp_stmt(decls, comp, cursor),
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            let mut cursor = assign_stmt(decls, then_body, cursor);
            if let Some(else_body) = else_body {
                cursor = assign_stmt(decls, else_body, cursor);
            }
            cursor
        }
        StmtKind::While { body, .. } => assign_stmt(decls, body, cursor),
        StmtKind::Expr(_) | StmtKind::Ret(_) | StmtKind::Write(_) | StmtKind::Writeln => cursor,
    }
}
