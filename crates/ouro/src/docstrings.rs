//! String classification and docstring stripping.
//!
//! Classification is purely positional: a plain string-literal expression
//! statement is a docstring exactly when it is the first statement of a
//! module, class, or function body. Strings anywhere else are data and must
//! survive stripping byte for byte. F-strings never bind `__doc__`, so they
//! are never docstrings.

use std::path::Path;

use anyhow::Result;
use ruff_python_ast::{ExceptHandler, Stmt, helpers::is_docstring_stmt};
use ruff_text_size::{Ranged, TextRange};

use crate::parser::SourceModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringRole {
    /// First statement of a module, class, or function body.
    Docstring,
    /// Any other bare string expression; left alone.
    Other,
}

/// A bare string-literal expression statement and how it is positioned.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedString {
    pub range: TextRange,
    pub role: StringRole,
    /// The string is the entire body of its class or function, so removal
    /// must leave `pass` behind to keep the block non-empty.
    pub sole_statement: bool,
}

/// The kind of body a statement list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// Module top level; a sole docstring may simply vanish.
    Module,
    /// Class or function body.
    Definition,
    /// Conditional, loop, or other nested block; position one of these is
    /// not a docstring position.
    Block,
}

/// Classify every bare string-literal expression statement in the module,
/// in document order.
pub fn collect_string_literals(module: &SourceModule) -> Vec<ClassifiedString> {
    let mut found = Vec::new();
    collect_in_body(&module.module().body, BodyKind::Module, &mut found);
    found
}

fn collect_in_body(body: &[Stmt], kind: BodyKind, found: &mut Vec<ClassifiedString>) {
    for (index, stmt) in body.iter().enumerate() {
        if is_docstring_stmt(stmt) {
            let docstring_position = index == 0 && kind != BodyKind::Block;
            found.push(ClassifiedString {
                range: stmt.range(),
                role: if docstring_position {
                    StringRole::Docstring
                } else {
                    StringRole::Other
                },
                sole_statement: docstring_position
                    && kind == BodyKind::Definition
                    && body.len() == 1,
            });
        }
        visit_nested(stmt, found);
    }
}

fn visit_nested(stmt: &Stmt, found: &mut Vec<ClassifiedString>) {
    match stmt {
        Stmt::FunctionDef(def) => collect_in_body(&def.body, BodyKind::Definition, found),
        Stmt::ClassDef(def) => collect_in_body(&def.body, BodyKind::Definition, found),
        Stmt::If(if_stmt) => {
            collect_in_body(&if_stmt.body, BodyKind::Block, found);
            for clause in &if_stmt.elif_else_clauses {
                collect_in_body(&clause.body, BodyKind::Block, found);
            }
        }
        Stmt::For(for_stmt) => {
            collect_in_body(&for_stmt.body, BodyKind::Block, found);
            collect_in_body(&for_stmt.orelse, BodyKind::Block, found);
        }
        Stmt::While(while_stmt) => {
            collect_in_body(&while_stmt.body, BodyKind::Block, found);
            collect_in_body(&while_stmt.orelse, BodyKind::Block, found);
        }
        Stmt::With(with_stmt) => collect_in_body(&with_stmt.body, BodyKind::Block, found),
        Stmt::Try(try_stmt) => {
            collect_in_body(&try_stmt.body, BodyKind::Block, found);
            for handler in &try_stmt.handlers {
                let ExceptHandler::ExceptHandler(handler) = handler;
                collect_in_body(&handler.body, BodyKind::Block, found);
            }
            collect_in_body(&try_stmt.orelse, BodyKind::Block, found);
            collect_in_body(&try_stmt.finalbody, BodyKind::Block, found);
        }
        Stmt::Match(match_stmt) => {
            for case in &match_stmt.cases {
                collect_in_body(&case.body, BodyKind::Block, found);
            }
        }
        _ => {}
    }
}

/// Remove every docstring from the module's text. A docstring owning its
/// lines is removed line and all; one that is the whole body of a
/// definition, or that shares a line with other code, becomes `pass`.
pub fn strip_docstrings(module: &SourceModule) -> String {
    let source = module.source();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for string in collect_string_literals(module) {
        if string.role != StringRole::Docstring {
            continue;
        }
        if string.sole_statement || !module.owns_its_lines(string.range) {
            out.push_str(&source[cursor..string.range.start().to_usize()]);
            out.push_str("pass");
            cursor = string.range.end().to_usize();
        } else {
            let (span_start, span_end) = module.full_line_span(string.range);
            out.push_str(&source[cursor..span_start]);
            cursor = span_end;
        }
    }
    out.push_str(&source[cursor..]);
    out
}

/// Strip docstrings from already-bundled text. The text is re-parsed so
/// spans line up with the spliced result rather than the original files.
pub fn strip_from_text(path: &Path, text: String) -> Result<String> {
    let module = SourceModule::parse(path, text)?;
    Ok(strip_docstrings(&module))
}
