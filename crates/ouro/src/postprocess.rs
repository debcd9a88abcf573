//! Release-mode post-processing of bundled text.
//!
//! Splicing leaves the surviving external imports scattered wherever the
//! source files had them. Release mode gathers the top-level ones into a
//! single deduplicated, sorted header after the shebang line and module
//! docstring. Only statements whose tree position is top-level move;
//! function-local imports have scope-dependent behavior and stay put.
//! Trailing comments on consolidated lines are dropped.

use std::path::Path;

use anyhow::Result;
use indexmap::IndexSet;
use ruff_python_ast::{Stmt, helpers::is_docstring_stmt};
use ruff_text_size::Ranged;

use crate::parser::SourceModule;

/// Move the module's top-level import statements into a sorted header.
pub fn consolidate_imports(module: &SourceModule) -> String {
    let source = module.source();
    let mut statements = IndexSet::new();
    let mut removals = Vec::new();

    for stmt in &module.module().body {
        if !matches!(stmt, Stmt::Import(_) | Stmt::ImportFrom(_)) {
            continue;
        }
        if !module.owns_its_lines(stmt.range()) {
            continue;
        }
        statements.insert(module.text(stmt.range()).to_owned());
        removals.push(module.full_line_span(stmt.range()));
    }
    if statements.is_empty() {
        return source.to_owned();
    }

    let mut header: Vec<String> = statements.into_iter().collect();
    header.sort();

    // The insertion point never falls past the first removal: a module
    // docstring can only be the first statement, so every import span
    // starts at or after it.
    let insert_at = header_insertion_offset(module);
    let mut out = String::with_capacity(source.len());
    out.push_str(&source[..insert_at]);
    for statement in &header {
        out.push_str(statement);
        out.push('\n');
    }
    let mut cursor = insert_at;
    for (start, end) in removals {
        out.push_str(&source[cursor..start]);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Consolidate imports in already-bundled text.
pub fn consolidate_from_text(path: &Path, text: String) -> Result<String> {
    let module = SourceModule::parse(path, text)?;
    Ok(consolidate_imports(&module))
}

/// Byte offset where the import header goes: after the shebang line and
/// the module docstring, whichever ends later.
fn header_insertion_offset(module: &SourceModule) -> usize {
    let source = module.source();
    let mut offset = 0;
    if source.starts_with("#!") {
        offset = source.find('\n').map_or(source.len(), |idx| idx + 1);
    }
    if let Some(first) = module.module().body.first()
        && is_docstring_stmt(first)
        && module.owns_its_lines(first.range())
    {
        let (_, end) = module.full_line_span(first.range());
        offset = offset.max(end);
    }
    offset
}
