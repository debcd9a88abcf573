//! Inline marker comments.
//!
//! Every spliced fragment is wrapped in a begin/end pair, and elided
//! duplicate imports leave a short no-op marker. Scanning recognizes
//! markers in an input file so re-running on bundle output detects every
//! module as already inlined. The scan walks comment tokens, not lines, so
//! marker-shaped text inside string literals is never misread.

use anyhow::Result;
use indexmap::IndexSet;
use ruff_python_parser::TokenKind;
use ruff_text_size::Ranged;

use crate::{errors::BundleError, parser::SourceModule};

pub const BEGIN_PREFIX: &str = "# begin inlined module: ";
pub const END_PREFIX: &str = "# end inlined module: ";
pub const ALREADY_PREFIX: &str = "# already inlined module: ";

pub fn begin(name: &str) -> String {
    format!("{BEGIN_PREFIX}{name}")
}

pub fn end(name: &str) -> String {
    format!("{END_PREFIX}{name}")
}

pub fn already_inlined(name: &str) -> String {
    format!("{ALREADY_PREFIX}{name}")
}

/// Collect the names of modules already inlined into `module`, validating
/// marker pairing. Elision markers count too, so partial bundles keep their
/// dedup set. Unbalanced or misnested markers are malformed input.
pub fn scan(module: &SourceModule) -> Result<IndexSet<String>> {
    let mut seen = IndexSet::new();
    let mut stack: Vec<(String, usize)> = Vec::new();

    for token in module.tokens().iter() {
        if token.kind() != TokenKind::Comment {
            continue;
        }
        let text = module.text(token.range());
        let line = module.line_of(token.range().start());
        if let Some(name) = text.strip_prefix(BEGIN_PREFIX) {
            let name = name.trim().to_owned();
            seen.insert(name.clone());
            stack.push((name, line));
        } else if let Some(name) = text.strip_prefix(END_PREFIX) {
            let name = name.trim();
            match stack.pop() {
                Some((open, _)) if open == name => {}
                Some((open, _)) => {
                    return Err(BundleError::MalformedStatement {
                        file: module.path().to_path_buf(),
                        line,
                        message: format!(
                            "end marker for '{name}' does not match open marker for '{open}'"
                        ),
                    }
                    .into());
                }
                None => {
                    return Err(BundleError::MalformedStatement {
                        file: module.path().to_path_buf(),
                        line,
                        message: format!("end marker for '{name}' without a begin marker"),
                    }
                    .into());
                }
            }
        } else if let Some(name) = text.strip_prefix(ALREADY_PREFIX) {
            seen.insert(name.trim().to_owned());
        }
    }

    if let Some((open, line)) = stack.pop() {
        return Err(BundleError::MalformedStatement {
            file: module.path().to_path_buf(),
            line,
            message: format!("begin marker for '{open}' is never closed"),
        }
        .into());
    }

    Ok(seen)
}
