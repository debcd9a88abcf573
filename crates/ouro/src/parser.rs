//! Structural parsing of Python sources.
//!
//! `SourceModule` pairs a file's raw text with its parsed statement tree and
//! a line index, so later passes can address statements by exact byte span
//! and splice replacement text without disturbing anything else. Files are
//! parsed at most once per run through `ModuleCache`.

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use ruff_python_ast::ModModule;
use ruff_python_parser::{Parsed, Tokens, parse_module};
use ruff_text_size::{TextRange, TextSize};
use rustc_hash::FxHashMap;

use crate::errors::BundleError;

#[derive(Debug)]
pub struct SourceModule {
    path: PathBuf,
    source: String,
    parsed: Parsed<ModModule>,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl SourceModule {
    /// Parse `source` into a statement tree. Any syntax error is fatal and
    /// reported with the file and 1-based line of the offending token.
    pub fn parse(path: &Path, source: String) -> Result<Self, BundleError> {
        let line_starts = compute_line_starts(&source);
        match parse_module(&source) {
            Ok(parsed) => Ok(Self {
                path: path.to_path_buf(),
                source,
                parsed,
                line_starts,
            }),
            Err(err) => Err(BundleError::MalformedStatement {
                file: path.to_path_buf(),
                line: line_number_at(&line_starts, err.location.start().to_usize()),
                message: err.error.to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> &ModModule {
        self.parsed.syntax()
    }

    /// Token stream of the parse, comments included.
    pub fn tokens(&self) -> &Tokens {
        self.parsed.tokens()
    }

    pub fn text(&self, range: TextRange) -> &str {
        &self.source[range.start().to_usize()..range.end().to_usize()]
    }

    /// 1-based line number containing `offset`.
    pub fn line_of(&self, offset: TextSize) -> usize {
        line_number_at(&self.line_starts, offset.to_usize())
    }

    /// Byte offset of the start of the line containing `offset`.
    pub fn line_start_of(&self, offset: TextSize) -> usize {
        let line = line_number_at(&self.line_starts, offset.to_usize());
        self.line_starts[line - 1]
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indentation_at(&self, offset: TextSize) -> &str {
        let start = self.line_start_of(offset);
        let bytes = self.source.as_bytes();
        let mut end = start;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        &self.source[start..end]
    }

    /// Terminator of the line containing `offset`, `"\r\n"` or `"\n"`. An
    /// unterminated final line reports `"\n"`.
    pub fn line_ending_at(&self, offset: TextSize) -> &'static str {
        let start = self.line_start_of(offset);
        match self.source[start..].find('\n') {
            Some(idx) if idx > 0 && self.source.as_bytes()[start + idx - 1] == b'\r' => "\r\n",
            _ => "\n",
        }
    }

    /// Expand a statement span to whole lines, trailing newline included.
    /// The returned byte range covers every continuation line of a
    /// parenthesized statement and any trailing comment on the closing line.
    pub fn full_line_span(&self, range: TextRange) -> (usize, usize) {
        let start = self.line_start_of(range.start());
        let tail = range.end().to_usize();
        let end = match self.source[tail..].find('\n') {
            Some(idx) => tail + idx + 1,
            None => self.source.len(),
        };
        (start, end)
    }

    /// True when only whitespace precedes `range` on its first line.
    pub fn starts_own_line(&self, range: TextRange) -> bool {
        let line_start = self.line_start_of(range.start());
        self.source[line_start..range.start().to_usize()]
            .chars()
            .all(|c| c == ' ' || c == '\t')
    }

    /// True when the statement has its lines to itself: nothing but
    /// indentation before it and nothing but whitespace or a comment after
    /// it. Statements sharing a line with other code (semicolon compounds)
    /// are never replaced.
    pub fn owns_its_lines(&self, range: TextRange) -> bool {
        if !self.starts_own_line(range) {
            return false;
        }
        let (_, span_end) = self.full_line_span(range);
        let tail = &self.source[range.end().to_usize()..span_end];
        let tail = tail.trim_start_matches([' ', '\t', '\r']);
        tail.is_empty() || tail == "\n" || tail.starts_with('#')
    }
}

/// Parse-once cache keyed by canonical path.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: FxHashMap<PathBuf, Rc<SourceModule>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Rc<SourceModule>> {
        if let Some(module) = self.modules.get(path) {
            return Ok(Rc::clone(module));
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let module = Rc::new(SourceModule::parse(path, source)?);
        self.modules.insert(path.to_path_buf(), Rc::clone(&module));
        Ok(module)
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

fn line_number_at(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset)
}
