//! Ouro inlines a Python project's local imports into a single file.
//!
//! The engine parses the entry module, resolves each import against the
//! project's source roots, and splices local modules' text in place of
//! their import statements, depth first. External imports stay untouched,
//! so the bundled file behaves exactly like the multi-file original.

pub mod config;
pub mod docstrings;
pub mod errors;
pub mod graph;
pub mod inliner;
pub mod markers;
pub mod orchestrator;
pub mod parser;
pub mod postprocess;
pub mod resolver;
pub mod visitors;
