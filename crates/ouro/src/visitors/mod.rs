//! AST visitor implementations for ouro
//!
//! This module contains the visitor that walks a parsed module and collects
//! every import statement, at any nesting depth, in document order.

mod import_collector;

pub use import_collector::{
    FromImport, ImportCollector, ImportStatement, ImportedName, PlainImport, SuiteInfo,
};
