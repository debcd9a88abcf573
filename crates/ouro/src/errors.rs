//! Error kinds that abort a bundling run.
//!
//! Every kind is fatal: the engine stops at the first one and nothing is
//! written. Callers thread these through `anyhow`, so tests recover the
//! concrete kind with `Error::downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// An import that looks local (relative, or overlapping a search root)
    /// resolved to no module file or package re-export.
    #[error("unresolved import '{module}' at {}:{line}", .file.display())]
    UnresolvedImport {
        module: String,
        file: PathBuf,
        line: usize,
    },

    /// The depth-first walk re-entered a module that is still being inlined.
    /// The chain runs from the first occurrence of the module back to itself.
    #[error("circular import detected: {}", .chain.join(" -> "))]
    CircularImport { chain: Vec<String> },

    /// The parser rejected a source file, or inline markers in an input file
    /// were unbalanced.
    #[error("{}:{line}: {message}", .file.display())]
    MalformedStatement {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// A `from package import name` fell back to the package initializer and
    /// the initializer neither defines nor re-exports the name.
    #[error(
        "package '{package}' neither defines nor re-exports '{symbol}' (imported at {}:{line})",
        .file.display()
    )]
    AmbiguousReexport {
        package: String,
        symbol: String,
        file: PathBuf,
        line: usize,
    },
}
