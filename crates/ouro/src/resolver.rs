//! Module path resolution.
//!
//! Locality is decided purely by resolvability: an import that resolves to a
//! file under the search directories is local and gets inlined, everything
//! else is external and left alone. There is no stdlib table and no
//! hardcoded package list.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use ruff_python_ast::{Expr, ModModule, Stmt};
use rustc_hash::FxHashMap;

use crate::{config::Config, parser::ModuleCache};

/// A scoped guard for safely setting and cleaning up the PYTHONPATH
/// environment variable in tests. Restores the original value on drop, even
/// if a panic occurs.
#[must_use = "PythonPathGuard must be held in scope to ensure cleanup"]
#[derive(Debug)]
pub struct PythonPathGuard {
    /// The original value of PYTHONPATH; `None` if it was not set.
    original_value: Option<String>,
}

impl PythonPathGuard {
    pub fn new(new_value: &str) -> Self {
        let original_value = env::var("PYTHONPATH").ok();
        // SAFETY: test-only environment mutation, restored by Drop.
        unsafe {
            env::set_var("PYTHONPATH", new_value);
        }
        Self { original_value }
    }

    /// Ensure PYTHONPATH is unset for the guard's scope.
    pub fn unset() -> Self {
        let original_value = env::var("PYTHONPATH").ok();
        // SAFETY: test-only environment mutation, restored by Drop.
        unsafe {
            env::remove_var("PYTHONPATH");
        }
        Self { original_value }
    }
}

impl Drop for PythonPathGuard {
    fn drop(&mut self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: restoring the environment to its original state.
            unsafe {
                match self.original_value.take() {
                    Some(original) => env::set_var("PYTHONPATH", original),
                    None => env::remove_var("PYTHONPATH"),
                }
            }
        }));
    }
}

/// Where a dotted import path landed in the project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBase {
    /// A plain module file.
    Module(PathBuf),
    /// A directory reached by the final path segment. `init` is its
    /// `__init__.py` when the directory is a real package.
    Package {
        dir: PathBuf,
        init: Option<PathBuf>,
    },
}

impl ResolvedBase {
    /// The file a direct import of this target splices, if there is one.
    pub fn inline_target(&self) -> Option<&Path> {
        match self {
            Self::Module(path) => Some(path),
            Self::Package {
                init: Some(init), ..
            } => Some(init),
            Self::Package { init: None, .. } => None,
        }
    }
}

/// Names a package initializer makes importable.
#[derive(Debug, Clone, Default)]
pub struct PackageExports {
    /// Names bound at module level: defs, classes, assignments, imports.
    pub bound: IndexSet<String>,
    /// Names listed in a literal `__all__`.
    pub declared: IndexSet<String>,
    /// The initializer contains a `from x import *`.
    pub has_wildcard: bool,
}

impl PackageExports {
    /// Whether `from package import symbol` can be satisfied. In strict mode
    /// a bare `__all__` listing without a visible binding is not enough.
    pub fn provides(&self, symbol: &str, strict: bool) -> bool {
        if self.has_wildcard || self.bound.contains(symbol) {
            return true;
        }
        !strict && self.declared.contains(symbol)
    }
}

#[derive(Debug)]
pub struct ModuleResolver {
    config: Config,
    /// Cache of absolute resolutions. Relative imports are never cached
    /// since they depend on the importer.
    resolution_cache: IndexMap<String, Option<ResolvedBase>>,
    /// Cache of package initializer exports, keyed by initializer path.
    exports_cache: FxHashMap<PathBuf, PackageExports>,
    /// Entry file's directory (always first in the search path).
    entry_dir: Option<PathBuf>,
    /// PYTHONPATH override for testing.
    pythonpath_override: Option<String>,
}

impl ModuleResolver {
    pub fn new(config: Config) -> Self {
        Self::new_with_pythonpath(config, None)
    }

    /// Create a resolver with a PYTHONPATH override, bypassing the
    /// environment. Used by tests.
    pub fn new_with_pythonpath(config: Config, pythonpath_override: Option<&str>) -> Self {
        Self {
            config,
            resolution_cache: IndexMap::new(),
            exports_cache: FxHashMap::default(),
            entry_dir: None,
            pythonpath_override: pythonpath_override.map(str::to_owned),
        }
    }

    /// Set the entry file; its directory becomes the first search directory.
    pub fn set_entry_file(&mut self, entry_path: &Path) {
        if let Some(parent) = entry_path.parent() {
            self.entry_dir = Some(parent.to_path_buf());
            debug!("Set entry directory to: {:?}", self.entry_dir);
        }
    }

    /// All directories searched for absolute imports, deduplicated and
    /// canonicalized: the entry directory, then PYTHONPATH, then the
    /// configured src roots.
    pub fn search_directories(&self) -> Vec<PathBuf> {
        let mut unique_dirs = IndexSet::new();

        if let Some(entry_dir) = &self.entry_dir {
            unique_dirs.insert(canonical_or_raw(entry_dir));
        }

        let pythonpath = self
            .pythonpath_override
            .clone()
            .or_else(|| env::var("PYTHONPATH").ok());
        if let Some(pythonpath) = pythonpath {
            let separator = if cfg!(windows) { ';' } else { ':' };
            for path_str in pythonpath.split(separator) {
                if path_str.is_empty() {
                    continue;
                }
                let path = Path::new(path_str);
                if path.is_dir() {
                    unique_dirs.insert(canonical_or_raw(path));
                }
            }
        }

        for dir in &self.config.src {
            unique_dirs.insert(canonical_or_raw(dir));
        }

        unique_dirs.into_iter().collect()
    }

    /// Resolve an absolute dotted path against the search directories, in
    /// order. For the final segment the module file `seg.py` wins over a
    /// `seg/` directory; intermediate segments only need to be directories.
    pub fn resolve_absolute(&mut self, dotted: &str) -> Option<ResolvedBase> {
        if let Some(cached) = self.resolution_cache.get(dotted) {
            return cached.clone();
        }

        let parts: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        let mut resolved = None;
        if !parts.is_empty() {
            for search_dir in self.search_directories() {
                if let Some(base) = resolve_in_directory(&search_dir, &parts) {
                    resolved = Some(base);
                    break;
                }
            }
        }

        if resolved.is_none() {
            debug!("Could not resolve '{dotted}' in any search directory");
        }
        self.resolution_cache
            .insert(dotted.to_owned(), resolved.clone());
        resolved
    }

    /// Resolve a relative import against the importer's file. One leading
    /// dot means the importer's own directory; each further dot walks up one
    /// directory. `dotted` is the path after the dots, if any.
    pub fn resolve_relative(
        &self,
        importer: &Path,
        level: u32,
        dotted: Option<&str>,
    ) -> Option<ResolvedBase> {
        let mut base_dir = importer.parent()?;
        for _ in 1..level {
            base_dir = base_dir.parent()?;
        }

        match dotted {
            Some(dotted) => {
                let parts: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
                resolve_in_directory(base_dir, &parts)
            }
            None => {
                if !base_dir.is_dir() {
                    return None;
                }
                let init = base_dir.join("__init__.py");
                Some(ResolvedBase::Package {
                    dir: canonical_or_raw(base_dir),
                    init: init.is_file().then(|| canonical_or_raw(&init)),
                })
            }
        }
    }

    /// Resolve a single name inside a package directory (submodule lookup).
    pub fn resolve_in_package(&self, dir: &Path, name: &str) -> Option<ResolvedBase> {
        resolve_in_directory(dir, &[name])
    }

    /// Whether an absolute dotted path overlaps the project tree: its first
    /// segment exists as a module file or directory under a search root.
    /// Used to tell a failed local import from a genuinely external one.
    pub fn looks_local(&self, dotted: &str) -> bool {
        let Some(first) = dotted.split('.').find(|s| !s.is_empty()) else {
            return false;
        };
        self.search_directories().iter().any(|dir| {
            dir.join(format!("{first}.py")).is_file() || dir.join(first).is_dir()
        })
    }

    /// Names a package initializer makes importable, memoized per file.
    pub fn package_exports(
        &mut self,
        cache: &mut ModuleCache,
        init_path: &Path,
    ) -> Result<PackageExports> {
        if let Some(exports) = self.exports_cache.get(init_path) {
            return Ok(exports.clone());
        }
        let module = cache.load(init_path)?;
        let exports = collect_exports(module.module());
        self.exports_cache
            .insert(init_path.to_path_buf(), exports.clone());
        Ok(exports)
    }

    /// Qualified dotted name for a resolved path, derived from the first
    /// search directory containing it. `modules/class1.py` becomes
    /// `modules.class1`; a package initializer maps to its package.
    pub fn module_name_for_path(&self, path: &Path) -> String {
        let canonical = canonical_or_raw(path);
        for root in self.search_directories() {
            let Ok(relative) = canonical.strip_prefix(&root) else {
                continue;
            };
            let mut parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            match parts.last().map(String::as_str) {
                Some("__init__.py") => {
                    parts.pop();
                }
                Some(last) => {
                    if let Some(stem) = last.strip_suffix(".py") {
                        let stem = stem.to_owned();
                        parts.pop();
                        parts.push(stem);
                    }
                }
                None => {}
            }
            if !parts.is_empty() {
                return parts.join(".");
            }
        }
        path.file_stem()
            .map_or_else(|| "module".to_owned(), |stem| stem.to_string_lossy().into_owned())
    }
}

/// Canonicalize a path, falling back to the original on failure.
fn canonical_or_raw(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(err) => {
            warn!("Failed to canonicalize path {}: {err}", path.display());
            path.to_path_buf()
        }
    }
}

/// Walk `parts` down from `dir`. The final segment checks the module file
/// first, then the package directory.
fn resolve_in_directory(dir: &Path, parts: &[&str]) -> Option<ResolvedBase> {
    let (last, intermediates) = parts.split_last()?;

    let mut current = dir.to_path_buf();
    for part in intermediates {
        current = current.join(part);
        if !current.is_dir() {
            return None;
        }
    }

    let module_file = current.join(format!("{last}.py"));
    if module_file.is_file() {
        return Some(ResolvedBase::Module(canonical_or_raw(&module_file)));
    }

    let package_dir = current.join(last);
    if package_dir.is_dir() {
        let init = package_dir.join("__init__.py");
        return Some(ResolvedBase::Package {
            dir: canonical_or_raw(&package_dir),
            init: init.is_file().then(|| canonical_or_raw(&init)),
        });
    }

    None
}

fn collect_exports(module: &ModModule) -> PackageExports {
    let mut exports = PackageExports::default();
    collect_binds(&module.body, &mut exports);
    exports
}

/// Collect every name the statements bind at module level, descending into
/// conditional and try blocks but not into function or class bodies.
fn collect_binds(body: &[Stmt], exports: &mut PackageExports) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => {
                exports.bound.insert(def.name.as_str().to_owned());
            }
            Stmt::ClassDef(def) => {
                exports.bound.insert(def.name.as_str().to_owned());
            }
            Stmt::Assign(assign) => {
                for target in &assign.targets {
                    if let Expr::Name(name) = target {
                        if name.id.as_str() == "__all__" {
                            collect_literal_all(&assign.value, exports);
                        }
                        exports.bound.insert(name.id.as_str().to_owned());
                    }
                }
            }
            Stmt::AnnAssign(assign) => {
                if let Expr::Name(name) = &*assign.target {
                    exports.bound.insert(name.id.as_str().to_owned());
                }
            }
            Stmt::Import(import) => {
                for alias in &import.names {
                    let bound = match &alias.asname {
                        Some(asname) => asname.as_str(),
                        None => alias.name.as_str().split('.').next().unwrap_or_default(),
                    };
                    exports.bound.insert(bound.to_owned());
                }
            }
            Stmt::ImportFrom(import_from) => {
                for alias in &import_from.names {
                    if alias.name.as_str() == "*" {
                        exports.has_wildcard = true;
                    } else {
                        let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                        exports.bound.insert(bound.as_str().to_owned());
                    }
                }
            }
            Stmt::If(if_stmt) => {
                collect_binds(&if_stmt.body, exports);
                for clause in &if_stmt.elif_else_clauses {
                    collect_binds(&clause.body, exports);
                }
            }
            Stmt::Try(try_stmt) => {
                collect_binds(&try_stmt.body, exports);
                for handler in &try_stmt.handlers {
                    let ruff_python_ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_binds(&handler.body, exports);
                }
                collect_binds(&try_stmt.orelse, exports);
                collect_binds(&try_stmt.finalbody, exports);
            }
            Stmt::For(for_stmt) => {
                collect_binds(&for_stmt.body, exports);
                collect_binds(&for_stmt.orelse, exports);
            }
            Stmt::While(while_stmt) => {
                collect_binds(&while_stmt.body, exports);
                collect_binds(&while_stmt.orelse, exports);
            }
            Stmt::With(with_stmt) => {
                collect_binds(&with_stmt.body, exports);
            }
            _ => {}
        }
    }
}

fn collect_literal_all(value: &Expr, exports: &mut PackageExports) {
    let elements = match value {
        Expr::List(list) => &list.elts,
        Expr::Tuple(tuple) => &tuple.elts,
        _ => return,
    };
    for element in elements {
        if let Expr::StringLiteral(literal) = element {
            exports.declared.insert(literal.value.to_str().to_owned());
        }
    }
}
