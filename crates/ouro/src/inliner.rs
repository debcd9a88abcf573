//! The recursive inlining engine.
//!
//! Drives a depth-first walk over local imports starting from the entry
//! module. Each local import statement is replaced, at its exact span, by
//! the imported module's own bundled text wrapped in markers; everything
//! around the statement is copied through byte for byte. External imports
//! are never touched.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexSet;
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::{
    config::Config,
    errors::BundleError,
    graph::{InlineState, ModuleGraph, ModuleId},
    markers,
    parser::{ModuleCache, SourceModule},
    resolver::{ModuleResolver, ResolvedBase},
    visitors::{FromImport, ImportCollector, ImportStatement, PlainImport, SuiteInfo},
};

/// Whether a splice site is reachable at runtime or only under a
/// `TYPE_CHECKING` guard. Type-only visibility is inherited: everything
/// pulled in through a guarded import is itself type-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceMode {
    Runtime,
    TypeOnly,
}

/// What a single local import statement splices and what it leaves behind.
struct SplicePlan {
    /// Module files to inline at this site, one splice per file.
    targets: IndexSet<PathBuf>,
    /// External names that shared the statement with a local one;
    /// re-emitted as plain imports after the fragments.
    residuals: Vec<String>,
}

/// Formatting of one splice site: the replaced statement's indentation and
/// its line terminator. Generated lines at the site use both; fragment
/// lines keep their own terminators.
#[derive(Debug, Clone, Copy)]
struct SpliceSite<'a> {
    indent: &'a str,
    newline: &'static str,
}

/// Replacement progress inside one suite. A suite whose statements were
/// all replaced without any of them leaving a statement behind must be
/// backfilled with `pass` to stay parseable.
#[derive(Debug, Default, Clone, Copy)]
struct SuiteProgress {
    replaced: usize,
    left_statement: bool,
}

#[derive(Debug)]
pub struct Inliner<'a> {
    resolver: &'a mut ModuleResolver,
    cache: &'a mut ModuleCache,
    graph: &'a mut ModuleGraph,
    /// Dotted names the input files already carry, collected from their
    /// markers. Importing one of these only leaves an elision marker.
    preinlined: IndexSet<String>,
    /// Names of the modules currently being inlined, entry first. Feeds
    /// the chain of a `CircularImport` report.
    visit_chain: Vec<String>,
    allow_unresolved: bool,
    strict_reexports: bool,
    /// Cleared in release mode, where fragments land without markers.
    emit_markers: bool,
}

impl<'a> Inliner<'a> {
    pub fn new(
        resolver: &'a mut ModuleResolver,
        cache: &'a mut ModuleCache,
        graph: &'a mut ModuleGraph,
        config: &Config,
    ) -> Self {
        Self {
            resolver,
            cache,
            graph,
            preinlined: IndexSet::new(),
            visit_chain: Vec::new(),
            allow_unresolved: config.allow_unresolved,
            strict_reexports: config.strict_reexports,
            emit_markers: !config.release,
        }
    }

    /// Bundle the entry module and everything it transitively imports into
    /// a single piece of text. The caller passes a canonical path.
    pub fn inline_entry(&mut self, entry: &Path) -> Result<String> {
        let name = self.resolver.module_name_for_path(entry);
        let id = self.graph.ensure_module(name, entry.to_path_buf());
        self.inline_module(id, SpliceMode::Runtime)
    }

    fn inline_module(&mut self, id: ModuleId, mode: SpliceMode) -> Result<String> {
        self.graph.begin_inline(id);
        self.visit_chain.push(self.graph.name(id).to_owned());
        let path = self.graph.node(id).path.clone();
        debug!("Inlining '{}' from {}", self.graph.name(id), path.display());

        let module = self.cache.load(&path)?;
        for name in markers::scan(&module)? {
            self.preinlined.insert(name);
        }

        let imports = ImportCollector::collect(module.module());
        let mut children = Vec::new();
        let mut suites: FxHashMap<u32, SuiteProgress> = FxHashMap::default();
        let mut top_level_replaced = 0;
        let mut top_level_left_statement = false;
        let mut out = String::with_capacity(module.source().len());
        let mut cursor = 0;

        for import in &imports {
            let range = import.range();
            if !module.owns_its_lines(range) {
                warn!(
                    "Not touching import at {}:{}; it shares a line with other code",
                    path.display(),
                    module.line_of(range.start())
                );
                continue;
            }
            let plan = match import {
                ImportStatement::Plain(plain) => self.plan_plain(&module, plain)?,
                ImportStatement::From(from) => self.plan_from(&module, from)?,
            };
            let Some(plan) = plan else {
                continue;
            };

            let (span_start, span_end) = module.full_line_span(range);
            out.push_str(&module.source()[cursor..span_start]);
            cursor = span_end;

            let site = SpliceSite {
                indent: module.indentation_at(range.start()),
                newline: module.line_ending_at(range.start()),
            };
            let child_mode = if import.is_type_checking() {
                SpliceMode::TypeOnly
            } else {
                mode
            };
            let mut left_statement = !plan.residuals.is_empty();
            for target in plan.targets {
                left_statement |=
                    self.splice_target(id, target, site, child_mode, &mut children, &mut out)?;
            }
            for residual in &plan.residuals {
                out.push_str(site.indent);
                out.push_str("import ");
                out.push_str(residual);
                out.push_str(site.newline);
            }
            match import.suite() {
                Some(suite) => {
                    Self::backfill_suite(&mut suites, suite, left_statement, site, &mut out);
                }
                None => {
                    top_level_replaced += 1;
                    top_level_left_statement |= left_statement;
                }
            }
        }
        out.push_str(&module.source()[cursor..]);

        let has_statements =
            module.module().body.len() > top_level_replaced || top_level_left_statement;
        self.visit_chain.pop();
        self.graph.finish_inline(
            id,
            out.clone(),
            mode == SpliceMode::TypeOnly,
            has_statements,
            children,
        );
        Ok(out)
    }

    /// A suite whose statements were all replaced by marker comments alone
    /// would be left empty, which does not parse. Once the last statement
    /// of a suite is replaced and no replacement in it left a statement
    /// behind, a `pass` takes their place.
    fn backfill_suite(
        suites: &mut FxHashMap<u32, SuiteProgress>,
        suite: SuiteInfo,
        left_statement: bool,
        site: SpliceSite<'_>,
        out: &mut String,
    ) {
        let progress = suites.entry(suite.id).or_default();
        progress.replaced += 1;
        progress.left_statement |= left_statement;
        if progress.replaced == suite.statements && !progress.left_statement {
            out.push_str(site.indent);
            out.push_str("pass");
            out.push_str(site.newline);
        }
    }

    /// Emit whatever one resolved import target contributes at this site:
    /// a fresh fragment, a re-spliced one, or an elision marker. Reports
    /// whether the emitted text left a statement at the site.
    fn splice_target(
        &mut self,
        from: ModuleId,
        target: PathBuf,
        site: SpliceSite<'_>,
        mode: SpliceMode,
        children: &mut Vec<ModuleId>,
        out: &mut String,
    ) -> Result<bool> {
        let name = self.resolver.module_name_for_path(&target);
        if self.preinlined.contains(&name) {
            self.push_elision(out, site, &name);
            return Ok(false);
        }

        let id = self.graph.ensure_module(name.clone(), target);
        self.graph.add_dependency(from, id);
        match self.graph.state(id) {
            InlineState::InProgress => {
                let first = self
                    .visit_chain
                    .iter()
                    .position(|entry| entry == &name)
                    .unwrap_or(0);
                let mut chain: Vec<String> = self.visit_chain[first..].to_vec();
                chain.push(name);
                Err(BundleError::CircularImport { chain }.into())
            }
            InlineState::Done => {
                if mode == SpliceMode::Runtime && self.graph.node(id).type_checking_only {
                    // Every copy so far sits under a TYPE_CHECKING guard; a
                    // runtime import needs the text for real.
                    let node = self.graph.node(id);
                    let fragment = node
                        .fragment
                        .clone()
                        .expect("finished module keeps its fragment");
                    let has_statements = node.has_statements;
                    self.graph.promote_to_runtime(id);
                    children.push(id);
                    self.push_fragment(out, site, &name, &fragment);
                    Ok(has_statements)
                } else {
                    self.push_elision(out, site, &name);
                    Ok(false)
                }
            }
            InlineState::Unvisited => {
                children.push(id);
                let fragment = self.inline_module(id, mode)?;
                self.push_fragment(out, site, &name, &fragment);
                Ok(self.graph.node(id).has_statements)
            }
        }
    }

    /// Decide what a plain `import a, b as c` statement splices. `None`
    /// leaves the statement untouched.
    fn plan_plain(
        &mut self,
        module: &SourceModule,
        import: &PlainImport,
    ) -> Result<Option<SplicePlan>> {
        let mut targets = IndexSet::new();
        let mut residuals = Vec::new();

        for alias in &import.aliases {
            let resolved = self.resolver.resolve_absolute(&alias.name);
            if let Some(target) = resolved.as_ref().and_then(ResolvedBase::inline_target) {
                targets.insert(target.to_path_buf());
                continue;
            }
            if resolved.is_none() && self.resolver.looks_local(&alias.name) {
                if !self.allow_unresolved {
                    return Err(BundleError::UnresolvedImport {
                        module: alias.name.clone(),
                        file: module.path().to_path_buf(),
                        line: module.line_of(import.range.start()),
                    }
                    .into());
                }
                warn!("Cannot resolve '{}'; leaving the import in place", alias.name);
            }
            residuals.push(alias.spelling());
        }

        if targets.is_empty() {
            return Ok(None);
        }
        Ok(Some(SplicePlan { targets, residuals }))
    }

    /// Decide what a from-import splices. A module base takes the whole
    /// statement to that file; a package base goes name by name, where a
    /// real submodule wins and anything else must be re-exported by the
    /// package initializer.
    fn plan_from(
        &mut self,
        module: &SourceModule,
        import: &FromImport,
    ) -> Result<Option<SplicePlan>> {
        let line = module.line_of(import.range.start());

        let base = if import.level > 0 {
            self.resolver
                .resolve_relative(module.path(), import.level, import.module.as_deref())
        } else {
            self.resolver
                .resolve_absolute(import.module.as_deref().unwrap_or_default())
        };
        let Some(base) = base else {
            let local_looking = import.level > 0
                || self
                    .resolver
                    .looks_local(import.module.as_deref().unwrap_or_default());
            if local_looking {
                return self
                    .unresolved(module, from_import_spelling(import), line)
                    .map(|()| None);
            }
            return Ok(None);
        };

        let targets = match base {
            ResolvedBase::Module(path) => IndexSet::from([path]),
            ResolvedBase::Package { dir, init } => {
                match self.package_targets(module, import, &dir, init.as_deref(), line)? {
                    Some(targets) => targets,
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(SplicePlan {
            targets,
            residuals: Vec::new(),
        }))
    }

    /// Per-name resolution against a package directory.
    fn package_targets(
        &mut self,
        module: &SourceModule,
        import: &FromImport,
        dir: &Path,
        init: Option<&Path>,
        line: usize,
    ) -> Result<Option<IndexSet<PathBuf>>> {
        let mut targets = IndexSet::new();

        if import.is_star {
            let Some(init) = init else {
                self.unresolved(module, from_import_spelling(import), line)?;
                return Ok(None);
            };
            targets.insert(init.to_path_buf());
            return Ok(Some(targets));
        }

        for name in &import.names {
            let submodule = self
                .resolver
                .resolve_in_package(dir, &name.name)
                .and_then(|base| base.inline_target().map(Path::to_path_buf));
            if let Some(submodule) = submodule {
                targets.insert(submodule);
                continue;
            }
            let Some(init) = init else {
                let spelled = join_dotted(&from_import_spelling(import), &name.name);
                self.unresolved(module, spelled, line)?;
                return Ok(None);
            };
            let exports = self.resolver.package_exports(self.cache, init)?;
            if exports.provides(&name.name, self.strict_reexports) {
                targets.insert(init.to_path_buf());
            } else {
                return Err(BundleError::AmbiguousReexport {
                    package: self.resolver.module_name_for_path(init),
                    symbol: name.name.clone(),
                    file: module.path().to_path_buf(),
                    line,
                }
                .into());
            }
        }
        Ok(Some(targets))
    }

    /// Fail on an unresolved local import, or warn and carry on when the
    /// configuration tolerates them.
    fn unresolved(&self, module: &SourceModule, spelled: String, line: usize) -> Result<()> {
        if self.allow_unresolved {
            warn!("Cannot resolve '{spelled}'; leaving the import in place");
            return Ok(());
        }
        Err(BundleError::UnresolvedImport {
            module: spelled,
            file: module.path().to_path_buf(),
            line,
        }
        .into())
    }

    fn push_elision(&self, out: &mut String, site: SpliceSite<'_>, name: &str) {
        if !self.emit_markers {
            return;
        }
        out.push_str(site.indent);
        out.push_str(&markers::already_inlined(name));
        out.push_str(site.newline);
    }

    /// Splice a bundled fragment between its begin and end markers, every
    /// non-blank line re-indented to the import site. Fragment lines pass
    /// through with their own terminators, carriage returns included.
    fn push_fragment(&self, out: &mut String, site: SpliceSite<'_>, name: &str, fragment: &str) {
        if self.emit_markers {
            out.push_str(site.indent);
            out.push_str(&markers::begin(name));
            out.push_str(site.newline);
        }
        for line in fragment.split_inclusive('\n') {
            if line == "\n" || line == "\r\n" {
                out.push_str(line);
            } else {
                out.push_str(site.indent);
                out.push_str(line);
            }
        }
        if !fragment.is_empty() && !fragment.ends_with('\n') {
            out.push_str(site.newline);
        }
        if self.emit_markers {
            out.push_str(site.indent);
            out.push_str(&markers::end(name));
            out.push_str(site.newline);
        }
    }
}

/// The dotted spelling of a from-import's source, leading dots included.
fn from_import_spelling(import: &FromImport) -> String {
    let mut spelled = ".".repeat(import.level as usize);
    if let Some(module) = &import.module {
        spelled.push_str(module);
    }
    spelled
}

/// Append a name to a dotted spelling. A bare relative spelling such as
/// `.` or `..` already ends with its separator.
fn join_dotted(base: &str, name: &str) -> String {
    if base.is_empty() || base.ends_with('.') {
        format!("{base}{name}")
    } else {
        format!("{base}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn create_test_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    fn bundle_with(dir: &Path, entry: &Path, config: Config) -> Result<String> {
        let config = Config {
            src: vec![dir.to_path_buf()],
            ..config
        };
        let mut resolver = ModuleResolver::new_with_pythonpath(config.clone(), Some(""));
        resolver.set_entry_file(entry);
        let mut cache = ModuleCache::new();
        let mut graph = ModuleGraph::new();
        let entry = entry.canonicalize().expect("entry file exists");
        let bundled =
            Inliner::new(&mut resolver, &mut cache, &mut graph, &config).inline_entry(&entry)?;
        SourceModule::parse(Path::new("bundle.py"), bundled.clone())
            .expect("bundled output should be valid Python");
        Ok(bundled)
    }

    fn bundle(dir: &Path, entry: &Path) -> Result<String> {
        bundle_with(dir, entry, Config::default())
    }

    fn bundle_err(dir: &Path, entry: &Path) -> BundleError {
        let err = bundle(dir, entry).expect_err("bundling should fail");
        err.downcast::<BundleError>().expect("BundleError")
    }

    #[test]
    fn test_single_import_replaced_with_markers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.class1 import Class1\n\nprint(Class1())\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/class1.py",
            "class Class1:\n    pass\n",
        );

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: modules.class1\n\
             class Class1:\n    pass\n\
             # end inlined module: modules.class1\n\
             \nprint(Class1())\n"
        );
    }

    #[test]
    fn test_nested_dependency_inlined_depth_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.class1 import Class1\nprint(Class1().describe())\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/class1.py",
            "from .class2 import Class2\n\nclass Class1:\n    def describe(self):\n        return Class2().name\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/class2.py",
            "class Class2:\n    name = 'c2'\n",
        );

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: modules.class1\n\
             # begin inlined module: modules.class2\n\
             class Class2:\n    name = 'c2'\n\
             # end inlined module: modules.class2\n\
             \nclass Class1:\n    def describe(self):\n        return Class2().name\n\
             # end inlined module: modules.class1\n\
             print(Class1().describe())\n"
        );
    }

    #[test]
    fn test_duplicate_import_elided_after_first_splice() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.a import A\nfrom modules.b import B\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/a.py",
            "from .shared import Shared\n\nclass A(Shared):\n    pass\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/b.py",
            "from .shared import Shared\n\nclass B(Shared):\n    pass\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/shared.py",
            "class Shared:\n    pass\n",
        );

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled.matches("class Shared").count(),
            1,
            "the shared module is spliced exactly once"
        );
        assert_eq!(
            bundled
                .matches("# already inlined module: modules.shared")
                .count(),
            1
        );
        let spliced = bundled
            .find("class Shared")
            .expect("shared class is present");
        let elided = bundled
            .find("# already inlined module: modules.shared")
            .expect("elision marker is present");
        assert!(spliced < elided, "the first import wins the splice");
    }

    #[test]
    fn test_external_imports_left_verbatim() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = "import os\nfrom json import dumps\n\nprint(dumps({}))\n";
        let entry = create_test_file(temp_dir.path(), "main.py", source);

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(bundled, source);
    }

    #[test]
    fn test_circular_import_reports_chain() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from a import A\n");
        create_test_file(temp_dir.path(), "a.py", "from b import B\n\nclass A:\n    pass\n");
        create_test_file(temp_dir.path(), "b.py", "from a import A\n\nclass B:\n    pass\n");

        match bundle_err(temp_dir.path(), &entry) {
            BundleError::CircularImport { chain } => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected CircularImport, got {other:?}"),
        }
    }

    #[test]
    fn test_mixed_plain_import_leaves_residual() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "import os, helper\n");
        create_test_file(temp_dir.path(), "helper.py", "value = 1\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: helper\n\
             value = 1\n\
             # end inlined module: helper\n\
             import os\n"
        );
    }

    #[test]
    fn test_type_checking_import_spliced_inside_guard() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from typing import TYPE_CHECKING\n\nif TYPE_CHECKING:\n    from models import User\n\ndef get(user):\n    return user\n",
        );
        create_test_file(temp_dir.path(), "models.py", "class User:\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert!(
            bundled.contains(
                "if TYPE_CHECKING:\n    # begin inlined module: models\n    class User:\n        pass\n    # end inlined module: models\n"
            ),
            "the fragment is re-indented into the guard body, got:\n{bundled}"
        );
        assert!(bundled.starts_with("from typing import TYPE_CHECKING\n"));
    }

    #[test]
    fn test_runtime_import_after_guarded_one_resplices() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from typing import TYPE_CHECKING\n\nif TYPE_CHECKING:\n    from models import User\n\nfrom models import User\n",
        );
        create_test_file(temp_dir.path(), "models.py", "class User:\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled.matches("class User").count(),
            2,
            "a runtime import after a guarded one gets its own copy"
        );
        assert!(
            bundled.contains("\n# begin inlined module: models\nclass User:\n"),
            "the runtime copy lands at top level, got:\n{bundled}"
        );
    }

    #[test]
    fn test_guarded_duplicate_of_runtime_import_is_elided() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from typing import TYPE_CHECKING\n\nfrom models import User\n\nif TYPE_CHECKING:\n    from models import User\n",
        );
        create_test_file(temp_dir.path(), "models.py", "class User:\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "from typing import TYPE_CHECKING\n\
             \n\
             # begin inlined module: models\n\
             class User:\n    pass\n\
             # end inlined module: models\n\
             \n\
             if TYPE_CHECKING:\n\
             \x20   # already inlined module: models\n\
             \x20   pass\n"
        );

        let bundled_entry = create_test_file(temp_dir.path(), "bundle.py", &bundled);
        let second = bundle(temp_dir.path(), &bundled_entry).expect("rebundling should succeed");
        assert_eq!(second, bundled);
    }

    #[test]
    fn test_release_elision_keeps_guard_suite_valid() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from typing import TYPE_CHECKING\n\nfrom models import User\n\nif TYPE_CHECKING:\n    from models import User\n",
        );
        create_test_file(temp_dir.path(), "models.py", "class User:\n    pass\n");

        let config = Config {
            release: true,
            ..Config::default()
        };
        let bundled =
            bundle_with(temp_dir.path(), &entry, config).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "from typing import TYPE_CHECKING\n\
             \n\
             class User:\n    pass\n\
             \n\
             if TYPE_CHECKING:\n\
             \x20   pass\n"
        );
    }

    #[test]
    fn test_empty_module_splice_keeps_suite_valid() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "def setup():\n    import plugins\n");
        create_test_file(temp_dir.path(), "plugins/__init__.py", "# namespace placeholder\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "def setup():\n\
             \x20   # begin inlined module: plugins\n\
             \x20   # namespace placeholder\n\
             \x20   # end inlined module: plugins\n\
             \x20   pass\n"
        );
    }

    #[test]
    fn test_two_elisions_share_one_backfill() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from typing import TYPE_CHECKING\nfrom models import User\nfrom widgets import Widget\n\nif TYPE_CHECKING:\n    from models import User\n    from widgets import Widget\n",
        );
        create_test_file(temp_dir.path(), "models.py", "class User:\n    name = 'u'\n");
        create_test_file(temp_dir.path(), "widgets.py", "class Widget:\n    name = 'w'\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert!(
            bundled.contains(
                "if TYPE_CHECKING:\n    # already inlined module: models\n    # already inlined module: widgets\n    pass\n"
            ),
            "one pass closes the fully elided suite, got:\n{bundled}"
        );
        assert_eq!(bundled.matches("    pass\n").count(), 1);
    }

    #[test]
    fn test_unresolved_local_import_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from modules.ghost import G\n");
        create_test_file(temp_dir.path(), "modules/__init__.py", "");

        match bundle_err(temp_dir.path(), &entry) {
            BundleError::UnresolvedImport { module, line, .. } => {
                assert_eq!(module, "modules.ghost");
                assert_eq!(line, 1);
            }
            other => panic!("expected UnresolvedImport, got {other:?}"),
        }
    }

    #[test]
    fn test_relative_unresolved_name_keeps_single_dot() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "pkg/mod.py", "from . import ghost\n");

        match bundle_err(temp_dir.path(), &entry) {
            BundleError::UnresolvedImport { module, line, .. } => {
                assert_eq!(module, ".ghost");
                assert_eq!(line, 1);
            }
            other => panic!("expected UnresolvedImport, got {other:?}"),
        }
    }

    #[test]
    fn test_allow_unresolved_leaves_import_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = "from modules.ghost import G\n";
        let entry = create_test_file(temp_dir.path(), "main.py", source);
        create_test_file(temp_dir.path(), "modules/__init__.py", "");

        let config = Config {
            allow_unresolved: true,
            ..Config::default()
        };
        let bundled =
            bundle_with(temp_dir.path(), &entry, config).expect("lenient bundling should succeed");
        assert_eq!(bundled, source);
    }

    #[test]
    fn test_package_reexport_routes_to_initializer() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from tacos import Taco\n");
        create_test_file(temp_dir.path(), "tacos/__init__.py", "from .taco import Taco\n");
        create_test_file(temp_dir.path(), "tacos/taco.py", "class Taco:\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: tacos\n\
             # begin inlined module: tacos.taco\n\
             class Taco:\n    pass\n\
             # end inlined module: tacos.taco\n\
             # end inlined module: tacos\n"
        );
    }

    #[test]
    fn test_from_package_import_submodule_skips_initializer() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from pkg import helper\n");
        create_test_file(temp_dir.path(), "pkg/__init__.py", "print('side effect')\n");
        create_test_file(temp_dir.path(), "pkg/helper.py", "def assist():\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert!(bundled.contains("# begin inlined module: pkg.helper\n"));
        assert!(
            !bundled.contains("# begin inlined module: pkg\n"),
            "a real submodule wins over the initializer"
        );
        assert!(!bundled.contains("side effect"));
    }

    #[test]
    fn test_ambiguous_reexport_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from pkg import ghost\n");
        create_test_file(temp_dir.path(), "pkg/__init__.py", "VERSION = 1\n");

        match bundle_err(temp_dir.path(), &entry) {
            BundleError::AmbiguousReexport {
                package, symbol, ..
            } => {
                assert_eq!(package, "pkg");
                assert_eq!(symbol, "ghost");
            }
            other => panic!("expected AmbiguousReexport, got {other:?}"),
        }
    }

    #[test]
    fn test_star_import_splices_initializer() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(temp_dir.path(), "main.py", "from pkg import *\n");
        create_test_file(temp_dir.path(), "pkg/__init__.py", "from .impl import *\n");
        create_test_file(temp_dir.path(), "pkg/impl.py", "x = 1\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert!(bundled.contains("# begin inlined module: pkg\n"));
        assert!(bundled.contains("# begin inlined module: pkg.impl\n"));
        assert!(bundled.contains("x = 1\n"));
    }

    #[test]
    fn test_marked_input_elides_fresh_import() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "# begin inlined module: util\ndef assist():\n    pass\n# end inlined module: util\nfrom util import assist\n",
        );
        create_test_file(temp_dir.path(), "util.py", "def assist():\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: util\ndef assist():\n    pass\n# end inlined module: util\n# already inlined module: util\n"
        );
    }

    #[test]
    fn test_rebundling_output_is_stable() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "import os\nfrom modules.class1 import Class1\nprint(Class1())\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/class1.py",
            "class Class1:\n    pass\n",
        );

        let first = bundle(temp_dir.path(), &entry).expect("first bundling should succeed");
        let bundled_entry = create_test_file(temp_dir.path(), "bundle.py", &first);
        let second = bundle(temp_dir.path(), &bundled_entry).expect("rebundling should succeed");
        assert_eq!(second, first);
    }

    #[test]
    fn test_release_mode_emits_no_markers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.a import A\nfrom modules.b import B\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/a.py",
            "from .shared import Shared\n\nclass A(Shared):\n    pass\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/b.py",
            "from .shared import Shared\n\nclass B(Shared):\n    pass\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/shared.py",
            "class Shared:\n    pass\n",
        );

        let config = Config {
            release: true,
            ..Config::default()
        };
        let bundled =
            bundle_with(temp_dir.path(), &entry, config).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "class Shared:\n    pass\n\
             \nclass A(Shared):\n    pass\n\
             \nclass B(Shared):\n    pass\n"
        );
    }

    #[test]
    fn test_shared_line_import_left_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = "import helper; x = 1\n";
        let entry = create_test_file(temp_dir.path(), "main.py", source);
        create_test_file(temp_dir.path(), "helper.py", "value = 1\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(bundled, source);
    }

    #[test]
    fn test_function_local_import_indented_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "def build():\n    from helper import value\n    return value\n",
        );
        create_test_file(temp_dir.path(), "helper.py", "value = 1\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "def build():\n\
             \x20   # begin inlined module: helper\n\
             \x20   value = 1\n\
             \x20   # end inlined module: helper\n\
             \x20   return value\n"
        );
    }

    #[test]
    fn test_crlf_fragment_keeps_its_line_endings() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.win import Win\nprint(Win)\n",
        );
        create_test_file(
            temp_dir.path(),
            "modules/win.py",
            "class Win:\r\n    flag = True\r\n",
        );

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: modules.win\n\
             class Win:\r\n    flag = True\r\n\
             # end inlined module: modules.win\n\
             print(Win)\n"
        );
    }

    #[test]
    fn test_crlf_entry_gets_crlf_markers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = create_test_file(
            temp_dir.path(),
            "main.py",
            "from modules.nix import Nix\r\nprint(Nix)\r\n",
        );
        create_test_file(temp_dir.path(), "modules/nix.py", "class Nix:\n    pass\n");

        let bundled = bundle(temp_dir.path(), &entry).expect("bundling should succeed");
        assert_eq!(
            bundled,
            "# begin inlined module: modules.nix\r\n\
             class Nix:\n    pass\n\
             # end inlined module: modules.nix\r\n\
             print(Nix)\r\n"
        );
    }
}
