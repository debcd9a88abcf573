//! Import collection visitor that finds all import statements in a Python
//! module, including those nested within functions, classes, and
//! conditional blocks, in document order.
//!
//! Each collected statement carries its whole-statement span (parenthesized
//! continuation lines included) and whether it sits inside a
//! `TYPE_CHECKING` guard.

use ruff_python_ast::{
    Alias, Expr, ModModule, Stmt, StmtImport, StmtImportFrom,
    visitor::{Visitor, walk_stmt},
};
use ruff_text_size::{Ranged, TextRange};
use rustc_hash::FxHashSet;

/// One name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    fn from_alias(alias: &Alias) -> Self {
        Self {
            name: alias.name.as_str().to_owned(),
            alias: alias.asname.as_ref().map(|ident| ident.as_str().to_owned()),
        }
    }

    /// The identifier this import binds in the importing scope.
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Original spelling, `name` or `name as alias`.
    pub fn spelling(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} as {}", self.name, alias),
            None => self.name.clone(),
        }
    }
}

/// The compound-statement body an import sits in. The module's top level
/// is not a suite; it may legally end up without statements, a suite may
/// not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteInfo {
    /// Identity of the body within one module's walk.
    pub id: u32,
    /// Number of statements in the body.
    pub statements: usize,
}

/// `import a.b, c as d`
#[derive(Debug, Clone)]
pub struct PlainImport {
    pub aliases: Vec<ImportedName>,
    pub range: TextRange,
    pub type_checking: bool,
    pub suite: Option<SuiteInfo>,
}

/// `from [.]*module import name, ...` (or `*`)
#[derive(Debug, Clone)]
pub struct FromImport {
    /// Dotted module path; `None` for `from . import x` forms.
    pub module: Option<String>,
    /// Number of leading dots.
    pub level: u32,
    pub names: Vec<ImportedName>,
    pub is_star: bool,
    pub range: TextRange,
    pub type_checking: bool,
    pub suite: Option<SuiteInfo>,
}

#[derive(Debug, Clone)]
pub enum ImportStatement {
    Plain(PlainImport),
    From(FromImport),
}

impl ImportStatement {
    pub fn range(&self) -> TextRange {
        match self {
            Self::Plain(import) => import.range,
            Self::From(import) => import.range,
        }
    }

    pub fn is_type_checking(&self) -> bool {
        match self {
            Self::Plain(import) => import.type_checking,
            Self::From(import) => import.type_checking,
        }
    }

    /// The compound-statement body this import sits in, `None` at the
    /// module's top level.
    pub fn suite(&self) -> Option<SuiteInfo> {
        match self {
            Self::Plain(import) => import.suite,
            Self::From(import) => import.suite,
        }
    }
}

#[derive(Debug)]
pub struct ImportCollector {
    imports: Vec<ImportStatement>,
    /// Depth of enclosing `if TYPE_CHECKING:` blocks.
    type_checking_depth: usize,
    /// Names that refer to the `typing.TYPE_CHECKING` sentinel.
    sentinel_names: FxHashSet<String>,
    /// Names bound to the `typing` module itself.
    typing_aliases: FxHashSet<String>,
    /// Suite currently being walked, `None` at the module's top level.
    current_suite: Option<SuiteInfo>,
    next_suite_id: u32,
}

impl ImportCollector {
    pub fn new() -> Self {
        let mut sentinel_names = FxHashSet::default();
        sentinel_names.insert("TYPE_CHECKING".to_owned());
        let mut typing_aliases = FxHashSet::default();
        typing_aliases.insert("typing".to_owned());
        Self {
            imports: Vec::new(),
            type_checking_depth: 0,
            sentinel_names,
            typing_aliases,
            current_suite: None,
            next_suite_id: 0,
        }
    }

    /// Collect every import in `module`, in document order. Top-level
    /// statements are walked directly so only nested bodies count as
    /// suites.
    pub fn collect(module: &ModModule) -> Vec<ImportStatement> {
        let mut collector = Self::new();
        for stmt in &module.body {
            collector.visit_stmt(stmt);
        }
        let mut imports = collector.imports;
        imports.sort_by_key(|import| import.range().start());
        imports
    }

    fn in_type_checking(&self) -> bool {
        self.type_checking_depth > 0
    }

    fn record_import(&mut self, import: &StmtImport) {
        for alias in &import.names {
            if alias.name.as_str() == "typing" {
                let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                self.typing_aliases.insert(bound.as_str().to_owned());
            }
        }
        self.imports.push(ImportStatement::Plain(PlainImport {
            aliases: import.names.iter().map(ImportedName::from_alias).collect(),
            range: import.range(),
            type_checking: self.in_type_checking(),
            suite: self.current_suite,
        }));
    }

    fn record_import_from(&mut self, import: &StmtImportFrom) {
        let module = import
            .module
            .as_ref()
            .map(|ident| ident.as_str().to_owned());

        if import.level == 0 && module.as_deref() == Some("typing") {
            for alias in &import.names {
                if alias.name.as_str() == "TYPE_CHECKING" {
                    let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                    self.sentinel_names.insert(bound.as_str().to_owned());
                }
            }
        }

        let is_star = import.names.len() == 1 && import.names[0].name.as_str() == "*";
        self.imports.push(ImportStatement::From(FromImport {
            module,
            level: import.level,
            names: import.names.iter().map(ImportedName::from_alias).collect(),
            is_star,
            range: import.range(),
            type_checking: self.in_type_checking(),
            suite: self.current_suite,
        }));
    }

    /// A conditional test counts as the type-checking sentinel when it is a
    /// bare name bound to `TYPE_CHECKING` (possibly via an alias) or an
    /// attribute access through a name bound to the `typing` module.
    fn is_type_checking_test(&self, test: &Expr) -> bool {
        match test {
            Expr::Name(name) => self.sentinel_names.contains(name.id.as_str()),
            Expr::Attribute(attr) => {
                attr.attr.as_str() == "TYPE_CHECKING"
                    && matches!(
                        &*attr.value,
                        Expr::Name(base) if self.typing_aliases.contains(base.id.as_str())
                    )
            }
            _ => false,
        }
    }
}

impl Default for ImportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Visitor<'a> for ImportCollector {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(import) => self.record_import(import),
            Stmt::ImportFrom(import_from) => self.record_import_from(import_from),
            Stmt::If(if_stmt) => {
                // Branches are walked separately so only statements under a
                // sentinel test carry the type-checking flag; the else
                // branch of a guard is runtime context.
                let guarded = self.is_type_checking_test(&if_stmt.test);
                if guarded {
                    self.type_checking_depth += 1;
                }
                self.visit_body(&if_stmt.body);
                if guarded {
                    self.type_checking_depth -= 1;
                }
                for clause in &if_stmt.elif_else_clauses {
                    let clause_guarded = clause
                        .test
                        .as_ref()
                        .is_some_and(|test| self.is_type_checking_test(test));
                    if clause_guarded {
                        self.type_checking_depth += 1;
                    }
                    self.visit_body(&clause.body);
                    if clause_guarded {
                        self.type_checking_depth -= 1;
                    }
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_body(&mut self, body: &'a [Stmt]) {
        let parent = self.current_suite;
        self.current_suite = Some(SuiteInfo {
            id: self.next_suite_id,
            statements: body.len(),
        });
        self.next_suite_id += 1;
        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.current_suite = parent;
    }
}
