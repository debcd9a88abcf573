//! Dependency graph and per-module inline state.
//!
//! Modules are keyed by canonical path, so two import spellings of the same
//! file share one node. Importer→importee edges live in a petgraph
//! `DiGraph`; cycle *reporting* comes from the depth-first visit stack, the
//! graph backs the structural queries.

use std::path::PathBuf;

use indexmap::IndexMap;
use petgraph::{
    algo::is_cyclic_directed,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashMap;

/// Unique identifier for a module in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Inline progress of a module during the depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineState {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug)]
pub struct ModuleNode {
    pub id: ModuleId,
    /// Qualified dotted name, used in markers and error chains.
    pub name: String,
    /// Canonical path of the module file.
    pub path: PathBuf,
    pub state: InlineState,
    /// Fully inlined text, cached once the module is Done.
    pub fragment: Option<String>,
    /// Done only inside a TYPE_CHECKING guard. A later runtime import must
    /// re-splice the fragment and clear this.
    pub type_checking_only: bool,
    /// The fragment contains at least one statement. Empty and comment-only
    /// modules do not, and splicing them cannot keep a suite non-empty.
    pub has_statements: bool,
    /// Modules spliced into this module's fragment.
    pub children: Vec<ModuleId>,
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: FxHashMap<ModuleId, ModuleNode>,
    /// Insertion-ordered path index; the key set is the visit order.
    path_to_id: IndexMap<PathBuf, ModuleId>,
    graph: DiGraph<ModuleId, ()>,
    node_indices: FxHashMap<ModuleId, NodeIndex>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, deduplicating by path. The caller passes canonical
    /// paths; repeated registration returns the existing id.
    pub fn ensure_module(&mut self, name: String, path: PathBuf) -> ModuleId {
        if let Some(&id) = self.path_to_id.get(&path) {
            return id;
        }
        let id = ModuleId::new(self.path_to_id.len() as u32);
        let index = self.graph.add_node(id);
        self.node_indices.insert(id, index);
        self.path_to_id.insert(path.clone(), id);
        self.modules.insert(
            id,
            ModuleNode {
                id,
                name,
                path,
                state: InlineState::Unvisited,
                fragment: None,
                type_checking_only: false,
                has_statements: false,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn node(&self, id: ModuleId) -> &ModuleNode {
        &self.modules[&id]
    }

    pub fn state(&self, id: ModuleId) -> InlineState {
        self.modules[&id].state
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.modules[&id].name
    }

    /// Record that `from` imports `to`.
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let from_index = self.node_indices[&from];
        let to_index = self.node_indices[&to];
        self.graph.update_edge(from_index, to_index, ());
    }

    pub fn begin_inline(&mut self, id: ModuleId) {
        let node = self.modules.get_mut(&id).expect("module registered");
        debug_assert_eq!(node.state, InlineState::Unvisited);
        node.state = InlineState::InProgress;
    }

    pub fn finish_inline(
        &mut self,
        id: ModuleId,
        fragment: String,
        type_checking_only: bool,
        has_statements: bool,
        children: Vec<ModuleId>,
    ) {
        let node = self.modules.get_mut(&id).expect("module registered");
        node.state = InlineState::Done;
        node.fragment = Some(fragment);
        node.type_checking_only = type_checking_only;
        node.has_statements = has_statements;
        node.children = children;
    }

    pub fn fragment(&self, id: ModuleId) -> Option<&str> {
        self.modules[&id].fragment.as_deref()
    }

    /// Clear `type_checking_only` on a module and everything spliced into
    /// its fragment. Stops at nodes that are already runtime-visible.
    pub fn promote_to_runtime(&mut self, id: ModuleId) {
        let mut worklist = vec![id];
        while let Some(current) = worklist.pop() {
            let Some(node) = self.modules.get_mut(&current) else {
                continue;
            };
            if !node.type_checking_only {
                continue;
            }
            node.type_checking_only = false;
            worklist.extend(node.children.iter().copied());
        }
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Modules in first-visit order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleNode> {
        self.path_to_id.values().map(|id| &self.modules[id])
    }
}
