use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{AssemblyIdentity, DeclarationPath, DocumentId, ProjectId, Symbol};

/// Opaque handle to a declaration node inside one semantic model's syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationNode(u32);

impl DeclarationNode {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// Semantic view of one document's current syntax tree.
pub trait SemanticModel: Send + Sync {
    /// Resolves `path` against the current tree. `None` when the tree no longer has that shape.
    fn resolve_declaration(&self, path: &DeclarationPath) -> Option<DeclarationNode>;

    /// The symbol declared by `node`, if any.
    fn declared_symbol(&self, node: DeclarationNode) -> Option<Arc<Symbol>>;
}

/// A project's compilation, as far as visibility decisions care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    project: ProjectId,
    assembly: Arc<AssemblyIdentity>,
}

impl Compilation {
    pub fn new(project: ProjectId, assembly: Arc<AssemblyIdentity>) -> Self {
        Self { project, assembly }
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn assembly(&self) -> &Arc<AssemblyIdentity> {
        &self.assembly
    }
}

/// Best-effort access to semantic results that have already been computed.
///
/// Implementations must never compute anything on a miss; callers use a miss to fall back to a
/// coarser (but always correct) decision.
pub trait SemanticCache: Send + Sync {
    fn cached_semantic_model(&self, document: DocumentId) -> Option<Arc<dyn SemanticModel>>;

    fn cached_compilation(&self, project: ProjectId) -> Option<Arc<Compilation>>;
}

/// Semantic model backed by a fixed table of declarations.
#[derive(Debug, Default, Clone)]
pub struct DeclarationTable {
    nodes: HashMap<DeclarationPath, DeclarationNode>,
    symbols: HashMap<DeclarationNode, Arc<Symbol>>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `symbol` at `path`.
    pub fn with_declaration(mut self, path: DeclarationPath, symbol: Arc<Symbol>) -> Self {
        let node = self.node_for(path);
        self.symbols.insert(node, symbol);
        self
    }

    /// Adds a node at `path` that declares nothing (e.g. a syntax error recovery node).
    pub fn with_unbound_node(mut self, path: DeclarationPath) -> Self {
        self.node_for(path);
        self
    }

    fn node_for(&mut self, path: DeclarationPath) -> DeclarationNode {
        let next = DeclarationNode::new(self.nodes.len() as u32);
        *self.nodes.entry(path).or_insert(next)
    }
}

impl SemanticModel for DeclarationTable {
    fn resolve_declaration(&self, path: &DeclarationPath) -> Option<DeclarationNode> {
        self.nodes.get(path).copied()
    }

    fn declared_symbol(&self, node: DeclarationNode) -> Option<Arc<Symbol>> {
        self.symbols.get(&node).cloned()
    }
}

/// Thread-safe in-memory [`SemanticCache`] that hosts fill as results become available.
#[derive(Default)]
pub struct InMemorySemanticCache {
    models: RwLock<HashMap<DocumentId, Arc<dyn SemanticModel>>>,
    compilations: RwLock<HashMap<ProjectId, Arc<Compilation>>>,
}

impl InMemorySemanticCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_model(&self, document: DocumentId, model: Arc<dyn SemanticModel>) {
        self.models.write().insert(document, model);
    }

    pub fn insert_compilation(&self, compilation: Compilation) {
        self.compilations
            .write()
            .insert(compilation.project(), Arc::new(compilation));
    }

    pub fn evict_document(&self, document: DocumentId) {
        self.models.write().remove(&document);
    }

    /// Drops the project's compilation and every semantic model of its documents.
    pub fn evict_project(&self, project: ProjectId) {
        self.compilations.write().remove(&project);
        self.models
            .write()
            .retain(|document, _| document.project_id() != project);
    }
}

impl SemanticCache for InMemorySemanticCache {
    fn cached_semantic_model(&self, document: DocumentId) -> Option<Arc<dyn SemanticModel>> {
        self.models.read().get(&document).cloned()
    }

    fn cached_compilation(&self, project: ProjectId) -> Option<Arc<Compilation>> {
        self.compilations.read().get(&project).cloned()
    }
}
